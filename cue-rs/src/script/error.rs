//! Compile-time errors for cue scripts.

use thiserror::Error;

/// Longest source excerpt quoted in a diagnostic.
const EXCERPT_LEN: usize = 48;

/// A script that cannot be turned into a [`Block`](super::ast::Block).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// An opening delimiter with no matching close.
    #[error("unterminated `{open}` (expected `{close}`) near `{excerpt}`")]
    Unterminated {
        open: char,
        close: char,
        excerpt: String,
    },
    /// `range(...)` whose argument list does not hold exactly two bounds.
    #[error("range() needs two bounds, got `{0}`")]
    RangeBounds(String),
}

impl ParseError {
    pub(crate) fn unterminated(open: char, close: char, rest: &str) -> Self {
        ParseError::Unterminated {
            open,
            close,
            excerpt: rest.chars().take(EXCERPT_LEN).collect(),
        }
    }
}
