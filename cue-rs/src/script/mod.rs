//! The cue scripting language.
//!
//! A cue script is a `;`-separated list of statements.  Each statement is a
//! `.`-joined chain of method calls resolved through a
//! [`QueryBridge`](crate::bridge::QueryBridge), or one of the control forms
//! `if(…) {…}`, `elif(…) {…}`, `else {…}`, `each(…) {…}` and
//! `range(a, b) {…}`.  `sleep(n)` waits `n` frames; a leading `+` lets a
//! statement tick alongside the blocking statement before it.  `#define`
//! creates textual aliases and `//` starts a comment.
//!
//! Pipeline: [`preprocess`] → [`parser`] → [`ast`] → [`eval`].
//!
//! # Quick start
//!
//! ```rust
//! use cue::bridge::{QueryResult, Registry};
//! use cue::script::Script;
//!
//! let mut bridge = Registry::new(Vec::<String>::new());
//! bridge.root("say", |lines, call| {
//!     lines.push(call.param_str(0));
//!     QueryResult::Absent
//! });
//!
//! let mut script = Script::parse(r#"say("hello"); sleep(1); say("bye");"#).unwrap();
//! assert!(!script.run(&mut bridge, None));
//! assert!(script.run(&mut bridge, None));
//! assert_eq!(bridge.world(), &["hello", "bye"]);
//! ```

pub mod ast;
pub mod error;
pub mod eval;
pub mod expr;
pub mod extract;
pub mod library;
pub mod parser;
pub mod preprocess;
pub mod queue;
pub mod value;

// Re-exports for convenience.
pub use ast::{Block, ConditionKind, Link, Statement};
pub use error::ParseError;
pub use eval::{Script, Status};
pub use library::{LibraryError, ScriptLibrary};
pub use parser::{parse_block, parse_statement};
pub use queue::ScriptQueue;
pub use value::Value;
