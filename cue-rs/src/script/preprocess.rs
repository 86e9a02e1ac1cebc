//! Source preprocessing: raw script text to top-level statement fragments.
//!
//! The pipeline runs in a fixed order:
//!
//! 1. strip `//` comments (outside string literals) and surrounding blanks;
//! 2. collect `#define NAME expansion` aliases and delete those lines;
//! 3. hide string literals, substitute aliases (longest name first), and
//!    hide any string literals the expansions introduced, then any
//!    `'…'` condition literals;
//! 4. normalise whitespace: drop blank lines, join continuation lines,
//!    remove tabs and newlines, squeeze spaces, tighten commas;
//! 5. rewrite `} else {` into `} else(1) {`;
//! 6. hide parameter lists, then hide bracketed blocks with a `;` after each;
//! 7. split on `;` and restore blocks, parameters and strings in that order.
//!
//! Blank fragments are dropped.

use std::sync::OnceLock;

use log::trace;
use regex::Regex;

use super::error::ParseError;
use super::extract::{extract, hide_quoted, PlaceholderTable};

/// A `#define` alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    pub name: String,
    pub expansion: String,
}

fn define_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^[ \t]*#define[ \t]+(\S+)(?:[ \t]+(.*?))?[ \t\r]*$")
            .expect("define pattern is valid")
    })
}

fn define_any() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^[ \t]*#define\b.*(?:\n|$)").expect("define pattern is valid")
    })
}

fn newline_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n+").expect("newline pattern is valid"))
}

fn space_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r" +").expect("space pattern is valid"))
}

fn comma_spacing() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r",\s*").expect("comma pattern is valid"))
}

fn else_brace() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\}\s*else\s*\{").expect("else pattern is valid"))
}

// ── Comments ──────────────────────────────────────────────────────────────────

/// Remove `//` comments that are not inside a `"…"` literal.
///
/// The newline ending a comment is kept so that a commented `#define` line
/// does not swallow the line after it.
pub fn strip_comments(src: &str) -> String {
    let mut out = String::with_capacity(src.len());
    let mut chars = src.chars().peekable();
    let mut in_string = false;
    let mut prev = '\0';
    while let Some(c) = chars.next() {
        if in_string {
            if c == '"' && prev != '\\' {
                in_string = false;
            }
            out.push(c);
            prev = c;
            continue;
        }
        if c == '/' && chars.peek() == Some(&'/') {
            for skipped in chars.by_ref() {
                if skipped == '\n' {
                    out.push('\n');
                    break;
                }
            }
            prev = '\n';
            continue;
        }
        if c == '"' {
            in_string = true;
        }
        out.push(c);
        prev = c;
    }
    out.trim().to_owned()
}

// ── Aliases ───────────────────────────────────────────────────────────────────

/// Collect `#define` aliases and return the source with those lines removed.
///
/// Aliases come back ordered longest name first, ties in reverse lexical
/// order, which is the order they must be substituted in.
pub fn collect_defines(src: &str) -> (String, Vec<Alias>) {
    let mut aliases: Vec<Alias> = define_line()
        .captures_iter(src)
        .map(|cap| Alias {
            name: cap[1].to_owned(),
            expansion: cap.get(2).map(|m| m.as_str().to_owned()).unwrap_or_default(),
        })
        .collect();
    aliases.sort_by(|a, b| b.name.len().cmp(&a.name.len()).then_with(|| b.name.cmp(&a.name)));
    let stripped = define_any().replace_all(src, "").into_owned();
    (stripped, aliases)
}

fn substitute(text: &str, aliases: &[Alias]) -> String {
    aliases
        .iter()
        .fold(text.to_owned(), |acc, alias| acc.replace(&alias.name, &alias.expansion))
}

// ── Whitespace ────────────────────────────────────────────────────────────────

fn normalise_whitespace(text: &str) -> String {
    let text = text.replace('\r', "");
    let text = newline_runs().replace_all(&text, "\n");
    let text = text
        .replace(".\n", ".")
        .replace(",\n", ",")
        .replace("(\n", "(")
        .replace("\n)", ")");
    let text: String = text.chars().filter(|c| *c != '\t' && *c != '\n').collect();
    let text = space_runs().replace_all(&text, " ");
    comma_spacing().replace_all(&text, ",").into_owned()
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

/// Turn raw script source into the list of top-level statement fragments.
pub fn preprocess(src: &str) -> Result<Vec<String>, ParseError> {
    let text = strip_comments(src);
    let (text, aliases) = collect_defines(&text);

    let mut strings = PlaceholderTable::new("string");
    let text = extract('"', '"', &text, &mut strings, true, "")?;
    let text = substitute(&text, &aliases);
    let text = extract('"', '"', &text, &mut strings, true, "")?;
    let text = hide_quoted(&text, &mut strings);

    let text = normalise_whitespace(&text);
    let text = else_brace().replace_all(&text, "} else(1) {").into_owned();

    let mut params = PlaceholderTable::new("params");
    let text = extract('(', ')', &text, &mut params, true, "")?;
    let mut blocks = PlaceholderTable::new("subscript");
    let text = extract('{', '}', &text, &mut blocks, true, ";")?;
    trace!("preprocessed: {text}");

    let fragments = text
        .split(';')
        .map(|piece| strings.restore(&params.restore(&blocks.restore(piece))))
        .map(|piece| piece.trim().to_owned())
        .filter(|piece| !piece.is_empty())
        .collect();
    Ok(fragments)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
