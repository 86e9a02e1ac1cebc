//! Statement parser.
//!
//! Turns preprocessed statement fragments into [`Statement`] chains.  Inside
//! a fragment, string literals, `{…}` object literals and `(…)` parameter
//! lists are first hidden behind placeholders so the chain can be split on
//! `.` safely; each link then gets its own parameters back and is classified
//! as a method call, a control construct (`if` / `elif` / `else`, `each`,
//! `range`), `this`, an object literal, or a constant.

use std::sync::OnceLock;

use regex::Regex;

use super::ast::{Block, ConditionKind, Link, Statement};
use super::error::ParseError;
use super::extract::{extract, find_close, hide_quoted, PlaceholderTable};
use super::preprocess::preprocess;

/// Name pattern for sub-expressions lifted out of conditions.
pub const STATEMENT_MARKER: &str = "statement";

fn call_head() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\w+\(").expect("call pattern is valid"))
}

/// Placeholder for the `n`th (1-based) lifted condition sub-expression.
pub fn statement_marker(n: usize) -> String {
    format!("@^{STATEMENT_MARKER}{n}$@")
}

// ── Entry points ──────────────────────────────────────────────────────────────

/// Parse a whole script (or block body) into a [`Block`].
pub fn parse_block(src: &str) -> Result<Block, ParseError> {
    let statements = preprocess(src)?
        .iter()
        .map(|fragment| parse_statement(fragment))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Block::new(statements))
}

/// Parse a single statement fragment (no top-level `;`).
pub fn parse_statement(fragment: &str) -> Result<Statement, ParseError> {
    let fragment = fragment.trim();
    if fragment.is_empty() {
        return Ok(Statement::default());
    }
    // `1.5` is one constant, not a chain of `1` and `5`.
    if is_number(fragment) {
        return Ok(Statement::new(vec![Link::Constant(fragment.to_owned())]));
    }

    let mut literals = Literals::new();
    let text = extract('"', '"', fragment, &mut literals.strings, true, "")?;
    let text = hide_quoted(&text, &mut literals.strings);
    let text = extract('{', '}', &text, &mut literals.objects, true, "")?;
    let mut params = PlaceholderTable::new("param");
    let text = extract('(', ')', &text, &mut params, true, "")?;

    let mut links = Vec::new();
    for piece in text.split('.') {
        parse_link(&params.restore(piece), &literals, &mut links)?;
    }
    Ok(Statement::new(links))
}

// ── Links ─────────────────────────────────────────────────────────────────────

/// String and object literals hidden while a statement is being split.
struct Literals {
    strings: PlaceholderTable,
    objects: PlaceholderTable,
}

impl Literals {
    fn new() -> Self {
        Self {
            strings: PlaceholderTable::new("string"),
            objects: PlaceholderTable::new("object"),
        }
    }

    fn restore(&self, text: &str) -> String {
        self.strings.restore(&self.objects.restore(text))
    }
}

fn parse_link(piece: &str, literals: &Literals, links: &mut Vec<Link>) -> Result<(), ParseError> {
    let piece = piece.trim();
    let Some(open) = piece.find('(') else {
        let text = literals.restore(piece);
        if text.is_empty() {
            // `a..b` or a trailing `.`: nothing to add
        } else if text == "this" {
            links.push(Link::This);
        } else if text.starts_with('{') {
            links.push(Link::Object(text));
        } else {
            links.push(Link::Constant(text));
        }
        return Ok(());
    };

    let close = find_close(piece, open, '(', ')')
        .ok_or_else(|| ParseError::unterminated('(', ')', &piece[open..]))?;
    let name = piece[..open].trim();
    let args = &piece[open + 1..close];
    let rest = &piece[close + 1..];

    if let Some(kind) = ConditionKind::from_name(name) {
        let (params, template) = parse_condition(args, literals)?;
        let body = parse_body(rest, literals)?;
        links.push(Link::Conditional { kind, params, template, body });
        return Ok(());
    }

    match name {
        "each" => {
            let subject = parse_statement(&literals.restore(args))?;
            let body = parse_body(rest, literals)?;
            links.push(Link::Each { subject, body });
        }
        "range" => {
            let bounds = split_top_level(args);
            let [from, to] = bounds.as_slice() else {
                return Err(ParseError::RangeBounds(literals.restore(args)));
            };
            let from = parse_statement(&literals.restore(from))?;
            let to = parse_statement(&literals.restore(to))?;
            let body = parse_body(rest, literals)?;
            links.push(Link::Range { from, to, body });
        }
        _ => {
            let (name, simultaneous) = match name.strip_prefix('+') {
                Some(stripped) => (stripped.trim(), true),
                None => (name, false),
            };
            let params = if args.trim().is_empty() {
                Vec::new()
            } else {
                split_top_level(args)
                    .into_iter()
                    .map(|arg| parse_statement(&literals.restore(arg)))
                    .collect::<Result<Vec<_>, _>>()?
            };
            links.push(Link::Method { name: name.to_owned(), params, simultaneous });
            if !rest.trim().is_empty() {
                links.extend(parse_statement(&literals.restore(rest))?.into_links());
            }
        }
    }
    Ok(())
}

/// Parse the `{ … }` that follows a control construct's `)`.
///
/// `rest` still has its literals hidden; a missing body is an empty block.
fn parse_body(rest: &str, literals: &Literals) -> Result<Block, ParseError> {
    let text = literals.objects.restore(rest.trim());
    let Some(open) = text.find('{') else {
        return Ok(Block::default());
    };
    let close = find_close(&text, open, '{', '}')
        .ok_or_else(|| ParseError::unterminated('{', '}', &text[open..]))?;
    parse_block(&literals.strings.restore(&text[open + 1..close]))
}

// ── Conditions ────────────────────────────────────────────────────────────────

/// Lift every call chain out of a condition expression.
///
/// Returns the parsed chains and the expression text with
/// `@^statementN$@` in their place.
fn parse_condition(expr: &str, literals: &Literals) -> Result<(Vec<Statement>, String), ParseError> {
    let mut template = expr.trim().to_owned();
    let mut params = Vec::new();
    let mut from = 0;
    while let Some(found) = call_head().find_at(&template, from) {
        let ident = &template[found.start()..found.end() - 1];
        if matches!(ident, "not" | "and" | "or") {
            from = found.end() - 1;
            continue;
        }
        let start = chain_start(&template, found.start(), from);
        let end = chain_end(&template, start);
        let phrase = literals.restore(&template[start..end]);
        params.push(parse_statement(&phrase)?);
        let marker = statement_marker(params.len());
        template.replace_range(start..end, &marker);
        from = start + marker.len();
    }
    Ok((params, literals.restore(&template)))
}

/// Walk back from a call head over a `this.` / `a.b.` receiver prefix.
fn chain_start(text: &str, mut start: usize, floor: usize) -> usize {
    while start > floor {
        match text[..start].chars().next_back() {
            Some(c) if c.is_alphanumeric() || c == '_' || c == '.' => start -= c.len_utf8(),
            _ => break,
        }
    }
    start
}

/// End of the call chain starting at `start`: the first operator or space
/// outside parentheses, or an unbalanced `)`.
fn chain_end(text: &str, start: usize) -> usize {
    let mut depth = 0usize;
    for (i, c) in text[start..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' if depth == 0 => return start + i,
            ')' => depth -= 1,
            ' ' | '=' | '!' | '<' | '>' | '&' | '|' | '+' | '-' | '*' | '/' | '%' if depth == 0 => {
                return start + i;
            }
            _ => {}
        }
    }
    text.len()
}

// ── Small utilities ───────────────────────────────────────────────────────────

/// Split on commas that are not nested inside `(…)` or `[…]`.
fn split_top_level(args: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in args.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&args[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&args[start..]);
    parts
}

/// `[+-]digits[.digits]`
fn is_number(text: &str) -> bool {
    let digits = text.strip_prefix(|c| c == '-' || c == '+').unwrap_or(text);
    let mut seen_digit = false;
    let mut seen_dot = false;
    for c in digits.chars() {
        match c {
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => return false,
        }
    }
    seen_digit
}

// ── Tests ─────────────────────────────────────────────────────────────────────
