//! Parsed form of a cue script.
//!
//! A [`Block`] is an ordered list of [`Statement`]s; each statement is a
//! chain of [`Link`]s joined by `.` in the source.  The tree is immutable once
//! built: all per-run progress lives in the evaluator, so one compiled block
//! can back any number of running scripts.

use std::fmt::{self, Write as _};

/// Which arm of an `if` / `elif` / `else` chain a conditional link is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionKind {
    If,
    Elif,
    Else,
}

impl ConditionKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "if" => Some(ConditionKind::If),
            "elif" => Some(ConditionKind::Elif),
            "else" => Some(ConditionKind::Else),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ConditionKind::If => "if",
            ConditionKind::Elif => "elif",
            ConditionKind::Else => "else",
        }
    }
}

/// One element of a statement chain.
#[derive(Debug, Clone, PartialEq)]
pub enum Link {
    /// `name(p1, p2, …)`; `simultaneous` is set by a leading `+`.
    Method {
        name: String,
        params: Vec<Statement>,
        simultaneous: bool,
    },
    /// The current `each` member (or the caller-supplied base value).
    This,
    /// `if(expr) { … }` and friends.
    ///
    /// Every call-shaped phrase inside the condition was lifted into
    /// `params`; `template` is the condition text with `@^statementN$@`
    /// (1-based) standing in for the Nth of them.
    Conditional {
        kind: ConditionKind,
        params: Vec<Statement>,
        template: String,
        body: Block,
    },
    /// `each(subject) { … }`
    Each { subject: Statement, body: Block },
    /// `range(from, to) { … }`
    Range {
        from: Statement,
        to: Statement,
        body: Block,
    },
    /// Bare literal text (numbers, quoted strings, identifiers).
    Constant(String),
    /// A `{ … }` object literal, kept as source text.
    Object(String),
}

impl Link {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Link::Method { .. } => "method",
            Link::This => "this",
            Link::Conditional { kind, .. } => kind.name(),
            Link::Each { .. } => "each",
            Link::Range { .. } => "range",
            Link::Constant(_) => "constant",
            Link::Object(_) => "object",
        }
    }
}

/// A chain of links.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statement {
    links: Vec<Link>,
}

impl Statement {
    pub fn new(links: Vec<Link>) -> Self {
        Self { links }
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn into_links(self) -> Vec<Link> {
        self.links
    }

    pub fn first(&self) -> Option<&Link> {
        self.links.first()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// True when the statement starts with a `+`-prefixed method.
    pub fn is_simultaneous(&self) -> bool {
        matches!(self.first(), Some(Link::Method { simultaneous: true, .. }))
    }

    /// True for `elif` / `else` statements, which are skipped once an
    /// earlier arm of the same chain was taken.
    pub fn is_alternative(&self) -> bool {
        matches!(
            self.first(),
            Some(Link::Conditional { kind: ConditionKind::Elif | ConditionKind::Else, .. })
        )
    }
}

/// An ordered statement list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    statements: Vec<Statement>,
}

impl Block {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Render the tree as an indented outline, one link per line.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = dump_block(&mut out, self, 0);
        out
    }
}

// ── Dump ──────────────────────────────────────────────────────────────────────

fn dump_block(out: &mut String, block: &Block, depth: usize) -> fmt::Result {
    for (i, stmt) in block.statements().iter().enumerate() {
        writeln!(out, "{:indent$}[{i}]", "", indent = depth * 2)?;
        dump_statement(out, stmt, depth + 1)?;
    }
    Ok(())
}

fn dump_statement(out: &mut String, stmt: &Statement, depth: usize) -> fmt::Result {
    for link in stmt.links() {
        dump_link(out, link, depth)?;
    }
    Ok(())
}

fn dump_link(out: &mut String, link: &Link, depth: usize) -> fmt::Result {
    let pad = depth * 2;
    match link {
        Link::Method { name, params, simultaneous } => {
            let plus = if *simultaneous { "+" } else { "" };
            writeln!(out, "{:pad$}method {plus}{name}", "")?;
            for param in params {
                writeln!(out, "{:pad$}  param", "")?;
                dump_statement(out, param, depth + 2)?;
            }
        }
        Link::This => writeln!(out, "{:pad$}this", "")?,
        Link::Conditional { kind, params, template, body } => {
            writeln!(out, "{:pad$}{} [{template}]", "", kind.name())?;
            for (i, param) in params.iter().enumerate() {
                writeln!(out, "{:pad$}  statement{}", "", i + 1)?;
                dump_statement(out, param, depth + 2)?;
            }
            dump_block(out, body, depth + 1)?;
        }
        Link::Each { subject, body } => {
            writeln!(out, "{:pad$}each", "")?;
            dump_statement(out, subject, depth + 2)?;
            dump_block(out, body, depth + 1)?;
        }
        Link::Range { from, to, body } => {
            writeln!(out, "{:pad$}range", "")?;
            dump_statement(out, from, depth + 2)?;
            dump_statement(out, to, depth + 2)?;
            dump_block(out, body, depth + 1)?;
        }
        Link::Constant(text) => writeln!(out, "{:pad$}constant {text}", "")?,
        Link::Object(text) => writeln!(out, "{:pad$}object {text}", "")?,
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
