//! Delimiter extraction.
//!
//! The preprocessor and the statement parser both work by temporarily hiding
//! delimited regions (string literals, parameter lists, bracketed blocks)
//! behind opaque placeholder tokens so that splitting on `;`, `.` or `,`
//! never cuts through them.  A placeholder looks like `@^tag:N$@`; the
//! original text is kept in a [`PlaceholderTable`] and put back later by
//! [`PlaceholderTable::restore`].

use aho_corasick::AhoCorasickBuilder;

use super::error::ParseError;

/// Maps generated placeholder names back to the text they replaced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceholderTable {
    tag: &'static str,
    entries: Vec<(String, String)>,
}

impl PlaceholderTable {
    pub fn new(tag: &'static str) -> Self {
        Self { tag, entries: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, original: String) -> String {
        let name = format!("@^{}:{}$@", self.tag, self.entries.len());
        self.entries.push((name.clone(), original));
        name
    }

    /// Substitute every placeholder in `text` with its original.
    ///
    /// All names are replaced in one left-to-right pass, so `@^s:1$@` never
    /// clobbers part of `@^s:10$@`.
    pub fn restore(&self, text: &str) -> String {
        if self.is_empty() || !text.contains("@^") {
            return text.to_owned();
        }
        let names: Vec<&str> = self.entries.iter().map(|(n, _)| n.as_str()).collect();
        let originals: Vec<&str> = self.entries.iter().map(|(_, o)| o.as_str()).collect();
        let automaton = AhoCorasickBuilder::new().build(&names);
        automaton.replace_all(text, &originals)
    }
}

/// Find the byte index of the `close` that balances the `open` at `open_at`.
///
/// Nested `open`s raise the depth.  A `close` immediately preceded by a
/// backslash is ignored.  When `open == close` (quotes) nesting is
/// impossible and the first unescaped `close` wins.
pub fn find_close(text: &str, open_at: usize, open: char, close: char) -> Option<usize> {
    let body = open_at + open.len_utf8();
    let mut depth = 0usize;
    let mut prev = '\0';
    for (i, c) in text[body..].char_indices() {
        if c == close {
            if prev == '\\' {
                // escaped: neither closes nor unwinds
            } else if depth == 0 {
                return Some(body + i);
            } else {
                depth -= 1;
            }
        } else if c == open {
            depth += 1;
        }
        prev = c;
    }
    None
}

/// Hide `'…'` literals, as written in conditions.
///
/// A span reaching across a `;` or a line break is not a literal; its
/// opening `'` is left in place as an apostrophe.
pub fn hide_quoted(text: &str, table: &mut PlaceholderTable) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find('\'') {
        let literal = find_close(rest, open, '\'', '\'')
            .map(|close| &rest[open..=close])
            .filter(|span| !span.contains(|c| c == ';' || c == '\n'));
        match literal {
            Some(span) => {
                out.push_str(&rest[..open]);
                out.push_str(&table.insert(span.to_owned()));
                rest = &rest[open + span.len()..];
            }
            None => {
                out.push_str(&rest[..=open]);
                rest = &rest[open + 1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Replace every top-level `open … close` region of `text` with a fresh
/// placeholder from `table`.
///
/// With `inclusive` the delimiters themselves are hidden along with the
/// body; otherwise only the body is, and the delimiters stay in the output.
/// `suffix` is inserted right after each placeholder (the preprocessor uses
/// `";"` to terminate bracketed blocks).  Scanning resumes after the
/// inserted text, so placeholder contents are never rescanned.
pub fn extract(
    open: char,
    close: char,
    text: &str,
    table: &mut PlaceholderTable,
    inclusive: bool,
    suffix: &str,
) -> Result<String, ParseError> {
    let mut out = text.to_owned();
    let mut from = 0;
    while let Some(rel) = out[from..].find(open) {
        let start = from + rel;
        let end = find_close(&out, start, open, close)
            .ok_or_else(|| ParseError::unterminated(open, close, &out[start..]))?;
        let (span_start, span_end) = if inclusive {
            (start, end + close.len_utf8())
        } else {
            (start + open.len_utf8(), end)
        };
        let name = table.insert(out[span_start..span_end].to_owned());

        let mut rewritten = String::with_capacity(out.len() + name.len() + suffix.len());
        rewritten.push_str(&out[..span_start]);
        rewritten.push_str(&name);
        rewritten.push_str(suffix);
        rewritten.push_str(&out[span_end..]);

        from = span_start + name.len() + suffix.len();
        if !inclusive {
            from += close.len_utf8();
        }
        out = rewritten;
    }
    Ok(out)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strings_are_hidden() {
        let mut t = PlaceholderTable::new("string");
        let out = extract('"', '"', r#"say("hi; there")"#, &mut t, true, "").unwrap();
        assert_eq!(out, "say(@^string:0$@)");
        assert_eq!(t.restore("@^string:0$@"), "\"hi; there\"");
    }

    #[test]
    fn nested_parens_stay_together() {
        let mut t = PlaceholderTable::new("params");
        let out = extract('(', ')', "f(g(1,2),3).h()", &mut t, true, "").unwrap();
        assert_eq!(out, "f@^params:0$@.h@^params:1$@");
        assert_eq!(t.len(), 2);
        assert_eq!(t.restore("@^params:0$@"), "(g(1,2),3)");
        assert_eq!(t.restore("@^params:1$@"), "()");
    }

    #[test]
    fn suffix_follows_placeholder() {
        let mut t = PlaceholderTable::new("subscript");
        let out = extract('{', '}', "if(x){a();b()}c()", &mut t, true, ";").unwrap();
        assert_eq!(out, "if(x)@^subscript:0$@;c()");
    }

    #[test]
    fn escaped_close_is_skipped() {
        let mut t = PlaceholderTable::new("string");
        let out = extract('"', '"', r#"a("x\"y") b"#, &mut t, true, "").unwrap();
        assert_eq!(out, "a(@^string:0$@) b");
        assert_eq!(t.restore("@^string:0$@"), r#""x\"y""#);
    }

    #[test]
    fn single_quoted_literals_are_hidden() {
        let mut t = PlaceholderTable::new("string");
        let out = hide_quoted("a() == 'x(y' and b() != ''", &mut t);
        assert_eq!(out, "a() == @^string:0$@ and b() != @^string:1$@");
        assert_eq!(t.restore(&out), "a() == 'x(y' and b() != ''");
    }

    #[test]
    fn apostrophes_are_left_alone() {
        let mut t = PlaceholderTable::new("string");
        assert_eq!(hide_quoted("say(it's)", &mut t), "say(it's)");
        assert_eq!(hide_quoted("say(it's); say(we're)", &mut t), "say(it's); say(we're)");
        assert!(t.is_empty());
    }

    #[test]
    fn exclusive_keeps_delimiters() {
        let mut t = PlaceholderTable::new("string");
        let out = extract('"', '"', r#""a" + "b""#, &mut t, false, "").unwrap();
        assert_eq!(out, r#""@^string:0$@" + "@^string:1$@""#);
        assert_eq!(t.restore(&out), r#""a" + "b""#);
    }

    #[test]
    fn table_is_shared_across_passes() {
        let mut t = PlaceholderTable::new("string");
        let first = extract('"', '"', r#""a""#, &mut t, true, "").unwrap();
        let second = extract('"', '"', r#""b""#, &mut t, true, "").unwrap();
        assert_eq!(first, "@^string:0$@");
        assert_eq!(second, "@^string:1$@");
    }

    #[test]
    fn unterminated_is_an_error() {
        let mut t = PlaceholderTable::new("params");
        let err = extract('(', ')', "f(1, g(2)", &mut t, true, "").unwrap_err();
        assert!(matches!(err, ParseError::Unterminated { open: '(', .. }));
    }

    #[test]
    fn restore_handles_many_entries() {
        let mut t = PlaceholderTable::new("s");
        let src: String = (0..12).map(|i| format!("\"{i}\"")).collect::<Vec<_>>().join(",");
        let hidden = extract('"', '"', &src, &mut t, true, "").unwrap();
        assert!(hidden.contains("@^s:11$@"));
        assert_eq!(t.restore(&hidden), src);
    }

    #[test]
    fn no_delimiters_is_identity() {
        let mut t = PlaceholderTable::new("s");
        assert_eq!(extract('(', ')', "plain text", &mut t, true, ";").unwrap(), "plain text");
        assert!(t.is_empty());
    }
}
