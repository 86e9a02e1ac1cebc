//! Session variable store.
//!
//! Session variables are the string-valued globals scripts use to remember
//! progress between cutscenes (`session("met_bob").set(1)`).  Reading a
//! variable that was never written yields the empty string.

use std::collections::BTreeMap;

/// Session key/value variable store, ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VarStore {
    vars: BTreeMap<String, String>,
}

impl VarStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or overwrite) a variable.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    /// Get the string value of a variable.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Get the value of a variable, or `""` when it was never set.
    pub fn get_or_empty(&self, name: &str) -> &str {
        self.get(name).unwrap_or("")
    }

    /// Add `amount` to a numeric variable and return the new text.
    ///
    /// Missing or non-numeric values count as zero.  The result stays an
    /// integer unless either side has a fractional part.
    pub fn increment(&mut self, name: &str, amount: f64) -> String {
        let current: f64 = self.get_or_empty(name).trim().parse().unwrap_or(0.0);
        let sum = current + amount;
        let text = if sum.fract() == 0.0 && sum.abs() < 1e15 {
            format!("{}", sum as i64)
        } else {
            format!("{sum}")
        };
        self.set(name, text.clone());
        text
    }

    /// Names starting with `prefix`, in order.
    pub fn names_with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.vars
            .range(prefix.to_owned()..)
            .map(|(k, _)| k.as_str())
            .take_while(move |k| k.starts_with(prefix))
    }

    /// Iterate over all variables.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.vars.iter()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for VarStore {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.set(k, v);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get() {
        let mut vars = VarStore::new();
        vars.set("chapter", "1");
        assert_eq!(vars.get("chapter"), Some("1"));
        assert_eq!(vars.get_or_empty("missing"), "");
    }

    #[test]
    fn overwrite() {
        let mut vars = VarStore::new();
        vars.set("x", "old");
        vars.set("x", "new");
        assert_eq!(vars.get("x"), Some("new"));
        assert_eq!(vars.len(), 1);
    }

    #[test]
    fn increment_keeps_integers() {
        let mut vars = VarStore::new();
        assert_eq!(vars.increment("gold", 5.0), "5");
        assert_eq!(vars.increment("gold", 2.0), "7");
        assert_eq!(vars.increment("gold", 0.5), "7.5");
        vars.set("name", "bob");
        assert_eq!(vars.increment("name", 1.0), "1");
    }

    #[test]
    fn prefix_scan() {
        let mut vars = VarStore::new();
        vars.extend([("quest.a", "1"), ("quest.b", "2"), ("questline", "3"), ("z", "4")]);
        let names: Vec<&str> = vars.names_with_prefix("quest.").collect();
        assert_eq!(names, ["quest.a", "quest.b"]);
        assert_eq!(vars.names_with_prefix("").count(), 4);
    }
}
