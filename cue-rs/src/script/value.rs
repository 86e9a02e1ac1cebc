//! Runtime value type for cue scripts.
//!
//! Script values are loosely typed: constants arrive as text, bridge methods
//! hand back numbers, strings, or handles to further query objects, and the
//! condition evaluator coerces freely between them.

use std::collections::BTreeMap;
use std::fmt;

use crate::bridge::Handle;

/// A cue runtime value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    /// Reference to a bridge-side query object.
    Handle(Handle),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Default for Value {
    fn default() -> Self {
        Value::Str(String::new())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => {
                if x.fract() == 0.0 && x.abs() < 1e15 {
                    write!(f, "{:.1}", x)
                } else {
                    write!(f, "{x}")
                }
            }
            Value::Str(s) => write!(f, "{s}"),
            Value::Handle(h) => write!(f, "{h}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (key, item)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {item}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl Value {
    /// Coerce to boolean: `0`, `""`, `"0"` and empty collections are falsy.
    pub fn as_bool(&self) -> bool {
        match self {
            Value::Int(n) => *n != 0,
            Value::Float(x) => *x != 0.0,
            Value::Str(s) => !s.is_empty() && s != "0",
            Value::Handle(_) => true,
            Value::List(items) => !items.is_empty(),
            Value::Map(entries) => !entries.is_empty(),
        }
    }

    /// Coerce to `i64` (0 when the value is not numeric).
    pub fn as_int(&self) -> i64 {
        match self {
            Value::Int(n) => *n,
            Value::Float(x) => *x as i64,
            Value::Str(s) => {
                let s = s.trim();
                s.parse()
                    .unwrap_or_else(|_| s.parse::<f64>().map(|x| x as i64).unwrap_or(0))
            }
            _ => 0,
        }
    }

    /// Coerce to `f64` (0.0 when the value is not numeric).
    pub fn as_float(&self) -> f64 {
        self.numeric().unwrap_or(0.0)
    }

    /// Coerce to a string.
    pub fn as_str(&self) -> String {
        self.to_string()
    }

    /// The numeric reading of this value, if it has one.
    pub fn numeric(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(x) => Some(*x),
            Value::Str(s) => s.trim().parse().ok().filter(|x: &f64| x.is_finite()),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "integer",
            Value::Float(_) => "real",
            Value::Str(_) => "string",
            Value::Handle(_) => "object",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    // ── Arithmetic helpers ────────────────────────────────────────────────────

    /// Determine the common numeric type for a binary operation.
    fn numeric_promote(a: &Value, b: &Value) -> (f64, f64, bool) {
        let is_float = matches!(a, Value::Float(_))
            || matches!(b, Value::Float(_))
            || matches!(a, Value::Str(s) if s.contains('.'))
            || matches!(b, Value::Str(s) if s.contains('.'));
        (a.as_float(), b.as_float(), is_float)
    }

    fn make_numeric(f: f64, is_float: bool) -> Value {
        if is_float {
            Value::Float(f)
        } else {
            Value::Int(f as i64)
        }
    }

    /// Addition; concatenates when either side is a non-numeric string.
    pub fn arith_add(&self, rhs: &Value) -> Value {
        let textual = |v: &Value| matches!(v, Value::Str(_)) && v.numeric().is_none();
        if textual(self) || textual(rhs) {
            return Value::Str(format!("{self}{rhs}"));
        }
        let (a, b, is_float) = Self::numeric_promote(self, rhs);
        Self::make_numeric(a + b, is_float)
    }

    pub fn arith_sub(&self, rhs: &Value) -> Value {
        let (a, b, is_float) = Self::numeric_promote(self, rhs);
        Self::make_numeric(a - b, is_float)
    }

    pub fn arith_mul(&self, rhs: &Value) -> Value {
        let (a, b, is_float) = Self::numeric_promote(self, rhs);
        Self::make_numeric(a * b, is_float)
    }

    pub fn arith_div(&self, rhs: &Value) -> Result<Value, String> {
        let (a, b, is_float) = Self::numeric_promote(self, rhs);
        if b == 0.0 {
            return Err("division by zero".into());
        }
        Ok(Self::make_numeric(a / b, is_float))
    }

    pub fn arith_rem(&self, rhs: &Value) -> Result<Value, String> {
        let (a, b, is_float) = Self::numeric_promote(self, rhs);
        if b == 0.0 {
            return Err("modulo by zero".into());
        }
        Ok(Self::make_numeric(a % b, is_float))
    }

    pub fn arith_neg(&self) -> Value {
        match self {
            Value::Int(n) => Value::Int(-n),
            Value::Float(x) => Value::Float(-x),
            Value::Str(s) => {
                if let Ok(n) = s.trim().parse::<i64>() {
                    Value::Int(-n)
                } else if let Ok(x) = s.trim().parse::<f64>() {
                    Value::Float(-x)
                } else {
                    Value::Int(0)
                }
            }
            _ => Value::Int(0),
        }
    }

    /// Relational comparison: numeric when both sides are numeric, textual
    /// otherwise.
    pub fn cmp_value(&self, rhs: &Value) -> std::cmp::Ordering {
        match (self.numeric(), rhs.numeric()) {
            (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal),
            _ => self.as_str().cmp(&rhs.as_str()),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Int(if b { 1 } else { 0 })
    }
}

impl From<Handle> for Value {
    fn from(h: Handle) -> Self {
        Value::Handle(h)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_scalars() {
        assert_eq!(Value::Int(-7).to_string(), "-7");
        assert_eq!(Value::Float(1.0).to_string(), "1.0");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
        assert_eq!(Value::Str("hello".into()).to_string(), "hello");
    }

    #[test]
    fn display_collections() {
        let list = Value::List(vec![Value::Int(1), Value::Str("a".into())]);
        assert_eq!(list.to_string(), "[1, a]");
        let mut map = BTreeMap::new();
        map.insert("x".to_owned(), Value::Int(1));
        assert_eq!(Value::Map(map).to_string(), "{x: 1}");
    }

    #[test]
    fn as_bool() {
        assert!(Value::Int(1).as_bool());
        assert!(!Value::Int(0).as_bool());
        assert!(!Value::Str("".into()).as_bool());
        assert!(!Value::Str("0".into()).as_bool());
        assert!(Value::Handle(Handle::new("npc", "bob")).as_bool());
        assert!(!Value::List(Vec::new()).as_bool());
    }

    #[test]
    fn as_int_coercions() {
        assert_eq!(Value::Float(3.9).as_int(), 3);
        assert_eq!(Value::Str("42".into()).as_int(), 42);
        assert_eq!(Value::Str("2.5".into()).as_int(), 2);
        assert_eq!(Value::Str("abc".into()).as_int(), 0);
    }

    #[test]
    fn add_concatenates_text() {
        let a = Value::Str("wave".into());
        assert_eq!(a.arith_add(&Value::Int(2)), Value::Str("wave2".into()));
        assert_eq!(Value::Str("2".into()).arith_add(&Value::Int(3)), Value::Int(5));
    }

    #[test]
    fn arithmetic() {
        let a = Value::Int(10);
        let b = Value::Int(3);
        assert_eq!(a.arith_sub(&b), Value::Int(7));
        assert_eq!(a.arith_mul(&b), Value::Int(30));
        assert_eq!(a.arith_div(&b), Ok(Value::Int(3)));
        assert_eq!(a.arith_rem(&b), Ok(Value::Int(1)));
        assert!(a.arith_div(&Value::Int(0)).is_err());
    }

    #[test]
    fn compare_mixed() {
        use std::cmp::Ordering;
        assert_eq!(Value::Str("10".into()).cmp_value(&Value::Int(9)), Ordering::Greater);
        assert_eq!(Value::Str("abc".into()).cmp_value(&Value::Str("abd".into())), Ordering::Less);
    }
}
