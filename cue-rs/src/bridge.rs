//! The object query bridge.
//!
//! Scripts never touch game state directly.  Every method link is turned
//! into a [`Call`] and handed to a [`QueryBridge`], which answers with a
//! [`QueryResult`]: another query object to keep chaining on, a plain value,
//! or "not yet" / "nothing".
//!
//! [`Registry`] is a ready-made bridge that dispatches on
//! `(object kind, method name)` to boxed closures over some world type `W`.

use std::collections::HashMap;
use std::fmt;

use log::debug;

use crate::script::value::Value;

/// Kind used for calls that start a chain (no target object).
pub const ROOT: &str = "root";

// ── Handle ────────────────────────────────────────────────────────────────────

/// Opaque reference to a bridge-side query object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle {
    kind: String,
    id: String,
}

impl Handle {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self { kind: kind.into(), id: id.into() }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

// ── Call / QueryResult ────────────────────────────────────────────────────────

/// One method invocation as seen by the bridge.
#[derive(Debug, Clone, Copy)]
pub struct Call<'a> {
    /// Object the method is called on; `None` for the head of a chain.
    pub target: Option<&'a Handle>,
    pub method: &'a str,
    /// Already-evaluated arguments.
    pub params: &'a [Value],
    /// How many frames the calling statement has been evaluated for,
    /// counting the current one.
    pub frame: u64,
}

impl<'a> Call<'a> {
    pub fn param(&self, index: usize) -> Option<&'a Value> {
        self.params.get(index)
    }

    /// Argument `index` as text (empty when missing).
    pub fn param_str(&self, index: usize) -> String {
        self.param(index).map(Value::as_str).unwrap_or_default()
    }

    /// Argument `index` as an integer (0 when missing).
    pub fn param_int(&self, index: usize) -> i64 {
        self.param(index).map(Value::as_int).unwrap_or(0)
    }
}

/// What the bridge answers to a [`Call`].
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    /// A query object; the chain may continue on it.
    Object(Handle),
    /// A terminal value.
    Value(Value),
    /// The action has not completed yet; ask again next frame.
    Pending,
    /// No answer (unknown method, nothing to return).
    Absent,
}

impl QueryResult {
    /// Value reading of the result.  Objects become [`Value::Handle`].
    pub fn into_value(self) -> Option<Value> {
        match self {
            QueryResult::Object(h) => Some(Value::Handle(h)),
            QueryResult::Value(v) => Some(v),
            QueryResult::Pending | QueryResult::Absent => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, QueryResult::Pending)
    }
}

impl From<Value> for QueryResult {
    fn from(v: Value) -> Self {
        QueryResult::Value(v)
    }
}

impl From<Handle> for QueryResult {
    fn from(h: Handle) -> Self {
        QueryResult::Object(h)
    }
}

impl From<bool> for QueryResult {
    fn from(b: bool) -> Self {
        QueryResult::Value(Value::from(b))
    }
}

// ── QueryBridge ───────────────────────────────────────────────────────────────

/// The host side of script evaluation.
pub trait QueryBridge {
    /// Resolve one method call.
    fn resolve(&mut self, call: &Call<'_>) -> QueryResult;

    /// Enumerate the members of a query object for `each(...)`.
    fn members(&mut self, handle: &Handle) -> Vec<Value> {
        let _ = handle;
        Vec::new()
    }
}

// ── Registry ──────────────────────────────────────────────────────────────────

/// Method implementation stored in a [`Registry`].
pub type Handler<W> = Box<dyn FnMut(&mut W, &Call<'_>) -> QueryResult>;

/// Member enumerator stored in a [`Registry`].
pub type Enumerator<W> = Box<dyn Fn(&W, &Handle) -> Vec<Value>>;

/// A [`QueryBridge`] dispatching on `(kind, method)` into a world `W`.
///
/// Calls without a target use the [`ROOT`] kind.  Unregistered pairs
/// resolve to [`QueryResult::Absent`].
pub struct Registry<W> {
    world: W,
    methods: HashMap<String, HashMap<String, Handler<W>>>,
    enumerators: HashMap<String, Enumerator<W>>,
}

impl<W> Registry<W> {
    pub fn new(world: W) -> Self {
        Self { world, methods: HashMap::new(), enumerators: HashMap::new() }
    }

    /// Register `method` on objects of `kind`.
    pub fn on<F>(&mut self, kind: &str, method: &str, handler: F) -> &mut Self
    where
        F: FnMut(&mut W, &Call<'_>) -> QueryResult + 'static,
    {
        self.methods
            .entry(kind.to_owned())
            .or_default()
            .insert(method.to_owned(), Box::new(handler));
        self
    }

    /// Register a chain-head method (kind [`ROOT`]).
    pub fn root<F>(&mut self, method: &str, handler: F) -> &mut Self
    where
        F: FnMut(&mut W, &Call<'_>) -> QueryResult + 'static,
    {
        self.on(ROOT, method, handler)
    }

    /// Register how `each(...)` enumerates objects of `kind`.
    pub fn members_of<F>(&mut self, kind: &str, enumerate: F) -> &mut Self
    where
        F: Fn(&W, &Handle) -> Vec<Value> + 'static,
    {
        self.enumerators.insert(kind.to_owned(), Box::new(enumerate));
        self
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }
}

impl<W> QueryBridge for Registry<W> {
    fn resolve(&mut self, call: &Call<'_>) -> QueryResult {
        let kind = call.target.map(Handle::kind).unwrap_or(ROOT);
        match self.methods.get_mut(kind).and_then(|m| m.get_mut(call.method)) {
            Some(handler) => handler(&mut self.world, call),
            None => {
                debug!("no method `{}` on `{kind}`", call.method);
                QueryResult::Absent
            }
        }
    }

    fn members(&mut self, handle: &Handle) -> Vec<Value> {
        match self.enumerators.get(handle.kind()) {
            Some(enumerate) => enumerate(&self.world, handle),
            None => {
                debug!("`{}` objects cannot be enumerated", handle.kind());
                Vec::new()
            }
        }
    }
}

impl<W: fmt::Debug> fmt::Debug for Registry<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&String> = self.methods.keys().collect();
        kinds.sort();
        f.debug_struct("Registry")
            .field("world", &self.world)
            .field("kinds", &kinds)
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn call<'a>(target: Option<&'a Handle>, method: &'a str, params: &'a [Value]) -> Call<'a> {
        Call { target, method, params, frame: 1 }
    }

    #[test]
    fn dispatch_by_kind() {
        let mut reg = Registry::new(0i64);
        reg.root("npc", |_, c| QueryResult::Object(Handle::new("npc", c.param_str(0))))
            .on("npc", "poke", |n, _| {
                *n += 1;
                QueryResult::from(true)
            });

        let head = reg.resolve(&call(None, "npc", &[Value::from("bob")]));
        assert_eq!(head, QueryResult::Object(Handle::new("npc", "bob")));

        let bob = Handle::new("npc", "bob");
        assert_eq!(reg.resolve(&call(Some(&bob), "poke", &[])), QueryResult::from(true));
        assert_eq!(*reg.world(), 1);
    }

    #[test]
    fn unknown_method_is_absent() {
        let mut reg = Registry::new(());
        assert_eq!(reg.resolve(&call(None, "nope", &[])), QueryResult::Absent);
        let h = Handle::new("npc", "x");
        assert_eq!(reg.resolve(&call(Some(&h), "nope", &[])), QueryResult::Absent);
    }

    #[test]
    fn members_default_to_empty() {
        let mut reg = Registry::new(vec!["a", "b"]);
        let h = Handle::new("party", "");
        assert!(reg.members(&h).is_empty());
        reg.members_of("party", |w, _| w.iter().map(|s| Value::from(*s)).collect());
        assert_eq!(reg.members(&h), vec![Value::from("a"), Value::from("b")]);
    }

    #[test]
    fn call_param_helpers() {
        let params = [Value::from("3"), Value::Int(7)];
        let c = call(None, "m", &params);
        assert_eq!(c.param_int(0), 3);
        assert_eq!(c.param_str(1), "7");
        assert_eq!(c.param_str(5), "");
        assert_eq!(c.param_int(5), 0);
    }

    #[test]
    fn handle_display() {
        assert_eq!(Handle::new("session", "gold").to_string(), "session:gold");
    }
}
