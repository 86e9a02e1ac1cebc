//! Built-in session bridge.
//!
//! Provides the query objects every cue host gets for free:
//!
//! - `session(name)` → a session-variable object with `get([mode])`,
//!   `set(v)`, `setConcat(v…)`, `increment([n])`, `setRandomly(v…)`,
//!   `equals(v)` and `notEquals(v)`;
//! - `sessions(prefix)` → an enumerable group of the session variables whose
//!   names start with `prefix`, for use with `each(...)`;
//! - `debug(v…)` → writes a line to the script output (and the log);
//! - `frame()` → the calling statement's frame count.
//!
//! The mutating methods return the variable again so calls can chain:
//! `session("door").set(1).equals(1)`.

use log::info;
use rand::seq::SliceRandom;

use crate::bridge::{Call, Handle, QueryResult, Registry};
use crate::script::value::Value;
use crate::var::VarStore;

/// Object kind of a single session variable.
pub const SESSION: &str = "session";
/// Object kind of a prefix group of session variables.
pub const SESSIONS: &str = "sessions";

/// World state behind the session bridge.
#[derive(Debug, Default, Clone)]
pub struct Session {
    vars: VarStore,
    output: Vec<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vars(vars: VarStore) -> Self {
        Self { vars, output: Vec::new() }
    }

    pub fn vars(&self) -> &VarStore {
        &self.vars
    }

    pub fn vars_mut(&mut self) -> &mut VarStore {
        &mut self.vars
    }

    /// Lines written by `debug(...)` since the last call.
    pub fn take_output(&mut self) -> Vec<String> {
        std::mem::take(&mut self.output)
    }
}

/// The session bridge type.
pub type SessionBridge = Registry<Session>;

/// Build a registry with the session methods installed.  Hosts can keep
/// registering their own kinds on the returned registry.
pub fn session_bridge(session: Session) -> SessionBridge {
    let mut reg = Registry::new(session);
    reg.root("session", |_, call| match call.param(0) {
        Some(name) => QueryResult::Object(Handle::new(SESSION, name.as_str())),
        None => QueryResult::Absent,
    })
    .root("sessions", |_, call| QueryResult::Object(Handle::new(SESSIONS, call.param_str(0))))
    .root("debug", |session, call| {
        let line = call.params.iter().map(Value::as_str).collect::<Vec<_>>().join(" ");
        info!(target: "cue::script", "{line}");
        session.output.push(line);
        QueryResult::Absent
    })
    .root("frame", |_, call| QueryResult::Value(Value::Int(call.frame as i64)))
    .on(SESSION, "get", get)
    .on(SESSION, "set", |session, call| {
        update(session, call, |vars, name| vars.set(name, call.param_str(0)))
    })
    .on(SESSION, "setConcat", |session, call| {
        let joined: String = call.params.iter().map(Value::as_str).collect();
        update(session, call, |vars, name| vars.set(name, joined))
    })
    .on(SESSION, "increment", |session, call| {
        let amount = call.param(0).map_or(1.0, Value::as_float);
        update(session, call, |vars, name| {
            vars.increment(name, amount);
        })
    })
    .on(SESSION, "setRandomly", |session, call| {
        let picked = call.params.choose(&mut rand::thread_rng()).map(Value::as_str).unwrap_or_default();
        update(session, call, |vars, name| vars.set(name, picked))
    })
    .on(SESSION, "equals", |session, call| compare(session, call, true))
    .on(SESSION, "notEquals", |session, call| compare(session, call, false))
    .members_of(SESSIONS, |session, group| {
        session
            .vars
            .names_with_prefix(group.id())
            .map(|name| Value::Handle(Handle::new(SESSION, name)))
            .collect()
    });
    reg
}

// ── Session methods ───────────────────────────────────────────────────────────

/// `get()` / `get("string")`: numbers as-is, other text single-quoted so it
/// can be compared inside a condition.  `get("unwrapped")`: raw text.
/// `get("integer")`: the numeric value, or 0.
fn get(session: &mut Session, call: &Call<'_>) -> QueryResult {
    let Some(target) = call.target else {
        return QueryResult::Absent;
    };
    let raw = session.vars.get_or_empty(target.id());
    let value = match call.param_str(0).as_str() {
        "unwrapped" => Value::Str(raw.to_owned()),
        "integer" => numeric(raw).unwrap_or(Value::Int(0)),
        _ if numeric(raw).is_some() => Value::Str(raw.to_owned()),
        _ => Value::Str(format!("'{}'", raw.replace('\'', "\\'"))),
    };
    QueryResult::Value(value)
}

fn update<F>(session: &mut Session, call: &Call<'_>, apply: F) -> QueryResult
where
    F: FnOnce(&mut VarStore, &str),
{
    match call.target {
        Some(target) => {
            apply(&mut session.vars, target.id());
            QueryResult::Object(target.clone())
        }
        None => QueryResult::Absent,
    }
}

fn compare(session: &Session, call: &Call<'_>, want_equal: bool) -> QueryResult {
    match call.target {
        Some(target) => {
            let same = session.vars.get_or_empty(target.id()) == call.param_str(0);
            QueryResult::from(same == want_equal)
        }
        None => QueryResult::Absent,
    }
}

fn numeric(raw: &str) -> Option<Value> {
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<i64>() {
        return Some(Value::Int(n));
    }
    raw.parse::<f64>().ok().filter(|x| x.is_finite()).map(Value::Float)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::QueryBridge;

    fn resolve(reg: &mut SessionBridge, target: Option<&Handle>, method: &str, params: &[Value]) -> QueryResult {
        reg.resolve(&Call { target, method, params, frame: 1 })
    }

    fn var(name: &str) -> Handle {
        Handle::new(SESSION, name)
    }

    #[test]
    fn session_root_returns_handle() {
        let mut reg = session_bridge(Session::new());
        let r = resolve(&mut reg, None, "session", &[Value::from("gold")]);
        assert_eq!(r, QueryResult::Object(var("gold")));
        assert_eq!(resolve(&mut reg, None, "session", &[]), QueryResult::Absent);
    }

    #[test]
    fn get_modes() {
        let mut reg = session_bridge(Session::new());
        reg.world_mut().vars_mut().extend([("n", "3"), ("s", "bob")]);
        let n = var("n");
        let s = var("s");
        assert_eq!(resolve(&mut reg, Some(&n), "get", &[]), QueryResult::from(Value::from("3")));
        assert_eq!(resolve(&mut reg, Some(&s), "get", &[]), QueryResult::from(Value::from("'bob'")));
        assert_eq!(
            resolve(&mut reg, Some(&s), "get", &[Value::from("unwrapped")]),
            QueryResult::from(Value::from("bob"))
        );
        assert_eq!(resolve(&mut reg, Some(&n), "get", &[Value::from("integer")]), QueryResult::from(Value::Int(3)));
        assert_eq!(resolve(&mut reg, Some(&s), "get", &[Value::from("integer")]), QueryResult::from(Value::Int(0)));
        assert_eq!(resolve(&mut reg, Some(&var("none")), "get", &[]), QueryResult::from(Value::from("''")));
    }

    #[test]
    fn mutators_chain() {
        let mut reg = session_bridge(Session::new());
        let h = var("x");
        assert_eq!(resolve(&mut reg, Some(&h), "set", &[Value::Int(4)]), QueryResult::Object(h.clone()));
        assert_eq!(resolve(&mut reg, Some(&h), "increment", &[Value::Int(2)]), QueryResult::Object(h.clone()));
        assert_eq!(reg.world().vars().get("x"), Some("6"));
        resolve(&mut reg, Some(&h), "increment", &[]);
        assert_eq!(reg.world().vars().get("x"), Some("7"));
        resolve(&mut reg, Some(&h), "setConcat", &[Value::from("a"), Value::Int(1), Value::from("b")]);
        assert_eq!(reg.world().vars().get("x"), Some("a1b"));
    }

    #[test]
    fn set_randomly_picks_a_candidate() {
        let mut reg = session_bridge(Session::new());
        let h = var("pick");
        let options = [Value::from("red"), Value::from("green"), Value::from("blue")];
        for _ in 0..10 {
            resolve(&mut reg, Some(&h), "setRandomly", &options);
            let got = reg.world().vars().get("pick").unwrap_or_default().to_owned();
            assert!(["red", "green", "blue"].contains(&got.as_str()));
        }
        resolve(&mut reg, Some(&h), "setRandomly", &[]);
        assert_eq!(reg.world().vars().get("pick"), Some(""));
    }

    #[test]
    fn equality() {
        let mut reg = session_bridge(Session::new());
        reg.world_mut().vars_mut().set("k", "1");
        let h = var("k");
        assert_eq!(resolve(&mut reg, Some(&h), "equals", &[Value::Int(1)]), QueryResult::from(true));
        assert_eq!(resolve(&mut reg, Some(&h), "notEquals", &[Value::Int(1)]), QueryResult::from(false));
        assert_eq!(resolve(&mut reg, Some(&h), "equals", &[Value::from("2")]), QueryResult::from(false));
    }

    #[test]
    fn sessions_enumerate_by_prefix() {
        let mut reg = session_bridge(Session::new());
        reg.world_mut().vars_mut().extend([("q.a", "1"), ("q.b", "0"), ("other", "x")]);
        let group = Handle::new(SESSIONS, "q.");
        assert_eq!(reg.members(&group), vec![Value::Handle(var("q.a")), Value::Handle(var("q.b"))]);
    }

    #[test]
    fn debug_collects_output() {
        let mut reg = session_bridge(Session::new());
        resolve(&mut reg, None, "debug", &[Value::from("hello"), Value::Int(2)]);
        assert_eq!(reg.world_mut().take_output(), ["hello 2"]);
        assert!(reg.world_mut().take_output().is_empty());
    }

    #[test]
    fn frame_is_reported() {
        let mut reg = session_bridge(Session::new());
        let r = reg.resolve(&Call { target: None, method: "frame", params: &[], frame: 9 });
        assert_eq!(r, QueryResult::from(Value::Int(9)));
    }
}
