//! Frame-driven script evaluation.
//!
//! A [`Script`] pairs an immutable, shareable [`Block`] with the mutable
//! progress of one run: the statement cursor, per-statement frame counters,
//! cached condition outcomes, `each` member scripts and `range` counters.
//! The host calls [`Script::run`] once per frame; it evaluates statements
//! until one reports that it is still in progress, and returns `true` once
//! the cursor has passed the last statement.
//!
//! Statement outcomes:
//!
//! | status                   | cursor effect                                  |
//! |--------------------------|------------------------------------------------|
//! | `Done`, `ConditionNotMet`| advance                                        |
//! | `ConditionMet`           | advance past any following `elif` / `else`     |
//! | `Pending`                | stay; run trailing `+` statements once, yield  |
//! | `ConditionMetButPending` | stay; yield                                    |

use std::sync::Arc;

use log::{debug, trace, warn};

use super::ast::{Block, Link, Statement};
use super::error::ParseError;
use super::expr;
use super::parser::{parse_block, statement_marker};
use super::value::Value;
use crate::bridge::{Call, QueryBridge, QueryResult};

/// Outcome of evaluating one statement for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Still in progress; evaluate again next frame.
    Pending,
    /// Finished.
    Done,
    /// Condition true and its body has completed.
    ConditionMet,
    /// Condition true (or iteration running) but the body is not finished.
    ConditionMetButPending,
    /// Condition false.
    ConditionNotMet,
}

impl Status {
    /// Whether the run loop has to yield on this status.
    pub fn blocks(self) -> bool {
        matches!(self, Status::Pending | Status::ConditionMetButPending)
    }
}

// ── Script ────────────────────────────────────────────────────────────────────

/// A runnable instance of a compiled block.
#[derive(Debug, Clone)]
pub struct Script {
    block: Arc<Block>,
    state: BlockState,
}

impl Script {
    /// Compile `src` into a fresh script.
    pub fn parse(src: &str) -> Result<Self, ParseError> {
        Ok(Self::new(Arc::new(parse_block(src)?)))
    }

    /// A fresh run over an already compiled block.
    pub fn new(block: Arc<Block>) -> Self {
        let state = BlockState::new(&block);
        Self { block, state }
    }

    pub fn block(&self) -> &Arc<Block> {
        &self.block
    }

    /// Index of the statement the next frame resumes at.
    pub fn cursor(&self) -> usize {
        self.state.cursor
    }

    pub fn len(&self) -> usize {
        self.block.len()
    }

    pub fn is_empty(&self) -> bool {
        self.block.is_empty()
    }

    pub fn is_finished(&self) -> bool {
        self.state.cursor >= self.block.len()
    }

    /// Rewind to the first statement and forget all per-run state.
    pub fn reset(&mut self) {
        self.state.reset();
    }

    /// Evaluate the statement under the cursor once and move the cursor
    /// accordingly.  Returns `None` when the script is already finished.
    pub fn step(&mut self, bridge: &mut dyn QueryBridge, base: Option<&Value>) -> Option<Status> {
        self.state.step(&self.block, bridge, base)
    }

    /// Run one frame.  Returns `true` once every statement has completed.
    pub fn run(&mut self, bridge: &mut dyn QueryBridge, base: Option<&Value>) -> bool {
        self.state.run(&self.block, bridge, base)
    }
}

// ── Run state ─────────────────────────────────────────────────────────────────

/// Progress through one block; mirrors the block's statement list.
#[derive(Debug, Clone)]
struct BlockState {
    cursor: usize,
    statements: Vec<StatementState>,
}

#[derive(Debug, Clone)]
struct StatementState {
    /// Frames this statement has been evaluated for.
    frames: u64,
    link: LinkState,
}

#[derive(Debug, Clone)]
enum LinkState {
    Plain,
    Conditional {
        cached: Option<bool>,
        body: BlockState,
    },
    Each {
        /// Filled on first evaluation; one sub-run per distinct member.
        members: Option<Vec<(Value, BlockState)>>,
    },
    Range {
        /// `(low, high)` fixed on first evaluation.
        bounds: Option<(i64, i64)>,
        counter: i64,
        body: BlockState,
    },
}

impl BlockState {
    fn new(block: &Block) -> Self {
        Self {
            cursor: 0,
            statements: block.statements().iter().map(StatementState::new).collect(),
        }
    }

    fn reset(&mut self) {
        self.cursor = 0;
        for statement in &mut self.statements {
            statement.reset();
        }
    }

    fn step(
        &mut self,
        block: &Block,
        bridge: &mut dyn QueryBridge,
        base: Option<&Value>,
    ) -> Option<Status> {
        let statements = block.statements();
        let index = self.cursor;
        let statement = statements.get(index)?;
        let status = self.statements[index].evaluate(statement, bridge, base);
        trace!("statement {index}: {status:?}");

        match status {
            Status::Pending => {
                // `+` statements right after a blocking one tick alongside it.
                let mut ahead = index + 1;
                while ahead < statements.len() && statements[ahead].is_simultaneous() {
                    self.statements[ahead].evaluate(&statements[ahead], bridge, base);
                    ahead += 1;
                }
            }
            Status::ConditionMet => {
                self.cursor += 1;
                while self.cursor < statements.len() && statements[self.cursor].is_alternative() {
                    self.cursor += 1;
                }
            }
            Status::ConditionMetButPending => {}
            Status::Done | Status::ConditionNotMet => self.cursor += 1,
        }
        Some(status)
    }

    fn run(&mut self, block: &Block, bridge: &mut dyn QueryBridge, base: Option<&Value>) -> bool {
        loop {
            match self.step(block, bridge, base) {
                None => return true,
                Some(status) if status.blocks() => return false,
                Some(_) => {}
            }
        }
    }
}

impl StatementState {
    fn new(statement: &Statement) -> Self {
        let link = match statement.first() {
            Some(Link::Conditional { body, .. }) => {
                LinkState::Conditional { cached: None, body: BlockState::new(body) }
            }
            Some(Link::Each { .. }) => LinkState::Each { members: None },
            Some(Link::Range { body, .. }) => {
                LinkState::Range { bounds: None, counter: 0, body: BlockState::new(body) }
            }
            _ => LinkState::Plain,
        };
        Self { frames: 0, link }
    }

    fn reset(&mut self) {
        self.frames = 0;
        match &mut self.link {
            LinkState::Plain => {}
            LinkState::Conditional { cached, body } => {
                *cached = None;
                body.reset();
            }
            LinkState::Each { members } => *members = None,
            LinkState::Range { bounds, counter, body } => {
                *bounds = None;
                *counter = 0;
                body.reset();
            }
        }
    }

    fn evaluate(
        &mut self,
        statement: &Statement,
        bridge: &mut dyn QueryBridge,
        base: Option<&Value>,
    ) -> Status {
        self.frames += 1;
        let frame = self.frames;
        let Some(first) = statement.first() else {
            return Status::Done;
        };

        match (first, &mut self.link) {
            (Link::Method { name, params, .. }, _) if name == "sleep" => {
                let limit = params
                    .first()
                    .and_then(|p| value_of(p, bridge, base, frame))
                    .map(|v| v.as_int())
                    .unwrap_or(0);
                if frame as i64 > limit {
                    Status::Done
                } else {
                    Status::Pending
                }
            }

            (Link::Method { .. } | Link::This, _) => {
                if chain(statement.links(), bridge, base, frame).is_pending() {
                    Status::Pending
                } else {
                    Status::Done
                }
            }

            (
                Link::Conditional { params, template, body, .. },
                LinkState::Conditional { cached, body: state },
            ) => {
                let met = match *cached {
                    Some(met) => met,
                    None => {
                        let met = test_condition(params, template, bridge, base, frame);
                        debug!("condition `{template}` -> {met}");
                        *cached = Some(met);
                        met
                    }
                };
                if !met {
                    Status::ConditionNotMet
                } else if state.run(body, bridge, base) {
                    Status::ConditionMet
                } else {
                    Status::ConditionMetButPending
                }
            }

            (Link::Each { subject, body }, LinkState::Each { members }) => {
                if members.is_none() {
                    let found = enumerate(subject, bridge, base, frame);
                    debug!("each: {} member(s)", found.len());
                    *members = Some(found.into_iter().map(|m| (m, BlockState::new(body))).collect());
                }
                let mut all_done = true;
                for (member, state) in members.iter_mut().flatten() {
                    if !state.run(body, bridge, Some(&*member)) {
                        all_done = false;
                    }
                }
                if all_done {
                    Status::ConditionMet
                } else {
                    Status::ConditionMetButPending
                }
            }

            (Link::Range { from, to, body }, LinkState::Range { bounds, counter, body: state }) => {
                let (_, high) = match *bounds {
                    Some(fixed) => fixed,
                    None => {
                        let low = value_of(from, bridge, base, frame).map_or(0, |v| v.as_int());
                        let high = value_of(to, bridge, base, frame).map_or(0, |v| v.as_int());
                        debug!("range {low}..{high}");
                        *bounds = Some((low, high));
                        *counter = low;
                        (low, high)
                    }
                };
                while *counter < high {
                    if !state.run(body, bridge, base) {
                        return Status::ConditionMetButPending;
                    }
                    state.reset();
                    *counter += 1;
                }
                Status::ConditionMet
            }

            (Link::Constant(_) | Link::Object(_), _) => Status::Done,

            // Control links always get their matching state in `new`.
            (Link::Conditional { .. } | Link::Each { .. } | Link::Range { .. }, _) => Status::Done,
        }
    }
}

// ── Value evaluation ──────────────────────────────────────────────────────────

/// Resolve a method chain through the bridge.
///
/// The chain continues only while each call returns an object; a value,
/// `Pending` or `Absent` answer ends it early.
fn chain(
    links: &[Link],
    bridge: &mut dyn QueryBridge,
    base: Option<&Value>,
    frame: u64,
) -> QueryResult {
    let Some((head, rest)) = links.split_first() else {
        return QueryResult::Absent;
    };
    let mut result = match head {
        Link::This => match base {
            Some(Value::Handle(h)) => QueryResult::Object(h.clone()),
            Some(v) => QueryResult::Value(v.clone()),
            None => QueryResult::Absent,
        },
        Link::Method { name, params, .. } => {
            let args = arguments(params, bridge, base, frame);
            bridge.resolve(&Call { target: None, method: name, params: &args, frame })
        }
        _ => return QueryResult::Absent,
    };

    for link in rest {
        let Link::Method { name, params, .. } = link else {
            break;
        };
        let QueryResult::Object(target) = &result else {
            break;
        };
        let args = arguments(params, bridge, base, frame);
        let next = bridge.resolve(&Call { target: Some(target), method: name, params: &args, frame });
        result = next;
    }
    result
}

/// Evaluate method parameters.  Parameters that produce nothing become `""`.
fn arguments(
    params: &[Statement],
    bridge: &mut dyn QueryBridge,
    base: Option<&Value>,
    frame: u64,
) -> Vec<Value> {
    params
        .iter()
        .map(|p| value_of(p, bridge, base, frame).unwrap_or_default())
        .collect()
}

/// Value of a statement used as a parameter, `each` subject or bound.
fn value_of(
    statement: &Statement,
    bridge: &mut dyn QueryBridge,
    base: Option<&Value>,
    frame: u64,
) -> Option<Value> {
    match statement.first()? {
        Link::Method { .. } | Link::This => chain(statement.links(), bridge, base, frame).into_value(),
        Link::Constant(text) => Some(constant(text)),
        Link::Object(text) => match expr::parse_literal(text) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("bad object literal `{text}`: {e}");
                None
            }
        },
        other => {
            warn!("`{}` cannot be used as a value", other.kind_name());
            None
        }
    }
}

/// Type a constant: quoted text is a string, numbers are numbers, anything
/// else is kept as bare text.
fn constant(text: &str) -> Value {
    if let Some(inner) = text.strip_prefix('"').and_then(|t| t.strip_suffix('"')) {
        return Value::Str(inner.replace("\\\"", "\""));
    }
    if let Ok(n) = text.parse::<i64>() {
        return Value::Int(n);
    }
    match text.parse::<f64>() {
        Ok(x) if x.is_finite() && text.bytes().any(|b| b.is_ascii_digit()) => Value::Float(x),
        _ => Value::Str(text.to_owned()),
    }
}

/// Evaluate a conditional's lifted sub-statements, splice them into the
/// template and evaluate the result.  Sub-statements that produce nothing
/// or a falsy value are spliced in as `0`; evaluation errors count as false.
fn test_condition(
    params: &[Statement],
    template: &str,
    bridge: &mut dyn QueryBridge,
    base: Option<&Value>,
    frame: u64,
) -> bool {
    let mut expression = template.to_owned();
    for (i, param) in params.iter().enumerate() {
        let text = match value_of(param, bridge, base, frame) {
            Some(v) if v.as_bool() => v.to_string(),
            _ => "0".to_owned(),
        };
        expression = expression.replace(&statement_marker(i + 1), &text);
    }
    match expr::eval_condition(&expression) {
        Ok(met) => met,
        Err(e) => {
            warn!("condition `{expression}` failed: {e}");
            false
        }
    }
}

/// Members an `each` iterates: the bridge's members of a handle, list
/// items, or map keys.  Duplicates are dropped.
fn enumerate(
    subject: &Statement,
    bridge: &mut dyn QueryBridge,
    base: Option<&Value>,
    frame: u64,
) -> Vec<Value> {
    let found = match value_of(subject, bridge, base, frame) {
        Some(Value::Handle(h)) => bridge.members(&h),
        Some(Value::List(items)) => items,
        Some(Value::Map(entries)) => entries.into_keys().map(Value::Str).collect(),
        Some(other) => {
            warn!("cannot iterate over {} `{other}`", other.type_name());
            Vec::new()
        }
        None => Vec::new(),
    };
    let mut members: Vec<Value> = Vec::with_capacity(found.len());
    for member in found {
        if !members.contains(&member) {
            members.push(member);
        }
    }
    members
}

// ── Tests ─────────────────────────────────────────────────────────────────────
