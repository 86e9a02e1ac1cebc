//! FIFO of scripts run one after another.
//!
//! Only the script at the head of the queue advances.  When it finishes it
//! is dropped and the next one starts, on the same frame when driven through
//! [`ScriptQueue::run_until_blocked`].

use std::collections::VecDeque;

use log::debug;

use super::eval::Script;
use super::value::Value;
use crate::bridge::QueryBridge;

#[derive(Debug, Default)]
pub struct ScriptQueue {
    scripts: VecDeque<Script>,
}

impl ScriptQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewind `script` and append it.
    pub fn load(&mut self, mut script: Script) {
        script.reset();
        self.scripts.push_back(script);
    }

    /// Run the head script for one frame.  Returns `true` if it finished
    /// (and was removed).
    pub fn process(&mut self, bridge: &mut dyn QueryBridge, base: Option<&Value>) -> bool {
        let Some(head) = self.scripts.front_mut() else {
            return false;
        };
        if !head.run(bridge, base) {
            return false;
        }
        self.scripts.pop_front();
        debug!("script finished, {} queued", self.scripts.len());
        true
    }

    /// Keep processing while scripts finish.  Returns how many finished.
    pub fn run_until_blocked(&mut self, bridge: &mut dyn QueryBridge, base: Option<&Value>) -> usize {
        let mut finished = 0;
        while self.process(bridge, base) {
            finished += 1;
        }
        finished
    }

    pub fn current(&self) -> Option<&Script> {
        self.scripts.front()
    }

    pub fn is_idle(&self) -> bool {
        self.scripts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{QueryResult, Registry};

    fn counter() -> Registry<Vec<String>> {
        let mut reg = Registry::new(Vec::new());
        reg.root("mark", |log, c| {
            log.push(c.param_str(0));
            QueryResult::Absent
        });
        reg
    }

    fn script(src: &str) -> Script {
        Script::parse(src).unwrap()
    }

    #[test]
    fn empty_queue_is_idle() {
        let mut q = ScriptQueue::new();
        let mut reg = counter();
        assert!(q.is_idle());
        assert!(!q.process(&mut reg, None));
        assert_eq!(q.run_until_blocked(&mut reg, None), 0);
    }

    #[test]
    fn finished_scripts_chain_in_one_frame() {
        let mut q = ScriptQueue::new();
        let mut reg = counter();
        q.load(script("mark(a);"));
        q.load(script("mark(b);"));
        q.load(script("sleep(1); mark(c);"));
        assert_eq!(q.len(), 3);

        assert_eq!(q.run_until_blocked(&mut reg, None), 2);
        assert_eq!(reg.world(), &["a", "b"]);
        assert_eq!(q.len(), 1);

        assert_eq!(q.run_until_blocked(&mut reg, None), 1);
        assert_eq!(reg.world(), &["a", "b", "c"]);
        assert!(q.is_idle());
    }

    #[test]
    fn load_rewinds() {
        let mut q = ScriptQueue::new();
        let mut reg = counter();
        let mut s = script("mark(x); sleep(5);");
        assert!(!s.run(&mut reg, None));
        assert_eq!(s.cursor(), 1);
        q.load(s);
        assert_eq!(q.current().map(Script::cursor), Some(0));
    }
}
