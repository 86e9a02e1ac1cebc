use proptest::prelude::*;

use cue::bridge::{QueryResult, Registry};
use cue::script::extract::{extract, PlaceholderTable};
use cue::script::expr::eval_str;
use cue::script::preprocess::preprocess;
use cue::script::{parse_block, parse_statement, Script};

/// Bridge that counts `mark()` calls.
fn marks() -> Registry<u32> {
    let mut reg = Registry::new(0u32);
    reg.root("mark", |n, _| {
        *n += 1;
        QueryResult::Absent
    });
    reg
}

proptest! {
    /// Hiding strings, parameters and blocks and then restoring them in
    /// reverse order gives back the original text.
    #[test]
    fn placeholders_round_trip(text in r#"[a-z ;.,"(){}]{0,40}"#) {
        let mut strings = PlaceholderTable::new("string");
        let mut params = PlaceholderTable::new("params");
        let mut blocks = PlaceholderTable::new("subscript");
        let hidden = extract('"', '"', &text, &mut strings, true, "")
            .and_then(|t| extract('(', ')', &t, &mut params, true, ""))
            .and_then(|t| extract('{', '}', &t, &mut blocks, true, ""));
        if let Ok(hidden) = hidden {
            let restored = strings.restore(&params.restore(&blocks.restore(&hidden)));
            prop_assert_eq!(restored, text);
        }
    }

    /// Preprocessing and parsing return Ok or Err but never panic.
    #[test]
    fn parser_does_not_panic(s in "\\PC*") {
        let _ = preprocess(&s);
        let _ = parse_block(&s);
        let _ = parse_statement(&s);
    }

    /// The condition evaluator never panics either.
    #[test]
    fn expr_does_not_panic(s in "[0-9a-z '\"=!<>~/()*+%.-]{0,30}") {
        let _ = eval_str(&s);
    }

    /// Parsing is deterministic: the same source always yields the same tree.
    #[test]
    fn parsing_is_idempotent(
        heads in prop::collection::vec("[a-z]{1,6}", 1..4),
        arg in 0i64..1000,
        word in "[a-z ]{0,8}",
    ) {
        let src = heads
            .iter()
            .map(|h| format!("{h}({arg}, \"{word}\").next();"))
            .collect::<String>();
        let first = parse_block(&src).unwrap();
        let second = parse_block(&src).unwrap();
        prop_assert_eq!(first.len(), heads.len());
        prop_assert_eq!(first, second);
    }

    /// `sleep(n)` holds the cursor for exactly `n` frames.
    #[test]
    fn sleep_takes_n_plus_one_frames(n in 0u32..30) {
        let mut reg = marks();
        let mut script = Script::parse(&format!("sleep({n}); mark();")).unwrap();
        let mut frames = 1;
        while !script.run(&mut reg, None) {
            frames += 1;
            prop_assert!(frames <= n + 1);
        }
        prop_assert_eq!(frames, n + 1);
        prop_assert_eq!(*reg.world(), 1);
    }

    /// The cursor never moves backwards, and once a script has finished
    /// further runs report success without calling the bridge again.
    #[test]
    fn finished_runs_are_idempotent(steps in prop::collection::vec(0u32..4, 1..8)) {
        let src: String = steps
            .iter()
            .map(|&n| if n == 0 { "mark();".to_owned() } else { format!("sleep({n}); mark();") })
            .collect();
        let mut reg = marks();
        let mut script = Script::parse(&src).unwrap();
        let mut cursor = script.cursor();
        let mut frames = 0;
        while !script.run(&mut reg, None) {
            prop_assert!(script.cursor() >= cursor);
            cursor = script.cursor();
            frames += 1;
            prop_assert!(frames < 100);
        }
        let calls = *reg.world();
        prop_assert_eq!(calls as usize, steps.len());
        for _ in 0..3 {
            prop_assert!(script.run(&mut reg, None));
        }
        prop_assert_eq!(*reg.world(), calls);
        prop_assert_eq!(script.cursor(), script.len());
    }

    /// `range(a, b)` runs its body `max(b - a, 0)` times.
    #[test]
    fn range_runs_body_per_step(a in -5i64..10, b in -5i64..20) {
        let mut reg = marks();
        let mut script = Script::parse(&format!("range({a}, {b}) {{ mark(); }}")).unwrap();
        prop_assert!(script.run(&mut reg, None));
        prop_assert_eq!(i64::from(*reg.world()), (b - a).max(0));
    }
}
