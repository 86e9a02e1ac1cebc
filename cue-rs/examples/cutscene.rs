//! A small cutscene driven by a host-defined world.
//!
//! Run with `cargo run --example cutscene`.

use std::collections::BTreeMap;

use cue::bridge::{Handle, QueryResult, Registry};
use cue::script::{Script, Value};

const SCENE: &str = r#"
#define CID npc("cid")
#define ANN npc("ann")

ANN.say("Where were you?");
CID.walkTo(3);
+ANN.say("...");
CID.say("Sorry, the bridge was out.");
if(ANN.mood() > 5) {
    ANN.say("Fine. Let's go.");
} else {
    ANN.say("Hmph.");
}
each(party()) {
    this.walkTo(10);
}
sleep(2);
CID.say("Here we are.");
"#;

#[derive(Debug, Default)]
struct Stage {
    positions: BTreeMap<String, i64>,
    moods: BTreeMap<String, i64>,
    frame: u64,
}

fn npc_id(h: Option<&Handle>) -> &str {
    h.map_or("", Handle::id)
}

fn stage() -> Registry<Stage> {
    let mut reg = Registry::new(Stage::default());
    reg.root("npc", |_, c| QueryResult::Object(Handle::new("npc", c.param_str(0))))
        .root("party", |_, _| QueryResult::Object(Handle::new("party", "main")))
        .on("npc", "say", |stage, c| {
            println!("[{:>3}] {}: {}", stage.frame, npc_id(c.target), c.param_str(0));
            QueryResult::Absent
        })
        .on("npc", "mood", |stage, c| {
            let mood = stage.moods.get(npc_id(c.target)).copied().unwrap_or(0);
            QueryResult::Value(Value::Int(mood))
        })
        .on("npc", "walkTo", |stage, c| {
            // One step per frame until the target is reached.
            let goal = c.param_int(0);
            let pos = stage.positions.entry(npc_id(c.target).to_owned()).or_insert(0);
            if *pos == goal {
                return QueryResult::Absent;
            }
            *pos += (goal - *pos).signum();
            println!("[{:>3}] {} moves to {}", stage.frame, npc_id(c.target), pos);
            QueryResult::Pending
        })
        .members_of("party", |_, _| {
            ["cid", "ann"].iter().map(|id| Value::Handle(Handle::new("npc", *id))).collect()
        });
    reg.world_mut().moods.insert("ann".into(), 7);
    reg
}

fn main() {
    let mut script = match Script::parse(SCENE) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("scene does not parse: {e}");
            return;
        }
    };
    let mut reg = stage();
    loop {
        reg.world_mut().frame += 1;
        if script.run(&mut reg, None) {
            break;
        }
    }
    println!("scene finished after {} frames", reg.world().frame);
}
