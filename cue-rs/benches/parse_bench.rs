use criterion::{black_box, criterion_group, criterion_main, Criterion};

use cue::script::preprocess::preprocess;
use cue::script::{parse_block, Script};
use cue::session::{session_bridge, Session};

const SCENE: &str = r#"
#define HERO session("hero")
#define GOLD session("gold")

// opening
HERO.set("ann");
GOLD.set(3);
if(GOLD.get() > 10) {
    debug("rich");
} elif(GOLD.get() > 1 and HERO.get() == 'ann') {
    debug("comfortable", HERO.get("unwrapped"));
} else {
    debug("poor");
}
range(0, 5) {
    GOLD.increment();
}
each(sessions("q.")) {
    this.setRandomly("a", "b", "c");
}
session("done").setConcat("yes", "!");
"#;

/// `SCENE` repeated `n` times with the defines kept once at the top.
fn make_script(n: usize) -> String {
    let (defines, body) = SCENE.split_at(SCENE.find("// opening").unwrap_or(0));
    format!("{defines}{}", body.repeat(n))
}

fn bench_parse(c: &mut Criterion) {
    let small = make_script(1);
    let medium = make_script(20);
    let large = make_script(200);

    let mut g = c.benchmark_group("parse");
    g.bench_function("preprocess_small", |b| b.iter(|| preprocess(black_box(&small))));
    g.bench_function("preprocess_large", |b| b.iter(|| preprocess(black_box(&large))));
    g.bench_function("parse_block_small", |b| b.iter(|| parse_block(black_box(&small))));
    g.bench_function("parse_block_medium", |b| b.iter(|| parse_block(black_box(&medium))));
    g.bench_function("parse_block_large", |b| b.iter(|| parse_block(black_box(&large))));
    g.finish();
}

fn bench_run(c: &mut Criterion) {
    let script = match Script::parse(&make_script(20)) {
        Ok(s) => s,
        Err(e) => panic!("bench scene does not parse: {e}"),
    };

    let mut g = c.benchmark_group("run");
    g.bench_function("scene_x20", |b| {
        b.iter(|| {
            let mut session = Session::new();
            session.vars_mut().extend([("q.1", ""), ("q.2", "")]);
            let mut bridge = session_bridge(session);
            let mut run = script.clone();
            run.reset();
            black_box(run.run(&mut bridge, None))
        })
    });
    g.finish();
}

criterion_group!(benches, bench_parse, bench_run);
criterion_main!(benches);
