use std::process::ExitCode;

use log::{error, info};

use cue::cli::parse_argv;
use cue::config::Config;
use cue::logging;
use cue::script::{ScriptLibrary, ScriptQueue};
use cue::session::{session_bridge, Session};

/// Exit status when the frame limit is reached before the scripts finish.
const EXIT_FRAME_LIMIT: u8 = 2;

fn main() -> ExitCode {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let args = match parse_argv(&argv) {
        Ok(args) => args,
        Err(e) => e.exit(),
    };

    // ── Config + logging ──────────────────────────────────────────────────────
    let mut config = match Config::resolve(args.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("cue: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(n) = args.max_frames {
        config.max_frames = n;
    }
    if let Some(level) = &args.log_level {
        config.log_level = level.clone();
    }
    if let Err(e) = logging::init_log(config.level_filter(), config.log_file.as_deref()) {
        eprintln!("cue: {e}");
    }

    // ── Compile and queue scripts ─────────────────────────────────────────────
    let mut library = ScriptLibrary::new();
    let mut queue = ScriptQueue::new();
    for path in &args.scripts {
        let name = match library.import_file(path) {
            Ok(name) => name,
            Err(e) => {
                eprintln!("cue: cannot read {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        };
        let script = match library.instantiate(&name) {
            Ok(script) => script,
            Err(e) => {
                eprintln!("cue: {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        };
        if args.dump {
            println!("== {name}");
            print!("{}", script.block().dump());
        }
        queue.load(script);
    }

    // ── Session ───────────────────────────────────────────────────────────────
    let mut session = Session::new();
    session.vars_mut().extend(config.session.clone());
    session.vars_mut().extend(args.set.iter().cloned());
    info!("session starts with {} variable(s)", session.vars().len());
    let mut bridge = session_bridge(session);

    // ── Frame loop ────────────────────────────────────────────────────────────
    let mut frame: u64 = 0;
    while !queue.is_idle() {
        if frame >= config.max_frames {
            let cursor = queue.current().map_or(0, |s| s.cursor());
            error!("frame limit reached with {} script(s) queued", queue.len());
            eprintln!(
                "cue: frame limit ({}) reached; {} script(s) unfinished, stopped at statement {cursor}",
                config.max_frames,
                queue.len()
            );
            return ExitCode::from(EXIT_FRAME_LIMIT);
        }
        frame += 1;
        queue.run_until_blocked(&mut bridge, None);
        for line in bridge.world_mut().take_output() {
            println!("{line}");
        }
    }

    info!("all scripts finished after {frame} frame(s)");
    ExitCode::SUCCESS
}
