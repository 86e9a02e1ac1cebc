//! Command-line argument parsing.
//!
//! Usage:
//!   cue [-c <file>] [-n <frames>] [-l <level>] [-s KEY=VALUE]... [-d] <script>...
//!
//! Scripts are queued in the order given and run back to back, one frame per
//! loop iteration, until all of them finish or the frame limit is hit.

use std::path::PathBuf;

use clap::Parser;

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "cue", version, about = "Run cue cutscene scripts frame by frame")]
pub struct CliArgs {
    /// Script files to run, in order.
    #[arg(required = true)]
    pub scripts: Vec<PathBuf>,

    /// Config file (default: ./cue.toml, then the user config directory).
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Stop after this many frames.
    #[arg(short = 'n', long, value_name = "FRAMES")]
    pub max_frames: Option<u64>,

    /// Log level (off, error, warn, info, debug, trace).
    #[arg(short, long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Set a session variable before the first frame.
    #[arg(short = 's', long = "set", value_name = "KEY=VALUE", value_parser = parse_assignment)]
    pub set: Vec<(String, String)>,

    /// Print each script's parsed statement tree before running it.
    #[arg(short, long)]
    pub dump: bool,
}

/// Parse `KEY=VALUE`.
pub fn parse_assignment(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_owned(), value.to_owned()))
        }
        _ => Err(format!("expected KEY=VALUE, got `{s}`")),
    }
}

/// Parse an explicit argument vector (without the program name).
pub fn parse_argv(argv: &[String]) -> Result<CliArgs, clap::Error> {
    CliArgs::try_parse_from(std::iter::once("cue").chain(argv.iter().map(String::as_str)))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
