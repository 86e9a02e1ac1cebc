//! Logger setup for the `cue` runner, on top of log4rs.
//!
//! Records always go to stderr; with a log file configured they are also
//! appended there.  Library code only uses the `log` macros, so embedding
//! hosts are free to install their own logger instead.

use std::path::{Path, PathBuf};

use log::LevelFilter;
use log4rs::{
    append::{
        console::{ConsoleAppender, Target},
        file::FileAppender,
    },
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
};
use thiserror::Error;

const CONSOLE_PATTERN: &str = "{h({l:<5})} {t} {m}{n}";
const FILE_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S)} {l} {t} {m}{n}";

#[derive(Debug, Error)]
pub enum LogError {
    #[error("cannot open log file {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid logger configuration: {0}")]
    Config(String),
    #[error("logger already installed")]
    AlreadySet(#[from] log::SetLoggerError),
}

/// Build the log4rs configuration without installing it.
pub fn build_config(level: LevelFilter, file: Option<&Path>) -> Result<Config, LogError> {
    let console = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(CONSOLE_PATTERN)))
        .build();

    let mut builder = Config::builder().appender(
        Appender::builder()
            .filter(Box::new(ThresholdFilter::new(level)))
            .build("stderr", Box::new(console)),
    );
    let mut root = Root::builder().appender("stderr");

    if let Some(path) = file {
        let logfile = FileAppender::builder()
            .encoder(Box::new(PatternEncoder::new(FILE_PATTERN)))
            .build(path)
            .map_err(|source| LogError::File { path: path.to_owned(), source })?;
        builder = builder.appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(level)))
                .build("logfile", Box::new(logfile)),
        );
        root = root.appender("logfile");
    }

    builder
        .build(root.build(level))
        .map_err(|e| LogError::Config(e.to_string()))
}

/// Install the global logger.
pub fn init_log(level: LevelFilter, file: Option<&Path>) -> Result<(), LogError> {
    let config = build_config(level, file)?;
    log4rs::init_config(config)?;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn console_only() {
        let config = build_config(LevelFilter::Info, None).unwrap();
        assert_eq!(config.appenders().len(), 1);
        assert_eq!(config.root().level(), LevelFilter::Info);
    }

    #[test]
    fn with_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cue.log");
        let config = build_config(LevelFilter::Debug, Some(&path)).unwrap();
        assert_eq!(config.appenders().len(), 2);
        assert!(path.exists());
    }

    #[test]
    fn unwritable_file() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened as a log file.
        let err = build_config(LevelFilter::Warn, Some(dir.path())).unwrap_err();
        assert!(matches!(err, LogError::File { .. }));
    }
}
