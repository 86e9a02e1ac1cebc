//! cue: a frame-driven cutscene scripting engine.
//!
//! Game code compiles line-oriented scripts ([`script`]), answers their
//! method calls through a [`bridge::QueryBridge`], and advances them one
//! frame at a time.  [`session`] provides the built-in session-variable
//! bridge; [`config`], [`cli`] and [`logging`] back the `cue` runner binary.

pub mod bridge;
pub mod cli;
pub mod config;
pub mod logging;
pub mod script;
pub mod session;
pub mod var;
