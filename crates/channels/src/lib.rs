//! Terminal channel for wordtutor.
//!
//! The web transports live in `wordtutor-gateway`; this crate covers the
//! interactive stdin/stdout session.

pub mod cli;
pub mod terminal;

pub use cli::{CliChannel, StdoutSink, WriterSink, spawn_line_reader};
pub use terminal::{SessionEnd, run_terminal};
