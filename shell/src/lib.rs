//! Process execution engine of a small interactive shell: parses pipelines, spawns one process
//! per stage with its standard streams rewired, and forwards interrupt/suspend signals to the
//! process currently in the foreground.

pub mod builtin;
pub mod error;
pub mod eval;
pub mod foreground;
pub mod global;
pub mod history;
pub mod job;
pub mod parser;
pub mod pipeline;
pub mod reaper;
pub mod redirect;
pub mod signal;
pub mod spawn;
pub mod types;

#[cfg(test)]
mod test_util;

pub use error::{ExecError, ExecResult};
pub use eval::{eval, run_line, EvalResult};
pub use global::State;
pub use parser::{parse, parse_line, ParseError};
