//! CLI argument parsing and command handling.

mod args;
mod validators;

pub use args::{Cli, Command, ConfigAction, ModelAction, RunArgs};
pub use validators::parse_confidence;
