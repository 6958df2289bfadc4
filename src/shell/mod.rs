//! Shell Module
//!
//! Interactive console over one open container.
//!
//! ## Responsibilities
//! - Split input lines into arguments, honoring `"quoted strings"`
//! - Keep reading continuation lines while a quote is open
//! - Dispatch commands (read, write, delete, list, rename, clean, help, exit)
//!
//! The shell only talks to the engine through the public [`Container`] API.
//!
//! [`Container`]: crate::engine::Container

mod commands;
mod parser;

pub use commands::{Command, Shell};
pub use parser::{split_args, LineBuffer, LineError, MAX_ARGS, MAX_LINE};

/// Prompt shown when waiting for a new command
pub const PROMPT: &str = "Ofile> ";

/// Prompt shown while a quoted argument is still open
pub const CONTINUATION_PROMPT: &str = "> ";
