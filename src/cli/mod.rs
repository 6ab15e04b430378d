//! CLI layer for streamchat.
//!
//! Provides the command-line interface using clap, with commands for
//! sending messages, chatting interactively, and managing stored history.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use output::OutputFormat;
pub use parser::{Cli, Commands, FramingArg, ShapeArg};
