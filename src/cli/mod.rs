//! Command-line interface.
//!
//! Argument parsing lives in [`args`]; each command group has its own module
//! under [`commands`].

pub mod args;
pub mod commands;
pub mod table;

pub use args::{Cli, Commands, DocumentAction, SchemaAction};
