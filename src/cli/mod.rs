//! Command-line interface
//!
//! This module contains the CLI commands and argument parsing
//! for the node and its client helpers.

pub mod commands;

pub use commands::{Command, Opt, StartArgs};
