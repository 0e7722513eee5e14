//! CLI interface for Wiretap
//!
//! This crate provides the command-line interface for Wiretap,
//! including argument parsing and the command implementations.

pub mod args;
pub mod commands;

pub use args::{Cli, Commands};
