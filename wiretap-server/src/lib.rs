//! Control server for Wiretap
//!
//! This crate exposes the session API over a line-oriented TCP
//! connection: list devices, start and stop capture sessions, and stream
//! a broadcasting session's frames to any number of connected clients.

pub mod command;
pub mod server;

pub use command::{Command, CommandParser};
pub use server::ControlServer;
