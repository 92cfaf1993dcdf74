// src/exec/mod.rs

//! Process execution layer.
//!
//! Runs the shell commands attached to tasks with `tokio::process::Command`,
//! streaming their output into the log.

pub mod runner;

pub use runner::run_command;
