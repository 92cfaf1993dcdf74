// src/dag/mod.rs

//! Task dependency graph.
//!
//! - [`graph`] keeps each task's `after` list, validates it (unknown
//!   references, self-dependencies, cycles) and turns a list of requested
//!   tasks into an execution order.

pub mod graph;

pub use graph::TaskGraph;
