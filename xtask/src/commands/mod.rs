//! Generators behind each task.

pub mod completions;
pub mod man;
