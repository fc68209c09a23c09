//! Side-effecting process execution.

pub mod process;
pub mod runner;
