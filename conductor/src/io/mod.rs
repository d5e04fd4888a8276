//! Side-effecting adapters: configuration, processes, git, models, prompts.

pub mod config;
pub mod git;
pub mod model;
pub mod process;
pub mod prompt;
pub mod run_report;
