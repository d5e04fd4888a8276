//! Goal-driven planner/worker orchestration.
//!
//! A planner model breaks a natural-language goal into an ordered list of
//! subtasks; a worker model executes each one through a bounded reason/act
//! loop over a small set of tools (files, shell, tests, git). The crate keeps
//! a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (run state, routing, parsing of
//!   model output). No I/O.
//! - **[`io`]**: Side effects (config, processes, git, model backends,
//!   prompt rendering, reports).
//! - **[`tools`]**, **[`agents`]** and **[`orchestrator`]** combine the two
//!   into the run loop driven by the CLI.

pub mod agents;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod orchestrator;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod tools;
