//! Routing decisions for the orchestrator state machine.
//!
//! ```text
//! START -> orchestrator -> { worker -> orchestrator }* -> END
//! ```
//!
//! Decisions are pure functions of [`RunState`]. The final strings a terminal
//! route writes are applied separately by [`Termination::apply`].

use std::fmt;

use serde::Serialize;

use super::types::RunState;

pub const MISSING_GOAL: &str = "User goal not provided.";
pub const ALL_DONE: &str = "All subtasks completed successfully.";
pub const NO_PLAN: &str =
    "Run failed: No plan was generated or available or LLM failed to produce a valid plan.";

/// Graph nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    Orchestrator,
    Worker,
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Orchestrator => f.write_str("orchestrator"),
            Node::Worker => f.write_str("generic_worker"),
        }
    }
}

/// Where control goes next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Next(Node),
    End(Termination),
}

/// Mutually exclusive reasons a run ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    MissingGoal,
    OrchestratorError,
    WorkerError,
    Completed,
    NoPlan,
    RecursionLimit(u32),
}

impl Termination {
    /// Write the terminal strings for this outcome into `state`.
    ///
    /// An existing `final_result` is preserved except where the worker error
    /// or completion message must be authoritative.
    pub fn apply(&self, state: &mut RunState) {
        match self {
            Termination::MissingGoal => {
                state.error_message = Some(MISSING_GOAL.to_string());
                state.final_result = Some(format!("Run failed: {MISSING_GOAL}"));
            }
            Termination::OrchestratorError => {
                if state.final_result.is_none() {
                    let err = state.error_message.as_deref().unwrap_or("unknown error");
                    state.final_result =
                        Some(format!("Run failed due to orchestrator error: {err}"));
                }
            }
            Termination::WorkerError => {
                let err = state.last_worker_error.as_deref().unwrap_or("unknown error");
                state.final_result = Some(format!("Run failed due to worker error: {err}"));
            }
            Termination::Completed => {
                if state.final_result.is_none() {
                    state.final_result = Some(ALL_DONE.to_string());
                }
            }
            Termination::NoPlan => {
                if state.final_result.is_none() {
                    state.final_result = Some(NO_PLAN.to_string());
                }
            }
            Termination::RecursionLimit(limit) => {
                let msg =
                    format!("Recursion limit of {limit} reached without hitting a stop condition.");
                state.final_result = Some(format!("Run failed: {msg}"));
                state.error_message = Some(msg);
            }
        }
    }
}

/// Entry guard: a run without a goal never reaches the orchestrator.
pub fn route_after_start(state: &RunState) -> Route {
    if state.goal.trim().is_empty() {
        return Route::End(Termination::MissingGoal);
    }
    Route::Next(Node::Orchestrator)
}

/// Decide what follows an orchestrator node. Checks run in priority order.
pub fn route_after_orchestrator(state: &RunState) -> Route {
    if state.error_message.is_some() {
        return Route::End(Termination::OrchestratorError);
    }
    if state.last_worker_error.is_some() {
        return Route::End(Termination::WorkerError);
    }
    match &state.plan {
        Some(plan) if state.current_index < plan.len() => Route::Next(Node::Worker),
        Some(_) => Route::End(Termination::Completed),
        None => Route::End(Termination::NoPlan),
    }
}

/// The worker node has a single outgoing edge.
pub fn route_after_worker(_state: &RunState) -> Route {
    Route::Next(Node::Orchestrator)
}
