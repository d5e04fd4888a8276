//! The orchestrator/worker loop.
//!
//! A run alternates between two nodes until a routing decision ends it:
//!
//! - the orchestrator node plans once, then folds each worker result back into
//!   the plan and advances to the next subtask;
//! - the worker node executes the current subtask.
//!
//! State is passed by value from node to node. Every node execution counts
//! against the recursion limit.

use std::path::Path;

use anyhow::Result;
use tracing::{info, instrument, warn};

use crate::agents::{Planner, Worker};
use crate::core::routing::{
    Node, Route, Termination, route_after_orchestrator, route_after_start, route_after_worker,
};
use crate::core::types::RunState;
use crate::io::config::ConductorConfig;
use crate::io::model::{LanguageModel, build_model};
use crate::io::prompt::PromptBuilder;
use crate::tools::ToolBox;

pub const NO_VALID_SUBTASK: &str = "Error: No valid subtask for worker.";
pub const SUBTASK_DESCRIPTION_MISSING: &str = "Error: Subtask description missing.";

pub struct Orchestrator<P, W> {
    planner: Planner<P>,
    worker: Worker<W>,
    recursion_limit: u32,
}

/// Orchestrator wired to the backends selected in config.
pub type ConfiguredOrchestrator = Orchestrator<Box<dyn LanguageModel>, Box<dyn LanguageModel>>;

impl ConfiguredOrchestrator {
    pub fn from_config(config: &ConductorConfig, workdir: &Path) -> Result<Self> {
        let planner = Planner::new(build_model(&config.planner.model)?);
        let worker = Worker::new(
            build_model(&config.worker.model)?,
            ToolBox::new(workdir, &config.tools),
            PromptBuilder::new(config.worker.scratchpad_budget_bytes),
            config.worker.max_iterations,
        );
        Ok(Orchestrator::new(planner, worker, config.recursion_limit))
    }
}

impl<P: LanguageModel, W: LanguageModel> Orchestrator<P, W> {
    pub fn new(planner: Planner<P>, worker: Worker<W>, recursion_limit: u32) -> Self {
        Self {
            planner,
            worker,
            recursion_limit,
        }
    }

    pub fn run(&self, goal: &str) -> RunState {
        self.run_with_observer(goal, |_, _| {})
    }

    /// Run to completion, calling `observe` after every node execution.
    #[instrument(skip_all, fields(recursion_limit = self.recursion_limit))]
    pub fn run_with_observer<F>(&self, goal: &str, mut observe: F) -> RunState
    where
        F: FnMut(Node, &RunState),
    {
        let mut state = RunState::new(goal);
        let mut route = route_after_start(&state);
        let mut steps = 0u32;

        loop {
            let node = match route {
                Route::Next(node) => node,
                Route::End(termination) => {
                    termination.apply(&mut state);
                    info!(?termination, steps, "run finished");
                    return state;
                }
            };
            if steps >= self.recursion_limit {
                warn!(steps, "recursion limit reached");
                Termination::RecursionLimit(self.recursion_limit).apply(&mut state);
                return state;
            }
            steps += 1;

            info!(%node, step = steps, index = state.current_index, "entering node");
            state = match node {
                Node::Orchestrator => self.orchestrator_node(state),
                Node::Worker => self.worker_node(state),
            };
            observe(node, &state);

            route = match node {
                Node::Orchestrator => route_after_orchestrator(&state),
                Node::Worker => route_after_worker(&state),
            };
        }
    }

    fn orchestrator_node(&self, mut state: RunState) -> RunState {
        if state.plan.is_none() {
            match self.planner.plan(&state.goal) {
                Ok(plan) => {
                    state.plan = Some(plan);
                    state.current_index = 0;
                }
                Err(e) => {
                    warn!(err = %e, "planning failed");
                    state.error_message = Some(e.to_string());
                }
            }
            return state;
        }

        let Some(output) = state.last_worker_output.take() else {
            return state;
        };
        let index = state.current_index;
        if let Some(plan) = state.plan.as_mut() {
            if state.last_worker_error.is_some() {
                plan.record_result(index, output);
            } else if plan.complete(index, output) {
                state.current_index += 1;
                info!(done = plan.done_count(), total = plan.len(), "subtask completed");
            }
        }
        state
    }

    fn worker_node(&self, mut state: RunState) -> RunState {
        let description = state.current_subtask().map(|s| s.description.clone());
        match description {
            None => trip_guard(&mut state, NO_VALID_SUBTASK),
            Some(d) if d.trim().is_empty() => trip_guard(&mut state, SUBTASK_DESCRIPTION_MISSING),
            Some(d) => {
                let report = self.worker.execute(&d);
                state.last_worker_output = Some(report.output);
                state.last_worker_error = report.error;
            }
        }
        state
    }
}

fn trip_guard(state: &mut RunState, msg: &str) {
    warn!(error = msg, "worker guard tripped");
    state.last_worker_output = Some(msg.to_string());
    state.last_worker_error = Some(msg.to_string());
}
