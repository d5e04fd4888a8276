//! Shared deterministic types for the orchestration loop.
//!
//! These types define the run record threaded through every node. They do not
//! depend on external state or I/O.

use serde::{Deserialize, Serialize};

/// Worker label stamped on every subtask. There is a single worker kind.
pub const GENERIC_WORKER: &str = "GenericWorker";

/// Lifecycle of a single subtask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtaskStatus {
    Pending,
    Done,
}

/// One unit of work assigned to the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    pub description: String,
    pub status: SubtaskStatus,
    pub assigned_worker: String,
    pub result: Option<String>,
}

impl Subtask {
    fn pending(description: String) -> Self {
        Self {
            description,
            status: SubtaskStatus::Pending,
            assigned_worker: GENERIC_WORKER.to_string(),
            result: None,
        }
    }
}

/// Ordered, non-empty list of subtasks produced once per run.
///
/// The length is fixed at construction: subtasks are mutated in place but never
/// added or removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Plan {
    subtasks: Vec<Subtask>,
}

impl Plan {
    /// Build a plan of pending subtasks. Returns `None` for an empty list.
    pub fn from_descriptions<I, S>(descriptions: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let subtasks: Vec<Subtask> = descriptions
            .into_iter()
            .map(|d| Subtask::pending(d.into()))
            .collect();
        if subtasks.is_empty() {
            return None;
        }
        Some(Self { subtasks })
    }

    pub fn len(&self) -> usize {
        self.subtasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subtasks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Subtask> {
        self.subtasks.get(index)
    }

    pub fn subtasks(&self) -> &[Subtask] {
        &self.subtasks
    }

    /// Mark the subtask at `index` done with its worker result.
    ///
    /// Returns `false` if `index` is out of range.
    pub fn complete(&mut self, index: usize, result: String) -> bool {
        match self.subtasks.get_mut(index) {
            Some(subtask) => {
                subtask.status = SubtaskStatus::Done;
                subtask.result = Some(result);
                true
            }
            None => false,
        }
    }

    /// Record a result without changing status (failed attempts stay pending).
    pub fn record_result(&mut self, index: usize, result: String) -> bool {
        match self.subtasks.get_mut(index) {
            Some(subtask) => {
                subtask.result = Some(result);
                true
            }
            None => false,
        }
    }

    /// Number of subtasks marked done.
    pub fn done_count(&self) -> usize {
        self.subtasks
            .iter()
            .filter(|s| s.status == SubtaskStatus::Done)
            .count()
    }
}

/// The run record passed by value through every node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
    pub goal: String,
    pub plan: Option<Plan>,
    /// Only increases. Equals `plan.len()` once every subtask is done.
    pub current_index: usize,
    pub last_worker_output: Option<String>,
    pub last_worker_error: Option<String>,
    pub final_result: Option<String>,
    pub error_message: Option<String>,
}

impl RunState {
    pub fn new(goal: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            ..Self::default()
        }
    }

    /// The subtask the worker should execute next, if any.
    pub fn current_subtask(&self) -> Option<&Subtask> {
        self.plan.as_ref()?.get(self.current_index)
    }

    /// True when a plan exists and every subtask has been consumed.
    pub fn is_complete(&self) -> bool {
        self.plan
            .as_ref()
            .is_some_and(|plan| self.current_index >= plan.len())
    }

    /// Collapse the terminal state into a single success or failure message.
    ///
    /// A set `error_message` always means failure. The reported message is the
    /// stage-specific `final_result` when termination wrote one.
    pub fn outcome(&self) -> RunOutcome {
        if let Some(err) = &self.error_message {
            let msg = self
                .final_result
                .clone()
                .unwrap_or_else(|| format!("Orchestrator error: {err}"));
            return RunOutcome::Failed(msg);
        }
        if let Some(err) = &self.last_worker_error {
            let msg = self
                .final_result
                .clone()
                .unwrap_or_else(|| format!("Run failed due to worker error: {err}"));
            return RunOutcome::Failed(msg);
        }
        if self.is_complete() {
            let msg = self
                .final_result
                .clone()
                .unwrap_or_else(|| "All subtasks completed successfully.".to_string());
            return RunOutcome::Succeeded(msg);
        }
        RunOutcome::Failed(
            self.final_result
                .clone()
                .unwrap_or_else(|| "Run ended without a result.".to_string()),
        )
    }
}

/// Final, user-visible verdict for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "lowercase")]
pub enum RunOutcome {
    Succeeded(String),
    Failed(String),
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Succeeded(_))
    }

    pub fn message(&self) -> &str {
        match self {
            RunOutcome::Succeeded(msg) | RunOutcome::Failed(msg) => msg,
        }
    }
}
