//! Worker agent: executes one subtask with a bounded reason/act loop.
//!
//! Each iteration makes one model call and runs at most one tool. Tool results,
//! format errors and unknown tool names all become observations in the
//! scratchpad, so the model can correct itself on the next turn. Only a model
//! failure ends the loop with an error.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::core::interpret::{ReactStep, parse_react_step};
use crate::core::tool_request::{ToolInputError, ToolRequest};
use crate::io::model::LanguageModel;
use crate::io::prompt::PromptBuilder;
use crate::tools::ToolBox;

pub const ITERATION_LIMIT: &str = "Agent stopped due to iteration limit.";

/// Result of one subtask execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerReport {
    pub output: String,
    /// Set only when the subtask could not be carried out.
    pub error: Option<String>,
}

impl WorkerReport {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            error: None,
        }
    }

    /// A failed execution: `output` and `error` carry the same message.
    pub fn failure(output: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            error: Some(error.into()),
        }
    }
}

#[derive(Debug)]
pub struct Worker<M> {
    model: M,
    tools: ToolBox,
    prompts: PromptBuilder,
    max_iterations: u32,
}

impl<M: LanguageModel> Worker<M> {
    pub fn new(model: M, tools: ToolBox, prompts: PromptBuilder, max_iterations: u32) -> Self {
        Self {
            model,
            tools,
            prompts,
            max_iterations,
        }
    }

    /// Run the subtask to a final answer or until the iteration budget is spent.
    /// Never fails outward.
    #[instrument(skip_all, fields(model = %self.model.label()))]
    pub fn execute(&self, subtask: &str) -> WorkerReport {
        match self.react(subtask) {
            Ok(output) => WorkerReport::success(output),
            Err(e) => {
                let msg = format!("{e:#}");
                warn!(err = %msg, "worker failed");
                WorkerReport::failure(format!("Error executing subtask: {msg}"), msg)
            }
        }
    }

    fn react(&self, subtask: &str) -> Result<String> {
        let mut scratchpad = String::new();

        for iteration in 1..=self.max_iterations {
            let prompt = self
                .prompts
                .worker(subtask, self.tools.available(), &scratchpad)?;
            let completion = self.model.complete(&prompt)?;
            debug!(iteration, completion = %completion, "worker turn");

            let observation = match parse_react_step(&completion) {
                Ok(ReactStep::Finish(answer)) => {
                    info!(iteration, "worker finished");
                    return Ok(answer);
                }
                Ok(ReactStep::Act { action, input }) => self.act(&action, &input),
                Err(e) => {
                    debug!(iteration, err = %e, "unparseable worker turn");
                    format!("Invalid Format: {e}")
                }
            };

            let turn = completion.split("Observation:").next().unwrap_or_default();
            scratchpad.push_str(turn.trim());
            scratchpad.push_str("\nObservation: ");
            scratchpad.push_str(observation.trim_end());
            scratchpad.push('\n');
        }

        info!(max_iterations = self.max_iterations, "worker hit iteration limit");
        Ok(ITERATION_LIMIT.to_string())
    }

    fn act(&self, action: &str, input: &str) -> String {
        match ToolRequest::from_action(action, input) {
            Ok(request) => self.tools.run(&request),
            Err(ToolInputError::UnknownTool(_)) => {
                let names = self
                    .tools
                    .available()
                    .iter()
                    .map(|t| t.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{action} is not a valid tool, try one of [{names}].")
            }
            Err(e) => format!("Invalid tool input: {e}"),
        }
    }
}
