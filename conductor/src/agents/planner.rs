//! Planner agent: turns a goal into an ordered plan.

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::core::interpret::{PlanExtractError, extract_plan};
use crate::core::types::Plan;
use crate::io::model::LanguageModel;
use crate::io::prompt::PromptBuilder;

#[derive(Debug, Error)]
pub enum PlanError {
    /// The model could not be reached or returned an error.
    #[error("Exception during plan generation: {0}")]
    Model(String),
    #[error(transparent)]
    Extract(#[from] PlanExtractError),
}

#[derive(Debug)]
pub struct Planner<M> {
    model: M,
    prompts: PromptBuilder,
}

impl<M: LanguageModel> Planner<M> {
    pub fn new(model: M) -> Self {
        Self {
            model,
            prompts: PromptBuilder::default(),
        }
    }

    /// Ask the model for a plan. Called at most once per run.
    #[instrument(skip_all, fields(model = %self.model.label()))]
    pub fn plan(&self, goal: &str) -> Result<Plan, PlanError> {
        let prompt = self
            .prompts
            .planner(goal)
            .map_err(|e| PlanError::Model(format!("{e:#}")))?;
        debug!(prompt_bytes = prompt.len(), "sending planning prompt");

        let response = self.model.complete(&prompt).map_err(|e| {
            warn!(err = %e, "planner model failed");
            PlanError::Model(format!("{e:#}"))
        })?;
        debug!(response = %response, "planner response");

        let descriptions = extract_plan(&response).inspect_err(|e| {
            warn!(err = %e, "planner response rejected");
        })?;
        let plan = Plan::from_descriptions(descriptions).ok_or(PlanExtractError::Empty)?;
        info!(subtasks = plan.len(), "plan generated");
        Ok(plan)
    }
}
