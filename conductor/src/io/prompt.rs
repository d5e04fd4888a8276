//! Prompt rendering for the planner and worker models.

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use serde::Serialize;
use tracing::debug;

use crate::core::tool_request::ToolName;

const PLANNER_TEMPLATE: &str = include_str!("prompts/planner.md");
const WORKER_TEMPLATE: &str = include_str!("prompts/worker.md");

const TRUNCATION_NOTICE: &str = "[earlier steps truncated]\n";

pub const DEFAULT_SCRATCHPAD_BUDGET_BYTES: usize = 40_000;

/// Tool entry rendered into the worker prompt.
#[derive(Debug, Clone, Serialize)]
struct ToolContext {
    name: &'static str,
    description: &'static str,
    example: &'static str,
}

impl From<ToolName> for ToolContext {
    fn from(tool: ToolName) -> Self {
        Self {
            name: tool.as_str(),
            description: tool.description(),
            example: tool.input_example(),
        }
    }
}

/// Renders planner and worker prompts from embedded templates.
#[derive(Debug)]
pub struct PromptBuilder {
    env: Environment<'static>,
    scratchpad_budget_bytes: usize,
}

impl PromptBuilder {
    /// `scratchpad_budget_bytes` bounds the worker's accumulated turns.
    pub fn new(scratchpad_budget_bytes: usize) -> Self {
        let mut env = Environment::new();
        env.add_template("planner", PLANNER_TEMPLATE)
            .expect("planner template should be valid");
        env.add_template("worker", WORKER_TEMPLATE)
            .expect("worker template should be valid");
        Self {
            env,
            scratchpad_budget_bytes,
        }
    }

    pub fn planner(&self, goal: &str) -> Result<String> {
        let template = self.env.get_template("planner")?;
        template
            .render(context! { goal => goal.trim() })
            .context("render planner prompt")
    }

    /// Render a worker turn for `task`, given the tools on offer and the
    /// transcript of previous turns.
    pub fn worker(&self, task: &str, tools: &[ToolName], scratchpad: &str) -> Result<String> {
        let scratchpad = trim_front(scratchpad.trim(), self.scratchpad_budget_bytes);
        let tool_names = tools
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let tools: Vec<ToolContext> = tools.iter().copied().map(ToolContext::from).collect();

        let template = self.env.get_template("worker")?;
        template
            .render(context! {
                task => task.trim(),
                tools => tools,
                tool_names => tool_names,
                scratchpad => (!scratchpad.is_empty()).then_some(scratchpad.as_str()),
            })
            .context("render worker prompt")
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_SCRATCHPAD_BUDGET_BYTES)
    }
}

/// Keep the newest `budget` bytes of `text`, cut at a line start when possible.
fn trim_front(text: &str, budget: usize) -> String {
    if text.len() <= budget {
        return text.to_string();
    }
    let mut start = text.len() - budget;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    let tail = &text[start..];
    let tail = match tail.find('\n') {
        Some(idx) if idx + 1 < tail.len() => &tail[idx + 1..],
        _ => tail,
    };
    debug!(
        dropped_bytes = text.len() - tail.len(),
        kept_bytes = tail.len(),
        "trimmed worker scratchpad"
    );
    format!("{TRUNCATION_NOTICE}{tail}")
}
