//! Interpretation of free-form model output.
//!
//! Models wrap structured answers in preamble, code fences and commentary.
//! Everything that reads model text goes through this module so the failure
//! modes stay in one place:
//!
//! - [`extract_plan`] finds the first JSON array of strings. It never guesses
//!   beyond that: anything that is not a non-empty list of strings is an error.
//! - [`parse_react_step`] reads one reason/act turn. Format errors are returned
//!   to the caller, which feeds them back to the model as an observation.

use std::sync::LazyLock;

use jsonschema::Draft;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

const PLAN_SCHEMA: &str = include_str!("../../schemas/plan.schema.json");

static ARRAY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[.*?\]").expect("array pattern should compile"));

static PLAN_VALIDATOR: LazyLock<jsonschema::Validator> = LazyLock::new(|| {
    let schema: Value = serde_json::from_str(PLAN_SCHEMA).expect("plan schema should be json");
    jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(&schema)
        .expect("plan schema should compile")
});

static ACTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)Action\s*\d*\s*:[\s]*(.*?)[\s]*Action\s*\d*\s*Input\s*\d*\s*:[\s]*(.*)")
        .expect("action pattern should compile")
});

static FINAL_ANSWER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)Final\s+Answer\s*:\s*(.*)").expect("final answer pattern should compile")
});

const OBSERVATION_MARKER: &str = "Observation:";

/// Why a planner response could not be turned into subtasks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanExtractError {
    #[error("No JSON list in LLM plan response (regex).")]
    NoArray,
    #[error("Failed to parse plan from LLM (regex): {0}")]
    Unparsable(String),
    #[error("LLM plan has incorrect format (not a list of strings).")]
    NotStrings,
    #[error("LLM generated an empty plan.")]
    Empty,
}

/// Extract an ordered list of subtask descriptions from planner output.
///
/// The first `[...]` span (shortest match) is parsed as JSON. When that span
/// does not parse, e.g. because a description itself contains `]`, a single
/// complete JSON value starting at the same `[` is tried instead. Later
/// brackets are never considered.
pub fn extract_plan(text: &str) -> Result<Vec<String>, PlanExtractError> {
    let first = ARRAY_RE.find(text).ok_or(PlanExtractError::NoArray)?;

    let value = match serde_json::from_str::<Value>(first.as_str()) {
        Ok(value) => value,
        Err(err) => parse_from_brackets(&text[first.start()..])
            .ok_or_else(|| PlanExtractError::Unparsable(err.to_string()))?,
    };

    if !PLAN_VALIDATOR.is_valid(&value) {
        return Err(PlanExtractError::NotStrings);
    }
    let items: Vec<String> =
        serde_json::from_value(value).map_err(|_| PlanExtractError::NotStrings)?;
    if items.is_empty() {
        return Err(PlanExtractError::Empty);
    }
    Ok(items)
}

fn parse_from_brackets(text: &str) -> Option<Value> {
    serde_json::Deserializer::from_str(text)
        .into_iter::<Value>()
        .next()?
        .ok()
}

/// One parsed reason/act turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReactStep {
    /// Call a tool and observe its result.
    Act { action: String, input: String },
    /// Stop with a final textual answer.
    Finish(String),
}

/// Format problems in a reason/act turn.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReactParseError {
    #[error("Missing 'Action:' after 'Thought:'")]
    MissingAction,
    #[error("Missing 'Action Input:' after 'Action:'")]
    MissingActionInput,
    #[error("Parsing LLM output produced both a final answer and a parse-able action")]
    Ambiguous,
}

/// Parse a single reason/act turn from worker model output.
///
/// Anything after a model-invented `Observation:` line is discarded, since
/// observations are only ever supplied by the tool layer.
pub fn parse_react_step(text: &str) -> Result<ReactStep, ReactParseError> {
    let text = match text.find(OBSERVATION_MARKER) {
        Some(idx) => &text[..idx],
        None => text,
    };

    let action = ACTION_RE.captures(text);
    let answer = FINAL_ANSWER_RE.captures(text);

    match (action, answer) {
        (Some(_), Some(_)) => Err(ReactParseError::Ambiguous),
        (Some(caps), None) => {
            let action = caps[1].trim().trim_matches('*').trim().to_string();
            let input = caps[2].trim().to_string();
            if action.is_empty() {
                return Err(ReactParseError::MissingAction);
            }
            Ok(ReactStep::Act { action, input })
        }
        (None, Some(caps)) => Ok(ReactStep::Finish(caps[1].trim().to_string())),
        (None, None) => {
            if text.contains("Action:") {
                Err(ReactParseError::MissingActionInput)
            } else {
                Err(ReactParseError::MissingAction)
            }
        }
    }
}
