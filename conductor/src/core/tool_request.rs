//! Structured tool requests.
//!
//! Each tool takes named fields, so content containing commas (or any other
//! delimiter) reaches the tool unchanged.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub const DEFAULT_BRANCH: &str = "main";

/// Names the worker model uses to select a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    ReadFile,
    WriteFile,
    RunShellCommand,
    RunTests,
    GitCommit,
}

impl ToolName {
    pub const ALL: [ToolName; 5] = [
        ToolName::ReadFile,
        ToolName::WriteFile,
        ToolName::RunShellCommand,
        ToolName::RunTests,
        ToolName::GitCommit,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ToolName::ReadFile => "ReadFile",
            ToolName::WriteFile => "WriteFile",
            ToolName::RunShellCommand => "RunShellCommand",
            ToolName::RunTests => "RunTests",
            ToolName::GitCommit => "GitCommit",
        }
    }

    /// Human-readable description shown to the worker model.
    pub fn description(self) -> &'static str {
        match self {
            ToolName::ReadFile => "Reads the content of a file.",
            ToolName::WriteFile => {
                "Writes content to a file, creating it if absent and truncating it otherwise."
            }
            ToolName::RunShellCommand => {
                "Executes a shell command and reports its output. Destructive or privileged commands are refused."
            }
            ToolName::RunTests => "Runs the project's test suite and reports pass or fail.",
            ToolName::GitCommit => "Stages all changes and commits them with a message.",
        }
    }

    /// Example `Action Input` for the worker prompt.
    pub fn input_example(self) -> &'static str {
        match self {
            ToolName::ReadFile => r#"{"path": "src/main.rs"}"#,
            ToolName::WriteFile => r#"{"path": "notes.txt", "content": "first, second"}"#,
            ToolName::RunShellCommand => r#"{"command": "ls -la"}"#,
            ToolName::RunTests => "{}",
            ToolName::GitCommit => r#"{"message": "Add notes", "branch": "main"}"#,
        }
    }

    /// Field a bare-string input maps to, for single-argument tools.
    fn primary_field(self) -> Option<&'static str> {
        match self {
            ToolName::ReadFile => Some("path"),
            ToolName::RunShellCommand => Some("command"),
            ToolName::GitCommit => Some("message"),
            ToolName::WriteFile | ToolName::RunTests => None,
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown tool '{0}'")]
pub struct UnknownTool(pub String);

impl FromStr for ToolName {
    type Err = UnknownTool;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        ToolName::ALL
            .into_iter()
            .find(|name| name.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownTool(trimmed.to_string()))
    }
}

/// A fully-typed tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tool")]
pub enum ToolRequest {
    ReadFile {
        path: String,
    },
    WriteFile {
        path: String,
        content: String,
    },
    RunShellCommand {
        command: String,
    },
    RunTests,
    GitCommit {
        message: String,
        #[serde(default = "default_branch")]
        branch: String,
    },
}

fn default_branch() -> String {
    DEFAULT_BRANCH.to_string()
}

#[derive(Debug, Error)]
pub enum ToolInputError {
    #[error(transparent)]
    UnknownTool(#[from] UnknownTool),
    #[error("{tool} expects a JSON object input like {example}")]
    ExpectedObject {
        tool: ToolName,
        example: &'static str,
    },
    #[error("invalid input for {tool}: {source}")]
    InvalidFields {
        tool: ToolName,
        source: serde_json::Error,
    },
}

impl ToolRequest {
    pub fn name(&self) -> ToolName {
        match self {
            ToolRequest::ReadFile { .. } => ToolName::ReadFile,
            ToolRequest::WriteFile { .. } => ToolName::WriteFile,
            ToolRequest::RunShellCommand { .. } => ToolName::RunShellCommand,
            ToolRequest::RunTests => ToolName::RunTests,
            ToolRequest::GitCommit { .. } => ToolName::GitCommit,
        }
    }

    /// Build a request from a ReAct `Action` name and raw `Action Input` text.
    pub fn from_action(action: &str, input: &str) -> Result<Self, ToolInputError> {
        let tool: ToolName = action.parse()?;
        if tool == ToolName::RunTests {
            return Ok(ToolRequest::RunTests);
        }

        let input = strip_quotes(input.trim());
        let mut fields = match serde_json::from_str::<Value>(input) {
            Ok(Value::Object(map)) => map,
            Ok(Value::String(s)) => single_field(tool, s)?,
            _ => single_field(tool, input.to_string())?,
        };
        fields.insert("tool".to_string(), Value::String(tool.as_str().to_string()));

        serde_json::from_value(Value::Object(fields))
            .map_err(|source| ToolInputError::InvalidFields { tool, source })
    }
}

fn single_field(tool: ToolName, value: String) -> Result<Map<String, Value>, ToolInputError> {
    let field = tool.primary_field().ok_or(ToolInputError::ExpectedObject {
        tool,
        example: tool.input_example(),
    })?;
    let mut map = Map::new();
    map.insert(field.to_string(), Value::String(value));
    Ok(map)
}

/// Models often wrap a bare input in backticks or single quotes.
fn strip_quotes(input: &str) -> &str {
    let input = input.trim_matches('`').trim();
    input
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .unwrap_or(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_names_round_trip_case_insensitively() {
        for name in ToolName::ALL {
            assert_eq!(name.as_str().parse::<ToolName>().expect("parse"), name);
        }
        assert_eq!(
            "writefile".parse::<ToolName>().expect("parse"),
            ToolName::WriteFile
        );
        assert!("DeleteEverything".parse::<ToolName>().is_err());
    }

    #[test]
    fn write_file_keeps_commas_in_content() {
        let req = ToolRequest::from_action(
            "WriteFile",
            r#"{"path": "out.csv", "content": "a,b,c\n1,2,3"}"#,
        )
        .expect("request");
        assert_eq!(
            req,
            ToolRequest::WriteFile {
                path: "out.csv".to_string(),
                content: "a,b,c\n1,2,3".to_string(),
            }
        );
    }

    #[test]
    fn write_file_rejects_bare_string() {
        let err = ToolRequest::from_action("WriteFile", "out.txt, hello").unwrap_err();
        assert!(matches!(err, ToolInputError::ExpectedObject { .. }));
    }

    #[test]
    fn single_argument_tools_accept_bare_strings() {
        assert_eq!(
            ToolRequest::from_action("ReadFile", "'README.md'").expect("read"),
            ToolRequest::ReadFile {
                path: "README.md".to_string()
            }
        );
        assert_eq!(
            ToolRequest::from_action("RunShellCommand", "echo hi").expect("shell"),
            ToolRequest::RunShellCommand {
                command: "echo hi".to_string()
            }
        );
    }

    #[test]
    fn git_commit_defaults_branch_to_main() {
        let req = ToolRequest::from_action("GitCommit", r#"{"message": "init, first"}"#)
            .expect("commit");
        assert_eq!(
            req,
            ToolRequest::GitCommit {
                message: "init, first".to_string(),
                branch: "main".to_string(),
            }
        );
    }

    #[test]
    fn run_tests_ignores_input() {
        assert_eq!(
            ToolRequest::from_action("RunTests", "whatever").expect("tests"),
            ToolRequest::RunTests
        );
    }

    #[test]
    fn missing_field_is_reported() {
        let err = ToolRequest::from_action("WriteFile", r#"{"path": "x"}"#).unwrap_err();
        assert!(err.to_string().contains("invalid input for WriteFile"));
    }

    #[test]
    fn requests_deserialize_from_tagged_json() {
        let req: ToolRequest =
            serde_json::from_str(r#"{"tool": "RunTests"}"#).expect("deserialize");
        assert_eq!(req.name(), ToolName::RunTests);
    }
}
