//! Language-model backends.
//!
//! The [`LanguageModel`] trait decouples the planner and worker from the actual
//! model provider. Tests use scripted models that return canned completions
//! without spawning processes or touching the network.

use std::env;
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::io::config::{CommandModelConfig, GeminiConfig, ModelConfig};
use crate::io::process::run_command_with_timeout;

/// A text-in, text-out completion model.
pub trait LanguageModel {
    /// Short label for logs (e.g. `gemini:gemini-2.0-flash`).
    fn label(&self) -> String;

    /// Complete `prompt`. Transport and provider failures are errors.
    fn complete(&self, prompt: &str) -> Result<String>;
}

impl<M: LanguageModel + ?Sized> LanguageModel for Box<M> {
    fn label(&self) -> String {
        (**self).label()
    }

    fn complete(&self, prompt: &str) -> Result<String> {
        (**self).complete(prompt)
    }
}

impl<M: LanguageModel + ?Sized> LanguageModel for &M {
    fn label(&self) -> String {
        (**self).label()
    }

    fn complete(&self, prompt: &str) -> Result<String> {
        (**self).complete(prompt)
    }
}

/// Build the backend selected in config.
pub fn build_model(config: &ModelConfig) -> Result<Box<dyn LanguageModel>> {
    let model: Box<dyn LanguageModel> = match config {
        ModelConfig::Gemini(cfg) => Box::new(GeminiModel::new(cfg)?),
        ModelConfig::Command(cfg) => Box::new(CommandModel::new(cfg)),
    };
    info!(model = %model.label(), "language model configured");
    Ok(model)
}

/// Model served by a local program: prompt on stdin, completion on stdout.
#[derive(Debug, Clone)]
pub struct CommandModel {
    argv: Vec<String>,
    timeout: Duration,
    output_limit_bytes: usize,
}

impl CommandModel {
    pub fn new(config: &CommandModelConfig) -> Self {
        Self {
            argv: config.command.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            output_limit_bytes: config.output_limit_bytes,
        }
    }
}

impl LanguageModel for CommandModel {
    fn label(&self) -> String {
        format!("command:{}", self.argv.join(" "))
    }

    #[instrument(skip_all, fields(model = %self.label(), prompt_bytes = prompt.len()))]
    fn complete(&self, prompt: &str) -> Result<String> {
        let (program, args) = self
            .argv
            .split_first()
            .ok_or_else(|| anyhow!("model command is empty"))?;
        let mut cmd = Command::new(program);
        cmd.args(args);

        let output = run_command_with_timeout(
            cmd,
            Some(prompt.as_bytes()),
            self.timeout,
            self.output_limit_bytes,
        )
        .with_context(|| format!("run model command {program}"))?;

        if output.timed_out {
            warn!(timeout_secs = self.timeout.as_secs(), "model command timed out");
            return Err(anyhow!("model command timed out after {:?}", self.timeout));
        }
        if !output.status.success() {
            return Err(anyhow!(
                "model command failed with status {}: {}",
                output.exit_code(),
                output.stderr_text().trim()
            ));
        }
        let completion = output.stdout_text();
        debug!(completion_bytes = completion.len(), "model command completed");
        Ok(completion)
    }
}

/// Google Generative Language API (`generateContent`).
#[derive(Debug)]
pub struct GeminiModel {
    http: reqwest::blocking::Client,
    model: String,
    temperature: f32,
    api_key_env: String,
    base_url: String,
}

impl GeminiModel {
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("build http client")?;
        Ok(Self {
            http,
            model: config.model.clone(),
            temperature: config.temperature,
            api_key_env: config.api_key_env.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    fn request_body(&self, prompt: &str) -> GenerateRequest {
        GenerateRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        }
    }
}

impl LanguageModel for GeminiModel {
    fn label(&self) -> String {
        format!("gemini:{}", self.model)
    }

    #[instrument(skip_all, fields(model = %self.model, prompt_bytes = prompt.len()))]
    fn complete(&self, prompt: &str) -> Result<String> {
        // The key is read per call so a missing key fails the stage that needs it.
        let api_key = env::var(&self.api_key_env)
            .map_err(|_| anyhow!("missing API key: set {}", self.api_key_env))?;

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&self.request_body(prompt))
            .send()
            .context("send gemini request")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_else(|_| "(no body)".into());
            return Err(anyhow!(
                "gemini API error (status {}): {}",
                status.as_u16(),
                body.trim()
            ));
        }

        let parsed: GenerateResponse = response.json().context("parse gemini response")?;
        let text = parsed.first_text()?;
        debug!(completion_bytes = text.len(), "gemini completed");
        Ok(text)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

impl GenerateResponse {
    fn first_text(self) -> Result<String> {
        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("gemini returned no candidates"))?;
        let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
        let text: String = parts.into_iter().filter_map(|p| p.text).collect();
        if text.is_empty() {
            return Err(anyhow!(
                "gemini returned an empty candidate (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            ));
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gemini_request_uses_camel_case_generation_config() {
        let model = GeminiModel::new(&GeminiConfig::default()).expect("model");
        let body = serde_json::to_value(model.request_body("hi")).expect("json");
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(body["generationConfig"]["temperature"], 0.0);
        assert!(
            model
                .endpoint()
                .ends_with("/v1beta/models/gemini-2.0-flash:generateContent")
        );
    }

    #[test]
    fn gemini_response_joins_text_parts() {
        let raw = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"[\"a\", "},{"text":"\"b\"]"}]},"finishReason":"STOP"}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).expect("parse");
        assert_eq!(parsed.first_text().expect("text"), r#"["a", "b"]"#);
    }

    #[test]
    fn gemini_response_without_candidates_is_an_error() {
        let parsed: GenerateResponse = serde_json::from_str("{}").expect("parse");
        let err = parsed.first_text().unwrap_err();
        assert!(err.to_string().contains("no candidates"));
    }

    #[test]
    fn gemini_missing_key_fails_at_call_time() {
        let model = GeminiModel::new(&GeminiConfig {
            api_key_env: "CONDUCTOR_TEST_KEY_THAT_IS_NOT_SET".to_string(),
            ..GeminiConfig::default()
        })
        .expect("model");
        let err = model.complete("hi").unwrap_err();
        assert!(err.to_string().contains("missing API key"));
    }

    #[cfg(unix)]
    #[test]
    fn command_model_pipes_prompt_through_program() {
        let model = CommandModel::new(&CommandModelConfig {
            command: vec!["cat".to_string()],
            ..CommandModelConfig::default()
        });
        assert_eq!(model.complete("echo me").expect("complete"), "echo me");
        assert_eq!(model.label(), "command:cat");
    }

    #[cfg(unix)]
    #[test]
    fn command_model_reports_failure_status() {
        let model = CommandModel::new(&CommandModelConfig {
            command: vec!["sh".to_string(), "-c".to_string(), "exit 4".to_string()],
            ..CommandModelConfig::default()
        });
        let err = model.complete("x").unwrap_err();
        assert!(err.to_string().contains("status 4"));
    }
}
