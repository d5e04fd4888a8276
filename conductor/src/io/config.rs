//! Conductor configuration stored under `.conductor/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Default config location, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = ".conductor/config.toml";

/// Conductor configuration (TOML).
///
/// This file is intended to be edited by humans. Missing fields default to the
/// values below, so an absent file is a valid configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConductorConfig {
    /// Maximum node executions (orchestrator + worker) per run.
    pub recursion_limit: u32,

    /// Append-mode log file written alongside console output.
    pub log_path: PathBuf,

    pub planner: PlannerConfig,
    pub worker: WorkerConfig,
    pub tools: ToolsConfig,
}

impl Default for ConductorConfig {
    fn default() -> Self {
        Self {
            recursion_limit: 50,
            log_path: PathBuf::from("conductor.log"),
            planner: PlannerConfig::default(),
            worker: WorkerConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlannerConfig {
    pub model: ModelConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorkerConfig {
    /// Maximum model calls per subtask.
    pub max_iterations: u32,

    /// Oldest scratchpad text is dropped beyond this many bytes.
    pub scratchpad_budget_bytes: usize,

    pub model: ModelConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            scratchpad_budget_bytes: 40_000,
            model: ModelConfig::default(),
        }
    }
}

/// Language-model backend selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum ModelConfig {
    /// Google Generative Language API.
    Gemini(GeminiConfig),
    /// Any program that reads a prompt on stdin and prints a completion.
    Command(CommandModelConfig),
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig::Gemini(GeminiConfig::default())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeminiConfig {
    pub model: String,
    pub temperature: f32,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            temperature: 0.0,
            api_key_env: "GOOGLE_API_KEY".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CommandModelConfig {
    /// Argv of the model program (e.g. `["ollama", "run", "llama2"]`).
    pub command: Vec<String>,
    pub timeout_secs: u64,
    pub output_limit_bytes: usize,
}

impl Default for CommandModelConfig {
    fn default() -> Self {
        Self {
            command: vec![
                "ollama".to_string(),
                "run".to_string(),
                "llama2".to_string(),
            ],
            timeout_secs: 300,
            output_limit_bytes: 200_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ToolsConfig {
    pub shell_timeout_secs: u64,
    pub git_timeout_secs: u64,
    pub test_timeout_secs: u64,

    /// Command for `RunTests` (e.g. `["pytest"]`, `["cargo", "test"]`).
    pub test_command: Vec<String>,

    /// Shell commands containing any of these substrings are refused.
    pub denylist: Vec<String>,

    /// Truncate tool stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            shell_timeout_secs: 60,
            git_timeout_secs: 30,
            test_timeout_secs: 600,
            test_command: vec!["pytest".to_string()],
            denylist: vec!["rm -rf".to_string(), "sudo".to_string()],
            output_limit_bytes: 100_000,
        }
    }
}

impl ToolsConfig {
    pub fn shell_timeout(&self) -> Duration {
        Duration::from_secs(self.shell_timeout_secs)
    }

    pub fn git_timeout(&self) -> Duration {
        Duration::from_secs(self.git_timeout_secs)
    }

    pub fn test_timeout(&self) -> Duration {
        Duration::from_secs(self.test_timeout_secs)
    }
}

impl ConductorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.recursion_limit == 0 {
            return Err(anyhow!("recursion_limit must be > 0"));
        }
        if self.log_path.as_os_str().is_empty() {
            return Err(anyhow!("log_path must not be empty"));
        }
        if self.worker.max_iterations == 0 {
            return Err(anyhow!("worker.max_iterations must be > 0"));
        }
        if self.worker.scratchpad_budget_bytes == 0 {
            return Err(anyhow!("worker.scratchpad_budget_bytes must be > 0"));
        }
        validate_model("planner.model", &self.planner.model)?;
        validate_model("worker.model", &self.worker.model)?;

        let tools = &self.tools;
        if tools.shell_timeout_secs == 0
            || tools.git_timeout_secs == 0
            || tools.test_timeout_secs == 0
        {
            return Err(anyhow!("tools timeouts must be > 0"));
        }
        if tools.output_limit_bytes == 0 {
            return Err(anyhow!("tools.output_limit_bytes must be > 0"));
        }
        if !is_nonempty_argv(&tools.test_command) {
            return Err(anyhow!("tools.test_command must be a non-empty array"));
        }
        if tools.denylist.iter().any(|entry| entry.trim().is_empty()) {
            return Err(anyhow!("tools.denylist entries must not be blank"));
        }
        Ok(())
    }
}

fn validate_model(label: &str, model: &ModelConfig) -> Result<()> {
    match model {
        ModelConfig::Gemini(cfg) => {
            if cfg.model.trim().is_empty() {
                return Err(anyhow!("{label}.model must not be empty"));
            }
            if cfg.api_key_env.trim().is_empty() {
                return Err(anyhow!("{label}.api_key_env must not be empty"));
            }
            if cfg.timeout_secs == 0 {
                return Err(anyhow!("{label}.timeout_secs must be > 0"));
            }
        }
        ModelConfig::Command(cfg) => {
            if !is_nonempty_argv(&cfg.command) {
                return Err(anyhow!("{label}.command must be a non-empty array"));
            }
            if cfg.timeout_secs == 0 {
                return Err(anyhow!("{label}.timeout_secs must be > 0"));
            }
            if cfg.output_limit_bytes == 0 {
                return Err(anyhow!("{label}.output_limit_bytes must be > 0"));
            }
        }
    }
    Ok(())
}

fn is_nonempty_argv(argv: &[String]) -> bool {
    argv.first().is_some_and(|program| !program.trim().is_empty())
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `ConductorConfig::default()`.
pub fn load_config(path: &Path) -> Result<ConductorConfig> {
    if !path.exists() {
        let cfg = ConductorConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ConductorConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &ConductorConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    if !parent.as_os_str().is_empty() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
