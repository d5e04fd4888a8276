//! Git adapter for the commit tool.
//!
//! Every call is bounded by a timeout and runs in the configured working
//! directory. Raw [`CommandOutput`] is returned so the caller can classify
//! failures itself.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tracing::{debug, instrument, warn};

use crate::io::process::{CommandOutput, run_command_with_timeout};

pub const DEFAULT_GIT_TIMEOUT: Duration = Duration::from_secs(30);
const GIT_OUTPUT_LIMIT_BYTES: usize = 100_000;

/// Wrapper for executing git commands in a working directory.
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
    timeout: Duration,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            timeout: DEFAULT_GIT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Name of the checked-out branch. Works before the first commit; errors on
    /// a detached HEAD.
    #[instrument(skip_all)]
    pub fn current_branch(&self) -> Result<String> {
        let out = self.run(&["symbolic-ref", "--short", "-q", "HEAD"])?;
        if out.timed_out {
            return Err(anyhow!("git symbolic-ref timed out after {:?}", self.timeout));
        }
        if !out.status.success() {
            warn!("detached HEAD detected");
            return Err(anyhow!("detached HEAD"));
        }
        let name = String::from_utf8_lossy(&out.stdout).trim().to_string();
        debug!(branch = %name, "current branch");
        Ok(name)
    }

    /// Stage all changes (respects .gitignore).
    pub fn add_all(&self) -> Result<CommandOutput> {
        self.run(&["add", "-A"])
    }

    /// `git diff --cached --quiet`: exit 0 means nothing is staged, 1 means
    /// something is.
    pub fn diff_staged_quiet(&self) -> Result<CommandOutput> {
        self.run(&["diff", "--cached", "--quiet"])
    }

    /// Run `git commit -m <message>`. The message is passed as a single argument,
    /// never through a shell.
    #[instrument(skip_all)]
    pub fn commit(&self, message: &str) -> Result<CommandOutput> {
        debug!("committing staged changes");
        self.run(&["commit", "-m", message])
    }

    /// Run git with `args`, returning raw output. Spawn failures are errors;
    /// non-zero exits and timeouts are reported in the output.
    pub fn run(&self, args: &[&str]) -> Result<CommandOutput> {
        let mut cmd = Command::new("git");
        cmd.args(args).current_dir(&self.workdir);
        run_command_with_timeout(cmd, None, self.timeout, GIT_OUTPUT_LIMIT_BYTES)
            .map_err(|err| err.context(format!("spawn git {}", args.join(" "))))
    }
}
