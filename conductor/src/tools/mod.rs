//! Side-effecting tools the worker can invoke.
//!
//! Tools never fail outward: every outcome, including refusals, timeouts and
//! missing programs, is reported as a human-readable string that becomes the
//! worker's next observation.

pub mod fs;
pub mod git;
pub mod shell;
pub mod test_runner;

use std::path::{Path, PathBuf};

use tracing::{info, instrument};

use crate::core::tool_request::{ToolName, ToolRequest};
use crate::io::config::ToolsConfig;
use crate::io::git::Git;

use self::shell::ShellPolicy;

/// All tools, bound to one working directory.
#[derive(Debug, Clone)]
pub struct ToolBox {
    workdir: PathBuf,
    config: ToolsConfig,
    git: Git,
}

impl ToolBox {
    pub fn new(workdir: impl Into<PathBuf>, config: &ToolsConfig) -> Self {
        let workdir = workdir.into();
        let git = Git::new(workdir.clone()).with_timeout(config.git_timeout());
        Self {
            workdir,
            config: config.clone(),
            git,
        }
    }

    /// Tools offered to the worker model.
    pub fn available(&self) -> &'static [ToolName] {
        &ToolName::ALL
    }

    /// Execute one request and return its result string.
    #[instrument(skip_all, fields(tool = %request.name()))]
    pub fn run(&self, request: &ToolRequest) -> String {
        let result = match request {
            ToolRequest::ReadFile { path } => fs::read_file(&self.workdir, path),
            ToolRequest::WriteFile { path, content } => {
                fs::write_file(&self.workdir, path, content)
            }
            ToolRequest::RunShellCommand { command } => {
                let policy = ShellPolicy {
                    denylist: &self.config.denylist,
                    timeout: self.config.shell_timeout(),
                    output_limit_bytes: self.config.output_limit_bytes,
                };
                shell::run_shell_command(&self.workdir, command, &policy)
            }
            ToolRequest::RunTests => test_runner::run_tests(
                &self.workdir,
                &self.config.test_command,
                self.config.test_timeout(),
                self.config.output_limit_bytes,
            ),
            ToolRequest::GitCommit { message, branch } => {
                git::git_commit(&self.git, message, branch)
            }
        };
        info!(result_bytes = result.len(), "tool finished");
        result
    }
}

/// Relative paths are taken from the tool working directory.
fn resolve(workdir: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        workdir.join(path)
    }
}
