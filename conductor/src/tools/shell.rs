//! Shell command tool.

use std::path::Path;
use std::time::Duration;

use tracing::warn;

use crate::io::process::{run_command_with_timeout, shell_command};

pub const REFUSED: &str =
    "Error: Destructive or privileged command detected. Execution aborted for safety.";
pub const TIMED_OUT: &str = "Error: Command timed out.";

/// Shell tool settings, taken from `[tools]` config.
#[derive(Debug, Clone)]
pub struct ShellPolicy<'a> {
    pub denylist: &'a [String],
    pub timeout: Duration,
    pub output_limit_bytes: usize,
}

impl ShellPolicy<'_> {
    fn denied_by(&self, command: &str) -> Option<&str> {
        self.denylist
            .iter()
            .map(String::as_str)
            .find(|pattern| command.contains(pattern))
    }
}

pub fn run_shell_command(workdir: &Path, command: &str, policy: &ShellPolicy<'_>) -> String {
    if let Some(pattern) = policy.denied_by(command) {
        warn!(pattern, "refusing denylisted shell command");
        return REFUSED.to_string();
    }

    let mut cmd = shell_command(command);
    cmd.current_dir(workdir);
    match run_command_with_timeout(cmd, None, policy.timeout, policy.output_limit_bytes) {
        Ok(out) if out.timed_out => TIMED_OUT.to_string(),
        Ok(out) if out.status.success() => {
            format!("Command executed successfully.\nOutput:\n{}", out.stdout_text())
        }
        Ok(out) => format!(
            "Command failed with error code {}.\nOutput:\n{}\nError:\n{}",
            out.exit_code(),
            out.stdout_text(),
            out.stderr_text()
        ),
        Err(e) => format!("Error running command: {e:#}"),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn policy(denylist: &[String]) -> ShellPolicy<'_> {
        ShellPolicy {
            denylist,
            timeout: Duration::from_secs(10),
            output_limit_bytes: 10_000,
        }
    }

    fn default_denylist() -> Vec<String> {
        vec!["rm -rf".to_string(), "sudo".to_string()]
    }

    #[test]
    fn denylisted_command_is_never_spawned() {
        let temp = tempfile::tempdir().expect("tempdir");
        let denylist = default_denylist();
        let marker = temp.path().join("marker");
        let command = format!("touch {} && rm -rf nothing", marker.display());
        assert_eq!(
            run_shell_command(temp.path(), &command, &policy(&denylist)),
            REFUSED
        );
        assert!(!marker.exists());
        assert_eq!(
            run_shell_command(temp.path(), "sudo ls", &policy(&denylist)),
            REFUSED
        );
    }

    #[test]
    fn success_reports_stdout() {
        let temp = tempfile::tempdir().expect("tempdir");
        let denylist = default_denylist();
        assert_eq!(
            run_shell_command(temp.path(), "echo hi", &policy(&denylist)),
            "Command executed successfully.\nOutput:\nhi\n"
        );
    }

    #[test]
    fn runs_in_workdir() {
        let temp = tempfile::tempdir().expect("tempdir");
        std::fs::write(temp.path().join("here.txt"), "").expect("write");
        let denylist = default_denylist();
        let result = run_shell_command(temp.path(), "ls", &policy(&denylist));
        assert!(result.contains("here.txt"), "{result}");
    }

    #[test]
    fn failure_reports_code_and_both_streams() {
        let temp = tempfile::tempdir().expect("tempdir");
        let denylist = default_denylist();
        assert_eq!(
            run_shell_command(
                temp.path(),
                "echo partial; echo broken >&2; exit 7",
                &policy(&denylist)
            ),
            "Command failed with error code 7.\nOutput:\npartial\n\nError:\nbroken\n"
        );
    }

    #[test]
    fn timeout_is_reported() {
        let temp = tempfile::tempdir().expect("tempdir");
        let denylist = default_denylist();
        let policy = ShellPolicy {
            timeout: Duration::from_millis(200),
            ..policy(&denylist)
        };
        assert_eq!(
            run_shell_command(temp.path(), "exec sleep 5", &policy),
            TIMED_OUT
        );
    }
}
