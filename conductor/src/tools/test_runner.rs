//! Test suite tool.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use tracing::info;

use crate::io::process::run_command_with_timeout;

pub const TIMED_OUT: &str = "Error: Test run timed out.";

/// Run the configured test command in `workdir` and tag the result.
pub fn run_tests(
    workdir: &Path,
    test_command: &[String],
    timeout: Duration,
    output_limit_bytes: usize,
) -> String {
    let Some((program, args)) = test_command.split_first() else {
        return "Error running tests: no test command configured".to_string();
    };
    let mut cmd = Command::new(program);
    cmd.args(args).current_dir(workdir);

    match run_command_with_timeout(cmd, None, timeout, output_limit_bytes) {
        Ok(out) if out.timed_out => TIMED_OUT.to_string(),
        Ok(out) if out.status.success() => {
            info!(program = %program, "tests passed");
            format!("Tests passed successfully.\n{}", out.stdout_text())
        }
        Ok(out) => {
            info!(program = %program, exit_code = out.exit_code(), "tests failed");
            format!(
                "Tests failed!\nSTDOUT:\n{}\nSTDERR:\n{}",
                out.stdout_text(),
                out.stderr_text()
            )
        }
        Err(e) => format!("Error running tests: {e:#}"),
    }
}
