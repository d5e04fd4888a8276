//! Git commit tool.

use anyhow::Error;
use tracing::{info, warn};

use crate::io::git::Git;
use crate::io::process::{CommandOutput, is_not_found};

pub const NOTHING_TO_COMMIT: &str = "No changes to commit.";
pub const TIMED_OUT: &str = "Error: Git command timed out.";
pub const NOT_FOUND: &str = "Error: Git command not found. Is Git installed and in PATH?";

/// Stage everything and commit on the current branch.
///
/// `branch` is the branch the caller expects. No checkout is performed; when
/// HEAD is on a different branch the result says so.
pub fn git_commit(git: &Git, message: &str, branch: &str) -> String {
    match commit_inner(git, message, branch) {
        Ok(result) => result,
        Err(e) if is_not_found(&e) => NOT_FOUND.to_string(),
        Err(e) => format!("Error committing changes: {e:#}"),
    }
}

fn commit_inner(git: &Git, message: &str, branch: &str) -> Result<String, Error> {
    let staged = git.add_all()?;
    if staged.timed_out {
        return Ok(TIMED_OUT.to_string());
    }
    if !staged.status.success() {
        return Ok(format!("Error staging files: {}", staged.stderr_text()));
    }

    let diff = git.diff_staged_quiet()?;
    if diff.timed_out {
        return Ok(TIMED_OUT.to_string());
    }
    match diff.exit_code() {
        0 => return Ok(NOTHING_TO_COMMIT.to_string()),
        1 => {}
        _ => return Ok(format!("Error committing changes: {}", diff.stderr_text())),
    }

    let commit = git.commit(message)?;
    if commit.timed_out {
        return Ok(TIMED_OUT.to_string());
    }
    if !commit.status.success() {
        if says_nothing_to_commit(&commit) {
            return Ok(NOTHING_TO_COMMIT.to_string());
        }
        return Ok(format!("Error committing changes: {}", commit.stderr_text()));
    }

    info!(branch, "committed changes");
    let mut result = format!(
        "Successfully committed changes with message: '{message}' to branch '{branch}'.\nOutput:\n{}",
        commit.stdout_text()
    );
    match git.current_branch() {
        Ok(actual) if actual != branch => {
            warn!(requested = branch, actual = %actual, "commit landed on a different branch");
            result.push_str(&format!(
                "\nNote: the commit was made on the current branch '{actual}', not '{branch}'."
            ));
        }
        Ok(_) => {}
        Err(e) => warn!(err = %e, "could not determine current branch"),
    }
    Ok(result)
}

fn says_nothing_to_commit(out: &CommandOutput) -> bool {
    let text = format!("{}{}", out.stdout_text(), out.stderr_text()).to_lowercase();
    text.contains("nothing to commit") || text.contains("no changes added to commit")
}
