//! Stable exit codes for conductor CLI commands.

/// Command succeeded; for `run`, every subtask completed.
pub const OK: i32 = 0;
/// Invalid invocation, config or tool request, or an unexpected error.
pub const INVALID: i32 = 1;
/// `conductor run` or `conductor plan` ended in a failure outcome.
pub const FAILED: i32 = 2;
