//! Deterministic, pure logic for the orchestration loop.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod interpret;
pub mod routing;
pub mod tool_request;
pub mod types;
