//! Model-driven agents: the planner and the worker.

pub mod planner;
pub mod worker;

pub use planner::{PlanError, Planner};
pub use worker::{Worker, WorkerReport};
