//! End-to-end runs of the orchestrator loop with scripted models.
//!
//! The planner and worker models are replayed from fixed scripts; tools run
//! for real against a temporary directory or git repository.

use std::fs;
use std::path::Path;

use conductor::agents::{Planner, Worker};
use conductor::core::routing::Node;
use conductor::core::types::{RunOutcome, SubtaskStatus};
use conductor::io::config::ToolsConfig;
use conductor::io::prompt::PromptBuilder;
use conductor::orchestrator::Orchestrator;
use conductor::test_support::{ScriptedModel, TestRepo};
use conductor::tools::ToolBox;

fn orchestrator<'a>(
    planner: &'a ScriptedModel,
    worker: &'a ScriptedModel,
    workdir: &Path,
    recursion_limit: u32,
) -> Orchestrator<&'a ScriptedModel, &'a ScriptedModel> {
    Orchestrator::new(
        Planner::new(planner),
        Worker::new(
            worker,
            ToolBox::new(workdir, &ToolsConfig::default()),
            PromptBuilder::default(),
            5,
        ),
        recursion_limit,
    )
}

/// Two subtasks: write a file, then commit it. Data flows through the file.
///
/// ```text
/// orchestrator (plan) -> worker -> orchestrator -> worker -> orchestrator -> END
/// ```
#[test]
fn plan_with_preamble_runs_every_subtask_in_order() {
    let repo = TestRepo::new().expect("repo");
    let planner = ScriptedModel::new([
        r#"Sure! Here is the plan: ["Write 'a, b, c' to letters.txt", "Commit letters.txt"]"#,
    ]);
    let worker = ScriptedModel::new([
        "Thought: write it.\nAction: WriteFile\nAction Input: {\"path\": \"letters.txt\", \"content\": \"a, b, c\"}",
        "Final Answer: letters.txt written",
        "Thought: commit.\nAction: GitCommit\nAction Input: {\"message\": \"Add letters, first pass\"}",
        "Final Answer: committed",
    ]);

    let mut visits = Vec::new();
    let state = orchestrator(&planner, &worker, repo.path(), 50)
        .run_with_observer("Create letters.txt and commit it", |node, _| visits.push(node));

    assert_eq!(
        visits,
        vec![
            Node::Orchestrator,
            Node::Worker,
            Node::Orchestrator,
            Node::Worker,
            Node::Orchestrator,
        ]
    );
    let plan = state.plan.as_ref().expect("plan");
    assert_eq!(state.current_index, plan.len());
    assert!(plan.subtasks().iter().all(|s| s.status == SubtaskStatus::Done));
    assert_eq!(plan.subtasks()[0].result.as_deref(), Some("letters.txt written"));
    assert_eq!(
        state.outcome(),
        RunOutcome::Succeeded("All subtasks completed successfully.".to_string())
    );
    assert!(state.error_message.is_none());

    assert_eq!(
        fs::read_to_string(repo.path().join("letters.txt")).expect("read"),
        "a, b, c"
    );
    let prompts = worker.prompts();
    assert!(
        prompts[3].contains("Observation: Successfully committed changes with message: 'Add letters, first pass' to branch 'main'.")
    );
}

#[test]
fn single_subtask_plan_visits_worker_once() {
    let temp = tempfile::tempdir().expect("tempdir");
    let planner = ScriptedModel::new([r#"["Write notes.txt"]"#]);
    let worker = ScriptedModel::new([
        "Action: WriteFile\nAction Input: {\"path\": \"notes.txt\", \"content\": \"hi\"}",
        "Final Answer: notes.txt written",
    ]);

    let mut visits = Vec::new();
    let state = orchestrator(&planner, &worker, temp.path(), 50)
        .run_with_observer("Write notes", |node, _| visits.push(node));

    assert_eq!(
        visits,
        vec![Node::Orchestrator, Node::Worker, Node::Orchestrator]
    );
    assert_eq!(state.current_index, 1);
    assert!(state.last_worker_output.is_none());
    assert_eq!(
        state.outcome(),
        RunOutcome::Succeeded("All subtasks completed successfully.".to_string())
    );
}

#[test]
fn blank_goal_never_reaches_the_planner() {
    let temp = tempfile::tempdir().expect("tempdir");
    let planner = ScriptedModel::default();
    let worker = ScriptedModel::default();

    let mut visits = 0;
    let state =
        orchestrator(&planner, &worker, temp.path(), 50).run_with_observer("   ", |_, _| visits += 1);

    assert_eq!(visits, 0);
    assert!(planner.prompts().is_empty());
    assert_eq!(state.error_message.as_deref(), Some("User goal not provided."));
    assert_eq!(
        state.final_result.as_deref(),
        Some("Run failed: User goal not provided.")
    );
    assert!(!state.outcome().is_success());
}

#[test]
fn planner_failure_ends_run_with_orchestrator_error() {
    let temp = tempfile::tempdir().expect("tempdir");
    let planner = ScriptedModel::failing("service unavailable");
    let worker = ScriptedModel::default();

    let state = orchestrator(&planner, &worker, temp.path(), 50).run("Do something");

    assert!(state.plan.is_none());
    assert_eq!(
        state.error_message.as_deref(),
        Some("Exception during plan generation: service unavailable")
    );
    assert_eq!(
        state.final_result.as_deref(),
        Some("Run failed due to orchestrator error: Exception during plan generation: service unavailable")
    );
    assert!(worker.prompts().is_empty());
}

#[test]
fn reply_without_array_produces_no_plan() {
    let temp = tempfile::tempdir().expect("tempdir");
    let planner = ScriptedModel::new(["I'd rather not."]);
    let worker = ScriptedModel::default();

    let state = orchestrator(&planner, &worker, temp.path(), 50).run("Do something");

    assert!(state.plan.is_none());
    assert_eq!(
        state.error_message.as_deref(),
        Some("No JSON list in LLM plan response (regex).")
    );
    assert!(!state.outcome().is_success());
    assert!(worker.prompts().is_empty());
}

#[test]
fn malformed_plan_ends_run_with_orchestrator_error() {
    let temp = tempfile::tempdir().expect("tempdir");
    let planner = ScriptedModel::new([r#"[{"step": 1}]"#]);
    let worker = ScriptedModel::default();

    let state = orchestrator(&planner, &worker, temp.path(), 50).run("Do something");

    assert_eq!(
        state.outcome(),
        RunOutcome::Failed(
            "Run failed due to orchestrator error: LLM plan has incorrect format (not a list of strings)."
                .to_string()
        )
    );
}

#[test]
fn worker_error_stops_run_without_completing_subtask() {
    let temp = tempfile::tempdir().expect("tempdir");
    let planner = ScriptedModel::new([r#"["first", "second"]"#]);
    let worker = ScriptedModel::failing("rate limited");

    let mut visits = Vec::new();
    let state = orchestrator(&planner, &worker, temp.path(), 50)
        .run_with_observer("goal", |node, _| visits.push(node));

    assert_eq!(
        visits,
        vec![Node::Orchestrator, Node::Worker, Node::Orchestrator]
    );
    assert_eq!(state.current_index, 0);
    let first = &state.plan.as_ref().expect("plan").subtasks()[0];
    assert_eq!(first.status, SubtaskStatus::Pending);
    assert_eq!(
        first.result.as_deref(),
        Some("Error executing subtask: rate limited")
    );
    assert_eq!(state.last_worker_error.as_deref(), Some("rate limited"));
    assert_eq!(
        state.final_result.as_deref(),
        Some("Run failed due to worker error: rate limited")
    );
    assert!(!state.outcome().is_success());
}

#[test]
fn recursion_limit_ends_long_runs() {
    let temp = tempfile::tempdir().expect("tempdir");
    let planner = ScriptedModel::new([r#"["one", "two", "three"]"#]);
    let worker = ScriptedModel::new([
        "Final Answer: one done",
        "Final Answer: two done",
        "Final Answer: three done",
    ]);

    // plan + (worker, orchestrator) per subtask = 7 node executions needed.
    let state = orchestrator(&planner, &worker, temp.path(), 4).run("goal");

    assert_eq!(
        state.error_message.as_deref(),
        Some("Recursion limit of 4 reached without hitting a stop condition.")
    );
    assert_eq!(state.current_index, 1);
    assert_eq!(state.last_worker_output.as_deref(), Some("two done"));
    assert!(!state.outcome().is_success());
}

#[test]
fn iteration_limit_still_completes_subtask() {
    let temp = tempfile::tempdir().expect("tempdir");
    let planner = ScriptedModel::new([r#"["look around"]"#]);
    let worker = ScriptedModel::new(
        std::iter::repeat_n("Action: RunShellCommand\nAction Input: {\"command\": \"echo hi\"}", 5),
    );

    let state = orchestrator(&planner, &worker, temp.path(), 50).run("goal");

    let plan = state.plan.as_ref().expect("plan");
    assert_eq!(
        plan.subtasks()[0].result.as_deref(),
        Some("Agent stopped due to iteration limit.")
    );
    assert!(state.outcome().is_success());
}
