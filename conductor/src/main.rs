//! Command-line entry point for conductor.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use conductor::agents::Planner;
use conductor::core::tool_request::ToolRequest;
use conductor::core::types::{RunOutcome, RunState, SubtaskStatus};
use conductor::exit_codes;
use conductor::io::config::{ConductorConfig, DEFAULT_CONFIG_PATH, load_config, write_config};
use conductor::io::model::build_model;
use conductor::io::run_report::{RunReport, write_run_report};
use conductor::logging;
use conductor::orchestrator::ConfiguredOrchestrator;
use conductor::tools::ToolBox;

#[derive(Parser)]
#[command(
    name = "conductor",
    version,
    about = "Plan a goal into subtasks and execute them with tool-using model agents"
)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write the default config file.
    Init {
        /// Overwrite an existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// Plan the goal and execute every subtask.
    Run {
        /// Natural-language goal.
        goal: Option<String>,
        /// Directory the tools operate in.
        #[arg(long, default_value = ".")]
        workdir: PathBuf,
        /// Write a JSON report of the final state here.
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Print the plan for a goal without executing anything.
    Plan {
        goal: String,
    },
    /// Execute one structured tool request, e.g. '{"tool":"ReadFile","path":"README.md"}'.
    Tool {
        request: String,
        #[arg(long, default_value = ".")]
        workdir: PathBuf,
    },
}

fn main() {
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Init { force } => cmd_init(&cli.config, force),
        Command::Run {
            goal,
            workdir,
            report,
        } => {
            let config = load_config(&cli.config)?;
            logging::init(Some(&config.log_path))?;
            cmd_run(
                &config,
                goal.as_deref().unwrap_or_default(),
                &workdir,
                report.as_deref(),
            )
        }
        Command::Plan { goal } => {
            let config = load_config(&cli.config)?;
            logging::init(Some(&config.log_path))?;
            cmd_plan(&config, &goal)
        }
        Command::Tool { request, workdir } => {
            let config = load_config(&cli.config)?;
            logging::init(None)?;
            cmd_tool(&config, &request, &workdir)
        }
    }
}

fn cmd_init(path: &Path, force: bool) -> Result<i32> {
    if path.exists() && !force {
        println!("{} already exists (use --force to overwrite)", path.display());
        return Ok(exit_codes::OK);
    }
    write_config(path, &ConductorConfig::default())?;
    println!("wrote {}", path.display());
    Ok(exit_codes::OK)
}

fn cmd_run(
    config: &ConductorConfig,
    goal: &str,
    workdir: &Path,
    report_path: Option<&Path>,
) -> Result<i32> {
    let orchestrator = ConfiguredOrchestrator::from_config(config, workdir)
        .context("configure orchestrator")?;

    let mut steps = 0u32;
    let state = orchestrator.run_with_observer(goal, |node, state| {
        steps += 1;
        if let Some(plan) = &state.plan {
            info!(%node, done = plan.done_count(), total = plan.len(), "progress");
        }
    });

    print_summary(&state);
    let report = RunReport::new(state, steps);
    if let Some(path) = report_path {
        write_run_report(path, &report)?;
        info!(path = %path.display(), "wrote run report");
    }

    Ok(match report.outcome {
        RunOutcome::Succeeded(_) => exit_codes::OK,
        RunOutcome::Failed(_) => exit_codes::FAILED,
    })
}

fn cmd_plan(config: &ConductorConfig, goal: &str) -> Result<i32> {
    let planner = Planner::new(build_model(&config.planner.model)?);
    match planner.plan(goal) {
        Ok(plan) => {
            for (i, subtask) in plan.subtasks().iter().enumerate() {
                println!("{}. {}", i + 1, subtask.description);
            }
            Ok(exit_codes::OK)
        }
        Err(err) => {
            eprintln!("{err}");
            Ok(exit_codes::FAILED)
        }
    }
}

fn cmd_tool(config: &ConductorConfig, raw: &str, workdir: &Path) -> Result<i32> {
    let request: ToolRequest = serde_json::from_str(raw).context("parse tool request")?;
    let result = ToolBox::new(workdir, &config.tools).run(&request);
    println!("{result}");
    Ok(exit_codes::OK)
}

fn print_summary(state: &RunState) {
    if let Some(plan) = &state.plan {
        for (i, subtask) in plan.subtasks().iter().enumerate() {
            let mark = match subtask.status {
                SubtaskStatus::Done => "x",
                SubtaskStatus::Pending => " ",
            };
            println!("[{mark}] {}. {}", i + 1, subtask.description);
            if let Some(result) = &subtask.result {
                println!("    {}", result.trim());
            }
        }
    }
    let outcome = state.outcome();
    let label = if outcome.is_success() {
        "Succeeded"
    } else {
        "Failed"
    };
    println!("{label}: {}", outcome.message());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_init_force() {
        let cli = Cli::parse_from(["conductor", "init", "--force"]);
        assert!(matches!(cli.command, Command::Init { force: true }));
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_PATH));
    }

    #[test]
    fn parse_run_without_goal() {
        let cli = Cli::parse_from(["conductor", "run", "--report", "out.json"]);
        match cli.command {
            Command::Run {
                goal,
                workdir,
                report,
            } => {
                assert!(goal.is_none());
                assert_eq!(workdir, PathBuf::from("."));
                assert_eq!(report, Some(PathBuf::from("out.json")));
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::parse_from(["conductor", "plan", "goal", "--config", "c.toml"]);
        assert_eq!(cli.config, PathBuf::from("c.toml"));
        assert!(matches!(cli.command, Command::Plan { ref goal } if goal == "goal"));
    }
}
