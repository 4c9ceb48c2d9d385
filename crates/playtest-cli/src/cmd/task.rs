//! `pt task`: publisher-side task catalog management.
//!
//! Subcommands:
//! - `pt task add <title> --name ...`: publish a new task
//! - `pt task update <task-id> [--name ...]`: rewrite fields, history kept
//! - `pt task rm <task-id> --yes`: delete a task and its completions
//! - `pt task progress <title>`: completion counts across the catalog

use crate::cmd::{engine_failure, open_program, outbound_for, publisher_caller};
use crate::output::{CliError, OutputMode, human_kv, render, render_error};
use clap::{Args, Subcommand};
use playtest_core::EngineError;
use playtest_core::model::{TaskId, TaskKind, TaskSpec, TitleId};
use playtest_core::tasks;
use std::io::Write as _;
use std::path::Path;

#[derive(Args, Debug)]
pub struct TaskArgs {
    #[command(subcommand)]
    pub command: TaskCommand,
}

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    #[command(
        about = "Publish a task to a title's catalog",
        after_help = "EXAMPLES:\n    pt task add vale-of-shadows --name \"Clear the tutorial\" --xp 150 --points 10\n\n    pt task add vale-of-shadows --name \"Stress the photo mode\" \\\n        --kind test-feature --optional"
    )]
    Add(TaskAddArgs),

    #[command(about = "Rewrite a task's fields (completion history is kept)")]
    Update(TaskUpdateArgs),

    #[command(
        about = "Delete a task and its completion history",
        after_help = "EXAMPLES:\n    pt task rm task-5a0e... --yes"
    )]
    Rm(TaskRmArgs),

    #[command(about = "Show per-task completion counts for a title")]
    Progress(TaskProgressArgs),
}

#[derive(Args, Debug)]
pub struct TaskAddArgs {
    /// Title the task belongs to.
    pub title: String,

    /// Short task name shown to testers.
    #[arg(short, long)]
    pub name: String,

    /// Longer instructions for the tester.
    #[arg(short, long, default_value = "")]
    pub description: String,

    /// Task kind: bug-report, suggestion, play-level, or test-feature.
    #[arg(short, long, default_value = "play-level")]
    pub kind: String,

    /// XP granted on completion.
    #[arg(long, default_value_t = 0)]
    pub xp: u32,

    /// Reward points granted on completion.
    #[arg(long, default_value_t = 0)]
    pub points: u32,

    /// Mark the task optional.
    #[arg(long)]
    pub optional: bool,

    /// Position in the tester-facing catalog (lower sorts first).
    #[arg(long, default_value_t = 0)]
    pub order: i64,
}

#[derive(Args, Debug)]
pub struct TaskUpdateArgs {
    /// Task to update (full id, see `pt task progress`).
    pub task: String,

    /// New task name.
    #[arg(short, long)]
    pub name: Option<String>,

    /// New instructions.
    #[arg(short, long)]
    pub description: Option<String>,

    /// New kind: bug-report, suggestion, play-level, or test-feature.
    #[arg(short, long)]
    pub kind: Option<String>,

    /// New XP reward.
    #[arg(long)]
    pub xp: Option<u32>,

    /// New points reward.
    #[arg(long)]
    pub points: Option<u32>,

    /// Change whether the task is optional (true/false).
    #[arg(long)]
    pub optional: Option<bool>,

    /// New catalog position.
    #[arg(long)]
    pub order: Option<i64>,
}

#[derive(Args, Debug)]
pub struct TaskRmArgs {
    /// Task to delete.
    pub task: String,

    /// Confirm the deletion. Completion history is lost; affected
    /// testers' completion counters are walked back.
    #[arg(long)]
    pub yes: bool,
}

#[derive(Args, Debug)]
pub struct TaskProgressArgs {
    /// Title whose catalog to report on.
    pub title: String,
}

pub fn run_task(
    args: &TaskArgs,
    actor_flag: Option<&str>,
    output: OutputMode,
    program_root: &Path,
) -> anyhow::Result<()> {
    match &args.command {
        TaskCommand::Add(a) => run_add(a, actor_flag, output, program_root),
        TaskCommand::Update(a) => run_update(a, actor_flag, output, program_root),
        TaskCommand::Rm(a) => run_rm(a, actor_flag, output, program_root),
        TaskCommand::Progress(a) => run_progress(a, actor_flag, output, program_root),
    }
}

fn run_add(
    args: &TaskAddArgs,
    actor_flag: Option<&str>,
    output: OutputMode,
    program_root: &Path,
) -> anyhow::Result<()> {
    let caller = publisher_caller(actor_flag, output)?;
    let (conn, cfg) = open_program(program_root)?;
    let mut outbound = outbound_for(&cfg);

    let title = TitleId::new(&args.title)?;
    let spec = TaskSpec {
        name: args.name.clone(),
        description: args.description.clone(),
        kind: args.kind.parse::<TaskKind>()?,
        xp_reward: args.xp,
        points_reward: args.points,
        is_optional: args.optional,
        display_order: args.order,
    };

    let task = tasks::create_task(&conn, &mut outbound, &caller, &title, spec)
        .map_err(|e| engine_failure(output, e))?;

    render(output, &task, |t, w| {
        writeln!(w, "✓ Published task '{}'", t.name)?;
        human_kv(w, "id", &t.task_id)?;
        human_kv(w, "kind", t.kind.as_str())?;
        human_kv(w, "reward", format!("{} XP, {} pts", t.xp_reward, t.points_reward))?;
        Ok(())
    })
}

fn run_update(
    args: &TaskUpdateArgs,
    actor_flag: Option<&str>,
    output: OutputMode,
    program_root: &Path,
) -> anyhow::Result<()> {
    let caller = publisher_caller(actor_flag, output)?;
    let (conn, _cfg) = open_program(program_root)?;

    let task_id = TaskId::new(&args.task)?;
    let existing = tasks::get(&conn, &task_id)
        .map_err(|e| engine_failure(output, e))?
        .ok_or_else(|| {
            engine_failure(
                output,
                EngineError::TaskNotFound(task_id.as_str().to_string()),
            )
        })?;

    // Unspecified flags keep the stored value.
    let kind = match args.kind.as_deref() {
        Some(raw) => raw.parse::<TaskKind>()?,
        None => existing.kind,
    };
    let spec = TaskSpec {
        name: args.name.clone().unwrap_or(existing.name),
        description: args.description.clone().unwrap_or(existing.description),
        kind,
        xp_reward: args.xp.unwrap_or(existing.xp_reward),
        points_reward: args.points.unwrap_or(existing.points_reward),
        is_optional: args.optional.unwrap_or(existing.is_optional),
        display_order: args.order.unwrap_or(existing.display_order),
    };

    let task = tasks::update_task(&conn, &caller, &task_id, spec)
        .map_err(|e| engine_failure(output, e))?;

    render(output, &task, |t, w| {
        writeln!(w, "✓ Updated task '{}'", t.name)?;
        human_kv(w, "kind", t.kind.as_str())?;
        human_kv(w, "reward", format!("{} XP, {} pts", t.xp_reward, t.points_reward))?;
        human_kv(w, "optional", if t.is_optional { "yes" } else { "no" })?;
        Ok(())
    })
}

fn run_rm(
    args: &TaskRmArgs,
    actor_flag: Option<&str>,
    output: OutputMode,
    program_root: &Path,
) -> anyhow::Result<()> {
    if !args.yes {
        let message = format!(
            "Deleting {} also deletes its completion history.",
            args.task
        );
        render_error(
            output,
            &CliError::usage("confirm_required", &message, "Re-run with --yes to confirm"),
        )?;
        anyhow::bail!("deletion not confirmed");
    }

    let caller = publisher_caller(actor_flag, output)?;
    let (mut conn, _cfg) = open_program(program_root)?;

    let task_id = TaskId::new(&args.task)?;
    let deletion =
        tasks::delete_task(&mut conn, &caller, &task_id).map_err(|e| engine_failure(output, e))?;

    render(output, &deletion, |d, w| {
        writeln!(
            w,
            "✓ Deleted {} ({} completion{} removed)",
            d.task_id,
            d.completions_removed,
            if d.completions_removed == 1 { "" } else { "s" },
        )
    })
}

fn run_progress(
    args: &TaskProgressArgs,
    actor_flag: Option<&str>,
    output: OutputMode,
    program_root: &Path,
) -> anyhow::Result<()> {
    let caller = publisher_caller(actor_flag, output)?;
    let (conn, _cfg) = open_program(program_root)?;

    let title = TitleId::new(&args.title)?;
    let progress =
        tasks::list_with_progress(&conn, &caller, &title).map_err(|e| engine_failure(output, e))?;

    render(output, &progress, |rows, w| {
        if rows.is_empty() {
            writeln!(w, "No tasks published for '{}' yet.", title.as_str())?;
            return Ok(());
        }
        writeln!(w, "{:<9}  {:<28}  {:<12}  ID", "DONE", "NAME", "KIND")?;
        for row in rows {
            let done = format!("{}/{}", row.completion_count, row.active_tester_count);
            writeln!(
                w,
                "{done:<9}  {:<28}  {:<12}  {}",
                row.task.name,
                row.task.kind.as_str(),
                row.task.task_id,
            )?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(subcommand)]
        cmd: TaskCommand,
    }

    #[test]
    fn task_add_defaults() {
        let w = Wrapper::parse_from(["test", "add", "vale", "--name", "Clear the tutorial"]);
        match w.cmd {
            TaskCommand::Add(a) => {
                assert_eq!(a.title, "vale");
                assert_eq!(a.name, "Clear the tutorial");
                assert_eq!(a.kind, "play-level");
                assert_eq!(a.xp, 0);
                assert_eq!(a.points, 0);
                assert!(!a.optional);
                assert_eq!(a.order, 0);
            }
            other => panic!("expected Add, got {other:?}"),
        }
    }

    #[test]
    fn task_add_full_flags() {
        let w = Wrapper::parse_from([
            "test", "add", "vale", "--name", "Stress photo mode", "--kind", "test-feature",
            "--xp", "150", "--points", "10", "--optional", "--order", "3",
        ]);
        match w.cmd {
            TaskCommand::Add(a) => {
                assert_eq!(a.kind, "test-feature");
                assert_eq!(a.xp, 150);
                assert_eq!(a.points, 10);
                assert!(a.optional);
                assert_eq!(a.order, 3);
            }
            other => panic!("expected Add, got {other:?}"),
        }
    }

    #[test]
    fn task_update_flags_are_all_optional() {
        let w = Wrapper::parse_from(["test", "update", "task-1", "--xp", "200"]);
        match w.cmd {
            TaskCommand::Update(a) => {
                assert_eq!(a.task, "task-1");
                assert!(a.name.is_none());
                assert_eq!(a.xp, Some(200));
                assert!(a.optional.is_none());
            }
            other => panic!("expected Update, got {other:?}"),
        }
    }

    #[test]
    fn task_update_optional_takes_an_explicit_bool() {
        let w = Wrapper::parse_from(["test", "update", "task-1", "--optional", "false"]);
        match w.cmd {
            TaskCommand::Update(a) => assert_eq!(a.optional, Some(false)),
            other => panic!("expected Update, got {other:?}"),
        }
    }

    #[test]
    fn task_rm_defaults_to_unconfirmed() {
        let w = Wrapper::parse_from(["test", "rm", "task-1"]);
        match w.cmd {
            TaskCommand::Rm(a) => {
                assert_eq!(a.task, "task-1");
                assert!(!a.yes);
            }
            other => panic!("expected Rm, got {other:?}"),
        }
    }

    #[test]
    fn task_rm_without_yes_is_refused() {
        let args = TaskRmArgs {
            task: "task-1".to_string(),
            yes: false,
        };
        let dir = std::env::temp_dir();
        let result = run_rm(&args, Some("acme"), OutputMode::Human, &dir);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("not confirmed"));
    }

    #[test]
    fn task_progress_parses() {
        let w = Wrapper::parse_from(["test", "progress", "vale"]);
        match w.cmd {
            TaskCommand::Progress(a) => assert_eq!(a.title, "vale"),
            other => panic!("expected Progress, got {other:?}"),
        }
    }
}
