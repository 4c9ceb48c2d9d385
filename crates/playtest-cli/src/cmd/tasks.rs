//! `pt tasks`: the caller's view of a title's task catalog.
//!
//! Shows every published task with the caller's own completion state, in
//! the publisher's display order. Requires an active enrollment.

use crate::cmd::{engine_failure, format_us, open_program, tester_caller};
use crate::output::{OutputMode, render};
use clap::Args;
use playtest_core::model::TitleId;
use playtest_core::tasks;
use std::io::Write as _;
use std::path::Path;

#[derive(Args, Debug)]
pub struct TasksArgs {
    /// Title whose task catalog to show.
    pub title: String,
}

pub fn run_tasks(
    args: &TasksArgs,
    actor_flag: Option<&str>,
    output: OutputMode,
    program_root: &Path,
) -> anyhow::Result<()> {
    let caller = tester_caller(actor_flag, output)?;
    let (conn, _cfg) = open_program(program_root)?;

    let title = TitleId::new(&args.title)?;
    let catalog =
        tasks::list_for_tester(&conn, &caller, &title).map_err(|e| engine_failure(output, e))?;

    render(output, &catalog, |entries, w| {
        if entries.is_empty() {
            writeln!(w, "No tasks published for '{}' yet.", title.as_str())?;
            return Ok(());
        }
        let done = entries.iter().filter(|e| e.completed_at_us.is_some()).count();
        writeln!(
            w,
            "Tasks for '{}' ({done}/{} done)",
            title.as_str(),
            entries.len()
        )?;
        for entry in entries {
            let mark = if entry.completed_at_us.is_some() { "x" } else { " " };
            let optional = if entry.task.is_optional { "  (optional)" } else { "" };
            writeln!(w)?;
            writeln!(
                w,
                "[{mark}] {}  [{}]  +{} XP +{} pts{optional}",
                entry.task.name, entry.task.kind, entry.task.xp_reward, entry.task.points_reward,
            )?;
            writeln!(w, "    id: {}", entry.task.task_id)?;
            if let Some(at) = entry.completed_at_us {
                writeln!(w, "    completed {}", format_us(at))?;
            }
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tasks_args_parse_title() {
        use clap::Parser;

        #[derive(Parser)]
        struct Wrapper {
            #[command(flatten)]
            args: TasksArgs,
        }

        let w = Wrapper::parse_from(["test", "vale-of-shadows"]);
        assert_eq!(w.args.title, "vale-of-shadows");
    }
}
