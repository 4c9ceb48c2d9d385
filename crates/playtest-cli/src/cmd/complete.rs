//! `pt complete`: mark a task done and collect its reward.
//!
//! The reward is granted exactly once. Completing the same task again
//! reports "already completed" and grants nothing. A failed delivery is
//! logged, not retried through this command.

use crate::cmd::{engine_failure, open_program, outbound_for, tester_caller};
use crate::output::{OutputMode, render};
use clap::Args;
use playtest_core::model::TaskId;
use playtest_core::tasks;
use std::io::Write as _;
use std::path::Path;

#[derive(Args, Debug)]
pub struct CompleteArgs {
    /// Task to complete (full id, see `pt tasks`).
    pub task: String,
}

pub fn run_complete(
    args: &CompleteArgs,
    actor_flag: Option<&str>,
    output: OutputMode,
    program_root: &Path,
) -> anyhow::Result<()> {
    let caller = tester_caller(actor_flag, output)?;
    let (mut conn, cfg) = open_program(program_root)?;
    let mut outbound = outbound_for(&cfg);

    let task = TaskId::new(&args.task)?;
    let outcome = tasks::complete_task(&mut conn, &mut outbound, &caller, &task)
        .map_err(|e| engine_failure(output, e))?;

    render(output, &outcome, |o, w| {
        if o.already_completed {
            writeln!(w, "Task already completed; no reward issued.")?;
            return Ok(());
        }
        writeln!(w, "✓ Task completed")?;
        if let Some(ref reward) = o.reward {
            if reward.xp > 0 {
                writeln!(w, "  +{} XP", reward.xp)?;
            }
            if reward.points > 0 {
                writeln!(w, "  +{} points", reward.points)?;
            }
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_args_parse_task_id() {
        use clap::Parser;

        #[derive(Parser)]
        struct Wrapper {
            #[command(flatten)]
            args: CompleteArgs,
        }

        let w = Wrapper::parse_from(["test", "task-0a1b2c3d"]);
        assert_eq!(w.args.task, "task-0a1b2c3d");
    }
}
