//! `pt join`: enroll the calling tester in a title's testing program.
//!
//! Requires the title to be in testing and the agreement to be on file.
//! Rejoining after a deactivation resumes the lifetime counters.

use crate::cmd::{engine_failure, format_seconds, open_program, outbound_for, tester_caller};
use crate::output::{OutputMode, human_kv, render};
use clap::Args;
use playtest_core::enrollment;
use playtest_core::model::TitleId;
use std::io::Write as _;
use std::path::Path;

#[derive(Args, Debug)]
pub struct JoinArgs {
    /// Title to start testing.
    pub title: String,
}

pub fn run_join(
    args: &JoinArgs,
    actor_flag: Option<&str>,
    output: OutputMode,
    program_root: &Path,
) -> anyhow::Result<()> {
    let caller = tester_caller(actor_flag, output)?;
    let (mut conn, cfg) = open_program(program_root)?;
    let mut outbound = outbound_for(&cfg);

    let title = TitleId::new(&args.title)?;
    let enrollment = enrollment::join(&mut conn, &mut outbound, &caller, &title)
        .map_err(|e| engine_failure(output, e))?;

    render(output, &enrollment, |e, w| {
        writeln!(w, "✓ Joined testing for '{}'", e.title_id)?;
        if e.tasks_completed > 0 || e.bugs_reported > 0 || e.time_spent_seconds > 0 {
            writeln!(w, "  lifetime counters resumed")?;
        }
        human_kv(w, "tasks completed", e.tasks_completed.to_string())?;
        human_kv(w, "bugs reported", e.bugs_reported.to_string())?;
        human_kv(w, "time in program", format_seconds(e.time_spent_seconds))?;
        Ok(())
    })
}
