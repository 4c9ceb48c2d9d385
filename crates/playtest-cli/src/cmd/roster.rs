//! `pt roster`: every enrollment for a title, newest join first.
//!
//! Publisher-only. Deactivated testers stay on the roster with their
//! lifetime counters; the ACTIVE column tells them apart.

use crate::cmd::{engine_failure, format_seconds, format_us, open_program, publisher_caller};
use crate::output::{OutputMode, render};
use clap::Args;
use playtest_core::enrollment;
use playtest_core::model::TitleId;
use std::io::Write as _;
use std::path::Path;

#[derive(Args, Debug)]
pub struct RosterArgs {
    /// Title whose roster to show.
    pub title: String,

    /// Only show active enrollments.
    #[arg(long)]
    pub active: bool,
}

pub fn run_roster(
    args: &RosterArgs,
    actor_flag: Option<&str>,
    output: OutputMode,
    program_root: &Path,
) -> anyhow::Result<()> {
    let caller = publisher_caller(actor_flag, output)?;
    let (conn, _cfg) = open_program(program_root)?;

    let title = TitleId::new(&args.title)?;
    let mut roster =
        enrollment::roster(&conn, &caller, &title).map_err(|e| engine_failure(output, e))?;
    if args.active {
        roster.retain(|e| e.is_active);
    }

    render(output, &roster, |rows, w| {
        if rows.is_empty() {
            writeln!(w, "No testers enrolled for '{}'.", title.as_str())?;
            return Ok(());
        }
        writeln!(
            w,
            "{:<20}  {:<6}  {:>5}  {:>5}  {:>9}  JOINED",
            "TESTER", "ACTIVE", "TASKS", "BUGS", "TIME"
        )?;
        for row in rows {
            writeln!(
                w,
                "{:<20}  {:<6}  {:>5}  {:>5}  {:>9}  {}",
                row.tester_id,
                if row.is_active { "yes" } else { "no" },
                row.tasks_completed,
                row.bugs_reported,
                format_seconds(row.time_spent_seconds),
                format_us(row.joined_at_us),
            )?;
        }
        Ok(())
    })
}
