//! `pt leave`: deactivate an enrollment.
//!
//! Without `--tester` the caller leaves the program themselves. With
//! `--tester` the caller acts as the title's publisher and removes that
//! tester. Either way the enrollment row survives with its counters;
//! leaving twice is a no-op success.

use crate::cmd::{engine_failure, open_program, publisher_caller, tester_caller};
use crate::output::{OutputMode, render_success};
use clap::Args;
use playtest_core::enrollment;
use playtest_core::model::{TesterId, TitleId};
use std::path::Path;

#[derive(Args, Debug)]
pub struct LeaveArgs {
    /// Title whose testing program to leave.
    pub title: String,

    /// Tester to remove (publisher only). Defaults to the caller.
    #[arg(long)]
    pub tester: Option<String>,
}

pub fn run_leave(
    args: &LeaveArgs,
    actor_flag: Option<&str>,
    output: OutputMode,
    program_root: &Path,
) -> anyhow::Result<()> {
    let title = TitleId::new(&args.title)?;

    let (caller, tester) = match args.tester.as_deref() {
        Some(raw) => (publisher_caller(actor_flag, output)?, TesterId::new(raw)?),
        None => {
            let caller = tester_caller(actor_flag, output)?;
            let tester = caller
                .as_tester()
                .map_err(|e| engine_failure(output, e))?
                .clone();
            (caller, tester)
        }
    };

    let (conn, _cfg) = open_program(program_root)?;
    enrollment::deactivate(&conn, &caller, &tester, &title)
        .map_err(|e| engine_failure(output, e))?;

    render_success(
        output,
        &format!("Deactivated {} for '{}'", tester.as_str(), title.as_str()),
    )
}
