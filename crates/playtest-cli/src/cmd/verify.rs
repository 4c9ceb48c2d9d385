//! `pt verify`: audit enrollment counters against the rows behind them.
//!
//! The counters on enrollments are denormalized from task completions and
//! bug reports. `verify` reports any drift; `--repair` rewrites the stored
//! counters from the underlying rows in one transaction.

use crate::cmd::{engine_failure, open_program, publisher_caller};
use crate::output::{OutputMode, render};
use clap::Args;
use playtest_core::audit;
use playtest_core::model::TitleId;
use std::io::Write as _;
use std::path::Path;

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Title whose counters to audit.
    pub title: String,

    /// Rewrite drifted counters from the underlying rows.
    #[arg(long)]
    pub repair: bool,
}

pub fn run_verify(
    args: &VerifyArgs,
    actor_flag: Option<&str>,
    output: OutputMode,
    program_root: &Path,
) -> anyhow::Result<()> {
    let caller = publisher_caller(actor_flag, output)?;
    let (mut conn, _cfg) = open_program(program_root)?;

    let title = TitleId::new(&args.title)?;
    let drift = if args.repair {
        audit::repair_counters(&mut conn, &caller, &title)
    } else {
        audit::verify_counters(&conn, &caller, &title)
    }
    .map_err(|e| engine_failure(output, e))?;

    let repaired = args.repair;
    render(output, &drift, |drift, w| {
        if drift.is_empty() {
            writeln!(w, "✓ Counters for '{}' are consistent.", title.as_str())?;
            return Ok(());
        }
        let verb = if repaired { "repaired" } else { "found" };
        writeln!(w, "{} drifted counter(s) {verb}:", drift.len())?;
        for d in drift {
            writeln!(
                w,
                "  {} / {}: stored {} but rows say {}",
                d.tester_id, d.field, d.stored, d.actual
            )?;
        }
        if !repaired {
            writeln!(w)?;
            writeln!(w, "Run `pt verify {} --repair` to fix.", title.as_str())?;
        }
        Ok(())
    })
}
