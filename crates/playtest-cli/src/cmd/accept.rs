//! `pt accept`: record acceptance of a title's testing agreement.
//!
//! Accepting twice is absorbed: the original record, original evidence
//! included, is what comes back.

use crate::cmd::{engine_failure, format_us, open_program, tester_caller};
use crate::output::{OutputMode, human_kv, render};
use clap::Args;
use playtest_core::agreement::{self, AcceptanceEvidence};
use playtest_core::model::TitleId;
use playtest_core::store;
use std::io::Write as _;
use std::path::Path;

#[derive(Args, Debug)]
pub struct AcceptArgs {
    /// Title whose testing agreement is being accepted.
    pub title: String,

    /// Where the acceptance happened (e.g. `cli`, `web`, `launcher`).
    #[arg(long, default_value = "cli")]
    pub origin: String,
}

pub fn run_accept(
    args: &AcceptArgs,
    actor_flag: Option<&str>,
    output: OutputMode,
    program_root: &Path,
) -> anyhow::Result<()> {
    let caller = tester_caller(actor_flag, output)?;
    let (conn, _cfg) = open_program(program_root)?;

    let title = TitleId::new(&args.title)?;
    let evidence = AcceptanceEvidence {
        recorded_at_us: store::now_us(),
        origin: args.origin.clone(),
    };

    let outcome = agreement::record_acceptance(&conn, &caller, &title, &evidence)
        .map_err(|e| engine_failure(output, e))?;

    render(output, &outcome, |o, w| {
        if o.newly_accepted {
            writeln!(w, "✓ Agreement accepted for '{}'", o.record.title_id)?;
        } else {
            writeln!(w, "Agreement already on file for '{}'", o.record.title_id)?;
        }
        human_kv(w, "accepted at", format_us(o.record.accepted_at_us))?;
        human_kv(w, "origin", &o.record.evidence.origin)?;
        Ok(())
    })
}
