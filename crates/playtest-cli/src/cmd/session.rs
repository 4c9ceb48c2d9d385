//! `pt session`: add play time to the caller's active enrollment.
//!
//! Time only accumulates. Zero is accepted and changes nothing, but still
//! requires an active enrollment, so a broken launcher hook fails loudly.

use crate::cmd::{engine_failure, format_seconds, open_program, tester_caller};
use crate::output::{OutputMode, human_kv, render};
use clap::Args;
use playtest_core::enrollment;
use playtest_core::model::TitleId;
use std::io::Write as _;
use std::path::Path;

#[derive(Args, Debug)]
pub struct SessionArgs {
    /// Title the session was played on.
    pub title: String,

    /// Seconds of play time to record.
    pub seconds: u32,
}

pub fn run_session(
    args: &SessionArgs,
    actor_flag: Option<&str>,
    output: OutputMode,
    program_root: &Path,
) -> anyhow::Result<()> {
    let caller = tester_caller(actor_flag, output)?;
    let (conn, _cfg) = open_program(program_root)?;

    let title = TitleId::new(&args.title)?;
    let enrollment = enrollment::record_session_time(&conn, &caller, &title, args.seconds)
        .map_err(|e| engine_failure(output, e))?;

    let recorded = format_seconds(u64::from(args.seconds));
    render(output, &enrollment, |e, w| {
        writeln!(w, "✓ Recorded {} on '{}'", recorded, e.title_id)?;
        human_kv(w, "total time", format_seconds(e.time_spent_seconds))?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_args_parse_title_and_seconds() {
        use clap::Parser;

        #[derive(Parser)]
        struct Wrapper {
            #[command(flatten)]
            args: SessionArgs,
        }

        let w = Wrapper::parse_from(["test", "vale-of-shadows", "1800"]);
        assert_eq!(w.args.title, "vale-of-shadows");
        assert_eq!(w.args.seconds, 1800);
    }

    #[test]
    fn session_args_reject_non_numeric_seconds() {
        use clap::Parser;

        #[derive(Parser)]
        struct Wrapper {
            #[command(flatten)]
            args: SessionArgs,
        }

        assert!(Wrapper::try_parse_from(["test", "vale-of-shadows", "soon"]).is_err());
    }
}
