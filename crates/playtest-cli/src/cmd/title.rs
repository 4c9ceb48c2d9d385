//! `pt title`: publisher-side title lifecycle.
//!
//! Subcommands:
//! - `pt title register <id>`: register a title; it opens for testing at once
//! - `pt title promote <id>`: one-way promotion from testing to released
//! - `pt title summary <id>`: aggregate program statistics for the title

use crate::cmd::{
    engine_failure, format_seconds, format_us, open_program, outbound_for, publisher_caller,
};
use crate::output::{OutputMode, human_kv, render};
use clap::{Args, Subcommand};
use playtest_core::model::TitleId;
use playtest_core::titles;
use std::io::Write as _;
use std::path::Path;

#[derive(Args, Debug)]
pub struct TitleArgs {
    #[command(subcommand)]
    pub command: TitleCommand,
}

#[derive(Subcommand, Debug)]
pub enum TitleCommand {
    #[command(
        about = "Register a title and open it for testing",
        after_help = "EXAMPLES:\n    pt title register vale-of-shadows --actor acme-studio"
    )]
    Register(TitleIdArg),

    #[command(
        about = "Promote a title from testing to released (one-way)",
        after_help = "EXAMPLES:\n    pt title promote vale-of-shadows --actor acme-studio"
    )]
    Promote(TitleIdArg),

    #[command(about = "Show aggregate testing statistics for a title")]
    Summary(TitleIdArg),
}

#[derive(Args, Debug)]
pub struct TitleIdArg {
    /// Title id.
    pub title: String,
}

pub fn run_title(
    args: &TitleArgs,
    actor_flag: Option<&str>,
    output: OutputMode,
    program_root: &Path,
) -> anyhow::Result<()> {
    match &args.command {
        TitleCommand::Register(a) => run_register(a, actor_flag, output, program_root),
        TitleCommand::Promote(a) => run_promote(a, actor_flag, output, program_root),
        TitleCommand::Summary(a) => run_summary(a, actor_flag, output, program_root),
    }
}

fn run_register(
    args: &TitleIdArg,
    actor_flag: Option<&str>,
    output: OutputMode,
    program_root: &Path,
) -> anyhow::Result<()> {
    let caller = publisher_caller(actor_flag, output)?;
    let (conn, _cfg) = open_program(program_root)?;

    let title = TitleId::new(&args.title)?;
    let record =
        titles::register(&conn, &caller, &title).map_err(|e| engine_failure(output, e))?;

    render(output, &record, |r, w| {
        writeln!(w, "✓ Registered '{}', now open for testing", r.title_id)?;
        human_kv(w, "publisher", &r.publisher_id)?;
        human_kv(w, "state", r.release_state.as_str())?;
        Ok(())
    })
}

fn run_promote(
    args: &TitleIdArg,
    actor_flag: Option<&str>,
    output: OutputMode,
    program_root: &Path,
) -> anyhow::Result<()> {
    let caller = publisher_caller(actor_flag, output)?;
    let (conn, cfg) = open_program(program_root)?;
    let mut outbound = outbound_for(&cfg);

    let title = TitleId::new(&args.title)?;
    let record = titles::promote(&conn, &mut outbound, &caller, &title)
        .map_err(|e| engine_failure(output, e))?;

    render(output, &record, |r, w| {
        writeln!(w, "✓ '{}' is released", r.title_id)?;
        if let Some(at) = r.released_at_us {
            human_kv(w, "released at", format_us(at))?;
        }
        writeln!(w, "New joins are closed; existing testers keep their access.")?;
        Ok(())
    })
}

fn run_summary(
    args: &TitleIdArg,
    actor_flag: Option<&str>,
    output: OutputMode,
    program_root: &Path,
) -> anyhow::Result<()> {
    let caller = publisher_caller(actor_flag, output)?;
    let (conn, _cfg) = open_program(program_root)?;

    let title = TitleId::new(&args.title)?;
    let summary =
        titles::testing_summary(&conn, &caller, &title).map_err(|e| engine_failure(output, e))?;

    render(output, &summary, |s, w| {
        writeln!(w, "Testing summary for '{}'", s.title.title_id)?;
        human_kv(w, "state", s.title.release_state.as_str())?;
        human_kv(w, "registered", format_us(s.title.registered_at_us))?;
        if let Some(at) = s.title.released_at_us {
            human_kv(w, "released", format_us(at))?;
        }
        writeln!(w)?;
        human_kv(w, "active testers", s.active_testers.to_string())?;
        human_kv(w, "enrollments", s.total_enrollments.to_string())?;
        human_kv(w, "tasks", s.tasks.to_string())?;
        human_kv(w, "completions", s.completions.to_string())?;
        human_kv(w, "feedback", s.feedback_items.to_string())?;
        human_kv(w, "open bugs", s.open_bugs.to_string())?;
        let seconds = u64::try_from(s.time_spent_seconds).unwrap_or(0);
        human_kv(w, "play time", format_seconds(seconds))?;
        Ok(())
    })
}
