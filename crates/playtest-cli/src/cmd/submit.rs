//! `pt submit`: file feedback against a title.
//!
//! Bugs may carry a severity; other kinds must not. New feedback always
//! lands in `new` so it shows up in the publisher's triage queue.

use crate::cmd::{engine_failure, open_program, tester_caller};
use crate::output::{OutputMode, human_kv, render};
use clap::Args;
use playtest_core::feedback;
use playtest_core::model::{FeedbackDraft, FeedbackKind, Severity, TitleId};
use std::io::Write as _;
use std::path::Path;

#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// Title the feedback is about.
    pub title: String,

    /// Feedback kind: bug, suggestion, or general.
    #[arg(short, long, default_value = "general")]
    pub kind: String,

    /// One-line summary (required, shown in triage lists).
    #[arg(short, long)]
    pub summary: String,

    /// Longer free-form description (required, cannot be blank).
    #[arg(short, long)]
    pub description: String,

    /// Bug severity: critical, high, medium, or low. Bugs only.
    #[arg(long)]
    pub severity: Option<String>,

    /// Reference to an attachment (screenshot path, clip URL).
    #[arg(long)]
    pub attachment: Option<String>,
}

pub fn run_submit(
    args: &SubmitArgs,
    actor_flag: Option<&str>,
    output: OutputMode,
    program_root: &Path,
) -> anyhow::Result<()> {
    let caller = tester_caller(actor_flag, output)?;
    let (mut conn, _cfg) = open_program(program_root)?;

    let title = TitleId::new(&args.title)?;
    let draft = FeedbackDraft {
        kind: args.kind.parse::<FeedbackKind>()?,
        summary: args.summary.clone(),
        description: args.description.clone(),
        severity: args
            .severity
            .as_deref()
            .map(str::parse::<Severity>)
            .transpose()?,
        attachment_ref: args.attachment.clone(),
    };

    let item = feedback::submit(&mut conn, &caller, &title, draft)
        .map_err(|e| engine_failure(output, e))?;

    render(output, &item, |i, w| {
        writeln!(w, "✓ Feedback filed against '{}'", i.title_id)?;
        human_kv(w, "id", &i.feedback_id)?;
        human_kv(w, "kind", i.kind.as_str())?;
        if let Some(severity) = i.severity {
            human_kv(w, "severity", severity.as_str())?;
        }
        human_kv(w, "status", i.status.as_str())?;
        Ok(())
    })
}
