//! `pt feedback`: publisher-side triage of tester feedback.
//!
//! Subcommands:
//! - `pt feedback list <title>`: newest first, filterable by kind/status
//! - `pt feedback status <id> <status>`: move an item through triage
//! - `pt feedback summary <title>`: counts by kind and status

use crate::cmd::{engine_failure, format_us, open_program, outbound_for, publisher_caller};
use crate::output::{OutputMode, human_kv, render};
use clap::{Args, Subcommand};
use playtest_core::feedback::{self, FeedbackFilter};
use playtest_core::model::{FeedbackId, FeedbackKind, FeedbackStatus, TitleId};
use std::io::Write as _;
use std::path::Path;

#[derive(Args, Debug)]
pub struct FeedbackArgs {
    #[command(subcommand)]
    pub command: FeedbackCommand,
}

#[derive(Subcommand, Debug)]
pub enum FeedbackCommand {
    #[command(
        about = "List a title's feedback, newest first",
        after_help = "EXAMPLES:\n    pt feedback list vale-of-shadows --status new\n\n    pt feedback list vale-of-shadows --kind bug --limit 10"
    )]
    List(FeedbackListArgs),

    #[command(
        about = "Set a feedback item's triage status",
        after_help = "EXAMPLES:\n    pt feedback status fb-91c2... in-progress\n    pt feedback status fb-91c2... resolved"
    )]
    Status(FeedbackStatusArgs),

    #[command(about = "Show feedback counts by kind and status")]
    Summary(FeedbackSummaryArgs),
}

#[derive(Args, Debug)]
pub struct FeedbackListArgs {
    /// Title whose feedback to list.
    pub title: String,

    /// Filter by kind: bug, suggestion, or general.
    #[arg(short, long)]
    pub kind: Option<String>,

    /// Filter by status: new, in-progress, resolved, or closed.
    #[arg(short, long)]
    pub status: Option<String>,

    /// Maximum items to show (defaults to the program config's limit).
    #[arg(short = 'n', long)]
    pub limit: Option<u32>,

    /// Items to skip before the first shown.
    #[arg(long)]
    pub offset: Option<u32>,
}

#[derive(Args, Debug)]
pub struct FeedbackStatusArgs {
    /// Feedback item to update.
    pub feedback: String,

    /// New status: new, in-progress, resolved, or closed.
    pub status: String,
}

#[derive(Args, Debug)]
pub struct FeedbackSummaryArgs {
    /// Title whose feedback to summarize.
    pub title: String,
}

pub fn run_feedback(
    args: &FeedbackArgs,
    actor_flag: Option<&str>,
    output: OutputMode,
    program_root: &Path,
) -> anyhow::Result<()> {
    match &args.command {
        FeedbackCommand::List(a) => run_list(a, actor_flag, output, program_root),
        FeedbackCommand::Status(a) => run_status(a, actor_flag, output, program_root),
        FeedbackCommand::Summary(a) => run_summary(a, actor_flag, output, program_root),
    }
}

fn run_list(
    args: &FeedbackListArgs,
    actor_flag: Option<&str>,
    output: OutputMode,
    program_root: &Path,
) -> anyhow::Result<()> {
    let caller = publisher_caller(actor_flag, output)?;
    let (conn, cfg) = open_program(program_root)?;

    let title = TitleId::new(&args.title)?;
    let filter = FeedbackFilter {
        kind: args
            .kind
            .as_deref()
            .map(str::parse::<FeedbackKind>)
            .transpose()?,
        status: args
            .status
            .as_deref()
            .map(str::parse::<FeedbackStatus>)
            .transpose()?,
        limit: Some(args.limit.unwrap_or(cfg.listing.default_limit)),
        offset: args.offset,
    };

    let items = feedback::list_by_title(&conn, &caller, &title, &filter)
        .map_err(|e| engine_failure(output, e))?;

    render(output, &items, |items, w| {
        if items.is_empty() {
            writeln!(w, "No feedback matches.")?;
            return Ok(());
        }
        for item in items {
            let severity = item
                .severity
                .map_or(String::new(), |s| format!(" [{}]", s.as_str()));
            writeln!(
                w,
                "{}  {:<11}  {:<9}{severity}  {}",
                format_us(item.created_at_us),
                item.status.as_str(),
                item.kind.as_str(),
                item.summary,
            )?;
            writeln!(w, "{:>18}{}  from {}", "", item.feedback_id, item.tester_id)?;
        }
        Ok(())
    })
}

fn run_status(
    args: &FeedbackStatusArgs,
    actor_flag: Option<&str>,
    output: OutputMode,
    program_root: &Path,
) -> anyhow::Result<()> {
    let caller = publisher_caller(actor_flag, output)?;
    let (conn, cfg) = open_program(program_root)?;
    let mut outbound = outbound_for(&cfg);

    let feedback_id = FeedbackId::new(&args.feedback)?;
    let status = args.status.parse::<FeedbackStatus>()?;
    let item = feedback::set_status(&conn, &mut outbound, &caller, &feedback_id, status)
        .map_err(|e| engine_failure(output, e))?;

    render(output, &item, |i, w| {
        writeln!(w, "✓ {} is now {}", i.feedback_id, i.status)?;
        human_kv(w, "summary", &i.summary)?;
        human_kv(w, "reported by", &i.tester_id)?;
        Ok(())
    })
}

fn run_summary(
    args: &FeedbackSummaryArgs,
    actor_flag: Option<&str>,
    output: OutputMode,
    program_root: &Path,
) -> anyhow::Result<()> {
    let caller = publisher_caller(actor_flag, output)?;
    let (conn, _cfg) = open_program(program_root)?;

    let title = TitleId::new(&args.title)?;
    let summary = feedback::summary_by_title(&conn, &caller, &title)
        .map_err(|e| engine_failure(output, e))?;

    render(output, &summary, |s, w| {
        writeln!(w, "Feedback for '{}': {} item(s)", title.as_str(), s.total)?;
        writeln!(w)?;
        writeln!(w, "By kind")?;
        for (kind, count) in sorted(&s.by_kind) {
            human_kv(w, kind, count.to_string())?;
        }
        writeln!(w)?;
        writeln!(w, "By status")?;
        for (status, count) in sorted(&s.by_status) {
            human_kv(w, status, count.to_string())?;
        }
        Ok(())
    })
}

/// Stable ordering for the human report; the map itself is unordered.
fn sorted(map: &std::collections::HashMap<String, usize>) -> Vec<(&str, usize)> {
    let mut pairs: Vec<_> = map.iter().map(|(k, v)| (k.as_str(), *v)).collect();
    pairs.sort_unstable_by_key(|(k, _)| *k);
    pairs
}
