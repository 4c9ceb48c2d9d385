//! Command handlers for `pt`.
//!
//! Every handler follows the same shape: resolve the acting identity, open
//! the program store, invoke one engine operation, and render the result
//! through [`crate::output`]. Engine failures are rendered as structured
//! errors on stderr before the process exits non-zero.

pub mod accept;
pub mod complete;
pub mod completions;
pub mod feedback;
pub mod init;
pub mod join;
pub mod leave;
pub mod roster;
pub mod session;
pub mod submit;
pub mod task;
pub mod tasks;
pub mod title;
pub mod verify;

use crate::actor;
use crate::output::{CliError, OutputMode, render_error};
use chrono::DateTime;
use playtest_core::EngineError;
use playtest_core::config::{self, ProgramConfig};
use playtest_core::model::{Caller, PublisherId, TesterId};
use playtest_core::outbound::{Notification, Outbound, RewardEvent};
use playtest_core::store;
use rusqlite::Connection;
use std::path::Path;

pub(crate) const ACTOR_HINT: &str = "Set --actor or the PLAYTEST_ACTOR environment variable";

/// Open the program store under `program_root`, honoring the program config.
///
/// Fails with a pointer to `pt init` when no program directory exists yet.
pub(crate) fn open_program(program_root: &Path) -> anyhow::Result<(Connection, ProgramConfig)> {
    let dir = config::program_dir(program_root);
    if !dir.exists() {
        anyhow::bail!(
            "No testing program found in {}. Run `pt init` first.",
            program_root.display()
        );
    }
    let cfg = config::load_program_config(program_root)?;
    let store_path = config::store_path(program_root);
    let conn = store::open_store_with_timeout(&store_path, cfg.store.busy_timeout())?;
    Ok((conn, cfg))
}

/// Resolve the acting identity as a tester.
pub(crate) fn tester_caller(actor_flag: Option<&str>, output: OutputMode) -> anyhow::Result<Caller> {
    let actor = required_actor(actor_flag, output)?;
    Ok(Caller::Tester(TesterId::new(&actor)?))
}

/// Resolve the acting identity as a publisher.
pub(crate) fn publisher_caller(
    actor_flag: Option<&str>,
    output: OutputMode,
) -> anyhow::Result<Caller> {
    let actor = required_actor(actor_flag, output)?;
    Ok(Caller::Publisher(PublisherId::new(&actor)?))
}

fn required_actor(actor_flag: Option<&str>, output: OutputMode) -> anyhow::Result<String> {
    match actor::require_actor(actor_flag) {
        Ok(actor) => Ok(actor),
        Err(e) => {
            render_error(output, &CliError::usage(e.code, &e.message, ACTOR_HINT))?;
            anyhow::bail!("{}", e.message);
        }
    }
}

/// Render an engine failure and convert it into the process-exit error.
///
/// Used as `.map_err(|e| engine_failure(output, e))?` after engine calls so
/// the structured error reaches stderr in the requested format.
pub(crate) fn engine_failure(output: OutputMode, error: EngineError) -> anyhow::Error {
    if let Err(render_failed) = render_error(output, &CliError::from(&error)) {
        return render_failed;
    }
    anyhow::Error::new(error)
}

/// Delivery adapter used by the CLI: events go to the log stream.
///
/// A full deployment hands these to the rewards and notification services.
/// The CLI's only collaborator is its structured log, so deliveries are
/// emitted there and never block the command.
pub(crate) struct LogOutbound {
    notify: bool,
}

impl Outbound for LogOutbound {
    fn deliver_reward(&mut self, event: &RewardEvent) -> anyhow::Result<()> {
        tracing::info!(
            tester_id = %event.tester_id,
            title_id = %event.title_id,
            task_id = %event.task_id,
            xp = event.xp,
            points = event.points,
            "reward granted"
        );
        Ok(())
    }

    fn deliver_notification(&mut self, event: &Notification) -> anyhow::Result<()> {
        if !self.notify {
            return Ok(());
        }
        let payload = serde_json::to_string(event)?;
        tracing::info!(payload = %payload, "notification dispatched");
        Ok(())
    }
}

pub(crate) fn outbound_for(cfg: &ProgramConfig) -> LogOutbound {
    LogOutbound {
        notify: cfg.notifications.enabled,
    }
}

/// Format a microsecond timestamp for human output.
pub(crate) fn format_us(us: i64) -> String {
    DateTime::from_timestamp_micros(us)
        .map_or_else(|| us.to_string(), |dt| dt.format("%Y-%m-%d %H:%M").to_string())
}

/// Format a seconds total as a compact duration for human output.
pub(crate) fn format_seconds(total: u64) -> String {
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    if hours > 0 {
        format!("{hours}h {minutes:02}m")
    } else if minutes > 0 {
        format!("{minutes}m {seconds:02}s")
    } else {
        format!("{seconds}s")
    }
}
