#![forbid(unsafe_code)]

mod actor;
mod cmd;
mod output;

use clap::{CommandFactory, Parser, Subcommand};
use output::OutputMode;
use playtest_core::config;
use std::env;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "playtest: beta testing programs for game titles",
    long_about = None
)]
struct Cli {
    /// Acting identity. Tester or publisher id, depending on the command.
    #[arg(long, global = true, value_name = "ID")]
    actor: Option<String>,

    /// Program directory (defaults to the current directory).
    #[arg(long, global = true, value_name = "PATH")]
    dir: Option<PathBuf>,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress non-essential log output.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Get the actor flag as an `Option<&str>` for resolution.
    fn actor_flag(&self) -> Option<&str> {
        self.actor.as_deref()
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Program",
        about = "Initialize a testing program store",
        long_about = "Initialize a .playtest/ program store in the current directory.",
        after_help = "EXAMPLES:\n    # Initialize a program store in the current directory\n    pt init\n\n    # Reinitialize, discarding the existing store\n    pt init --force"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        next_help_heading = "Tester",
        about = "Accept a title's testing agreement",
        long_about = "Record acceptance of a title's confidentiality agreement. Required once per title before joining.",
        after_help = "EXAMPLES:\n    # Accept the agreement for a title\n    pt accept vale-of-shadows --actor alice\n\n    # Record that the acceptance happened in the launcher\n    pt accept vale-of-shadows --origin launcher"
    )]
    Accept(cmd::accept::AcceptArgs),

    #[command(
        next_help_heading = "Tester",
        about = "Join a title's testing program",
        long_about = "Enroll in a title's testing program. The title must be in testing and the agreement must be on file.",
        after_help = "EXAMPLES:\n    # Join after accepting the agreement\n    pt join vale-of-shadows --actor alice"
    )]
    Join(cmd::join::JoinArgs),

    #[command(
        next_help_heading = "Tester",
        about = "Leave a testing program",
        long_about = "Deactivate an enrollment. Counters survive; rejoining resumes them.",
        after_help = "EXAMPLES:\n    # Leave a program yourself\n    pt leave vale-of-shadows --actor alice\n\n    # Remove a tester as the title's publisher\n    pt leave vale-of-shadows --tester alice --actor acme-studio"
    )]
    Leave(cmd::leave::LeaveArgs),

    #[command(
        next_help_heading = "Tester",
        about = "Record play time for a session",
        after_help = "EXAMPLES:\n    # Record a half-hour session\n    pt session vale-of-shadows 1800 --actor alice"
    )]
    Session(cmd::session::SessionArgs),

    #[command(
        next_help_heading = "Tester",
        about = "Show a title's task catalog",
        long_about = "Show every published task with your completion state, in the publisher's display order.",
        after_help = "EXAMPLES:\n    # Show the catalog with your completion state\n    pt tasks vale-of-shadows --actor alice\n\n    # Machine-readable output\n    pt tasks vale-of-shadows --json"
    )]
    Tasks(cmd::tasks::TasksArgs),

    #[command(
        next_help_heading = "Tester",
        about = "Complete a task and collect its reward",
        long_about = "Mark a task done. The reward is granted exactly once; repeats report already-completed.",
        after_help = "EXAMPLES:\n    # Complete a task (full id from `pt tasks`)\n    pt complete task-5a0e... --actor alice"
    )]
    Complete(cmd::complete::CompleteArgs),

    #[command(
        next_help_heading = "Tester",
        about = "File feedback against a title",
        after_help = "EXAMPLES:\n    # File a bug\n    pt submit vale-of-shadows --kind bug --summary \"Crash on load\" --severity critical\n\n    # File a suggestion\n    pt submit vale-of-shadows --kind suggestion --summary \"Add a photo mode\""
    )]
    Submit(cmd::submit::SubmitArgs),

    #[command(next_help_heading = "Publisher", about = "Manage title registration and release")]
    Title(cmd::title::TitleArgs),

    #[command(next_help_heading = "Publisher", about = "Manage a title's task catalog")]
    Task(cmd::task::TaskArgs),

    #[command(next_help_heading = "Publisher", about = "Triage tester feedback")]
    Feedback(cmd::feedback::FeedbackArgs),

    #[command(
        next_help_heading = "Publisher",
        about = "Show a title's enrollment roster",
        after_help = "EXAMPLES:\n    # Everyone ever enrolled, with lifetime counters\n    pt roster vale-of-shadows --actor acme-studio\n\n    # Active testers only\n    pt roster vale-of-shadows --active --actor acme-studio"
    )]
    Roster(cmd::roster::RosterArgs),

    #[command(
        next_help_heading = "Publisher",
        about = "Audit enrollment counters against stored rows",
        after_help = "EXAMPLES:\n    # Report counter drift\n    pt verify vale-of-shadows --actor acme-studio\n\n    # Rewrite drifted counters from the rows\n    pt verify vale-of-shadows --repair --actor acme-studio"
    )]
    Verify(cmd::verify::VerifyArgs),

    #[command(
        next_help_heading = "Program",
        about = "Generate shell completion scripts",
        after_help = "EXAMPLES:\n    # Generate bash completions\n    pt completions bash\n\n    # Generate zsh completions\n    pt completions zsh"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool, quiet: bool) {
    let default_filter = if quiet {
        "error"
    } else if verbose || env::var("DEBUG").is_ok() {
        "playtest=debug,info"
    } else {
        "playtest=info,warn"
    };
    let filter =
        EnvFilter::try_from_env("PLAYTEST_LOG").unwrap_or_else(|_| EnvFilter::new(default_filter));

    let format = env::var("PLAYTEST_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry.with(fmt::layer().json().with_ansi(false)).init();
        }
        _ => {
            registry.with(fmt::layer().compact()).init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let program_root = match cli.dir {
        Some(ref dir) => dir.clone(),
        None => env::current_dir()?,
    };

    let effective = config::resolve_config(&program_root, cli.json)?;
    let output = OutputMode::from_resolved(&effective.resolved_output);

    match cli.command {
        Commands::Init(ref args) => cmd::init::run_init(args, &program_root),
        Commands::Accept(ref args) => {
            cmd::accept::run_accept(args, cli.actor_flag(), output, &program_root)
        }
        Commands::Join(ref args) => {
            cmd::join::run_join(args, cli.actor_flag(), output, &program_root)
        }
        Commands::Leave(ref args) => {
            cmd::leave::run_leave(args, cli.actor_flag(), output, &program_root)
        }
        Commands::Session(ref args) => {
            cmd::session::run_session(args, cli.actor_flag(), output, &program_root)
        }
        Commands::Tasks(ref args) => {
            cmd::tasks::run_tasks(args, cli.actor_flag(), output, &program_root)
        }
        Commands::Complete(ref args) => {
            cmd::complete::run_complete(args, cli.actor_flag(), output, &program_root)
        }
        Commands::Submit(ref args) => {
            cmd::submit::run_submit(args, cli.actor_flag(), output, &program_root)
        }
        Commands::Title(ref args) => {
            cmd::title::run_title(args, cli.actor_flag(), output, &program_root)
        }
        Commands::Task(ref args) => {
            cmd::task::run_task(args, cli.actor_flag(), output, &program_root)
        }
        Commands::Feedback(ref args) => {
            cmd::feedback::run_feedback(args, cli.actor_flag(), output, &program_root)
        }
        Commands::Roster(ref args) => {
            cmd::roster::run_roster(args, cli.actor_flag(), output, &program_root)
        }
        Commands::Verify(ref args) => {
            cmd::verify::run_verify(args, cli.actor_flag(), output, &program_root)
        }
        Commands::Completions(args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command)
        }
    }
}
