//! Caller identity resolution for CLI commands.
//!
//! The resolution chain: `--actor` flag > `PLAYTEST_ACTOR` env > `USER` env
//! (TTY only). Whether the actor acts as a tester or a publisher is implied
//! by the command; every command needs an identity.

use std::env;

/// Errors from actor resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorResolutionError {
    /// Human-readable description.
    pub message: String,
    /// Machine error code.
    pub code: &'static str,
}

impl std::fmt::Display for ActorResolutionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ActorResolutionError {}

/// Environment reader trait for dependency injection in tests.
trait EnvReader {
    fn get(&self, key: &str) -> Option<String>;
    fn is_tty(&self) -> bool;
}

/// Real environment reader.
struct RealEnv;

impl EnvReader for RealEnv {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok().filter(|v| !v.is_empty())
    }

    fn is_tty(&self) -> bool {
        use std::io::IsTerminal;
        std::io::stdin().is_terminal()
    }
}

/// Core resolution logic, parameterized by environment reader.
fn resolve_actor_with(cli_flag: Option<&str>, env: &dyn EnvReader) -> Option<String> {
    if let Some(actor) = cli_flag {
        if !actor.is_empty() {
            return Some(actor.to_string());
        }
    }

    if let Some(val) = env.get("PLAYTEST_ACTOR") {
        return Some(val);
    }

    if env.is_tty() {
        if let Some(val) = env.get("USER") {
            return Some(val);
        }
    }

    None
}

/// Resolve the actor identity following the chain:
///
/// 1. `--actor` CLI flag (passed as `cli_flag`)
/// 2. `PLAYTEST_ACTOR` environment variable
/// 3. `USER` environment variable (only if running in a TTY)
///
/// Returns `None` if no identity could be resolved.
pub fn resolve_actor(cli_flag: Option<&str>) -> Option<String> {
    resolve_actor_with(cli_flag, &RealEnv)
}

/// Resolve the actor identity, returning an error if not found.
pub fn require_actor(cli_flag: Option<&str>) -> Result<String, ActorResolutionError> {
    resolve_actor(cli_flag).ok_or_else(|| ActorResolutionError {
        message: "Caller identity required for this command. \
                  Set --actor or the PLAYTEST_ACTOR environment variable."
            .to_string(),
        code: "missing_actor",
    })
}
