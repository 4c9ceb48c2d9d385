use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Per-program configuration, read from `.playtest/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgramConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub listing: ListingConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl StoreConfig {
    #[must_use]
    pub const fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingConfig {
    #[serde(default = "default_listing_limit")]
    pub default_limit: u32,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            default_limit: default_listing_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
        }
    }
}

/// User-level settings from the platform config directory.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub program: ProgramConfig,
    pub user: UserConfig,
    pub resolved_output: String,
}

#[must_use]
pub fn program_dir(root: &Path) -> PathBuf {
    root.join(".playtest")
}

#[must_use]
pub fn store_path(root: &Path) -> PathBuf {
    program_dir(root).join("program.db")
}

pub fn load_program_config(root: &Path) -> Result<ProgramConfig> {
    let path = program_dir(root).join("config.toml");
    if !path.exists() {
        return Ok(ProgramConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ProgramConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };

    let path = config_dir.join("playtest/config.toml");
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn resolve_config(root: &Path, cli_json: bool) -> Result<EffectiveConfig> {
    let program = load_program_config(root)?;
    let user = load_user_config()?;

    let env_output = env::var("PLAYTEST_OUTPUT").ok();
    let resolved_output = resolve_output(cli_json, user.output.clone(), env_output)?;

    Ok(EffectiveConfig {
        program,
        user,
        resolved_output,
    })
}

fn resolve_output(
    cli_json: bool,
    user_output: Option<String>,
    env_output: Option<String>,
) -> Result<String> {
    fn normalize_output_mode(raw: &str) -> Option<&'static str> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "human" => Some("human"),
            "json" => Some("json"),
            _ => None,
        }
    }

    if cli_json {
        return Ok("json".to_string());
    }

    if let Some(mode) = env_output.as_deref().and_then(normalize_output_mode) {
        return Ok(mode.to_string());
    }

    if let Some(mode) = user_output.as_deref().and_then(normalize_output_mode) {
        return Ok(mode.to_string());
    }

    Ok("human".to_string())
}

const fn default_busy_timeout_ms() -> u64 {
    5000
}

const fn default_listing_limit() -> u32 {
    50
}

const fn default_true() -> bool {
    true
}
