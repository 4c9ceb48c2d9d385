use anyhow::{Context as _, Result};
use clap::Args;
use playtest_core::{config, store};
use std::path::Path;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Force re-initialization even if `.playtest/` already exists.
    /// Removes the existing store.
    #[arg(long)]
    pub force: bool,
}

const CONFIG_TOML: &str = "[store]\n\
    busy_timeout_ms = 5000\n\
    \n\
    [listing]\n\
    default_limit = 50\n\
    \n\
    [notifications]\n\
    enabled = true\n";

const GITIGNORE: &str = "program.db\nprogram.db-wal\nprogram.db-shm\n";

/// Execute `pt init`. Creates the program skeleton:
///
/// ```text
/// .playtest/
///   program.db     (SQLite store, migrated to the latest schema)
///   config.toml    (default program config template)
///   .gitignore     (store file and its WAL sidecars)
/// ```
///
/// # Errors
///
/// Returns an error if `.playtest/` already exists and `--force` is not set,
/// or if any filesystem operation fails.
pub fn run_init(args: &InitArgs, program_root: &Path) -> Result<()> {
    let program_dir = config::program_dir(program_root);

    if program_dir.exists() {
        if !args.force {
            anyhow::bail!(".playtest/ already exists. Use `pt init --force` to reinitialize.");
        }
        std::fs::remove_dir_all(&program_dir).with_context(|| {
            format!(
                "Failed to remove existing program directory: {}",
                program_dir.display()
            )
        })?;
    }

    std::fs::create_dir_all(&program_dir).with_context(|| {
        format!(
            "Failed to create program directory: {}",
            program_dir.display()
        )
    })?;

    // Create the store and bring it to the latest schema.
    let store_path = config::store_path(program_root);
    let conn = store::open_store(&store_path)
        .with_context(|| format!("Failed to create store: {}", store_path.display()))?;
    drop(conn);

    let config_path = program_dir.join("config.toml");
    std::fs::write(&config_path, CONFIG_TOML)
        .with_context(|| format!("Failed to write config: {}", config_path.display()))?;

    let gitignore_path = program_dir.join(".gitignore");
    std::fs::write(&gitignore_path, GITIGNORE)
        .with_context(|| format!("Failed to write .gitignore: {}", gitignore_path.display()))?;

    // Onboarding hints
    println!("✓ Initialized .playtest/ program store.");
    println!();
    println!("  Store:  .playtest/program.db");
    println!("  Config: .playtest/config.toml");
    println!();
    println!("Next steps:");
    println!("  Set your acting identity (required for every command):");
    println!("    export PLAYTEST_ACTOR=your-id");
    println!();
    println!("  Register a title you publish and open it for testing:");
    println!("    pt title register my-game");
    println!();
    println!("  Or enter a program as a tester:");
    println!("    pt accept my-game");
    println!("    pt join my-game");

    Ok(())
}
