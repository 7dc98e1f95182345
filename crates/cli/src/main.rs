//! trackmigrate command-line tool.
//!
//! Copies stories, epics, milestones and reference data from one Shortcut
//! (formerly Clubhouse) workspace into another. Migrated source entities are
//! marked so commands can be re-run safely.

mod migrate;
mod report;
mod style;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use trackmigrate_core::config::MigrateConfig;
use trackmigrate_core::models::ResourceId;

const LOCAL_CONFIG: &str = "./trackmigrate.toml";

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// Migrate work items between two Shortcut workspaces.
#[derive(Parser, Debug)]
#[command(
    name = "trackmigrate",
    version,
    about = "Migrate stories, epics and milestones between Shortcut workspaces"
)]
struct Cli {
    /// Path to the TOML configuration file. Defaults to ./trackmigrate.toml,
    /// then the user config directory.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `trackmigrate_core=trace`. Overrides
    /// RUST_LOG and the config file.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Skip the confirmation prompt before writing to the target.
    #[arg(short, long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Generate a starter configuration file.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long, default_value = LOCAL_CONFIG)]
        output: PathBuf,
    },

    /// Validate a configuration file.
    Validate,

    /// Print the member, iteration and workflow-state maps.
    Maps,

    /// Import a single story.
    ImportStory {
        /// Source story ID.
        id: ResourceId,
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Import every story of the source project.
    ImportProject {
        /// Source project ID (defaults to `source.project_id`).
        #[arg(long)]
        project: Option<ResourceId>,
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Import one epic with its comments and stories.
    ImportEpic {
        /// Source epic ID.
        id: ResourceId,
        /// Existing target milestone to attach the epic to.
        #[arg(long)]
        milestone: Option<ResourceId>,
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Import every epic of the source project.
    ImportEpics {
        /// Source project ID (defaults to `source.project_id`).
        #[arg(long)]
        project: Option<ResourceId>,
        /// Only epics carrying this label (case-insensitive).
        #[arg(long)]
        label: Option<String>,
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Copy a milestone, unless the target has one with the same name.
    ImportMilestone {
        /// Source milestone ID.
        id: ResourceId,
        /// Also import the milestone's epics into it.
        #[arg(long)]
        with_epics: bool,
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Copy iterations missing from the target.
    ImportIterations,

    /// Copy labels missing from the target.
    ImportLabels,

    /// Recreate story links between migrated stories of the source project.
    LinkStories {
        /// Source project ID (defaults to `source.project_id`).
        #[arg(long)]
        project: Option<ResourceId>,
    },

    /// Reference data, project epics, project stories, then story links.
    Run {
        /// Source project ID (defaults to `source.project_id`).
        #[arg(long)]
        project: Option<ResourceId>,
        #[command(flatten)]
        target: TargetArgs,
    },
}

/// Overrides for where imported entities land.
#[derive(clap::Args, Debug, Clone, Default)]
pub(crate) struct TargetArgs {
    /// Target project ID (defaults to `target.project_id`).
    #[arg(long)]
    target_project: Option<ResourceId>,

    /// Target epic ID for standalone stories (defaults to `target.epic_id`).
    #[arg(long)]
    target_epic: Option<ResourceId>,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", style::error(&format!("Error: {:#}", e)));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    if let Commands::Init { output } = &cli.command {
        init_tracing(cli.log_level.as_deref(), "warn");
        cmd_init(output)?;
        return Ok(ExitCode::SUCCESS);
    }

    let config_path = resolve_config_path(cli.config.as_deref());

    if let Commands::Validate = cli.command {
        init_tracing(cli.log_level.as_deref(), "warn");
        cmd_validate(&config_path)?;
        return Ok(ExitCode::SUCCESS);
    }

    let config = load_config(&config_path)?;
    init_tracing(cli.log_level.as_deref(), &config.general.log_level);
    config
        .require_tokens()
        .context("API tokens must be set before talking to the tracker")?;

    migrate::run_command(cli.command, &config, cli.yes).await
}

/// Install the fmt subscriber. `--log-level` wins over `RUST_LOG`, which
/// wins over the configured level.
fn init_tracing(cli_level: Option<&str>, config_level: &str) {
    let filter = match cli_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config_level)),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

// ---------------------------------------------------------------------------
// Config helpers
// ---------------------------------------------------------------------------

/// `--config`, else `./trackmigrate.toml` when present, else
/// `<config dir>/trackmigrate/config.toml`.
fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    let local = PathBuf::from(LOCAL_CONFIG);
    if local.exists() {
        return local;
    }
    dirs::config_dir()
        .map(|dir| dir.join("trackmigrate").join("config.toml"))
        .unwrap_or(local)
}

fn load_config(path: &Path) -> Result<MigrateConfig> {
    MigrateConfig::load_and_resolve(path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

fn cmd_init(output: &Path) -> Result<()> {
    if output.exists() {
        anyhow::bail!(
            "file already exists: {}. Use a different path or remove the existing file.",
            output.display()
        );
    }

    std::fs::write(output, MigrateConfig::sample()).context("failed to write config file")?;

    println!(
        "{}",
        style::success(&format!("Configuration written to {}", output.display()))
    );
    println!();
    println!("Next steps:");
    println!("  1. Set source and target project IDs in the config file");
    println!("  2. Export CLUBHOUSE_API_TOKEN_SOURCE and CLUBHOUSE_API_TOKEN_TARGET");
    println!(
        "  3. Validate with: trackmigrate validate --config {}",
        output.display()
    );

    Ok(())
}

fn cmd_validate(config_path: &Path) -> Result<()> {
    println!("Validating configuration: {}", config_path.display());
    println!();

    let mut config =
        MigrateConfig::load_from_file(config_path).context("failed to parse configuration")?;
    println!("  {}", style::success("TOML structure is valid"));

    config.resolve_env_vars()?;
    println!("  {}", style::success("Environment variable references processed"));

    if let Err(e) = config.validate() {
        println!("  {}", style::error(&format!("Validation error: {}", e)));
        anyhow::bail!("configuration validation failed");
    }
    println!("  {}", style::success("All required fields are valid"));

    let set = |token: &Option<String>| if token.is_some() { "set" } else { "NOT SET" };
    let id = |id: &Option<ResourceId>| {
        id.as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "-".to_string())
    };

    println!();
    println!("{}", style::header("Configuration summary:"));
    println!("  Source API     : {}", config.source.api_url);
    println!(
        "  Source token   : {} ({})",
        set(&config.source.token),
        config.source.token_env
    );
    println!("  Source project : {}", id(&config.source.project_id));
    println!("  Target API     : {}", config.target.api_url);
    println!(
        "  Target token   : {} ({})",
        set(&config.target.token),
        config.target.token_env
    );
    println!("  Target project : {}", id(&config.target.project_id));
    println!("  Target epic    : {}", id(&config.target.epic_id));
    println!(
        "  Rate limit     : {} requests / {}s (warn at {} left)",
        config.rate_limit.quota, config.rate_limit.window_secs, config.rate_limit.warn_remaining
    );
    println!("  Mark source    : {}", config.migration.mark_source);
    println!();
    println!("Configuration is valid.");

    Ok(())
}
