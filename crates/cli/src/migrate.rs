//! Migration subcommands: turn a command into a plan and execute it.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use dialoguer::Confirm;
use tracing::debug;

use trackmigrate_core::config::MigrateConfig;
use trackmigrate_core::errors::MigrationError;
use trackmigrate_core::migration::{EpicScope, MigrationPlan, Migrator, StoryScope};
use trackmigrate_core::models::ResourceId;
use trackmigrate_core::{Governed, RateGovernor, TrackerClient};

use crate::{report, style, Commands, TargetArgs};

type CliMigrator = Migrator<Governed<TrackerClient>, Governed<TrackerClient>>;

/// Execute a command that talks to both workspaces.
pub(crate) async fn run_command(
    command: Commands,
    config: &MigrateConfig,
    assume_yes: bool,
) -> Result<ExitCode> {
    let migrator = build_migrator(config)?;

    if let Commands::Maps = command {
        let maps = migrator
            .resource_maps()
            .await
            .context("failed to build resource maps")?;
        report::print_maps(maps);
        return Ok(ExitCode::SUCCESS);
    }

    let (plan, description) = plan_for(command, config)?;
    debug!(?plan, "planned migration");

    if !assume_yes && !confirm(&description, config)? {
        println!("{}", style::warn("Cancelled. Nothing was written."));
        return Ok(ExitCode::SUCCESS);
    }

    let summary = migrator.run(&plan).await.context("migration aborted")?;
    report::print_summary(&summary);

    if summary.has_failures() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Both clients share one governor so the quota covers all traffic.
fn build_migrator(config: &MigrateConfig) -> Result<CliMigrator> {
    let (source_token, target_token) = config.require_tokens()?;
    let governor = Arc::new(RateGovernor::from_config(&config.rate_limit));

    let source = TrackerClient::new(
        &config.source.api_url,
        source_token,
        config.source.request_timeout(),
    )
    .context("failed to create source client")?;
    let target = TrackerClient::new(
        &config.target.api_url,
        target_token,
        config.target.request_timeout(),
    )
    .context("failed to create target client")?;

    Ok(Migrator::new(
        Governed::new(source, governor.clone()),
        Governed::new(target, governor),
        config.migration.clone(),
    ))
}

fn confirm(description: &str, config: &MigrateConfig) -> Result<bool> {
    println!();
    println!("{}", style::header(description));
    println!("  From: {}", style::dim(&config.source.api_url));
    println!("  Into: {}", style::dim(&config.target.api_url));
    if config.migration.mark_source {
        println!("  {}", style::dim(&style::marker_hint()));
    }
    println!();

    Confirm::new()
        .with_prompt("Continue?")
        .default(false)
        .interact()
        .context("failed to read confirmation")
}

fn source_project(flag: Option<ResourceId>, config: &MigrateConfig) -> Result<ResourceId> {
    flag.or_else(|| config.source.project_id.clone())
        .ok_or_else(|| {
            MigrationError::MissingScope(
                "a source project (--project or source.project_id)".into(),
            )
        })
        .map_err(Into::into)
}

/// Build the plan for `command` along with a one-line description for the
/// confirmation prompt.
pub(crate) fn plan_for(
    command: Commands,
    config: &MigrateConfig,
) -> Result<(MigrationPlan, String)> {
    let placed = |target: TargetArgs, plan: MigrationPlan| MigrationPlan {
        target_project_id: target
            .target_project
            .or_else(|| config.target.project_id.clone()),
        target_epic_id: target
            .target_epic
            .or_else(|| config.target.epic_id.clone()),
        ..plan
    };

    let planned = match command {
        Commands::ImportStory { id, target } => {
            let description = format!("Import story {}", id);
            let plan = MigrationPlan {
                stories: StoryScope::One(id),
                ..Default::default()
            };
            (placed(target, plan), description)
        }
        Commands::ImportProject { project, target } => {
            let project = source_project(project, config)?;
            let description = format!("Import every story of project {}", project);
            let plan = MigrationPlan {
                stories: StoryScope::Project(project),
                ..Default::default()
            };
            (placed(target, plan), description)
        }
        Commands::ImportEpic {
            id,
            milestone,
            target,
        } => {
            let description = format!("Import epic {} with its comments and stories", id);
            let plan = MigrationPlan {
                epics: EpicScope::One {
                    epic_id: id,
                    milestone_id: milestone,
                },
                ..Default::default()
            };
            (placed(target, plan), description)
        }
        Commands::ImportEpics {
            project,
            label,
            target,
        } => {
            let project = source_project(project, config)?;
            let description = match &label {
                Some(label) => format!("Import epics of project {} labelled '{}'", project, label),
                None => format!("Import every epic of project {}", project),
            };
            let plan = MigrationPlan {
                epics: EpicScope::Project {
                    project_id: project,
                    label,
                },
                ..Default::default()
            };
            (placed(target, plan), description)
        }
        Commands::ImportMilestone {
            id,
            with_epics,
            target,
        } => {
            let description = if with_epics {
                format!("Import milestone {} and its epics", id)
            } else {
                format!("Import milestone {}", id)
            };
            let plan = MigrationPlan {
                epics: EpicScope::Milestone {
                    milestone_id: id,
                    with_epics,
                },
                ..Default::default()
            };
            (placed(target, plan), description)
        }
        Commands::ImportIterations => (
            MigrationPlan {
                iterations: true,
                ..Default::default()
            },
            "Import missing iterations".to_string(),
        ),
        Commands::ImportLabels => (
            MigrationPlan {
                labels: true,
                ..Default::default()
            },
            "Import missing labels".to_string(),
        ),
        Commands::LinkStories { project } => {
            let project = source_project(project, config)?;
            let description = format!("Recreate story links of project {}", project);
            let plan = MigrationPlan {
                story_links: Some(project),
                ..Default::default()
            };
            (plan, description)
        }
        Commands::Run { project, target } => {
            let project = source_project(project, config)?;
            let description = format!(
                "Migrate project {}: iterations, labels, epics, stories and story links",
                project
            );
            let plan = MigrationPlan {
                iterations: true,
                labels: true,
                epics: EpicScope::Project {
                    project_id: project.clone(),
                    label: None,
                },
                stories: StoryScope::Project(project.clone()),
                story_links: Some(project),
                ..Default::default()
            };
            (placed(target, plan), description)
        }
        Commands::Init { .. } | Commands::Validate | Commands::Maps => {
            anyhow::bail!("command does not run a migration")
        }
    };
    Ok(planned)
}
