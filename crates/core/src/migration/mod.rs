//! Workspace-to-workspace migration.
//!
//! A [`Migrator`] executes a [`MigrationPlan`] stage by stage:
//!
//! 1. Build the resource maps (members, iterations, workflow states).
//! 2. Copy reference data: iterations and labels.
//! 3. Import epics, their comments and their stories.
//! 4. Import standalone stories.
//! 5. Recreate story links between migrated stories.
//!
//! Every top-level entity is imported in isolation. A failure is logged and
//! recorded in the [`MigrationSummary`] and the batch carries on. Re-runs are
//! safe: migrated source entities carry the `[Migrated:<id>]` marker and are
//! skipped. Within a run the [`MigrationLedger`] keeps an entity reached
//! through two scopes (an epic story that is also a project story) from being
//! created twice.

pub mod ledger;
pub mod pipeline;
pub mod summary;

pub use ledger::{EntityKind, MigrationLedger};
pub use pipeline::{Stage, StagePipeline};
pub use summary::{FailureRecord, MigrationSummary};

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use futures::future::join_all;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

use crate::config::MigrationOptions;
use crate::errors::MigrationError;
use crate::identity::{build_resource_maps, ResourceMap, ResourceMaps};
use crate::marker;
use crate::models::{Epic, ResourceId, Story};
use crate::payloads::CreateStoryLink;
use crate::tracker::TrackerApi;
use crate::transform::{
    epic_comment_payloads, epic_payload, iteration_payload, label_payload, linked_file_payload,
    milestone_payload, story_payload, StoryPlacement,
};

// ---------------------------------------------------------------------------
// Plans
// ---------------------------------------------------------------------------

/// Which epics a run imports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EpicScope {
    #[default]
    None,
    /// A single epic, optionally attached to an existing target milestone.
    One {
        epic_id: ResourceId,
        milestone_id: Option<ResourceId>,
    },
    /// Every epic of a source project, optionally only those carrying a label.
    Project {
        project_id: ResourceId,
        label: Option<String>,
    },
    /// A source milestone, and with `with_epics` its epics too.
    Milestone {
        milestone_id: ResourceId,
        with_epics: bool,
    },
}

/// Which standalone stories a run imports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StoryScope {
    #[default]
    None,
    One(ResourceId),
    Project(ResourceId),
}

/// What a single [`Migrator::run`] does.
#[derive(Debug, Clone, Default)]
pub struct MigrationPlan {
    /// Copy iterations missing from the target.
    pub iterations: bool,
    /// Copy labels missing from the target.
    pub labels: bool,
    pub epics: EpicScope,
    pub stories: StoryScope,
    /// Source project whose story links are recreated.
    pub story_links: Option<ResourceId>,
    /// Target project for imported stories.
    pub target_project_id: Option<ResourceId>,
    /// Target epic for standalone stories.
    pub target_epic_id: Option<ResourceId>,
}

impl MigrationPlan {
    fn needs_resource_maps(&self) -> bool {
        let epics = match &self.epics {
            EpicScope::None => false,
            EpicScope::Milestone { with_epics, .. } => *with_epics,
            _ => true,
        };
        epics || self.stories != StoryScope::None
    }
}

#[derive(Debug, Hash, PartialEq, Eq)]
enum LinkKey {
    Id(ResourceId),
    Triple(ResourceId, String, ResourceId),
}

// ---------------------------------------------------------------------------
// Migrator
// ---------------------------------------------------------------------------

/// Moves entities from `source` into `target`.
pub struct Migrator<S, T> {
    source: S,
    target: T,
    options: MigrationOptions,
    /// Built once per migrator on first use.
    maps: OnceCell<ResourceMaps>,
    ledger: Mutex<MigrationLedger>,
    summary: Mutex<MigrationSummary>,
}

impl<S, T> Migrator<S, T>
where
    S: TrackerApi,
    T: TrackerApi,
{
    pub fn new(source: S, target: T, options: MigrationOptions) -> Self {
        info!(
            mark_source = options.mark_source,
            annotate_description = options.annotate_description,
            "initializing migrator"
        );
        Self {
            source,
            target,
            options,
            maps: OnceCell::new(),
            ledger: Mutex::new(MigrationLedger::new()),
            summary: Mutex::new(MigrationSummary::default()),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    /// Snapshot of the identities recorded by the current or last run.
    pub fn ledger(&self) -> MigrationLedger {
        self.lock_ledger().clone()
    }

    fn lock_ledger(&self) -> MutexGuard<'_, MigrationLedger> {
        self.ledger.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_summary(&self) -> MutexGuard<'_, MigrationSummary> {
        self.summary.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record a failed import. An entity already in the ledger was counted
    /// as created or skipped, so its failure is listed as a follow-up.
    fn fail(&self, kind: EntityKind, source_id: &ResourceId, err: &MigrationError) {
        warn!(%kind, id = %source_id, error = %err, "import failed; continuing with the next entity");
        let counted = self.lock_ledger().target_of(kind, source_id).is_some();
        let mut summary = self.lock_summary();
        if counted {
            summary.record_follow_up_failure(kind, source_id, err.to_string());
        } else {
            summary.record_failure(kind, source_id, err.to_string());
        }
    }

    /// Target ID of an entity already created or resolved in this run.
    fn imported(&self, kind: EntityKind, source_id: &ResourceId) -> Option<ResourceId> {
        self.lock_ledger().target_of(kind, source_id).cloned()
    }

    /// The resource maps, built on first call and cached afterwards.
    pub async fn resource_maps(&self) -> Result<&ResourceMaps, MigrationError> {
        self.maps
            .get_or_try_init(|| async {
                info!("building resource maps");
                build_resource_maps(&self.source, &self.target)
                    .await
                    .map_err(MigrationError::from)
            })
            .await
    }

    // -----------------------------------------------------------------------
    // Main entry point
    // -----------------------------------------------------------------------

    /// Execute `plan` and return what it did.
    ///
    /// Errors listing a scope abort the run. Failures of individual entities
    /// are collected in the returned summary instead.
    pub async fn run(&self, plan: &MigrationPlan) -> Result<MigrationSummary, MigrationError> {
        let mut pipeline = StagePipeline::new();
        *self.lock_ledger() = MigrationLedger::new();

        if plan.needs_resource_maps() {
            pipeline.enter(Stage::ResourceMaps)?;
            self.resource_maps().await?;
        }

        if plan.iterations || plan.labels {
            pipeline.enter(Stage::ReferenceData)?;
            if plan.iterations {
                self.import_iterations().await?;
            }
            if plan.labels {
                self.import_labels().await?;
            }
        }

        if plan.epics != EpicScope::None {
            pipeline.enter(Stage::Epics)?;
            let project = plan.target_project_id.as_ref();
            match &plan.epics {
                EpicScope::None => {}
                EpicScope::One {
                    epic_id,
                    milestone_id,
                } => {
                    self.import_epic_isolated(epic_id, milestone_id.as_ref(), project)
                        .await
                }
                EpicScope::Project { project_id, label } => {
                    self.import_project_epics(project_id, label.as_deref(), project)
                        .await?
                }
                EpicScope::Milestone {
                    milestone_id,
                    with_epics,
                } => {
                    if let Err(e) = self
                        .import_milestone(milestone_id, *with_epics, project)
                        .await
                    {
                        self.fail(EntityKind::Milestone, milestone_id, &e);
                    }
                }
            }
        }

        if plan.stories != StoryScope::None {
            pipeline.enter(Stage::Stories)?;
            let placement = StoryPlacement {
                project_id: plan.target_project_id.clone(),
                epic_id: plan.target_epic_id.clone(),
                annotate_source: self.options.annotate_description,
            };
            match &plan.stories {
                StoryScope::None => {}
                StoryScope::One(story_id) => self.import_story_isolated(story_id, &placement).await,
                StoryScope::Project(project_id) => {
                    self.import_project_stories(project_id, &placement).await?
                }
            }
        }

        if let Some(project_id) = &plan.story_links {
            pipeline.enter(Stage::StoryLinks)?;
            self.repair_story_links(project_id).await?;
        }

        pipeline.finish()?;

        let summary = std::mem::take(&mut *self.lock_summary());
        info!(
            processed = summary.processed(),
            failures = summary.failures.len(),
            follow_up_failures = summary.follow_up_failures.len(),
            "migration run complete"
        );
        Ok(summary)
    }

    // -----------------------------------------------------------------------
    // Reference data
    // -----------------------------------------------------------------------

    /// Create every source iteration whose exact name the target lacks.
    #[instrument(skip(self))]
    pub async fn import_iterations(&self) -> Result<(), MigrationError> {
        let existing: HashMap<String, ResourceId> = self
            .target
            .list_iterations()
            .await?
            .into_iter()
            .map(|it| (it.name, it.id))
            .collect();

        for iteration in self.source.list_iterations().await? {
            if let Some(target_id) = existing.get(&iteration.name) {
                debug!(name = %iteration.name, "iteration already present in target");
                self.lock_ledger()
                    .record(EntityKind::Iteration, iteration.id.clone(), target_id.clone());
                self.lock_summary().iterations_skipped += 1;
                continue;
            }
            match self
                .target
                .create_iteration(&iteration_payload(&iteration))
                .await
            {
                Ok(created) => {
                    info!(name = %iteration.name, id = %created.id, "created iteration");
                    self.lock_ledger()
                        .record(EntityKind::Iteration, iteration.id.clone(), created.id);
                    self.lock_summary().iterations_created += 1;
                }
                Err(e) if e.is_duplicate() => {
                    debug!(name = %iteration.name, "iteration already exists");
                    self.lock_summary().iterations_skipped += 1;
                }
                Err(e) => self.fail(EntityKind::Iteration, &iteration.id, &e.into()),
            }
        }
        Ok(())
    }

    /// Create every source label whose name (ignoring case) the target lacks.
    #[instrument(skip(self))]
    pub async fn import_labels(&self) -> Result<(), MigrationError> {
        let mut existing: HashSet<String> = self
            .target
            .list_labels()
            .await?
            .into_iter()
            .map(|label| label.name.to_lowercase())
            .collect();

        for label in self.source.list_labels().await? {
            if !existing.insert(label.name.to_lowercase()) {
                debug!(name = %label.name, "label already present in target");
                self.lock_summary().labels_skipped += 1;
                continue;
            }
            match self.target.create_label(&label_payload(&label)).await {
                Ok(_) => {
                    info!(name = %label.name, "created label");
                    self.lock_summary().labels_created += 1;
                }
                Err(e) if e.is_duplicate() => {
                    debug!(name = %label.name, "label already exists");
                    self.lock_summary().labels_skipped += 1;
                }
                Err(e) => {
                    let id = label
                        .id
                        .clone()
                        .unwrap_or_else(|| ResourceId::Str(label.name.clone()));
                    self.fail(EntityKind::Label, &id, &e.into());
                }
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Epics & milestones
    // -----------------------------------------------------------------------

    /// Copy a milestone unless the target already has one with its name,
    /// then optionally import its epics into it.
    #[instrument(skip(self))]
    pub async fn import_milestone(
        &self,
        milestone_id: &ResourceId,
        with_epics: bool,
        target_project: Option<&ResourceId>,
    ) -> Result<(), MigrationError> {
        let milestone = self.source.get_milestone(milestone_id).await?;
        let existing = self.target.list_milestones().await?;

        let target_id = match existing.into_iter().find(|m| m.name == milestone.name) {
            Some(found) => {
                info!(name = %milestone.name, id = %found.id, "milestone already present in target");
                self.lock_summary().milestones_skipped += 1;
                found.id
            }
            None => {
                let created = self
                    .target
                    .create_milestone(&milestone_payload(&milestone))
                    .await?;
                info!(name = %milestone.name, id = %created.id, "created milestone");
                self.lock_summary().milestones_created += 1;
                created.id
            }
        };
        self.lock_ledger()
            .record(EntityKind::Milestone, milestone.id.clone(), target_id.clone());

        if with_epics {
            let epics = self.source.list_milestone_epics(milestone_id).await?;
            info!(count = epics.len(), "importing milestone epics");
            for epic in epics {
                self.import_epic_isolated(&epic.id, Some(&target_id), target_project)
                    .await;
            }
        }
        Ok(())
    }

    /// Import every epic of a source project, optionally only those carrying
    /// `label` (compared ignoring case).
    #[instrument(skip(self))]
    pub async fn import_project_epics(
        &self,
        project_id: &ResourceId,
        label: Option<&str>,
        target_project: Option<&ResourceId>,
    ) -> Result<(), MigrationError> {
        let wanted = label.map(str::to_lowercase);
        let epics: Vec<Epic> = self
            .source
            .list_epics()
            .await?
            .into_iter()
            .filter(|epic| epic.project_ids.contains(project_id))
            .filter(|epic| match &wanted {
                Some(name) => epic.labels.iter().any(|l| l.name.to_lowercase() == *name),
                None => true,
            })
            .collect();
        info!(count = epics.len(), "importing project epics");

        for epic in epics {
            self.import_epic_isolated(&epic.id, None, target_project)
                .await;
        }
        Ok(())
    }

    async fn import_epic_isolated(
        &self,
        epic_id: &ResourceId,
        milestone_id: Option<&ResourceId>,
        target_project: Option<&ResourceId>,
    ) {
        if let Err(e) = self.import_epic(epic_id, milestone_id, target_project).await {
            self.fail(EntityKind::Epic, epic_id, &e);
        }
    }

    /// Import one epic, its comments and its stories.
    ///
    /// An epic that already carries a parseable marker is not recreated, but
    /// its stories are still imported into the epic the marker names.
    #[instrument(skip(self))]
    pub async fn import_epic(
        &self,
        epic_id: &ResourceId,
        milestone_id: Option<&ResourceId>,
        target_project: Option<&ResourceId>,
    ) -> Result<(), MigrationError> {
        if let Some(target_id) = self.imported(EntityKind::Epic, epic_id) {
            debug!(epic = %epic_id, target = %target_id, "epic already imported in this run");
            return Ok(());
        }
        let maps = self.resource_maps().await?;
        let epic = self.source.get_epic(epic_id).await?;

        let target_epic_id = if marker::is_migrated(&epic.name) {
            self.lock_summary().epics_skipped += 1;
            match marker::parse_target_id(&epic.name) {
                Some(target_id) => {
                    info!(name = %epic.name, target = %target_id, "epic already migrated; importing its stories");
                    self.lock_ledger()
                        .record(EntityKind::Epic, epic.id.clone(), target_id.clone());
                    target_id
                }
                None => {
                    warn!(name = %epic.name, "epic marked as migrated but the target ID is unreadable; skipping");
                    return Ok(());
                }
            }
        } else {
            let created = self
                .target
                .create_epic(&epic_payload(&epic, &maps.members, milestone_id))
                .await?;
            info!(source = %epic.id, target = %created.id, name = %epic.name, "created epic");
            self.lock_summary().epics_created += 1;
            self.lock_ledger()
                .record(EntityKind::Epic, epic.id.clone(), created.id.clone());

            if self.options.mark_source {
                let update =
                    marker::write_back(&created.id, &created.app_url, &epic.name, &epic.description);
                if let Err(e) = self.source.update_epic(&epic.id, &update).await {
                    self.fail(EntityKind::Epic, &epic.id, &e.into());
                }
            }

            self.import_epic_comments(&epic.id, &created.id, &maps.members)
                .await?;
            created.id
        };

        let placement = StoryPlacement {
            project_id: target_project.cloned(),
            epic_id: Some(target_epic_id),
            annotate_source: self.options.annotate_description,
        };
        let stories = self.source.list_epic_stories(&epic.id).await?;
        debug!(epic = %epic.id, count = stories.len(), "importing epic stories");
        for story in stories {
            self.import_story_isolated(&story.id, &placement).await;
        }
        Ok(())
    }

    /// Post every live comment of the source epic onto the target epic.
    async fn import_epic_comments(
        &self,
        source_epic: &ResourceId,
        target_epic: &ResourceId,
        members: &ResourceMap,
    ) -> Result<(), MigrationError> {
        let comments = self.source.list_epic_comments(source_epic).await?;
        let payloads = epic_comment_payloads(&comments, members);
        if payloads.is_empty() {
            return Ok(());
        }

        let results = join_all(
            payloads
                .iter()
                .map(|payload| self.target.create_epic_comment(target_epic, payload)),
        )
        .await;

        for result in results {
            match result {
                Ok(_) => self.lock_summary().epic_comments_created += 1,
                Err(e) => self.fail(EntityKind::Epic, source_epic, &e.into()),
            }
        }
        debug!(epic = %source_epic, count = payloads.len(), "imported epic comments");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Stories
    // -----------------------------------------------------------------------

    /// Import every story of a source project.
    #[instrument(skip(self))]
    pub async fn import_project_stories(
        &self,
        project_id: &ResourceId,
        placement: &StoryPlacement,
    ) -> Result<(), MigrationError> {
        let stories = self.source.list_project_stories(project_id).await?;
        info!(count = stories.len(), "importing project stories");
        for story in stories {
            self.import_story_isolated(&story.id, placement).await;
        }
        Ok(())
    }

    async fn import_story_isolated(&self, story_id: &ResourceId, placement: &StoryPlacement) {
        if let Err(e) = self.import_story(story_id, placement).await {
            self.fail(EntityKind::Story, story_id, &e);
        }
    }

    /// Import one story with its comments, tasks and files.
    ///
    /// A story imported earlier in this run, or whose name carries the
    /// marker, is skipped before any file is linked, so re-runs create
    /// nothing in the target.
    #[instrument(skip(self))]
    pub async fn import_story(
        &self,
        story_id: &ResourceId,
        placement: &StoryPlacement,
    ) -> Result<(), MigrationError> {
        if let Some(target_id) = self.imported(EntityKind::Story, story_id) {
            debug!(story = %story_id, target = %target_id, "story already imported in this run");
            return Ok(());
        }
        let maps = self.resource_maps().await?;
        let story = self.source.get_story(story_id).await?;

        if marker::is_migrated(&story.name) {
            info!(name = %story.name, "story already migrated; skipping");
            self.lock_summary().stories_skipped += 1;
            if let Some(target_id) = marker::parse_target_id(&story.name) {
                self.lock_ledger()
                    .record(EntityKind::Story, story.id.clone(), target_id);
            }
            return Ok(());
        }

        let linked_file_ids = self.link_files(&story, &maps.members).await;

        let mut payload = story_payload(&story, maps, placement);
        payload.linked_file_ids = linked_file_ids;
        if payload.iteration_id.is_none() {
            // Iterations created earlier in this run are not in the cached maps.
            payload.iteration_id = story
                .iteration_id
                .as_ref()
                .and_then(|id| self.imported(EntityKind::Iteration, id));
        }

        let created = self.target.create_story(&payload).await?;
        info!(source = %story.id, target = %created.id, name = %story.name, "created story");
        self.lock_summary().stories_created += 1;
        self.lock_ledger()
            .record(EntityKind::Story, story.id.clone(), created.id.clone());

        if self.options.mark_source {
            let update =
                marker::write_back(&created.id, &created.app_url, &story.name, &story.description);
            self.source.update_story(&story.id, &update).await?;
        }
        Ok(())
    }

    /// Recreate the story's uploaded and linked files as target URL links.
    /// Failures skip only the file concerned.
    async fn link_files(&self, story: &Story, members: &ResourceMap) -> Vec<ResourceId> {
        let mut ids = Vec::new();
        for file in story.files.iter().chain(story.linked_files.iter()) {
            match self
                .target
                .create_linked_file(&linked_file_payload(file, members))
                .await
            {
                Ok(linked) => {
                    debug!(story = %story.id, file = %file.name, id = %linked.id, "linked file");
                    self.lock_summary().files_linked += 1;
                    ids.push(linked.id);
                }
                Err(e) => {
                    warn!(story = %story.id, file = %file.name, error = %e, "could not link file; skipping it");
                    self.lock_summary().files_failed += 1;
                }
            }
        }
        ids
    }

    // -----------------------------------------------------------------------
    // Story links
    // -----------------------------------------------------------------------

    /// Recreate the links between a source project's migrated stories.
    ///
    /// Each story's target is taken from this run's ledger, else from its
    /// marker. Links with an unresolved endpoint are skipped.
    #[instrument(skip(self))]
    pub async fn repair_story_links(&self, project_id: &ResourceId) -> Result<(), MigrationError> {
        let stories = self.source.list_project_stories(project_id).await?;

        let ledger = self.ledger();
        let resolved: HashMap<ResourceId, ResourceId> = stories
            .iter()
            .filter_map(|story| {
                ledger
                    .target_of(EntityKind::Story, &story.id)
                    .cloned()
                    .or_else(|| marker::parse_target_id(&story.name))
                    .map(|target| (story.id.clone(), target))
            })
            .collect();
        debug!(stories = stories.len(), resolved = resolved.len(), "resolved story targets");

        let mut seen = HashSet::new();
        let mut requests = Vec::new();
        for link in stories.iter().flat_map(|story| story.story_links.iter()) {
            let key = match &link.id {
                Some(id) => LinkKey::Id(id.clone()),
                None => LinkKey::Triple(
                    link.subject_id.clone(),
                    link.verb.clone(),
                    link.object_id.clone(),
                ),
            };
            if !seen.insert(key) {
                continue;
            }
            match (resolved.get(&link.subject_id), resolved.get(&link.object_id)) {
                (Some(subject), Some(object)) => requests.push(CreateStoryLink {
                    subject_id: subject.clone(),
                    object_id: object.clone(),
                    verb: link.verb.clone(),
                }),
                _ => {
                    debug!(
                        subject = %link.subject_id,
                        object = %link.object_id,
                        verb = %link.verb,
                        "link endpoint not migrated; skipping"
                    );
                    self.lock_summary().links_skipped += 1;
                }
            }
        }

        let results = join_all(
            requests
                .iter()
                .map(|request| self.target.create_story_link(request)),
        )
        .await;

        for (request, result) in requests.iter().zip(results) {
            match result {
                Ok(_) => {
                    info!(
                        subject = %request.subject_id,
                        verb = %request.verb,
                        object = %request.object_id,
                        "created story link"
                    );
                    self.lock_summary().links_created += 1;
                }
                Err(e) if e.is_duplicate() => {
                    debug!(subject = %request.subject_id, object = %request.object_id, "story link already exists");
                    self.lock_summary().links_existing += 1;
                }
                Err(e) => self.fail(EntityKind::StoryLink, &request.subject_id, &e.into()),
            }
        }
        Ok(())
    }
}
