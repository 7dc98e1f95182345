//! End-to-end tests for the migration orchestrator.
//!
//! These tests drive the real `Migrator` against an in-memory tracker that
//! stores entities and records every create and update it receives. Source
//! and target are two independent instances.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use trackmigrate_core::config::MigrationOptions;
use trackmigrate_core::errors::TrackerError;
use trackmigrate_core::migration::{EntityKind, EpicScope, MigrationPlan, Migrator, StoryScope};
use trackmigrate_core::models::{
    Epic, EpicComment, Iteration, Label, Member, Milestone, ResourceId, Story, StoryFile,
    StoryLink, Workflow,
};
use trackmigrate_core::payloads::{
    CreateComment, CreateEpic, CreateIteration, CreateLabel, CreateLinkedFile, CreateMilestone,
    CreateStory, CreateStoryLink, UpdateEntity,
};
use trackmigrate_core::{Governed, RateGovernor, TrackerApi};

// ===========================================================================
// In-memory tracker
// ===========================================================================

#[derive(Default)]
struct State {
    members: Vec<Member>,
    iterations: Vec<Iteration>,
    workflows: Vec<Workflow>,
    labels: Vec<Label>,
    stories: Vec<Story>,
    epics: Vec<Epic>,
    epic_comments: Vec<(ResourceId, EpicComment)>,
    milestones: Vec<Milestone>,
    links: Vec<CreateStoryLink>,

    created_stories: Vec<CreateStory>,
    created_epics: Vec<CreateEpic>,
    created_comments: Vec<CreateComment>,
    created_labels: Vec<CreateLabel>,
    created_iterations: Vec<CreateIteration>,
    created_milestones: Vec<CreateMilestone>,
    created_files: Vec<CreateLinkedFile>,
    updates: Vec<(ResourceId, UpdateEntity)>,

    /// Stories whose fetch fails with a server error.
    broken_stories: HashSet<ResourceId>,
    /// File names whose linking fails.
    broken_files: HashSet<String>,
    /// Reject every story and epic update.
    read_only: bool,

    next_id: i64,
}

#[derive(Clone)]
struct FakeTracker {
    name: &'static str,
    state: Arc<Mutex<State>>,
}

impl FakeTracker {
    fn new(name: &'static str) -> Self {
        let state = State {
            next_id: 1000,
            ..Default::default()
        };
        Self {
            name,
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    fn url(&self, kind: &str, id: i64) -> String {
        format!("https://app.example.com/{}/{}/{}", self.name, kind, id)
    }
}

fn not_found(entity: &str, id: &ResourceId) -> TrackerError {
    TrackerError::NotFound {
        entity: entity.into(),
        id: id.to_string(),
    }
}

fn from_json<T: serde::de::DeserializeOwned>(value: Value) -> T {
    serde_json::from_value(value).unwrap()
}

#[async_trait]
impl TrackerApi for FakeTracker {
    async fn list_members(&self) -> Result<Vec<Member>, TrackerError> {
        Ok(self.state().members.clone())
    }

    async fn list_iterations(&self) -> Result<Vec<Iteration>, TrackerError> {
        Ok(self.state().iterations.clone())
    }

    async fn create_iteration(&self, params: &CreateIteration) -> Result<Iteration, TrackerError> {
        let mut state = self.state();
        state.next_id += 1;
        let iteration = Iteration {
            id: ResourceId::Int(state.next_id),
            name: params.name.clone(),
            description: params.description.clone(),
            start_date: params.start_date,
            end_date: params.end_date,
            status: None,
        };
        state.iterations.push(iteration.clone());
        state.created_iterations.push(params.clone());
        Ok(iteration)
    }

    async fn list_workflows(&self) -> Result<Vec<Workflow>, TrackerError> {
        Ok(self.state().workflows.clone())
    }

    async fn list_labels(&self) -> Result<Vec<Label>, TrackerError> {
        Ok(self.state().labels.clone())
    }

    async fn create_label(&self, params: &CreateLabel) -> Result<Label, TrackerError> {
        let mut state = self.state();
        if state.labels.iter().any(|l| l.name == params.name) {
            return Err(TrackerError::Duplicate {
                entity: "label".into(),
                detail: "name already exists".into(),
            });
        }
        state.next_id += 1;
        let label = Label {
            id: Some(ResourceId::Int(state.next_id)),
            name: params.name.clone(),
            color: params.color.clone(),
            archived: false,
        };
        state.labels.push(label.clone());
        state.created_labels.push(params.clone());
        Ok(label)
    }

    async fn list_project_stories(
        &self,
        project_id: &ResourceId,
    ) -> Result<Vec<Story>, TrackerError> {
        Ok(self
            .state()
            .stories
            .iter()
            .filter(|s| s.project_id.as_ref() == Some(project_id))
            .cloned()
            .collect())
    }

    async fn get_story(&self, id: &ResourceId) -> Result<Story, TrackerError> {
        let state = self.state();
        if state.broken_stories.contains(id) {
            return Err(TrackerError::ApiError {
                status: 500,
                body: "internal error".into(),
            });
        }
        state
            .stories
            .iter()
            .find(|s| &s.id == id)
            .cloned()
            .ok_or_else(|| not_found("story", id))
    }

    async fn create_story(&self, params: &CreateStory) -> Result<Story, TrackerError> {
        let mut state = self.state();
        state.next_id += 1;
        let id = state.next_id;
        let story: Story = from_json(json!({
            "id": id,
            "name": params.name,
            "app_url": self.url("story", id),
            "project_id": params.project_id,
            "epic_id": params.epic_id,
        }));
        state.stories.push(story.clone());
        state.created_stories.push(params.clone());
        Ok(story)
    }

    async fn update_story(
        &self,
        id: &ResourceId,
        params: &UpdateEntity,
    ) -> Result<Story, TrackerError> {
        let mut state = self.state();
        if state.read_only {
            return Err(TrackerError::ApiError {
                status: 403,
                body: "workspace is read-only".into(),
            });
        }
        state.updates.push((id.clone(), params.clone()));
        let story = state
            .stories
            .iter_mut()
            .find(|s| &s.id == id)
            .ok_or_else(|| not_found("story", id))?;
        if let Some(name) = &params.name {
            story.name = name.clone();
        }
        if let Some(description) = &params.description {
            story.description = description.clone();
        }
        Ok(story.clone())
    }

    async fn list_epics(&self) -> Result<Vec<Epic>, TrackerError> {
        Ok(self.state().epics.clone())
    }

    async fn get_epic(&self, id: &ResourceId) -> Result<Epic, TrackerError> {
        self.state()
            .epics
            .iter()
            .find(|e| &e.id == id)
            .cloned()
            .ok_or_else(|| not_found("epic", id))
    }

    async fn create_epic(&self, params: &CreateEpic) -> Result<Epic, TrackerError> {
        let mut state = self.state();
        state.next_id += 1;
        let id = state.next_id;
        let epic: Epic = from_json(json!({
            "id": id,
            "name": params.name,
            "app_url": self.url("epic", id),
            "milestone_id": params.milestone_id,
        }));
        state.epics.push(epic.clone());
        state.created_epics.push(params.clone());
        Ok(epic)
    }

    async fn update_epic(
        &self,
        id: &ResourceId,
        params: &UpdateEntity,
    ) -> Result<Epic, TrackerError> {
        let mut state = self.state();
        if state.read_only {
            return Err(TrackerError::ApiError {
                status: 403,
                body: "workspace is read-only".into(),
            });
        }
        state.updates.push((id.clone(), params.clone()));
        let epic = state
            .epics
            .iter_mut()
            .find(|e| &e.id == id)
            .ok_or_else(|| not_found("epic", id))?;
        if let Some(name) = &params.name {
            epic.name = name.clone();
        }
        Ok(epic.clone())
    }

    async fn list_epic_stories(&self, epic_id: &ResourceId) -> Result<Vec<Story>, TrackerError> {
        Ok(self
            .state()
            .stories
            .iter()
            .filter(|s| s.epic_id.as_ref() == Some(epic_id))
            .cloned()
            .collect())
    }

    async fn list_epic_comments(
        &self,
        epic_id: &ResourceId,
    ) -> Result<Vec<EpicComment>, TrackerError> {
        Ok(self
            .state()
            .epic_comments
            .iter()
            .filter(|(epic, _)| epic == epic_id)
            .map(|(_, comment)| comment.clone())
            .collect())
    }

    async fn create_epic_comment(
        &self,
        epic_id: &ResourceId,
        params: &CreateComment,
    ) -> Result<EpicComment, TrackerError> {
        let mut state = self.state();
        state.next_id += 1;
        let comment: EpicComment = from_json(json!({
            "id": state.next_id,
            "author_id": params.author_id,
            "text": params.text,
        }));
        state.epic_comments.push((epic_id.clone(), comment.clone()));
        state.created_comments.push(params.clone());
        Ok(comment)
    }

    async fn list_milestones(&self) -> Result<Vec<Milestone>, TrackerError> {
        Ok(self.state().milestones.clone())
    }

    async fn get_milestone(&self, id: &ResourceId) -> Result<Milestone, TrackerError> {
        self.state()
            .milestones
            .iter()
            .find(|m| &m.id == id)
            .cloned()
            .ok_or_else(|| not_found("milestone", id))
    }

    async fn create_milestone(&self, params: &CreateMilestone) -> Result<Milestone, TrackerError> {
        let mut state = self.state();
        state.next_id += 1;
        let milestone: Milestone = from_json(json!({
            "id": state.next_id,
            "name": params.name,
        }));
        state.milestones.push(milestone.clone());
        state.created_milestones.push(params.clone());
        Ok(milestone)
    }

    async fn list_milestone_epics(
        &self,
        milestone_id: &ResourceId,
    ) -> Result<Vec<Epic>, TrackerError> {
        Ok(self
            .state()
            .epics
            .iter()
            .filter(|e| e.milestone_id.as_ref() == Some(milestone_id))
            .cloned()
            .collect())
    }

    async fn create_linked_file(
        &self,
        params: &CreateLinkedFile,
    ) -> Result<StoryFile, TrackerError> {
        let mut state = self.state();
        if state.broken_files.contains(&params.name) {
            return Err(TrackerError::ApiError {
                status: 422,
                body: "url is not reachable".into(),
            });
        }
        state.next_id += 1;
        let file: StoryFile = from_json(json!({
            "id": state.next_id,
            "name": params.name,
            "url": params.url,
        }));
        state.created_files.push(params.clone());
        Ok(file)
    }

    async fn create_story_link(&self, params: &CreateStoryLink) -> Result<StoryLink, TrackerError> {
        let mut state = self.state();
        if state.links.contains(params) {
            return Err(TrackerError::Duplicate {
                entity: "story link".into(),
                detail: "already exists".into(),
            });
        }
        state.links.push(params.clone());
        state.next_id += 1;
        Ok(from_json(json!({
            "id": state.next_id,
            "subject_id": params.subject_id,
            "object_id": params.object_id,
            "verb": params.verb,
        })))
    }
}

// ===========================================================================
// Fixtures
// ===========================================================================

const SOURCE_PROJECT: i64 = 12584;
const TARGET_PROJECT: i64 = 12683;

/// Source and target with matching members and workflow states.
fn workspaces() -> (FakeTracker, FakeTracker) {
    let source = FakeTracker::new("source");
    let target = FakeTracker::new("target");
    {
        let mut s = source.state();
        s.members = from_json(json!([
            {"id": "s-alice", "profile": {"email_address": "alice@example.com"}},
            {"id": "s-bob", "profile": {"email_address": "bob@example.com"}}
        ]));
        s.workflows = from_json(json!([
            {"id": 1, "name": "Engineering", "states": [
                {"id": 500, "name": "In Progress"},
                {"id": 501, "name": "Done"}
            ]}
        ]));
    }
    {
        let mut t = target.state();
        t.members = from_json(json!([
            {"id": "t-alice", "profile": {"email_address": "alice@example.com"}}
        ]));
        t.workflows = from_json(json!([
            {"id": 2, "name": "Engineering", "states": [
                {"id": 900, "name": "In Progress"}
            ]}
        ]));
    }
    (source, target)
}

fn add_story(tracker: &FakeTracker, story: Value) {
    tracker.state().stories.push(from_json(story));
}

fn migrator(source: &FakeTracker, target: &FakeTracker) -> Migrator<FakeTracker, FakeTracker> {
    Migrator::new(source.clone(), target.clone(), MigrationOptions::default())
}

fn unmarked_migrator(
    source: &FakeTracker,
    target: &FakeTracker,
) -> Migrator<FakeTracker, FakeTracker> {
    let options = MigrationOptions {
        mark_source: false,
        ..Default::default()
    };
    Migrator::new(source.clone(), target.clone(), options)
}

// ===========================================================================
// Tests
// ===========================================================================

#[tokio::test]
async fn test_story_import_is_idempotent() {
    let (source, target) = workspaces();
    add_story(
        &source,
        json!({
            "id": 42,
            "name": "Fix bug",
            "description": "Steps to reproduce",
            "app_url": "https://app.example.com/source/story/42",
            "project_id": SOURCE_PROJECT,
            "workflow_state_id": 500,
            "owner_ids": ["s-alice", "s-bob"],
            "comments": [{"author_id": "s-bob", "text": "seen in prod"}]
        }),
    );

    let plan = MigrationPlan {
        stories: StoryScope::One(ResourceId::Int(42)),
        target_project_id: Some(ResourceId::Int(TARGET_PROJECT)),
        ..Default::default()
    };
    let migrator = migrator(&source, &target);

    let first = migrator.run(&plan).await.unwrap();
    assert_eq!(first.stories_created, 1);
    assert!(!first.has_failures());

    {
        let t = target.state();
        let created = &t.created_stories[0];
        assert_eq!(created.owner_ids, vec![ResourceId::from("t-alice")]);
        assert_eq!(created.workflow_state_id, Some(ResourceId::Int(900)));
        assert_eq!(created.project_id, Some(ResourceId::Int(TARGET_PROJECT)));
        assert_eq!(created.comments.len(), 1);
        assert_eq!(created.comments[0].author_id, None);
    }
    let target_id = target.state().stories[0].id.clone();
    {
        let s = source.state();
        let story = &s.stories[0];
        assert_eq!(story.name, format!("[Migrated:{}] Fix bug", target_id));
        assert!(story.description.ends_with(&format!(
            "** Migrated to https://app.example.com/target/story/{} **",
            target_id
        )));
    }

    let second = migrator.run(&plan).await.unwrap();
    assert_eq!(second.stories_created, 0);
    assert_eq!(second.stories_skipped, 1);
    assert_eq!(target.state().created_stories.len(), 1);
}

#[tokio::test]
async fn test_epic_import_with_marked_story_and_link_repair() {
    let (source, target) = workspaces();
    {
        let mut s = source.state();
        s.epics = from_json(json!([{
            "id": 8309,
            "name": "Checkout revamp",
            "description": "Rebuild the checkout",
            "app_url": "https://app.example.com/source/epic/8309",
            "project_ids": [SOURCE_PROJECT],
            "owner_ids": ["s-alice"]
        }]));
        s.epic_comments = vec![(
            ResourceId::Int(8309),
            from_json(json!({
                "author_id": "s-alice",
                "text": "kickoff",
                "comments": [{"author_id": "s-bob", "text": "agreed"}]
            })),
        )];
    }
    let link_1_2 = json!({"id": 70, "subject_id": 1, "object_id": 2, "verb": "blocks"});
    let link_1_3 = json!({"id": 71, "subject_id": 1, "object_id": 3, "verb": "relates to"});
    add_story(
        &source,
        json!({
            "id": 1, "name": "First", "project_id": SOURCE_PROJECT, "epic_id": 8309,
            "story_links": [link_1_2, link_1_3]
        }),
    );
    add_story(
        &source,
        json!({
            "id": 2, "name": "[Migrated:900] Second", "project_id": SOURCE_PROJECT,
            "epic_id": 8309, "story_links": [link_1_2]
        }),
    );
    add_story(
        &source,
        json!({
            "id": 3, "name": "Third", "project_id": SOURCE_PROJECT,
            "story_links": [link_1_3]
        }),
    );

    let plan = MigrationPlan {
        epics: EpicScope::Project {
            project_id: ResourceId::Int(SOURCE_PROJECT),
            label: None,
        },
        story_links: Some(ResourceId::Int(SOURCE_PROJECT)),
        target_project_id: Some(ResourceId::Int(TARGET_PROJECT)),
        ..Default::default()
    };
    let migrator = migrator(&source, &target);
    let summary = migrator.run(&plan).await.unwrap();

    assert_eq!(summary.epics_created, 1);
    assert_eq!(summary.epic_comments_created, 2);
    assert_eq!(summary.stories_created, 1);
    assert_eq!(summary.stories_skipped, 1);
    assert_eq!(summary.links_created, 1);
    assert_eq!(summary.links_skipped, 1);
    assert!(!summary.has_failures());

    let t = target.state();
    let epic_id = t.epics[0].id.clone();
    assert_eq!(t.created_stories.len(), 1);
    assert_eq!(t.created_stories[0].name, "First");
    assert_eq!(t.created_stories[0].epic_id, Some(epic_id));

    let story_1_target = migrator
        .ledger()
        .target_of(EntityKind::Story, &ResourceId::Int(1))
        .cloned()
        .unwrap();
    assert_eq!(
        t.links,
        vec![CreateStoryLink {
            subject_id: story_1_target,
            object_id: ResourceId::Int(900),
            verb: "blocks".into(),
        }]
    );
}

#[tokio::test]
async fn test_link_repair_counts_existing_links() {
    let (source, target) = workspaces();
    let link = json!({"id": 70, "subject_id": 1, "object_id": 2, "verb": "blocks"});
    add_story(
        &source,
        json!({"id": 1, "name": "[Migrated:801] A", "project_id": SOURCE_PROJECT, "story_links": [link]}),
    );
    add_story(
        &source,
        json!({"id": 2, "name": "[Migrated:802] B", "project_id": SOURCE_PROJECT, "story_links": [link]}),
    );
    target.state().links.push(CreateStoryLink {
        subject_id: ResourceId::Int(801),
        object_id: ResourceId::Int(802),
        verb: "blocks".into(),
    });

    let plan = MigrationPlan {
        story_links: Some(ResourceId::Int(SOURCE_PROJECT)),
        ..Default::default()
    };
    let summary = migrator(&source, &target).run(&plan).await.unwrap();
    assert_eq!(summary.links_created, 0);
    assert_eq!(summary.links_existing, 1);
    assert!(!summary.has_failures());
}

#[tokio::test]
async fn test_reference_data_skips_existing() {
    let (source, target) = workspaces();
    {
        let mut s = source.state();
        s.labels = from_json(json!([
            {"name": "bug", "color": "#ff0000"},
            {"name": "Feature"}
        ]));
        s.iterations = from_json(json!([
            {"id": 10, "name": "Sprint 1", "start_date": "2021-01-04", "end_date": "2021-01-15"},
            {"id": 11, "name": "Sprint 2", "start_date": "2021-01-18", "end_date": "2021-01-29"}
        ]));
    }
    {
        let mut t = target.state();
        t.labels = from_json(json!([{"id": 1, "name": "Bug"}]));
        t.iterations = from_json(json!([
            {"id": 20, "name": "Sprint 1", "start_date": "2021-01-04", "end_date": "2021-01-15"}
        ]));
    }

    let plan = MigrationPlan {
        iterations: true,
        labels: true,
        ..Default::default()
    };
    let summary = migrator(&source, &target).run(&plan).await.unwrap();

    assert_eq!(summary.labels_created, 1);
    assert_eq!(summary.labels_skipped, 1);
    assert_eq!(summary.iterations_created, 1);
    assert_eq!(summary.iterations_skipped, 1);

    let t = target.state();
    assert_eq!(t.created_labels.len(), 1);
    assert_eq!(t.created_labels[0].name, "Feature");
    assert_eq!(t.created_labels[0].color, None);
    assert_eq!(t.created_iterations[0].name, "Sprint 2");
}

#[tokio::test]
async fn test_file_failure_does_not_abort_story() {
    let (source, target) = workspaces();
    target.state().broken_files.insert("broken.png".into());
    add_story(
        &source,
        json!({
            "id": 42,
            "name": "Attachments",
            "project_id": SOURCE_PROJECT,
            "files": [
                {"id": 1, "name": "broken.png", "url": "https://files.example.com/broken.png"},
                {"id": 2, "name": "trace.log", "url": "https://files.example.com/trace.log", "uploader_id": "s-alice"}
            ]
        }),
    );

    let plan = MigrationPlan {
        stories: StoryScope::One(ResourceId::Int(42)),
        ..Default::default()
    };
    let summary = migrator(&source, &target).run(&plan).await.unwrap();

    assert_eq!(summary.stories_created, 1);
    assert_eq!(summary.files_linked, 1);
    assert_eq!(summary.files_failed, 1);
    assert!(!summary.has_failures());

    let t = target.state();
    assert_eq!(t.created_files.len(), 1);
    assert_eq!(t.created_files[0].uploader_id, Some(ResourceId::from("t-alice")));
    assert_eq!(t.created_stories[0].linked_file_ids.len(), 1);
}

#[tokio::test]
async fn test_failing_story_does_not_stop_siblings() {
    let (source, target) = workspaces();
    for id in 1..=3 {
        add_story(
            &source,
            json!({"id": id, "name": format!("Story {}", id), "project_id": SOURCE_PROJECT}),
        );
    }
    source.state().broken_stories.insert(ResourceId::Int(2));

    let plan = MigrationPlan {
        stories: StoryScope::Project(ResourceId::Int(SOURCE_PROJECT)),
        ..Default::default()
    };
    let summary = migrator(&source, &target).run(&plan).await.unwrap();

    assert_eq!(summary.stories_created, 2);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].kind, EntityKind::Story);
    assert_eq!(summary.failures[0].source_id, ResourceId::Int(2));
    assert_eq!(summary.processed(), 3);
}

#[tokio::test]
async fn test_milestone_reused_and_epics_attached() {
    let (source, target) = workspaces();
    {
        let mut s = source.state();
        s.milestones = from_json(json!([{"id": 3, "name": "Launch"}]));
        s.epics = from_json(json!([{"id": 8309, "name": "Checkout", "milestone_id": 3}]));
    }
    target.state().milestones = from_json(json!([{"id": 77, "name": "Launch"}]));

    let plan = MigrationPlan {
        epics: EpicScope::Milestone {
            milestone_id: ResourceId::Int(3),
            with_epics: true,
        },
        ..Default::default()
    };
    let summary = migrator(&source, &target).run(&plan).await.unwrap();

    assert_eq!(summary.milestones_skipped, 1);
    assert_eq!(summary.milestones_created, 0);
    assert_eq!(summary.epics_created, 1);

    let t = target.state();
    assert!(t.created_milestones.is_empty());
    assert_eq!(t.created_epics[0].milestone_id, Some(ResourceId::Int(77)));
}

#[tokio::test]
async fn test_already_migrated_epic_still_imports_stories() {
    let (source, target) = workspaces();
    source.state().epics = from_json(json!([{"id": 8309, "name": "[Migrated:555] Checkout"}]));
    source.state().epic_comments = vec![(
        ResourceId::Int(8309),
        from_json(json!({"text": "old comment"})),
    )];
    add_story(
        &source,
        json!({"id": 1, "name": "Late story", "project_id": SOURCE_PROJECT, "epic_id": 8309}),
    );

    let plan = MigrationPlan {
        epics: EpicScope::One {
            epic_id: ResourceId::Int(8309),
            milestone_id: None,
        },
        ..Default::default()
    };
    let summary = migrator(&source, &target).run(&plan).await.unwrap();

    assert_eq!(summary.epics_skipped, 1);
    assert_eq!(summary.epic_comments_created, 0);
    assert_eq!(summary.stories_created, 1);
    let t = target.state();
    assert!(t.created_epics.is_empty());
    assert_eq!(t.created_stories[0].epic_id, Some(ResourceId::Int(555)));
}

#[tokio::test]
async fn test_governed_calls_take_slots() {
    let (source, target) = workspaces();
    add_story(&source, json!({"id": 42, "name": "Fix bug"}));

    let governor = Arc::new(RateGovernor::new(100, Duration::from_secs(60), 10));
    let migrator = Migrator::new(
        Governed::new(source.clone(), governor.clone()),
        Governed::new(target.clone(), governor.clone()),
        MigrationOptions::default(),
    );
    let plan = MigrationPlan {
        stories: StoryScope::One(ResourceId::Int(42)),
        ..Default::default()
    };
    migrator.run(&plan).await.unwrap();

    // Three map lists per side, then fetch, create and marker write-back.
    assert_eq!(governor.in_window().await, 9);
}

#[tokio::test]
async fn test_epic_story_is_created_once_without_source_markers() {
    let (source, target) = workspaces();
    source.state().epics = from_json(json!([
        {"id": 8309, "name": "Checkout", "project_ids": [SOURCE_PROJECT]}
    ]));
    add_story(
        &source,
        json!({"id": 1, "name": "Pay button", "project_id": SOURCE_PROJECT, "epic_id": 8309}),
    );
    add_story(
        &source,
        json!({"id": 2, "name": "Loose end", "project_id": SOURCE_PROJECT}),
    );

    let plan = MigrationPlan {
        epics: EpicScope::Project {
            project_id: ResourceId::Int(SOURCE_PROJECT),
            label: None,
        },
        stories: StoryScope::Project(ResourceId::Int(SOURCE_PROJECT)),
        target_project_id: Some(ResourceId::Int(TARGET_PROJECT)),
        ..Default::default()
    };
    let summary = unmarked_migrator(&source, &target).run(&plan).await.unwrap();

    assert_eq!(summary.epics_created, 1);
    assert_eq!(summary.stories_created, 2);
    assert_eq!(summary.processed(), 3);
    assert!(!summary.has_failures());

    let t = target.state();
    let names: Vec<&str> = t.created_stories.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Pay button", "Loose end"]);
    assert_eq!(t.created_stories[0].epic_id, Some(t.epics[0].id.clone()));
    assert!(source.state().updates.is_empty());
}

#[tokio::test]
async fn test_epic_label_filter_ignores_case() {
    let (source, target) = workspaces();
    source.state().epics = from_json(json!([
        {"id": 1, "name": "Tagged", "project_ids": [SOURCE_PROJECT], "labels": [{"name": "Q3-Roadmap"}]},
        {"id": 2, "name": "Untagged", "project_ids": [SOURCE_PROJECT], "labels": [{"name": "backlog"}]},
        {"id": 3, "name": "Other project", "project_ids": [1], "labels": [{"name": "q3-roadmap"}]}
    ]));

    let plan = MigrationPlan {
        epics: EpicScope::Project {
            project_id: ResourceId::Int(SOURCE_PROJECT),
            label: Some("q3-ROADMAP".into()),
        },
        ..Default::default()
    };
    let summary = migrator(&source, &target).run(&plan).await.unwrap();

    assert_eq!(summary.epics_created, 1);
    let t = target.state();
    assert_eq!(t.created_epics.len(), 1);
    assert_eq!(t.created_epics[0].name, "Tagged");
}

#[tokio::test]
async fn test_story_uses_iteration_created_in_same_run() {
    let (source, target) = workspaces();
    source.state().iterations = from_json(json!([
        {"id": 10, "name": "Sprint 7", "start_date": "2021-03-01", "end_date": "2021-03-12"}
    ]));
    add_story(
        &source,
        json!({"id": 42, "name": "Planned work", "project_id": SOURCE_PROJECT, "iteration_id": 10}),
    );

    let plan = MigrationPlan {
        iterations: true,
        stories: StoryScope::One(ResourceId::Int(42)),
        ..Default::default()
    };
    let summary = migrator(&source, &target).run(&plan).await.unwrap();

    assert_eq!(summary.iterations_created, 1);
    assert_eq!(summary.stories_created, 1);
    let t = target.state();
    assert_eq!(
        t.created_stories[0].iteration_id,
        Some(t.iterations[0].id.clone())
    );
}

#[tokio::test]
async fn test_write_back_failure_is_counted_once() {
    let (source, target) = workspaces();
    source.state().read_only = true;
    source.state().epics = from_json(json!([
        {"id": 8309, "name": "Checkout", "project_ids": [SOURCE_PROJECT]}
    ]));
    add_story(
        &source,
        json!({"id": 1, "name": "Pay button", "project_id": SOURCE_PROJECT, "epic_id": 8309}),
    );

    let plan = MigrationPlan {
        epics: EpicScope::Project {
            project_id: ResourceId::Int(SOURCE_PROJECT),
            label: None,
        },
        stories: StoryScope::Project(ResourceId::Int(SOURCE_PROJECT)),
        ..Default::default()
    };
    let summary = migrator(&source, &target).run(&plan).await.unwrap();

    assert_eq!(summary.epics_created, 1);
    assert_eq!(summary.stories_created, 1);
    assert!(summary.failures.is_empty());
    assert_eq!(summary.follow_up_failures.len(), 2);
    assert_eq!(summary.processed(), 2);
    assert!(summary.has_failures());
    assert_eq!(target.state().created_stories.len(), 1);
}
