//! Tracker REST API access.
//!
//! [`TrackerApi`] is the seam between the migration logic and the remote
//! workspaces. [`TrackerClient`] talks HTTP; [`Governed`] wraps any
//! implementation so each call first takes a slot from the shared
//! [`RateGovernor`](crate::governor::RateGovernor).

pub mod client;
pub mod governed;

pub use client::TrackerClient;
pub use governed::Governed;

use async_trait::async_trait;

use crate::errors::TrackerError;
use crate::models::{
    Epic, EpicComment, Iteration, Label, Member, Milestone, ResourceId, Story, StoryFile,
    StoryLink, Workflow,
};
use crate::payloads::{
    CreateComment, CreateEpic, CreateIteration, CreateLabel, CreateLinkedFile, CreateMilestone,
    CreateStory, CreateStoryLink, UpdateEntity,
};

/// Operations the migration consumes from one workspace.
///
/// List operations are expected to return the complete collection.
#[async_trait]
pub trait TrackerApi: Send + Sync {
    async fn list_members(&self) -> Result<Vec<Member>, TrackerError>;

    async fn list_iterations(&self) -> Result<Vec<Iteration>, TrackerError>;

    async fn create_iteration(&self, params: &CreateIteration) -> Result<Iteration, TrackerError>;

    async fn list_workflows(&self) -> Result<Vec<Workflow>, TrackerError>;

    async fn list_labels(&self) -> Result<Vec<Label>, TrackerError>;

    async fn create_label(&self, params: &CreateLabel) -> Result<Label, TrackerError>;

    async fn list_project_stories(&self, project_id: &ResourceId)
        -> Result<Vec<Story>, TrackerError>;

    async fn get_story(&self, id: &ResourceId) -> Result<Story, TrackerError>;

    async fn create_story(&self, params: &CreateStory) -> Result<Story, TrackerError>;

    async fn update_story(
        &self,
        id: &ResourceId,
        params: &UpdateEntity,
    ) -> Result<Story, TrackerError>;

    async fn list_epics(&self) -> Result<Vec<Epic>, TrackerError>;

    async fn get_epic(&self, id: &ResourceId) -> Result<Epic, TrackerError>;

    async fn create_epic(&self, params: &CreateEpic) -> Result<Epic, TrackerError>;

    async fn update_epic(&self, id: &ResourceId, params: &UpdateEntity)
        -> Result<Epic, TrackerError>;

    async fn list_epic_stories(&self, epic_id: &ResourceId) -> Result<Vec<Story>, TrackerError>;

    async fn list_epic_comments(
        &self,
        epic_id: &ResourceId,
    ) -> Result<Vec<EpicComment>, TrackerError>;

    async fn create_epic_comment(
        &self,
        epic_id: &ResourceId,
        params: &CreateComment,
    ) -> Result<EpicComment, TrackerError>;

    async fn list_milestones(&self) -> Result<Vec<Milestone>, TrackerError>;

    async fn get_milestone(&self, id: &ResourceId) -> Result<Milestone, TrackerError>;

    async fn create_milestone(&self, params: &CreateMilestone)
        -> Result<Milestone, TrackerError>;

    async fn list_milestone_epics(
        &self,
        milestone_id: &ResourceId,
    ) -> Result<Vec<Epic>, TrackerError>;

    async fn create_linked_file(
        &self,
        params: &CreateLinkedFile,
    ) -> Result<StoryFile, TrackerError>;

    async fn create_story_link(&self, params: &CreateStoryLink)
        -> Result<StoryLink, TrackerError>;
}
