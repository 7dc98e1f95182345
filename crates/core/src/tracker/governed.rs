//! Rate-governed [`TrackerApi`] decorator.

use std::sync::Arc;

use async_trait::async_trait;

use super::TrackerApi;
use crate::errors::TrackerError;
use crate::governor::RateGovernor;
use crate::models::{
    Epic, EpicComment, Iteration, Label, Member, Milestone, ResourceId, Story, StoryFile,
    StoryLink, Workflow,
};
use crate::payloads::{
    CreateComment, CreateEpic, CreateIteration, CreateLabel, CreateLinkedFile, CreateMilestone,
    CreateStory, CreateStoryLink, UpdateEntity,
};

/// Wraps a tracker so every call acquires a governor slot first.
///
/// Several `Governed` values may share one governor; source and target
/// clients normally do.
pub struct Governed<A> {
    inner: A,
    governor: Arc<RateGovernor>,
}

impl<A> Governed<A> {
    pub fn new(inner: A, governor: Arc<RateGovernor>) -> Self {
        Self { inner, governor }
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }

    pub fn governor(&self) -> &Arc<RateGovernor> {
        &self.governor
    }
}

#[async_trait]
impl<A: TrackerApi> TrackerApi for Governed<A> {
    async fn list_members(&self) -> Result<Vec<Member>, TrackerError> {
        self.governor.acquire().await;
        self.inner.list_members().await
    }

    async fn list_iterations(&self) -> Result<Vec<Iteration>, TrackerError> {
        self.governor.acquire().await;
        self.inner.list_iterations().await
    }

    async fn create_iteration(&self, params: &CreateIteration) -> Result<Iteration, TrackerError> {
        self.governor.acquire().await;
        self.inner.create_iteration(params).await
    }

    async fn list_workflows(&self) -> Result<Vec<Workflow>, TrackerError> {
        self.governor.acquire().await;
        self.inner.list_workflows().await
    }

    async fn list_labels(&self) -> Result<Vec<Label>, TrackerError> {
        self.governor.acquire().await;
        self.inner.list_labels().await
    }

    async fn create_label(&self, params: &CreateLabel) -> Result<Label, TrackerError> {
        self.governor.acquire().await;
        self.inner.create_label(params).await
    }

    async fn list_project_stories(
        &self,
        project_id: &ResourceId,
    ) -> Result<Vec<Story>, TrackerError> {
        self.governor.acquire().await;
        self.inner.list_project_stories(project_id).await
    }

    async fn get_story(&self, id: &ResourceId) -> Result<Story, TrackerError> {
        self.governor.acquire().await;
        self.inner.get_story(id).await
    }

    async fn create_story(&self, params: &CreateStory) -> Result<Story, TrackerError> {
        self.governor.acquire().await;
        self.inner.create_story(params).await
    }

    async fn update_story(
        &self,
        id: &ResourceId,
        params: &UpdateEntity,
    ) -> Result<Story, TrackerError> {
        self.governor.acquire().await;
        self.inner.update_story(id, params).await
    }

    async fn list_epics(&self) -> Result<Vec<Epic>, TrackerError> {
        self.governor.acquire().await;
        self.inner.list_epics().await
    }

    async fn get_epic(&self, id: &ResourceId) -> Result<Epic, TrackerError> {
        self.governor.acquire().await;
        self.inner.get_epic(id).await
    }

    async fn create_epic(&self, params: &CreateEpic) -> Result<Epic, TrackerError> {
        self.governor.acquire().await;
        self.inner.create_epic(params).await
    }

    async fn update_epic(
        &self,
        id: &ResourceId,
        params: &UpdateEntity,
    ) -> Result<Epic, TrackerError> {
        self.governor.acquire().await;
        self.inner.update_epic(id, params).await
    }

    async fn list_epic_stories(&self, epic_id: &ResourceId) -> Result<Vec<Story>, TrackerError> {
        self.governor.acquire().await;
        self.inner.list_epic_stories(epic_id).await
    }

    async fn list_epic_comments(
        &self,
        epic_id: &ResourceId,
    ) -> Result<Vec<EpicComment>, TrackerError> {
        self.governor.acquire().await;
        self.inner.list_epic_comments(epic_id).await
    }

    async fn create_epic_comment(
        &self,
        epic_id: &ResourceId,
        params: &CreateComment,
    ) -> Result<EpicComment, TrackerError> {
        self.governor.acquire().await;
        self.inner.create_epic_comment(epic_id, params).await
    }

    async fn list_milestones(&self) -> Result<Vec<Milestone>, TrackerError> {
        self.governor.acquire().await;
        self.inner.list_milestones().await
    }

    async fn get_milestone(&self, id: &ResourceId) -> Result<Milestone, TrackerError> {
        self.governor.acquire().await;
        self.inner.get_milestone(id).await
    }

    async fn create_milestone(&self, params: &CreateMilestone) -> Result<Milestone, TrackerError> {
        self.governor.acquire().await;
        self.inner.create_milestone(params).await
    }

    async fn list_milestone_epics(
        &self,
        milestone_id: &ResourceId,
    ) -> Result<Vec<Epic>, TrackerError> {
        self.governor.acquire().await;
        self.inner.list_milestone_epics(milestone_id).await
    }

    async fn create_linked_file(
        &self,
        params: &CreateLinkedFile,
    ) -> Result<StoryFile, TrackerError> {
        self.governor.acquire().await;
        self.inner.create_linked_file(params).await
    }

    async fn create_story_link(
        &self,
        params: &CreateStoryLink,
    ) -> Result<StoryLink, TrackerError> {
        self.governor.acquire().await;
        self.inner.create_story_link(params).await
    }
}
