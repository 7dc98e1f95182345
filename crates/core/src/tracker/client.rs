//! Clubhouse / Shortcut REST API v3 client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, RETRY_AFTER, USER_AGENT};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, instrument};

use super::TrackerApi;
use crate::errors::TrackerError;
use crate::models::{
    Epic, EpicComment, Iteration, Label, Member, Milestone, ResourceId, Story, StoryFile,
    StoryLink, Workflow,
};
use crate::payloads::{
    CreateComment, CreateEpic, CreateIteration, CreateLabel, CreateLinkedFile, CreateMilestone,
    CreateStory, CreateStoryLink, UpdateEntity,
};

const TOKEN_HEADER: &str = "shortcut-token";

/// Asynchronous tracker REST API client for a single workspace.
#[derive(Clone)]
pub struct TrackerClient {
    http: reqwest::Client,
    api_url: String,
}

impl TrackerClient {
    pub fn new(
        api_url: impl Into<String>,
        token: &str,
        timeout: Duration,
    ) -> Result<Self, TrackerError> {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        let mut token_value = HeaderValue::from_str(token).map_err(|_| {
            TrackerError::AuthenticationFailed("token contains invalid characters".into())
        })?;
        token_value.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("trackmigrate/0.1"));
        headers.insert(TOKEN_HEADER, token_value);
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;
        info!(api_url = %api_url, "created TrackerClient");
        Ok(Self { http, api_url })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        entity: &str,
    ) -> Result<T, TrackerError> {
        let req = self.http.get(self.url(path));
        self.send(req, entity, path).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        entity: &str,
    ) -> Result<T, TrackerError> {
        let req = self.http.post(self.url(path)).json(body);
        self.send(req, entity, path).await
    }

    async fn put_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        entity: &str,
    ) -> Result<T, TrackerError> {
        let req = self.http.put(self.url(path)).json(body);
        self.send(req, entity, path).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        entity: &str,
        path: &str,
    ) -> Result<T, TrackerError> {
        let resp = req.send().await?;
        let resp = check_response(resp, entity, path).await?;
        let body = resp.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| TrackerError::ParseError(format!("{} ({}): {}", entity, path, e)))
    }
}

async fn check_response(
    resp: reqwest::Response,
    entity: &str,
    path: &str,
) -> Result<reqwest::Response, TrackerError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            return Err(TrackerError::AuthenticationFailed(format!("HTTP {}", status)));
        }
        StatusCode::NOT_FOUND => {
            return Err(TrackerError::NotFound {
                entity: entity.to_string(),
                id: path.to_string(),
            });
        }
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = resp
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown")
                .to_string();
            return Err(TrackerError::RateLimited { retry_after });
        }
        _ => {}
    }

    let body = resp.text().await.unwrap_or_default();
    let conflict_status = matches!(
        status,
        StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY
    );
    if conflict_status && looks_like_duplicate(&body) {
        return Err(TrackerError::Duplicate {
            entity: entity.to_string(),
            detail: body,
        });
    }
    Err(TrackerError::ApiError {
        status: status.as_u16(),
        body,
    })
}

/// Whether an error body reports a uniqueness violation.
fn looks_like_duplicate(body: &str) -> bool {
    let lower = body.to_lowercase();
    ["already exists", "duplicate", "already been taken", "must be unique"]
        .iter()
        .any(|needle| lower.contains(needle))
}

#[async_trait]
impl TrackerApi for TrackerClient {
    #[instrument(skip(self))]
    async fn list_members(&self) -> Result<Vec<Member>, TrackerError> {
        let members: Vec<Member> = self.get_json("/members", "members").await?;
        debug!(count = members.len(), "fetched members");
        Ok(members)
    }

    #[instrument(skip(self))]
    async fn list_iterations(&self) -> Result<Vec<Iteration>, TrackerError> {
        let iterations: Vec<Iteration> = self.get_json("/iterations", "iterations").await?;
        debug!(count = iterations.len(), "fetched iterations");
        Ok(iterations)
    }

    #[instrument(skip(self, params), fields(name = %params.name))]
    async fn create_iteration(&self, params: &CreateIteration) -> Result<Iteration, TrackerError> {
        let iteration: Iteration = self.post_json("/iterations", params, "iteration").await?;
        info!(id = %iteration.id, "created iteration");
        Ok(iteration)
    }

    #[instrument(skip(self))]
    async fn list_workflows(&self) -> Result<Vec<Workflow>, TrackerError> {
        let workflows: Vec<Workflow> = self.get_json("/workflows", "workflows").await?;
        debug!(count = workflows.len(), "fetched workflows");
        Ok(workflows)
    }

    #[instrument(skip(self))]
    async fn list_labels(&self) -> Result<Vec<Label>, TrackerError> {
        let labels: Vec<Label> = self.get_json("/labels", "labels").await?;
        debug!(count = labels.len(), "fetched labels");
        Ok(labels)
    }

    #[instrument(skip(self, params), fields(name = %params.name))]
    async fn create_label(&self, params: &CreateLabel) -> Result<Label, TrackerError> {
        let label: Label = self.post_json("/labels", params, "label").await?;
        info!("created label");
        Ok(label)
    }

    #[instrument(skip(self))]
    async fn list_project_stories(
        &self,
        project_id: &ResourceId,
    ) -> Result<Vec<Story>, TrackerError> {
        let path = format!("/projects/{}/stories", project_id);
        let stories: Vec<Story> = self.get_json(&path, "project stories").await?;
        debug!(count = stories.len(), "fetched project stories");
        Ok(stories)
    }

    #[instrument(skip(self))]
    async fn get_story(&self, id: &ResourceId) -> Result<Story, TrackerError> {
        let story: Story = self.get_json(&format!("/stories/{}", id), "story").await?;
        debug!(name = %story.name, "fetched story");
        Ok(story)
    }

    #[instrument(skip(self, params), fields(name = %params.name))]
    async fn create_story(&self, params: &CreateStory) -> Result<Story, TrackerError> {
        let story: Story = self.post_json("/stories", params, "story").await?;
        info!(id = %story.id, "created story");
        Ok(story)
    }

    #[instrument(skip(self, params))]
    async fn update_story(
        &self,
        id: &ResourceId,
        params: &UpdateEntity,
    ) -> Result<Story, TrackerError> {
        let story: Story = self
            .put_json(&format!("/stories/{}", id), params, "story")
            .await?;
        debug!("updated story");
        Ok(story)
    }

    #[instrument(skip(self))]
    async fn list_epics(&self) -> Result<Vec<Epic>, TrackerError> {
        let epics: Vec<Epic> = self.get_json("/epics", "epics").await?;
        debug!(count = epics.len(), "fetched epics");
        Ok(epics)
    }

    #[instrument(skip(self))]
    async fn get_epic(&self, id: &ResourceId) -> Result<Epic, TrackerError> {
        let epic: Epic = self.get_json(&format!("/epics/{}", id), "epic").await?;
        debug!(name = %epic.name, "fetched epic");
        Ok(epic)
    }

    #[instrument(skip(self, params), fields(name = %params.name))]
    async fn create_epic(&self, params: &CreateEpic) -> Result<Epic, TrackerError> {
        let epic: Epic = self.post_json("/epics", params, "epic").await?;
        info!(id = %epic.id, "created epic");
        Ok(epic)
    }

    #[instrument(skip(self, params))]
    async fn update_epic(
        &self,
        id: &ResourceId,
        params: &UpdateEntity,
    ) -> Result<Epic, TrackerError> {
        let epic: Epic = self
            .put_json(&format!("/epics/{}", id), params, "epic")
            .await?;
        debug!("updated epic");
        Ok(epic)
    }

    #[instrument(skip(self))]
    async fn list_epic_stories(&self, epic_id: &ResourceId) -> Result<Vec<Story>, TrackerError> {
        let path = format!("/epics/{}/stories", epic_id);
        let stories: Vec<Story> = self.get_json(&path, "epic stories").await?;
        debug!(count = stories.len(), "fetched epic stories");
        Ok(stories)
    }

    #[instrument(skip(self))]
    async fn list_epic_comments(
        &self,
        epic_id: &ResourceId,
    ) -> Result<Vec<EpicComment>, TrackerError> {
        let path = format!("/epics/{}/comments", epic_id);
        let comments: Vec<EpicComment> = self.get_json(&path, "epic comments").await?;
        debug!(count = comments.len(), "fetched epic comments");
        Ok(comments)
    }

    #[instrument(skip(self, params))]
    async fn create_epic_comment(
        &self,
        epic_id: &ResourceId,
        params: &CreateComment,
    ) -> Result<EpicComment, TrackerError> {
        let path = format!("/epics/{}/comments", epic_id);
        let comment: EpicComment = self.post_json(&path, params, "epic comment").await?;
        debug!("created epic comment");
        Ok(comment)
    }

    #[instrument(skip(self))]
    async fn list_milestones(&self) -> Result<Vec<Milestone>, TrackerError> {
        let milestones: Vec<Milestone> = self.get_json("/milestones", "milestones").await?;
        debug!(count = milestones.len(), "fetched milestones");
        Ok(milestones)
    }

    #[instrument(skip(self))]
    async fn get_milestone(&self, id: &ResourceId) -> Result<Milestone, TrackerError> {
        let milestone: Milestone = self
            .get_json(&format!("/milestones/{}", id), "milestone")
            .await?;
        debug!(name = %milestone.name, "fetched milestone");
        Ok(milestone)
    }

    #[instrument(skip(self, params), fields(name = %params.name))]
    async fn create_milestone(&self, params: &CreateMilestone) -> Result<Milestone, TrackerError> {
        let milestone: Milestone = self.post_json("/milestones", params, "milestone").await?;
        info!(id = %milestone.id, "created milestone");
        Ok(milestone)
    }

    #[instrument(skip(self))]
    async fn list_milestone_epics(
        &self,
        milestone_id: &ResourceId,
    ) -> Result<Vec<Epic>, TrackerError> {
        let path = format!("/milestones/{}/epics", milestone_id);
        let epics: Vec<Epic> = self.get_json(&path, "milestone epics").await?;
        debug!(count = epics.len(), "fetched milestone epics");
        Ok(epics)
    }

    #[instrument(skip(self, params), fields(name = %params.name))]
    async fn create_linked_file(
        &self,
        params: &CreateLinkedFile,
    ) -> Result<StoryFile, TrackerError> {
        let file: StoryFile = self.post_json("/linked-files", params, "linked file").await?;
        debug!(id = %file.id, "created linked file");
        Ok(file)
    }

    #[instrument(skip(self, params), fields(subject = %params.subject_id, verb = %params.verb, object = %params.object_id))]
    async fn create_story_link(
        &self,
        params: &CreateStoryLink,
    ) -> Result<StoryLink, TrackerError> {
        let link: StoryLink = self.post_json("/story-links", params, "story link").await?;
        info!("created story link");
        Ok(link)
    }
}
