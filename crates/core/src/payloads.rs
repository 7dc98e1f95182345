//! Request bodies sent to the target (and, for marker write-back, the source)
//! workspace.
//!
//! Optional fields are skipped when unset, so a serialized payload never
//! carries an explicit `null`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::models::ResourceId;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CreateStory {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub archived: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub story_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ResourceId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epic_id: Option<ResourceId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iteration_id: Option<ResourceId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_state_id: Option<ResourceId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_by_id: Option<ResourceId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub owner_ids: Vec<ResourceId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub follower_ids: Vec<ResourceId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<CreateLabel>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<CreateComment>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tasks: Vec<CreateTask>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub linked_file_ids: Vec<ResourceId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub external_links: Vec<String>,
    /// Back-reference to the source story's URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimate: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at_override: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at_override: Option<DateTime<Utc>>,
}

/// A comment on a story or an epic.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CreateComment {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_id: Option<ResourceId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CreateTask {
    pub description: String,
    pub complete: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub owner_ids: Vec<ResourceId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CreateLabel {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CreateEpic {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milestone_id: Option<ResourceId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_by_id: Option<ResourceId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub owner_ids: Vec<ResourceId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub follower_ids: Vec<ResourceId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<CreateLabel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planned_start_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CreateMilestone {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<CreateCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at_override: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at_override: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CreateCategory {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateIteration {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A URL-type linked file standing in for a source attachment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateLinkedFile {
    pub name: String,
    #[serde(rename = "type")]
    pub file_type: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploader_id: Option<ResourceId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateStoryLink {
    pub subject_id: ResourceId,
    pub object_id: ResourceId,
    pub verb: String,
}

/// Partial update of a story or epic; used for marker write-back.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateEntity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
