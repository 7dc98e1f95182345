//! Tracker entity types as returned by the REST API.
//!
//! These are read-only snapshots. Source entities are never mutated in place;
//! the [`transform`](crate::transform) module turns them into creation
//! payloads for the target workspace.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// A tracker identifier.
///
/// Most entities use integer IDs; members use UUID strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceId {
    Int(i64),
    Str(String),
}

impl ResourceId {
    /// Read an identifier out of a JSON scalar.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => n.as_i64().map(Self::Int),
            serde_json::Value::String(s) => Some(Self::Str(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(id) => write!(f, "{}", id),
            Self::Str(id) => f.write_str(id),
        }
    }
}

impl From<i64> for ResourceId {
    fn from(id: i64) -> Self {
        Self::Int(id)
    }
}

impl From<&str> for ResourceId {
    fn from(id: &str) -> Self {
        Self::Str(id.to_string())
    }
}

impl From<String> for ResourceId {
    fn from(id: String) -> Self {
        Self::Str(id)
    }
}

/// Parse a CLI argument: integers become [`ResourceId::Int`], anything else a
/// string ID.
impl std::str::FromStr for ResourceId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(s.parse::<i64>()
            .map(Self::Int)
            .unwrap_or_else(|_| Self::Str(s.to_string())))
    }
}

// ---------------------------------------------------------------------------
// Reference resources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: ResourceId,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub profile: MemberProfile,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemberProfile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub mention_name: Option<String>,
    #[serde(default)]
    pub email_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Iteration {
    pub id: ResourceId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: ResourceId,
    pub name: String,
    #[serde(default)]
    pub states: Vec<WorkflowState>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    pub id: ResourceId,
    pub name: String,
    #[serde(rename = "type", default)]
    pub state_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Label {
    #[serde(default)]
    pub id: Option<ResourceId>,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub archived: bool,
}

// ---------------------------------------------------------------------------
// Stories
// ---------------------------------------------------------------------------

/// A story, either the full record from `GET /stories/{id}` or the slim
/// variant from list endpoints (nested collections then default to empty).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Story {
    pub id: ResourceId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub app_url: String,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub story_type: Option<String>,
    #[serde(default)]
    pub project_id: Option<ResourceId>,
    #[serde(default)]
    pub epic_id: Option<ResourceId>,
    #[serde(default)]
    pub iteration_id: Option<ResourceId>,
    #[serde(default)]
    pub workflow_state_id: Option<ResourceId>,
    #[serde(default)]
    pub requested_by_id: Option<ResourceId>,
    #[serde(default)]
    pub owner_ids: Vec<ResourceId>,
    #[serde(default)]
    pub follower_ids: Vec<ResourceId>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub files: Vec<StoryFile>,
    #[serde(default)]
    pub linked_files: Vec<StoryFile>,
    #[serde(default)]
    pub story_links: Vec<StoryLink>,
    #[serde(default)]
    pub external_links: Vec<String>,
    #[serde(default)]
    pub estimate: Option<i64>,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub started_at_override: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at_override: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    #[serde(default)]
    pub id: Option<ResourceId>,
    #[serde(default)]
    pub author_id: Option<ResourceId>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A task within a story. Tasks are `complete`, stories are `completed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    #[serde(default)]
    pub id: Option<ResourceId>,
    pub description: String,
    #[serde(default)]
    pub complete: bool,
    #[serde(default)]
    pub owner_ids: Vec<ResourceId>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// An uploaded or linked file attached to a story.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryFile {
    pub id: ResourceId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub uploader_id: Option<ResourceId>,
}

/// A typed relation between two stories, e.g. `subject blocks object`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryLink {
    #[serde(default)]
    pub id: Option<ResourceId>,
    pub subject_id: ResourceId,
    pub object_id: ResourceId,
    pub verb: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Epics & milestones
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Epic {
    pub id: ResourceId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub app_url: String,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub milestone_id: Option<ResourceId>,
    #[serde(default)]
    pub project_ids: Vec<ResourceId>,
    #[serde(default)]
    pub requested_by_id: Option<ResourceId>,
    #[serde(default)]
    pub owner_ids: Vec<ResourceId>,
    #[serde(default)]
    pub follower_ids: Vec<ResourceId>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub planned_start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A comment on an epic. Replies are nested under their parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpicComment {
    #[serde(default)]
    pub id: Option<ResourceId>,
    #[serde(default)]
    pub author_id: Option<ResourceId>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub comments: Vec<EpicComment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Milestone {
    pub id: ResourceId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub app_url: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub started_at_override: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at_override: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    #[serde(default)]
    pub id: Option<ResourceId>,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}
