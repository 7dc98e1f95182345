//! Story transform.

use crate::identity::{ResourceMap, ResourceMaps};
use crate::models::{Comment, ResourceId, Story, Task};
use crate::payloads::{CreateComment, CreateLabel, CreateStory, CreateTask};

/// Where a transformed story lands in the target workspace.
#[derive(Debug, Clone, Default)]
pub struct StoryPlacement {
    pub project_id: Option<ResourceId>,
    pub epic_id: Option<ResourceId>,
    /// Append a pointer to the source story to the description.
    pub annotate_source: bool,
}

/// Build the creation payload for `story`.
///
/// Unmapped members, iterations and workflow states are dropped. Linked
/// files are left empty; the caller adds the IDs of uploaded files.
pub fn story_payload(story: &Story, maps: &ResourceMaps, placement: &StoryPlacement) -> CreateStory {
    let members = &maps.members;
    CreateStory {
        name: story.name.clone(),
        description: story_description(story, placement.annotate_source),
        archived: story.archived,
        story_type: story.story_type.clone(),
        project_id: placement.project_id.clone(),
        epic_id: placement.epic_id.clone(),
        iteration_id: maps.iterations.translate(story.iteration_id.as_ref()),
        workflow_state_id: maps
            .workflow_states
            .translate(story.workflow_state_id.as_ref()),
        requested_by_id: members.translate(story.requested_by_id.as_ref()),
        owner_ids: members.translate_all(&story.owner_ids),
        follower_ids: members.translate_all(&story.follower_ids),
        labels: story
            .labels
            .iter()
            .map(|label| CreateLabel {
                name: label.name.clone(),
                color: None,
            })
            .collect(),
        comments: story
            .comments
            .iter()
            .map(|c| comment_payload(c, members))
            .collect(),
        tasks: story.tasks.iter().map(|t| task_payload(t, members)).collect(),
        linked_file_ids: Vec::new(),
        external_links: story.external_links.clone(),
        external_id: non_empty(&story.app_url),
        estimate: story.estimate,
        deadline: story.deadline,
        created_at: story.created_at,
        updated_at: story.updated_at,
        started_at_override: story.started_at_override,
        completed_at_override: story.completed_at_override,
    }
}

fn story_description(story: &Story, annotate: bool) -> Option<String> {
    let description = match (annotate, story.app_url.is_empty()) {
        (true, false) if story.description.is_empty() => {
            format!("_Migrated from {}_", story.app_url)
        }
        (true, false) => format!("{}\n\n_Migrated from {}_", story.description, story.app_url),
        _ => story.description.clone(),
    };
    non_empty(&description)
}

pub fn comment_payload(comment: &Comment, members: &ResourceMap) -> CreateComment {
    CreateComment {
        text: comment.text.clone(),
        author_id: members.translate(comment.author_id.as_ref()),
        created_at: comment.created_at,
        updated_at: comment.updated_at,
    }
}

pub fn task_payload(task: &Task, members: &ResourceMap) -> CreateTask {
    CreateTask {
        description: task.description.clone(),
        complete: task.complete,
        owner_ids: members.translate_all(&task.owner_ids),
        created_at: task.created_at,
        updated_at: task.updated_at,
    }
}

pub(crate) fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
