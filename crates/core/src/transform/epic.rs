//! Epic and epic-comment transforms.

use super::story::non_empty;
use crate::identity::ResourceMap;
use crate::models::{Epic, EpicComment, ResourceId};
use crate::payloads::{CreateComment, CreateEpic, CreateLabel};

/// Build the creation payload for `epic`.
///
/// `milestone_id` is attached only when given. The source group is not
/// carried over since groups are not mapped between workspaces.
pub fn epic_payload(
    epic: &Epic,
    members: &ResourceMap,
    milestone_id: Option<&ResourceId>,
) -> CreateEpic {
    CreateEpic {
        name: epic.name.clone(),
        description: non_empty(&epic.description),
        state: epic.state.clone(),
        milestone_id: milestone_id.cloned(),
        requested_by_id: members.translate(epic.requested_by_id.as_ref()),
        owner_ids: members.translate_all(&epic.owner_ids),
        follower_ids: members.translate_all(&epic.follower_ids),
        labels: epic
            .labels
            .iter()
            .map(|label| CreateLabel {
                name: label.name.clone(),
                color: None,
            })
            .collect(),
        external_id: non_empty(&epic.app_url),
        deadline: epic.deadline,
        planned_start_date: epic.planned_start_date,
        created_at: epic.created_at,
        updated_at: epic.updated_at,
    }
}

/// Flatten an epic's comment threads into creation payloads, parents before
/// replies. Deleted comments are dropped.
pub fn epic_comment_payloads(comments: &[EpicComment], members: &ResourceMap) -> Vec<CreateComment> {
    let mut out = Vec::new();
    flatten_into(comments, members, &mut out);
    out
}

fn flatten_into(comments: &[EpicComment], members: &ResourceMap, out: &mut Vec<CreateComment>) {
    for comment in comments {
        if !comment.deleted && !comment.text.is_empty() {
            out.push(CreateComment {
                text: comment.text.clone(),
                author_id: members.translate(comment.author_id.as_ref()),
                created_at: comment.created_at,
                updated_at: comment.updated_at,
            });
        }
        flatten_into(&comment.comments, members, out);
    }
}
