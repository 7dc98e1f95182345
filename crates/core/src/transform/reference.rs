//! Milestone, iteration, label and file transforms.

use crate::identity::ResourceMap;
use crate::models::{Iteration, Label, Milestone, StoryFile};
use crate::payloads::{
    CreateCategory, CreateIteration, CreateLabel, CreateLinkedFile, CreateMilestone,
};

pub fn milestone_payload(milestone: &Milestone) -> CreateMilestone {
    CreateMilestone {
        name: milestone.name.clone(),
        description: milestone.description.clone().filter(|d| !d.is_empty()),
        state: milestone.state.clone(),
        categories: milestone
            .categories
            .iter()
            .map(|c| CreateCategory {
                name: c.name.clone(),
            })
            .collect(),
        started_at_override: milestone.started_at_override,
        completed_at_override: milestone.completed_at_override,
    }
}

pub fn iteration_payload(iteration: &Iteration) -> CreateIteration {
    CreateIteration {
        name: iteration.name.clone(),
        start_date: iteration.start_date,
        end_date: iteration.end_date,
        description: iteration.description.clone().filter(|d| !d.is_empty()),
    }
}

pub fn label_payload(label: &Label) -> CreateLabel {
    CreateLabel {
        name: label.name.clone(),
        color: label.color.clone().filter(|c| !c.is_empty()),
    }
}

/// A `url` linked file pointing at the source attachment.
pub fn linked_file_payload(file: &StoryFile, members: &ResourceMap) -> CreateLinkedFile {
    CreateLinkedFile {
        name: file.name.clone(),
        file_type: "url".to_string(),
        url: file.url.clone().unwrap_or_default(),
        description: file.description.clone().filter(|d| !d.is_empty()),
        content_type: file.content_type.clone().filter(|c| !c.is_empty()),
        uploader_id: members.translate(file.uploader_id.as_ref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResourceId;
    use serde_json::json;

    #[test]
    fn test_milestone_categories_and_overrides() {
        let milestone: Milestone = serde_json::from_value(json!({
            "id": 3,
            "name": "Launch",
            "state": "to do",
            "categories": [{"id": 1, "name": "Marketing", "color": "#123456"}],
            "started_at_override": "2021-01-04T00:00:00Z"
        }))
        .unwrap();
        let payload = milestone_payload(&milestone);
        assert_eq!(
            payload.categories,
            vec![CreateCategory {
                name: "Marketing".into()
            }]
        );
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["started_at_override"], "2021-01-04T00:00:00Z");
        assert!(json.get("completed_at_override").is_none());
        assert!(json.get("description").is_none());
    }

    #[test]
    fn test_linked_file_maps_uploader() {
        let file: StoryFile = serde_json::from_value(json!({
            "id": 55,
            "name": "trace.log",
            "url": "https://files.example.com/trace.log",
            "content_type": "text/plain",
            "uploader_id": "u-1"
        }))
        .unwrap();
        let members: ResourceMap = [(ResourceId::from("u-1"), ResourceId::from("t-1"))]
            .into_iter()
            .collect();
        let payload = linked_file_payload(&file, &members);
        assert_eq!(payload.file_type, "url");
        assert_eq!(payload.uploader_id, Some(ResourceId::from("t-1")));

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "url");
        assert!(json.get("description").is_none());
    }

    #[test]
    fn test_label_color_kept_when_present() {
        let label = Label {
            id: None,
            name: "bug".into(),
            color: Some("#ff0000".into()),
            archived: false,
        };
        assert_eq!(label_payload(&label).color.as_deref(), Some("#ff0000"));

        let plain = Label {
            color: None,
            ..label
        };
        assert_eq!(label_payload(&plain).color, None);
    }
}
