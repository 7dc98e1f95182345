//! Pure source-entity to target-payload transforms.
//!
//! Nothing here performs I/O. References are translated through the
//! [`ResourceMaps`](crate::identity::ResourceMaps); anything without a
//! target counterpart is omitted from the payload.

pub mod epic;
pub mod reference;
pub mod story;

pub use epic::{epic_comment_payloads, epic_payload};
pub use reference::{iteration_payload, label_payload, linked_file_payload, milestone_payload};
pub use story::{comment_payload, story_payload, task_payload, StoryPlacement};
