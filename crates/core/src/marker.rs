//! The migrated marker.
//!
//! A migrated source entity is renamed to `"[Migrated:<targetId>] <name>"`.
//! The prefix flags the entity as done (re-runs skip it) and carries the
//! target ID that story-link repair reads back.

use crate::models::ResourceId;
use crate::payloads::UpdateEntity;

pub const MIGRATED_PREFIX: &str = "[Migrated:";

/// Whether a name already carries the marker.
pub fn is_migrated(name: &str) -> bool {
    name.starts_with(MIGRATED_PREFIX)
}

/// `"[Migrated:<target_id>] <name>"`.
pub fn marked_name(target_id: &ResourceId, name: &str) -> String {
    format!("{}{}] {}", MIGRATED_PREFIX, target_id, name)
}

/// Description with the pointer to the migrated copy appended.
pub fn annotated_description(description: &str, target_url: &str) -> String {
    format!("{}\n\n** Migrated to {} **", description, target_url)
}

/// Update that marks a source entity as migrated to `target_id`.
pub fn write_back(
    target_id: &ResourceId,
    target_url: &str,
    name: &str,
    description: &str,
) -> UpdateEntity {
    UpdateEntity {
        name: Some(marked_name(target_id, name)),
        description: Some(annotated_description(description, target_url)),
    }
}

/// Recover the target ID encoded in a marked name.
///
/// Takes the text after the last marker and cuts it at the first `]`. Names
/// without a marker, and markers whose payload is not an integer, yield
/// `None`.
pub fn parse_target_id(name: &str) -> Option<ResourceId> {
    let (_, after) = name.rsplit_once(MIGRATED_PREFIX)?;
    let raw = after.split(']').next()?.trim();
    raw.parse::<i64>().ok().map(ResourceId::Int)
}
