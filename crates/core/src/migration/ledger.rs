//! In-run record of source to target identities.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::ResourceId;

/// Kinds of entity the ledger and summary track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Story,
    Epic,
    Milestone,
    Iteration,
    Label,
    StoryLink,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Story => write!(f, "story"),
            Self::Epic => write!(f, "epic"),
            Self::Milestone => write!(f, "milestone"),
            Self::Iteration => write!(f, "iteration"),
            Self::Label => write!(f, "label"),
            Self::StoryLink => write!(f, "story_link"),
        }
    }
}

/// Maps `(kind, source ID)` to the target ID created (or found) for it.
///
/// Lives for a single run; link repair falls back to the source marker for
/// anything migrated by an earlier run.
#[derive(Debug, Clone, Default)]
pub struct MigrationLedger {
    entries: HashMap<(EntityKind, ResourceId), ResourceId>,
}

impl MigrationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, kind: EntityKind, source: ResourceId, target: ResourceId) {
        self.entries.insert((kind, source), target);
    }

    pub fn target_of(&self, kind: EntityKind, source: &ResourceId) -> Option<&ResourceId> {
        self.entries.get(&(kind, source.clone()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
