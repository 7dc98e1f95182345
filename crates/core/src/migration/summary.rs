//! Counters reported at the end of a run.

use serde::{Deserialize, Serialize};

use super::ledger::EntityKind;
use crate::models::ResourceId;

/// A top-level entity whose import failed. The batch carried on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub kind: EntityKind,
    pub source_id: ResourceId,
    pub message: String,
}

/// Statistics from one migration run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MigrationSummary {
    pub stories_created: usize,
    pub stories_skipped: usize,
    pub epics_created: usize,
    pub epics_skipped: usize,
    pub epic_comments_created: usize,
    pub milestones_created: usize,
    pub milestones_skipped: usize,
    pub iterations_created: usize,
    pub iterations_skipped: usize,
    pub labels_created: usize,
    pub labels_skipped: usize,
    pub files_linked: usize,
    pub files_failed: usize,
    pub links_created: usize,
    pub links_existing: usize,
    pub links_skipped: usize,
    /// Entities that were not imported.
    pub failures: Vec<FailureRecord>,
    /// Entities counted as created or skipped whose later steps failed,
    /// such as the marker write-back or an epic comment.
    pub follow_up_failures: Vec<FailureRecord>,
}

impl MigrationSummary {
    /// Entities handled, whether created, skipped or failed. Each entity is
    /// counted once; follow-up failures are not added again.
    pub fn processed(&self) -> usize {
        self.stories_created
            + self.stories_skipped
            + self.epics_created
            + self.epics_skipped
            + self.milestones_created
            + self.milestones_skipped
            + self.iterations_created
            + self.iterations_skipped
            + self.labels_created
            + self.labels_skipped
            + self.links_created
            + self.links_existing
            + self.links_skipped
            + self.failures.len()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty() || !self.follow_up_failures.is_empty()
    }

    /// Record an entity that could not be imported. Only its first failure
    /// is kept.
    pub(crate) fn record_failure(
        &mut self,
        kind: EntityKind,
        source_id: &ResourceId,
        message: impl Into<String>,
    ) {
        let listed = self
            .failures
            .iter()
            .any(|f| f.kind == kind && &f.source_id == source_id);
        if !listed {
            self.failures.push(FailureRecord {
                kind,
                source_id: source_id.clone(),
                message: message.into(),
            });
        }
    }

    pub(crate) fn record_follow_up_failure(
        &mut self,
        kind: EntityKind,
        source_id: &ResourceId,
        message: impl Into<String>,
    ) {
        self.follow_up_failures.push(FailureRecord {
            kind,
            source_id: source_id.clone(),
            message: message.into(),
        });
    }
}
