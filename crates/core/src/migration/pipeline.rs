//! Stage ordering for a migration run.

use serde::{Deserialize, Serialize};

use crate::errors::MigrationError;

/// Stages of a migration run, in the only order they may execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Pending,
    ResourceMaps,
    ReferenceData,
    Epics,
    Stories,
    StoryLinks,
    Complete,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::ResourceMaps => write!(f, "resource_maps"),
            Self::ReferenceData => write!(f, "reference_data"),
            Self::Epics => write!(f, "epics"),
            Self::Stories => write!(f, "stories"),
            Self::StoryLinks => write!(f, "story_links"),
            Self::Complete => write!(f, "complete"),
        }
    }
}

impl Stage {
    /// Stage that must have run before this one may start.
    pub fn prerequisite(self) -> Option<Stage> {
        match self {
            Self::Epics | Self::Stories => Some(Self::ResourceMaps),
            _ => None,
        }
    }
}

/// Tracks the current stage and rejects out-of-order transitions.
///
/// Stages may be skipped but never re-entered or reversed.
#[derive(Debug, Clone)]
pub struct StagePipeline {
    current: Stage,
    completed: Vec<Stage>,
}

impl Default for StagePipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl StagePipeline {
    pub fn new() -> Self {
        Self {
            current: Stage::Pending,
            completed: Vec::new(),
        }
    }

    pub fn current(&self) -> Stage {
        self.current
    }

    pub fn has_completed(&self, stage: Stage) -> bool {
        self.completed.contains(&stage)
    }

    /// Move to `next`, marking the current stage complete.
    pub fn enter(&mut self, next: Stage) -> Result<(), MigrationError> {
        if next <= self.current {
            return Err(MigrationError::InvalidStageTransition {
                from: self.current.to_string(),
                to: next.to_string(),
            });
        }
        if let Some(required) = next.prerequisite() {
            if self.current != required && !self.has_completed(required) {
                return Err(MigrationError::MissingPrerequisite {
                    stage: next.to_string(),
                    requires: required.to_string(),
                });
            }
        }
        if self.current != Stage::Pending {
            self.completed.push(self.current);
        }
        self.current = next;
        Ok(())
    }

    /// Mark the run finished.
    pub fn finish(&mut self) -> Result<(), MigrationError> {
        self.enter(Stage::Complete)
    }
}
