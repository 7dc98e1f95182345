//! Source-ID to target-ID translation tables.

use std::collections::HashMap;

use crate::models::ResourceId;

/// Translation table for one resource kind.
///
/// A source ID with no entry has no counterpart in the target workspace;
/// callers drop the reference rather than fail.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceMap {
    entries: HashMap<ResourceId, ResourceId>,
}

impl ResourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source: ResourceId, target: ResourceId) {
        self.entries.insert(source, target);
    }

    pub fn get(&self, source: &ResourceId) -> Option<&ResourceId> {
        self.entries.get(source)
    }

    /// Translate an optional reference; unset or unmapped yields `None`.
    pub fn translate(&self, source: Option<&ResourceId>) -> Option<ResourceId> {
        source.and_then(|id| self.entries.get(id)).cloned()
    }

    /// Translate a list, dropping unmapped IDs and keeping input order.
    pub fn translate_all(&self, sources: &[ResourceId]) -> Vec<ResourceId> {
        sources
            .iter()
            .filter_map(|id| self.entries.get(id))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ResourceId, &ResourceId)> {
        self.entries.iter()
    }
}

impl FromIterator<(ResourceId, ResourceId)> for ResourceMap {
    fn from_iter<I: IntoIterator<Item = (ResourceId, ResourceId)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// The three maps every entity transform needs.
#[derive(Debug, Clone, Default)]
pub struct ResourceMaps {
    pub members: ResourceMap,
    pub iterations: ResourceMap,
    pub workflow_states: ResourceMap,
}
