//! Cross-workspace identity resolution.
//!
//! Reference resources (members, iterations, workflow states) have unrelated
//! IDs in the two workspaces. They are matched on a natural key such as an
//! email address or a name, read through a [`FieldPath`].

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument};

use super::field_path::FieldPath;
use super::resource_map::{ResourceMap, ResourceMaps};
use crate::errors::TrackerError;
use crate::models::ResourceId;
use crate::tracker::TrackerApi;

/// Resource kinds that can be matched across workspaces.
///
/// Epics are deliberately absent: there is no natural key that reliably
/// identifies the same epic in both workspaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Members,
    Iterations,
    Workflows,
}

impl ResourceKind {
    /// Field compared between workspaces.
    pub fn natural_key(self) -> FieldPath {
        match self {
            Self::Members => FieldPath::parse("profile.email_address"),
            Self::Iterations | Self::Workflows => FieldPath::parse("name"),
        }
    }

    /// Collection inside each record that carries the mapped IDs, if the
    /// top-level record is not itself the mapped resource.
    pub fn inner_collection(self) -> Option<FieldPath> {
        match self {
            Self::Workflows => Some(FieldPath::parse("states")),
            Self::Members | Self::Iterations => None,
        }
    }

    /// Fetch every record of this kind as JSON.
    pub async fn fetch<A>(self, api: &A) -> Result<Vec<Value>, TrackerError>
    where
        A: TrackerApi + ?Sized,
    {
        match self {
            Self::Members => to_values(api.list_members().await?),
            Self::Iterations => to_values(api.list_iterations().await?),
            Self::Workflows => to_values(api.list_workflows().await?),
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Members => write!(f, "members"),
            Self::Iterations => write!(f, "iterations"),
            Self::Workflows => write!(f, "workflows"),
        }
    }
}

fn to_values<T: Serialize>(items: Vec<T>) -> Result<Vec<Value>, TrackerError> {
    items
        .into_iter()
        .map(|item| serde_json::to_value(item).map_err(|e| TrackerError::ParseError(e.to_string())))
        .collect()
}

/// Build the `source ID -> target ID` map for one resource kind.
#[instrument(skip(source, target))]
pub async fn build_resource_map<S, T>(
    source: &S,
    target: &T,
    kind: ResourceKind,
) -> Result<ResourceMap, TrackerError>
where
    S: TrackerApi + ?Sized,
    T: TrackerApi + ?Sized,
{
    let source_items = kind.fetch(source).await?;
    let target_items = kind.fetch(target).await?;
    let map = match_resources(
        &source_items,
        &target_items,
        &kind.natural_key(),
        kind.inner_collection().as_ref(),
    );
    info!(
        %kind,
        source = source_items.len(),
        target = target_items.len(),
        mapped = map.len(),
        "built resource map"
    );
    Ok(map)
}

/// Build all maps needed by the entity transforms.
pub async fn build_resource_maps<S, T>(source: &S, target: &T) -> Result<ResourceMaps, TrackerError>
where
    S: TrackerApi + ?Sized,
    T: TrackerApi + ?Sized,
{
    let maps = ResourceMaps {
        members: build_resource_map(source, target, ResourceKind::Members).await?,
        iterations: build_resource_map(source, target, ResourceKind::Iterations).await?,
        workflow_states: build_resource_map(source, target, ResourceKind::Workflows).await?,
    };
    for (name, map) in [
        ("members", &maps.members),
        ("iterations", &maps.iterations),
        ("workflow_states", &maps.workflow_states),
    ] {
        for (from, to) in map.iter() {
            debug!(map = name, %from, %to, "resource mapping");
        }
    }
    Ok(maps)
}

/// Match source records to target records on `key`.
///
/// Keys are compared exactly (case-sensitive). When several source records
/// share a key the last one wins. Records without a key or an `id` are
/// ignored.
pub fn match_resources(
    source_items: &[Value],
    target_items: &[Value],
    key: &FieldPath,
    inner: Option<&FieldPath>,
) -> ResourceMap {
    let mut source_by_key: HashMap<String, ResourceId> = HashMap::new();
    for (natural_key, id) in keyed_ids(source_items, key, inner) {
        source_by_key.insert(natural_key, id);
    }

    keyed_ids(target_items, key, inner)
        .filter_map(|(natural_key, target_id)| {
            source_by_key
                .get(&natural_key)
                .map(|source_id| (source_id.clone(), target_id))
        })
        .collect()
}

/// Yield `(natural key, id)` for every mappable item, descending into the
/// inner collection when one is given.
fn keyed_ids<'a>(
    items: &'a [Value],
    key: &'a FieldPath,
    inner: Option<&'a FieldPath>,
) -> impl Iterator<Item = (String, ResourceId)> + 'a {
    items
        .iter()
        .flat_map(move |item| -> Vec<&'a Value> {
            match inner {
                Some(path) => path
                    .resolve(item)
                    .and_then(Value::as_array)
                    .map(|arr| arr.iter().collect())
                    .unwrap_or_default(),
                None => vec![item],
            }
        })
        .filter_map(move |item| {
            let natural_key = key.resolve(item)?;
            let id = item.get("id").and_then(ResourceId::from_json)?;
            Some((natural_key.to_string(), id))
        })
}
