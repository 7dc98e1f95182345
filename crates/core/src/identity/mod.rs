//! Identity mapping between the source and target workspaces.
//!
//! Members, iterations and workflow states are matched on a natural key
//! (email address or name) and produce a [`ResourceMap`] per kind.

pub mod field_path;
pub mod mapper;
pub mod resource_map;

pub use field_path::FieldPath;
pub use mapper::{build_resource_map, build_resource_maps, match_resources, ResourceKind};
pub use resource_map::{ResourceMap, ResourceMaps};
