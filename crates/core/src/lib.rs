//! trackmigrate core library.
//!
//! This crate provides the building blocks for copying work items between two
//! Shortcut (formerly Clubhouse) workspaces: configuration, the tracker API
//! client and its rate governor, identity mapping, entity transforms, and the
//! migration orchestrator.

pub mod config;
pub mod errors;
pub mod governor;
pub mod identity;
pub mod marker;
pub mod migration;
pub mod models;
pub mod payloads;
pub mod tracker;
pub mod transform;

// Re-exports for convenience.
pub use config::MigrateConfig;
pub use governor::RateGovernor;
pub use identity::{ResourceMap, ResourceMaps};
pub use migration::{MigrationPlan, MigrationSummary, Migrator};
pub use tracker::{Governed, TrackerApi, TrackerClient};
