//
// lib.rs
// Atlas-Overlap
//
// Exposes the crate's modules and re-exports the CLI entry point for both binary and library consumers.
//

// Core: catalogs, geometry and the overlap computation.
pub mod catalog;
pub mod error;
pub mod geometry;
pub mod names;
pub mod overlap;

// Surroundings: volume IO, reports, jobs and the command/server surfaces.
pub mod batch;
pub mod cli;
pub mod job;
pub mod models;
pub mod report;
pub mod storage;
pub mod validate;
pub mod volume;
pub mod web;

pub use catalog::{AtlasKind, Catalog, CatalogEntry, CatalogSource};
pub use cli::{run as run_cli, Cli, Commands};
pub use error::OverlapError;
pub use geometry::VoxelGeometry;
pub use models::RegionStat;
