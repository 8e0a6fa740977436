//! Domain models - core types and venue topology
//!
//! This module contains the canonical data types used throughout the system:
//! - `DensitySample` - the latest classified occupancy reading for a zone
//! - `DensityLevel` - crowd density classification
//! - `Frame` / `Estimate` - raster input and estimator output
//! - `VenueGraph` - static weighted graph of navigable nodes
//! - `ZoneId` / `NodeId` - typed identifiers

pub mod graph;
pub mod types;

// Re-export commonly used types
pub use graph::VenueGraph;
pub use types::{BoundingBox, DensityLevel, DensitySample, Estimate, Frame, NodeId, ZoneId};
