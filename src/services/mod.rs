//! Services - business logic and state management
//!
//! This module contains the core business logic services:
//! - `classifier` - subject-count to density-level policy
//! - `estimator` - occupancy estimation contract
//! - `snapshot` - concurrent store of the latest sample per zone
//! - `zone_worker` - per-zone estimation loop
//! - `router` - congestion-aware shortest-path search

pub mod classifier;
pub mod estimator;
pub mod router;
pub mod snapshot;
pub mod zone_worker;

// Re-export commonly used types
pub use classifier::{Classification, DensityClassifier};
pub use estimator::OccupancyEstimator;
pub use router::{find_path, CongestionCostModel, PathFinder, Route, RouteError};
pub use snapshot::{DensitySnapshot, SnapshotStore};
pub use zone_worker::ZoneWorker;
