//! Occupancy estimator contract
//!
//! The estimation model is an external capability: the core hands it a
//! frame and gets back a subject count with bounding regions. Any failure
//! is a recoverable per-cycle error for the calling worker.

use crate::domain::types::{Estimate, Frame};
use async_trait::async_trait;

/// Opaque occupancy estimation capability
///
/// Implementations may be remote model servers, on-device inference, or the
/// dot-counting stand-in in `io::synthetic`. Shared across workers behind an
/// `Arc`, so implementations must be `Send + Sync`.
#[async_trait]
pub trait OccupancyEstimator: Send + Sync {
    async fn estimate(&self, frame: &Frame) -> anyhow::Result<Estimate>;
}
