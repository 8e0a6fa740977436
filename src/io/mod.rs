//! IO modules - external system interfaces
//!
//! This module contains all external IO operations:
//! - `camera` - frame acquisition contract and replay source
//! - `synthetic` - synthetic camera + dot estimator for demo/test runs
//! - `egress` - density readings output to file (JSONL format)

pub mod camera;
pub mod egress;
pub mod synthetic;

// Re-export commonly used types
pub use camera::{FrameSource, ReplaySource};
pub use egress::{create_egress_channel, DensityEgress, DensityRecord, EgressSender};
pub use synthetic::{DotEstimator, SyntheticCamera};
