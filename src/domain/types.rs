//! Shared types for the crowd routing core

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Newtype wrapper for monitored zone IDs to provide type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct ZoneId(pub u32);

impl std::fmt::Display for ZoneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Newtype wrapper for venue graph node IDs to provide type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct NodeId(pub u32);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Crowd density classification for a zone
///
/// Ordered: `Normal < High < Critical`. `Critical` is reserved for the cost
/// model; the classifier currently only produces `Normal` and `High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DensityLevel {
    Normal,
    High,
    Critical,
}

impl DensityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DensityLevel::Normal => "normal",
            DensityLevel::High => "high",
            DensityLevel::Critical => "critical",
        }
    }
}

impl std::fmt::Display for DensityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Axis-aligned region of a detected subject within a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Single 8-bit grayscale raster frame from a zone's camera
///
/// Pixels are row-major, `width * height` bytes. `Bytes` keeps clones cheap
/// so the latest frame can be shared with presentation readers.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixels: Bytes,
}

impl Frame {
    pub fn new(width: u32, height: u32, pixels: Bytes) -> Self {
        debug_assert_eq!(pixels.len(), (width * height) as usize);
        Self { width, height, pixels }
    }

    /// Pixel value at (x, y); out-of-bounds reads as 0
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> u8 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        self.pixels[(y * self.width + x) as usize]
    }
}

/// Raw output of an occupancy estimator for one frame
#[derive(Debug, Clone, Default)]
pub struct Estimate {
    pub count: usize,
    pub regions: Vec<BoundingBox>,
}

/// Latest classified occupancy reading for a zone
///
/// Produced atomically once per estimation cycle and published into the
/// snapshot store. Immutable once published; the next cycle supersedes it.
#[derive(Debug, Clone, Serialize)]
pub struct DensitySample {
    pub level: DensityLevel,
    pub message: String,
    /// Advisory for presentation layers when the zone is congested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advisory: Option<String>,
    pub subject_count: usize,
    pub regions: Vec<BoundingBox>,
    pub captured_at: DateTime<Utc>,
}
