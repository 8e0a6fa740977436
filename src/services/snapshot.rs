//! Thread-safe holder of the latest density sample per zone
//!
//! One guarded slot per zone, fixed at construction. Each slot has exactly
//! one writer (the zone's estimation worker) and many readers (routing
//! queries, presentation overlays). Slots swap an `Arc` under a short
//! `parking_lot::RwLock` critical section, so a reader never observes a
//! partially written sample and no worker ever blocks another.

use crate::domain::types::{DensityLevel, DensitySample, Frame, ZoneId};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Default)]
struct ZoneSlot {
    sample: RwLock<Option<Arc<DensitySample>>>,
    /// Most recent raw frame, kept alongside the sample for renderers.
    /// Secondary read path; the routing core never touches it.
    frame: RwLock<Option<Arc<Frame>>>,
}

/// Concurrent store of the latest reading per monitored zone
#[derive(Debug)]
pub struct SnapshotStore {
    slots: FxHashMap<ZoneId, ZoneSlot>,
}

impl SnapshotStore {
    /// Create a store with one slot per zone; the zone set is fixed for
    /// the process lifetime.
    pub fn new(zones: impl IntoIterator<Item = ZoneId>) -> Self {
        let slots = zones.into_iter().map(|z| (z, ZoneSlot::default())).collect();
        Self { slots }
    }

    /// Publish a new sample for `zone`, superseding the previous one
    ///
    /// Publishing to a zone the store was not built with is dropped with a
    /// warning; slots are never created after construction.
    pub fn publish(&self, zone: ZoneId, sample: DensitySample) {
        match self.slots.get(&zone) {
            Some(slot) => *slot.sample.write() = Some(Arc::new(sample)),
            None => warn!(zone = %zone, "publish_unknown_zone"),
        }
    }

    /// Publish the latest raw frame for `zone`
    pub fn publish_frame(&self, zone: ZoneId, frame: Arc<Frame>) {
        match self.slots.get(&zone) {
            Some(slot) => *slot.frame.write() = Some(frame),
            None => warn!(zone = %zone, "publish_frame_unknown_zone"),
        }
    }

    /// Latest sample for `zone`, or `None` before the first successful cycle
    pub fn latest(&self, zone: ZoneId) -> Option<Arc<DensitySample>> {
        self.slots.get(&zone).and_then(|slot| slot.sample.read().clone())
    }

    /// Latest raw frame for `zone`
    pub fn latest_frame(&self, zone: ZoneId) -> Option<Arc<Frame>> {
        self.slots.get(&zone).and_then(|slot| slot.frame.read().clone())
    }

    pub fn zones(&self) -> impl Iterator<Item = ZoneId> + '_ {
        self.slots.keys().copied()
    }

    /// Take a point-in-time copy of every zone's latest sample
    ///
    /// Each slot is read under its own lock, so every sample in the copy is
    /// internally coherent. Routing queries take one snapshot at call start
    /// and use it for the whole search.
    pub fn read_all(&self) -> DensitySnapshot {
        let samples = self
            .slots
            .iter()
            .filter_map(|(&zone, slot)| slot.sample.read().clone().map(|s| (zone, s)))
            .collect();
        DensitySnapshot { samples }
    }
}

/// Immutable multi-zone view taken from [`SnapshotStore::read_all`]
#[derive(Debug, Clone, Default)]
pub struct DensitySnapshot {
    samples: FxHashMap<ZoneId, Arc<DensitySample>>,
}

impl DensitySnapshot {
    pub fn sample(&self, zone: ZoneId) -> Option<&Arc<DensitySample>> {
        self.samples.get(&zone)
    }

    /// Density level for `zone`; `None` means no data yet (costed as
    /// `Normal` by the router)
    pub fn level(&self, zone: ZoneId) -> Option<DensityLevel> {
        self.samples.get(&zone).map(|s| s.level)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl FromIterator<(ZoneId, Arc<DensitySample>)> for DensitySnapshot {
    fn from_iter<T: IntoIterator<Item = (ZoneId, Arc<DensitySample>)>>(iter: T) -> Self {
        Self { samples: iter.into_iter().collect() }
    }
}
