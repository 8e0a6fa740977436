//! Per-zone estimation worker
//!
//! One worker per monitored zone, each a long-lived tokio task. A cycle
//! pulls a frame, runs the estimator, classifies the count and publishes
//! the result into the zone's snapshot slot. Cycles are rate-limited: the
//! next one begins no sooner than the configured interval after the
//! previous one began. Any per-cycle failure is logged and skipped; only
//! the shutdown signal ends the loop.

use crate::domain::types::{DensityLevel, DensitySample, ZoneId};
use crate::infra::metrics::Metrics;
use crate::io::camera::FrameSource;
use crate::io::egress::{DensityRecord, EgressSender};
use crate::services::classifier::DensityClassifier;
use crate::services::estimator::OccupancyEstimator;
use crate::services::snapshot::SnapshotStore;
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

pub struct ZoneWorker {
    zone: ZoneId,
    name: String,
    source: Box<dyn FrameSource>,
    estimator: Arc<dyn OccupancyEstimator>,
    classifier: DensityClassifier,
    store: Arc<SnapshotStore>,
    metrics: Arc<Metrics>,
    egress: Option<EgressSender>,
    cycle_interval: Duration,
    last_level: Option<DensityLevel>,
}

impl ZoneWorker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        zone: ZoneId,
        name: impl Into<String>,
        source: Box<dyn FrameSource>,
        estimator: Arc<dyn OccupancyEstimator>,
        classifier: DensityClassifier,
        store: Arc<SnapshotStore>,
        metrics: Arc<Metrics>,
        cycle_interval: Duration,
    ) -> Self {
        Self {
            zone,
            name: name.into(),
            source,
            estimator,
            classifier,
            store,
            metrics,
            egress: None,
            cycle_interval,
            last_level: None,
        }
    }

    /// Also forward published samples to the JSONL egress
    pub fn with_egress(mut self, egress: EgressSender) -> Self {
        self.egress = Some(egress);
        self
    }

    /// Run until the shutdown signal flips; finishes the in-flight cycle
    /// first and releases the frame source on return.
    pub async fn run(mut self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        info!(
            zone = %self.zone,
            name = %self.name,
            source = %self.source.describe(),
            interval_ms = %self.cycle_interval.as_millis(),
            "zone_worker_started"
        );

        let mut timer = interval(self.cycle_interval);
        // Delay keeps the cadence contract when a cycle overruns: the next
        // estimation starts a full interval after the late one began.
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!(zone = %self.zone, "zone_worker_shutdown");
                        return;
                    }
                }
                _ = timer.tick() => {}
            }

            let cycle_start = Instant::now();
            match self.cycle().await {
                Ok((level, count)) => {
                    let cycle_us = cycle_start.elapsed().as_micros() as u64;
                    self.metrics.record_cycle(cycle_us);

                    if self.last_level != Some(level) {
                        info!(
                            zone = %self.zone,
                            level = %level,
                            count = %count,
                            cycle_us = %cycle_us,
                            "zone_density_changed"
                        );
                        self.last_level = Some(level);
                    } else {
                        tracing::trace!(
                            zone = %self.zone,
                            level = %level,
                            count = %count,
                            cycle_us = %cycle_us,
                            "zone_cycle"
                        );
                    }
                }
                Err(e) => {
                    warn!(zone = %self.zone, error = %e, "zone_cycle_failed");
                    self.metrics.record_estimation_failure();
                }
            }
        }
    }

    /// One estimation cycle: frame, estimate, classify, publish
    async fn cycle(&mut self) -> anyhow::Result<(DensityLevel, usize)> {
        let frame = match self.source.next_frame().await.context("frame read")? {
            Some(frame) => frame,
            None => {
                // End of stream restarts playback, it is not an error
                self.source.rewind().await.context("rewind after end of stream")?;
                debug!(zone = %self.zone, "source_rewound");
                self.source
                    .next_frame()
                    .await
                    .context("frame read after rewind")?
                    .context("source empty after rewind")?
            }
        };
        self.metrics.record_frame();

        let frame = Arc::new(frame);
        self.store.publish_frame(self.zone, frame.clone());

        let estimate = self.estimator.estimate(&frame).await.context("occupancy estimate")?;
        let classification = self.classifier.classify(estimate.count);

        let sample = DensitySample {
            level: classification.level,
            message: classification.message.to_string(),
            advisory: classification.advisory.map(str::to_string),
            subject_count: estimate.count,
            regions: estimate.regions,
            captured_at: Utc::now(),
        };

        if let Some(egress) = &self.egress {
            egress.send(DensityRecord::new(
                self.zone,
                &self.name,
                sample.level,
                sample.subject_count,
                &sample.message,
                sample.captured_at,
            ));
        }

        let (level, count) = (sample.level, sample.subject_count);
        self.store.publish(self.zone, sample);
        self.metrics.record_sample();

        Ok((level, count))
    }
}
