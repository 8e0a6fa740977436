//! Density egress - appends published samples to a JSONL file
//!
//! Workers hand records to a bounded channel so file IO never sits on the
//! estimation path; a single writer task appends one JSON object per line.

use crate::domain::types::{DensityLevel, ZoneId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// One published density reading, flattened for the JSONL log
#[derive(Debug, Clone, Serialize)]
pub struct DensityRecord {
    pub ts: DateTime<Utc>,
    pub zone: u32,
    pub name: String,
    pub level: &'static str,
    pub count: usize,
    pub message: String,
}

impl DensityRecord {
    pub fn new(
        zone: ZoneId,
        name: &str,
        level: DensityLevel,
        count: usize,
        message: &str,
        ts: DateTime<Utc>,
    ) -> Self {
        Self {
            ts,
            zone: zone.0,
            name: name.to_string(),
            level: level.as_str(),
            count,
            message: message.to_string(),
        }
    }
}

/// Non-blocking sender handle for workers
#[derive(Clone)]
pub struct EgressSender {
    tx: mpsc::Sender<DensityRecord>,
}

impl EgressSender {
    /// Enqueue a record; drops with a warning when the writer is backed up
    pub fn send(&self, record: DensityRecord) {
        if let Err(e) = self.tx.try_send(record) {
            warn!(error = %e, "egress_queue_full_dropping");
        }
    }
}

/// Create the egress channel
///
/// Returns the sender (cloned into workers) and the receiver (for the
/// writer task).
pub fn create_egress_channel(buffer: usize) -> (EgressSender, mpsc::Receiver<DensityRecord>) {
    let (tx, rx) = mpsc::channel(buffer);
    (EgressSender { tx }, rx)
}

/// Append-only JSONL writer for density records
pub struct DensityEgress {
    file_path: String,
}

impl DensityEgress {
    pub fn new(file_path: &str) -> Self {
        info!(file_path = %file_path, "egress_initialized");
        Self { file_path: file_path.to_string() }
    }

    /// Write a record to the egress file
    /// Returns true if successful, false otherwise
    pub fn write_record(&self, record: &DensityRecord) -> bool {
        let json = match serde_json::to_string(record) {
            Ok(json) => json,
            Err(e) => {
                error!(zone = %record.zone, error = %e, "egress_serialize_failed");
                return false;
            }
        };

        match self.append_line(&json) {
            Ok(()) => true,
            Err(e) => {
                error!(zone = %record.zone, error = %e, "egress_write_failed");
                false
            }
        }
    }

    fn append_line(&self, line: &str) -> std::io::Result<()> {
        let path = Path::new(&self.file_path);

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;

        writeln!(file, "{}", line)?;
        debug!(file = %self.file_path, bytes = %line.len(), "egress_written");

        Ok(())
    }

    /// Drain the channel until all senders are dropped
    pub async fn run(self, mut rx: mpsc::Receiver<DensityRecord>) {
        while let Some(record) = rx.recv().await {
            self.write_record(&record);
        }
        info!("egress_writer_stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn record(zone: u32, level: DensityLevel, count: usize) -> DensityRecord {
        DensityRecord::new(ZoneId(zone), "CAM_TEST", level, count, "msg", Utc::now())
    }

    #[test]
    fn test_write_record_is_valid_json_line() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("densities.jsonl");
        let egress = DensityEgress::new(file_path.to_str().unwrap());

        assert!(egress.write_record(&record(2, DensityLevel::High, 17)));

        let content = fs::read_to_string(&file_path).unwrap();
        assert!(content.ends_with('\n'));
        let parsed: serde_json::Value = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(parsed["zone"], 2);
        assert_eq!(parsed["level"], "high");
        assert_eq!(parsed["count"], 17);
    }

    #[test]
    fn test_append_mode_keeps_existing_lines() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("densities.jsonl");
        fs::write(&file_path, "{\"existing\":true}\n").unwrap();

        let egress = DensityEgress::new(file_path.to_str().unwrap());
        egress.write_record(&record(0, DensityLevel::Normal, 1));

        let content = fs::read_to_string(&file_path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("existing"));
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("logs").join("densities.jsonl");
        let egress = DensityEgress::new(nested.to_str().unwrap());

        assert!(egress.write_record(&record(1, DensityLevel::Normal, 3)));
        assert!(nested.exists());
    }

    #[tokio::test]
    async fn test_writer_drains_channel_until_close() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("densities.jsonl");
        let egress = DensityEgress::new(file_path.to_str().unwrap());

        let (sender, rx) = create_egress_channel(16);
        let writer = tokio::spawn(egress.run(rx));

        sender.send(record(0, DensityLevel::Normal, 4));
        sender.send(record(1, DensityLevel::High, 20));
        drop(sender);

        writer.await.unwrap();
        let content = fs::read_to_string(&file_path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }
}
