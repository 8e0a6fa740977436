//! Frame acquisition interfaces
//!
//! A `FrameSource` hands the estimation worker one raster frame at a time.
//! End of stream is not an error: the worker rewinds and keeps going, the
//! same way a looping video file would. Opening a source is the only
//! fatal-at-construction step; after that every failure is per-cycle.

use crate::domain::types::Frame;
use async_trait::async_trait;

/// Per-zone source of raster frames
#[async_trait]
pub trait FrameSource: Send {
    /// Next frame, or `None` at end of stream
    async fn next_frame(&mut self) -> anyhow::Result<Option<Frame>>;

    /// Restart from the beginning of the stream
    async fn rewind(&mut self) -> anyhow::Result<()>;

    /// Human-readable source description for logs
    fn describe(&self) -> String;
}

/// Replays a fixed sequence of frames, then reports end of stream
///
/// Stands in for a recorded clip: the worker's rewind-on-EOS path brings it
/// back to frame 0, so playback loops forever. Used by tests and offline
/// replay.
pub struct ReplaySource {
    frames: Vec<Frame>,
    position: usize,
    label: String,
}

impl ReplaySource {
    pub fn new(frames: Vec<Frame>, label: impl Into<String>) -> anyhow::Result<Self> {
        let label = label.into();
        anyhow::ensure!(!frames.is_empty(), "replay source {label} has no frames");
        Ok(Self { frames, position: 0, label })
    }
}

#[async_trait]
impl FrameSource for ReplaySource {
    async fn next_frame(&mut self) -> anyhow::Result<Option<Frame>> {
        match self.frames.get(self.position) {
            Some(frame) => {
                self.position += 1;
                Ok(Some(frame.clone()))
            }
            None => Ok(None),
        }
    }

    async fn rewind(&mut self) -> anyhow::Result<()> {
        self.position = 0;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("replay:{} ({} frames)", self.label, self.frames.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn frame(value: u8) -> Frame {
        Frame::new(2, 2, Bytes::from(vec![value; 4]))
    }

    #[tokio::test]
    async fn test_replay_reaches_end_then_rewinds() {
        let mut source = ReplaySource::new(vec![frame(1), frame(2)], "clip").unwrap();

        assert_eq!(source.next_frame().await.unwrap().unwrap().get(0, 0), 1);
        assert_eq!(source.next_frame().await.unwrap().unwrap().get(0, 0), 2);
        assert!(source.next_frame().await.unwrap().is_none());

        source.rewind().await.unwrap();
        assert_eq!(source.next_frame().await.unwrap().unwrap().get(0, 0), 1);
    }

    #[test]
    fn test_empty_replay_rejected_at_construction() {
        assert!(ReplaySource::new(Vec::new(), "empty").is_err());
    }
}
