//! Synthetic camera and stand-in estimator for the demo binary
//!
//! Real deployments decode camera streams and run a detection model; both
//! are external collaborators. For local runs and tests this module renders
//! frames of bright dots drifting across a dark background and counts them
//! back with a flood-fill blob pass. The dot count per zone is configured,
//! so a zone can be made to sit above or below the density threshold.

use crate::domain::types::{BoundingBox, Estimate, Frame};
use crate::io::camera::FrameSource;
use crate::services::estimator::OccupancyEstimator;
use async_trait::async_trait;
use bytes::Bytes;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const DOT_RADIUS: i64 = 3;
const DOT_VALUE: u8 = 255;

struct Dot {
    x: f64,
    y: f64,
    vx: f64,
    vy: f64,
}

/// Endless frame source of seeded moving dots
///
/// Deterministic for a given seed. Never reports end of stream; `rewind`
/// is a no-op kept for the `FrameSource` contract.
pub struct SyntheticCamera {
    width: u32,
    height: u32,
    dots: Vec<Dot>,
    label: String,
}

impl SyntheticCamera {
    pub fn new(width: u32, height: u32, subjects: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let dots = (0..subjects)
            .map(|_| Dot {
                x: rng.gen_range(0.0..width as f64),
                y: rng.gen_range(0.0..height as f64),
                vx: rng.gen_range(-2.0..2.0),
                vy: rng.gen_range(-2.0..2.0),
            })
            .collect();
        Self { width, height, dots, label: format!("synthetic:{subjects}") }
    }

    fn render(&self) -> Frame {
        let mut pixels = vec![0u8; (self.width * self.height) as usize];
        for dot in &self.dots {
            let (cx, cy) = (dot.x as i64, dot.y as i64);
            for dy in -DOT_RADIUS..=DOT_RADIUS {
                for dx in -DOT_RADIUS..=DOT_RADIUS {
                    let (x, y) = (cx + dx, cy + dy);
                    if x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height {
                        pixels[(y as u32 * self.width + x as u32) as usize] = DOT_VALUE;
                    }
                }
            }
        }
        Frame::new(self.width, self.height, Bytes::from(pixels))
    }

    fn step(&mut self) {
        let (w, h) = (self.width as f64, self.height as f64);
        for dot in &mut self.dots {
            dot.x += dot.vx;
            dot.y += dot.vy;
            if dot.x <= 0.0 || dot.x >= w - 1.0 {
                dot.vx = -dot.vx;
                dot.x = dot.x.clamp(0.0, w - 1.0);
            }
            if dot.y <= 0.0 || dot.y >= h - 1.0 {
                dot.vy = -dot.vy;
                dot.y = dot.y.clamp(0.0, h - 1.0);
            }
        }
    }
}

#[async_trait]
impl FrameSource for SyntheticCamera {
    async fn next_frame(&mut self) -> anyhow::Result<Option<Frame>> {
        let frame = self.render();
        self.step();
        Ok(Some(frame))
    }

    async fn rewind(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

/// Counts bright blobs in a frame via iterative flood fill
///
/// Overlapping dots merge into one blob, which is acceptable for a
/// stand-in: the production estimator is an external model.
pub struct DotEstimator {
    brightness_threshold: u8,
}

impl DotEstimator {
    pub fn new(brightness_threshold: u8) -> Self {
        Self { brightness_threshold }
    }

    fn blobs(&self, frame: &Frame) -> Vec<BoundingBox> {
        let (w, h) = (frame.width, frame.height);
        let mut visited = vec![false; (w * h) as usize];
        let mut regions = Vec::new();
        let mut stack = Vec::new();

        for start_y in 0..h {
            for start_x in 0..w {
                let idx = (start_y * w + start_x) as usize;
                if visited[idx] || frame.get(start_x, start_y) < self.brightness_threshold {
                    continue;
                }

                // Flood this blob, tracking its bounds
                let (mut min_x, mut min_y, mut max_x, mut max_y) =
                    (start_x, start_y, start_x, start_y);
                visited[idx] = true;
                stack.push((start_x, start_y));

                while let Some((x, y)) = stack.pop() {
                    min_x = min_x.min(x);
                    min_y = min_y.min(y);
                    max_x = max_x.max(x);
                    max_y = max_y.max(y);

                    let mut neighbors = [(0u32, 0u32); 4];
                    let mut n = 0;
                    if x > 0 {
                        neighbors[n] = (x - 1, y);
                        n += 1;
                    }
                    if x + 1 < w {
                        neighbors[n] = (x + 1, y);
                        n += 1;
                    }
                    if y > 0 {
                        neighbors[n] = (x, y - 1);
                        n += 1;
                    }
                    if y + 1 < h {
                        neighbors[n] = (x, y + 1);
                        n += 1;
                    }

                    for &(nx, ny) in &neighbors[..n] {
                        let nidx = (ny * w + nx) as usize;
                        if !visited[nidx] && frame.get(nx, ny) >= self.brightness_threshold {
                            visited[nidx] = true;
                            stack.push((nx, ny));
                        }
                    }
                }

                regions.push(BoundingBox {
                    x: min_x,
                    y: min_y,
                    width: max_x - min_x + 1,
                    height: max_y - min_y + 1,
                });
            }
        }

        regions
    }
}

impl Default for DotEstimator {
    fn default() -> Self {
        Self::new(128)
    }
}

#[async_trait]
impl OccupancyEstimator for DotEstimator {
    async fn estimate(&self, frame: &Frame) -> anyhow::Result<Estimate> {
        let regions = self.blobs(frame);
        Ok(Estimate { count: regions.len(), regions })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_camera_is_deterministic_per_seed() {
        let mut a = SyntheticCamera::new(64, 64, 5, 42);
        let mut b = SyntheticCamera::new(64, 64, 5, 42);

        let fa = a.next_frame().await.unwrap().unwrap();
        let fb = b.next_frame().await.unwrap().unwrap();
        assert_eq!(fa.pixels, fb.pixels);
    }

    #[tokio::test]
    async fn test_camera_never_ends() {
        let mut camera = SyntheticCamera::new(32, 32, 2, 1);
        for _ in 0..10 {
            assert!(camera.next_frame().await.unwrap().is_some());
        }
    }

    #[tokio::test]
    async fn test_estimator_counts_separated_dots() {
        // Two dots far apart on a 64x64 frame
        let mut pixels = vec![0u8; 64 * 64];
        for (cx, cy) in [(10u32, 10u32), (50, 50)] {
            for dy in 0..4u32 {
                for dx in 0..4u32 {
                    pixels[((cy + dy) * 64 + cx + dx) as usize] = 255;
                }
            }
        }
        let frame = Frame::new(64, 64, Bytes::from(pixels));

        let estimate = DotEstimator::default().estimate(&frame).await.unwrap();
        assert_eq!(estimate.count, 2);
        assert_eq!(estimate.regions.len(), 2);
        assert_eq!(estimate.regions[0].width, 4);
        assert_eq!(estimate.regions[0].height, 4);
    }

    #[tokio::test]
    async fn test_estimator_empty_frame() {
        let frame = Frame::new(16, 16, Bytes::from(vec![0u8; 256]));
        let estimate = DotEstimator::default().estimate(&frame).await.unwrap();
        assert_eq!(estimate.count, 0);
        assert!(estimate.regions.is_empty());
    }

    #[tokio::test]
    async fn test_end_to_end_count_matches_subjects() {
        // Wide spacing is not guaranteed, so allow merges but never zero
        // and never more blobs than dots.
        let mut camera = SyntheticCamera::new(320, 240, 8, 7);
        let frame = camera.next_frame().await.unwrap().unwrap();
        let estimate = DotEstimator::default().estimate(&frame).await.unwrap();
        assert!(estimate.count >= 1);
        assert!(estimate.count <= 8);
    }
}
