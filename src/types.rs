//! Core data types shared by every pipeline stage.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, Stage};

/// A 2D point in sub-pixel frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_sq(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    pub fn distance(&self, other: &Point) -> f64 {
        self.distance_sq(other).sqrt()
    }

    pub fn midpoint(&self, other: &Point) -> Point {
        Point::new((self.x + other.x) * 0.5, (self.y + other.y) * 0.5)
    }
}

/// One single-channel intensity frame of the input video.
///
/// Frames are consumed read-only by the detector and discarded afterwards.
#[derive(Debug, Clone)]
pub struct Frame {
    index: usize,
    timestamp: f64,
    pixels: Array2<f64>,
}

impl Frame {
    /// Wrap an intensity grid. Rejects empty grids; a zero-sized frame is
    /// malformed input, not a degenerate result.
    pub fn new(index: usize, timestamp: f64, pixels: Array2<f64>) -> Result<Self> {
        let (h, w) = pixels.dim();
        if h == 0 || w == 0 {
            return Err(Error::invalid_input(
                Stage::Detection,
                Some(index),
                format!("empty frame ({h}x{w})"),
            ));
        }
        Ok(Self {
            index,
            timestamp,
            pixels,
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Timestamp in seconds from the start of the recording.
    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn pixels(&self) -> &Array2<f64> {
        &self.pixels
    }

    pub fn height(&self) -> usize {
        self.pixels.dim().0
    }

    pub fn width(&self) -> usize {
        self.pixels.dim().1
    }
}

/// A candidate z-disc found in one frame. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Index of the owning frame.
    pub frame: usize,
    /// Timestamp of the owning frame, seconds.
    pub timestamp: f64,
    /// Intensity-weighted centroid, sub-pixel.
    pub center: Point,
    /// Principal-axis orientation, radians in [0, pi).
    pub angle: f64,
    /// Extent along the principal axis, pixels.
    pub length: f64,
    /// Extent across the principal axis, pixels.
    pub width: f64,
    /// Detection confidence in [0, 1].
    pub confidence: f64,
    /// Set when the connected component is large enough to plausibly be
    /// two merged z-discs. Downstream sarcomere inference depends on disc
    /// count parity, so merged discs are flagged rather than silently
    /// treated as one structure.
    pub split_candidate: bool,
}

impl Detection {
    /// Absolute angular difference between two disc orientations, folded
    /// to [0, pi/2]. Orientations are axial (theta and theta + pi describe
    /// the same disc), so the difference wraps at pi.
    pub fn angle_difference(&self, other: &Detection) -> f64 {
        fold_axial_difference(self.angle, other.angle)
    }
}

/// Fold the difference between two axial angles into [0, pi/2].
pub fn fold_axial_difference(a: f64, b: f64) -> f64 {
    let mut d = (a - b).abs() % std::f64::consts::PI;
    if d > std::f64::consts::FRAC_PI_2 {
        d = std::f64::consts::PI - d;
    }
    d
}

/// Ordered source of frames, implemented by the external video-decoding
/// collaborator. `None` marks the end of the sequence.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

/// FrameSource over an in-memory frame list. Useful for tests and callers
/// that decode the whole video up front.
pub struct VecFrameSource {
    frames: std::vec::IntoIter<Frame>,
}

impl VecFrameSource {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self {
            frames: frames.into_iter(),
        }
    }
}

impl FrameSource for VecFrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        Ok(self.frames.next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn empty_frame_rejected() {
        let result = Frame::new(0, 0.0, Array2::zeros((0, 10)));
        assert!(matches!(result, Err(Error::InvalidInput { .. })));
    }

    #[test]
    fn frame_dimensions() {
        let frame = Frame::new(3, 0.1, Array2::zeros((4, 7))).unwrap();
        assert_eq!(frame.height(), 4);
        assert_eq!(frame.width(), 7);
        assert_eq!(frame.index(), 3);
    }

    #[test]
    fn axial_difference_folds() {
        assert!((fold_axial_difference(0.0, PI - 0.1) - 0.1).abs() < 1e-9);
        assert!((fold_axial_difference(0.0, FRAC_PI_2) - FRAC_PI_2).abs() < 1e-9);
        assert!(fold_axial_difference(1.0, 1.0).abs() < 1e-12);
    }

    #[test]
    fn vec_frame_source_yields_in_order() {
        let frames = vec![
            Frame::new(0, 0.0, Array2::zeros((2, 2))).unwrap(),
            Frame::new(1, 0.033, Array2::zeros((2, 2))).unwrap(),
        ];
        let mut source = VecFrameSource::new(frames);
        assert_eq!(source.next_frame().unwrap().unwrap().index(), 0);
        assert_eq!(source.next_frame().unwrap().unwrap().index(), 1);
        assert!(source.next_frame().unwrap().is_none());
    }
}
