//! Identity-preserving detection time series.

use serde::{Deserialize, Serialize};

use crate::types::Detection;

/// Unique track identifier, assigned in creation order.
pub type TrackId = u64;

/// The detections of one physical z-disc across frames.
///
/// Frame indices are strictly increasing; gaps up to the tracker's
/// configured tolerance are permitted. A track's identity is stable for
/// its whole lifetime — two tracks are never merged after the fact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    detections: Vec<Detection>,
}

impl Track {
    /// Open a new track from its first detection.
    pub fn open(id: TrackId, first: Detection) -> Self {
        Self {
            id,
            detections: vec![first],
        }
    }

    /// Append the next observation. The tracker only appends detections
    /// from later frames; the ordering invariant is checked in debug
    /// builds.
    pub fn append(&mut self, detection: Detection) {
        debug_assert!(
            detection.frame > self.last().frame,
            "track {} frame order violated: {} after {}",
            self.id,
            detection.frame,
            self.last().frame
        );
        self.detections.push(detection);
    }

    pub fn detections(&self) -> &[Detection] {
        &self.detections
    }

    pub fn first(&self) -> &Detection {
        &self.detections[0]
    }

    pub fn last(&self) -> &Detection {
        self.detections.last().expect("track is never empty")
    }

    pub fn first_frame(&self) -> usize {
        self.first().frame
    }

    pub fn last_frame(&self) -> usize {
        self.last().frame
    }

    /// Number of frames spanned, counting gaps.
    pub fn span(&self) -> usize {
        self.last_frame() - self.first_frame() + 1
    }

    /// Number of frames actually observed.
    pub fn observed(&self) -> usize {
        self.detections.len()
    }

    /// Detection at a specific frame, if the structure was observed then.
    pub fn at_frame(&self, frame: usize) -> Option<&Detection> {
        self.detections
            .binary_search_by_key(&frame, |d| d.frame)
            .ok()
            .map(|i| &self.detections[i])
    }

    /// Fraction of the spanned frames that were observed, in (0, 1].
    pub fn coverage(&self) -> f64 {
        self.observed() as f64 / self.span() as f64
    }

    /// Mean detection confidence.
    pub fn mean_confidence(&self) -> f64 {
        self.detections.iter().map(|d| d.confidence).sum::<f64>() / self.observed() as f64
    }

    /// Whether any member detection was flagged as a possible merged disc.
    pub fn has_split_candidates(&self) -> bool {
        self.detections.iter().any(|d| d.split_candidate)
    }
}

/// Outcome of the append-or-create decision for one candidate match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkDecision {
    /// Extend the existing track with the new detection.
    Append,
    /// Reject the match; the detection opens a new track instead. Two
    /// distinct physical structures must never be silently merged, so
    /// anything at or above the rejection threshold starts fresh.
    StartNew,
}

/// Decide whether a candidate (track, detection) match is trustworthy.
/// Isolated from the assignment machinery so the policy is testable on
/// its own.
pub fn link_decision(cost: f64, cost_threshold: f64) -> LinkDecision {
    if cost.is_finite() && cost < cost_threshold {
        LinkDecision::Append
    } else {
        LinkDecision::StartNew
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Point;

    fn det(frame: usize, x: f64) -> Detection {
        Detection {
            frame,
            timestamp: frame as f64 / 30.0,
            center: Point::new(x, 10.0),
            angle: 0.0,
            length: 6.0,
            width: 2.0,
            confidence: 0.9,
            split_candidate: false,
        }
    }

    #[test]
    fn span_counts_gaps() {
        let mut track = Track::open(1, det(2, 0.0));
        track.append(det(3, 1.0));
        track.append(det(6, 2.0));
        assert_eq!(track.span(), 5);
        assert_eq!(track.observed(), 3);
        assert!((track.coverage() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn at_frame_respects_gaps() {
        let mut track = Track::open(1, det(0, 0.0));
        track.append(det(2, 1.0));
        assert!(track.at_frame(0).is_some());
        assert!(track.at_frame(1).is_none());
        assert!(track.at_frame(2).is_some());
    }

    #[test]
    fn link_decision_threshold() {
        assert_eq!(link_decision(0.5, 1.0), LinkDecision::Append);
        assert_eq!(link_decision(1.0, 1.0), LinkDecision::StartNew);
        assert_eq!(link_decision(f64::INFINITY, 1.0), LinkDecision::StartNew);
        assert_eq!(link_decision(f64::NAN, 1.0), LinkDecision::StartNew);
    }
}
