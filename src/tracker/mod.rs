//! Cross-frame identity linking.
//!
//! Each consecutive frame pair is a bipartite assignment problem between
//! active tracks and new detections. The tracker is inherently sequential
//! across frames: every frame's linking depends on the previous frame's
//! active track set.

pub mod assignment;
mod track;

use tracing::{debug, info};

use crate::config::TrackingConfig;
use crate::error::{Error, Result, Stage};
use crate::types::Detection;

pub use track::{link_decision, LinkDecision, Track, TrackId};

use assignment::{min_cost_assignment, FORBIDDEN};

/// Deterministic tie-break: of two equal-cost matches, prefer the smaller
/// spatial displacement. Small enough to never reorder genuinely
/// different costs.
const TIE_BREAK_EPSILON: f64 = 1e-12;

struct ActiveTrack {
    track: Track,
    /// Consecutive frames without a matched detection.
    missed: u32,
}

pub struct Tracker {
    config: TrackingConfig,
}

impl Tracker {
    pub fn new(config: TrackingConfig) -> Self {
        Self { config }
    }

    /// Combined match cost between a track's last detection and a new
    /// detection: squared positional offset plus a weighted squared
    /// angular difference, each normalized by its configured scale.
    fn cost(&self, last: &Detection, candidate: &Detection) -> f64 {
        let dist_sq = last.center.distance_sq(&candidate.center);
        let position_term = dist_sq / (self.config.position_scale * self.config.position_scale);
        let dtheta = last.angle_difference(candidate);
        let angle_term = self.config.angle_weight * (dtheta * dtheta)
            / (self.config.angle_scale * self.config.angle_scale);
        position_term + angle_term + TIE_BREAK_EPSILON * dist_sq
    }

    /// Partition per-frame detection sets into identity-preserving
    /// tracks.
    ///
    /// `per_frame[i]` must hold the detections of frame `i`. Every input
    /// detection ends up in exactly one track. An empty input or a frame
    /// with no feasible matches is not an error; tracks simply close and
    /// open as needed.
    pub fn track(&self, per_frame: Vec<Vec<Detection>>) -> Result<Vec<Track>> {
        for (frame_index, detections) in per_frame.iter().enumerate() {
            if let Some(bad) = detections.iter().find(|d| d.frame != frame_index) {
                return Err(Error::invalid_input(
                    Stage::Tracking,
                    Some(frame_index),
                    format!(
                        "detection carries frame index {} but sits in slot {}",
                        bad.frame, frame_index
                    ),
                ));
            }
        }

        let mut next_id: TrackId = 0;
        let mut active: Vec<ActiveTrack> = Vec::new();
        let mut closed: Vec<Track> = Vec::new();

        for (frame_index, detections) in per_frame.into_iter().enumerate() {
            let matches = self.link_frame(&active, &detections);

            // Matched detections extend their tracks. Slots are taken in
            // place so the leftovers are exactly the unmatched detections.
            let mut detections: Vec<Option<Detection>> = detections.into_iter().map(Some).collect();
            for (track_slot, detection_slot) in matches.iter().enumerate() {
                match detection_slot {
                    Some(d) => {
                        let det = detections[*d].take().expect("detection matched twice");
                        active[track_slot].track.append(det);
                        active[track_slot].missed = 0;
                    }
                    None => active[track_slot].missed += 1,
                }
            }

            // Unmatched detections open new tracks, in detection order.
            for det in detections.into_iter().flatten() {
                let track = Track::open(next_id, det);
                debug!(frame = frame_index, track = track.id, "opened new track");
                next_id += 1;
                active.push(ActiveTrack { track, missed: 0 });
            }

            // Dormant tracks past the gap tolerance are closed for good;
            // a structure reappearing later gets a fresh identity.
            let gap_tolerance = self.config.gap_tolerance;
            let mut still_active = Vec::with_capacity(active.len());
            for entry in active.drain(..) {
                if entry.missed > gap_tolerance {
                    debug!(
                        track = entry.track.id,
                        last_frame = entry.track.last_frame(),
                        "track closed after exceeding gap tolerance"
                    );
                    closed.push(entry.track);
                } else {
                    still_active.push(entry);
                }
            }
            active = still_active;
        }

        closed.extend(active.into_iter().map(|entry| entry.track));
        closed.sort_by_key(|t| t.id);

        info!(
            tracks = closed.len(),
            "tracking complete ({} with possible merged discs)",
            closed.iter().filter(|t| t.has_split_candidates()).count()
        );
        Ok(closed)
    }

    /// Solve one frame's assignment. Returns, per active track slot, the
    /// accepted detection slot (or None). Matches at or above the cost
    /// threshold are rejected even when the solver pairs them.
    fn link_frame(&self, active: &[ActiveTrack], detections: &[Detection]) -> Vec<Option<usize>> {
        if active.is_empty() || detections.is_empty() {
            return vec![None; active.len()];
        }

        let cost: Vec<Vec<f64>> = active
            .iter()
            .map(|entry| {
                let last = entry.track.last();
                detections
                    .iter()
                    .map(|det| {
                        let c = self.cost(last, det);
                        if c < self.config.cost_threshold {
                            c
                        } else {
                            FORBIDDEN
                        }
                    })
                    .collect()
            })
            .collect();

        min_cost_assignment(&cost)
            .into_iter()
            .enumerate()
            .map(|(i, assigned)| {
                let j = assigned?;
                match link_decision(cost[i][j], self.config.cost_threshold) {
                    LinkDecision::Append => Some(j),
                    LinkDecision::StartNew => None,
                }
            })
            .collect()
    }
}
