//! Graph assembly from tracked z-discs.
//!
//! One node per track, then sarcomere inference: every ascending pair of
//! tracks is tested for per-frame adjacency, and contiguous adjacent runs
//! long enough to rule out coincidental proximity become sarcomere nodes.
//! Pair order is canonical (ascending track-id pairs), so the same track
//! set always produces the same graph.

use tracing::{debug, info};

use crate::config::GraphConfig;
use crate::tracker::Track;
use crate::types::{fold_axial_difference, Detection};

use super::{EdgeKind, FrameWindow, Graph, GraphEdge, GraphNode, NodeId, NodeKind, NodeSample};

pub struct GraphBuilder {
    config: GraphConfig,
}

impl GraphBuilder {
    pub fn new(config: GraphConfig) -> Self {
        Self { config }
    }

    /// Assemble the spatial-temporal graph for a set of tracks.
    pub fn build(&self, tracks: &[Track]) -> Graph {
        let mut ordered: Vec<&Track> = tracks.iter().collect();
        ordered.sort_by_key(|t| t.id);

        let mut nodes: Vec<GraphNode> = Vec::with_capacity(ordered.len());
        let mut edges: Vec<GraphEdge> = Vec::new();

        for track in &ordered {
            let id = NodeId(nodes.len());
            let samples = track
                .detections()
                .iter()
                .map(|d| NodeSample {
                    frame: d.frame,
                    timestamp: d.timestamp,
                    position: d.center,
                    length: d.length,
                })
                .collect();
            nodes.push(GraphNode {
                id,
                kind: NodeKind::ZDisc { track: track.id },
                samples,
            });
            edges.push(GraphEdge {
                kind: EdgeKind::Temporal,
                a: id,
                b: id,
                window: FrameWindow::new(track.first_frame(), track.last_frame()),
            });
        }

        // Sarcomere inference over canonical ascending pairs.
        let disc_count = nodes.len();
        for i in 0..disc_count {
            for j in (i + 1)..disc_count {
                let runs = self.adjacency_runs(ordered[i], ordered[j]);
                for run in runs {
                    if run.len() < self.config.min_sarcomere_frames {
                        continue;
                    }
                    let window = FrameWindow::new(run[0], *run.last().expect("non-empty run"));
                    let samples: Vec<NodeSample> = run
                        .iter()
                        .map(|&frame| {
                            let a = ordered[i].at_frame(frame).expect("frame in run");
                            let b = ordered[j].at_frame(frame).expect("frame in run");
                            NodeSample {
                                frame,
                                timestamp: a.timestamp,
                                position: a.center.midpoint(&b.center),
                                length: a.center.distance(&b.center),
                            }
                        })
                        .collect();
                    let sarc_id = NodeId(nodes.len());
                    nodes.push(GraphNode {
                        id: sarc_id,
                        kind: NodeKind::Sarcomere {
                            left: NodeId(i),
                            right: NodeId(j),
                        },
                        samples,
                    });
                    for disc in [NodeId(i), NodeId(j)] {
                        edges.push(GraphEdge {
                            kind: EdgeKind::Spatial,
                            a: sarc_id,
                            b: disc,
                            window,
                        });
                    }
                    debug!(
                        left = ordered[i].id,
                        right = ordered[j].id,
                        start = window.start,
                        end = window.end,
                        "sarcomere materialized"
                    );
                }
            }
        }

        info!(
            zdiscs = disc_count,
            sarcomeres = nodes.len() - disc_count,
            edges = edges.len(),
            "graph assembled"
        );
        Graph::from_parts(nodes, edges)
    }

    /// Contiguous frame runs in which the two tracks are spatially
    /// adjacent. Frames where either track is unobserved break a run.
    fn adjacency_runs(&self, a: &Track, b: &Track) -> Vec<Vec<usize>> {
        let start = a.first_frame().max(b.first_frame());
        let end = a.last_frame().min(b.last_frame());
        let mut runs = Vec::new();
        let mut current: Vec<usize> = Vec::new();
        if start > end {
            return runs;
        }
        for frame in start..=end {
            let adjacent = match (a.at_frame(frame), b.at_frame(frame)) {
                (Some(da), Some(db)) => self.adjacent(da, db),
                _ => false,
            };
            if adjacent {
                current.push(frame);
            } else if !current.is_empty() {
                runs.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            runs.push(current);
        }
        runs
    }

    /// Within-frame adjacency test: close enough, near-parallel discs,
    /// and the connecting vector roughly perpendicular to them (the
    /// sarcomere axis runs across its bounding z-discs).
    fn adjacent(&self, a: &Detection, b: &Detection) -> bool {
        let distance = a.center.distance(&b.center);
        if distance > self.config.max_link_distance || distance <= f64::EPSILON {
            return false;
        }
        if a.angle_difference(b) > self.config.max_angle_difference {
            return false;
        }
        // Angle of the connecting vector, as an axial orientation.
        let mut link_angle = (b.center.y - a.center.y).atan2(b.center.x - a.center.x);
        if link_angle < 0.0 {
            link_angle += std::f64::consts::PI;
        }
        let mean_disc_angle = mean_axial(a.angle, b.angle);
        let normal = (mean_disc_angle + std::f64::consts::FRAC_PI_2) % std::f64::consts::PI;
        fold_axial_difference(link_angle, normal) <= self.config.max_angle_difference
    }
}

/// Mean of two axial angles (wrapping at pi), in [0, pi).
fn mean_axial(a: f64, b: f64) -> f64 {
    // Double-angle trick: axial orientations double to plain angles.
    let (sa, ca) = (2.0 * a).sin_cos();
    let (sb, cb) = (2.0 * b).sin_cos();
    let mut mean = 0.5 * (sa + sb).atan2(ca + cb);
    if mean < 0.0 {
        mean += std::f64::consts::PI;
    }
    mean
}
