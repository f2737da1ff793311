//! The spatial-temporal z-disc/sarcomere graph.
//!
//! Nodes wrap one track (a z-disc) or one inferred sarcomere pairing.
//! Edges come in two disjoint kinds: `Spatial` adjacency within frames
//! and `Temporal` identity across frames. Every edge carries an
//! inclusive per-frame validity window.

mod builder;

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result, Stage};
use crate::tracker::TrackId;
use crate::types::Point;

pub use builder::GraphBuilder;

/// Index of a node within its graph. Stable for the graph's lifetime.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct NodeId(pub usize);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Inclusive frame range in which a node or edge is valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameWindow {
    pub start: usize,
    pub end: usize,
}

impl FrameWindow {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    pub fn contains(&self, frame: usize) -> bool {
        (self.start..=self.end).contains(&frame)
    }

    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        false // windows are inclusive and constructed non-empty
    }

    /// Whether `self` lies entirely within `other`.
    pub fn within(&self, other: &FrameWindow) -> bool {
        other.start <= self.start && self.end <= other.end
    }
}

/// What a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    /// One tracked z-disc.
    ZDisc { track: TrackId },
    /// The contractile unit between two adjacent z-discs.
    Sarcomere { left: NodeId, right: NodeId },
}

/// One per-frame state sample of a node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeSample {
    pub frame: usize,
    pub timestamp: f64,
    /// Disc center, or sarcomere midpoint.
    pub position: Point,
    /// Disc extent along its principal axis, or z-disc-to-z-disc spacing
    /// for a sarcomere.
    pub length: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: NodeId,
    pub kind: NodeKind,
    /// Per-frame attributes, ascending by frame.
    pub samples: Vec<NodeSample>,
}

impl GraphNode {
    /// Frames over which this node exists (inclusive, gaps possible for
    /// z-discs with tracking gaps).
    pub fn lifespan(&self) -> FrameWindow {
        FrameWindow::new(
            self.samples.first().map(|s| s.frame).unwrap_or(0),
            self.samples.last().map(|s| s.frame).unwrap_or(0),
        )
    }

    pub fn sample_at(&self, frame: usize) -> Option<&NodeSample> {
        self.samples
            .binary_search_by_key(&frame, |s| s.frame)
            .ok()
            .map(|i| &self.samples[i])
    }

    /// Mean position over the node's samples.
    pub fn mean_position(&self) -> Point {
        let n = self.samples.len().max(1) as f64;
        let (sx, sy) = self
            .samples
            .iter()
            .fold((0.0, 0.0), |(sx, sy), s| (sx + s.position.x, sy + s.position.y));
        Point::new(sx / n, sy / n)
    }
}

/// Edge kinds are disjoint by construction, which keeps the invariants
/// on each kind simple to check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeKind {
    /// Within-frame adjacency: sarcomere node to one of its z-discs.
    Spatial,
    /// Same physical structure across frames. Connects a node to itself
    /// over its lifespan; exists for query convenience.
    Temporal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub kind: EdgeKind,
    pub a: NodeId,
    pub b: NodeId,
    pub window: FrameWindow,
}

/// The assembled spatial-temporal graph. Immutable after construction;
/// the builder owns it exclusively until hand-off.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Graph {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
}

impl Graph {
    pub(crate) fn from_parts(nodes: Vec<GraphNode>, edges: Vec<GraphEdge>) -> Self {
        Self { nodes, edges }
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    /// Look up a node, failing with `NotFound` for unknown ids.
    pub fn node(&self, id: NodeId) -> Result<&GraphNode> {
        self.nodes
            .get(id.0)
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    pub fn zdisc_nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes
            .iter()
            .filter(|n| matches!(n.kind, NodeKind::ZDisc { .. }))
    }

    pub fn sarcomere_nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes
            .iter()
            .filter(|n| matches!(n.kind, NodeKind::Sarcomere { .. }))
    }

    /// The z-disc node wrapping a given track.
    pub fn zdisc_for_track(&self, track: TrackId) -> Option<&GraphNode> {
        self.zdisc_nodes()
            .find(|n| matches!(n.kind, NodeKind::ZDisc { track: t } if t == track))
    }

    /// Spatial neighbors of a node (both edge directions).
    pub fn spatial_neighbors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.edges.iter().filter_map(move |e| {
            if e.kind != EdgeKind::Spatial {
                return None;
            }
            if e.a == id {
                Some(e.b)
            } else if e.b == id {
                Some(e.a)
            } else {
                None
            }
        })
    }

    /// Check the structural invariants. Used by tests and available to
    /// callers that deserialize graphs from outside.
    ///
    /// - sarcomere nodes reference exactly two distinct z-disc nodes and
    ///   both discs are sampled in every frame of the sarcomere's window;
    /// - edge validity windows lie within both endpoints' lifespans;
    /// - node samples ascend strictly by frame.
    pub fn validate(&self) -> Result<()> {
        for node in &self.nodes {
            if !node
                .samples
                .windows(2)
                .all(|w| w[0].frame < w[1].frame)
            {
                return Err(Error::invalid_input(
                    Stage::GraphBuild,
                    None,
                    format!("node {} samples out of frame order", node.id),
                ));
            }
            if let NodeKind::Sarcomere { left, right } = node.kind {
                if left == right {
                    return Err(Error::invalid_input(
                        Stage::GraphBuild,
                        None,
                        format!("sarcomere {} references one disc twice", node.id),
                    ));
                }
                for disc_id in [left, right] {
                    let disc = self.node(disc_id)?;
                    if !matches!(disc.kind, NodeKind::ZDisc { .. }) {
                        return Err(Error::invalid_input(
                            Stage::GraphBuild,
                            None,
                            format!("sarcomere {} references non-disc {}", node.id, disc_id),
                        ));
                    }
                    for sample in &node.samples {
                        if disc.sample_at(sample.frame).is_none() {
                            return Err(Error::invalid_input(
                                Stage::GraphBuild,
                                None,
                                format!(
                                    "disc {} missing frame {} of sarcomere {}",
                                    disc_id, sample.frame, node.id
                                ),
                            ));
                        }
                    }
                }
            }
        }
        for edge in &self.edges {
            let a = self.node(edge.a)?;
            let b = self.node(edge.b)?;
            if !edge.window.within(&a.lifespan()) || !edge.window.within(&b.lifespan()) {
                return Err(Error::invalid_input(
                    Stage::GraphBuild,
                    None,
                    format!("edge {}-{} window outside endpoint lifespan", edge.a, edge.b),
                ));
            }
        }
        Ok(())
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize from a JSON string, validating invariants.
    pub fn from_json(json: &str) -> Result<Self> {
        let graph: Graph = serde_json::from_str(json)?;
        graph.validate()?;
        Ok(graph)
    }

    /// Write the graph as JSON to a file.
    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer(std::io::BufWriter::new(file), self)?;
        Ok(())
    }

    /// Read a graph back from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }
}
