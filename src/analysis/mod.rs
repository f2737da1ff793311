//! Derived metrics over the assembled graph.
//!
//! Read-only: the analyzer never mutates the graph it is handed.
//! Undefined quantities (too few valid samples) are reported as NaN, not
//! raised as errors.

use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::graph::{EdgeKind, Graph, GraphNode, NodeId, NodeKind};

/// Contraction summary for one sarcomere node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SarcomereMetrics {
    pub node: NodeId,
    /// Length per sampled frame, NaN where undefined.
    pub length_series: Vec<f64>,
    /// Resting (maximum observed) length. NaN if undefined.
    pub resting_length: f64,
    /// Minimum observed length. NaN if undefined.
    pub min_length: f64,
    /// Fractional peak shortening, (resting - min) / resting.
    pub peak_shortening: f64,
    /// Seconds from the start of the validity window to peak contraction.
    pub time_to_peak: f64,
}

impl SarcomereMetrics {
    /// Whether the contraction metrics are defined (at least two finite
    /// length samples).
    pub fn is_defined(&self) -> bool {
        self.peak_shortening.is_finite()
    }
}

/// Whole-graph summary statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkStats {
    pub zdisc_count: usize,
    pub sarcomere_count: usize,
    pub spatial_edge_count: usize,
    pub myofibril_count: usize,
    /// Mean of the per-sarcomere mean lengths, NaN when no sarcomere has
    /// a defined length.
    pub mean_sarcomere_length: f64,
}

/// One myofibril: a maximal connected chain of sarcomeres and the
/// z-discs bounding them. Member ids are sorted ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Myofibril {
    pub zdiscs: Vec<NodeId>,
    pub sarcomeres: Vec<NodeId>,
}

/// Full analysis report, serializable as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metrics {
    pub sarcomeres: Vec<SarcomereMetrics>,
    pub myofibrils: Vec<Myofibril>,
    pub network: NetworkStats,
}

/// Shortest network path between two nodes over spatial edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkDistance {
    /// Number of spatial edges traversed.
    pub hops: usize,
    /// Sum of mean center-to-center distances along the path.
    pub total_distance: f64,
}

/// Dijkstra queue key. Path costs are finite and non-negative, so
/// `total_cmp` gives the order we need.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PathCost(f64);

impl Eq for PathCost {}

impl PartialOrd for PathCost {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PathCost {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

pub struct Analyzer;

impl Analyzer {
    pub fn new() -> Self {
        Self
    }

    /// Compute the full metrics report for a graph.
    pub fn analyze(&self, graph: &Graph) -> Metrics {
        let sarcomeres: Vec<SarcomereMetrics> = graph
            .sarcomere_nodes()
            .map(contraction_metrics)
            .collect();

        let undefined = sarcomeres.iter().filter(|m| !m.is_defined()).count();
        if undefined > 0 {
            warn!(
                undefined,
                total = sarcomeres.len(),
                "sarcomeres with undefined contraction metrics"
            );
        }

        let myofibrils = self.myofibrils(graph);

        let mean_lengths: Vec<f64> = sarcomeres
            .iter()
            .map(|m| mean_finite(&m.length_series))
            .filter(|v| v.is_finite())
            .collect();
        let network = NetworkStats {
            zdisc_count: graph.zdisc_nodes().count(),
            sarcomere_count: sarcomeres.len(),
            spatial_edge_count: graph
                .edges()
                .iter()
                .filter(|e| e.kind == EdgeKind::Spatial)
                .count(),
            myofibril_count: myofibrils.len(),
            mean_sarcomere_length: if mean_lengths.is_empty() {
                f64::NAN
            } else {
                mean_lengths.iter().sum::<f64>() / mean_lengths.len() as f64
            },
        };

        info!(
            sarcomeres = network.sarcomere_count,
            zdiscs = network.zdisc_count,
            myofibrils = network.myofibril_count,
            "analysis complete"
        );
        Metrics {
            sarcomeres,
            myofibrils,
            network,
        }
    }

    /// Group the graph into myofibrils: connected components over spatial
    /// edges. Components with no sarcomere (lone z-discs) are skipped.
    /// Output order and member order are ascending by node id.
    pub fn myofibrils(&self, graph: &Graph) -> Vec<Myofibril> {
        let n = graph.nodes().len();
        let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); n];
        for edge in graph.edges() {
            if edge.kind != EdgeKind::Spatial {
                continue;
            }
            if edge.a.0 < n && edge.b.0 < n {
                adjacency[edge.a.0].push(edge.b.0);
                adjacency[edge.b.0].push(edge.a.0);
            }
        }

        let mut visited = vec![false; n];
        let mut out = Vec::new();
        for start in 0..n {
            if visited[start] {
                continue;
            }
            visited[start] = true;
            let mut stack = vec![start];
            let mut zdiscs = Vec::new();
            let mut sarcomeres = Vec::new();
            while let Some(i) = stack.pop() {
                match graph.nodes()[i].kind {
                    NodeKind::ZDisc { .. } => zdiscs.push(NodeId(i)),
                    NodeKind::Sarcomere { .. } => sarcomeres.push(NodeId(i)),
                }
                for &j in &adjacency[i] {
                    if !visited[j] {
                        visited[j] = true;
                        stack.push(j);
                    }
                }
            }
            if sarcomeres.is_empty() {
                continue;
            }
            zdiscs.sort_unstable();
            sarcomeres.sort_unstable();
            out.push(Myofibril { zdiscs, sarcomeres });
        }
        out
    }

    /// Contraction metrics for one sarcomere node. Fails with `NotFound`
    /// for unknown ids or non-sarcomere nodes; degrades to NaN metrics
    /// when fewer than two finite length samples exist.
    pub fn sarcomere_metrics(&self, graph: &Graph, id: NodeId) -> Result<SarcomereMetrics> {
        let node = graph.node(id)?;
        if !matches!(node.kind, NodeKind::Sarcomere { .. }) {
            return Err(Error::NotFound(format!("{id} is not a sarcomere node")));
        }
        Ok(contraction_metrics(node))
    }

    /// Shortest path between two nodes over spatial edges, Dijkstra with
    /// mean center-to-center distance as the edge weight.
    ///
    /// Fails with `NotFound` when either id is unknown; returns `None`
    /// when the nodes are not connected.
    pub fn network_distance(
        &self,
        graph: &Graph,
        from: NodeId,
        to: NodeId,
    ) -> Result<Option<NetworkDistance>> {
        graph.node(from)?;
        graph.node(to)?;
        if from == to {
            return Ok(Some(NetworkDistance {
                hops: 0,
                total_distance: 0.0,
            }));
        }

        let mut best: HashMap<NodeId, f64> = HashMap::new();
        let mut heap: BinaryHeap<Reverse<(PathCost, usize, NodeId)>> = BinaryHeap::new();
        best.insert(from, 0.0);
        heap.push(Reverse((PathCost(0.0), 0, from)));

        while let Some(Reverse((PathCost(dist), hops, node))) = heap.pop() {
            if best.get(&node).is_some_and(|&known| dist > known) {
                continue;
            }
            if node == to {
                return Ok(Some(NetworkDistance {
                    hops,
                    total_distance: dist,
                }));
            }
            let here = graph.node(node)?.mean_position();
            for neighbor in graph.spatial_neighbors(node) {
                let candidate = dist + here.distance(&graph.node(neighbor)?.mean_position());
                if best.get(&neighbor).map_or(true, |&d| candidate < d) {
                    best.insert(neighbor, candidate);
                    heap.push(Reverse((PathCost(candidate), hops + 1, neighbor)));
                }
            }
        }
        Ok(None)
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

fn contraction_metrics(node: &GraphNode) -> SarcomereMetrics {
    let length_series: Vec<f64> = node.samples.iter().map(|s| s.length).collect();
    let finite: Vec<(usize, f64)> = length_series
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, l)| l.is_finite())
        .collect();

    if finite.len() < 2 {
        return SarcomereMetrics {
            node: node.id,
            length_series,
            resting_length: f64::NAN,
            min_length: f64::NAN,
            peak_shortening: f64::NAN,
            time_to_peak: f64::NAN,
        };
    }

    let resting_length = finite
        .iter()
        .map(|&(_, l)| l)
        .fold(f64::NEG_INFINITY, f64::max);
    let (min_index, min_length) = finite
        .iter()
        .copied()
        .fold(
            (0usize, f64::INFINITY),
            |acc, (i, l)| if l < acc.1 { (i, l) } else { acc },
        );
    let peak_shortening = if resting_length > 0.0 {
        (resting_length - min_length) / resting_length
    } else {
        f64::NAN
    };
    let time_to_peak = node.samples[min_index].timestamp - node.samples[0].timestamp;

    SarcomereMetrics {
        node: node.id,
        length_series,
        resting_length,
        min_length,
        peak_shortening,
        time_to_peak,
    }
}

fn mean_finite(values: &[f64]) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for v in values.iter().filter(|v| v.is_finite()) {
        sum += v;
        count += 1;
    }
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}
