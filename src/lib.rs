//! Z-disc and sarcomere analysis for cardiomyocyte microscopy video.
//!
//! The crate turns a sequence of single-channel intensity frames into a
//! spatial-temporal graph of contractile structures and derives
//! contraction metrics from it. Four stages, each usable on its own:
//!
//! 1. [`detector::Detector`] segments candidate z-discs per frame;
//! 2. [`tracker::Tracker`] links detections across frames into
//!    identity-preserving tracks;
//! 3. [`graph::GraphBuilder`] assembles tracks into a graph of z-disc
//!    and sarcomere nodes;
//! 4. [`analysis::Analyzer`] computes contraction metrics over the
//!    graph.
//!
//! [`pipeline::Pipeline`] wires the stages together behind one call.
//! Video decoding is not part of this crate; callers feed frames through
//! the [`types::FrameSource`] trait.

pub mod analysis;
pub mod config;
pub mod detector;
pub mod error;
pub mod graph;
pub mod pipeline;
pub mod tracker;
pub mod types;

pub use analysis::{Analyzer, Metrics, Myofibril, NetworkDistance, SarcomereMetrics};
pub use config::Config;
pub use detector::Detector;
pub use error::{Error, Result, Stage};
pub use graph::{Graph, GraphBuilder, NodeId, NodeKind};
pub use pipeline::{Pipeline, PipelineOutput, RunStats};
pub use tracker::{Track, TrackId, Tracker};
pub use types::{Detection, Frame, FrameSource, Point, VecFrameSource};

use tracing_subscriber::EnvFilter;

/// Install a global tracing subscriber honoring `RUST_LOG`, falling back
/// to the configured level. Safe to call more than once; only the first
/// call takes effect.
pub fn init_logging(config: &config::LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
