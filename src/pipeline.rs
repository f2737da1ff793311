//! End-to-end orchestration: detection, tracking, graph assembly,
//! analysis.
//!
//! The pipeline owns configured stage instances and threads the data
//! through them in order. Each stage reports its own errors; the pipeline
//! adds timing and summary logging on top.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, info_span};

use crate::analysis::{Analyzer, Metrics};
use crate::config::Config;
use crate::detector::Detector;
use crate::error::{Error, Result, Stage};
use crate::graph::{Graph, GraphBuilder};
use crate::tracker::{Track, Tracker};
use crate::types::{Frame, FrameSource};

/// Run-level counters, reported once per pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStats {
    pub frames: usize,
    pub detections: usize,
    pub tracks: usize,
    pub sarcomeres: usize,
    pub elapsed_secs: f64,
    /// Frames processed per wall-clock second.
    pub fps: f64,
}

/// Everything a pipeline run produces.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub tracks: Vec<Track>,
    pub graph: Graph,
    pub metrics: Metrics,
    pub stats: RunStats,
}

pub struct Pipeline {
    detector: Detector,
    tracker: Tracker,
    builder: GraphBuilder,
    analyzer: Analyzer,
}

impl Pipeline {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            detector: Detector::new(config.detection),
            tracker: Tracker::new(config.tracking),
            builder: GraphBuilder::new(config.graph),
            analyzer: Analyzer::new(),
        })
    }

    /// Drain a frame source and process the full sequence.
    pub fn run(&self, source: &mut dyn FrameSource) -> Result<PipelineOutput> {
        let mut frames = Vec::new();
        while let Some(frame) = source.next_frame()? {
            frames.push(frame);
        }
        self.run_frames(frames)
    }

    /// Process an in-memory frame sequence.
    ///
    /// Frames must be indexed 0..n in order; a zero-length sequence is
    /// valid and produces an empty graph, not an error.
    pub fn run_frames(&self, frames: Vec<Frame>) -> Result<PipelineOutput> {
        let started = Instant::now();
        for (slot, frame) in frames.iter().enumerate() {
            if frame.index() != slot {
                return Err(Error::invalid_input(
                    Stage::Detection,
                    Some(slot),
                    format!("frame carries index {} but sits in slot {}", frame.index(), slot),
                ));
            }
        }
        let frame_count = frames.len();

        let per_frame = {
            let _span = info_span!("detection").entered();
            self.detector.detect_all(&frames)?
        };
        let detection_count: usize = per_frame.iter().map(Vec::len).sum();
        info!(
            frames = frame_count,
            detections = detection_count,
            "detection stage complete"
        );

        let tracks = {
            let _span = info_span!("tracking").entered();
            self.tracker.track(per_frame)?
        };

        let graph = {
            let _span = info_span!("graph_build").entered();
            self.builder.build(&tracks)
        };

        let metrics = {
            let _span = info_span!("analysis").entered();
            self.analyzer.analyze(&graph)
        };

        let elapsed_secs = started.elapsed().as_secs_f64();
        let stats = RunStats {
            frames: frame_count,
            detections: detection_count,
            tracks: tracks.len(),
            sarcomeres: metrics.network.sarcomere_count,
            elapsed_secs,
            fps: if elapsed_secs > 0.0 {
                frame_count as f64 / elapsed_secs
            } else {
                0.0
            },
        };
        info!(
            frames = stats.frames,
            detections = stats.detections,
            tracks = stats.tracks,
            sarcomeres = stats.sarcomeres,
            elapsed_secs = stats.elapsed_secs,
            "pipeline run complete"
        );

        Ok(PipelineOutput {
            tracks,
            graph,
            metrics,
            stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VecFrameSource;
    use ndarray::Array2;

    fn frame_with_bars(index: usize, bars: &[(usize, usize, usize)]) -> Frame {
        let mut pixels = Array2::from_elem((40, 40), 0.05);
        for &(row, col, len) in bars {
            for x in col..col + len {
                pixels[[row, x]] = 1.0;
            }
        }
        Frame::new(index, index as f64 / 30.0, pixels).unwrap()
    }

    #[test]
    fn empty_sequence_produces_empty_output() {
        let pipeline = Pipeline::new(Config::default()).unwrap();
        let out = pipeline.run_frames(Vec::new()).unwrap();
        assert_eq!(out.stats.frames, 0);
        assert!(out.tracks.is_empty());
        assert!(out.graph.nodes().is_empty());
        assert!(out.metrics.network.mean_sarcomere_length.is_nan());
    }

    #[test]
    fn misindexed_frame_rejected() {
        let pipeline = Pipeline::new(Config::default()).unwrap();
        let frames = vec![frame_with_bars(3, &[(10, 5, 8)])];
        let err = pipeline.run_frames(frames).unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }));
    }

    #[test]
    fn invalid_config_rejected_at_construction() {
        let mut config = Config::default();
        config.tracking.cost_threshold = -1.0;
        assert!(Pipeline::new(config).is_err());
    }

    #[test]
    fn frame_source_and_vec_agree() {
        let pipeline = Pipeline::new(Config::default()).unwrap();
        let frames: Vec<Frame> = (0..3)
            .map(|i| frame_with_bars(i, &[(10, 5 + i, 8)]))
            .collect();
        let from_vec = pipeline.run_frames(frames.clone()).unwrap();
        let mut source = VecFrameSource::new(frames);
        let from_source = pipeline.run(&mut source).unwrap();
        assert_eq!(from_vec.stats.frames, from_source.stats.frames);
        assert_eq!(from_vec.stats.detections, from_source.stats.detections);
        assert_eq!(from_vec.tracks.len(), from_source.tracks.len());
    }
}
