//! Error types for the sarcgraph pipeline.
//!
//! Malformed input aborts the whole run; downstream stages depend on full
//! upstream completion, so there is no partial-graph recovery. Degenerate
//! results (zero detections, zero tracks, NaN metrics) are values, not
//! errors.

use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline stage, reported alongside fatal input errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Stage {
    Detection,
    Tracking,
    GraphBuild,
    Analysis,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Detection => "detection",
            Stage::Tracking => "tracking",
            Stage::GraphBuild => "graph-build",
            Stage::Analysis => "analysis",
        };
        f.write_str(name)
    }
}

/// Sarcgraph error types.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed frame or detection input. Fatal: aborts the run and
    /// reports which stage and frame index triggered it.
    #[error("invalid input in {stage} stage{at}: {reason}", at = frame_label(.frame))]
    InvalidInput {
        stage: Stage,
        frame: Option<usize>,
        reason: String,
    },

    /// Query against a graph element that does not exist. Local and
    /// recoverable by the caller.
    #[error("graph element not found: {0}")]
    NotFound(String),

    /// Rejected configuration value.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// IO error (config loading, graph export)
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML config parse error
    #[error("config parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON graph serialization error
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

fn frame_label(frame: &Option<usize>) -> String {
    match frame {
        Some(f) => format!(" at frame {f}"),
        None => String::new(),
    }
}

impl Error {
    /// Shorthand for a fatal input error tied to a stage and frame.
    pub fn invalid_input(stage: Stage, frame: Option<usize>, reason: impl Into<String>) -> Self {
        Error::InvalidInput {
            stage,
            frame,
            reason: reason.into(),
        }
    }
}
