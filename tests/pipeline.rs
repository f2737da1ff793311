//! End-to-end runs over synthetic frame sequences.
//!
//! Frames hold bright horizontal bars on a dark background; a stacked
//! bar pair reads as two parallel z-discs with a vertical connecting
//! vector, which is the geometry a sarcomere needs.

use ndarray::Array2;

use sarcgraph::analysis::Analyzer;
use sarcgraph::config::Config;
use sarcgraph::graph::{EdgeKind, Graph, NodeKind};
use sarcgraph::pipeline::Pipeline;
use sarcgraph::types::Frame;

/// Frame of bright horizontal bars, one per (row, col_start, len).
fn frame_with_bars(index: usize, bars: &[(usize, usize, usize)]) -> Frame {
    let mut pixels = Array2::from_elem((48, 48), 0.05);
    for &(row, col, len) in bars {
        for x in col..col + len {
            pixels[[row, x]] = 1.0;
        }
    }
    Frame::new(index, index as f64 / 30.0, pixels).unwrap()
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.detection.gaussian_sigma = 0.8;
    config.detection.min_component_size = 4;
    config
}

#[test]
fn moving_disc_pair_yields_one_sarcomere() {
    let pipeline = Pipeline::new(test_config()).unwrap();
    // Two stacked bars drifting right by one pixel per frame.
    let frames: Vec<Frame> = (0..3)
        .map(|i| frame_with_bars(i, &[(14, 5 + i, 10), (24, 5 + i, 10)]))
        .collect();
    let out = pipeline.run_frames(frames).unwrap();

    assert_eq!(out.tracks.len(), 2, "one track per disc");
    for track in &out.tracks {
        assert_eq!(track.observed(), 3);
    }
    assert_eq!(out.graph.zdisc_nodes().count(), 2);
    assert_eq!(out.graph.sarcomere_nodes().count(), 1);
    out.graph.validate().unwrap();

    let sarc = out.graph.sarcomere_nodes().next().unwrap();
    assert_eq!(sarc.lifespan().len(), 3, "valid across all three frames");
    // Disc spacing is ten rows throughout.
    for s in &sarc.samples {
        assert!((s.length - 10.0).abs() < 1.5, "length {}", s.length);
    }
}

#[test]
fn detections_partition_into_tracks() {
    let pipeline = Pipeline::new(test_config()).unwrap();
    let frames: Vec<Frame> = (0..4)
        .map(|i| frame_with_bars(i, &[(10, 5, 10), (30, 20, 10)]))
        .collect();
    let out = pipeline.run_frames(frames).unwrap();

    let tracked: usize = out.tracks.iter().map(|t| t.observed()).sum();
    assert_eq!(tracked, out.stats.detections, "every detection in exactly one track");
}

#[test]
fn occlusion_within_gap_tolerance_keeps_identity() {
    let pipeline = Pipeline::new(test_config()).unwrap();
    // The bar vanishes in frame 1 and reappears in frame 2.
    let frames = vec![
        frame_with_bars(0, &[(14, 5, 10)]),
        frame_with_bars(1, &[]),
        frame_with_bars(2, &[(14, 5, 10)]),
    ];
    let out = pipeline.run_frames(frames).unwrap();

    assert_eq!(out.tracks.len(), 1, "gap within tolerance must not split the track");
    assert_eq!(out.tracks[0].observed(), 2);
    assert_eq!(out.tracks[0].span(), 3);
}

#[test]
fn distant_discs_form_no_sarcomere() {
    let pipeline = Pipeline::new(test_config()).unwrap();
    // 30 rows apart, beyond the default 20 pixel link distance.
    let frames: Vec<Frame> = (0..3)
        .map(|i| frame_with_bars(i, &[(8, 5, 10), (38, 5, 10)]))
        .collect();
    let out = pipeline.run_frames(frames).unwrap();

    assert_eq!(out.tracks.len(), 2);
    assert_eq!(out.graph.sarcomere_nodes().count(), 0);
    assert!(out.metrics.sarcomeres.is_empty());
}

#[test]
fn contraction_metrics_follow_disc_spacing() {
    let pipeline = Pipeline::new(test_config()).unwrap();
    // Upper disc fixed, lower disc pulls in by two rows in frame 1.
    let rows = [[14usize, 26], [14, 24], [14, 26]];
    let frames: Vec<Frame> = rows
        .iter()
        .enumerate()
        .map(|(i, r)| frame_with_bars(i, &[(r[0], 5, 10), (r[1], 5, 10)]))
        .collect();
    let out = pipeline.run_frames(frames).unwrap();

    assert_eq!(out.metrics.sarcomeres.len(), 1);
    let m = &out.metrics.sarcomeres[0];
    assert!(m.is_defined());
    assert!(m.resting_length > m.min_length);
    assert!(m.peak_shortening > 0.05, "shortening {}", m.peak_shortening);
    // Peak contraction is the middle frame.
    assert!((m.time_to_peak - 1.0 / 30.0).abs() < 1e-9);
}

#[test]
fn network_distance_spans_a_chain() {
    let pipeline = Pipeline::new(test_config()).unwrap();
    // Three stacked discs, 14 rows apart: two sarcomeres sharing the
    // middle disc, outer discs too far apart to pair directly.
    let frames: Vec<Frame> = (0..3)
        .map(|i| frame_with_bars(i, &[(8, 5, 10), (22, 5, 10), (36, 5, 10)]))
        .collect();
    let out = pipeline.run_frames(frames).unwrap();
    assert_eq!(out.graph.sarcomere_nodes().count(), 2);

    let discs: Vec<_> = out.graph.zdisc_nodes().map(|n| n.id).collect();
    let top = discs[0];
    let bottom = discs[2];
    let d = Analyzer::new()
        .network_distance(&out.graph, top, bottom)
        .unwrap()
        .expect("chain connects outer discs");
    assert_eq!(d.hops, 4, "disc, sarcomere, disc, sarcomere, disc");

    // The chain is a single myofibril spanning all three discs.
    assert_eq!(out.metrics.myofibrils.len(), 1);
    assert_eq!(out.metrics.myofibrils[0].zdiscs, discs);
    assert_eq!(out.metrics.myofibrils[0].sarcomeres.len(), 2);
}

#[test]
fn repeated_runs_are_identical() {
    let make_frames = || -> Vec<Frame> {
        (0..3)
            .map(|i| frame_with_bars(i, &[(14, 5 + i, 10), (24, 5 + i, 10)]))
            .collect()
    };
    let pipeline = Pipeline::new(test_config()).unwrap();
    let a = pipeline.run_frames(make_frames()).unwrap();
    let b = pipeline.run_frames(make_frames()).unwrap();

    assert_eq!(a.graph.to_json().unwrap(), b.graph.to_json().unwrap());
    assert_eq!(a.stats.detections, b.stats.detections);
    assert_eq!(a.tracks.len(), b.tracks.len());
}

#[test]
fn graph_survives_json_file_round_trip() -> anyhow::Result<()> {
    let pipeline = Pipeline::new(test_config())?;
    let frames: Vec<Frame> = (0..3)
        .map(|i| frame_with_bars(i, &[(14, 5, 10), (24, 5, 10)]))
        .collect();
    let out = pipeline.run_frames(frames)?;

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("graph.json");
    out.graph.to_json_file(&path)?;
    let restored = Graph::from_json_file(&path)?;

    assert_eq!(restored.nodes().len(), out.graph.nodes().len());
    assert_eq!(restored.edges(), out.graph.edges());
    for (a, b) in out.graph.nodes().iter().zip(restored.nodes()) {
        assert_eq!(a.id, b.id);
        assert_eq!(a.kind, b.kind);
        assert_eq!(a.samples, b.samples);
    }
    Ok(())
}

#[test]
fn temporal_edges_cover_every_track() {
    let pipeline = Pipeline::new(test_config()).unwrap();
    let frames: Vec<Frame> = (0..3)
        .map(|i| frame_with_bars(i, &[(14, 5, 10), (24, 5, 10)]))
        .collect();
    let out = pipeline.run_frames(frames).unwrap();

    let temporal: Vec<_> = out
        .graph
        .edges()
        .iter()
        .filter(|e| e.kind == EdgeKind::Temporal)
        .collect();
    assert_eq!(temporal.len(), out.tracks.len());
    for edge in temporal {
        assert_eq!(edge.a, edge.b, "temporal edges tie a node to itself");
        let node = out.graph.node(edge.a).unwrap();
        assert!(matches!(node.kind, NodeKind::ZDisc { .. }));
        assert_eq!(edge.window, node.lifespan());
    }
}
