//! CSV export of per-frame detection output.
//!
//! For every processed frame `<timestamp_ns>_flows.csv` (raw colored cloud),
//! `<timestamp_ns>_clusters.csv` (labeled cloud) and, with debug records on,
//! `<timestamp_ns>_matches.csv` are written. `summary.csv` gets one row per
//! frame including skipped ones.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use csv::Writer;
use serde::Serialize;

use crate::detection::DetectionResult;

#[derive(Debug, Serialize)]
struct FlowRow {
    x: f64,
    y: f64,
    z: f64,
    r: u8,
    g: u8,
    b: u8,
}

#[derive(Debug, Serialize)]
struct ClusterRow {
    x: f64,
    y: f64,
    z: f64,
    cluster: usize,
}

#[derive(Debug, Serialize)]
struct MatchRow {
    now_x: f64,
    now_y: f64,
    now_z: f64,
    prev_x: f64,
    prev_y: f64,
    prev_z: f64,
    now_u: i32,
    now_v: i32,
    prev_u: i32,
    prev_v: i32,
    cluster: usize,
}

#[derive(Debug, Serialize)]
struct SummaryRow<'a> {
    timestamp_ns: u64,
    skipped: &'a str,
    sampled: usize,
    flows: usize,
    moving: usize,
    clusters: usize,
    total_ms: f64,
}

pub struct ResultExporter {
    dir: PathBuf,
    summary: Writer<File>,
}

impl ResultExporter {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create output dir {}", dir.display()))?;
        let summary_path = dir.join("summary.csv");
        let summary = Writer::from_path(&summary_path)
            .with_context(|| format!("Failed to create {}", summary_path.display()))?;
        Ok(Self { dir, summary })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write(&mut self, result: &DetectionResult) -> Result<()> {
        let skipped = result.skipped.map(|r| r.to_string()).unwrap_or_default();
        self.summary.serialize(SummaryRow {
            timestamp_ns: result.timestamp_ns,
            skipped: &skipped,
            sampled: result.metrics.rejections.sampled,
            flows: result.metrics.n_flows,
            moving: result.metrics.n_moving,
            clusters: result.metrics.n_clusters,
            total_ms: result.timing.total_ms,
        })?;
        self.summary.flush()?;

        if result.is_skipped() {
            return Ok(());
        }

        let ts = result.timestamp_ns;
        write_rows(
            &self.dir.join(format!("{}_flows.csv", ts)),
            result.flow_cloud.iter().map(|p| FlowRow {
                x: p.position.x,
                y: p.position.y,
                z: p.position.z,
                r: p.rgb[0],
                g: p.rgb[1],
                b: p.rgb[2],
            }),
        )?;
        write_rows(
            &self.dir.join(format!("{}_clusters.csv", ts)),
            result.cluster_cloud.iter().map(|p| ClusterRow {
                x: p.position.x,
                y: p.position.y,
                z: p.position.z,
                cluster: p.cluster,
            }),
        )?;
        if !result.match_records.is_empty() {
            write_rows(
                &self.dir.join(format!("{}_matches.csv", ts)),
                result.match_records.iter().map(|m| MatchRow {
                    now_x: m.now.x,
                    now_y: m.now.y,
                    now_z: m.now.z,
                    prev_x: m.prev.x,
                    prev_y: m.prev.y,
                    prev_z: m.prev.z,
                    now_u: m.now_uv.x,
                    now_v: m.now_uv.y,
                    prev_u: m.prev_uv.x,
                    prev_v: m.prev_uv.y,
                    cluster: m.cluster,
                }),
            )?;
        }
        Ok(())
    }
}

fn write_rows<T: Serialize>(path: &Path, rows: impl Iterator<Item = T>) -> Result<()> {
    let mut writer =
        Writer::from_path(path).with_context(|| format!("Failed to create {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::{ColoredPoint, LabeledPoint};
    use crate::detection::{DetectionMetrics, MatchRecord, SkipReason, TimingStats};
    use nalgebra::{Point2, Vector3};

    fn result() -> DetectionResult {
        DetectionResult {
            timestamp_ns: 42,
            skipped: None,
            flow_cloud: vec![ColoredPoint {
                position: Vector3::new(1.0, 2.0, 3.0),
                rgb: [254, 127, 0],
            }],
            clusters: Vec::new(),
            cluster_cloud: vec![LabeledPoint {
                position: Vector3::new(1.0, 2.0, 3.0),
                cluster: 0,
            }],
            match_records: vec![MatchRecord {
                now: Vector3::new(1.0, 2.0, 3.0),
                prev: Vector3::new(0.5, 2.0, 3.0),
                now_uv: Point2::new(11, 5),
                prev_uv: Point2::new(10, 5),
                cluster: 0,
            }],
            metrics: DetectionMetrics::default(),
            timing: TimingStats::zero(),
        }
    }

    #[test]
    fn test_writes_per_frame_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut exporter = ResultExporter::new(dir.path().join("out")).unwrap();
        exporter.write(&result()).unwrap();

        let flows = fs::read_to_string(exporter.dir().join("42_flows.csv")).unwrap();
        assert_eq!(flows, "x,y,z,r,g,b\n1.0,2.0,3.0,254,127,0\n");

        let clusters = fs::read_to_string(exporter.dir().join("42_clusters.csv")).unwrap();
        assert_eq!(clusters, "x,y,z,cluster\n1.0,2.0,3.0,0\n");

        let matches = fs::read_to_string(exporter.dir().join("42_matches.csv")).unwrap();
        assert!(matches.ends_with("1.0,2.0,3.0,0.5,2.0,3.0,11,5,10,5,0\n"));
    }

    #[test]
    fn test_skipped_frame_only_in_summary() {
        let dir = tempfile::tempdir().unwrap();
        let mut exporter = ResultExporter::new(dir.path()).unwrap();
        exporter
            .write(&DetectionResult::skipped(7, SkipReason::FirstFrame))
            .unwrap();

        assert!(!dir.path().join("7_flows.csv").exists());
        let summary = fs::read_to_string(dir.path().join("summary.csv")).unwrap();
        let mut lines = summary.lines();
        assert_eq!(
            lines.next(),
            Some("timestamp_ns,skipped,sampled,flows,moving,clusters,total_ms")
        );
        assert_eq!(lines.next(), Some("7,first frame,0,0,0,0,0.0"));
    }
}
