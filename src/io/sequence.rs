//! Recorded sequence loader.
//!
//! ```text
//! <root>/calibration.yaml
//! <root>/frames.csv   timestamp_ns, disparity, depth, depth_encoding, flow_left, flow_right,
//!                     tx, ty, tz, qw, qx, qy, qz
//! ```
//! Paths in `frames.csv` are relative to the root. The pose columns give the
//! previous → current camera transform and are ignored on the first row.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use csv::{ReaderBuilder, Trim};
use nalgebra::{Matrix3, Point2, Vector3};
use serde::Deserialize;
use tracing::{info, warn};

use super::flo::read_flo;
use super::pfm::read_pfm;
use crate::camera::CameraModel;
use crate::detection::{FlowInput, FrameInputs};
use crate::frame::{DepthEncoding, DepthFrame, DisparityFrame, FlowMatch, Grid, StereoParams};
use crate::geometry::SE3;

/// `calibration.yaml` contents.
#[derive(Debug, Clone, Deserialize)]
pub struct Calibration {
    /// [fx, fy, cx, cy] of the rectified left camera.
    pub intrinsics: Vec<f64>,
    /// Camera separation in meters.
    pub baseline: f64,
    /// Focal length used for disparity → depth. Defaults to fx.
    #[serde(default)]
    pub focal_length: Option<f64>,
    pub min_disparity: f32,
    pub max_disparity: f32,
}

impl Calibration {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let calibration: Self = serde_yaml::from_reader(
            File::open(path).with_context(|| format!("Failed to open {:?}", path))?,
        )
        .with_context(|| format!("Failed to parse {:?}", path))?;
        calibration.camera()?;
        Ok(calibration)
    }

    pub fn camera(&self) -> Result<CameraModel> {
        if self.intrinsics.len() != 4 {
            bail!(
                "Expected 4 intrinsics [fx, fy, cx, cy], got {}",
                self.intrinsics.len()
            );
        }
        let i = &self.intrinsics;
        let k = Matrix3::new(i[0], 0.0, i[2], 0.0, i[1], i[3], 0.0, 0.0, 1.0);
        Ok(CameraModel::from_k(&k))
    }

    pub fn stereo_params(&self) -> StereoParams {
        let focal_length = self
            .focal_length
            .or_else(|| self.intrinsics.first().copied())
            .unwrap_or_default();
        StereoParams {
            focal_length: focal_length as f32,
            baseline: self.baseline as f32,
            min_disparity: self.min_disparity,
            max_disparity: self.max_disparity,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FrameEntry {
    pub timestamp_ns: u64,
    pub disparity: String,
    /// Empty when the frame has no depth image.
    pub depth: String,
    pub depth_encoding: String,
    pub flow_left: String,
    pub flow_right: String,
    /// Previous → current camera transform.
    pub ego_motion: SE3,
}

#[derive(Debug)]
pub struct Sequence {
    root: PathBuf,
    pub calibration: Calibration,
    camera: CameraModel,
    pub entries: Vec<FrameEntry>,
}

impl Sequence {
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let calibration = Calibration::load(root.join("calibration.yaml"))?;
        let camera = calibration.camera()?;
        let entries = load_frame_list(root.join("frames.csv"))?;
        info!(
            "Loaded sequence {} with {} frames",
            root.display(),
            entries.len()
        );

        Ok(Self {
            root,
            calibration,
            camera,
            entries,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn camera(&self) -> &CameraModel {
        &self.camera
    }

    /// Decode every file of frame `idx`.
    ///
    /// A depth image that cannot be decoded is logged and left out; every
    /// other failure is an error.
    pub fn load_frame(&self, idx: usize) -> Result<FrameInputs> {
        let entry = self
            .entries
            .get(idx)
            .with_context(|| format!("No frame at index {}", idx))?;

        let disparity_path = self.root.join(&entry.disparity);
        let disparity = DisparityFrame::new(
            read_pfm(&disparity_path)?,
            self.calibration.stereo_params(),
            self.camera,
        )
        .with_context(|| format!("Bad disparity frame {:?}", disparity_path))?;

        let depth = if entry.depth.is_empty() {
            None
        } else {
            match self.load_depth(entry) {
                Ok(depth) => Some(depth),
                Err(e) => {
                    warn!("Frame at {} ns has no depth: {:#}", entry.timestamp_ns, e);
                    None
                }
            }
        };

        Ok(FrameInputs {
            timestamp_ns: entry.timestamp_ns,
            ego_motion: entry.ego_motion.clone(),
            left_flow: load_flow(&self.root.join(&entry.flow_left))?,
            right_flow: load_flow(&self.root.join(&entry.flow_right))?,
            disparity,
            depth,
        })
    }

    fn load_depth(&self, entry: &FrameEntry) -> Result<DepthFrame> {
        let encoding: DepthEncoding = entry.depth_encoding.parse()?;
        let path = self.root.join(&entry.depth);
        match encoding {
            DepthEncoding::FixedPointMillimeters => read_depth_png(&path),
            DepthEncoding::FloatMeters => Ok(DepthFrame::from_meters(read_pfm(&path)?)),
        }
    }
}

/// Read a 16-bit grayscale PNG holding millimeters.
pub fn read_depth_png<P: AsRef<Path>>(path: P) -> Result<DepthFrame> {
    let path = path.as_ref();
    let img = image::open(path).with_context(|| format!("Failed to read depth image {:?}", path))?;
    if img.color() != image::ColorType::L16 {
        bail!(
            "Depth image {:?} is {:?}, expected 16-bit grayscale",
            path,
            img.color()
        );
    }
    let img = img.into_luma16();
    let (width, height) = img.dimensions();
    let samples = Grid::from_vec(width as usize, height as usize, img.into_raw())?;
    Ok(DepthFrame::from_millimeters(samples))
}

/// Dense `.flo` field or sparse `.csv` match list, by extension.
pub fn load_flow(path: &Path) -> Result<FlowInput> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("flo") => Ok(FlowInput::Dense(read_flo(path)?)),
        Some("csv") => Ok(FlowInput::Sparse(read_matches(path)?)),
        _ => bail!("Unknown flow format {:?}", path),
    }
}

/// Sparse matches: one `u_prev, v_prev, u_now, v_now` row per match.
pub fn read_matches<P: AsRef<Path>>(path: P) -> Result<Vec<FlowMatch>> {
    let path = path.as_ref();
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .comment(Some(b'#'))
        .trim(Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let mut matches = Vec::new();
    for row in rdr.deserialize() {
        let (u_prev, v_prev, u_now, v_now): (f32, f32, f32, f32) =
            row.with_context(|| format!("Bad match row in {}", path.display()))?;
        matches.push(FlowMatch::new(
            Point2::new(u_prev, v_prev),
            Point2::new(u_now, v_now),
        ));
    }
    Ok(matches)
}

fn load_frame_list(csv_path: PathBuf) -> Result<Vec<FrameEntry>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .comment(Some(b'#'))
        .trim(Trim::All)
        .flexible(true)
        .from_path(&csv_path)
        .with_context(|| format!("Failed to open {}", csv_path.display()))?;

    let mut entries = Vec::new();
    for rec in rdr.records() {
        let rec = rec.with_context(|| format!("Failed to read {}", csv_path.display()))?;
        let line = rec.position().map_or(0, |p| p.line());
        if rec.len() < 13 {
            bail!(
                "Frame row at line {} of {} has {} columns, expected 13",
                line,
                csv_path.display(),
                rec.len()
            );
        }
        let field = |i: usize| -> Result<f64> {
            rec[i].parse().with_context(|| {
                format!(
                    "Bad value [{}] in column {} at line {} of {}",
                    &rec[i],
                    i,
                    line,
                    csv_path.display()
                )
            })
        };
        let timestamp_ns: u64 = rec[0].parse().with_context(|| {
            format!(
                "Bad timestamp [{}] at line {} of {}",
                &rec[0],
                line,
                csv_path.display()
            )
        })?;
        let translation = Vector3::new(field(6)?, field(7)?, field(8)?);
        // Quaternion is w-first
        let ego_motion =
            SE3::from_quaternion(field(9)?, field(10)?, field(11)?, field(12)?, translation);
        entries.push(FrameEntry {
            timestamp_ns,
            disparity: rec[1].to_string(),
            depth: rec[2].to_string(),
            depth_encoding: rec[3].to_string(),
            flow_left: rec[4].to_string(),
            flow_right: rec[5].to_string(),
            ego_motion,
        });
    }
    Ok(entries)
}
