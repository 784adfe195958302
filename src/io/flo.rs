//! Middlebury `.flo` optical flow files.
//!
//! Layout (little-endian): magic `202021.25` as f32, width and height as i32,
//! then `width*height` interleaved (dx, dy) f32 pairs in row-major order.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::frame::FlowField;

const FLO_MAGIC: f32 = 202021.25;
/// Components above this mark unknown flow.
const UNKNOWN_FLOW_THRESHOLD: f32 = 1e9;
const HEADER_LEN: usize = 12;

pub fn read_flo<P: AsRef<Path>>(path: P) -> Result<FlowField> {
    let path = path.as_ref();
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    decode_flo(&bytes).with_context(|| format!("Invalid flow file {}", path.display()))
}

pub fn decode_flo(bytes: &[u8]) -> Result<FlowField> {
    if bytes.len() < HEADER_LEN {
        bail!("Flow file too short for header ({} bytes)", bytes.len());
    }
    let magic = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    if magic != FLO_MAGIC {
        bail!("Bad flow magic {}", magic);
    }
    let width = i32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    let height = i32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
    if width < 0 || height < 0 {
        bail!("Bad flow dimensions {}x{}", width, height);
    }
    let (width, height) = (width as usize, height as usize);

    let Some(expected) = width.checked_mul(height).and_then(|n| n.checked_mul(2 * 4)) else {
        bail!("Flow dimensions {}x{} overflow", width, height);
    };
    let data = &bytes[HEADER_LEN..];
    if data.len() < expected {
        bail!(
            "Flow {}x{} needs {} bytes, found {}",
            width,
            height,
            expected,
            data.len()
        );
    }

    let components: Vec<f32> = data[..expected]
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .map(|c| if c.abs() > UNKNOWN_FLOW_THRESHOLD { f32::NAN } else { c })
        .collect();
    Ok(FlowField::from_interleaved(width, height, &components)?)
}
