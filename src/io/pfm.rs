//! Portable Float Map (single channel `Pf`) codec for disparity and depth.
//!
//! Layout: `Pf\n<width> <height>\n<scale>\n` then `width*height` f32 samples.
//! A negative scale means little-endian samples. Rows are stored bottom to top.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::frame::Grid;

pub fn read_pfm<P: AsRef<Path>>(path: P) -> Result<Grid<f32>> {
    let path = path.as_ref();
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    decode_pfm(&bytes).with_context(|| format!("Invalid PFM {}", path.display()))
}

pub fn write_pfm<P: AsRef<Path>>(path: P, grid: &Grid<f32>) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, encode_pfm(grid))
        .with_context(|| format!("Failed to write {}", path.display()))
}

pub fn decode_pfm(bytes: &[u8]) -> Result<Grid<f32>> {
    let mut pos = 0;
    let magic = next_token(bytes, &mut pos)?;
    match magic {
        "Pf" => {}
        "PF" => bail!("Color PFM is not supported, expected single channel"),
        other => bail!("Bad PFM magic [{}]", other),
    }
    let width: usize = next_token(bytes, &mut pos)?.parse().context("Bad PFM width")?;
    let height: usize = next_token(bytes, &mut pos)?.parse().context("Bad PFM height")?;
    let scale: f32 = next_token(bytes, &mut pos)?.parse().context("Bad PFM scale")?;
    // Exactly one whitespace byte separates the header from the samples
    pos += 1;

    let little_endian = scale < 0.0;
    let Some(expected) = width.checked_mul(height).and_then(|n| n.checked_mul(4)) else {
        bail!("PFM dimensions {}x{} overflow", width, height);
    };
    let data = bytes.get(pos..).unwrap_or_default();
    if data.len() < expected {
        bail!(
            "PFM {}x{} needs {} bytes of samples, found {}",
            width,
            height,
            expected,
            data.len()
        );
    }

    let samples: Vec<f32> = data[..expected]
        .chunks_exact(4)
        .map(|b| {
            let b = [b[0], b[1], b[2], b[3]];
            if little_endian {
                f32::from_le_bytes(b)
            } else {
                f32::from_be_bytes(b)
            }
        })
        .collect();

    let mut rows = vec![0.0f32; samples.len()];
    for (file_row, chunk) in samples.chunks_exact(width.max(1)).enumerate() {
        let v = height - 1 - file_row;
        rows[v * width..(v + 1) * width].copy_from_slice(chunk);
    }
    Ok(Grid::from_vec(width, height, rows)?)
}

/// Encode as little-endian `Pf` with scale -1.
pub fn encode_pfm(grid: &Grid<f32>) -> Vec<u8> {
    let (width, height) = (grid.width(), grid.height());
    let mut out = format!("Pf\n{} {}\n-1.0\n", width, height).into_bytes();
    out.reserve(width * height * 4);
    let data = grid.as_slice();
    for v in (0..height).rev() {
        for sample in &data[v * width..(v + 1) * width] {
            out.extend_from_slice(&sample.to_le_bytes());
        }
    }
    out
}

fn next_token<'a>(bytes: &'a [u8], pos: &mut usize) -> Result<&'a str> {
    while *pos < bytes.len() && bytes[*pos].is_ascii_whitespace() {
        *pos += 1;
    }
    let start = *pos;
    while *pos < bytes.len() && !bytes[*pos].is_ascii_whitespace() {
        *pos += 1;
    }
    if start == *pos {
        bail!("Truncated PFM header");
    }
    Ok(std::str::from_utf8(&bytes[start..*pos])?)
}
