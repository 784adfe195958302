//! Optical flow fields (previous → current) aligned to a rectified image.

use nalgebra::{Point2, Vector2};

use super::{FrameError, Grid};

/// A single sparse correspondence between the previous and the current image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowMatch {
    pub previous: Point2<f32>,
    pub current: Point2<f32>,
}

impl FlowMatch {
    pub fn new(previous: Point2<f32>, current: Point2<f32>) -> Self {
        Self { previous, current }
    }

    /// Integer pixel the match starts from.
    pub fn source_pixel(&self) -> Point2<i32> {
        Point2::new(
            self.previous.x.round() as i32,
            self.previous.y.round() as i32,
        )
    }
}

/// Dense per-pixel displacement `(dx, dy)` in pixels.
///
/// A vector with a NaN component is invalid at that pixel.
#[derive(Debug, Clone)]
pub struct FlowField {
    vectors: Grid<Vector2<f32>>,
}

impl FlowField {
    pub fn new(vectors: Grid<Vector2<f32>>) -> Self {
        Self { vectors }
    }

    /// Build from interleaved `[dx0, dy0, dx1, dy1, ...]` row-major samples.
    pub fn from_interleaved(
        width: usize,
        height: usize,
        components: &[f32],
    ) -> Result<Self, FrameError> {
        if components.len() % 2 != 0 {
            return Err(FrameError::SizeMismatch {
                width,
                height,
                actual: components.len() / 2,
            });
        }
        let vectors = components
            .chunks_exact(2)
            .map(|c| Vector2::new(c[0], c[1]))
            .collect();
        Ok(Self::new(Grid::from_vec(width, height, vectors)?))
    }

    /// Rasterize sparse matches into a field that is invalid everywhere else.
    ///
    /// Each match writes its displacement at its rounded source pixel; later
    /// matches overwrite earlier ones landing on the same pixel. Matches
    /// starting outside the image are dropped.
    pub fn from_sparse(width: usize, height: usize, matches: &[FlowMatch]) -> Self {
        let mut vectors = Grid::filled(width, height, Vector2::new(f32::NAN, f32::NAN));
        for m in matches {
            let pixel = m.source_pixel();
            if let Some(slot) = vectors.get_mut(pixel.x, pixel.y) {
                *slot = m.current - m.previous;
            }
        }
        Self { vectors }
    }

    pub fn width(&self) -> usize {
        self.vectors.width()
    }

    pub fn height(&self) -> usize {
        self.vectors.height()
    }

    /// Flow at (u, v), `None` outside the image or where either component is NaN.
    #[inline]
    pub fn at(&self, u: i32, v: i32) -> Option<Vector2<f32>> {
        self.vectors
            .get(u, v)
            .copied()
            .filter(|f| !f.x.is_nan() && !f.y.is_nan())
    }
}
