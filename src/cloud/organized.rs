use nalgebra::Vector3;

use crate::frame::Grid;

/// Image-shaped point cloud: entry (u, v) belongs to pixel (u, v).
///
/// Pixels without a valid reconstruction are kept as holes instead of being
/// dropped, so downstream code can index the cloud with pixel coordinates.
#[derive(Debug, Clone)]
pub struct OrganizedPointCloud {
    points: Grid<Option<Vector3<f64>>>,
}

impl OrganizedPointCloud {
    pub fn new(points: Grid<Option<Vector3<f64>>>) -> Self {
        Self { points }
    }

    pub fn width(&self) -> usize {
        self.points.width()
    }

    pub fn height(&self) -> usize {
        self.points.height()
    }

    /// Number of entries, always `width * height`.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Valid point at pixel (u, v).
    pub fn at(&self, u: i32, v: i32) -> Option<Vector3<f64>> {
        self.points.get(u, v).copied().flatten()
    }

    /// Entry at (u, v) in flat XYZ form: NaN triple for holes.
    pub fn xyz(&self, u: usize, v: usize) -> [f32; 3] {
        match self.at(u as i32, v as i32) {
            Some(p) => [p.x as f32, p.y as f32, p.z as f32],
            None => [f32::NAN; 3],
        }
    }

    /// True only if every entry holds a finite point.
    pub fn is_dense(&self) -> bool {
        self.points.iter().all(Option::is_some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dense_only_without_holes() {
        let full = OrganizedPointCloud::new(Grid::filled(2, 2, Some(Vector3::new(0.0, 0.0, 1.0))));
        assert!(full.is_dense());

        let holey = OrganizedPointCloud::new(Grid::from_fn(2, 2, |u, v| {
            (u != v).then(|| Vector3::new(u as f64, v as f64, 1.0))
        }));
        assert!(!holey.is_dense());
        assert_eq!(holey.len(), 4);
    }

    #[test]
    fn test_xyz_indexed_by_pixel() {
        let cloud = OrganizedPointCloud::new(Grid::from_fn(3, 2, |u, v| {
            (u != 1).then(|| Vector3::new(u as f64, v as f64, 2.0))
        }));

        assert_eq!(cloud.xyz(0, 1), [0.0, 1.0, 2.0]);
        assert_eq!(cloud.xyz(2, 1), [2.0, 1.0, 2.0]);
        assert!(cloud.xyz(1, 0).iter().all(|c| c.is_nan()));
        assert!(cloud.at(1, 1).is_none());
        assert!(cloud.at(3, 0).is_none());
    }
}
