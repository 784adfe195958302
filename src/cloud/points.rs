use nalgebra::Vector3;

/// 3D point with an RGB color (raw 3D flow output).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColoredPoint {
    pub position: Vector3<f64>,
    pub rgb: [u8; 3],
}

/// 3D point tagged with the index of the cluster it belongs to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabeledPoint {
    pub position: Vector3<f64>,
    pub cluster: usize,
}
