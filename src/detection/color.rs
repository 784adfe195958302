//! Velocity → RGB mapping for the raw 3D flow cloud.

use super::Flow3D;

/// Upper end of the color scale; the midpoint 127 means "not moving".
const COLOR_MAX: u8 = 254;
const COLOR_MID: f64 = 127.0;

/// Map a signed per-second speed on one axis to `[0, 254]`.
///
/// `[-axis_max, axis_max]` maps linearly onto the scale; anything beyond
/// saturates toward the sign of the speed.
pub fn axis_color(speed: f64, axis_max: f64) -> u8 {
    if speed.abs() > axis_max {
        if speed < 0.0 { 0 } else { COLOR_MAX }
    } else {
        (speed / axis_max * COLOR_MID + COLOR_MID) as u8
    }
}

/// Color of a flow: x/y/z velocities become r/g/b.
pub fn velocity_color(flow: &Flow3D, elapsed_s: f64, axis_max: f64) -> [u8; 3] {
    let velocity = flow.distance_vector() / elapsed_s;
    [
        axis_color(velocity.x, axis_max),
        axis_color(velocity.y, axis_max),
        axis_color(velocity.z, axis_max),
    ]
}
