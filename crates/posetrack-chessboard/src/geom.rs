use std::f32::consts::{FRAC_PI_2, PI};

/// Absolute difference between two angles in radians, in `[0, π]`.
pub fn angle_diff_abs(a: f32, b: f32) -> f32 {
    let mut diff = (b - a).rem_euclid(2.0 * PI);
    if diff >= PI {
        diff -= 2.0 * PI;
    }
    diff.abs()
}

/// Angle between an undirected axis (modulo π) and a directed vector angle,
/// in `[0, π/2]`.
pub fn axis_vec_diff(axis_angle: f32, vec_angle: f32) -> f32 {
    let d = angle_diff_abs(axis_angle, vec_angle);
    d.min(PI - d)
}

pub fn is_orthogonal(reference_angle: f32, other_angle: f32, tolerance: f32) -> bool {
    let diff_abs = angle_diff_abs(reference_angle, other_angle);
    (FRAC_PI_2 - diff_abs).abs() <= tolerance.abs()
}
