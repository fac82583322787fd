//! Pinhole camera helpers: lens distortion, axis-angle rotations and
//! point projection.

use nalgebra::{Matrix3, Point2, Point3, Rotation3, Vector3};
use serde::{Deserialize, Serialize};

/// Depths closer to zero than this are treated as on the camera plane.
const MIN_DEPTH: f64 = 1e-12;

/// Radial-tangential lens distortion `[k1, k2, p1, p2]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Distortion {
    pub k1: f64,
    pub k2: f64,
    pub p1: f64,
    pub p2: f64,
}

impl Distortion {
    pub fn from_array(c: [f64; 4]) -> Self {
        Self {
            k1: c[0],
            k2: c[1],
            p1: c[2],
            p2: c[3],
        }
    }

    pub fn to_array(&self) -> [f64; 4] {
        [self.k1, self.k2, self.p1, self.p2]
    }

    pub fn is_zero(&self) -> bool {
        self.to_array().iter().all(|&c| c == 0.0)
    }

    /// Apply distortion to normalized image coordinates.
    pub fn distort(&self, p: Point2<f64>) -> Point2<f64> {
        let (x, y) = (p.x, p.y);
        let r2 = x * x + y * y;
        let radial = 1.0 + self.k1 * r2 + self.k2 * r2 * r2;
        let dx = 2.0 * self.p1 * x * y + self.p2 * (r2 + 2.0 * x * x);
        let dy = self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * x * y;
        Point2::new(x * radial + dx, y * radial + dy)
    }

    /// Invert [`Distortion::distort`] by fixed-point iteration.
    pub fn undistort(&self, p: Point2<f64>) -> Point2<f64> {
        if self.is_zero() {
            return p;
        }
        let mut x = p.x;
        let mut y = p.y;
        for _ in 0..20 {
            let r2 = x * x + y * y;
            let radial = 1.0 + self.k1 * r2 + self.k2 * r2 * r2;
            if radial.abs() < MIN_DEPTH {
                break;
            }
            let dx = 2.0 * self.p1 * x * y + self.p2 * (r2 + 2.0 * x * x);
            let dy = self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * x * y;
            let nx = (p.x - dx) / radial;
            let ny = (p.y - dy) / radial;
            let step = (nx - x).abs().max((ny - y).abs());
            x = nx;
            y = ny;
            if step < 1e-14 {
                break;
            }
        }
        Point2::new(x, y)
    }
}

/// Rotation matrix of an axis-angle (Rodrigues) vector.
pub fn rotation_from_rvec(rvec: &Vector3<f64>) -> Matrix3<f64> {
    Rotation3::new(*rvec).into_inner()
}

/// Axis-angle (Rodrigues) vector of a rotation matrix.
///
/// The input is re-orthonormalised first, so slightly noisy matrices from
/// iterative solvers are accepted.
pub fn rvec_from_rotation(m: &Matrix3<f64>) -> Vector3<f64> {
    Rotation3::from_matrix(m).scaled_axis()
}

/// Map pixel coordinates to undistorted normalized coordinates.
///
/// `None` if the intrinsic matrix is singular.
pub fn normalize_points(
    image: &[Point2<f64>],
    intrinsic: &Matrix3<f64>,
    distortion: &Distortion,
) -> Option<Vec<Point2<f64>>> {
    let k_inv = intrinsic.try_inverse()?;
    let out = image
        .iter()
        .map(|p| {
            let v = k_inv * Vector3::new(p.x, p.y, 1.0);
            distortion.undistort(Point2::new(v.x / v.z, v.y / v.z))
        })
        .collect();
    Some(out)
}

/// Project a camera-frame point through distortion and intrinsics.
///
/// Points on the camera plane (`z == 0`) project to the image origin.
pub fn project_camera_point(
    p: &Vector3<f64>,
    intrinsic: &Matrix3<f64>,
    distortion: &Distortion,
) -> Point2<f64> {
    if p.z.abs() < MIN_DEPTH {
        return Point2::origin();
    }
    let d = distortion.distort(Point2::new(p.x / p.z, p.y / p.z));
    let v = intrinsic * Vector3::new(d.x, d.y, 1.0);
    Point2::new(v.x / v.z, v.y / v.z)
}

/// Project object points given an extrinsic transform `(rvec, tvec)`.
pub fn project_points(
    object: &[Point3<f64>],
    rvec: &Vector3<f64>,
    tvec: &Vector3<f64>,
    intrinsic: &Matrix3<f64>,
    distortion: &Distortion,
) -> Vec<Point2<f64>> {
    let r = rotation_from_rvec(rvec);
    object
        .iter()
        .map(|p| project_camera_point(&(r * p.coords + tvec), intrinsic, distortion))
        .collect()
}
