//! Pose from scaled orthography with iterations (POSIT).
//!
//! The first object point is the reference point; image coordinates are
//! expected relative to the optical centre, in the same unit as `focal`.

use nalgebra::{DMatrix, DVector, Matrix3, Point2, Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Reference depth below this fraction of the scaled-orthographic estimate
/// is a diverging iteration, not a pose.
const MIN_DEPTH_RATIO: f64 = 0.1;

/// Termination criteria of the refinement loop.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PositCriteria {
    pub max_iterations: usize,
    /// Stop once no perspective correction term moves by more than this.
    pub epsilon: f64,
}

impl Default for PositCriteria {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            epsilon: 1e-4,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PositSolution {
    pub rotation: Matrix3<f64>,
    pub translation: Vector3<f64>,
    pub iterations: usize,
}

/// Estimate the pose of a non-coplanar object.
///
/// Returns `None` for fewer than four points, mismatched inputs, a coplanar
/// object model, a degenerate image or a reference depth collapsing towards
/// zero. Hitting the iteration cap is not an error: the last estimate is
/// returned.
pub fn posit(
    object: &[Point3<f64>],
    image: &[Point2<f64>],
    focal: f64,
    criteria: PositCriteria,
) -> Option<PositSolution> {
    let n = object.len();
    if n < 4 || image.len() != n || focal == 0.0 {
        return None;
    }

    let origin = object[0];
    let a = DMatrix::from_fn(n - 1, 3, |r, c| object[r + 1][c] - origin[c]);
    let at = a.transpose();
    let pseudo_inverse = (&at * &a).try_inverse()? * at;

    let (x0, y0) = (image[0].x, image[0].y);
    let mut eps = DVector::<f64>::zeros(n - 1);
    let mut rotation = Matrix3::identity();
    let mut translation = Vector3::zeros();
    let mut iterations = 0;
    let mut initial_depth = None;

    while iterations < criteria.max_iterations {
        iterations += 1;

        let xs = DVector::from_fn(n - 1, |r, _| image[r + 1].x * (1.0 + eps[r]) - x0);
        let ys = DVector::from_fn(n - 1, |r, _| image[r + 1].y * (1.0 + eps[r]) - y0);
        let i_vec: Vector3<f64> = (&pseudo_inverse * xs).fixed_rows::<3>(0).into_owned();
        let j_vec: Vector3<f64> = (&pseudo_inverse * ys).fixed_rows::<3>(0).into_owned();

        let (ni, nj) = (i_vec.norm(), j_vec.norm());
        if ni < 1e-12 || nj < 1e-12 {
            return None;
        }
        let scale = 0.5 * (ni + nj);
        let i_hat = i_vec / ni;
        let j_hat = j_vec / nj;
        // Correction terms use i x j unnormalised; only the published
        // rotation is orthonormalised.
        let k_raw = i_hat.cross(&j_hat);
        let k_hat = k_raw.try_normalize(1e-12)?;
        let j_ortho = k_hat.cross(&i_hat);

        let z0 = focal / scale;
        let first_z0 = *initial_depth.get_or_insert(z0);
        if !z0.is_finite() || z0 < first_z0 * MIN_DEPTH_RATIO {
            return None;
        }
        rotation = Matrix3::from_rows(&[i_hat.transpose(), j_ortho.transpose(), k_hat.transpose()]);
        translation = Vector3::new(x0 * z0 / focal, y0 * z0 / focal, z0);

        let next = (&a * DVector::from_column_slice(k_raw.as_slice())) / z0;
        let delta = (&next - &eps).amax();
        eps = next;
        if delta < criteria.epsilon {
            break;
        }
    }

    Some(PositSolution {
        rotation,
        translation,
        iterations,
    })
}

/// Pinhole projection `f * X / Z` without principal point or distortion.
///
/// Points at zero depth map to the origin.
pub fn project_pinhole(
    object: &[Point3<f64>],
    rotation: &Matrix3<f64>,
    translation: &Vector3<f64>,
    focal: f64,
) -> Vec<Point2<f64>> {
    object
        .iter()
        .map(|p| {
            let c = rotation * p.coords + translation;
            if c.z == 0.0 {
                Point2::origin()
            } else {
                Point2::new(focal * c.x / c.z, focal * c.y / c.z)
            }
        })
        .collect()
}
