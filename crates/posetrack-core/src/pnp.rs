//! Perspective-n-Point: camera pose from 3D-2D correspondences.
//!
//! Image points are undistorted into normalized coordinates, a closed-form
//! initial pose is computed (homography decomposition for planar models,
//! POSIT otherwise) and then refined with Levenberg-Marquardt on the
//! reprojection error.

use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt};
use log::debug;
use nalgebra::{storage::Owned, DMatrix, DVector, Dyn, Matrix3, Point2, Point3, Vector3};
use thiserror::Error;

use crate::camera::{
    normalize_points, project_points, rotation_from_rvec, rvec_from_rotation, Distortion,
};
use crate::homography::estimate_homography;
use crate::posit::{posit, PositCriteria};

const MIN_CORRESPONDENCES: usize = 4;
/// Evaluation budget multiplier of the refinement, per parameter.
const MAX_REFINE_ITERATIONS: usize = 50;
const REFINE_TOL: f64 = 1e-15;
/// Relative eigenvalue below which the object model is treated as planar.
const PLANARITY_TOL: f64 = 1e-9;
const JACOBIAN_STEP: f64 = 1e-7;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PnpError {
    #[error("PnP requires at least {required} correspondences, got {actual}")]
    InsufficientCorrespondences { required: usize, actual: usize },

    #[error("mismatched correspondences: {object} object points vs {image} image points")]
    MismatchedLengths { object: usize, image: usize },

    #[error("degenerate configuration: {0}")]
    Degenerate(&'static str),
}

/// Extrinsic transform mapping object coordinates into the camera frame.
#[derive(Clone, Debug, PartialEq)]
pub struct PnpSolution {
    /// Axis-angle rotation.
    pub rvec: Vector3<f64>,
    pub tvec: Vector3<f64>,
    /// Rotation matrix of `rvec`.
    pub rotation: Matrix3<f64>,
    /// RMS reprojection error in pixels.
    pub rms: f64,
}

/// Solve the camera pose of an object from its image.
pub fn solve_pnp(
    object: &[Point3<f64>],
    image: &[Point2<f64>],
    intrinsic: &Matrix3<f64>,
    distortion: &Distortion,
) -> Result<PnpSolution, PnpError> {
    if object.len() != image.len() {
        return Err(PnpError::MismatchedLengths {
            object: object.len(),
            image: image.len(),
        });
    }
    if object.len() < MIN_CORRESPONDENCES {
        return Err(PnpError::InsufficientCorrespondences {
            required: MIN_CORRESPONDENCES,
            actual: object.len(),
        });
    }

    let normalized = normalize_points(image, intrinsic, distortion)
        .ok_or(PnpError::Degenerate("intrinsic matrix is singular"))?;

    let (rotation, translation) = match plane_basis(object)? {
        Some((centroid, basis)) => planar_init(object, &normalized, &centroid, &basis)?,
        None => {
            let sol = posit(object, &normalized, 1.0, PositCriteria::default())
                .ok_or(PnpError::Degenerate("POSIT initialisation failed"))?;
            (sol.rotation, sol.translation)
        }
    };

    let (rvec, tvec) = refine(
        object,
        &normalized,
        rvec_from_rotation(&rotation),
        translation,
    );

    let reprojected = project_points(object, &rvec, &tvec, intrinsic, distortion);
    let sq: f64 = reprojected
        .iter()
        .zip(image)
        .map(|(a, b)| (a - b).norm_squared())
        .sum();

    Ok(PnpSolution {
        rvec,
        tvec,
        rotation: rotation_from_rvec(&rvec),
        rms: (sq / image.len() as f64).sqrt(),
    })
}

/// Centroid and right-handed basis `[e1 e2 n]` of a planar model, or `None`
/// when the model spans three dimensions.
fn plane_basis(object: &[Point3<f64>]) -> Result<Option<(Vector3<f64>, Matrix3<f64>)>, PnpError> {
    let n = object.len() as f64;
    let centroid = object.iter().map(|p| p.coords).sum::<Vector3<f64>>() / n;
    let cov = object
        .iter()
        .map(|p| {
            let d = p.coords - centroid;
            d * d.transpose()
        })
        .sum::<Matrix3<f64>>();

    let eig = cov.symmetric_eigen();
    let mut order = [0usize, 1, 2];
    order.sort_by(|&a, &b| eig.eigenvalues[b].total_cmp(&eig.eigenvalues[a]));
    let (largest, middle, smallest) = (
        eig.eigenvalues[order[0]],
        eig.eigenvalues[order[1]],
        eig.eigenvalues[order[2]],
    );

    if largest <= 0.0 || middle <= PLANARITY_TOL * largest {
        return Err(PnpError::Degenerate("object points are collinear"));
    }
    if smallest > PLANARITY_TOL * largest {
        return Ok(None);
    }

    let e1: Vector3<f64> = eig.eigenvectors.column(order[0]).into_owned();
    let e2: Vector3<f64> = eig.eigenvectors.column(order[1]).into_owned();
    let normal = e1.cross(&e2);
    Ok(Some((centroid, Matrix3::from_columns(&[e1, e2, normal]))))
}

/// Pose of a planar model from the plane-to-image homography.
fn planar_init(
    object: &[Point3<f64>],
    normalized: &[Point2<f64>],
    centroid: &Vector3<f64>,
    basis: &Matrix3<f64>,
) -> Result<(Matrix3<f64>, Vector3<f64>), PnpError> {
    let plane: Vec<Point2<f64>> = object
        .iter()
        .map(|p| {
            let local = basis.transpose() * (p.coords - centroid);
            Point2::new(local.x, local.y)
        })
        .collect();

    let h = estimate_homography(&plane, normalized)
        .ok_or(PnpError::Degenerate("homography estimation failed"))?
        .h;

    let h1: Vector3<f64> = h.column(0).into_owned();
    let h2: Vector3<f64> = h.column(1).into_owned();
    let denom = 0.5 * (h1.norm() + h2.norm());
    if denom <= 1e-12 {
        return Err(PnpError::Degenerate("degenerate homography"));
    }
    let lambda = 1.0 / denom;

    let mut r1 = h1 * lambda;
    let mut r2 = h2 * lambda;
    let mut t: Vector3<f64> = h.column(2) * lambda;
    if t.z < 0.0 {
        r1 = -r1;
        r2 = -r2;
        t = -t;
    }
    let r3 = r1.cross(&r2);
    if r3.norm() <= 1e-12 {
        return Err(PnpError::Degenerate("degenerate homography"));
    }

    // Project onto SO(3)
    let svd = Matrix3::from_columns(&[r1, r2, r3]).svd(true, true);
    let (u, v_t) = match (svd.u, svd.v_t) {
        (Some(u), Some(v_t)) => (u, v_t),
        _ => return Err(PnpError::Degenerate("SVD failed")),
    };
    let mut r_plane = u * v_t;
    if r_plane.determinant() < 0.0 {
        let mut u_flipped = u;
        u_flipped.column_mut(2).neg_mut();
        r_plane = u_flipped * v_t;
    }

    // x_cam = R_p * B^T * (p - c) + t_p
    let rotation = r_plane * basis.transpose();
    let translation = t - rotation * centroid;
    Ok((rotation, translation))
}

fn project_normalized(rotation: &Matrix3<f64>, t: &Vector3<f64>, p: &Point3<f64>) -> Point2<f64> {
    let c = rotation * p.coords + t;
    if c.z.abs() < 1e-12 {
        Point2::origin()
    } else {
        Point2::new(c.x / c.z, c.y / c.z)
    }
}

fn residuals(object: &[Point3<f64>], observed: &[Point2<f64>], x: &DVector<f64>) -> DVector<f64> {
    let rotation = rotation_from_rvec(&Vector3::new(x[0], x[1], x[2]));
    let t = Vector3::new(x[3], x[4], x[5]);
    let mut out = DVector::zeros(2 * object.len());
    for (k, (p, o)) in object.iter().zip(observed).enumerate() {
        let q = project_normalized(&rotation, &t, p);
        out[2 * k] = q.x - o.x;
        out[2 * k + 1] = q.y - o.y;
    }
    out
}

/// Reprojection error over `(rvec, tvec)` in normalized image space.
struct PoseProblem<'a> {
    object: &'a [Point3<f64>],
    observed: &'a [Point2<f64>],
    params: DVector<f64>,
}

impl LeastSquaresProblem<f64, Dyn, Dyn> for PoseProblem<'_> {
    type ResidualStorage = Owned<f64, Dyn>;
    type JacobianStorage = Owned<f64, Dyn, Dyn>;
    type ParameterStorage = Owned<f64, Dyn>;

    fn set_params(&mut self, x: &DVector<f64>) {
        self.params.clone_from(x);
    }

    fn params(&self) -> DVector<f64> {
        self.params.clone()
    }

    fn residuals(&self) -> Option<DVector<f64>> {
        Some(residuals(self.object, self.observed, &self.params))
    }

    /// Central differences.
    fn jacobian(&self) -> Option<DMatrix<f64>> {
        let mut jac = DMatrix::zeros(2 * self.object.len(), self.params.len());
        for j in 0..self.params.len() {
            let mut plus = self.params.clone();
            let mut minus = self.params.clone();
            plus[j] += JACOBIAN_STEP;
            minus[j] -= JACOBIAN_STEP;
            let diff = (residuals(self.object, self.observed, &plus)
                - residuals(self.object, self.observed, &minus))
                / (2.0 * JACOBIAN_STEP);
            jac.set_column(j, &diff);
        }
        Some(jac)
    }
}

fn refine(
    object: &[Point3<f64>],
    observed: &[Point2<f64>],
    rvec: Vector3<f64>,
    tvec: Vector3<f64>,
) -> (Vector3<f64>, Vector3<f64>) {
    let problem = PoseProblem {
        object,
        observed,
        params: DVector::from_column_slice(&[rvec.x, rvec.y, rvec.z, tvec.x, tvec.y, tvec.z]),
    };
    let lm = LevenbergMarquardt::new()
        .with_ftol(REFINE_TOL)
        .with_xtol(REFINE_TOL)
        .with_gtol(0.0)
        .with_patience(MAX_REFINE_ITERATIONS);

    let (problem, report) = lm.minimize(problem);
    let x = problem.params;
    if !x.iter().all(|v| v.is_finite()) {
        debug!("pose refinement diverged ({:?}), keeping initial pose", report.termination);
        return (rvec, tvec);
    }
    debug!(
        "pose refinement: {} evaluations, cost {:.3e}",
        report.number_of_evaluations, report.objective_function
    );
    (Vector3::new(x[0], x[1], x[2]), Vector3::new(x[3], x[4], x[5]))
}
