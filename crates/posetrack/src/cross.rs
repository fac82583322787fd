//! Four-marker colour cross tracker.
//!
//! The cross carries a green origin marker and red, blue and yellow markers
//! on three orthogonal arms of equal length. Each frame, every marker is
//! segmented by its calibrated hue window and reduced to a centroid; with
//! all four present the 6-DOF pose is solved by the selected
//! [`PoseSolver`].

use std::fmt;
use std::sync::Arc;

use log::{debug, error, info, warn};
use nalgebra::{Point2, Point3};
use posetrack_core::{
    locate_color, posit, project_pinhole, project_points, solve_pnp, CalibrationParameters,
    HsvImage, Marker, Pose, PoseState, MARKER_COUNT,
};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::error::TrackerError;
use crate::params::CrossParams;
use crate::tracker::{Frame, MotionTracker};

/// Pose solving strategy of a [`ColorCrossTracker`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PoseSolver {
    /// Full perspective PnP with the calibrated intrinsics and distortion.
    DirectPerspective,
    /// POSIT with a fixed focal length on raw pixel coordinates.
    IterativeApproximate,
}

impl PoseSolver {
    /// Integer selector used by configuration files and the CLI.
    pub const fn code(self) -> i32 {
        match self {
            PoseSolver::DirectPerspective => 1,
            PoseSolver::IterativeApproximate => 2,
        }
    }
}

impl TryFrom<i32> for PoseSolver {
    type Error = TrackerError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(PoseSolver::DirectPerspective),
            2 => Ok(PoseSolver::IterativeApproximate),
            code => Err(TrackerError::Configuration { code }),
        }
    }
}

impl fmt::Display for PoseSolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoseSolver::DirectPerspective => f.write_str("direct perspective"),
            PoseSolver::IterativeApproximate => f.write_str("iterative approximate"),
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Selector {
    Known(PoseSolver),
    /// Rejected on the first frame.
    Unknown(i32),
}

/// Marker positions in scene units, in [`Marker::ALL`] order.
pub fn cross_object_points(arm_length: f64) -> [Point3<f64>; MARKER_COUNT] {
    [
        Point3::origin(),
        Point3::new(0.0, arm_length, 0.0),
        Point3::new(arm_length, 0.0, 0.0),
        Point3::new(0.0, 0.0, arm_length),
    ]
}

pub struct ColorCrossTracker {
    calibration: Arc<CalibrationParameters>,
    selector: Selector,
    params: CrossParams,
    object_points: [Point3<f64>; MARKER_COUNT],
    state: PoseState,
}

impl ColorCrossTracker {
    pub fn new(calibration: Arc<CalibrationParameters>, solver: PoseSolver) -> Self {
        Self::build(calibration, Selector::Known(solver), CrossParams::default())
    }

    pub fn with_params(
        calibration: Arc<CalibrationParameters>,
        solver: PoseSolver,
        params: CrossParams,
    ) -> Result<Self, TrackerError> {
        params.validate()?;
        Ok(Self::build(calibration, Selector::Known(solver), params))
    }

    /// Build from an integer selector (1 = direct, 2 = iterative).
    ///
    /// An unknown code is accepted here and reported as
    /// [`TrackerError::Configuration`] by the first `on_frame`, which then
    /// leaves the pose untouched. Use [`PoseSolver::try_from`] to reject it
    /// up front.
    pub fn from_solver_code(calibration: Arc<CalibrationParameters>, code: i32) -> Self {
        let selector = match PoseSolver::try_from(code) {
            Ok(solver) => Selector::Known(solver),
            Err(_) => {
                warn!("unknown pose solver code {code}; frames will be rejected");
                Selector::Unknown(code)
            }
        };
        Self::build(calibration, selector, CrossParams::default())
    }

    fn build(
        calibration: Arc<CalibrationParameters>,
        selector: Selector,
        params: CrossParams,
    ) -> Self {
        match selector {
            Selector::Known(solver) => info!(
                "colour cross tracker: {solver} solver, arm length {}",
                params.arm_length
            ),
            Selector::Unknown(code) => info!(
                "colour cross tracker: solver code {code}, arm length {}",
                params.arm_length
            ),
        }
        Self {
            calibration,
            selector,
            object_points: cross_object_points(params.arm_length),
            params,
            state: PoseState::new(),
        }
    }

    /// `None` when built from an unknown solver code.
    pub fn solver(&self) -> Option<PoseSolver> {
        match self.selector {
            Selector::Known(s) => Some(s),
            Selector::Unknown(_) => None,
        }
    }

    pub fn params(&self) -> &CrossParams {
        &self.params
    }

    pub fn object_points(&self) -> &[Point3<f64>; MARKER_COUNT] {
        &self.object_points
    }

    /// Marker centroids of the last solved frame.
    pub fn image_points(&self) -> Vec<Point2<f64>> {
        self.state.image_points()
    }

    /// Object points re-projected with the last solved pose.
    pub fn projected_points(&self) -> Vec<Point2<f64>> {
        self.state.projected_points()
    }

    fn locate_markers(&self, frame: &Frame) -> Option<Vec<Point2<f64>>> {
        let hsv = HsvImage::from_rgb(frame);
        Marker::ALL
            .iter()
            .map(|&marker| {
                let found = locate_color(&hsv, self.calibration.threshold(marker));
                if found.is_none() {
                    debug!("{} marker not found", marker.color_name());
                }
                found
            })
            .collect()
    }

    fn solve_direct(&self, image: &[Point2<f64>]) -> Option<(Pose, Vec<Point2<f64>>)> {
        let intrinsic = self.calibration.intrinsic();
        let distortion = self.calibration.distortion();
        match solve_pnp(&self.object_points, image, intrinsic, distortion) {
            Ok(sol) => {
                debug!("direct perspective solve, rms {:.3} px", sol.rms);
                let projected =
                    project_points(&self.object_points, &sol.rvec, &sol.tvec, intrinsic, distortion);
                let pose = Pose {
                    position: sol.tvec,
                    rotation: sol.rvec,
                    rotation_matrix: sol.rotation,
                };
                Some((pose, projected))
            }
            Err(e) => {
                warn!("markers found but pose solve failed: {e}");
                None
            }
        }
    }

    fn solve_iterative(&self, image: &[Point2<f64>]) -> Option<(Pose, Vec<Point2<f64>>)> {
        let focal = self.params.focal_length;
        let criteria = self.params.posit_criteria();
        let Some(sol) = posit(&self.object_points, image, focal, criteria) else {
            warn!("markers found but POSIT is degenerate");
            return None;
        };
        debug!("POSIT finished after {} iterations", sol.iterations);
        let pose = Pose::from_rotation_matrix(sol.rotation, sol.translation);
        let projected =
            project_pinhole(&self.object_points, &pose.rotation_matrix, &pose.position, focal);
        Some((pose, projected))
    }
}

impl MotionTracker for ColorCrossTracker {
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "debug",
            skip(self, frame),
            fields(width = frame.width(), height = frame.height())
        )
    )]
    fn on_frame(&self, frame: &Frame) -> Result<(), TrackerError> {
        let solver = match self.selector {
            Selector::Known(solver) => solver,
            Selector::Unknown(code) => {
                error!("rejecting frame: unknown pose solver code {code}");
                return Err(TrackerError::Configuration { code });
            }
        };

        let Some(image_points) = self.locate_markers(frame) else {
            return Ok(());
        };

        let solved = match solver {
            PoseSolver::DirectPerspective => self.solve_direct(&image_points),
            PoseSolver::IterativeApproximate => self.solve_iterative(&image_points),
        };
        if let Some((pose, projected)) = solved {
            self.state.publish_solution(pose, image_points, projected);
        }
        Ok(())
    }

    fn pose_state(&self) -> &PoseState {
        &self.state
    }
}
