//! Planar chessboard pose tracker.

use std::sync::Arc;

use chess_corners::{find_chess_corners_image, ChessConfig, CornerDescriptor};
use log::{debug, info, warn};
use nalgebra::{Point2, Point3};
use posetrack_chessboard::{ChessboardGridDetector, Corner};
use posetrack_core::{solve_pnp, CalibrationParameters, Pose, PoseState};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::error::TrackerError;
use crate::params::ChessboardTrackerParams;
use crate::tracker::{Frame, MotionTracker};

/// Finds the inner corners of a chessboard in a frame.
///
/// Corners come back in row-major order (`r * cols + c`); `None` when the
/// board is not fully visible.
pub trait PatternDetector: Send + Sync {
    fn find_corners(&self, frame: &Frame) -> Option<Vec<Point2<f64>>>;
}

/// ChESS corner response followed by grid recovery.
pub struct ChessCornerDetector {
    chess: ChessConfig,
    grid: ChessboardGridDetector,
}

/// ChESS settings that work for typical webcam frames.
pub fn default_chess_config() -> ChessConfig {
    let mut cfg = ChessConfig::single_scale();
    cfg.params.threshold_rel = 0.2;
    cfg.params.nms_radius = 2;
    cfg
}

impl ChessCornerDetector {
    pub fn new(params: &ChessboardTrackerParams) -> Self {
        Self::with_chess_config(params, default_chess_config())
    }

    pub fn with_chess_config(params: &ChessboardTrackerParams, chess: ChessConfig) -> Self {
        Self {
            chess,
            grid: ChessboardGridDetector::new(params.rows, params.cols, params.grid.clone()),
        }
    }
}

impl PatternDetector for ChessCornerDetector {
    fn find_corners(&self, frame: &Frame) -> Option<Vec<Point2<f64>>> {
        let gray = image::imageops::grayscale(frame);
        let corners: Vec<Corner> = find_chess_corners_image(&gray, &self.chess)
            .iter()
            .map(adapt_chess_corner)
            .collect();
        debug!("{} raw ChESS corners", corners.len());
        self.grid.detect(&corners)
    }
}

fn adapt_chess_corner(c: &CornerDescriptor) -> Corner {
    Corner::new(c.x, c.y, c.orientation, c.response)
}

/// Object points of the inner corners, row-major, on the `z = 0` plane.
pub fn chessboard_object_points(rows: usize, cols: usize, square_size: f64) -> Vec<Point3<f64>> {
    (0..rows)
        .flat_map(|r| {
            (0..cols).map(move |c| Point3::new(square_size * c as f64, square_size * r as f64, 0.0))
        })
        .collect()
}

/// Tracks the 6-DOF pose of a chessboard of known size.
pub struct ChessboardTracker<D: PatternDetector = ChessCornerDetector> {
    calibration: Arc<CalibrationParameters>,
    params: ChessboardTrackerParams,
    object_points: Vec<Point3<f64>>,
    detector: D,
    state: PoseState,
}

impl ChessboardTracker<ChessCornerDetector> {
    pub fn new(calibration: Arc<CalibrationParameters>) -> Result<Self, TrackerError> {
        Self::with_params(calibration, ChessboardTrackerParams::default())
    }

    pub fn with_params(
        calibration: Arc<CalibrationParameters>,
        params: ChessboardTrackerParams,
    ) -> Result<Self, TrackerError> {
        let detector = ChessCornerDetector::new(&params);
        Self::with_detector(calibration, params, detector)
    }
}

impl<D: PatternDetector> ChessboardTracker<D> {
    pub fn with_detector(
        calibration: Arc<CalibrationParameters>,
        params: ChessboardTrackerParams,
        detector: D,
    ) -> Result<Self, TrackerError> {
        params.validate()?;
        info!(
            "chessboard tracker: {}x{} inner corners, square {}",
            params.rows, params.cols, params.square_size
        );
        Ok(Self {
            object_points: chessboard_object_points(params.rows, params.cols, params.square_size),
            calibration,
            params,
            detector,
            state: PoseState::new(),
        })
    }

    pub fn params(&self) -> &ChessboardTrackerParams {
        &self.params
    }

    pub fn object_points(&self) -> &[Point3<f64>] {
        &self.object_points
    }
}

impl<D: PatternDetector> MotionTracker for ChessboardTracker<D> {
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "debug",
            skip(self, frame),
            fields(width = frame.width(), height = frame.height())
        )
    )]
    fn on_frame(&self, frame: &Frame) -> Result<(), TrackerError> {
        let Some(corners) = self.detector.find_corners(frame) else {
            debug!("chessboard not found");
            return Ok(());
        };
        if corners.len() != self.object_points.len() {
            debug!(
                "chessboard partially found: {} of {} corners",
                corners.len(),
                self.object_points.len()
            );
            return Ok(());
        }

        match solve_pnp(
            &self.object_points,
            &corners,
            self.calibration.intrinsic(),
            self.calibration.distortion(),
        ) {
            Ok(sol) => {
                debug!("chessboard pose solved, rms {:.3} px", sol.rms);
                self.state.publish_pose(Pose {
                    position: sol.tvec,
                    rotation: sol.rvec,
                    rotation_matrix: sol.rotation,
                });
            }
            Err(e) => warn!("chessboard found but pose solve failed: {e}"),
        }
        Ok(())
    }

    fn pose_state(&self) -> &PoseState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Matrix3, Vector3};
    use posetrack_core::{project_points, rotation_from_rvec, ColorThreshold, Distortion};

    struct Scripted(Option<Vec<Point2<f64>>>);

    impl PatternDetector for Scripted {
        fn find_corners(&self, _frame: &Frame) -> Option<Vec<Point2<f64>>> {
            self.0.clone()
        }
    }

    fn calibration() -> Arc<CalibrationParameters> {
        let k = Matrix3::new(800.0, 0.0, 320.0, 0.0, 800.0, 240.0, 0.0, 0.0, 1.0);
        let t = ColorThreshold::new(0, 20, 120, 255);
        Arc::new(CalibrationParameters::new(k, Distortion::default(), [t; 4]).expect("valid"))
    }

    fn small_board() -> ChessboardTrackerParams {
        ChessboardTrackerParams {
            rows: 3,
            cols: 4,
            square_size: 30.0,
            ..Default::default()
        }
    }

    #[test]
    fn object_points_are_row_major() {
        let pts = chessboard_object_points(2, 3, 10.0);
        assert_eq!(pts.len(), 6);
        assert_eq!(pts[1], Point3::new(10.0, 0.0, 0.0));
        assert_eq!(pts[3], Point3::new(0.0, 10.0, 0.0));
    }

    #[test]
    fn publishes_solved_pose() {
        let calib = calibration();
        let params = small_board();
        let object = chessboard_object_points(params.rows, params.cols, params.square_size);
        let rvec = Vector3::new(0.05, -0.1, 0.02);
        let tvec = Vector3::new(-40.0, -30.0, 700.0);
        let image = project_points(&object, &rvec, &tvec, calib.intrinsic(), calib.distortion());

        let tracker = ChessboardTracker::with_detector(calib, params, Scripted(Some(image)))
            .expect("tracker");
        tracker.on_frame(&Frame::new(8, 8)).expect("frame");

        assert_relative_eq!(tracker.position(), tvec, epsilon = 1e-6);
        assert_relative_eq!(tracker.rotation(), rvec, epsilon = 1e-8);
        assert_relative_eq!(
            tracker.rotation_matrix(),
            rotation_from_rvec(&rvec),
            epsilon = 1e-8
        );
        assert!(tracker.pose_state().last_update().is_some());
    }

    #[test]
    fn missing_or_partial_board_keeps_previous_pose() {
        let calib = calibration();
        let missing =
            ChessboardTracker::with_detector(calib.clone(), small_board(), Scripted(None))
                .expect("tracker");
        missing.on_frame(&Frame::new(8, 8)).expect("frame");
        assert_eq!(missing.pose(), Pose::default());
        assert!(missing.pose_state().last_update().is_none());

        let partial = vec![Point2::new(1.0, 1.0); 11];
        let partial =
            ChessboardTracker::with_detector(calib, small_board(), Scripted(Some(partial)))
                .expect("tracker");
        partial.on_frame(&Frame::new(8, 8)).expect("frame");
        assert!(partial.pose_state().last_update().is_none());
    }

    #[test]
    fn rejects_degenerate_board_size() {
        let params = ChessboardTrackerParams {
            cols: 1,
            ..Default::default()
        };
        assert!(matches!(
            ChessboardTracker::with_params(calibration(), params),
            Err(TrackerError::InvalidParams(_))
        ));
    }
}
