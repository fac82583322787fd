mod common;

use std::sync::Arc;

use approx::assert_relative_eq;
use common::{intrinsic, render_chessboard};
use nalgebra::{Matrix3, Vector3};
use posetrack::{
    ChessboardTracker, ChessboardTrackerParams, Frame, FrameSource, MotionTracker, Pose,
};
use posetrack_core::{CalibrationParameters, ColorThreshold, Distortion};

fn calibration() -> Arc<CalibrationParameters> {
    let t = ColorThreshold::new(0, 20, 120, 255);
    let params = CalibrationParameters::new(intrinsic(), Distortion::default(), [t; 4]);
    Arc::new(params.expect("valid"))
}

#[test]
fn fronto_parallel_board_pose() {
    common::init_logging();
    // 10x7 squares of 40 px give 9x6 inner corners 40 px apart; with
    // f = 800 and 25-unit squares the board sits at depth 500.
    let frame = render_chessboard(10, 7, 40, (120, 100));
    let tracker = ChessboardTracker::new(calibration()).expect("tracker");
    tracker.on_frame(&frame).expect("frame");

    assert!(
        tracker.pose_state().last_update().is_some(),
        "chessboard was not detected"
    );
    // First inner corner sits at pixel (160, 140).
    let expected = Vector3::new(-100.0, -62.5, 500.0);
    let position = tracker.position();
    assert!((position.x - expected.x).abs() < 1.5, "x = {}", position.x);
    assert!((position.y - expected.y).abs() < 1.5, "y = {}", position.y);
    assert_relative_eq!(position.z, expected.z, max_relative = 2e-2);
    assert_relative_eq!(tracker.rotation_matrix(), Matrix3::identity(), epsilon = 2e-2);
}

#[test]
fn board_with_wrong_size_is_ignored() {
    let source = FrameSource::new();
    let params = ChessboardTrackerParams {
        rows: 5,
        cols: 7,
        ..Default::default()
    };
    let tracker =
        source.attach(ChessboardTracker::with_params(calibration(), params).expect("tracker"));

    source
        .deliver(&render_chessboard(10, 7, 40, (120, 100)))
        .expect("deliver");
    assert_eq!(tracker.pose(), Pose::default());
    assert!(tracker.pose_state().last_update().is_none());
}

#[test]
fn blank_frame_is_ignored() {
    let tracker = ChessboardTracker::new(calibration()).expect("tracker");
    tracker
        .on_frame(&Frame::from_pixel(320, 240, image::Rgb([255, 255, 255])))
        .expect("frame");
    assert!(tracker.pose_state().last_update().is_none());
}
