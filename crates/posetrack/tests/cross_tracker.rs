mod common;

use approx::assert_relative_eq;
use common::{cross_calibration, init_logging, render_cross};
use nalgebra::{Matrix3, Point2, Vector3};
use posetrack::{ColorCrossTracker, FrameSource, MotionTracker, PoseSolver, TrackerError};
use posetrack_core::rotation_from_rvec;

/// Rotation about x with cos = 0.8, sin = 0.6.
fn tilt() -> Matrix3<f64> {
    Matrix3::new(1.0, 0.0, 0.0, 0.0, 0.8, -0.6, 0.0, 0.6, 0.8)
}

/// With f = 1000 and t = (0, -345, 1000) every marker of a 100-unit cross
/// tilted by [`tilt`] projects onto an integer pixel.
fn direct_setup() -> (Matrix3<f64>, Vector3<f64>, [(i32, i32); 4]) {
    let k = Matrix3::new(1000.0, 0.0, 320.0, 0.0, 1000.0, 480.0, 0.0, 0.0, 1.0);
    let t = Vector3::new(0.0, -345.0, 1000.0);
    let centres = [(320, 135), (320, 230), (420, 135), (320, 105)];
    (k, t, centres)
}

#[test]
fn direct_perspective_recovers_translation() {
    init_logging();
    let (k, t, centres) = direct_setup();
    let tracker = ColorCrossTracker::new(cross_calibration(k), PoseSolver::DirectPerspective);

    let frame = render_cross(640, 480, centres.map(Some), 8);
    tracker.on_frame(&frame).expect("frame");

    assert_relative_eq!(tracker.position(), t, epsilon = 1e-3);
    assert_relative_eq!(tracker.rotation_matrix(), tilt(), epsilon = 1e-6);
    assert_relative_eq!(
        rotation_from_rvec(&tracker.rotation()),
        tracker.rotation_matrix(),
        epsilon = 1e-12
    );

    let image = tracker.image_points();
    for (p, c) in image.iter().zip(centres) {
        assert_eq!(*p, Point2::new(c.0 as f64, c.1 as f64));
    }
    for (p, q) in tracker.projected_points().iter().zip(&image) {
        assert_relative_eq!(p, q, epsilon = 1e-4);
    }
    assert!(tracker.pose_state().last_update().is_some());
}

#[test]
fn iterative_approximate_tracks_pixel_frame_pose() {
    init_logging();
    // POSIT treats the image origin as the optical centre. With f = 1000 and
    // t = (320, 240, 1000) the tilted arms project to (301.9, 301.9),
    // (420, 240) and (296.3, 166.7); discs sit on the nearest pixels.
    let t = Vector3::new(320.0, 240.0, 1000.0);
    let centres = [(320, 240), (302, 302), (420, 240), (296, 167)];
    let tracker = ColorCrossTracker::new(
        cross_calibration(Matrix3::identity()),
        PoseSolver::IterativeApproximate,
    );

    tracker
        .on_frame(&render_cross(640, 480, centres.map(Some), 8))
        .expect("frame");

    assert_relative_eq!(tracker.position(), t, max_relative = 2e-2);
    assert_relative_eq!(tracker.rotation_matrix(), tilt(), epsilon = 3e-2);
    for (p, c) in tracker.projected_points().iter().zip(centres) {
        assert!((p - Point2::new(c.0 as f64, c.1 as f64)).norm() < 2.0);
    }
}

#[test]
fn iterative_approximate_off_axis_keeps_positive_depth() {
    init_logging();
    // Far off axis POSIT stops at its iteration cap; the published pose must
    // still lie in front of the camera at a plausible depth.
    let centres = [(1431, 1086), (1350, 1100), (1531, 1086), (1325, 950)];
    let tracker = ColorCrossTracker::new(
        cross_calibration(Matrix3::identity()),
        PoseSolver::IterativeApproximate,
    );

    tracker
        .on_frame(&render_cross(1600, 1200, centres.map(Some), 8))
        .expect("frame");

    let snapshot = tracker.pose_state().snapshot();
    assert!(snapshot.last_update.is_some());
    let z = tracker.position().z;
    assert!(z > 100.0 && z < 10_000.0, "depth {z}");
    for p in tracker.projected_points() {
        assert!(p.coords.norm() < 10_000.0);
    }
}

#[test]
fn missing_marker_keeps_state_identical() {
    let (k, _, centres) = direct_setup();
    let tracker = ColorCrossTracker::new(cross_calibration(k), PoseSolver::DirectPerspective);
    tracker
        .on_frame(&render_cross(640, 480, centres.map(Some), 8))
        .expect("frame");
    let before = tracker.pose_state().snapshot();

    for missing in 0..4 {
        let mut partial = centres.map(Some);
        partial[missing] = None;
        tracker
            .on_frame(&render_cross(640, 480, partial, 8))
            .expect("frame");
        assert_eq!(tracker.pose_state().snapshot(), before);
    }
}

#[test]
fn unknown_solver_code_raises_configuration_error() {
    let (k, _, centres) = direct_setup();
    let source = FrameSource::new();
    let tracker = source.attach(ColorCrossTracker::from_solver_code(cross_calibration(k), 0));
    let before = tracker.pose_state().snapshot();

    let err = source
        .deliver(&render_cross(640, 480, centres.map(Some), 8))
        .unwrap_err();
    assert!(matches!(err, TrackerError::Configuration { code: 0 }));
    assert_eq!(tracker.pose_state().snapshot(), before);
}

#[test]
fn detached_tracker_stops_updating() {
    let (k, _, centres) = direct_setup();
    let source = FrameSource::new();
    let attached = source.attach(ColorCrossTracker::new(
        cross_calibration(k),
        PoseSolver::DirectPerspective,
    ));
    let reader = attached.handle();

    source
        .deliver(&render_cross(640, 480, centres.map(Some), 8))
        .expect("deliver");
    let solved = reader.pose_state().snapshot();
    assert!(solved.last_update.is_some());

    attached.detach();
    let shifted = centres.map(|(x, y)| Some((x + 30, y + 30)));
    source
        .deliver(&render_cross(640, 480, shifted, 8))
        .expect("deliver");
    assert_eq!(reader.pose_state().snapshot(), solved);
    assert_eq!(source.listener_count(), 0);
}
