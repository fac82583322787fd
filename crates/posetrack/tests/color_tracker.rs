mod common;

use approx::assert_relative_eq;
use image::Rgb;
use imageproc::drawing::draw_filled_circle_mut;
use nalgebra::Vector3;
use posetrack::{ColorTracker, ColorTrackerParams, Frame, FrameSource, MotionTracker};
use posetrack_core::{in_range, ColorThreshold, HsvImage, Moments};

fn frame_with_disc(centre: (i32, i32), colour: Rgb<u8>) -> Frame {
    let mut frame = Frame::from_pixel(common::WIDTH, common::HEIGHT, Rgb([30, 30, 30]));
    draw_filled_circle_mut(&mut frame, centre, 12, colour);
    frame
}

#[test]
fn position_is_moment_ratio() {
    common::init_logging();
    let frame = frame_with_disc((200, 150), Rgb([0, 0, 255]));
    let tracker = ColorTracker::new(240).expect("tracker");
    tracker.on_frame(&frame).expect("frame");

    let mask = in_range(&HsvImage::from_rgb(&frame), tracker.threshold());
    let m = Moments::from_mask(&mask);
    assert!(m.m00 > 0.0);
    assert_relative_eq!(
        tracker.position(),
        Vector3::new(m.m10 / m.m00, m.m01 / m.m00, 0.0),
        epsilon = 1e-12
    );
    assert_relative_eq!(tracker.position(), Vector3::new(200.0, 150.0, 0.0), epsilon = 1e-9);
}

#[test]
fn zero_area_frame_is_a_no_op() {
    let source = FrameSource::new();
    let tracker = source.attach(ColorTracker::new(120).expect("tracker"));

    source
        .deliver(&frame_with_disc((100, 100), Rgb([0, 255, 0])))
        .expect("deliver");
    let before = tracker.pose_state().snapshot();

    source
        .deliver(&Frame::from_pixel(64, 64, Rgb([0, 0, 0])))
        .expect("deliver");
    assert_eq!(tracker.pose_state().snapshot(), before);
}

#[test]
fn custom_window() {
    let params = ColorTrackerParams {
        hue: 60,
        hue_delta: 5,
        satval_low: 200,
        satval_high: 255,
    };
    let tracker = ColorTracker::with_params(params).expect("tracker");
    assert_eq!(*tracker.threshold(), ColorThreshold::new(60, 5, 200, 255));

    // Dull yellow falls below the saturation/value floor.
    tracker
        .on_frame(&frame_with_disc((50, 50), Rgb([150, 150, 0])))
        .expect("frame");
    assert!(tracker.pose_state().last_update().is_none());

    tracker
        .on_frame(&frame_with_disc((50, 60), Rgb([255, 255, 0])))
        .expect("frame");
    assert_relative_eq!(tracker.position(), Vector3::new(50.0, 60.0, 0.0), epsilon = 1e-9);
}
