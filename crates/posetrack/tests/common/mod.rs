#![allow(dead_code)]

use std::sync::Arc;

use image::Rgb;
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut};
use imageproc::rect::Rect;
use nalgebra::{Matrix3, Point2};
use posetrack::{CalibrationParameters, Frame};
use posetrack_core::{ColorThreshold, Distortion, Marker};

pub const WIDTH: u32 = 640;
pub const HEIGHT: u32 = 480;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn intrinsic() -> Matrix3<f64> {
    Matrix3::new(800.0, 0.0, 320.0, 0.0, 800.0, 240.0, 0.0, 0.0, 1.0)
}

pub fn marker_colour(marker: Marker) -> Rgb<u8> {
    match marker {
        Marker::Origin => Rgb([0, 255, 0]),
        Marker::ArmA => Rgb([255, 0, 0]),
        Marker::ArmB => Rgb([0, 0, 255]),
        Marker::ArmC => Rgb([255, 255, 0]),
    }
}

/// Green, red, blue and yellow windows with the given camera matrix.
pub fn cross_calibration(intrinsic: Matrix3<f64>) -> Arc<CalibrationParameters> {
    let t = |hue| ColorThreshold::new(hue, 20, 120, 255);
    let params =
        CalibrationParameters::new(intrinsic, Distortion::default(), [t(120), t(0), t(240), t(60)])
            .expect("valid calibration");
    Arc::new(params)
}

/// Black frame with one filled disc per marker; `None` skips a marker.
pub fn render_cross(
    width: u32,
    height: u32,
    centres: [Option<(i32, i32)>; 4],
    radius: i32,
) -> Frame {
    let mut frame = Frame::new(width, height);
    for (marker, centre) in Marker::ALL.into_iter().zip(centres) {
        if let Some(c) = centre {
            draw_filled_circle_mut(&mut frame, c, radius, marker_colour(marker));
        }
    }
    frame
}

/// White frame with a `squares_x × squares_y` chessboard of `square_px`
/// pixel squares whose top-left corner is at `origin`.
pub fn render_chessboard(
    squares_x: u32,
    squares_y: u32,
    square_px: u32,
    origin: (i32, i32),
) -> Frame {
    let mut frame = Frame::from_pixel(WIDTH, HEIGHT, Rgb([255, 255, 255]));
    for j in 0..squares_y {
        for i in 0..squares_x {
            if (i + j) % 2 == 0 {
                let rect = Rect::at(
                    origin.0 + (i * square_px) as i32,
                    origin.1 + (j * square_px) as i32,
                )
                .of_size(square_px, square_px);
                draw_filled_rect_mut(&mut frame, rect, Rgb([0, 0, 0]));
            }
        }
    }
    frame
}

pub fn round(p: Point2<f64>) -> (i32, i32) {
    (p.x.round() as i32, p.y.round() as i32)
}
