//! Core types for colour-marker and chessboard pose tracking.
//!
//! Holds the calibration parameters and their JSON form, the shared pose
//! state, HSV segmentation primitives and the camera geometry (projection,
//! PnP, POSIT). Nothing here knows about frame delivery or tracker types.

mod calibration;
mod camera;
mod color;
mod fps;
mod homography;
mod logger;
mod pnp;
mod pose;
mod posit;

pub use calibration::{
    CalibrationError, CalibrationParameters, Marker, MARKER_COUNT, MAX_HUE_DELTA,
};
pub use camera::{
    normalize_points, project_camera_point, project_points, rotation_from_rvec,
    rvec_from_rotation, Distortion,
};
pub use color::{
    hue_distance, in_range, locate_color, ColorThreshold, Hsv, HsvImage, Moments, HUE_RANGE,
    MASK_ON,
};
pub use fps::{FpsCounter, DEFAULT_FPS_WINDOW};
pub use homography::{estimate_homography, Homography};
pub use pnp::{solve_pnp, PnpError, PnpSolution};
pub use pose::{Pose, PoseSnapshot, PoseState};
pub use posit::{posit, project_pinhole, PositCriteria, PositSolution};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
