//! Real-time pose trackers fed by a push-model frame source.
//!
//! - [`ChessboardTracker`]: 6-DOF pose of a planar chessboard.
//! - [`ColorTracker`]: image centroid of a single colour.
//! - [`ColorCrossTracker`]: 6-DOF pose of a four-marker colour cross, solved
//!   either by full perspective PnP or by POSIT.
//!
//! Trackers are attached to a [`FrameSource`], which calls
//! [`MotionTracker::on_frame`] for every delivered frame. Results are read
//! back through the [`MotionTracker`] accessors from any thread.
//!
//! ## Quickstart
//!
//! ```no_run
//! use std::sync::Arc;
//! use posetrack::{
//!     CalibrationParameters, ColorCrossTracker, FrameSource, MotionTracker, PoseSolver,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let calibration = Arc::new(CalibrationParameters::load_json("calibration.json")?);
//! let source = FrameSource::new();
//! let cross = ColorCrossTracker::new(calibration, PoseSolver::DirectPerspective);
//! let tracker = source.attach(cross);
//!
//! let frame = image::open("frame.png")?.to_rgb8();
//! source.deliver(&frame)?;
//! println!("position {:?}, {:.1} fps", tracker.position(), tracker.frame_rate());
//! # Ok(())
//! # }
//! ```

mod calibrate;
mod chessboard;
mod color;
mod cross;
mod error;
mod params;
mod source;
mod tracker;

pub use posetrack_chessboard as grid;
pub use posetrack_core as core;

pub use calibrate::{CalibrateError, HueSampler};
pub use chessboard::{
    chessboard_object_points, default_chess_config, ChessCornerDetector, ChessboardTracker,
    PatternDetector,
};
pub use color::ColorTracker;
pub use cross::{cross_object_points, ColorCrossTracker, PoseSolver};
pub use error::TrackerError;
pub use params::{ChessboardTrackerParams, ColorTrackerParams, CrossParams};
pub use source::{Attached, FrameSource};
pub use tracker::{Frame, MotionTracker};

pub use posetrack_core::{
    CalibrationError, CalibrationParameters, Marker, Pose, PoseSnapshot, PoseState,
};
