use nalgebra::{Matrix3, Vector3};
use posetrack_core::{Pose, PoseState};

use crate::error::TrackerError;

/// An 8-bit RGB frame as delivered by a [`crate::FrameSource`].
pub type Frame = image::RgbImage;

/// A pose tracker fed frame by frame.
///
/// `on_frame` runs on the frame source's delivery thread and is never
/// invoked concurrently for the same tracker; the accessors may be called
/// from any thread at any time. A frame on which the target is not found
/// leaves the published pose as it was.
pub trait MotionTracker: Send + Sync {
    /// Process one frame and publish the result into [`Self::pose_state`].
    fn on_frame(&self, frame: &Frame) -> Result<(), TrackerError>;

    fn pose_state(&self) -> &PoseState;

    fn position(&self) -> Vector3<f64> {
        self.pose_state().position()
    }

    /// Axis-angle rotation.
    fn rotation(&self) -> Vector3<f64> {
        self.pose_state().rotation()
    }

    fn rotation_matrix(&self) -> Matrix3<f64> {
        self.pose_state().rotation_matrix()
    }

    /// Successful updates per second.
    fn frame_rate(&self) -> f64 {
        self.pose_state().frame_rate()
    }

    /// Position and rotation taken under one lock.
    fn pose(&self) -> Pose {
        self.pose_state().pose()
    }
}
