//! Single-colour blob tracker.

use log::{debug, info};
use nalgebra::Vector3;
use posetrack_core::{locate_color, ColorThreshold, HsvImage, PoseState};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::error::TrackerError;
use crate::params::ColorTrackerParams;
use crate::tracker::{Frame, MotionTracker};

/// Reports the image centroid of one colour as position `(x, y, 0)`.
///
/// Orientation is never produced; rotation keeps its prior value.
pub struct ColorTracker {
    threshold: ColorThreshold,
    state: PoseState,
}

impl ColorTracker {
    /// Track `hue` (degrees) with the default window.
    pub fn new(hue: u16) -> Result<Self, TrackerError> {
        Self::with_params(ColorTrackerParams::with_hue(hue))
    }

    pub fn with_params(params: ColorTrackerParams) -> Result<Self, TrackerError> {
        let threshold = params.threshold()?;
        info!(
            "colour tracker: hue {} ± {}, sat/val [{}, {}]",
            threshold.hue, threshold.hue_delta, threshold.satval_low, threshold.satval_high
        );
        Ok(Self {
            threshold,
            state: PoseState::new(),
        })
    }

    pub fn threshold(&self) -> &ColorThreshold {
        &self.threshold
    }
}

impl MotionTracker for ColorTracker {
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "debug",
            skip(self, frame),
            fields(width = frame.width(), height = frame.height())
        )
    )]
    fn on_frame(&self, frame: &Frame) -> Result<(), TrackerError> {
        let hsv = HsvImage::from_rgb(frame);
        match locate_color(&hsv, &self.threshold) {
            Some(c) => self.state.publish_position(Vector3::new(c.x, c.y, 0.0)),
            None => debug!("hue {} not found", self.threshold.hue),
        }
        Ok(())
    }

    fn pose_state(&self) -> &PoseState {
        &self.state
    }
}
