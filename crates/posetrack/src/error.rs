use posetrack_core::CalibrationError;

/// Errors surfaced by trackers and the frame source.
///
/// Detection misses are never errors: a frame without the expected pattern
/// leaves the pose untouched and returns `Ok`.
#[derive(thiserror::Error, Debug)]
pub enum TrackerError {
    #[error("unknown pose solver code {code} (expected 1 = direct perspective, 2 = iterative approximate)")]
    Configuration { code: i32 },

    #[error("invalid tracker parameters: {0}")]
    InvalidParams(String),

    #[error(transparent)]
    Calibration(#[from] CalibrationError),
}
