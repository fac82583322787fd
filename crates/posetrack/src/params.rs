//! Tracker parameter structs.

use posetrack_chessboard::GridParams;
use posetrack_core::{ColorThreshold, PositCriteria, HUE_RANGE, MAX_HUE_DELTA};
use serde::{Deserialize, Serialize};

use crate::error::TrackerError;

/// Inner-corner layout of the tracked chessboard.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ChessboardTrackerParams {
    pub rows: usize,
    pub cols: usize,
    /// Edge length of one square in scene units.
    pub square_size: f64,
    pub grid: GridParams,
}

impl Default for ChessboardTrackerParams {
    fn default() -> Self {
        Self {
            rows: 6,
            cols: 9,
            square_size: 25.0,
            grid: GridParams::default(),
        }
    }
}

impl ChessboardTrackerParams {
    pub(crate) fn validate(&self) -> Result<(), TrackerError> {
        if self.rows < 2 || self.cols < 2 {
            return Err(TrackerError::InvalidParams(format!(
                "chessboard needs at least 2x2 inner corners, got {}x{}",
                self.rows, self.cols
            )));
        }
        if !self.square_size.is_finite() || self.square_size <= 0.0 {
            return Err(TrackerError::InvalidParams(format!(
                "square size must be positive, got {}",
                self.square_size
            )));
        }
        Ok(())
    }
}

/// Hue window of the single-colour tracker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ColorTrackerParams {
    /// Target hue in degrees.
    pub hue: u16,
    pub hue_delta: u16,
    pub satval_low: u8,
    pub satval_high: u8,
}

impl Default for ColorTrackerParams {
    fn default() -> Self {
        Self {
            hue: 0,
            hue_delta: 20,
            satval_low: 120,
            satval_high: 255,
        }
    }
}

impl ColorTrackerParams {
    pub fn with_hue(hue: u16) -> Self {
        Self {
            hue,
            ..Default::default()
        }
    }

    pub(crate) fn threshold(&self) -> Result<ColorThreshold, TrackerError> {
        if self.hue >= HUE_RANGE {
            return Err(TrackerError::InvalidParams(format!(
                "hue {} is outside [0, {HUE_RANGE})",
                self.hue
            )));
        }
        if self.hue_delta > MAX_HUE_DELTA {
            return Err(TrackerError::InvalidParams(format!(
                "hue delta {} exceeds {MAX_HUE_DELTA}",
                self.hue_delta
            )));
        }
        if self.satval_low > self.satval_high {
            return Err(TrackerError::InvalidParams(format!(
                "saturation/value bounds inverted ({} > {})",
                self.satval_low, self.satval_high
            )));
        }
        Ok(ColorThreshold::new(
            self.hue,
            self.hue_delta,
            self.satval_low,
            self.satval_high,
        ))
    }
}

/// Geometry and solver constants of the colour cross.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CrossParams {
    /// Distance from the origin marker to each arm marker, in scene units.
    pub arm_length: f64,
    /// Focal length assumed by the iterative approximate solver, in pixels.
    pub focal_length: f64,
    pub max_iterations: usize,
    pub epsilon: f64,
}

impl Default for CrossParams {
    fn default() -> Self {
        Self {
            arm_length: 100.0,
            focal_length: 1000.0,
            max_iterations: 100,
            epsilon: 1e-4,
        }
    }
}

impl CrossParams {
    pub fn posit_criteria(&self) -> PositCriteria {
        PositCriteria {
            max_iterations: self.max_iterations,
            epsilon: self.epsilon,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), TrackerError> {
        if !positive(self.arm_length) || !positive(self.focal_length) {
            return Err(TrackerError::InvalidParams(format!(
                "arm length and focal length must be positive, got {} and {}",
                self.arm_length, self.focal_length
            )));
        }
        Ok(())
    }
}

fn positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_constants() {
        let board = ChessboardTrackerParams::default();
        assert_eq!((board.rows, board.cols, board.square_size), (6, 9, 25.0));

        let color = ColorTrackerParams::with_hue(120);
        assert_eq!(color.threshold().expect("valid"), ColorThreshold::new(120, 20, 120, 255));

        let cross = CrossParams::default();
        assert_eq!(cross.posit_criteria(), PositCriteria::default());
        assert_eq!(cross.focal_length, 1000.0);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(ColorTrackerParams::with_hue(360).threshold().is_err());
        let inverted = ColorTrackerParams {
            satval_low: 200,
            satval_high: 100,
            ..Default::default()
        };
        assert!(inverted.threshold().is_err());

        let board = ChessboardTrackerParams {
            rows: 1,
            ..Default::default()
        };
        assert!(board.validate().is_err());

        let cross = CrossParams {
            arm_length: 0.0,
            ..Default::default()
        };
        assert!(cross.validate().is_err());
    }

    #[test]
    fn partial_json_uses_defaults() {
        let params: CrossParams = serde_json::from_str(r#"{"arm_length": 50.0}"#).expect("json");
        assert_eq!(params.arm_length, 50.0);
        assert_eq!(params.max_iterations, 100);
    }
}
