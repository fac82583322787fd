//! Colour calibration: sample one hue per marker and build
//! [`CalibrationParameters`].
//!
//! Samples are taken in [`Marker::ALL`] order (green, red, blue, yellow).
//! Every marker gets the same hue half-width and saturation/value window.

use image::GrayImage;
use log::info;
use nalgebra::Matrix3;
use posetrack_core::{
    in_range, CalibrationError, CalibrationParameters, ColorThreshold, Distortion, HsvImage,
    Marker, MARKER_COUNT,
};

#[derive(thiserror::Error, Debug)]
pub enum CalibrateError {
    #[error("sample ({x}, {y}) is outside the {width}x{height} image")]
    OutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },

    #[error("all 4 hues are already sampled")]
    Full,

    #[error("expected 4 hues, got {got}")]
    Incomplete { got: usize },

    #[error(transparent)]
    Calibration(#[from] CalibrationError),
}

/// Accumulates marker hues sampled from an HSV image.
#[derive(Clone, Debug)]
pub struct HueSampler {
    hues: Vec<u16>,
    hue_delta: u16,
    satval_low: u8,
    satval_high: u8,
}

impl Default for HueSampler {
    fn default() -> Self {
        Self::with_window(10, 120, 255)
    }
}

impl HueSampler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_window(hue_delta: u16, satval_low: u8, satval_high: u8) -> Self {
        Self {
            hues: Vec::with_capacity(MARKER_COUNT),
            hue_delta,
            satval_low,
            satval_high,
        }
    }

    /// Record the hue at `(x, y)` for the next marker and return it.
    pub fn sample(&mut self, hsv: &HsvImage, x: u32, y: u32) -> Result<u16, CalibrateError> {
        if self.hues.len() == MARKER_COUNT {
            return Err(CalibrateError::Full);
        }
        if x >= hsv.width || y >= hsv.height {
            return Err(CalibrateError::OutOfBounds {
                x,
                y,
                width: hsv.width,
                height: hsv.height,
            });
        }
        let hue = hsv.get(x, y).h;
        let marker = Marker::ALL[self.hues.len()];
        info!("{} marker hue: {hue}", marker.color_name());
        self.hues.push(hue);
        Ok(hue)
    }

    pub fn hues(&self) -> &[u16] {
        &self.hues
    }

    pub fn is_complete(&self) -> bool {
        self.hues.len() == MARKER_COUNT
    }

    /// Threshold window for a sampled marker.
    pub fn threshold(&self, marker: Marker) -> Option<ColorThreshold> {
        self.hues.get(marker.index()).map(|&hue| {
            ColorThreshold::new(hue, self.hue_delta, self.satval_low, self.satval_high)
        })
    }

    /// Binary mask a sampled marker's window selects in `hsv`.
    pub fn preview(&self, hsv: &HsvImage, marker: Marker) -> Option<GrayImage> {
        self.threshold(marker).map(|t| in_range(hsv, &t))
    }

    /// Parameters with the given camera model.
    pub fn build(
        &self,
        intrinsic: Matrix3<f64>,
        distortion: Distortion,
    ) -> Result<CalibrationParameters, CalibrateError> {
        let mut thresholds = [ColorThreshold::new(0, 0, 0, 0); MARKER_COUNT];
        for (slot, marker) in thresholds.iter_mut().zip(Marker::ALL) {
            *slot = self.threshold(marker).ok_or(CalibrateError::Incomplete {
                got: self.hues.len(),
            })?;
        }
        Ok(CalibrationParameters::new(intrinsic, distortion, thresholds)?)
    }

    /// Parameters with a zero camera model, to be filled in by a camera
    /// calibration later.
    pub fn finish(&self) -> Result<CalibrationParameters, CalibrateError> {
        self.build(Matrix3::zeros(), Distortion::default())
    }
}
