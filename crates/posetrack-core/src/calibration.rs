//! Calibration parameters shared read-only by every tracker.
//!
//! The persisted document is JSON with the fields `intrinsic` (3×3 rows),
//! `distortion` (`[k1, k2, p1, p2]`) and four parallel integer arrays
//! `hues`, `hue_deltas`, `satval_low`, `satval_high`, where position *i*
//! always denotes [`Marker`] *i*.

use crate::camera::Distortion;
use crate::color::{ColorThreshold, HUE_RANGE};
use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Number of colour markers on the reference cross.
pub const MARKER_COUNT: usize = 4;

/// Largest accepted hue half-width, in degrees.
pub const MAX_HUE_DELTA: u16 = HUE_RANGE / 2;

/// The four colour markers, in their fixed calibration order.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Marker {
    /// Green marker at the cross origin.
    Origin,
    /// Red marker.
    ArmA,
    /// Blue marker.
    ArmB,
    /// Yellow marker.
    ArmC,
}

impl Marker {
    pub const ALL: [Marker; MARKER_COUNT] =
        [Marker::Origin, Marker::ArmA, Marker::ArmB, Marker::ArmC];

    pub fn index(self) -> usize {
        match self {
            Marker::Origin => 0,
            Marker::ArmA => 1,
            Marker::ArmB => 2,
            Marker::ArmC => 3,
        }
    }

    pub fn color_name(self) -> &'static str {
        match self {
            Marker::Origin => "green",
            Marker::ArmA => "red",
            Marker::ArmB => "blue",
            Marker::ArmC => "yellow",
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum CalibrationError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("`{field}` must hold exactly 4 entries, got {len}")]
    ArrayLength { field: &'static str, len: usize },
    #[error("hue {value} of marker {marker} is outside [0, 360)")]
    HueOutOfRange { marker: usize, value: i64 },
    #[error("hue delta {value} of marker {marker} is outside [0, 180]")]
    HueDeltaOutOfRange { marker: usize, value: i64 },
    #[error("saturation/value bound {value} of marker {marker} is outside [0, 255]")]
    SatValOutOfRange { marker: usize, value: i64 },
    #[error("saturation/value bounds of marker {marker} are inverted ({low} > {high})")]
    SatValOrder { marker: usize, low: i64, high: i64 },
}

/// Camera intrinsics plus per-marker colour thresholds.
///
/// Immutable once constructed: every constructor validates the invariants
/// (four thresholds, hues in range, `satval_low <= satval_high`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CalibrationDocument", into = "CalibrationDocument")]
pub struct CalibrationParameters {
    intrinsic: Matrix3<f64>,
    distortion: Distortion,
    thresholds: [ColorThreshold; MARKER_COUNT],
}

impl CalibrationParameters {
    pub fn new(
        intrinsic: Matrix3<f64>,
        distortion: Distortion,
        thresholds: [ColorThreshold; MARKER_COUNT],
    ) -> Result<Self, CalibrationError> {
        for (marker, t) in thresholds.iter().enumerate() {
            check_threshold(
                marker,
                t.hue as i64,
                t.hue_delta as i64,
                t.satval_low as i64,
                t.satval_high as i64,
            )?;
        }
        Ok(Self {
            intrinsic,
            distortion,
            thresholds,
        })
    }

    /// Build from the parallel-array layout of the persisted document.
    pub fn from_arrays(
        intrinsic: [[f64; 3]; 3],
        distortion: [f64; 4],
        hues: &[i64],
        hue_deltas: &[i64],
        satval_low: &[i64],
        satval_high: &[i64],
    ) -> Result<Self, CalibrationError> {
        let hues = exact_len("hues", hues)?;
        let hue_deltas = exact_len("hue_deltas", hue_deltas)?;
        let satval_low = exact_len("satval_low", satval_low)?;
        let satval_high = exact_len("satval_high", satval_high)?;

        let mut thresholds = [ColorThreshold::new(0, 0, 0, 0); MARKER_COUNT];
        for (marker, slot) in thresholds.iter_mut().enumerate() {
            let (h, dh, lo, hi) = (
                hues[marker],
                hue_deltas[marker],
                satval_low[marker],
                satval_high[marker],
            );
            check_threshold(marker, h, dh, lo, hi)?;
            *slot = ColorThreshold::new(h as u16, dh as u16, lo as u8, hi as u8);
        }

        Ok(Self {
            intrinsic: Matrix3::from_row_slice(&intrinsic.concat()),
            distortion: Distortion::from_array(distortion),
            thresholds,
        })
    }

    pub fn intrinsic(&self) -> &Matrix3<f64> {
        &self.intrinsic
    }

    pub fn distortion(&self) -> &Distortion {
        &self.distortion
    }

    pub fn threshold(&self, marker: Marker) -> &ColorThreshold {
        &self.thresholds[marker.index()]
    }

    pub fn thresholds(&self) -> &[ColorThreshold; MARKER_COUNT] {
        &self.thresholds
    }

    /// Load and validate a calibration document from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, CalibrationError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, CalibrationError> {
        let doc: CalibrationDocument = serde_json::from_str(raw)?;
        Self::try_from(doc)
    }

    /// Write this calibration to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), CalibrationError> {
        fs::write(path, self.to_json_string()?)?;
        Ok(())
    }

    pub fn to_json_string(&self) -> Result<String, CalibrationError> {
        Ok(serde_json::to_string_pretty(&CalibrationDocument::from(
            self.clone(),
        ))?)
    }
}

fn exact_len<'a>(
    field: &'static str,
    values: &'a [i64],
) -> Result<&'a [i64; MARKER_COUNT], CalibrationError> {
    values.try_into().map_err(|_| CalibrationError::ArrayLength {
        field,
        len: values.len(),
    })
}

fn check_threshold(
    marker: usize,
    hue: i64,
    hue_delta: i64,
    low: i64,
    high: i64,
) -> Result<(), CalibrationError> {
    if !(0..HUE_RANGE as i64).contains(&hue) {
        return Err(CalibrationError::HueOutOfRange { marker, value: hue });
    }
    if !(0..=MAX_HUE_DELTA as i64).contains(&hue_delta) {
        return Err(CalibrationError::HueDeltaOutOfRange {
            marker,
            value: hue_delta,
        });
    }
    for value in [low, high] {
        if !(0..=255).contains(&value) {
            return Err(CalibrationError::SatValOutOfRange { marker, value });
        }
    }
    if low > high {
        return Err(CalibrationError::SatValOrder { marker, low, high });
    }
    Ok(())
}

/// On-disk layout of [`CalibrationParameters`].
#[derive(Clone, Debug, Serialize, Deserialize)]
struct CalibrationDocument {
    intrinsic: [[f64; 3]; 3],
    distortion: [f64; 4],
    hues: Vec<i64>,
    hue_deltas: Vec<i64>,
    satval_low: Vec<i64>,
    satval_high: Vec<i64>,
}

impl TryFrom<CalibrationDocument> for CalibrationParameters {
    type Error = CalibrationError;

    fn try_from(doc: CalibrationDocument) -> Result<Self, Self::Error> {
        Self::from_arrays(
            doc.intrinsic,
            doc.distortion,
            &doc.hues,
            &doc.hue_deltas,
            &doc.satval_low,
            &doc.satval_high,
        )
    }
}

impl From<CalibrationParameters> for CalibrationDocument {
    fn from(params: CalibrationParameters) -> Self {
        let k = params.intrinsic;
        let column =
            |f: fn(&ColorThreshold) -> i64| -> Vec<i64> { params.thresholds.iter().map(f).collect() };
        Self {
            intrinsic: [
                [k[(0, 0)], k[(0, 1)], k[(0, 2)]],
                [k[(1, 0)], k[(1, 1)], k[(1, 2)]],
                [k[(2, 0)], k[(2, 1)], k[(2, 2)]],
            ],
            distortion: params.distortion.to_array(),
            hues: column(|t| t.hue as i64),
            hue_deltas: column(|t| t.hue_delta as i64),
            satval_low: column(|t| t.satval_low as i64),
            satval_high: column(|t| t.satval_high as i64),
        }
    }
}
