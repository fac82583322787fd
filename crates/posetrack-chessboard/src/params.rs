use serde::{Deserialize, Serialize};

/// Neighbour-graph settings of the grid detector.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GridParams {
    /// Corners below this response are ignored.
    pub min_strength: f32,
    pub min_spacing_pix: f32,
    pub max_spacing_pix: f32,
    /// Candidates examined per corner.
    pub k_neighbors: usize,
    pub orientation_tolerance_deg: f32,
}

impl Default for GridParams {
    fn default() -> Self {
        Self {
            min_strength: 0.0,
            min_spacing_pix: 5.0,
            max_spacing_pix: 100.0,
            k_neighbors: 8,
            orientation_tolerance_deg: 22.5,
        }
    }
}
