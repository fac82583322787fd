use nalgebra::Point2;

/// A detected chessboard corner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Corner {
    /// Sub-pixel position in image coordinates.
    pub position: Point2<f32>,
    /// Direction of the diagonal along the bright squares, radians modulo π.
    pub orientation: f32,
    /// Detector response.
    pub strength: f32,
}

impl Corner {
    pub fn new(x: f32, y: f32, orientation: f32, strength: f32) -> Self {
        Self {
            position: Point2::new(x, y),
            orientation,
            strength,
        }
    }
}
