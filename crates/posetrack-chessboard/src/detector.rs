use std::collections::HashMap;

use log::debug;
use nalgebra::Point2;

use crate::corner::Corner;
use crate::gridgraph::{assign_grid_coordinates, connected_components, GridGraph};
use crate::params::GridParams;

/// Finds a complete `rows × cols` inner-corner grid in a corner cloud.
#[derive(Clone, Debug)]
pub struct ChessboardGridDetector {
    rows: usize,
    cols: usize,
    params: GridParams,
}

impl ChessboardGridDetector {
    pub fn new(rows: usize, cols: usize, params: GridParams) -> Self {
        Self { rows, cols, params }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn params(&self) -> &GridParams {
        &self.params
    }

    /// Corner positions in row-major order (index `r * cols + c`), or `None`
    /// unless exactly one full grid is recovered.
    pub fn detect(&self, corners: &[Corner]) -> Option<Vec<Point2<f64>>> {
        let expected = self.rows * self.cols;
        let strong: Vec<Corner> = corners
            .iter()
            .copied()
            .filter(|c| c.strength >= self.params.min_strength)
            .collect();

        if expected == 0 || strong.len() < expected {
            debug!(
                "{} corners after strength filter, need {}",
                strong.len(),
                expected
            );
            return None;
        }

        let graph = GridGraph::new(&strong, &self.params);
        connected_components(&graph)
            .into_iter()
            .filter(|component| component.len() == expected)
            .find_map(|component| {
                let coords = assign_grid_coordinates(&graph, &component);
                self.order_grid(&strong, &coords)
            })
    }

    /// Map `(node, i, j)` coordinates onto the expected grid, accepting the
    /// board either way round.
    fn order_grid(
        &self,
        corners: &[Corner],
        coords: &[(usize, i32, i32)],
    ) -> Option<Vec<Point2<f64>>> {
        let min_i = coords.iter().map(|c| c.1).min()?;
        let max_i = coords.iter().map(|c| c.1).max()?;
        let min_j = coords.iter().map(|c| c.2).min()?;
        let max_j = coords.iter().map(|c| c.2).max()?;
        let width = (max_i - min_i + 1) as usize;
        let height = (max_j - min_j + 1) as usize;

        let transposed = if width == self.cols && height == self.rows {
            false
        } else if width == self.rows && height == self.cols {
            true
        } else {
            debug!(
                "component spans {}x{}, expected {}x{}",
                width, height, self.cols, self.rows
            );
            return None;
        };

        let mut cells: HashMap<(usize, usize), usize> = HashMap::with_capacity(coords.len());
        for &(node, i, j) in coords {
            let (x, y) = ((i - min_i) as usize, (j - min_j) as usize);
            let (row, col) = if transposed { (x, y) } else { (y, x) };
            if cells.insert((row, col), node).is_some() {
                debug!("inconsistent grid labelling at ({row}, {col})");
                return None;
            }
        }

        (0..self.rows)
            .flat_map(|r| (0..self.cols).map(move |c| (r, c)))
            .map(|cell| {
                cells.get(&cell).map(|&node| {
                    let p = corners[node].position;
                    Point2::new(p.x as f64, p.y as f64)
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_4;

    fn board(cols: usize, rows: usize, spacing: f32, offset: (f32, f32)) -> Vec<Corner> {
        let mut corners = Vec::new();
        for j in 0..rows {
            for i in 0..cols {
                let orientation = if (i + j) % 2 == 0 {
                    FRAC_PI_4
                } else {
                    3.0 * FRAC_PI_4
                };
                corners.push(Corner::new(
                    offset.0 + i as f32 * spacing,
                    offset.1 + j as f32 * spacing,
                    orientation,
                    1.0,
                ));
            }
        }
        corners
    }

    fn params() -> GridParams {
        GridParams {
            min_spacing_pix: 5.0,
            max_spacing_pix: 30.0,
            ..Default::default()
        }
    }

    #[test]
    fn orders_full_grid_row_major() {
        let mut corners = board(5, 4, 20.0, (100.0, 50.0));
        corners.reverse();
        let detector = ChessboardGridDetector::new(4, 5, params());

        let points = detector.detect(&corners).expect("grid");
        assert_eq!(points.len(), 20);
        for r in 0..4 {
            for c in 0..5 {
                let p = points[r * 5 + c];
                assert_eq!(p, Point2::new(100.0 + 20.0 * c as f64, 50.0 + 20.0 * r as f64));
            }
        }
    }

    #[test]
    fn accepts_transposed_board() {
        let corners = board(4, 5, 20.0, (0.0, 0.0));
        let detector = ChessboardGridDetector::new(4, 5, params());

        let points = detector.detect(&corners).expect("grid");
        assert_eq!(points.len(), 20);
        // Row index follows image x, column index follows image y.
        assert_eq!(points[1], Point2::new(0.0, 20.0));
        assert_eq!(points[5], Point2::new(20.0, 0.0));
    }

    #[test]
    fn missing_corner_is_not_a_board() {
        let mut corners = board(5, 4, 20.0, (0.0, 0.0));
        corners.remove(7);
        let detector = ChessboardGridDetector::new(4, 5, params());
        assert!(detector.detect(&corners).is_none());
    }

    #[test]
    fn wrong_dimensions_are_rejected() {
        let corners = board(10, 2, 20.0, (0.0, 0.0));
        let detector = ChessboardGridDetector::new(4, 5, params());
        assert!(detector.detect(&corners).is_none());
    }

    #[test]
    fn weak_corners_are_ignored() {
        let mut corners = board(5, 4, 20.0, (0.0, 0.0));
        corners[0].strength = 0.0;
        let detector = ChessboardGridDetector::new(
            4,
            5,
            GridParams {
                min_strength: 0.5,
                ..params()
            },
        );
        assert!(detector.detect(&corners).is_none());
    }

    #[test]
    fn stray_corners_do_not_break_detection() {
        let mut corners = board(5, 4, 20.0, (0.0, 0.0));
        corners.push(Corner::new(900.0, 900.0, FRAC_PI_4, 1.0));
        let detector = ChessboardGridDetector::new(4, 5, params());
        assert_eq!(detector.detect(&corners).map(|p| p.len()), Some(20));
    }
}
