//! Chessboard grid recovery from a cloud of ChESS corners.
//!
//! 1. Drop weak corners.
//! 2. Link each corner to at most one neighbour per image direction, using a
//!    kd-tree query and the ChESS orientation relation (neighbouring corners
//!    have orthogonal diagonals, the edge between them sits at 45° to both).
//! 3. Walk each connected component and assign integer grid coordinates.
//! 4. Accept the component that fills exactly `rows × cols` cells and emit
//!    its corners in row-major order.

mod corner;
mod detector;
mod geom;
mod gridgraph;
mod params;

pub use corner::Corner;
pub use detector::ChessboardGridDetector;
pub use gridgraph::{
    assign_grid_coordinates, connected_components, GridGraph, NeighborDirection, NodeNeighbor,
};
pub use params::GridParams;
