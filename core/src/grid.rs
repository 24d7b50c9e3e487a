//! Pixel-space grid fitting and hit-testing.

use glam::Vec2;

use crate::{Dimensions, Vector};

/// Default upper bound for the rendered cell size in pixels.
pub const DEFAULT_MAX_CELL_SIZE: f32 = 50.0;

/// Computes the largest square cell size that fits `required` cells into `available` pixels.
///
/// Returns `0.0` when either required dimension is zero.
#[must_use]
pub fn fit_cell_size(available: Vec2, required: Dimensions) -> f32 {
    if required.width == 0 || required.height == 0 {
        return 0.0;
    }

    let horizontal = available.x / required.width as f32;
    let vertical = available.y / required.height as f32;
    horizontal.min(vertical).max(0.0)
}

/// Uniform cell size and the translation that centres the grid on a canvas.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridFit {
    /// Side length of a cell in pixels.
    pub cell_size: f32,
    /// Pixel position of the grid's upper-left corner.
    pub offset: Vec2,
}

impl GridFit {
    /// Fit used before any canvas was measured.
    pub const EMPTY: Self = Self {
        cell_size: 0.0,
        offset: Vec2::ZERO,
    };

    /// Fits the grid into `canvas`, capping the cell size at `max_cell_size`.
    ///
    /// Without dimensions the cell size is zero and the offset is the canvas
    /// midpoint.
    #[must_use]
    pub fn compute(canvas: Vec2, dimensions: Option<Dimensions>, max_cell_size: f32) -> Self {
        let Some(dimensions) = dimensions else {
            return Self {
                cell_size: 0.0,
                offset: canvas * 0.5,
            };
        };

        let cell_size = fit_cell_size(canvas, dimensions).min(max_cell_size.max(0.0));
        let grid = Vec2::new(
            cell_size * dimensions.width as f32,
            cell_size * dimensions.height as f32,
        );

        Self {
            cell_size,
            offset: (canvas - grid) * 0.5,
        }
    }

    /// Pixel position of the upper-left corner of `cell`.
    #[must_use]
    pub fn cell_origin(&self, cell: Vec2) -> Vec2 {
        self.offset + cell * self.cell_size
    }

    /// Maps a pixel position to the cell beneath it.
    #[must_use]
    pub fn cell_at(&self, dimensions: Dimensions, position: Vec2) -> Option<Vector> {
        cell_from_position(self.offset, dimensions, position, self.cell_size)
    }
}

/// Returns the grid cell under `position`, or `None` when it misses the grid.
///
/// A position lying exactly on the far edge maps to the last row or column.
#[must_use]
pub fn cell_from_position(
    origin: Vec2,
    dimensions: Dimensions,
    position: Vec2,
    cell_size: f32,
) -> Option<Vector> {
    if cell_size <= 0.0 || dimensions.width == 0 || dimensions.height == 0 {
        return None;
    }

    let local = position - origin;
    let extent = Vec2::new(
        cell_size * dimensions.width as f32,
        cell_size * dimensions.height as f32,
    );
    if local.x < 0.0 || local.y < 0.0 || local.x > extent.x || local.y > extent.y {
        return None;
    }

    let last = dimensions.last_cell();
    let column = ((local.x / cell_size).floor() as i32).min(last.x);
    let row = ((local.y / cell_size).floor() as i32).min(last.y);
    Some(Vector::new(column, row))
}
