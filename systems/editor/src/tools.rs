//! Editing tools and the cell selection they operate on.

use sokoban_core::{Dimensions, ElementKind, LevelLayout, Vector};

/// Tool that edits a single cell per application.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BuilderTool {
    /// Places one element of the given kind on an empty cell.
    Stamp(ElementKind),
    /// Removes every box, target and wall from a cell. The start is kept.
    Rubber,
}

impl BuilderTool {
    /// Applies the tool to `cell`, returning whether the layout changed.
    ///
    /// Stamping never places an element on an occupied cell, the player start
    /// included.
    pub fn apply(&self, layout: &mut LevelLayout, cell: Vector) -> bool {
        match self {
            Self::Stamp(kind) => {
                if layout.is_occupied(cell) {
                    return false;
                }
                layout.positions_mut(*kind).push(cell);
                true
            }
            Self::Rubber => {
                let mut removed = false;
                for kind in ElementKind::ALL {
                    let positions = layout.positions_mut(kind);
                    let before = positions.len();
                    positions.retain(|position| *position != cell);
                    removed |= positions.len() != before;
                }
                removed
            }
        }
    }
}

/// Tool that rigidly translates the selected cells.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TransferorTool;

impl TransferorTool {
    /// Moves every selected element by `shift` if the whole move is legal.
    ///
    /// Returns `false` and leaves both the layout and the selection untouched
    /// when the shift is zero, the selection is empty, or
    /// [`check_transform`] rejects the move.
    pub fn apply(
        &self,
        layout: &mut LevelLayout,
        selection: &mut Selection,
        shift: Vector,
        dimensions: Dimensions,
    ) -> bool {
        if shift == Vector::ZERO || selection.is_empty() {
            return false;
        }
        if !check_transform(layout, selection, shift, dimensions) {
            return false;
        }

        for kind in ElementKind::ALL {
            for position in layout.positions_mut(kind) {
                if selection.contains(*position) {
                    *position = *position + shift;
                }
            }
        }
        if selection.contains(layout.start) {
            layout.start = layout.start + shift;
        }
        selection.translate(shift);
        true
    }
}

/// Reports whether shifting every selected cell by `shift` stays on the grid
/// and lands only on empty or selected cells.
#[must_use]
pub fn check_transform(
    layout: &LevelLayout,
    selection: &Selection,
    shift: Vector,
    dimensions: Dimensions,
) -> bool {
    selection.cells().iter().all(|cell| {
        let destination = *cell + shift;
        dimensions.contains(destination)
            && (!layout.is_occupied(destination) || selection.contains(destination))
    })
}

/// Closed set of editor tools.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tool {
    /// Single-cell stamping or erasing, applied while dragging.
    Builder(BuilderTool),
    /// Selection translation, applied while dragging.
    Transferor(TransferorTool),
}

impl Tool {
    /// Places boxes.
    pub const BOX_BUILDER: Self = Self::Builder(BuilderTool::Stamp(ElementKind::Box));
    /// Places walls.
    pub const WALL_BUILDER: Self = Self::Builder(BuilderTool::Stamp(ElementKind::Wall));
    /// Places targets.
    pub const TARGET_BUILDER: Self = Self::Builder(BuilderTool::Stamp(ElementKind::Target));
    /// Erases elements.
    pub const RUBBER: Self = Self::Builder(BuilderTool::Rubber);
    /// Moves the current selection.
    pub const ELEMENTS_TRANSFEROR: Self = Self::Transferor(TransferorTool);

    /// Every tool in toolbar order.
    pub const ALL: [Tool; 5] = [
        Self::BOX_BUILDER,
        Self::WALL_BUILDER,
        Self::TARGET_BUILDER,
        Self::RUBBER,
        Self::ELEMENTS_TRANSFEROR,
    ];

    /// Human readable tool name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Builder(BuilderTool::Stamp(ElementKind::Box)) => "Box builder",
            Self::Builder(BuilderTool::Stamp(ElementKind::Wall)) => "Wall builder",
            Self::Builder(BuilderTool::Stamp(ElementKind::Target)) => "Target builder",
            Self::Builder(BuilderTool::Rubber) => "Rubber",
            Self::Transferor(_) => "Elements transferor",
        }
    }
}

/// Set of selected cells, kept free of duplicates.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    cells: Vec<Vector>,
}

impl Selection {
    /// Creates a selection from `cells`, dropping duplicates.
    #[must_use]
    pub fn from_cells(cells: impl IntoIterator<Item = Vector>) -> Self {
        let mut selection = Self::default();
        for cell in cells {
            if !selection.contains(cell) {
                selection.cells.push(cell);
            }
        }
        selection
    }

    /// Selected cells in insertion order.
    #[must_use]
    pub fn cells(&self) -> &[Vector] {
        &self.cells
    }

    /// Reports whether `cell` is selected.
    #[must_use]
    pub fn contains(&self, cell: Vector) -> bool {
        self.cells.contains(&cell)
    }

    /// Reports whether nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Number of selected cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub(crate) fn clear(&mut self) {
        self.cells.clear();
    }

    pub(crate) fn retain(&mut self, keep: impl FnMut(&Vector) -> bool) {
        self.cells.retain(keep);
    }

    fn translate(&mut self, shift: Vector) {
        for cell in &mut self.cells {
            *cell = *cell + shift;
        }
    }
}
