#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Level editor system: an editable layout, a grid size and the tools that
//! mutate them in response to pointer input.
//!
//! Pointer positions are canvas pixels. The editor maps them to cells through
//! its own [`GridFit`], applies the current [`Tool`] and bumps its revision
//! whenever the layout or the selection actually changed, so adapters redraw
//! only when needed.

mod tools;

use glam::Vec2;
use sokoban_core::{grid::GridFit, Dimensions, Level, LevelError, LevelLayout, Vector};
use tracing::{debug, trace};

pub use tools::{check_transform, BuilderTool, Selection, Tool, TransferorTool};

/// Grid size of a fresh editor.
pub const DEFAULT_GRID_SIZE: Dimensions = Dimensions::new(5, 5);

/// Inclusive rectangle of cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CellSpan {
    /// Upper-left cell.
    pub min: Vector,
    /// Lower-right cell.
    pub max: Vector,
}

impl CellSpan {
    /// Creates the span covering both corners.
    #[must_use]
    pub fn covering(a: Vector, b: Vector) -> Self {
        Self {
            min: Vector::new(a.x.min(b.x), a.y.min(b.y)),
            max: Vector::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// Reports whether `cell` lies inside the span.
    #[must_use]
    pub const fn contains(&self, cell: Vector) -> bool {
        cell.x >= self.min.x && cell.x <= self.max.x && cell.y >= self.min.y && cell.y <= self.max.y
    }

    /// Iterates the span row by row.
    pub fn cells(&self) -> impl Iterator<Item = Vector> {
        let Self { min, max } = *self;
        (min.y..=max.y).flat_map(move |y| (min.x..=max.x).map(move |x| Vector::new(x, y)))
    }
}

/// Snapshot of the edited level.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditorMetaInfo {
    /// Current layout.
    pub layout: LevelLayout,
    /// Current grid size.
    pub size: Dimensions,
}

/// Stateful level editor.
#[derive(Clone, Debug)]
pub struct Editor {
    layout: LevelLayout,
    size: Dimensions,
    canvas: Vec2,
    grid_fit: GridFit,
    tool: Option<Tool>,
    selection: Selection,
    anchor: Option<Vector>,
    rubber_band: Option<(Vec2, Vec2)>,
    revision: u64,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

impl Editor {
    /// Creates an editor with an empty 5x5 grid and the start in its centre.
    #[must_use]
    pub fn new() -> Self {
        Self {
            layout: LevelLayout::empty(centre_of(DEFAULT_GRID_SIZE)),
            size: DEFAULT_GRID_SIZE,
            canvas: Vec2::ZERO,
            grid_fit: GridFit::EMPTY,
            tool: None,
            selection: Selection::default(),
            anchor: None,
            rubber_band: None,
            revision: 0,
        }
    }

    /// Selects the tool applied by subsequent drags.
    pub fn set_current_tool(&mut self, tool: Tool) {
        debug!(tool = tool.name(), "editor tool selected");
        self.tool = Some(tool);
    }

    /// Currently selected tool, if any.
    #[must_use]
    pub const fn current_tool(&self) -> Option<Tool> {
        self.tool
    }

    /// Records the cell under `position` as the anchor for transfer drags.
    pub fn on_cell_drag_start(&mut self, position: Vec2) {
        self.anchor = self.cell_at(position);
    }

    /// Applies the current tool at the cell under `position`.
    ///
    /// Returns whether the layout changed.
    pub fn on_cell_drag(&mut self, position: Vec2) -> bool {
        let (Some(tool), Some(cell)) = (self.tool, self.cell_at(position)) else {
            return false;
        };

        let changed = match tool {
            Tool::Builder(builder) => builder.apply(&mut self.layout, cell),
            Tool::Transferor(transferor) => {
                let Some(anchor) = self.anchor else {
                    self.anchor = Some(cell);
                    return false;
                };
                let moved =
                    transferor.apply(&mut self.layout, &mut self.selection, cell - anchor, self.size);
                if moved {
                    self.anchor = Some(cell);
                } else if cell != anchor {
                    trace!(?anchor, ?cell, "selection transfer rejected");
                }
                moved
            }
        };

        if changed {
            self.touch();
        }
        changed
    }

    /// Begins a rubber-band selection at `position`, dropping the previous one.
    pub fn on_selection_start(&mut self, position: Vec2) {
        self.selection.clear();
        self.rubber_band = Some((position, position));
        self.touch();
    }

    /// Extends the rubber band to `position`.
    pub fn on_selection_move(&mut self, position: Vec2) {
        let Some((origin, cursor)) = self.rubber_band else {
            return;
        };
        if cursor == position {
            return;
        }

        let before = self.selection_rect();
        self.rubber_band = Some((origin, position));
        if self.selection_rect() != before {
            self.touch();
        }
    }

    /// Finishes the rubber band and selects every occupied cell inside it.
    pub fn on_selection_end(&mut self, position: Vec2) {
        if self.rubber_band.is_none() {
            return;
        }
        self.on_selection_move(position);

        let span = self.selection_rect();
        self.rubber_band = None;
        self.anchor = self.cell_at(position);
        self.selection = match span {
            Some(span) => Selection::from_cells(
                span.cells().filter(|cell| self.layout.is_occupied(*cell)),
            ),
            None => Selection::default(),
        };
        debug!(selected = self.selection.len(), "selection finished");
        self.touch();
    }

    /// Drops the selection and any rubber band in progress.
    pub fn clear_selection(&mut self) {
        if self.selection.is_empty() && self.rubber_band.is_none() {
            return;
        }
        self.selection.clear();
        self.rubber_band = None;
        self.touch();
    }

    /// Resizes the grid, discarding elements that no longer fit.
    ///
    /// Each dimension is clamped between one cell and
    /// [`Dimensions::MAX_SIDE`]. A start that falls off
    /// the grid moves to the origin, clearing whatever occupied it.
    pub fn update_grid_size(&mut self, size: Dimensions) {
        let size = Dimensions::new(
            size.width.clamp(1, Dimensions::MAX_SIDE),
            size.height.clamp(1, Dimensions::MAX_SIDE),
        );
        if size == self.size {
            return;
        }

        self.size = size;
        self.layout.boxes.retain(|cell| size.contains(*cell));
        self.layout.targets.retain(|cell| size.contains(*cell));
        self.layout.walls.retain(|cell| size.contains(*cell));
        if !size.contains(self.layout.start) {
            self.layout.start = Vector::ZERO;
            if BuilderTool::Rubber.apply(&mut self.layout, Vector::ZERO) {
                trace!("element under the relocated start removed");
            }
        }
        self.selection.retain(|cell| size.contains(*cell));
        self.refresh_grid();
        debug!(width = size.width, height = size.height, "editor grid resized");
        self.touch();
    }

    /// Refits the grid to a canvas of the given size in pixels.
    pub fn update_dimensions(&mut self, canvas: Vec2) {
        self.canvas = canvas;
        self.refresh_grid();
    }

    /// Replaces the edited level.
    pub fn load_level(&mut self, level: &Level) {
        self.layout = level.layout().clone();
        self.size = level.dimensions();
        self.selection.clear();
        self.rubber_band = None;
        self.anchor = None;
        self.refresh_grid();
        self.touch();
    }

    /// Empties the grid, keeping its size, and centres the start.
    pub fn clear(&mut self) {
        self.layout = LevelLayout::empty(centre_of(self.size));
        self.selection.clear();
        self.rubber_band = None;
        self.touch();
    }

    /// Exports the edited level.
    pub fn level(&self) -> Result<Level, LevelError> {
        Level::new(self.size.width, self.size.height, self.layout.clone())
    }

    /// Current layout and grid size.
    #[must_use]
    pub fn meta_info(&self) -> EditorMetaInfo {
        EditorMetaInfo {
            layout: self.layout.clone(),
            size: self.size,
        }
    }

    /// Current layout.
    #[must_use]
    pub const fn layout(&self) -> &LevelLayout {
        &self.layout
    }

    /// Current grid size.
    #[must_use]
    pub const fn size(&self) -> Dimensions {
        self.size
    }

    /// Selected cells.
    #[must_use]
    pub const fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Cells covered by the rubber band in progress, clamped to the grid.
    #[must_use]
    pub fn selection_rect(&self) -> Option<CellSpan> {
        let (origin, cursor) = self.rubber_band?;
        let a = self.clamped_cell_at(origin)?;
        let b = self.clamped_cell_at(cursor)?;
        Some(CellSpan::covering(a, b))
    }

    /// Cell size and offset used to map pointer positions.
    #[must_use]
    pub const fn grid_fit(&self) -> GridFit {
        self.grid_fit
    }

    /// Counter bumped on every visible change.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    fn refresh_grid(&mut self) {
        self.grid_fit = GridFit::compute(self.canvas, Some(self.size), f32::MAX);
    }

    fn cell_at(&self, position: Vec2) -> Option<Vector> {
        self.grid_fit.cell_at(self.size, position)
    }

    fn clamped_cell_at(&self, position: Vec2) -> Option<Vector> {
        let cell_size = self.grid_fit.cell_size;
        if cell_size <= 0.0 {
            return None;
        }

        let local = (position - self.grid_fit.offset) / cell_size;
        let last = self.size.last_cell();
        let column = (local.x.floor() as i32).clamp(0, last.x.max(0));
        let row = (local.y.floor() as i32).clamp(0, last.y.max(0));
        Some(Vector::new(column, row))
    }
}

fn centre_of(size: Dimensions) -> Vector {
    Vector::new((size.width / 2) as i32, (size.height / 2) as i32)
}
