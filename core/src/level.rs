//! Level descriptions and layout compatibility rules.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Vector;

/// Kinds of placeable level elements besides the player start.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    /// Pushable box.
    Box,
    /// Cell that must be covered by a box.
    Target,
    /// Impassable wall.
    Wall,
}

impl ElementKind {
    /// Every element kind in the order cells are classified.
    pub const ALL: [ElementKind; 3] = [Self::Box, Self::Target, Self::Wall];
}

/// Width and height of a level grid measured in cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    /// Number of columns.
    pub width: u32,
    /// Number of rows.
    pub height: u32,
}

impl Dimensions {
    /// Largest side a grid can have while every cell stays addressable.
    pub const MAX_SIDE: u32 = i32::MAX as u32;

    /// Creates a new dimension descriptor.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Reports whether the cell lies inside the grid.
    #[must_use]
    pub const fn contains(&self, cell: Vector) -> bool {
        cell.is_within(self.width, self.height)
    }

    /// Bottom-right cell, with each side capped at [`Self::MAX_SIDE`].
    ///
    /// Components are negative when the matching side is zero.
    #[must_use]
    pub const fn last_cell(&self) -> Vector {
        Vector::new(last_index(self.width), last_index(self.height))
    }
}

const fn last_index(side: u32) -> i32 {
    if side > Dimensions::MAX_SIDE {
        i32::MAX - 1
    } else {
        side as i32 - 1
    }
}

/// Placement of every game element.
///
/// The structure does not prevent overlapping elements; the runner and the
/// editor enforce that at mutation time.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelLayout {
    /// Player position.
    pub start: Vector,
    /// Box positions.
    pub boxes: Vec<Vector>,
    /// Target positions.
    pub targets: Vec<Vector>,
    /// Wall positions.
    pub walls: Vec<Vector>,
}

impl LevelLayout {
    /// Creates an empty layout with the player at `start`.
    #[must_use]
    pub const fn empty(start: Vector) -> Self {
        Self {
            start,
            boxes: Vec::new(),
            targets: Vec::new(),
            walls: Vec::new(),
        }
    }

    /// Positions of the elements of the given kind.
    #[must_use]
    pub fn positions(&self, kind: ElementKind) -> &[Vector] {
        match kind {
            ElementKind::Box => &self.boxes,
            ElementKind::Target => &self.targets,
            ElementKind::Wall => &self.walls,
        }
    }

    /// Mutable access to the positions of the elements of the given kind.
    pub fn positions_mut(&mut self, kind: ElementKind) -> &mut Vec<Vector> {
        match kind {
            ElementKind::Box => &mut self.boxes,
            ElementKind::Target => &mut self.targets,
            ElementKind::Wall => &mut self.walls,
        }
    }

    /// First element found at the cell, scanning boxes, then targets, then walls.
    #[must_use]
    pub fn element_at(&self, cell: Vector) -> Option<ElementKind> {
        ElementKind::ALL
            .into_iter()
            .find(|kind| self.positions(*kind).contains(&cell))
    }

    /// Reports whether anything, the player start included, occupies the cell.
    #[must_use]
    pub fn is_occupied(&self, cell: Vector) -> bool {
        self.start == cell || self.element_at(cell).is_some()
    }

    /// Iterator over every position in the layout, the start first.
    pub fn all_positions(&self) -> impl Iterator<Item = Vector> + '_ {
        std::iter::once(self.start)
            .chain(self.boxes.iter().copied())
            .chain(self.targets.iter().copied())
            .chain(self.walls.iter().copied())
    }
}

/// Errors raised while constructing a [`Level`].
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum LevelError {
    /// Both dimensions must lie between one and [`Dimensions::MAX_SIDE`] cells.
    #[error("level dimensions must be between 1 and 2147483647 (received {width}x{height})")]
    InvalidDimensions {
        /// Provided width.
        width: u32,
        /// Provided height.
        height: u32,
    },
}

/// Canonical puzzle definition: fixed dimensions plus the starting layout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawLevel", into = "RawLevel")]
pub struct Level {
    dimensions: Dimensions,
    layout: LevelLayout,
}

impl Level {
    /// Creates a level, rejecting empty or unaddressable dimensions.
    pub fn new(width: u32, height: u32, layout: LevelLayout) -> Result<Self, LevelError> {
        let side = 1..=Dimensions::MAX_SIDE;
        if !side.contains(&width) || !side.contains(&height) {
            return Err(LevelError::InvalidDimensions { width, height });
        }

        Ok(Self {
            dimensions: Dimensions::new(width, height),
            layout,
        })
    }

    /// Number of columns.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.dimensions.width
    }

    /// Number of rows.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.dimensions.height
    }

    /// Grid dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Starting layout.
    #[must_use]
    pub const fn layout(&self) -> &LevelLayout {
        &self.layout
    }
}

#[derive(Serialize, Deserialize)]
struct RawLevel {
    width: u32,
    height: u32,
    #[serde(flatten)]
    layout: LevelLayout,
}

impl TryFrom<RawLevel> for Level {
    type Error = LevelError;

    fn try_from(raw: RawLevel) -> Result<Self, Self::Error> {
        Level::new(raw.width, raw.height, raw.layout)
    }
}

impl From<Level> for RawLevel {
    fn from(level: Level) -> Self {
        Self {
            width: level.dimensions.width,
            height: level.dimensions.height,
            layout: level.layout,
        }
    }
}

/// Checks whether `layout` can replace the live layout of `level`.
///
/// Element counts must match per kind and every position, the start
/// included, must lie inside the level bounds.
#[must_use]
pub fn is_layout_compatible(layout: &LevelLayout, level: &Level) -> bool {
    let counts_match = ElementKind::ALL
        .into_iter()
        .all(|kind| layout.positions(kind).len() == level.layout.positions(kind).len());
    if !counts_match {
        return false;
    }

    let dimensions = level.dimensions();
    layout.all_positions().all(|cell| dimensions.contains(cell))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level() -> Level {
        Level::new(
            5,
            5,
            LevelLayout {
                start: Vector::new(3, 2),
                boxes: vec![Vector::new(1, 0), Vector::new(1, 1)],
                targets: vec![Vector::new(1, 3)],
                walls: Vec::new(),
            },
        )
        .expect("valid level")
    }

    fn layout() -> LevelLayout {
        LevelLayout {
            start: Vector::new(2, 2),
            boxes: vec![Vector::new(0, 0), Vector::new(0, 1)],
            targets: vec![Vector::new(0, 3)],
            walls: Vec::new(),
        }
    }

    #[test]
    fn compatible_layouts_are_accepted() {
        assert!(is_layout_compatible(&layout(), &level()));
    }

    #[test]
    fn start_outside_bounds_is_incompatible() {
        let copy = LevelLayout {
            start: Vector::new(5, 2),
            ..layout()
        };
        assert!(!is_layout_compatible(&copy, &level()));
    }

    #[test]
    fn element_outside_bounds_is_incompatible() {
        let copy = LevelLayout {
            targets: vec![Vector::new(3, 5)],
            ..layout()
        };
        assert!(!is_layout_compatible(&copy, &level()));
    }

    #[test]
    fn negative_positions_are_incompatible() {
        let copy = LevelLayout {
            boxes: vec![Vector::new(-1, 0), Vector::new(0, 1)],
            ..layout()
        };
        assert!(!is_layout_compatible(&copy, &level()));
    }

    #[test]
    fn missing_box_is_incompatible() {
        let copy = LevelLayout {
            boxes: vec![Vector::new(1, 0)],
            ..layout()
        };
        assert!(!is_layout_compatible(&copy, &level()));
    }

    #[test]
    fn extra_wall_is_incompatible() {
        let copy = LevelLayout {
            walls: vec![Vector::new(4, 4)],
            ..layout()
        };
        assert!(!is_layout_compatible(&copy, &level()));
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        assert_eq!(
            Level::new(0, 3, LevelLayout::default()),
            Err(LevelError::InvalidDimensions {
                width: 0,
                height: 3
            })
        );
    }

    #[test]
    fn unaddressable_dimensions_are_rejected() {
        assert!(Level::new(Dimensions::MAX_SIDE, 1, LevelLayout::default()).is_ok());
        assert_eq!(
            Level::new(1, u32::MAX, LevelLayout::default()),
            Err(LevelError::InvalidDimensions {
                width: 1,
                height: u32::MAX
            })
        );
        assert_eq!(
            Dimensions::new(u32::MAX, 0).last_cell(),
            Vector::new(i32::MAX - 1, -1)
        );
    }

    #[test]
    fn element_at_prefers_boxes_over_targets() {
        let layout = LevelLayout {
            start: Vector::new(0, 0),
            boxes: vec![Vector::new(1, 1)],
            targets: vec![Vector::new(1, 1), Vector::new(2, 2)],
            walls: vec![Vector::new(3, 3)],
        };
        assert_eq!(layout.element_at(Vector::new(1, 1)), Some(ElementKind::Box));
        assert_eq!(
            layout.element_at(Vector::new(2, 2)),
            Some(ElementKind::Target)
        );
        assert_eq!(layout.element_at(Vector::new(3, 3)), Some(ElementKind::Wall));
        assert_eq!(layout.element_at(Vector::new(0, 0)), None);
        assert!(layout.is_occupied(Vector::new(0, 0)));
    }

    #[test]
    fn level_json_shape_is_flat() {
        let json = serde_json::to_value(level()).expect("serialize");
        assert_eq!(json["width"], 5);
        assert_eq!(json["height"], 5);
        assert_eq!(json["start"], serde_json::json!({ "x": 3, "y": 2 }));
        assert_eq!(json["boxes"].as_array().map(Vec::len), Some(2));

        let restored: Level = serde_json::from_value(json).expect("deserialize");
        assert_eq!(restored, level());
    }

    #[test]
    fn deserialising_zero_width_level_fails() {
        let json = serde_json::json!({
            "width": 0,
            "height": 2,
            "start": { "x": 0, "y": 0 },
            "boxes": [],
            "targets": [],
            "walls": [],
        });
        assert!(serde_json::from_value::<Level>(json).is_err());
    }
}
