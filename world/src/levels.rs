//! Built-in level tables.

use sokoban_core::{Level, LevelLayout, Vector};

/// Named, ordered collection of levels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LevelSet {
    /// Display name of the set.
    pub name: &'static str,
    /// Levels in play order.
    pub levels: Vec<Level>,
}

type Cells = &'static [(i32, i32)];

struct Blueprint {
    width: u32,
    height: u32,
    start: (i32, i32),
    boxes: Cells,
    targets: Cells,
    walls: Cells,
}

impl Blueprint {
    fn build(&self) -> Option<Level> {
        let cells = |cells: Cells| -> Vec<Vector> {
            cells.iter().map(|(x, y)| Vector::new(*x, *y)).collect()
        };
        let layout = LevelLayout {
            start: Vector::new(self.start.0, self.start.1),
            boxes: cells(self.boxes),
            targets: cells(self.targets),
            walls: cells(self.walls),
        };
        Level::new(self.width, self.height, layout).ok()
    }
}

const NOVICE: &[Blueprint] = &[
    Blueprint {
        width: 5,
        height: 3,
        start: (0, 1),
        boxes: &[(2, 1)],
        targets: &[(3, 1)],
        walls: &[],
    },
    Blueprint {
        width: 4,
        height: 4,
        start: (0, 0),
        boxes: &[(1, 1)],
        targets: &[(1, 3)],
        walls: &[(3, 0)],
    },
    Blueprint {
        width: 5,
        height: 5,
        start: (2, 2),
        boxes: &[(1, 2), (3, 2)],
        targets: &[(0, 2), (4, 2)],
        walls: &[(2, 0), (2, 4)],
    },
];

const CLASSIC: &[Blueprint] = &[
    Blueprint {
        width: 3,
        height: 7,
        start: (1, 1),
        boxes: &[(1, 3)],
        targets: &[(1, 5)],
        walls: &[(0, 3), (2, 3)],
    },
    Blueprint {
        width: 5,
        height: 5,
        start: (3, 2),
        boxes: &[(2, 2)],
        targets: &[(0, 4)],
        walls: &[(0, 1), (0, 2), (0, 3), (1, 3), (2, 3)],
    },
    Blueprint {
        width: 5,
        height: 5,
        start: (3, 0),
        boxes: &[(2, 0), (3, 4)],
        targets: &[(0, 4), (4, 0)],
        walls: &[(0, 3), (1, 3), (3, 1), (4, 1)],
    },
    Blueprint {
        width: 5,
        height: 5,
        start: (2, 1),
        boxes: &[(3, 2), (1, 2)],
        targets: &[(0, 4), (2, 2)],
        walls: &[(2, 0), (0, 1), (4, 1), (3, 3), (1, 0), (0, 0), (3, 1)],
    },
    Blueprint {
        width: 6,
        height: 6,
        start: (4, 4),
        boxes: &[(3, 4), (3, 3), (4, 3)],
        targets: &[(1, 0), (1, 1), (0, 1)],
        walls: &[(1, 2), (2, 2), (2, 3)],
    },
    Blueprint {
        width: 5,
        height: 7,
        start: (2, 4),
        boxes: &[(3, 4), (1, 4)],
        targets: &[(4, 5), (0, 3)],
        walls: &[(1, 3), (1, 5), (3, 5), (3, 3), (0, 6), (2, 0)],
    },
];

fn build_set(name: &'static str, blueprints: &[Blueprint]) -> LevelSet {
    LevelSet {
        name,
        levels: blueprints.iter().filter_map(Blueprint::build).collect(),
    }
}

/// Every built-in level set, easiest first.
#[must_use]
pub fn builtin_sets() -> Vec<LevelSet> {
    vec![build_set("Novice", NOVICE), build_set("Classic", CLASSIC)]
}

/// Looks up a built-in set by case-insensitive name.
#[must_use]
pub fn builtin_set(name: &str) -> Option<LevelSet> {
    builtin_sets()
        .into_iter()
        .find(|set| set.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sokoban_core::is_layout_compatible;

    #[test]
    fn every_blueprint_builds() {
        let sets = builtin_sets();
        assert_eq!(sets[0].levels.len(), NOVICE.len());
        assert_eq!(sets[1].levels.len(), CLASSIC.len());
    }

    #[test]
    fn builtin_levels_are_well_formed() {
        for set in builtin_sets() {
            for level in &set.levels {
                let layout = level.layout();
                assert!(is_layout_compatible(layout, level), "{}", set.name);
                assert_eq!(layout.boxes.len(), layout.targets.len(), "{}", set.name);

                let mut cells: Vec<Vector> = layout.all_positions().collect();
                let total = cells.len();
                cells.sort();
                cells.dedup();
                assert_eq!(cells.len(), total, "overlapping elements in {}", set.name);
            }
        }
    }

    #[test]
    fn lookup_ignores_case() {
        assert!(builtin_set("classic").is_some());
        assert!(builtin_set("unknown").is_none());
    }
}
