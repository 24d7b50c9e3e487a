#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Sokoban engine.
//!
//! This crate defines the data model and the message surface that connects
//! adapters, the authoritative game runner, and the editor. Adapters submit
//! [`Command`] values describing desired mutations, the runner executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values
//! describing what actually changed. Rejected input never produces an event.

pub mod grid;
mod level;

use std::{
    ops::{Add, Mul, Neg, Sub},
    time::Duration,
};

use serde::{Deserialize, Serialize};

pub use level::{is_layout_compatible, Dimensions, ElementKind, Level, LevelError, LevelLayout};

/// Integer pair addressing a grid cell or describing a cell offset.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Vector {
    /// Column index, growing to the right.
    pub x: i32,
    /// Row index, growing downwards.
    pub y: i32,
}

impl Vector {
    /// The zero vector.
    pub const ZERO: Self = Self::new(0, 0);

    /// Creates a new vector from its components.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Reports whether the vector addresses a cell inside a `width` x `height` grid.
    #[must_use]
    pub const fn is_within(self, width: u32, height: u32) -> bool {
        self.x >= 0 && self.y >= 0 && (self.x as u32) < width && (self.y as u32) < height
    }
}

impl Add for Vector {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x.saturating_add(rhs.x), self.y.saturating_add(rhs.y))
    }
}

impl Sub for Vector {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x.saturating_sub(rhs.x), self.y.saturating_sub(rhs.y))
    }
}

impl Neg for Vector {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(self.x.saturating_neg(), self.y.saturating_neg())
    }
}

impl Mul<i32> for Vector {
    type Output = Self;

    fn mul(self, rhs: i32) -> Self {
        Self::new(self.x.saturating_mul(rhs), self.y.saturating_mul(rhs))
    }
}

/// Cardinal directions available to the player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Movement toward decreasing row indices.
    Up,
    /// Movement toward increasing row indices.
    Down,
    /// Movement toward decreasing column indices.
    Left,
    /// Movement toward increasing column indices.
    Right,
}

impl Direction {
    /// Every direction in a stable order.
    pub const ALL: [Direction; 4] = [Self::Up, Self::Down, Self::Left, Self::Right];

    /// Unit vector pointing in the direction.
    #[must_use]
    pub const fn unit(self) -> Vector {
        match self {
            Self::Up => Vector::new(0, -1),
            Self::Down => Vector::new(0, 1),
            Self::Left => Vector::new(-1, 0),
            Self::Right => Vector::new(1, 0),
        }
    }
}

/// Rendering identity of an actor, resolved by adapters through an asset table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKey {
    /// Player tileset.
    Player,
    /// Pushable box.
    Box,
    /// Target marker.
    Target,
    /// Wall block.
    Wall,
    /// Empty floor cell.
    Floor,
}

/// Which leg the player stands on while walking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stance {
    /// Standing still.
    Idle,
    /// Mid-step on the left leg.
    LeftLeg,
    /// Mid-step on the right leg.
    RightLeg,
}

/// Sprite selection for the player: facing picks the row, stance the column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PlayerPose {
    /// Direction the player faces.
    pub facing: Direction,
    /// Current walking stance.
    pub stance: Stance,
}

/// Move counters accumulated during one attempt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MoveCounts {
    /// Number of accepted player steps, pushes included.
    pub player: u32,
    /// Number of accepted pushes.
    #[serde(rename = "box")]
    pub boxes: u32,
}

/// Statistics of the current attempt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Stats {
    /// Elapsed play time in milliseconds.
    #[serde(rename = "time")]
    pub time_ms: u64,
    /// Move counters.
    pub moves: MoveCounts,
}

impl Stats {
    /// Creates a statistics snapshot from an elapsed duration and counters.
    #[must_use]
    pub fn new(elapsed: Duration, moves: MoveCounts) -> Self {
        Self {
            time_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            moves,
        }
    }

    /// Elapsed play time as a [`Duration`].
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        Duration::from_millis(self.time_ms)
    }
}

/// Commands that express all permissible runner mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Adjusts runner tuning that does not affect game rules.
    Configure {
        /// Duration of a single step animation.
        animation: Duration,
        /// Upper bound for the rendered cell size in pixels.
        max_cell_size: u32,
    },
    /// Loads a level and starts a fresh attempt from its starting layout.
    SetLevel {
        /// Level to play.
        level: Level,
    },
    /// Restores a mid-game layout compatible with the current level.
    SetLayout {
        /// Layout to restore.
        layout: LevelLayout,
        /// Statistics to resume with; `None` starts from zero.
        stats: Option<Stats>,
    },
    /// Resumes a paused attempt.
    Start,
    /// Pauses the running attempt.
    Stop,
    /// Clears statistics and optionally restores the level's starting layout.
    Reset {
        /// Whether the original layout should be rebuilt.
        restore: bool,
    },
    /// Attempts a single player step in the given direction.
    MovePlayer {
        /// Requested direction.
        direction: Direction,
    },
    /// Recomputes the grid fit for the provided canvas size in pixels.
    UpdateGrid {
        /// Canvas width in pixels.
        canvas_width: f32,
        /// Canvas height in pixels.
        canvas_height: f32,
    },
    /// Advances the play clock and animations by the provided delta time.
    Tick {
        /// Duration of real time that elapsed since the previous tick.
        dt: Duration,
    },
}

/// Events broadcast by the runner after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// A level was loaded and a fresh attempt started.
    LevelLoaded {
        /// Dimensions of the loaded level.
        dimensions: Dimensions,
    },
    /// A saved layout replaced the live layout.
    LayoutRestored {
        /// Statistics the attempt resumed with.
        stats: Stats,
    },
    /// The attempt was paused.
    Paused,
    /// The attempt was resumed.
    Resumed,
    /// Statistics were cleared.
    Reset {
        /// Whether the starting layout was restored as well.
        restored: bool,
    },
    /// The player advanced one cell.
    PlayerMoved {
        /// Direction of the step.
        direction: Direction,
        /// Cell the player occupied before moving.
        from: Vector,
        /// Cell the player occupies after moving.
        to: Vector,
    },
    /// A box was pushed one cell.
    BoxPushed {
        /// Cell the box occupied before the push.
        from: Vector,
        /// Cell the box occupies after the push.
        to: Vector,
    },
    /// Every target is covered by a box; the attempt is complete.
    LevelCompleted {
        /// Final statistics of the attempt.
        stats: Stats,
    },
    /// Simulation clock advanced.
    TimeAdvanced {
        /// Duration of time that elapsed in the tick.
        dt: Duration,
    },
}

#[cfg(test)]
mod tests {
    use super::{Direction, MoveCounts, Stats, Vector};
    use std::time::Duration;

    #[test]
    fn direction_units_are_orthogonal_steps() {
        assert_eq!(Direction::Up.unit(), Vector::new(0, -1));
        assert_eq!(Direction::Down.unit(), Vector::new(0, 1));
        assert_eq!(Direction::Left.unit(), Vector::new(-1, 0));
        assert_eq!(Direction::Right.unit(), Vector::new(1, 0));
        for direction in Direction::ALL {
            let unit = direction.unit();
            assert_eq!(unit.x.abs() + unit.y.abs(), 1);
        }
    }

    #[test]
    fn vector_arithmetic() {
        let a = Vector::new(2, 3);
        let b = Vector::new(-1, 4);
        assert_eq!(a + b, Vector::new(1, 7));
        assert_eq!(a - b, Vector::new(3, -1));
        assert_eq!(-a, Vector::new(-2, -3));
        assert_eq!(a * 3, Vector::new(6, 9));
    }

    #[test]
    fn arithmetic_saturates_at_the_integer_edge() {
        let far = Vector::new(i32::MAX, i32::MIN);
        assert_eq!(far + Vector::new(1, -1), far);
        assert_eq!(far - Vector::new(-1, 1), far);
        assert_eq!(-Vector::new(i32::MIN, 0), Vector::new(i32::MAX, 0));
        assert_eq!(Vector::new(i32::MAX, 2) * 2, Vector::new(i32::MAX, 4));
    }

    #[test]
    fn is_within_rejects_negative_and_far_edges() {
        assert!(Vector::new(0, 0).is_within(3, 3));
        assert!(Vector::new(2, 2).is_within(3, 3));
        assert!(!Vector::new(3, 0).is_within(3, 3));
        assert!(!Vector::new(0, 3).is_within(3, 3));
        assert!(!Vector::new(-1, 0).is_within(3, 3));
        assert!(!Vector::new(0, 0).is_within(0, 3));
    }

    #[test]
    fn stats_serialise_with_box_key() {
        let stats = Stats::new(
            Duration::from_millis(1500),
            MoveCounts {
                player: 7,
                boxes: 2,
            },
        );
        let json = serde_json::to_value(stats).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({ "time": 1500, "moves": { "player": 7, "box": 2 } })
        );
        assert_eq!(stats.elapsed(), Duration::from_millis(1500));
    }

    #[test]
    fn stats_round_trip_through_bincode() {
        let stats = Stats {
            time_ms: 42,
            moves: MoveCounts {
                player: 3,
                boxes: 1,
            },
        };
        let bytes = bincode::serialize(&stats).expect("serialize");
        let restored: Stats = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(restored, stats);
    }
}
