#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative game runner for Sokoban.
//!
//! The [`World`] owns one in-progress puzzle attempt: the live layout, the
//! play clock, move counters and completion state. It is mutated exclusively
//! through [`apply`] and observed through the [`query`] module.

mod actors;
mod animation;
mod clock;
pub mod levels;

use std::time::Duration;

use glam::Vec2;
use sokoban_core::{
    grid::{GridFit, DEFAULT_MAX_CELL_SIZE},
    is_layout_compatible, AssetKey, Command, Direction, Event, Level, LevelLayout, MoveCounts,
    Stats, Vector,
};
use tracing::{debug, trace, warn};

use crate::{
    actors::{Actor, Movable, Player},
    animation::AnimationSet,
};

pub use clock::Stopwatch;

/// Default duration of a single step animation.
pub const DEFAULT_ANIMATION: Duration = Duration::from_millis(100);

/// Lifecycle of the attempt owned by the runner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RunState {
    /// No level has been loaded yet.
    Unset,
    /// Accepting input; the clock runs once the player acts.
    Running,
    /// Input blocked and clock halted until resumed.
    Paused,
    /// Every target is covered; input blocked until reset or a new level.
    Completed,
}

/// Classification of a cell the player or a box wants to enter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Occupant {
    Empty,
    Target,
    Box(usize),
    Wall,
    OutOfBounds,
}

impl Occupant {
    const fn is_passable(self) -> bool {
        matches!(self, Self::Empty | Self::Target)
    }
}

/// Represents the authoritative Sokoban runner state.
#[derive(Debug)]
pub struct World {
    animation_duration: Duration,
    max_cell_size: f32,
    canvas: Vec2,
    grid_fit: GridFit,
    state: RunState,
    level: Option<Level>,
    animations: AnimationSet,
    player: Player,
    boxes: Vec<Movable>,
    targets: Vec<Actor>,
    walls: Vec<Actor>,
    stopwatch: Stopwatch,
    moves: MoveCounts,
}

impl World {
    /// Creates a runner with no level loaded.
    #[must_use]
    pub fn new() -> Self {
        let mut animations = AnimationSet::default();
        let player = Player::new(Vector::ZERO, DEFAULT_ANIMATION, &mut animations);
        Self {
            animation_duration: DEFAULT_ANIMATION,
            max_cell_size: DEFAULT_MAX_CELL_SIZE,
            canvas: Vec2::ZERO,
            grid_fit: GridFit::EMPTY,
            state: RunState::Unset,
            level: None,
            animations,
            player,
            boxes: Vec::new(),
            targets: Vec::new(),
            walls: Vec::new(),
            stopwatch: Stopwatch::new(),
            moves: MoveCounts::default(),
        }
    }

    fn stats(&self) -> Stats {
        Stats::new(self.stopwatch.elapsed(), self.moves)
    }

    fn reset_stats(&mut self) {
        self.stopwatch.reset();
        self.moves = MoveCounts::default();
    }

    fn refresh_grid(&mut self) {
        let dimensions = self.level.as_ref().map(Level::dimensions);
        self.grid_fit = GridFit::compute(self.canvas, dimensions, self.max_cell_size);
    }

    /// Drops every actor and recreates them from `layout`.
    fn rebuild(&mut self, layout: &LevelLayout) {
        let duration = self.animation_duration;
        let mut animations = AnimationSet::default();
        self.player = Player::new(layout.start, duration, &mut animations);
        self.boxes = layout
            .boxes
            .iter()
            .map(|position| Movable::new(*position, AssetKey::Box, duration, &mut animations))
            .collect();
        self.targets = layout
            .targets
            .iter()
            .map(|position| Actor::new(*position, AssetKey::Target))
            .collect();
        self.walls = layout
            .walls
            .iter()
            .map(|position| Actor::new(*position, AssetKey::Wall))
            .collect();
        self.animations = animations;
    }

    fn occupant(&self, cell: Vector) -> Occupant {
        let Some(level) = &self.level else {
            return Occupant::OutOfBounds;
        };
        if !level.dimensions().contains(cell) {
            return Occupant::OutOfBounds;
        }

        if let Some(index) = self.boxes.iter().position(|body| body.position() == cell) {
            Occupant::Box(index)
        } else if self.targets.iter().any(|target| target.position == cell) {
            Occupant::Target
        } else if self.walls.iter().any(|wall| wall.position == cell) {
            Occupant::Wall
        } else {
            Occupant::Empty
        }
    }

    fn all_targets_covered(&self) -> bool {
        self.targets.iter().all(|target| {
            self.boxes
                .iter()
                .any(|body| body.position() == target.position)
        })
    }

    fn move_player(&mut self, direction: Direction, out_events: &mut Vec<Event>) {
        if self.state != RunState::Running {
            trace!(?direction, state = ?self.state, "move ignored");
            return;
        }

        self.stopwatch.start();

        if self.player.is_animating(&self.animations) {
            trace!(?direction, "move ignored while previous step animates");
            return;
        }

        let unit = direction.unit();
        let from = self.player.body.position();
        let destination = from + unit;

        match self.occupant(destination) {
            occupant if occupant.is_passable() => {
                self.player.step(direction, &mut self.animations);
                self.moves.player += 1;
                out_events.push(Event::PlayerMoved {
                    direction,
                    from,
                    to: destination,
                });
            }
            Occupant::Box(index) => {
                let beyond = destination + unit;
                if !self.occupant(beyond).is_passable() {
                    trace!(?direction, box_cell = ?destination, "push blocked");
                    return;
                }

                self.boxes[index].step(direction, &mut self.animations);
                self.player.step(direction, &mut self.animations);
                self.moves.player += 1;
                self.moves.boxes += 1;
                out_events.push(Event::BoxPushed {
                    from: destination,
                    to: beyond,
                });
                out_events.push(Event::PlayerMoved {
                    direction,
                    from,
                    to: destination,
                });

                if self.all_targets_covered() {
                    self.finish(out_events);
                }
            }
            occupant => {
                trace!(?direction, ?occupant, "move blocked");
            }
        }
    }

    fn finish(&mut self, out_events: &mut Vec<Event>) {
        self.stopwatch.stop();
        self.state = RunState::Completed;
        let stats = self.stats();
        debug!(
            time_ms = stats.time_ms,
            player_moves = stats.moves.player,
            box_moves = stats.moves.boxes,
            "level completed"
        );
        out_events.push(Event::LevelCompleted { stats });
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the runner, mutating state deterministically.
///
/// Rejected commands leave the runner untouched and emit no events.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Configure {
            animation,
            max_cell_size,
        } => {
            // New durations apply to actors built by the next level or layout.
            world.animation_duration = animation;
            world.max_cell_size = max_cell_size as f32;
            world.refresh_grid();
        }
        Command::SetLevel { level } => {
            let dimensions = level.dimensions();
            let layout = level.layout().clone();
            world.level = Some(level);
            world.refresh_grid();
            world.rebuild(&layout);
            world.reset_stats();
            world.state = RunState::Running;
            debug!(
                width = dimensions.width,
                height = dimensions.height,
                "level loaded"
            );
            out_events.push(Event::LevelLoaded { dimensions });
        }
        Command::SetLayout { layout, stats } => {
            let Some(level) = &world.level else {
                warn!("layout ignored: no level loaded");
                return;
            };
            if !is_layout_compatible(&layout, level) {
                warn!("layout ignored: incompatible with the current level");
                return;
            }

            world.rebuild(&layout);
            match stats {
                Some(stats) => {
                    world.stopwatch = Stopwatch::with_elapsed(stats.elapsed());
                    world.moves = stats.moves;
                }
                None => world.reset_stats(),
            }
            world.state = RunState::Running;
            out_events.push(Event::LayoutRestored {
                stats: world.stats(),
            });
        }
        Command::Start => {
            if world.state == RunState::Paused {
                world.animations.resume_all();
                world.state = RunState::Running;
                out_events.push(Event::Resumed);
            }
        }
        Command::Stop => {
            if world.state == RunState::Running {
                world.stopwatch.stop();
                world.animations.pause_all();
                world.state = RunState::Paused;
                out_events.push(Event::Paused);
            }
        }
        Command::Reset { restore } => {
            let Some(level) = &world.level else {
                return;
            };
            let original = restore.then(|| level.layout().clone());

            world.animations.reset_all();
            world.player.reset();
            for body in &mut world.boxes {
                body.reset();
            }
            world.reset_stats();
            if let Some(layout) = original {
                world.rebuild(&layout);
            }
            world.state = RunState::Running;
            out_events.push(Event::Reset { restored: restore });
        }
        Command::MovePlayer { direction } => world.move_player(direction, out_events),
        Command::UpdateGrid {
            canvas_width,
            canvas_height,
        } => {
            world.canvas = Vec2::new(canvas_width, canvas_height);
            world.refresh_grid();
        }
        Command::Tick { dt } => {
            world.stopwatch.advance(dt);
            world.animations.advance(dt);
            out_events.push(Event::TimeAdvanced { dt });
        }
    }
}

/// Query functions that provide read-only access to the runner state.
pub mod query {
    use glam::Vec2;
    use sokoban_core::{grid::GridFit, AssetKey, Level, LevelLayout, PlayerPose, Stats, Vector};

    use super::{RunState, World};

    /// Current lifecycle state.
    #[must_use]
    pub fn state(world: &World) -> RunState {
        world.state
    }

    /// Statistics of the current attempt.
    #[must_use]
    pub fn stats(world: &World) -> Stats {
        world.stats()
    }

    /// Reports whether the attempt reached completion.
    #[must_use]
    pub fn is_finished(world: &World) -> bool {
        world.state == RunState::Completed
    }

    /// Level currently being played, kept for bounds checks and restarts.
    #[must_use]
    pub fn level(world: &World) -> Option<&Level> {
        world.level.as_ref()
    }

    /// Snapshot of the live layout, suitable for saving a game in progress.
    #[must_use]
    pub fn layout(world: &World) -> Option<LevelLayout> {
        if world.level.is_none() {
            return None;
        }

        Some(LevelLayout {
            start: world.player.body.position(),
            boxes: world.boxes.iter().map(|body| body.position()).collect(),
            targets: world.targets.iter().map(|target| target.position).collect(),
            walls: world.walls.iter().map(|wall| wall.position).collect(),
        })
    }

    /// Cell currently occupied by the player.
    #[must_use]
    pub fn player_position(world: &World) -> Vector {
        world.player.body.position()
    }

    /// Reports whether the player's previous step is still animating.
    #[must_use]
    pub fn is_player_animating(world: &World) -> bool {
        world.player.is_animating(&world.animations)
    }

    /// Cell size and centring offset for the current canvas.
    #[must_use]
    pub fn grid_fit(world: &World) -> GridFit {
        world.grid_fit
    }

    /// Drawable snapshot of a single actor.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct ActorSnapshot {
        /// Rendering identity of the actor.
        pub asset: AssetKey,
        /// Logical cell occupied by the actor.
        pub cell: Vector,
        /// Interpolated position in cell units.
        pub draw_position: Vec2,
        /// Sprite selection, present for the player only.
        pub pose: Option<PlayerPose>,
    }

    /// Every actor in draw order: walls, targets, boxes, then the player.
    #[must_use]
    pub fn actors(world: &World) -> Vec<ActorSnapshot> {
        if world.level.is_none() {
            return Vec::new();
        }

        let still = |position: Vector, asset: AssetKey| ActorSnapshot {
            asset,
            cell: position,
            draw_position: Vec2::new(position.x as f32, position.y as f32),
            pose: None,
        };

        let mut snapshots: Vec<ActorSnapshot> = world
            .walls
            .iter()
            .chain(world.targets.iter())
            .map(|actor| still(actor.position, actor.asset))
            .collect();
        snapshots.extend(world.boxes.iter().map(|body| ActorSnapshot {
            asset: body.actor.asset,
            cell: body.position(),
            draw_position: body.draw_position(&world.animations),
            pose: None,
        }));
        snapshots.push(ActorSnapshot {
            asset: AssetKey::Player,
            cell: world.player.body.position(),
            draw_position: world.player.body.draw_position(&world.animations),
            pose: Some(world.player.pose(&world.animations)),
        });
        snapshots
    }
}
