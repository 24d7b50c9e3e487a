use std::{collections::HashMap, time::Duration};

use anyhow::{anyhow, bail, Result};
use rand::{seq::SliceRandom, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sokoban_core::{Command, Direction, Event, Level, LevelLayout, Stats};
use sokoban_storage::{
    KeyValueBackend, SavedCustomGame, SavedGame, SavedLevel, Storage, StorageError,
};
use sokoban_system_scoring::{score_completion, StandardScoring};
use sokoban_world::{apply, levels, query, RunState, World};
use tracing::{debug, info};

use crate::config::AppConfig;

/// Where the levels of a session come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum LevelSource {
    /// A named built-in set.
    Builtin { set: String },
    /// A single level from a file or the custom level store.
    Custom { name: String },
}

/// Points awarded for a finished level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Completion {
    pub(crate) points: u32,
    pub(crate) total: u32,
    pub(crate) stats: Stats,
}

/// One player working through a list of levels.
#[derive(Debug)]
pub(crate) struct GameSession {
    world: World,
    source: LevelSource,
    levels: Vec<Level>,
    index: usize,
    player: String,
    points: u32,
    save_id: Option<String>,
    seed: Option<u64>,
    best: HashMap<usize, Stats>,
    scored: HashMap<usize, u32>,
}

impl GameSession {
    /// Starts `levels` from the first one.
    pub(crate) fn new(
        source: LevelSource,
        levels: Vec<Level>,
        player: impl Into<String>,
        config: &AppConfig,
    ) -> Result<Self> {
        if levels.is_empty() {
            bail!("no levels to play");
        }

        let mut world = World::new();
        apply(&mut world, config.configure_command(), &mut Vec::new());
        let mut session = Self {
            world,
            source,
            levels,
            index: 0,
            player: player.into(),
            points: 0,
            save_id: None,
            seed: None,
            best: HashMap::new(),
            scored: HashMap::new(),
        };
        session.load_current();
        Ok(session)
    }

    /// Starts the named built-in set, optionally shuffled with `seed`.
    pub(crate) fn builtin(
        set: &str,
        shuffle_seed: Option<u64>,
        player: impl Into<String>,
        config: &AppConfig,
    ) -> Result<Self> {
        let set = levels::builtin_set(set).ok_or_else(|| anyhow!("unknown level set '{set}'"))?;
        let mut levels = set.levels;
        if let Some(seed) = shuffle_seed {
            levels.shuffle(&mut ChaCha8Rng::seed_from_u64(seed));
            debug!(seed, "level order shuffled");
        }
        let mut session = Self::new(
            LevelSource::Builtin {
                set: set.name.to_owned(),
            },
            levels,
            player,
            config,
        )?;
        session.seed = shuffle_seed;
        Ok(session)
    }

    /// Resumes a saved built-in game.
    pub(crate) fn resume_builtin(game: SavedGame, config: &AppConfig) -> Result<Self> {
        let mut session = Self::builtin(&game.set, game.seed, game.name, config)?;
        session.index = game.level.min(session.levels.len() - 1);
        session.points = game.points;
        session.save_id = game.id;
        session.load_current();
        if let Some(saved) = game.saved {
            session.restore(saved.layout, saved.stats);
        }
        Ok(session)
    }

    /// Resumes a saved attempt at a custom level.
    pub(crate) fn resume_custom(game: SavedCustomGame, config: &AppConfig) -> Result<Self> {
        let mut session = Self::new(
            LevelSource::Custom {
                name: game.name.clone(),
            },
            vec![game.level],
            game.name,
            config,
        )?;
        session.save_id = game.id;
        session.restore(game.layout, game.stats);
        Ok(session)
    }

    fn restore(&mut self, layout: LevelLayout, stats: Stats) {
        let mut events = Vec::new();
        apply(
            &mut self.world,
            Command::SetLayout {
                layout,
                stats: Some(stats),
            },
            &mut events,
        );
        if events.is_empty() {
            info!("saved layout no longer matches the level; starting fresh");
        }
    }

    fn load_current(&mut self) {
        let level = self.levels[self.index].clone();
        apply(&mut self.world, Command::SetLevel { level }, &mut Vec::new());
    }

    /// Runner state.
    pub(crate) const fn world(&self) -> &World {
        &self.world
    }

    /// Display title such as `Novice 2/3`.
    pub(crate) fn title(&self) -> String {
        match &self.source {
            LevelSource::Builtin { set } => {
                format!("{set} {}/{}", self.index + 1, self.levels.len())
            }
            LevelSource::Custom { name } => name.clone(),
        }
    }

    /// Player name.
    pub(crate) fn player(&self) -> &str {
        &self.player
    }

    /// Points gathered so far.
    pub(crate) const fn points(&self) -> u32 {
        self.points
    }

    /// Attempts one step, scoring the level when it completes.
    pub(crate) fn step(&mut self, direction: Direction) -> Option<Completion> {
        let mut events = Vec::new();
        apply(
            &mut self.world,
            Command::MovePlayer { direction },
            &mut events,
        );
        self.score(&events)
    }

    /// Advances the clock and animations.
    pub(crate) fn tick(&mut self, dt: Duration) {
        apply(&mut self.world, Command::Tick { dt }, &mut Vec::new());
    }

    /// Recomputes the grid fit for a canvas.
    pub(crate) fn resize(&mut self, canvas_width: f32, canvas_height: f32) {
        apply(
            &mut self.world,
            Command::UpdateGrid {
                canvas_width,
                canvas_height,
            },
            &mut Vec::new(),
        );
    }

    /// Pauses a running attempt or resumes a paused one.
    pub(crate) fn toggle_pause(&mut self) {
        let command = match query::state(&self.world) {
            RunState::Paused => Command::Start,
            _ => Command::Stop,
        };
        apply(&mut self.world, command, &mut Vec::new());
    }

    /// Restarts the current level.
    pub(crate) fn restart(&mut self) {
        apply(
            &mut self.world,
            Command::Reset { restore: true },
            &mut Vec::new(),
        );
    }

    /// Moves to the next level; returns `false` on the last one.
    pub(crate) fn next(&mut self) -> bool {
        self.jump(self.index + 1)
    }

    /// Moves to the previous level; returns `false` on the first one.
    pub(crate) fn previous(&mut self) -> bool {
        self.index > 0 && self.jump(self.index - 1)
    }

    fn jump(&mut self, index: usize) -> bool {
        if index >= self.levels.len() || index == self.index {
            return false;
        }
        self.index = index;
        self.load_current();
        true
    }

    fn score(&mut self, events: &[Event]) -> Option<Completion> {
        let level = &self.levels[self.index];
        let stats = events.iter().find_map(|event| match event {
            Event::LevelCompleted { stats } => Some(*stats),
            _ => None,
        })?;
        let points =
            score_completion(&StandardScoring, events, level, self.best.get(&self.index))?;
        let earlier = self.scored.entry(self.index).or_insert(0);
        if points > *earlier {
            self.points = self.points.saturating_add(points - *earlier);
            *earlier = points;
        }

        let best = self.best.entry(self.index).or_insert(stats);
        if effort_key(&stats) < effort_key(best) {
            *best = stats;
        }
        debug!(points, total = self.points, "level scored");
        Some(Completion {
            points,
            total: self.points,
            stats,
        })
    }

    /// Persists the session and returns its storage id.
    pub(crate) fn save<B: KeyValueBackend>(
        &mut self,
        storage: &mut Storage<B>,
    ) -> Result<String, StorageError> {
        let saved = self.unfinished_level();
        let id = match &self.source {
            LevelSource::Builtin { set } => storage.saved_games().save(SavedGame {
                id: self.save_id.clone(),
                name: self.player.clone(),
                set: set.clone(),
                points: self.points,
                level: self.index,
                seed: self.seed,
                saved,
            })?,
            LevelSource::Custom { .. } => {
                let SavedLevel { layout, stats } = saved.unwrap_or_else(|| SavedLevel {
                    layout: self.levels[self.index].layout().clone(),
                    stats: Stats::default(),
                });
                storage.saved_custom_games().save(SavedCustomGame {
                    id: self.save_id.clone(),
                    name: self.player.clone(),
                    level: self.levels[self.index].clone(),
                    layout,
                    stats,
                })?
            }
        };
        info!(id = %id, "game saved");
        self.save_id = Some(id.clone());
        Ok(id)
    }

    fn unfinished_level(&self) -> Option<SavedLevel> {
        if query::is_finished(&self.world) {
            return None;
        }
        let layout = query::layout(&self.world)?;
        Some(SavedLevel {
            layout,
            stats: query::stats(&self.world),
        })
    }
}

fn effort_key(stats: &Stats) -> (u32, u32, u64) {
    (stats.moves.player, stats.moves.boxes, stats.time_ms)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use sokoban_core::Vector;

    pub(crate) fn corridor(width: u32) -> Level {
        Level::new(
            width,
            1,
            LevelLayout {
                start: Vector::new(0, 0),
                boxes: vec![Vector::new(1, 0)],
                targets: vec![Vector::new(width as i32 - 1, 0)],
                walls: Vec::new(),
            },
        )
        .expect("valid level")
    }

    pub(crate) fn push_right(session: &mut GameSession, steps: usize) -> Option<Completion> {
        let mut completion = None;
        for _ in 0..steps {
            completion = session.step(Direction::Right).or(completion);
            session.tick(Duration::from_millis(200));
        }
        completion
    }

    fn session(levels: Vec<Level>) -> GameSession {
        GameSession::new(
            LevelSource::Builtin {
                set: "Novice".into(),
            },
            levels,
            "ada",
            &AppConfig::default(),
        )
        .expect("session")
    }

    #[test]
    fn completion_adds_points_and_next_advances() {
        let mut session = session(vec![corridor(4), corridor(5)]);
        assert_eq!(session.title(), "Novice 1/2");

        let completion = push_right(&mut session, 2).expect("two pushes finish");
        assert_eq!(completion.total, completion.points);
        assert_eq!(session.points(), completion.points);

        assert!(session.next());
        assert_eq!(session.title(), "Novice 2/2");
        assert!(!session.next(), "no level after the last one");
        assert!(session.previous());
        assert!(!session.previous());
    }

    #[test]
    fn replays_are_scored_against_the_best_attempt() {
        let mut session = session(vec![corridor(4)]);
        let first = push_right(&mut session, 2).expect("finished");

        session.restart();
        let _ = session.step(Direction::Left);
        session.tick(Duration::from_secs(30));
        let sloppy = push_right(&mut session, 2).expect("finished again");
        assert!(sloppy.points <= first.points);
        assert_eq!(sloppy.total, first.points);
        assert_eq!(session.points(), first.points);
    }

    #[test]
    fn replaying_a_level_does_not_add_its_points_twice() {
        let mut session = session(vec![corridor(4), corridor(5)]);
        let first = push_right(&mut session, 2).expect("finished");
        for _ in 0..3 {
            session.restart();
            let replay = push_right(&mut session, 2).expect("finished again");
            assert_eq!(replay.total, first.points);
        }

        assert!(session.next());
        let second = push_right(&mut session, 3).expect("second level finished");
        assert_eq!(session.points(), first.points + second.points);
    }

    #[test]
    fn saving_round_trips_through_storage() {
        let mut storage = Storage::in_memory();
        let mut session = session(vec![corridor(6), corridor(4)]);
        let _ = push_right(&mut session, 1);
        let id = session.save(&mut storage).expect("save");

        let saved = storage
            .saved_games()
            .get(&id)
            .expect("get")
            .expect("saved game");
        assert_eq!(saved.name, "ada");
        let progress = saved.saved.clone().expect("unfinished level");
        assert_eq!(progress.layout.start, Vector::new(1, 0));
        assert_eq!(progress.stats.moves.boxes, 1);

        assert_eq!(session.save(&mut storage).expect("save again"), id);
        assert_eq!(storage.saved_games().all().expect("all").len(), 1);
    }

    #[test]
    fn builtin_sets_resume_at_saved_level() {
        let game = SavedGame {
            id: Some("abc".into()),
            name: "bob".into(),
            set: "classic".into(),
            points: 12,
            level: 1,
            seed: None,
            saved: None,
        };
        let session =
            GameSession::resume_builtin(game, &AppConfig::default()).expect("resume");
        assert_eq!(session.title(), "Classic 2/6");
        assert_eq!(session.points(), 12);
        assert_eq!(session.player(), "bob");
    }

    #[test]
    fn shuffled_sets_resume_on_the_level_that_was_saved() {
        let config = AppConfig::default();
        for seed in 0..20 {
            let mut storage = Storage::in_memory();
            let mut session =
                GameSession::builtin("classic", Some(seed), "ada", &config).expect("session");
            assert!(session.next());
            assert!(session.next());
            let playing = query::level(session.world()).cloned();
            let id = session.save(&mut storage).expect("save");

            let game = storage
                .saved_games()
                .get(&id)
                .expect("get")
                .expect("saved game");
            assert_eq!(game.seed, Some(seed));
            let resumed = GameSession::resume_builtin(game, &config).expect("resume");
            assert_eq!(resumed.title(), "Classic 3/6");
            assert_eq!(query::level(resumed.world()).cloned(), playing, "seed {seed}");
        }
    }

    #[test]
    fn custom_games_resume_saved_layout() {
        let level = corridor(5);
        let mut layout = level.layout().clone();
        layout.start = Vector::new(1, 0);
        layout.boxes = vec![Vector::new(2, 0)];
        let game = SavedCustomGame {
            id: None,
            name: "eve".into(),
            level,
            layout,
            stats: Stats::default(),
        };
        let session = GameSession::resume_custom(game, &AppConfig::default()).expect("resume");
        assert_eq!(query::player_position(session.world()), Vector::new(1, 0));
        assert_eq!(session.title(), "eve");
    }

    #[test]
    fn unknown_sets_are_errors() {
        assert!(GameSession::builtin("Expert", None, "ada", &AppConfig::default()).is_err());
    }
}
