#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Scoring of completed attempts and the ranking built from those scores.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use sokoban_core::{Event, Level, Stats};

/// Converts the statistics of a finished attempt into points.
pub trait ScoringPolicy {
    /// Scores `stats` against the reference `solution` for `level`.
    fn points(&self, stats: &Stats, solution: &Stats, level: &Level) -> u32;
}

/// Default policy: a reference solution sets the ceiling and every unit of
/// effort above it costs one point, never dropping below one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StandardScoring;

impl StandardScoring {
    /// Effort rating of an attempt, at least one.
    #[must_use]
    pub fn effort(stats: &Stats, level: &Level) -> u32 {
        let boxes = level.layout().boxes.len();
        let box_term = if boxes == 0 {
            0.0
        } else {
            f64::from(stats.moves.boxes) / boxes as f64 / 1.6
        };
        let raw = f64::from(stats.moves.player) / 5.0 + box_term + stats.time_ms as f64 / 2000.0;
        (raw.floor() as u32).max(1)
    }
}

impl ScoringPolicy for StandardScoring {
    fn points(&self, stats: &Stats, solution: &Stats, level: &Level) -> u32 {
        let best = Self::effort(solution, level);
        let current = Self::effort(stats, level);
        let loss = current.saturating_sub(best);
        best.saturating_sub(loss).clamp(1, best)
    }
}

/// Scores the completion reported in `events`, if any.
///
/// Without a reference solution the attempt is its own reference.
pub fn score_completion<P: ScoringPolicy + ?Sized>(
    policy: &P,
    events: &[Event],
    level: &Level,
    solution: Option<&Stats>,
) -> Option<u32> {
    events.iter().find_map(|event| match event {
        Event::LevelCompleted { stats } => {
            Some(policy.points(stats, solution.unwrap_or(stats), level))
        }
        _ => None,
    })
}

/// Points accumulated by one player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingEntry {
    /// Player name.
    pub name: String,
    /// Best score recorded for the player.
    pub points: u32,
}

/// Best score per player, ordered for display.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ranking {
    entries: Vec<RankingEntry>,
}

impl Ranking {
    /// Creates an empty ranking.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a ranking from stored entries, keeping the best score per name.
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = RankingEntry>) -> Self {
        let mut ranking = Self::new();
        for entry in entries {
            let _ = ranking.record(entry.name, entry.points);
        }
        ranking
    }

    /// Records `points` for `name`. Returns `true` when it became their best.
    pub fn record(&mut self, name: impl Into<String>, points: u32) -> bool {
        let name = name.into();
        let improved = match self.entries.iter_mut().find(|entry| entry.name == name) {
            Some(entry) if entry.points >= points => false,
            Some(entry) => {
                entry.points = points;
                true
            }
            None => {
                self.entries.push(RankingEntry { name, points });
                true
            }
        };

        if improved {
            self.entries.sort_by(standing_order);
        }
        improved
    }

    /// Entries sorted by points, highest first, ties broken by name.
    #[must_use]
    pub fn standings(&self) -> &[RankingEntry] {
        &self.entries
    }

    /// Best score recorded for `name`.
    #[must_use]
    pub fn points_of(&self, name: &str) -> Option<u32> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.points)
    }
}

fn standing_order(a: &RankingEntry, b: &RankingEntry) -> Ordering {
    b.points.cmp(&a.points).then_with(|| a.name.cmp(&b.name))
}
