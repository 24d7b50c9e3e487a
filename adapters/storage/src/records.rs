use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sokoban_core::{Level, LevelLayout, Stats};

/// Value stored in a [`Collection`](crate::Collection) under a fixed key.
pub trait Record: Serialize + DeserializeOwned {
    /// Backend key holding the whole collection.
    const KEY: &'static str;

    /// Identifier, `None` until the record is first saved.
    fn id(&self) -> Option<&str>;

    /// Assigns the identifier.
    fn set_id(&mut self, id: String);
}

macro_rules! identified {
    ($record:ty, $key:literal) => {
        impl Record for $record {
            const KEY: &'static str = $key;

            fn id(&self) -> Option<&str> {
                self.id.as_deref()
            }

            fn set_id(&mut self, id: String) {
                self.id = Some(id);
            }
        }
    };
}

/// Live layout and statistics of an unfinished level.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedLevel {
    /// Layout at the time of saving.
    pub layout: LevelLayout,
    /// Statistics at the time of saving.
    pub stats: Stats,
}

/// Progress through a built-in level set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedGame {
    /// Identifier assigned on first save.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Player name.
    pub name: String,
    /// Name of the level set being played.
    pub set: String,
    /// Points accumulated over completed levels.
    pub points: u32,
    /// Index of the current level within the set, in play order.
    pub level: usize,
    /// Seed the set was shuffled with; `None` keeps the built-in order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Unfinished state of the current level, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved: Option<SavedLevel>,
}

identified!(SavedGame, "saved-games");

/// Level built in the editor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomLevel {
    /// Identifier assigned on first save.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Display name.
    pub name: String,
    /// The level itself.
    pub level: Level,
}

identified!(CustomLevel, "custom-levels");

/// Unfinished attempt at a custom level.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedCustomGame {
    /// Identifier assigned on first save.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Player name.
    pub name: String,
    /// Level being played.
    pub level: Level,
    /// Layout at the time of saving.
    pub layout: LevelLayout,
    /// Statistics at the time of saving.
    pub stats: Stats,
}

identified!(SavedCustomGame, "saved-custom-games");

/// Best score of one player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingRecord {
    /// Identifier assigned on first save.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Player name.
    pub name: String,
    /// Best score.
    pub points: u32,
}

identified!(RankingRecord, "rankings");
