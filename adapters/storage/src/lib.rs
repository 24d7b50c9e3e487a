#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Persistence for saved games, custom levels and rankings.
//!
//! Every collection is stored as one JSON array under a fixed key of a
//! [`KeyValueBackend`]. Records receive a UUID v4 identifier the first time
//! they are saved; saving a record with a known identifier replaces it.

mod backend;
mod records;

use std::{io, marker::PhantomData, path::PathBuf};

use sokoban_system_scoring::{Ranking, RankingEntry};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

pub use backend::{FileBackend, KeyValueBackend, MemoryBackend};
pub use records::{
    CustomLevel, RankingRecord, Record, SavedCustomGame, SavedGame, SavedLevel,
};

/// Errors raised by storage backends and collections.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The key cannot be mapped onto the backend.
    #[error("invalid storage key {0:?}")]
    InvalidKey(String),
    /// Reading or writing the backing file failed.
    #[error("failed to access {}", path.display())]
    Io {
        /// File or directory being accessed.
        path: PathBuf,
        /// Underlying failure.
        source: io::Error,
    },
    /// The stored value is not a valid record list.
    #[error("stored value under {key:?} is malformed")]
    Malformed {
        /// Collection key.
        key: &'static str,
        /// Decoder failure.
        source: serde_json::Error,
    },
    /// Records could not be encoded.
    #[error("failed to encode records for {key:?}")]
    Encode {
        /// Collection key.
        key: &'static str,
        /// Encoder failure.
        source: serde_json::Error,
    },
}

/// Typed view over the records stored under `T::KEY`.
#[derive(Debug)]
pub struct Collection<'a, B, T> {
    backend: &'a mut B,
    marker: PhantomData<T>,
}

impl<'a, B: KeyValueBackend, T: Record> Collection<'a, B, T> {
    /// Every stored record in insertion order.
    pub fn all(&self) -> Result<Vec<T>, StorageError> {
        match self.backend.get(T::KEY)? {
            None => Ok(Vec::new()),
            Some(json) => serde_json::from_str(&json)
                .map_err(|source| StorageError::Malformed { key: T::KEY, source }),
        }
    }

    /// Record with identifier `id`.
    pub fn get(&self, id: &str) -> Result<Option<T>, StorageError> {
        Ok(self
            .all()?
            .into_iter()
            .find(|record| record.id() == Some(id)))
    }

    /// Stores `record`, assigning an identifier when it has none, and
    /// returns the identifier.
    pub fn save(&mut self, mut record: T) -> Result<String, StorageError> {
        let existing = record
            .id()
            .filter(|id| !id.is_empty())
            .map(str::to_owned);
        let id = match existing {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4().to_string();
                record.set_id(id.clone());
                id
            }
        };

        let mut records = self.all()?;
        records.retain(|stored| stored.id() != Some(id.as_str()));
        records.push(record);
        self.write(&records)?;
        debug!(key = T::KEY, id = %id, "record saved");
        Ok(id)
    }

    /// Deletes the record with identifier `id`, reporting whether it existed.
    pub fn remove(&mut self, id: &str) -> Result<bool, StorageError> {
        let mut records = self.all()?;
        let before = records.len();
        records.retain(|stored| stored.id() != Some(id));
        if records.len() == before {
            return Ok(false);
        }

        self.write(&records)?;
        debug!(key = T::KEY, id, "record removed");
        Ok(true)
    }

    fn write(&mut self, records: &[T]) -> Result<(), StorageError> {
        let json = serde_json::to_string(records)
            .map_err(|source| StorageError::Encode { key: T::KEY, source })?;
        self.backend.set(T::KEY, json)
    }
}

/// Entry point bundling the collections over one backend.
#[derive(Debug)]
pub struct Storage<B> {
    backend: B,
}

impl Storage<FileBackend> {
    /// Storage persisted as JSON files inside `dir`.
    #[must_use]
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self::new(FileBackend::new(dir))
    }
}

impl Storage<MemoryBackend> {
    /// Storage that lives only as long as the value.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }
}

impl<B: KeyValueBackend> Storage<B> {
    /// Wraps `backend`.
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Collection of any record type.
    pub fn collection<T: Record>(&mut self) -> Collection<'_, B, T> {
        Collection {
            backend: &mut self.backend,
            marker: PhantomData,
        }
    }

    /// Progress through built-in level sets.
    pub fn saved_games(&mut self) -> Collection<'_, B, SavedGame> {
        self.collection()
    }

    /// Levels built in the editor.
    pub fn custom_levels(&mut self) -> Collection<'_, B, CustomLevel> {
        self.collection()
    }

    /// Unfinished attempts at custom levels.
    pub fn saved_custom_games(&mut self) -> Collection<'_, B, SavedCustomGame> {
        self.collection()
    }

    /// Stored best scores, one record per player.
    pub fn rankings(&mut self) -> Collection<'_, B, RankingRecord> {
        self.collection()
    }

    /// Ranking assembled from the stored best scores.
    pub fn ranking(&mut self) -> Result<Ranking, StorageError> {
        let records = self.rankings().all()?;
        Ok(Ranking::from_entries(records.into_iter().map(|record| {
            RankingEntry {
                name: record.name,
                points: record.points,
            }
        })))
    }

    /// Stores `points` for `name` when they beat the player's best score.
    /// Returns whether the stored score changed.
    pub fn record_score(&mut self, name: &str, points: u32) -> Result<bool, StorageError> {
        let mut rankings = self.rankings();
        let existing = rankings
            .all()?
            .into_iter()
            .find(|record| record.name == name);
        let record = match existing {
            Some(record) if record.points >= points => return Ok(false),
            Some(record) => RankingRecord { points, ..record },
            None => RankingRecord {
                id: None,
                name: name.to_owned(),
                points,
            },
        };
        let _ = rankings.save(record)?;
        Ok(true)
    }

    /// Underlying backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_collections_are_reported() {
        let mut backend = MemoryBackend::new();
        backend
            .set("rankings", "{not json".into())
            .expect("memory backend");
        let mut storage = Storage::new(backend);
        assert!(matches!(
            storage.rankings().all(),
            Err(StorageError::Malformed {
                key: "rankings",
                ..
            })
        ));
    }

    #[test]
    fn ranking_records_keep_best_score() {
        let mut storage = Storage::in_memory();
        assert!(storage.record_score("ada", 4).expect("record"));
        assert!(!storage.record_score("ada", 2).expect("record"));
        assert!(storage.record_score("ada", 9).expect("record"));
        assert!(storage.record_score("bob", 5).expect("record"));

        assert_eq!(storage.rankings().all().expect("all").len(), 2);
        let ranking = storage.ranking().expect("ranking");
        assert_eq!(ranking.points_of("ada"), Some(9));
        assert_eq!(ranking.standings()[1].name, "bob");
    }
}
