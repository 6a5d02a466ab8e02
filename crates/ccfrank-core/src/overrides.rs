//! User overrides: a manual rank or an "ignored" flag per item.
//!
//! Each item holds at most one [`OverrideState`], so a manual rank and the
//! ignored flag can never coexist. Every mutation is written through to the
//! [`OverrideBackend`] before returning. Storage failures are logged and
//! swallowed: a store that cannot be read starts empty, and a store that
//! cannot be written keeps its in-memory state.
//!
//! The on-disk JSON keeps two collections:
//!
//! ```json
//! { "manualRanks": { "12": "A" }, "ignoredItems": [3, 4] }
//! ```

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{ItemId, Rank};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed override file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to replace override file: {0}")]
    Persist(#[from] tempfile::PersistError),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// The override held for one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverrideState {
    Rank(Rank),
    Ignored,
}

/// Serialized form of the whole store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedOverrides {
    #[serde(default)]
    pub manual_ranks: BTreeMap<ItemId, Rank>,
    #[serde(default)]
    pub ignored_items: Vec<ItemId>,
}

impl PersistedOverrides {
    fn from_states(states: &BTreeMap<ItemId, OverrideState>) -> Self {
        let mut out = Self::default();
        for (&id, state) in states {
            match state {
                OverrideState::Rank(rank) => {
                    out.manual_ranks.insert(id, *rank);
                }
                OverrideState::Ignored => out.ignored_items.push(id),
            }
        }
        out
    }

    /// An id listed in both collections resolves to ignored.
    fn into_states(self) -> BTreeMap<ItemId, OverrideState> {
        let mut states: BTreeMap<ItemId, OverrideState> = self
            .manual_ranks
            .into_iter()
            .map(|(id, rank)| (id, OverrideState::Rank(rank)))
            .collect();
        for id in self.ignored_items {
            if let Some(OverrideState::Rank(rank)) = states.insert(id, OverrideState::Ignored) {
                tracing::warn!(id, %rank, "item both ranked and ignored in stored overrides; keeping ignored");
            }
        }
        states
    }
}

/// Durable storage for the whole override set, replaced wholesale.
pub trait OverrideBackend {
    fn load(&self) -> Result<PersistedOverrides, StoreError>;
    fn save(&mut self, data: &PersistedOverrides) -> Result<(), StoreError>;
}

/// JSON file on disk, replaced atomically on every save.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl OverrideBackend for JsonFileBackend {
    fn load(&self) -> Result<PersistedOverrides, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(PersistedOverrides::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&mut self, data: &PersistedOverrides) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        // Write next to the target so the final rename stays on one filesystem.
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, data)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)?;
        Ok(())
    }
}

/// Backend that keeps the serialized state in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    pub data: Option<PersistedOverrides>,
    /// Number of successful saves.
    pub writes: usize,
    /// Make every load and save fail, to exercise the degraded paths.
    pub unavailable: bool,
}

impl MemoryBackend {
    pub fn with_data(data: PersistedOverrides) -> Self {
        Self {
            data: Some(data),
            ..Default::default()
        }
    }
}

impl OverrideBackend for MemoryBackend {
    fn load(&self) -> Result<PersistedOverrides, StoreError> {
        if self.unavailable {
            return Err(StoreError::Unavailable("memory backend disabled".into()));
        }
        Ok(self.data.clone().unwrap_or_default())
    }

    fn save(&mut self, data: &PersistedOverrides) -> Result<(), StoreError> {
        if self.unavailable {
            return Err(StoreError::Unavailable("memory backend disabled".into()));
        }
        self.data = Some(data.clone());
        self.writes += 1;
        Ok(())
    }
}

/// Manual ranks and ignored items, keyed by item id.
#[derive(Debug)]
pub struct OverrideStore<B: OverrideBackend = JsonFileBackend> {
    states: BTreeMap<ItemId, OverrideState>,
    backend: B,
}

impl OverrideStore<JsonFileBackend> {
    /// Open the JSON store at `path`; a missing file is an empty store.
    pub fn open_file(path: impl Into<PathBuf>) -> Self {
        Self::open(JsonFileBackend::new(path))
    }
}

impl OverrideStore<MemoryBackend> {
    pub fn in_memory() -> Self {
        Self::open(MemoryBackend::default())
    }
}

impl<B: OverrideBackend> OverrideStore<B> {
    /// Load the current state from `backend`, falling back to empty.
    pub fn open(backend: B) -> Self {
        let states = match backend.load() {
            Ok(data) => data.into_states(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to load overrides, starting empty");
                BTreeMap::new()
            }
        };
        Self { states, backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Set a manual rank. Clears the ignored flag.
    pub fn set_rank(&mut self, id: ItemId, rank: Rank) {
        self.states.insert(id, OverrideState::Rank(rank));
        self.persist();
    }

    pub fn get_rank(&self, id: ItemId) -> Option<Rank> {
        match self.states.get(&id) {
            Some(OverrideState::Rank(rank)) => Some(*rank),
            _ => None,
        }
    }

    /// Remove a manual rank. An ignored item stays ignored.
    pub fn clear_rank(&mut self, id: ItemId) {
        if let Some(OverrideState::Rank(_)) = self.states.get(&id) {
            self.states.remove(&id);
        }
        self.persist();
    }

    /// Mark an item as ignored. Clears any manual rank.
    pub fn ignore_item(&mut self, id: ItemId) {
        self.states.insert(id, OverrideState::Ignored);
        self.persist();
    }

    /// Remove the ignored flag. A manually ranked item keeps its rank.
    pub fn unignore_item(&mut self, id: ItemId) {
        if let Some(OverrideState::Ignored) = self.states.get(&id) {
            self.states.remove(&id);
        }
        self.persist();
    }

    pub fn is_ignored(&self, id: ItemId) -> bool {
        matches!(self.states.get(&id), Some(OverrideState::Ignored))
    }

    pub fn state(&self, id: ItemId) -> Option<OverrideState> {
        self.states.get(&id).copied()
    }

    /// All overrides, ordered by item id.
    pub fn iter(&self) -> impl Iterator<Item = (ItemId, OverrideState)> + '_ {
        self.states.iter().map(|(&id, &state)| (id, state))
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    fn persist(&mut self) {
        let data = PersistedOverrides::from_states(&self.states);
        if let Err(e) = self.backend.save(&data) {
            tracing::warn!(error = %e, "failed to persist overrides; change kept in memory only");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get_rank() {
        let mut store = OverrideStore::in_memory();
        assert_eq!(store.get_rank(7), None);
        store.set_rank(7, Rank::B);
        assert_eq!(store.get_rank(7), Some(Rank::B));
        store.set_rank(7, Rank::C);
        assert_eq!(store.get_rank(7), Some(Rank::C));
    }

    #[test]
    fn ignore_clears_rank() {
        let mut store = OverrideStore::in_memory();
        store.set_rank(1, Rank::A);
        store.ignore_item(1);
        assert!(store.is_ignored(1));
        assert_eq!(store.get_rank(1), None);
        let saved = store.backend().data.clone().unwrap();
        assert!(saved.manual_ranks.is_empty());
        assert_eq!(saved.ignored_items, vec![1]);
    }

    #[test]
    fn set_rank_clears_ignored() {
        let mut store = OverrideStore::in_memory();
        store.ignore_item(2);
        store.set_rank(2, Rank::C);
        assert!(!store.is_ignored(2));
        assert_eq!(store.get_rank(2), Some(Rank::C));
    }

    #[test]
    fn clear_rank_leaves_ignored_alone() {
        let mut store = OverrideStore::in_memory();
        store.ignore_item(3);
        store.clear_rank(3);
        assert!(store.is_ignored(3));

        store.set_rank(4, Rank::A);
        store.clear_rank(4);
        assert_eq!(store.get_rank(4), None);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn unignore_leaves_rank_alone() {
        let mut store = OverrideStore::in_memory();
        store.set_rank(5, Rank::B);
        store.unignore_item(5);
        assert_eq!(store.get_rank(5), Some(Rank::B));

        store.ignore_item(6);
        store.unignore_item(6);
        assert!(!store.is_ignored(6));
        assert_eq!(store.state(6), None);
    }

    #[test]
    fn every_mutation_writes_through() {
        let mut store = OverrideStore::in_memory();
        store.set_rank(1, Rank::A);
        store.ignore_item(2);
        store.clear_rank(1);
        assert_eq!(store.backend().writes, 3);
    }

    #[test]
    fn both_collections_resolve_to_ignored() {
        let mut data = PersistedOverrides::default();
        data.manual_ranks.insert(9, Rank::A);
        data.manual_ranks.insert(10, Rank::B);
        data.ignored_items.push(9);
        let store = OverrideStore::open(MemoryBackend::with_data(data));
        assert!(store.is_ignored(9));
        assert_eq!(store.get_rank(9), None);
        assert_eq!(store.get_rank(10), Some(Rank::B));
    }

    #[test]
    fn unavailable_backend_degrades_to_memory() {
        let backend = MemoryBackend {
            unavailable: true,
            ..Default::default()
        };
        let mut store = OverrideStore::open(backend);
        assert!(store.is_empty());
        store.set_rank(1, Rank::A);
        assert_eq!(store.get_rank(1), Some(Rank::A));
        assert_eq!(store.backend().writes, 0);
    }

    #[test]
    fn iter_is_ordered_by_id() {
        let mut store = OverrideStore::in_memory();
        store.ignore_item(30);
        store.set_rank(10, Rank::A);
        store.set_rank(20, Rank::C);
        let ids: Vec<_> = store.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![10, 20, 30]);
    }

    #[test]
    fn json_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("overrides.json");

        let mut store = OverrideStore::open_file(&path);
        store.set_rank(12, Rank::A);
        store.ignore_item(3);
        drop(store);

        let reopened = OverrideStore::open_file(&path);
        assert_eq!(reopened.get_rank(12), Some(Rank::A));
        assert!(reopened.is_ignored(3));
    }

    #[test]
    fn json_file_uses_documented_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overrides.json");
        let mut store = OverrideStore::open_file(&path);
        store.set_rank(12, Rank::B);
        store.ignore_item(4);

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["manualRanks"]["12"], "B");
        assert_eq!(raw["ignoredItems"], serde_json::json!([4]));
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overrides.json");
        std::fs::write(&path, "{not json").unwrap();
        let mut store = OverrideStore::open_file(&path);
        assert!(store.is_empty());

        // The next write replaces the corrupt file.
        store.set_rank(1, Rank::C);
        let reopened = OverrideStore::open_file(&path);
        assert_eq!(reopened.get_rank(1), Some(Rank::C));
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = OverrideStore::open_file(dir.path().join("absent.json"));
        assert!(store.is_empty());
    }
}
