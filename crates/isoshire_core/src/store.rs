//! The map store: single owner of the editing session
//!
//! Every mutation goes through [`MapStore`]. A mutation that changes the map
//! first records the pre-mutation snapshot in the history log, then notifies
//! subscribers and writes the session to the storage backend. Mutations that
//! would leave the state unchanged return `Ok(false)` and record nothing.

use crate::snapshot::MapSnapshot;
use crate::storage::{PersistedState, StorageBackend};
use crate::{CharacterId, Grid, HistoryLog, Location, TileCell};
use chrono::Utc;
use std::fmt;
use uuid::Uuid;

/// A named copy of the map created by an explicit save
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedState {
    pub id: Uuid,
    pub name: String,
    /// Milliseconds since the Unix epoch
    pub created_at: i64,
    pub snapshot: MapSnapshot,
}

/// What a click paints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveTool {
    Tile(TileCell),
    Character(CharacterId),
}

/// Change notification sent to subscribers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreEvent {
    GridChanged,
    LocationChanged,
    ToolChanged,
    SavedStatesChanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    InvalidGridSize(usize),
    OutOfBounds { row: usize, col: usize, size: usize },
    TileOutOfAtlas(TileCell),
    EmptyName,
    UnknownSavedState(Uuid),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::InvalidGridSize(size) => write!(
                f,
                "Grid size {} is outside {}..={}",
                size,
                crate::MIN_GRID_SIZE,
                crate::MAX_GRID_SIZE
            ),
            StoreError::OutOfBounds { row, col, size } => {
                write!(f, "Cell ({}, {}) is outside the {}x{} grid", row, col, size, size)
            }
            StoreError::TileOutOfAtlas(tile) => {
                write!(f, "Tile ({}, {}) is outside the sprite atlas", tile.row, tile.col)
            }
            StoreError::EmptyName => write!(f, "Saved state name cannot be empty"),
            StoreError::UnknownSavedState(id) => write!(f, "No saved state with id {}", id),
        }
    }
}

impl std::error::Error for StoreError {}

type Listener = Box<dyn Fn(&StoreEvent) + Send + Sync>;

/// Owner of grid, location, undo history, saved states and tool selection
#[cfg_attr(feature = "bevy", derive(bevy::prelude::Resource))]
pub struct MapStore {
    grid: Grid,
    location: Location,
    history: HistoryLog,
    saved_states: Vec<SavedState>,
    active_tool: TileCell,
    active_character_tool: Option<CharacterId>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
    revision: u64,
    storage: Option<Box<dyn StorageBackend>>,
}

impl Default for MapStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MapStore {
    /// A fresh session with nothing persisted
    pub fn new() -> Self {
        Self {
            grid: Grid::default(),
            location: Location::default(),
            history: HistoryLog::default(),
            saved_states: Vec::new(),
            active_tool: TileCell::default(),
            active_character_tool: None,
            listeners: Vec::new(),
            next_subscription: 0,
            revision: 0,
            storage: None,
        }
    }

    /// Restore the session held by `backend` and keep writing to it.
    ///
    /// A missing, unreadable or corrupt blob starts a fresh session.
    pub fn with_storage(mut backend: impl StorageBackend + 'static) -> Self {
        let persisted = match backend.load() {
            Ok(Some(blob)) => PersistedState::from_json(&blob).unwrap_or_else(|e| {
                tracing::warn!("Ignoring stored session: {}", e);
                if let Err(e) = backend.back_up() {
                    tracing::warn!("Could not back up stored session: {}", e);
                }
                PersistedState::default()
            }),
            Ok(None) => PersistedState::default(),
            Err(e) => {
                tracing::warn!("Could not read stored session: {}", e);
                PersistedState::default()
            }
        };

        let mut store = Self::new();
        store.grid = persisted.snapshot.grid;
        store.location = persisted.snapshot.location;
        store.active_tool = persisted.active_tool;
        store.active_character_tool = persisted.active_character_tool;
        store.saved_states = persisted.saved_states;
        store.storage = Some(Box::new(backend));
        store
    }

    // ---- accessors ----

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn grid_size(&self) -> usize {
        self.grid.size()
    }

    pub fn location(&self) -> Location {
        self.location
    }

    /// Deep copy of the tracked state
    pub fn snapshot(&self) -> MapSnapshot {
        MapSnapshot::new(self.grid.clone(), self.location)
    }

    pub fn saved_states(&self) -> &[SavedState] {
        &self.saved_states
    }

    pub fn saved_state(&self, id: Uuid) -> Option<&SavedState> {
        self.saved_states.iter().find(|s| s.id == id)
    }

    pub fn active_tool(&self) -> TileCell {
        self.active_tool
    }

    pub fn active_character_tool(&self) -> Option<CharacterId> {
        self.active_character_tool
    }

    /// The character tool when one is selected, otherwise the tile template
    pub fn live_tool(&self) -> LiveTool {
        match self.active_character_tool {
            Some(id) => LiveTool::Character(id),
            None => LiveTool::Tile(self.active_tool),
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Bumped on every successful transition
    pub fn revision(&self) -> u64 {
        self.revision
    }

    // ---- subscriptions ----

    pub fn subscribe(
        &mut self,
        listener: impl Fn(&StoreEvent) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns whether the subscription existed
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    // ---- map mutations ----

    /// Switch location. Not recorded in history.
    pub fn set_location(&mut self, location: Location) -> bool {
        if self.location == location {
            return false;
        }
        self.location = location;
        self.commit(&[StoreEvent::LocationChanged]);
        true
    }

    /// Replace the grid with an empty one of `size`
    pub fn set_grid_size(&mut self, size: usize) -> Result<bool, StoreError> {
        if !Grid::is_valid_size(size) {
            return Err(StoreError::InvalidGridSize(size));
        }
        if self.grid.size() == size && self.grid.is_empty() {
            return Ok(false);
        }

        self.record();
        self.grid.resize(size);
        self.commit(&[StoreEvent::GridChanged]);
        Ok(true)
    }

    /// Reset to an empty grid, at `size` or the current size
    pub fn init_map(&mut self, size: Option<usize>) -> Result<bool, StoreError> {
        self.set_grid_size(size.unwrap_or(self.grid.size()))
    }

    pub fn set_tile(&mut self, row: usize, col: usize, tile: TileCell) -> Result<bool, StoreError> {
        self.check_bounds(row, col)?;
        if !tile.is_within_atlas() {
            return Err(StoreError::TileOutOfAtlas(tile));
        }
        if self.grid.tile(row, col) == Some(tile) {
            return Ok(false);
        }

        self.record();
        self.grid.set_tile(row, col, tile);
        self.commit(&[StoreEvent::GridChanged]);
        Ok(true)
    }

    /// Reset a tile to the default cell, dropping any realm tag
    pub fn clear_tile(&mut self, row: usize, col: usize) -> Result<bool, StoreError> {
        self.set_tile(row, col, TileCell::default())
    }

    pub fn set_character(
        &mut self,
        row: usize,
        col: usize,
        character: CharacterId,
    ) -> Result<bool, StoreError> {
        self.write_character(row, col, Some(character))
    }

    pub fn clear_character(&mut self, row: usize, col: usize) -> Result<bool, StoreError> {
        self.write_character(row, col, None)
    }

    /// Remove the character at a cell if there is one, otherwise clear the tile
    pub fn clear_at(&mut self, row: usize, col: usize) -> Result<bool, StoreError> {
        self.check_bounds(row, col)?;
        match self.grid.character(row, col) {
            Some(Some(_)) => self.clear_character(row, col),
            _ => self.clear_tile(row, col),
        }
    }

    fn write_character(
        &mut self,
        row: usize,
        col: usize,
        character: Option<CharacterId>,
    ) -> Result<bool, StoreError> {
        self.check_bounds(row, col)?;
        if self.grid.character(row, col) == Some(character) {
            return Ok(false);
        }

        self.record();
        self.grid.set_character(row, col, character);
        self.commit(&[StoreEvent::GridChanged]);
        Ok(true)
    }

    /// Restore the most recent snapshot. Returns whether anything was undone.
    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.history.pop() else {
            return false;
        };

        let mut events = vec![StoreEvent::GridChanged];
        if previous.location != self.location {
            events.push(StoreEvent::LocationChanged);
        }
        self.grid = previous.grid;
        self.location = previous.location;
        self.commit(&events);
        true
    }

    // ---- saved states ----

    /// Save a copy of the current map under `name` (trimmed)
    pub fn save_state(&mut self, name: &str) -> Result<Uuid, StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::EmptyName);
        }

        let id = Uuid::new_v4();
        self.saved_states.push(SavedState {
            id,
            name: name.to_string(),
            created_at: Utc::now().timestamp_millis(),
            snapshot: self.snapshot(),
        });
        self.commit(&[StoreEvent::SavedStatesChanged]);
        Ok(id)
    }

    pub fn load_state(&mut self, id: Uuid) -> Result<bool, StoreError> {
        let snapshot = self
            .saved_state(id)
            .map(|saved| saved.snapshot.clone())
            .ok_or(StoreError::UnknownSavedState(id))?;
        Ok(self.load_snapshot(snapshot))
    }

    /// Replace the map with an already validated snapshot
    pub fn load_snapshot(&mut self, snapshot: MapSnapshot) -> bool {
        if snapshot.grid == self.grid && snapshot.location == self.location {
            return false;
        }

        let mut events = vec![StoreEvent::GridChanged];
        if snapshot.location != self.location {
            events.push(StoreEvent::LocationChanged);
        }
        self.record();
        self.grid = snapshot.grid;
        self.location = snapshot.location;
        self.commit(&events);
        true
    }

    pub fn delete_state(&mut self, id: Uuid) -> Result<(), StoreError> {
        let index = self
            .saved_states
            .iter()
            .position(|s| s.id == id)
            .ok_or(StoreError::UnknownSavedState(id))?;
        self.saved_states.remove(index);
        self.commit(&[StoreEvent::SavedStatesChanged]);
        Ok(())
    }

    // ---- tool selection ----

    pub fn set_active_tool(&mut self, tile: TileCell) -> Result<bool, StoreError> {
        if !tile.is_within_atlas() {
            return Err(StoreError::TileOutOfAtlas(tile));
        }
        if self.active_tool == tile {
            return Ok(false);
        }
        self.active_tool = tile;
        self.commit(&[StoreEvent::ToolChanged]);
        Ok(true)
    }

    pub fn set_active_character_tool(&mut self, character: Option<CharacterId>) -> bool {
        if self.active_character_tool == character {
            return false;
        }
        self.active_character_tool = character;
        self.commit(&[StoreEvent::ToolChanged]);
        true
    }

    // ---- internals ----

    fn check_bounds(&self, row: usize, col: usize) -> Result<(), StoreError> {
        if self.grid.contains(row, col) {
            Ok(())
        } else {
            Err(StoreError::OutOfBounds {
                row,
                col,
                size: self.grid.size(),
            })
        }
    }

    fn record(&mut self) {
        self.history.push(self.snapshot());
    }

    fn commit(&mut self, events: &[StoreEvent]) {
        self.revision += 1;
        for event in events {
            for (_, listener) in &self.listeners {
                listener(event);
            }
        }
        self.persist();
    }

    fn persist(&mut self) {
        if self.storage.is_none() {
            return;
        }

        let state = PersistedState {
            snapshot: self.snapshot(),
            active_tool: self.active_tool,
            active_character_tool: self.active_character_tool,
            saved_states: self.saved_states.clone(),
        };
        let result = state
            .to_json()
            .and_then(|blob| match self.storage.as_mut() {
                Some(storage) => storage.save(&blob),
                None => Ok(()),
            });
        if let Err(e) = result {
            tracing::warn!("Could not persist session: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FileStorage, MemoryStorage, Realm};
    use std::sync::{Arc, Mutex};

    fn hobbit(n: u8) -> CharacterId {
        CharacterId::parse(&format!("hobbit-{}", n)).unwrap()
    }

    #[test]
    fn test_set_tile_validates_input() {
        let mut store = MapStore::new();
        assert_eq!(
            store.set_tile(7, 0, TileCell::new(1, 1)),
            Err(StoreError::OutOfBounds {
                row: 7,
                col: 0,
                size: 7
            })
        );
        assert_eq!(
            store.set_tile(0, 0, TileCell::new(6, 0)),
            Err(StoreError::TileOutOfAtlas(TileCell::new(6, 0)))
        );
        assert_eq!(store.history_len(), 0);
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn test_set_tile_pushes_history_once() {
        let mut store = MapStore::new();
        assert_eq!(store.set_tile(2, 2, TileCell::new(1, 4)), Ok(true));
        assert_eq!(store.history_len(), 1);
        assert_eq!(store.set_tile(2, 2, TileCell::new(1, 4)), Ok(false));
        assert_eq!(store.history_len(), 1);
    }

    #[test]
    fn test_grid_size_bounds() {
        let mut store = MapStore::new();
        assert_eq!(store.set_grid_size(2), Err(StoreError::InvalidGridSize(2)));
        assert_eq!(store.set_grid_size(21), Err(StoreError::InvalidGridSize(21)));
        assert_eq!(store.set_grid_size(20), Ok(true));
        assert_eq!(store.grid_size(), 20);
    }

    #[test]
    fn test_init_map_on_empty_grid_is_noop() {
        let mut store = MapStore::new();
        assert_eq!(store.init_map(None), Ok(false));
        assert_eq!(store.history_len(), 0);

        store.set_tile(0, 0, TileCell::new(2, 2)).unwrap();
        assert_eq!(store.init_map(None), Ok(true));
        assert!(store.grid().is_empty());
        assert_eq!(store.history_len(), 2);
    }

    #[test]
    fn test_live_tool_prefers_character() {
        let mut store = MapStore::new();
        store.set_active_tool(TileCell::new(3, 3)).unwrap();
        assert_eq!(store.live_tool(), LiveTool::Tile(TileCell::new(3, 3)));
        assert!(store.set_active_character_tool(Some(hobbit(5))));
        assert_eq!(store.live_tool(), LiveTool::Character(hobbit(5)));
        assert!(store.set_active_character_tool(None));
        assert_eq!(store.live_tool(), LiveTool::Tile(TileCell::new(3, 3)));
        assert_eq!(store.history_len(), 0);
    }

    #[test]
    fn test_save_state_requires_name() {
        let mut store = MapStore::new();
        assert_eq!(store.save_state("   "), Err(StoreError::EmptyName));
        let id = store.save_state("  Hobbiton ").unwrap();
        assert_eq!(store.saved_state(id).map(|s| s.name.as_str()), Some("Hobbiton"));
        assert_eq!(store.history_len(), 0);
    }

    #[test]
    fn test_unknown_saved_state() {
        let mut store = MapStore::new();
        let id = Uuid::new_v4();
        assert_eq!(store.load_state(id), Err(StoreError::UnknownSavedState(id)));
        assert_eq!(store.delete_state(id), Err(StoreError::UnknownSavedState(id)));
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn test_saved_state_is_a_deep_copy() {
        let mut store = MapStore::new();
        store.set_tile(1, 1, TileCell::new(2, 2)).unwrap();
        let id = store.save_state("first").unwrap();
        store.set_tile(1, 1, TileCell::new(4, 4)).unwrap();

        let saved = store.saved_state(id).unwrap();
        assert_eq!(saved.snapshot.grid.tile(1, 1), Some(TileCell::new(2, 2)));

        assert_eq!(store.load_state(id), Ok(true));
        assert_eq!(store.grid().tile(1, 1), Some(TileCell::new(2, 2)));
        assert_eq!(store.history_len(), 3);

        store.delete_state(id).unwrap();
        assert!(store.saved_states().is_empty());
    }

    #[test]
    fn test_subscribers_receive_events() {
        let mut store = MapStore::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let id = store.subscribe(move |event| sink.lock().unwrap().push(*event));

        store.set_location(Location::Realm(Realm::Rohan));
        store.set_tile(0, 0, TileCell::new(1, 1)).unwrap();
        store.undo();
        assert!(store.unsubscribe(id));
        store.set_character(0, 0, hobbit(1)).unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                StoreEvent::LocationChanged,
                StoreEvent::GridChanged,
                StoreEvent::GridChanged
            ]
        );
        assert!(!store.unsubscribe(id));
    }

    #[test]
    fn test_undo_restores_location_changed_by_load() {
        let mut store = MapStore::new();
        let mut snapshot = MapSnapshot::new(Grid::new(4), Location::Mixed);
        snapshot
            .grid
            .set_tile(0, 0, TileCell::with_realm(1, 1, Realm::Gondor));

        assert!(store.load_snapshot(snapshot.clone()));
        assert!(!store.load_snapshot(snapshot));
        assert_eq!(store.location(), Location::Mixed);

        assert!(store.undo());
        assert_eq!(store.location(), Location::default());
        assert_eq!(store.grid_size(), 7);
    }

    #[test]
    fn test_mutations_are_persisted() {
        let storage = MemoryStorage::new();
        let mut store = MapStore::with_storage(storage.clone());
        assert!(storage.contents().is_none());

        store.set_tile(0, 1, TileCell::new(5, 11)).unwrap();
        let blob = storage.contents().unwrap();
        let restored = PersistedState::from_json(&blob).unwrap();
        assert_eq!(restored.snapshot.grid.tile(0, 1), Some(TileCell::new(5, 11)));
    }

    #[test]
    fn test_corrupt_blob_starts_fresh() {
        let storage = MemoryStorage::with_blob("{ not json");
        let mut store = MapStore::with_storage(storage.clone());
        assert_eq!(store.grid(), &Grid::default());
        assert!(store.saved_states().is_empty());

        store.set_tile(0, 0, TileCell::new(1, 1)).unwrap();
        assert_eq!(storage.backup().as_deref(), Some("{ not json"));
    }

    #[test]
    fn test_truncated_session_file_is_kept_aside() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("isoshire-storage.json");

        let mut store = MapStore::with_storage(FileStorage::new(&path));
        store.save_state("Bag End").unwrap();
        let blob = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, &blob[..blob.len() - 3]).unwrap();

        let mut reopened = MapStore::with_storage(FileStorage::new(&path));
        assert!(reopened.saved_states().is_empty());
        reopened.set_tile(0, 0, TileCell::new(1, 1)).unwrap();

        let backup = std::fs::read_to_string(FileStorage::new(&path).backup_path()).unwrap();
        let recovered = PersistedState::from_json(&blob).unwrap();
        assert_eq!(backup, blob[..blob.len() - 3]);
        assert_eq!(recovered.saved_states.len(), 1);
        assert_eq!(recovered.saved_states[0].name, "Bag End");
    }
}
