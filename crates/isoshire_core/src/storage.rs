//! Local persistence of the editing session
//!
//! The whole session (current map, tool selection, saved states) is kept as
//! one JSON blob under [`STORAGE_KEY`]. It is read once when the store is
//! built and overwritten after every successful mutation. A blob that no
//! longer parses is set aside with [`StorageBackend::back_up`] before the
//! first overwrite.

use crate::snapshot::{self, MapSnapshot};
use crate::store::SavedState;
use crate::{CharacterId, Location, TileCell, DEFAULT_LOCATION};
use directories::ProjectDirs;
use serde::Serialize;
use serde_json::Value;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Key naming the persisted blob
pub const STORAGE_KEY: &str = "isoshire-storage";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    NoDataDir,
    Poisoned,
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::IoError(e) => write!(f, "IO error: {}", e),
            StorageError::ParseError(e) => write!(f, "Parse error: {}", e),
            StorageError::SerializeError(e) => write!(f, "Serialize error: {}", e),
            StorageError::NoDataDir => write!(f, "Could not determine data directory"),
            StorageError::Poisoned => write!(f, "Storage lock poisoned"),
        }
    }
}

impl std::error::Error for StorageError {}

/// Where the session blob lives
pub trait StorageBackend: Send + Sync {
    /// The stored blob, or `None` if nothing was ever saved
    fn load(&self) -> Result<Option<String>, StorageError>;

    /// Replace the stored blob
    fn save(&mut self, blob: &str) -> Result<(), StorageError>;

    /// Keep a copy of the current blob where [`StorageBackend::save`] won't
    /// overwrite it
    fn back_up(&mut self) -> Result<(), StorageError>;
}

/// In-process backend. Clones share the same blob, so a test can keep one
/// handle and give another to the store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    blob: Arc<Mutex<Option<String>>>,
    backup: Arc<Mutex<Option<String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an existing blob
    pub fn with_blob(blob: impl Into<String>) -> Self {
        Self {
            blob: Arc::new(Mutex::new(Some(blob.into()))),
            ..Self::default()
        }
    }

    /// Current blob contents
    pub fn contents(&self) -> Option<String> {
        self.blob.lock().ok().and_then(|blob| blob.clone())
    }

    /// Blob set aside by the last [`StorageBackend::back_up`]
    pub fn backup(&self) -> Option<String> {
        self.backup.lock().ok().and_then(|backup| backup.clone())
    }
}

impl StorageBackend for MemoryStorage {
    fn load(&self) -> Result<Option<String>, StorageError> {
        let blob = self.blob.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(blob.clone())
    }

    fn save(&mut self, blob: &str) -> Result<(), StorageError> {
        let mut stored = self.blob.lock().map_err(|_| StorageError::Poisoned)?;
        *stored = Some(blob.to_string());
        Ok(())
    }

    fn back_up(&mut self) -> Result<(), StorageError> {
        let current = self.load()?;
        let mut backup = self.backup.lock().map_err(|_| StorageError::Poisoned)?;
        *backup = current;
        Ok(())
    }
}

/// Blob kept in a single JSON file
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<platform data dir>/isoshire-storage.json`
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "isoshire", "isoshire")
            .map(|dirs| dirs.data_dir().join(format!("{}.json", STORAGE_KEY)))
    }

    /// Backend at [`FileStorage::default_path`]
    pub fn at_default_path() -> Result<Self, StorageError> {
        Self::default_path()
            .map(Self::new)
            .ok_or(StorageError::NoDataDir)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `<path>.bak`, where an unreadable blob is copied before it is replaced
    pub fn backup_path(&self) -> PathBuf {
        self.sibling(".bak")
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from(STORAGE_KEY));
        name.push(suffix);
        self.path.with_file_name(name)
    }
}

impl StorageBackend for FileStorage {
    fn load(&self) -> Result<Option<String>, StorageError> {
        if !self.path.exists() {
            return Ok(None);
        }
        std::fs::read_to_string(&self.path)
            .map(Some)
            .map_err(|e| StorageError::IoError(e.to_string()))
    }

    fn save(&mut self, blob: &str) -> Result<(), StorageError> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| StorageError::IoError(e.to_string()))?;
        }
        // Write beside the target and rename, so a crash never leaves a half-written blob
        let staging = self.sibling(".tmp");
        std::fs::write(&staging, blob).map_err(|e| StorageError::IoError(e.to_string()))?;
        std::fs::rename(&staging, &self.path).map_err(|e| StorageError::IoError(e.to_string()))
    }

    fn back_up(&mut self) -> Result<(), StorageError> {
        if !self.path.exists() {
            return Ok(());
        }
        std::fs::copy(&self.path, self.backup_path())
            .map(|_| ())
            .map_err(|e| StorageError::IoError(e.to_string()))
    }
}

/// Everything the store persists
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PersistedState {
    pub snapshot: MapSnapshot,
    pub active_tool: TileCell,
    pub active_character_tool: Option<CharacterId>,
    pub saved_states: Vec<SavedState>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SavedStateWire<'a> {
    id: Uuid,
    name: &'a str,
    map: Vec<Vec<TileCell>>,
    character_map: Vec<Vec<Option<CharacterId>>>,
    grid_size: usize,
    location: Location,
    created_at: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PersistedWire<'a> {
    location: Location,
    grid_size: usize,
    map: Vec<Vec<TileCell>>,
    character_map: Vec<Vec<Option<CharacterId>>>,
    active_tool: TileCell,
    active_character_tool: Option<CharacterId>,
    saved_states: Vec<SavedStateWire<'a>>,
}

impl PersistedState {
    pub fn to_json(&self) -> Result<String, StorageError> {
        let grid = &self.snapshot.grid;
        let wire = PersistedWire {
            location: self.snapshot.location,
            grid_size: grid.size(),
            map: grid.tile_rows(),
            character_map: grid.character_rows(),
            active_tool: self.active_tool,
            active_character_tool: self.active_character_tool,
            saved_states: self
                .saved_states
                .iter()
                .map(|saved| SavedStateWire {
                    id: saved.id,
                    name: &saved.name,
                    map: saved.snapshot.grid.tile_rows(),
                    character_map: saved.snapshot.grid.character_rows(),
                    grid_size: saved.snapshot.grid.size(),
                    location: saved.snapshot.location,
                    created_at: saved.created_at,
                })
                .collect(),
        };
        serde_json::to_string(&wire).map_err(|e| StorageError::SerializeError(e.to_string()))
    }

    /// Parse a blob. Only unparseable JSON is an error; everything else is
    /// normalized by [`PersistedState::from_value`].
    pub fn from_json(text: &str) -> Result<Self, StorageError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| StorageError::ParseError(e.to_string()))?;
        Ok(Self::from_value(&value))
    }

    /// Recover as much of a stored session as passes validation
    pub fn from_value(raw: &Value) -> Self {
        let snapshot = match snapshot::validate_with_default_location(raw, DEFAULT_LOCATION) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!("Persisted map is invalid ({}), starting with a fresh grid", e);
                let location = raw
                    .get("location")
                    .and_then(Value::as_str)
                    .and_then(Location::from_id)
                    .unwrap_or_default();
                MapSnapshot::new(Default::default(), location)
            }
        };

        let active_tool = raw
            .get("activeTool")
            .and_then(|tool| snapshot::validate_tile(tool).ok())
            .unwrap_or_default();

        let active_character_tool = raw
            .get("activeCharacterTool")
            .and_then(Value::as_str)
            .and_then(CharacterId::parse);

        let saved_states = raw
            .get("savedStates")
            .and_then(Value::as_array)
            .map(|entries| entries.iter().filter_map(saved_state_from_value).collect())
            .unwrap_or_default();

        Self {
            snapshot,
            active_tool,
            active_character_tool,
            saved_states,
        }
    }
}

fn saved_state_from_value(raw: &Value) -> Option<SavedState> {
    let id = raw
        .get("id")
        .and_then(Value::as_str)
        .and_then(|id| Uuid::parse_str(id).ok());
    let name = raw.get("name").and_then(Value::as_str);
    let created_at = raw.get("createdAt").and_then(Value::as_i64);

    let (Some(id), Some(name), Some(created_at)) = (id, name, created_at) else {
        tracing::warn!("Dropping persisted saved state with missing metadata");
        return None;
    };

    match snapshot::validate_with_default_location(raw, DEFAULT_LOCATION) {
        Ok(snapshot) => Some(SavedState {
            id,
            name: name.to_string(),
            created_at,
            snapshot,
        }),
        Err(e) => {
            tracing::warn!("Dropping persisted saved state '{}': {}", name, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Grid, Realm};
    use serde_json::json;

    fn sample_state() -> PersistedState {
        let mut grid = Grid::new(4);
        grid.set_tile(1, 1, TileCell::with_realm(2, 5, Realm::Rivendell));
        grid.set_character(3, 0, CharacterId::parse("hobbit-4"));
        let snapshot = MapSnapshot::new(grid, Location::Mixed);

        PersistedState {
            snapshot: snapshot.clone(),
            active_tool: TileCell::new(3, 9),
            active_character_tool: CharacterId::parse("hobbit-2"),
            saved_states: vec![SavedState {
                id: Uuid::new_v4(),
                name: "Rivendell".to_string(),
                created_at: 1_700_000_000_000,
                snapshot,
            }],
        }
    }

    #[test]
    fn test_blob_round_trip() {
        let state = sample_state();
        let blob = state.to_json().unwrap();
        assert_eq!(PersistedState::from_json(&blob).unwrap(), state);
    }

    #[test]
    fn test_invalid_grid_falls_back_to_fresh_default() {
        let raw = json!({
            "location": "moria",
            "gridSize": 40,
            "map": [],
            "activeTool": [9, 9],
            "activeCharacterTool": "gollum"
        });
        let state = PersistedState::from_value(&raw);
        assert_eq!(state.snapshot.grid, Grid::default());
        assert_eq!(state.snapshot.location, Location::Realm(Realm::Moria));
        assert_eq!(state.active_tool, TileCell::default());
        assert_eq!(state.active_character_tool, None);
    }

    #[test]
    fn test_invalid_saved_states_are_dropped() {
        let good = json!({
            "id": Uuid::new_v4().to_string(),
            "name": "ok",
            "createdAt": 5,
            "gridSize": 3,
            "map": vec![vec![json!([0, 0]); 3]; 3]
        });
        let bad_map = json!({
            "id": Uuid::new_v4().to_string(),
            "name": "bad",
            "createdAt": 5,
            "gridSize": 3,
            "map": vec![vec![json!([0, 0]); 3]; 2]
        });
        let bad_id = json!({ "id": "nope", "name": "x", "createdAt": 1 });
        let raw = json!({ "savedStates": [good, bad_map, bad_id] });

        let state = PersistedState::from_value(&raw);
        assert_eq!(state.saved_states.len(), 1);
        assert_eq!(state.saved_states[0].name, "ok");
        assert_eq!(state.saved_states[0].snapshot.location, DEFAULT_LOCATION);
    }

    #[test]
    fn test_memory_storage_shares_blob() {
        let storage = MemoryStorage::new();
        let mut handle = storage.clone();
        assert_eq!(storage.load().unwrap(), None);
        handle.save("{}").unwrap();
        assert_eq!(storage.contents().as_deref(), Some("{}"));
    }

    #[test]
    fn test_file_storage_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::new(dir.path().join("nested").join("state.json"));
        assert_eq!(storage.load().unwrap(), None);
        storage.save("{\"gridSize\":3}").unwrap();
        assert_eq!(storage.load().unwrap().as_deref(), Some("{\"gridSize\":3}"));
        assert!(!storage.path().with_file_name("state.json.tmp").exists());
    }

    #[test]
    fn test_file_storage_save_replaces_whole_blob() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::new(dir.path().join("state.json"));
        storage.save("{\"gridSize\":20,\"map\":[]}").unwrap();
        storage.save("{}").unwrap();
        assert_eq!(storage.load().unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn test_file_storage_back_up_copies_current_blob() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::new(dir.path().join("isoshire-storage.json"));
        storage.back_up().unwrap();
        assert!(!storage.backup_path().exists());

        storage.save("{\"gridSize\":").unwrap();
        storage.back_up().unwrap();
        storage.save("{}").unwrap();
        assert_eq!(
            storage.backup_path(),
            dir.path().join("isoshire-storage.json.bak")
        );
        assert_eq!(
            std::fs::read_to_string(storage.backup_path()).unwrap(),
            "{\"gridSize\":"
        );
    }
}
