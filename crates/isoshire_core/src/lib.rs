//! Core data structures for the Isoshire isometric map editor
//!
//! This crate holds everything the editor needs that is not UI:
//! - `Grid` - the N×N tile layer and character layer
//! - `HistoryLog` - bounded undo stack of `MapSnapshot`s
//! - `MapStore` - the single owner of grid, history, saved states and tool selection
//! - `IsoProjector` - grid ↔ isometric screen-space conversion
//! - `snapshot` - validation of untrusted map payloads and JSON export
//! - `collection` - community collection documents and the flat-file store
//! - `storage` - pluggable backends for the persisted state blob

pub mod collection;
mod grid;
mod history;
mod projector;
mod realm;
mod roster;
pub mod snapshot;
pub mod storage;
mod store;
mod tile;

pub use collection::{Author, CollectionError, CollectionMap, CollectionSource, CollectionStore};
pub use grid::{Grid, DEFAULT_GRID_SIZE, MAX_GRID_SIZE, MIN_GRID_SIZE};
pub use history::{HistoryLog, HISTORY_LIMIT};
pub use projector::{IsoProjector, SpriteMetrics};
pub use realm::{Location, Realm, DEFAULT_LOCATION, DEFAULT_REALM};
pub use roster::{character, CharacterDefinition, CharacterId, CharacterRealm, CHARACTERS};
pub use snapshot::{ImportError, MapSnapshot, SnapshotError, TileError};
pub use storage::{FileStorage, MemoryStorage, StorageBackend, StorageError, STORAGE_KEY};
pub use store::{LiveTool, MapStore, SavedState, StoreError, StoreEvent, SubscriptionId};
pub use tile::{TileCell, ATLAS_COLUMNS, ATLAS_ROWS};
