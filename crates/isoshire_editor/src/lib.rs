//! isoshire_editor - Isometric tile and character map editor
//!
//! This crate provides the editor application:
//! - Isometric viewport with tile and character painting
//! - Location selection (single realm or mixed)
//! - Undo, saved states and JSON import/export
//! - PNG export of the rendered map
//! - Community collection gallery
//!
//! # Usage
//!
//! ```rust,ignore
//! use bevy::prelude::*;
//! use isoshire_editor::EditorPlugin;
//!
//! fn main() {
//!     App::new()
//!         .add_plugins(DefaultPlugins)
//!         .add_plugins(EditorPlugin::new())
//!         .run();
//! }
//! ```

pub mod commands;
pub mod library;
pub mod preferences;
pub mod render;
pub mod tools;
pub mod ui;

pub use isoshire_core;

use bevy::prelude::*;
use bevy_egui::EguiPlugin;
use isoshire_core::{FileStorage, MapStore, DEFAULT_GRID_SIZE};
use std::path::PathBuf;

use commands::handle_keyboard_shortcuts;
use library::{load_initial_collection, CollectionLibrary};
use preferences::EditorPreferences;
use render::MapRenderPlugin;
use tools::EditorToolsPlugin;
use ui::{EditorUiPlugin, PendingAction};

/// Resource storing the base assets path sprites are loaded from
#[derive(Resource, Default)]
pub struct AssetsBasePath(pub PathBuf);

impl AssetsBasePath {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &std::path::Path {
        &self.0
    }
}

/// Main editor plugin
#[derive(Default)]
pub struct EditorPlugin {
    pub assets_path: Option<PathBuf>,
    pub storage_path: Option<PathBuf>,
    pub collections_dir: Option<PathBuf>,
    pub initial_collection: Option<String>,
}

impl EditorPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_assets_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.assets_path = Some(path.into());
        self
    }

    /// Keep the session blob at `path` instead of the platform data dir
    pub fn with_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = Some(path.into());
        self
    }

    pub fn with_collections_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.collections_dir = Some(path.into());
        self
    }

    /// Load this collection map once the editor starts
    pub fn with_initial_collection(mut self, id: impl Into<String>) -> Self {
        self.initial_collection = Some(id.into());
        self
    }

    fn detect_assets_path(&self) -> PathBuf {
        if let Some(path) = &self.assets_path {
            return path.clone();
        }

        std::env::current_dir()
            .map(|p| p.join("assets"))
            .unwrap_or_else(|_| PathBuf::from("assets"))
    }

    /// Plugin setting first, then preferences, then the platform data dir
    fn resolve_storage_path(&self, preferences: &EditorPreferences) -> Option<PathBuf> {
        self.storage_path
            .clone()
            .or_else(|| preferences.storage_path.clone())
            .or_else(FileStorage::default_path)
    }

    fn create_store(&self, preferences: &EditorPreferences) -> MapStore {
        match self.resolve_storage_path(preferences) {
            Some(path) => {
                info!("EditorPlugin: Using storage file: {:?}", path);
                MapStore::with_storage(FileStorage::new(path))
            }
            None => {
                warn!("No data directory available, the session will not be persisted");
                MapStore::new()
            }
        }
    }
}

impl Plugin for EditorPlugin {
    fn build(&self, app: &mut App) {
        let assets_path = self.detect_assets_path();
        info!("EditorPlugin: Using assets path: {:?}", assets_path);

        let preferences = EditorPreferences::load();
        info!("Loaded editor preferences");

        let store = self.create_store(&preferences);
        let collections_dir = self
            .collections_dir
            .clone()
            .unwrap_or_else(|| preferences.collections_dir_or_default());
        let library = CollectionLibrary::new(collections_dir, self.initial_collection.clone());

        let editor_state = EditorState {
            grid_size_input: store.grid_size(),
            ..default()
        };

        app.add_plugins(EguiPlugin::default())
            .add_plugins(EditorUiPlugin)
            .add_plugins(MapRenderPlugin)
            .add_plugins(EditorToolsPlugin)
            .insert_resource(editor_state)
            .insert_resource(preferences)
            .insert_resource(store)
            .insert_resource(library)
            .insert_resource(AssetsBasePath::new(assets_path))
            .add_systems(
                Startup,
                (setup_editor_camera, check_assets_path, load_initial_collection),
            )
            .add_systems(Update, handle_keyboard_shortcuts);
    }
}

fn setup_editor_camera(mut commands: Commands, camera_query: Query<&Camera2d>) {
    if camera_query.is_empty() {
        commands.spawn(Camera2d);
    }
}

fn check_assets_path(assets: Res<AssetsBasePath>) {
    if !assets.path().is_dir() {
        warn!(
            "Assets directory {:?} not found, tiles and characters will render blank",
            assets.path()
        );
    }
}

/// Short message shown under the toolbar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub is_error: bool,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            is_error: false,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            is_error: true,
        }
    }
}

/// Editor UI and viewport state
#[derive(Resource)]
pub struct EditorState {
    pub pending_action: Option<PendingAction>,
    pub notice: Option<Notice>,

    /// Name typed into the save field
    pub save_name: String,
    /// Value of the grid size slider, applied on demand
    pub grid_size_input: usize,

    pub show_gallery: bool,
    pub gallery_page: usize,

    /// Cell under the cursor, if any
    pub hovered_cell: Option<(usize, usize)>,
    pub zoom: f32,
    pub camera_offset: Vec2,
}

impl Default for EditorState {
    fn default() -> Self {
        Self {
            pending_action: None,
            notice: None,
            save_name: String::new(),
            grid_size_input: DEFAULT_GRID_SIZE,
            show_gallery: false,
            gallery_page: 0,
            hovered_cell: None,
            zoom: 1.0,
            camera_offset: Vec2::ZERO,
        }
    }
}

impl EditorState {
    pub fn notify(&mut self, notice: Notice) {
        if notice.is_error {
            warn!("{}", notice.message);
        }
        self.notice = Some(notice);
    }

    /// Point the grid size slider back at the store's actual size
    pub fn sync_grid_size(&mut self, store: &MapStore) {
        self.grid_size_input = store.grid_size();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_path_precedence() {
        let preferences = EditorPreferences {
            storage_path: Some(PathBuf::from("/prefs/blob.json")),
            ..default()
        };

        let plugin = EditorPlugin::new().with_storage_path("/cli/blob.json");
        assert_eq!(
            plugin.resolve_storage_path(&preferences),
            Some(PathBuf::from("/cli/blob.json"))
        );

        let plugin = EditorPlugin::new();
        assert_eq!(
            plugin.resolve_storage_path(&preferences),
            Some(PathBuf::from("/prefs/blob.json"))
        );
    }

    #[test]
    fn test_store_reads_configured_storage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        {
            let mut store = MapStore::with_storage(FileStorage::new(&path));
            store.set_grid_size(9).unwrap();
        }

        let plugin = EditorPlugin::new().with_storage_path(&path);
        let store = plugin.create_store(&EditorPreferences::default());
        assert_eq!(store.grid_size(), 9);
    }

    #[test]
    fn test_error_notices_replace_previous() {
        let mut state = EditorState::default();
        state.notify(Notice::info("Saved"));
        state.notify(Notice::error("Invalid map file"));
        assert_eq!(state.notice, Some(Notice::error("Invalid map file")));
    }
}
