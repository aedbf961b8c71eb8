//! File import/export actions and the dialogs that pick their paths

use bevy::prelude::*;
use image::RgbaImage;
use isoshire_core::{snapshot, IsoProjector, MapSnapshot, MapStore, SpriteMetrics};
use std::collections::HashMap;
use std::path::Path;
use uuid::Uuid;

use crate::preferences::EditorPreferences;
use crate::render::{raster, MapTextures};
use crate::{EditorState, Notice};

/// Name used for exports when the save field is empty
const DEFAULT_EXPORT_NAME: &str = "Isoshire Map";

/// Pending action to be processed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    Undo,
    ClearMap,
    ApplyGridSize,
    SaveState,
    LoadState(Uuid),
    DeleteState(Uuid),
    /// Export a saved state as a JSON document
    ExportState(Uuid),
    ImportJson,
    ExportJson,
    ExportPng,
    /// Load a community collection map into the editor
    OpenCollection(String),
}

/// Read a JSON map document from `path` and load it into the store.
/// Invalid documents leave the store unchanged.
pub fn import_map_file(path: &Path, store: &mut MapStore, editor_state: &mut EditorState) {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            editor_state.notify(Notice::error(format!(
                "Could not read {}: {}",
                path.display(),
                e
            )));
            return;
        }
    };
    let notice = match snapshot::import_json(&text) {
        Ok(imported) => {
            let size = imported.grid_size();
            if store.load_snapshot(imported) {
                editor_state.sync_grid_size(store);
                Notice::info(format!("Imported {}×{} map", size, size))
            } else {
                Notice::info("Imported map matches the current one")
            }
        }
        Err(e) => Notice::error(format!("Invalid map file: {}", e)),
    };
    editor_state.notify(notice);
}

/// Write `snapshot` as a collection-shaped JSON document
pub fn export_map_file(path: &Path, snapshot: &MapSnapshot, name: &str) -> Result<(), String> {
    let document = snapshot::export_document(snapshot, name);
    let json = document.to_json_pretty().map_err(|e| e.to_string())?;
    std::fs::write(path, json).map_err(|e| e.to_string())
}

/// Name to export under: the typed name, or a default
pub fn export_name(typed: &str) -> &str {
    let trimmed = typed.trim();
    if trimmed.is_empty() {
        DEFAULT_EXPORT_NAME
    } else {
        trimmed
    }
}

/// Composite the map from whichever sprites have loaded and write a PNG
pub fn export_png_file(
    path: &Path,
    snapshot: &MapSnapshot,
    sprites: &HashMap<String, RgbaImage>,
) -> Result<(), String> {
    let projector = IsoProjector::new(snapshot.grid_size(), SpriteMetrics::default());
    let canvas = raster::compose(snapshot, &projector, |p| sprites.get(p));
    canvas.save(path).map_err(|e| e.to_string())
}

/// CPU copies of the sprites `snapshot` needs that are loaded
fn collect_sprites(
    snapshot: &MapSnapshot,
    textures: &MapTextures,
    images: &Assets<Image>,
) -> HashMap<String, RgbaImage> {
    let mut sprites = HashMap::new();
    for path in raster::required_assets(snapshot) {
        let Some(handle) = textures.cache.ready(&path) else {
            continue;
        };
        let Some(image) = images.get(handle) else {
            continue;
        };
        match image.clone().try_into_dynamic() {
            Ok(dynamic) => {
                sprites.insert(path, dynamic.to_rgba8());
            }
            Err(e) => warn!("Cannot export sprite '{}': {}", path, e),
        }
    }
    sprites
}

/// System to process file-related pending actions
pub fn process_file_actions(
    mut editor_state: ResMut<EditorState>,
    mut store: ResMut<MapStore>,
    mut preferences: ResMut<EditorPreferences>,
    textures: Res<MapTextures>,
    images: Res<Assets<Image>>,
) {
    let Some(action) = editor_state.pending_action.take() else {
        return;
    };

    match action {
        PendingAction::ImportJson => {
            #[cfg(feature = "native")]
            {
                if let Some(path) = rfd::FileDialog::new()
                    .add_filter("Isoshire Map", &["json"])
                    .pick_file()
                {
                    import_map_file(&path, &mut store, &mut editor_state);
                }
            }
            #[cfg(not(feature = "native"))]
            editor_state.notify(Notice::error("File dialogs are not available in this build"));
        }
        PendingAction::ExportJson | PendingAction::ExportState(_) => {
            let (snapshot, name) = match action {
                PendingAction::ExportState(id) => match store.saved_state(id) {
                    Some(saved) => (saved.snapshot.clone(), saved.name.clone()),
                    None => {
                        editor_state.notify(Notice::error("That saved state no longer exists"));
                        return;
                    }
                },
                _ => (
                    store.snapshot(),
                    export_name(&editor_state.save_name).to_string(),
                ),
            };
            let file_name = format!("{}.json", isoshire_core::collection::slugify(&name));

            #[cfg(feature = "native")]
            {
                let mut dialog = rfd::FileDialog::new()
                    .add_filter("Isoshire Map", &["json"])
                    .set_file_name(&file_name);
                if let Some(dir) = &preferences.last_export_dir {
                    dialog = dialog.set_directory(dir);
                }
                if let Some(path) = dialog.save_file() {
                    match export_map_file(&path, &snapshot, &name) {
                        Ok(()) => {
                            info!("Exported map to {:?}", path);
                            remember_export_dir(&mut preferences, &path);
                            editor_state.notify(Notice::info(format!("Exported {}", file_name)));
                        }
                        Err(e) => editor_state.notify(Notice::error(format!("Export failed: {}", e))),
                    }
                }
            }
            #[cfg(not(feature = "native"))]
            {
                let _ = (&snapshot, &mut preferences);
                editor_state.notify(Notice::error(format!(
                    "File dialogs are not available in this build, cannot save {}",
                    file_name
                )));
            }
        }
        PendingAction::ExportPng => {
            let snapshot = store.snapshot();
            let file_name = format!(
                "{}.png",
                isoshire_core::collection::slugify(export_name(&editor_state.save_name))
            );

            #[cfg(feature = "native")]
            {
                let mut dialog = rfd::FileDialog::new()
                    .add_filter("PNG Image", &["png"])
                    .set_file_name(&file_name);
                if let Some(dir) = &preferences.last_export_dir {
                    dialog = dialog.set_directory(dir);
                }
                if let Some(path) = dialog.save_file() {
                    let sprites = collect_sprites(&snapshot, &textures, &images);
                    match export_png_file(&path, &snapshot, &sprites) {
                        Ok(()) => {
                            info!("Exported PNG to {:?}", path);
                            remember_export_dir(&mut preferences, &path);
                            editor_state.notify(Notice::info(format!("Exported {}", file_name)));
                        }
                        Err(e) => {
                            editor_state.notify(Notice::error(format!("PNG export failed: {}", e)))
                        }
                    }
                }
            }
            #[cfg(not(feature = "native"))]
            {
                let _ = (collect_sprites(&snapshot, &textures, &images), &mut preferences);
                editor_state.notify(Notice::error(format!(
                    "File dialogs are not available in this build, cannot save {}",
                    file_name
                )));
            }
        }
        _ => {
            // Put other actions back
            editor_state.pending_action = Some(action);
        }
    }
}

fn remember_export_dir(preferences: &mut EditorPreferences, path: &Path) {
    if preferences.remember_export(path) {
        if let Err(e) = preferences.save() {
            error!("Failed to save preferences: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isoshire_core::{Location, Realm, TileCell};

    #[test]
    fn test_import_rejects_invalid_documents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"gridSize": 25, "location": "shire", "map": []}"#).unwrap();

        let mut store = MapStore::new();
        let mut state = EditorState::default();
        let before = store.snapshot();
        import_map_file(&path, &mut store, &mut state);
        let notice = state.notice.take().unwrap();
        assert!(notice.is_error);
        assert!(notice.message.starts_with("Invalid map file"));
        assert_eq!(store.snapshot(), before);

        import_map_file(&dir.path().join("missing.json"), &mut store, &mut state);
        assert!(state.notice.is_some_and(|n| n.is_error));
    }

    #[test]
    fn test_export_then_import() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fangorn.json");

        let mut store = MapStore::new();
        store.set_location(Location::Mixed);
        store.set_grid_size(5).unwrap();
        store
            .set_tile(2, 3, TileCell::with_realm(1, 2, Realm::Lothlorien))
            .unwrap();
        export_map_file(&path, &store.snapshot(), "Fangorn").unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["id"], "fangorn");
        assert_eq!(written["location"], "mixed");

        let mut other = MapStore::new();
        let mut state = EditorState::default();
        import_map_file(&path, &mut other, &mut state);
        let notice = state.notice.take().unwrap();
        assert!(!notice.is_error, "{}", notice.message);
        assert_eq!(other.snapshot(), store.snapshot());
        assert!(other.can_undo());
        assert_eq!(state.grid_size_input, 5);
    }

    #[test]
    fn test_export_name_falls_back() {
        assert_eq!(export_name("  "), "Isoshire Map");
        assert_eq!(export_name(" Bree "), "Bree");
    }

    #[test]
    fn test_png_export_writes_canvas_sized_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.png");
        let store = MapStore::new();

        export_png_file(&path, &store.snapshot(), &HashMap::new()).unwrap();
        let written = image::open(&path).unwrap();
        let projector = IsoProjector::new(store.grid_size(), SpriteMetrics::default());
        let (width, height) = projector.canvas_size();
        assert_eq!((written.width(), written.height()), (width, height));
    }
}
