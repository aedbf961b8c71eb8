//! Editor UI built with egui

mod dialogs;
mod gallery;
mod palette;
mod saves;
mod toolbar;

pub use dialogs::{export_map_file, import_map_file, process_file_actions, PendingAction};
pub use gallery::render_gallery;
pub use palette::render_palette;
pub use saves::render_saved_states;
pub use toolbar::render_toolbar;

use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};
use isoshire_core::{CollectionSource, MapStore};

use crate::library::{apply_collection, CollectionLibrary};
use crate::preferences::EditorPreferences;
use crate::render::MapTextures;
use crate::{EditorState, Notice};

/// Main UI plugin
pub struct EditorUiPlugin;

impl Plugin for EditorUiPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (process_edit_actions, process_file_actions).chain(),
        )
        .add_systems(EguiPrimaryContextPass, render_ui);
    }
}

/// Apply an action that only touches the store. Returns the action back when
/// it needs something else (a file dialog).
pub fn apply_edit_action(
    action: PendingAction,
    store: &mut MapStore,
    source: &dyn CollectionSource,
    editor_state: &mut EditorState,
) -> Option<PendingAction> {
    match action {
        PendingAction::Undo => {
            store.undo();
            editor_state.sync_grid_size(store);
        }
        PendingAction::ClearMap => match store.init_map(None) {
            Ok(true) => editor_state.notify(Notice::info("Map cleared")),
            Ok(false) => {}
            Err(e) => editor_state.notify(Notice::error(e.to_string())),
        },
        PendingAction::ApplyGridSize => match store.set_grid_size(editor_state.grid_size_input) {
            Ok(true) => {
                let size = store.grid_size();
                editor_state.notify(Notice::info(format!("Grid resized to {}×{}", size, size)));
            }
            Ok(false) => {}
            Err(e) => editor_state.notify(Notice::error(e.to_string())),
        },
        PendingAction::SaveState => match store.save_state(&editor_state.save_name) {
            Ok(_) => {
                editor_state.notify(Notice::info(format!(
                    "Saved \"{}\"",
                    editor_state.save_name.trim()
                )));
                editor_state.save_name.clear();
            }
            Err(e) => editor_state.notify(Notice::error(e.to_string())),
        },
        PendingAction::LoadState(id) => match store.load_state(id) {
            Ok(_) => {
                editor_state.sync_grid_size(store);
                let name = store.saved_state(id).map(|s| s.name.clone()).unwrap_or_default();
                editor_state.notify(Notice::info(format!("Loaded \"{}\"", name)));
            }
            Err(e) => editor_state.notify(Notice::error(e.to_string())),
        },
        PendingAction::DeleteState(id) => {
            if let Err(e) = store.delete_state(id) {
                editor_state.notify(Notice::error(e.to_string()));
            }
        }
        PendingAction::OpenCollection(id) => {
            if let Some(map) = apply_collection(source, &id, store) {
                editor_state.sync_grid_size(store);
                editor_state.show_gallery = false;
                editor_state.notify(Notice::info(format!("Opened \"{}\"", map.name)));
            }
        }
        other => return Some(other),
    }
    None
}

/// System to process edit-related pending actions
fn process_edit_actions(
    mut editor_state: ResMut<EditorState>,
    mut store: ResMut<MapStore>,
    library: Res<CollectionLibrary>,
) {
    let Some(action) = editor_state.pending_action.take() else {
        return;
    };
    // File operations are handled in dialogs.rs
    let rest = apply_edit_action(action, &mut store, &library.store, &mut editor_state);
    editor_state.pending_action = rest;
}

/// Main UI rendering system
fn render_ui(
    mut contexts: EguiContexts,
    mut editor_state: ResMut<EditorState>,
    mut store: ResMut<MapStore>,
    mut library: ResMut<CollectionLibrary>,
    mut preferences: ResMut<EditorPreferences>,
    textures: Res<MapTextures>,
) {
    let Ok(ctx) = contexts.ctx_mut() else { return };

    render_toolbar(ctx, &mut editor_state, &mut store, &mut preferences);

    egui::SidePanel::left("palette")
        .default_width(260.0)
        .resizable(true)
        .show(ctx, |ui| {
            render_palette(ui, &mut store, &textures);
        });

    egui::SidePanel::right("saved_states")
        .default_width(220.0)
        .resizable(true)
        .show(ctx, |ui| {
            render_saved_states(ui, &mut editor_state, &store);
        });

    render_gallery(ctx, &mut editor_state, &mut library, &preferences);

    render_viewport_overlay(ctx, &editor_state, &store);
}

/// Zoom and hovered cell in the bottom-left corner of the viewport
fn render_viewport_overlay(ctx: &egui::Context, editor_state: &EditorState, store: &MapStore) {
    egui::Area::new(egui::Id::new("viewport_overlay"))
        .anchor(egui::Align2::LEFT_BOTTOM, egui::vec2(270.0, -8.0))
        .interactable(false)
        .show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(format!("{}×{}", store.grid_size(), store.grid_size()));
                ui.separator();
                if let Some((row, col)) = editor_state.hovered_cell {
                    ui.label(format!("Cell: {}, {}", row, col));
                    ui.separator();
                }
                ui.label(format!("Zoom: {}%", (editor_state.zoom * 100.0) as i32));
            });
        });
}
