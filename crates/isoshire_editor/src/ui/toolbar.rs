//! Toolbar: location, grid size, history and file actions

use bevy_egui::egui;
use isoshire_core::{Location, MapStore, MAX_GRID_SIZE, MIN_GRID_SIZE};

use super::PendingAction;
use crate::preferences::EditorPreferences;
use crate::EditorState;

/// Render the toolbar
pub fn render_toolbar(
    ctx: &egui::Context,
    editor_state: &mut EditorState,
    store: &mut MapStore,
    preferences: &mut EditorPreferences,
) {
    egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
        ui.horizontal(|ui| {
            ui.label("Location:");
            let current = store.location();
            let mut selected = current;
            egui::ComboBox::from_id_salt("location")
                .selected_text(current.display_name())
                .show_ui(ui, |ui| {
                    for location in Location::all() {
                        ui.selectable_value(&mut selected, location, location.display_name());
                    }
                });
            if selected != current {
                store.set_location(selected);
            }

            ui.separator();

            ui.label("Grid:");
            ui.add(egui::Slider::new(
                &mut editor_state.grid_size_input,
                MIN_GRID_SIZE..=MAX_GRID_SIZE,
            ));
            if ui
                .button("Apply")
                .on_hover_text("Resize the grid. The map is cleared.")
                .clicked()
            {
                editor_state.pending_action = Some(PendingAction::ApplyGridSize);
            }
            if ui.button("Clear").clicked() {
                editor_state.pending_action = Some(PendingAction::ClearMap);
            }

            ui.separator();

            if ui
                .add_enabled(store.can_undo(), egui::Button::new("Undo"))
                .on_hover_text("Undo (Ctrl+Z)")
                .clicked()
            {
                editor_state.pending_action = Some(PendingAction::Undo);
            }

            ui.separator();

            if ui.button("Import JSON").clicked() {
                editor_state.pending_action = Some(PendingAction::ImportJson);
            }
            if ui.button("Export JSON").clicked() {
                editor_state.pending_action = Some(PendingAction::ExportJson);
            }
            if ui.button("Export PNG").clicked() {
                editor_state.pending_action = Some(PendingAction::ExportPng);
            }

            ui.separator();

            ui.toggle_value(&mut editor_state.show_gallery, "Gallery");
            if ui
                .checkbox(&mut preferences.show_hover_highlight, "Highlight")
                .on_hover_text("Outline the cell under the cursor")
                .changed()
            {
                if let Err(e) = preferences.save() {
                    bevy::log::error!("Failed to save preferences: {}", e);
                }
            }
        });

        if let Some(notice) = &editor_state.notice {
            let color = if notice.is_error {
                egui::Color32::from_rgb(230, 90, 80)
            } else {
                egui::Color32::from_rgb(120, 200, 120)
            };
            ui.colored_label(color, &notice.message);
        }
    });
}
