//! Saved states panel

use bevy_egui::egui;
use chrono::{DateTime, Local, Utc};
use isoshire_core::MapStore;

use super::PendingAction;
use crate::EditorState;

/// Local time label for a saved state's creation time
pub fn saved_at_label(created_at_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(created_at_ms)
        .map(|at| at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

pub fn render_saved_states(ui: &mut egui::Ui, editor_state: &mut EditorState, store: &MapStore) {
    ui.heading("Saved States");

    ui.horizontal(|ui| {
        let response = ui.add(
            egui::TextEdit::singleline(&mut editor_state.save_name)
                .hint_text("Name")
                .desired_width(120.0),
        );
        let submitted = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
        let can_save = !editor_state.save_name.trim().is_empty();
        if (ui.add_enabled(can_save, egui::Button::new("Save")).clicked() || submitted) && can_save
        {
            editor_state.pending_action = Some(PendingAction::SaveState);
        }
    });

    ui.separator();

    if store.saved_states().is_empty() {
        ui.weak("No saved states yet");
        return;
    }

    egui::ScrollArea::vertical().show(ui, |ui| {
        // Newest first
        for saved in store.saved_states().iter().rev() {
            ui.group(|ui| {
                ui.label(egui::RichText::new(&saved.name).strong());
                ui.small(format!(
                    "{} · {}×{} · {}",
                    saved.snapshot.location.display_name(),
                    saved.snapshot.grid_size(),
                    saved.snapshot.grid_size(),
                    saved_at_label(saved.created_at)
                ));
                ui.horizontal(|ui| {
                    if ui.small_button("Load").clicked() {
                        editor_state.pending_action = Some(PendingAction::LoadState(saved.id));
                    }
                    if ui.small_button("Export").clicked() {
                        editor_state.pending_action = Some(PendingAction::ExportState(saved.id));
                    }
                    if ui.small_button("Delete").clicked() {
                        editor_state.pending_action = Some(PendingAction::DeleteState(saved.id));
                    }
                });
            });
        }
    });
}
