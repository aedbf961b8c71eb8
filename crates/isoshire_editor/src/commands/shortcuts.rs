//! Keyboard shortcut handling

use bevy::prelude::*;
use bevy_egui::EguiContexts;

use crate::ui::PendingAction;
use crate::EditorState;

/// Ctrl+Z, or Cmd+Z on macOS, with nothing else held
pub fn undo_requested(keyboard: &ButtonInput<KeyCode>) -> bool {
    let ctrl = keyboard.pressed(KeyCode::ControlLeft) || keyboard.pressed(KeyCode::ControlRight);
    let cmd = keyboard.pressed(KeyCode::SuperLeft) || keyboard.pressed(KeyCode::SuperRight);
    let shift = keyboard.pressed(KeyCode::ShiftLeft) || keyboard.pressed(KeyCode::ShiftRight);

    (ctrl || cmd) && !shift && keyboard.just_pressed(KeyCode::KeyZ)
}

/// Handle keyboard shortcuts
pub fn handle_keyboard_shortcuts(
    mut contexts: EguiContexts,
    keyboard: Res<ButtonInput<KeyCode>>,
    mut editor_state: ResMut<EditorState>,
) {
    // Text fields keep their own undo
    if let Ok(ctx) = contexts.ctx_mut() {
        if ctx.wants_keyboard_input() {
            return;
        }
    }

    if undo_requested(&keyboard) {
        editor_state.pending_action = Some(PendingAction::Undo);
    }
}
