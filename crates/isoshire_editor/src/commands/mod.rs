//! Editor commands triggered from the keyboard

mod shortcuts;

pub use shortcuts::{handle_keyboard_shortcuts, undo_requested};
