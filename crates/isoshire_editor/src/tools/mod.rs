//! Viewport input: painting, clearing, pan and zoom
//!
//! The primary button paints the live tool, the secondary button clears the
//! cell (character first, then tile). Holding a button and dragging keeps
//! applying the stroke to each new cell under the cursor.

use bevy::input::mouse::MouseWheel;
use bevy::prelude::*;
use bevy_egui::EguiContexts;
use isoshire_core::{IsoProjector, LiveTool, MapStore, SpriteMetrics, StoreError};

use crate::EditorState;

/// Plugin for viewport input
pub struct EditorToolsPlugin;

impl Plugin for EditorToolsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ViewportInputState>()
            .add_systems(Update, (handle_viewport_input, handle_zoom_input));
    }
}

/// What a held mouse button does to each cell it passes over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrokeKind {
    Paint,
    Clear,
}

/// State for viewport input handling
#[derive(Resource, Debug, Default)]
pub struct ViewportInputState {
    /// Stroke in progress, if a button is held
    pub stroke: Option<StrokeKind>,
    /// Last cell the current stroke was applied to
    pub last_cell: Option<(usize, usize)>,
    pub is_panning: bool,
    pub pan_start_pos: Option<Vec2>,
}

impl ViewportInputState {
    pub fn begin(&mut self, kind: StrokeKind) {
        self.stroke = Some(kind);
        self.last_cell = None;
    }

    pub fn end(&mut self) {
        self.stroke = None;
        self.last_cell = None;
    }

    /// Move the pointer to `cell`. Returns the edit to apply when a stroke
    /// is active and the pointer entered a cell not yet visited.
    pub fn advance(&mut self, cell: Option<(usize, usize)>) -> Option<(StrokeKind, usize, usize)> {
        let kind = self.stroke?;
        let (row, col) = cell?;
        if self.last_cell == Some((row, col)) {
            return None;
        }
        self.last_cell = Some((row, col));
        Some((kind, row, col))
    }
}

/// Apply one stroke step to the store
pub fn apply_stroke(
    store: &mut MapStore,
    kind: StrokeKind,
    row: usize,
    col: usize,
) -> Result<bool, StoreError> {
    match kind {
        StrokeKind::Paint => match store.live_tool() {
            LiveTool::Tile(tile) => store.set_tile(row, col, tile),
            LiveTool::Character(character) => store.set_character(row, col, character),
        },
        StrokeKind::Clear => store.clear_at(row, col),
    }
}

/// World position → canvas pixel. The canvas is centred on the world origin
/// with y pointing down.
pub fn world_to_canvas(world: Vec2, canvas: (u32, u32)) -> (f32, f32) {
    (
        world.x + canvas.0 as f32 / 2.0,
        canvas.1 as f32 / 2.0 - world.y,
    )
}

/// Canvas pixel → world position
pub fn canvas_to_world(x: f32, y: f32, canvas: (u32, u32)) -> Vec2 {
    Vec2::new(x - canvas.0 as f32 / 2.0, canvas.1 as f32 / 2.0 - y)
}

/// Projector for the grid currently held by the store
pub fn projector_for(store: &MapStore) -> IsoProjector {
    IsoProjector::new(store.grid_size(), SpriteMetrics::default())
}

/// System to handle viewport input (painting, clearing, panning)
fn handle_viewport_input(
    mut contexts: EguiContexts,
    mut editor_state: ResMut<EditorState>,
    mut store: ResMut<MapStore>,
    mut input_state: ResMut<ViewportInputState>,
    windows: Query<&Window>,
    camera_q: Query<(&Camera, &GlobalTransform), With<Camera2d>>,
    mouse_buttons: Res<ButtonInput<MouseButton>>,
) {
    let Ok(ctx) = contexts.ctx_mut() else { return };

    let Some(window) = windows.iter().next() else {
        return;
    };
    let Some((camera, camera_transform)) = camera_q.iter().next() else {
        return;
    };

    let Some(cursor_position) = window.cursor_position() else {
        input_state.end();
        input_state.is_panning = false;
        editor_state.hovered_cell = None;
        return;
    };

    let Ok(world_pos) = camera.viewport_to_world_2d(camera_transform, cursor_position) else {
        return;
    };

    // Panels, windows and widgets own the pointer while it is over them
    if ctx.is_using_pointer() || ctx.is_pointer_over_area() {
        input_state.end();
        input_state.is_panning = false;
        editor_state.hovered_cell = None;
        return;
    }

    // Pan with the middle mouse button
    if mouse_buttons.pressed(MouseButton::Middle) {
        if !input_state.is_panning {
            input_state.is_panning = true;
            input_state.pan_start_pos = Some(cursor_position);
        } else if let Some(start_pos) = input_state.pan_start_pos {
            let delta = cursor_position - start_pos;
            editor_state.camera_offset.x -= delta.x / editor_state.zoom;
            editor_state.camera_offset.y += delta.y / editor_state.zoom;
            input_state.pan_start_pos = Some(cursor_position);
        }
    } else {
        input_state.is_panning = false;
        input_state.pan_start_pos = None;
    }

    let projector = projector_for(&store);
    let (x, y) = world_to_canvas(world_pos, projector.canvas_size());
    let cell = projector.pick(x, y);
    if editor_state.hovered_cell != cell {
        editor_state.hovered_cell = cell;
    }

    if mouse_buttons.just_pressed(MouseButton::Left) {
        input_state.begin(StrokeKind::Paint);
    } else if mouse_buttons.just_pressed(MouseButton::Right) {
        input_state.begin(StrokeKind::Clear);
    }
    if !mouse_buttons.pressed(MouseButton::Left) && !mouse_buttons.pressed(MouseButton::Right) {
        input_state.end();
        return;
    }

    if let Some((kind, row, col)) = input_state.advance(cell) {
        if let Err(e) = apply_stroke(&mut store, kind, row, col) {
            warn!("Could not edit cell ({}, {}): {}", row, col, e);
        }
    }
}

#[allow(deprecated)] // EventReader is deprecated but still works in Bevy 0.17
fn handle_zoom_input(
    mut contexts: EguiContexts,
    mut editor_state: ResMut<EditorState>,
    mut scroll_events: bevy::ecs::event::EventReader<MouseWheel>,
) {
    let Ok(ctx) = contexts.ctx_mut() else { return };
    let over_ui = ctx.is_using_pointer() || ctx.is_pointer_over_area();

    for event in scroll_events.read() {
        if over_ui {
            continue;
        }
        let zoom_delta = event.y * 0.1;
        editor_state.zoom = (editor_state.zoom * (1.0 + zoom_delta)).clamp(0.25, 4.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isoshire_core::{CharacterId, TileCell};

    #[test]
    fn test_stroke_applies_once_per_cell() {
        let mut input = ViewportInputState::default();
        assert_eq!(input.advance(Some((1, 1))), None);

        input.begin(StrokeKind::Paint);
        assert_eq!(input.advance(Some((1, 1))), Some((StrokeKind::Paint, 1, 1)));
        assert_eq!(input.advance(Some((1, 1))), None);
        assert_eq!(input.advance(None), None);
        assert_eq!(input.advance(Some((1, 2))), Some((StrokeKind::Paint, 1, 2)));

        input.end();
        assert_eq!(input.advance(Some((2, 2))), None);
    }

    #[test]
    fn test_paint_uses_live_tool() {
        let mut store = MapStore::new();
        store.set_active_tool(TileCell::new(2, 6)).unwrap();
        assert_eq!(apply_stroke(&mut store, StrokeKind::Paint, 0, 0), Ok(true));
        assert_eq!(store.grid().tile(0, 0), Some(TileCell::new(2, 6)));

        let hobbit = CharacterId::parse("hobbit-3").unwrap();
        store.set_active_character_tool(Some(hobbit));
        assert_eq!(apply_stroke(&mut store, StrokeKind::Paint, 0, 0), Ok(true));
        assert_eq!(store.grid().character(0, 0), Some(Some(hobbit)));
        assert_eq!(store.grid().tile(0, 0), Some(TileCell::new(2, 6)));
    }

    #[test]
    fn test_clear_stroke_removes_character_then_tile() {
        let mut store = MapStore::new();
        store.set_tile(3, 3, TileCell::new(1, 1)).unwrap();
        store
            .set_character(3, 3, CharacterId::parse("hobbit-1").unwrap())
            .unwrap();

        apply_stroke(&mut store, StrokeKind::Clear, 3, 3).unwrap();
        assert_eq!(store.grid().character(3, 3), Some(None));
        apply_stroke(&mut store, StrokeKind::Clear, 3, 3).unwrap();
        assert_eq!(store.grid().tile(3, 3), Some(TileCell::default()));
    }

    #[test]
    fn test_world_canvas_mapping() {
        let projector = IsoProjector::new(7, SpriteMetrics::default());
        let canvas = projector.canvas_size();
        for (row, col) in [(0, 0), (3, 5), (6, 6)] {
            let (x, y) = projector.cell_center(row, col);
            let world = canvas_to_world(x, y, canvas);
            let (cx, cy) = world_to_canvas(world, canvas);
            assert_eq!(projector.pick(cx, cy), Some((row, col)));
        }
        assert_eq!(canvas_to_world(0.0, 0.0, canvas), Vec2::new(-512.0, 339.0));
    }
}
