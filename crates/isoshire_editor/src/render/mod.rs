//! Map rendering for the editor viewport
//!
//! Each cell becomes one sprite entity for its tile and, when occupied, one
//! for its character. Entities are rebuilt whenever the store's revision
//! changes or a texture for the current location finishes loading.

pub mod raster;
pub mod textures;

use bevy::asset::LoadState;
use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiTextureHandle};
use isoshire_core::{IsoProjector, Location, MapStore, ATLAS_COLUMNS, ATLAS_ROWS, CHARACTERS};
use std::collections::HashMap;

use crate::preferences::EditorPreferences;
use crate::tools::{canvas_to_world, projector_for};
use crate::EditorState;
use textures::TextureCache;

/// Plugin for map rendering
pub struct MapRenderPlugin;

impl Plugin for MapRenderPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<RenderState>()
            .init_resource::<MapTextures>()
            .add_systems(
                Update,
                (request_textures, poll_textures, sync_map_rendering).chain(),
            )
            .add_systems(Update, draw_hover_highlight)
            .add_systems(Update, update_camera_from_editor_state);
    }
}

/// Tracks what the viewport currently shows
#[derive(Resource)]
pub struct RenderState {
    /// Store revision the sprite entities were built from
    pub rendered_revision: Option<u64>,
    /// Location the current texture batch was requested for
    pub requested_location: Option<Location>,
    /// Store revision textures were last requested for
    pub requested_revision: Option<u64>,
    /// Whether we need to rebuild the map
    pub needs_rebuild: bool,
    /// Tile and character sprite entities
    pub entities: Vec<Entity>,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            rendered_revision: None,
            requested_location: None,
            requested_revision: None,
            needs_rebuild: true,
            entities: Vec::new(),
        }
    }
}

/// Sprite textures keyed by asset path, plus their egui registrations
#[derive(Resource, Default)]
pub struct MapTextures {
    pub cache: TextureCache<Handle<Image>>,
    pub egui_ids: HashMap<String, egui::TextureId>,
}

impl MapTextures {
    pub fn egui_id(&self, path: &str) -> Option<egui::TextureId> {
        self.egui_ids.get(path).copied()
    }
}

/// Marker for map sprite entities
#[derive(Component)]
pub struct MapSprite;

/// Sprites the tile and character pickers show under `location`
pub fn palette_assets(location: Location) -> Vec<String> {
    let mut paths = Vec::new();
    for realm in location.visible_realms() {
        for row in 0..ATLAS_ROWS {
            for col in 0..ATLAS_COLUMNS {
                paths.push(realm.tile_asset_path(row, col));
            }
        }
    }
    paths.extend(CHARACTERS.iter().map(|c| c.asset_path()));
    paths
}

fn request_textures(
    store: Res<MapStore>,
    asset_server: Res<AssetServer>,
    mut textures: ResMut<MapTextures>,
    mut render_state: ResMut<RenderState>,
) {
    let location = store.location();
    let revision = store.revision();
    let location_changed = render_state.requested_location != Some(location);
    if !location_changed && render_state.requested_revision == Some(revision) {
        return;
    }

    let snapshot = store.snapshot();
    let mut paths = raster::required_assets(&snapshot);
    if location_changed {
        let generation = textures.cache.begin_batch();
        debug!("Texture batch {} for location '{}'", generation, location);
        paths.extend(palette_assets(location));
    }

    let mut started = 0;
    for path in &paths {
        if textures
            .cache
            .request(path, |p| asset_server.load::<Image>(p.to_string()))
        {
            started += 1;
        }
    }
    if started > 0 {
        debug!("Requested {} new textures", started);
    }

    render_state.requested_location = Some(location);
    render_state.requested_revision = Some(revision);
}

fn poll_textures(
    mut contexts: EguiContexts,
    asset_server: Res<AssetServer>,
    mut textures: ResMut<MapTextures>,
    mut render_state: ResMut<RenderState>,
) {
    for (path, handle) in textures.cache.pending() {
        match asset_server.load_state(&handle) {
            LoadState::Loaded => {
                let texture_id = contexts.add_image(EguiTextureHandle::Strong(handle.clone()));
                textures.egui_ids.insert(path.clone(), texture_id);
                if textures.cache.finish(&path, true) {
                    render_state.needs_rebuild = true;
                }
            }
            LoadState::Failed(e) => {
                warn!("Failed to load sprite '{}': {}", path, e);
                textures.cache.finish(&path, false);
            }
            LoadState::Loading | LoadState::NotLoaded => {}
        }
    }
}

/// Canvas rectangle → world-space centre
fn sprite_center(origin: (f32, f32), size: Vec2, canvas: (u32, u32)) -> Vec2 {
    canvas_to_world(origin.0 + size.x / 2.0, origin.1 + size.y / 2.0, canvas)
}

fn sync_map_rendering(
    mut commands: Commands,
    store: Res<MapStore>,
    textures: Res<MapTextures>,
    images: Res<Assets<Image>>,
    mut render_state: ResMut<RenderState>,
) {
    let revision = store.revision();
    if !render_state.needs_rebuild && render_state.rendered_revision == Some(revision) {
        return;
    }

    for entity in render_state.entities.drain(..) {
        if let Ok(mut e) = commands.get_entity(entity) {
            e.despawn();
        }
    }
    render_state.needs_rebuild = false;
    render_state.rendered_revision = Some(revision);

    let projector = projector_for(&store);
    let canvas = projector.canvas_size();
    let metrics = projector.metrics;
    let location = store.location();
    let tile_size = Vec2::new(metrics.sprite_width, metrics.sprite_height);

    for (index, (row, col, tile, character)) in store.grid().cells().enumerate() {
        // Row-major order is back-to-front
        let depth = index as f32 * 2.0 * 0.001;

        let tile_path = raster::tile_asset_path(tile, location);
        if let Some(handle) = textures.cache.ready(&tile_path) {
            let center = sprite_center(raster::tile_origin(&projector, row, col), tile_size, canvas);
            let entity = commands
                .spawn((
                    Sprite {
                        image: handle.clone(),
                        custom_size: Some(tile_size),
                        ..default()
                    },
                    Transform::from_xyz(center.x, center.y, depth),
                    MapSprite,
                ))
                .id();
            render_state.entities.push(entity);
        }

        let Some(character) = character else {
            continue;
        };
        let character_path = character.definition().asset_path();
        let Some(handle) = textures.cache.ready(&character_path) else {
            continue;
        };
        let Some(size) = images.get(handle).map(|image| image.size_f32()) else {
            continue;
        };
        let origin = raster::character_origin(&projector, row, col, size.x, size.y);
        let center = sprite_center(origin, size, canvas);
        let entity = commands
            .spawn((
                Sprite::from_image(handle.clone()),
                Transform::from_xyz(center.x, center.y, depth + 0.001),
                MapSprite,
            ))
            .id();
        render_state.entities.push(entity);
    }
}

/// World-space outline of the diamond at (row, col), closed
pub fn diamond_outline(projector: &IsoProjector, row: usize, col: usize) -> [Vec2; 5] {
    let canvas = projector.canvas_size();
    let [top, right, bottom, left] = projector
        .diamond(row, col)
        .map(|(x, y)| canvas_to_world(x, y, canvas));
    [top, right, bottom, left, top]
}

fn draw_hover_highlight(
    mut gizmos: Gizmos,
    store: Res<MapStore>,
    editor_state: Res<EditorState>,
    preferences: Res<EditorPreferences>,
) {
    if !preferences.show_hover_highlight {
        return;
    }
    let Some((row, col)) = editor_state.hovered_cell else {
        return;
    };
    let projector = projector_for(&store);
    if row >= projector.grid_size || col >= projector.grid_size {
        return;
    }
    gizmos.linestrip_2d(
        diamond_outline(&projector, row, col),
        Color::srgba(1.0, 1.0, 1.0, 0.8),
    );
}

fn update_camera_from_editor_state(
    editor_state: Res<EditorState>,
    mut camera_query: Query<&mut Transform, With<Camera2d>>,
    mut projection_query: Query<&mut Projection, With<Camera2d>>,
) {
    for mut transform in camera_query.iter_mut() {
        transform.translation.x = editor_state.camera_offset.x;
        transform.translation.y = editor_state.camera_offset.y;
    }

    for mut projection in projection_query.iter_mut() {
        if let Projection::Orthographic(ref mut ortho) = *projection {
            ortho.scale = 1.0 / editor_state.zoom;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isoshire_core::{Realm, SpriteMetrics};

    #[test]
    fn test_palette_assets_follow_location() {
        let shire = palette_assets(Location::Realm(Realm::Shire));
        let tiles = (ATLAS_ROWS as usize) * (ATLAS_COLUMNS as usize);
        assert_eq!(shire.len(), tiles + CHARACTERS.len());
        assert!(shire.contains(&"tiles/shire/r5-c11.png".to_string()));
        assert!(!shire.iter().any(|p| p.starts_with("tiles/mordor/")));

        let mixed = palette_assets(Location::Mixed);
        assert_eq!(mixed.len(), tiles * Realm::all().len() + CHARACTERS.len());
    }

    #[test]
    fn test_diamond_outline_is_closed() {
        let projector = IsoProjector::new(3, SpriteMetrics::default());
        let outline = diamond_outline(&projector, 1, 1);
        assert_eq!(outline[0], outline[4]);
        // Top vertex is above the bottom one in world space
        assert!(outline[0].y > outline[2].y);
        assert_eq!(outline[0].x, outline[2].x);
    }

    #[test]
    fn test_sprite_center_flips_y() {
        let canvas = (200, 100);
        let center = sprite_center((0.0, 0.0), Vec2::new(20.0, 10.0), canvas);
        assert_eq!(center, Vec2::new(-90.0, 45.0));
    }
}
