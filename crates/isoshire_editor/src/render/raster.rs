//! CPU compositing of a map into a single image, used for PNG export
//!
//! Cells are drawn in row-major order, tile then character, which is
//! back-to-front for the isometric projection.

use image::{imageops, RgbaImage};
use isoshire_core::{IsoProjector, Location, MapSnapshot, TileCell};

/// Asset path of the sprite drawn for `tile` under `location`
pub fn tile_asset_path(tile: TileCell, location: Location) -> String {
    location
        .resolve(tile.realm)
        .tile_asset_path(tile.row, tile.col)
}

/// Every sprite needed to draw `snapshot`, without duplicates, in draw order
pub fn required_assets(snapshot: &MapSnapshot) -> Vec<String> {
    let mut paths: Vec<String> = Vec::new();
    for (_, _, tile, character) in snapshot.grid.cells() {
        let tile_path = tile_asset_path(tile, snapshot.location);
        if !paths.contains(&tile_path) {
            paths.push(tile_path);
        }
        if let Some(character) = character {
            let path = character.definition().asset_path();
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
    }
    paths
}

/// Canvas position of a tile sprite's top-left corner
pub fn tile_origin(projector: &IsoProjector, row: usize, col: usize) -> (f32, f32) {
    let (x, y) = projector.to_screen(row as f32, col as f32);
    (
        x - projector.metrics.sprite_width / 2.0,
        y - projector.metrics.sprite_anchor,
    )
}

/// Canvas position of a character sprite's top-left corner. Characters
/// stand on the cell: bottom-centre at the diamond's centroid.
pub fn character_origin(
    projector: &IsoProjector,
    row: usize,
    col: usize,
    width: f32,
    height: f32,
) -> (f32, f32) {
    let (x, y) = projector.cell_center(row, col);
    (x - width / 2.0, y - height)
}

/// Draw the whole map. Sprites that `lookup` cannot provide are left blank.
pub fn compose<'a>(
    snapshot: &MapSnapshot,
    projector: &IsoProjector,
    lookup: impl Fn(&str) -> Option<&'a RgbaImage>,
) -> RgbaImage {
    let (width, height) = projector.canvas_size();
    let mut canvas = RgbaImage::new(width, height);

    for (row, col, tile, character) in snapshot.grid.cells() {
        if let Some(sprite) = lookup(&tile_asset_path(tile, snapshot.location)) {
            let (x, y) = tile_origin(projector, row, col);
            imageops::overlay(&mut canvas, sprite, x.round() as i64, y.round() as i64);
        }

        let Some(character) = character else {
            continue;
        };
        if let Some(sprite) = lookup(&character.definition().asset_path()) {
            let (x, y) = character_origin(
                projector,
                row,
                col,
                sprite.width() as f32,
                sprite.height() as f32,
            );
            imageops::overlay(&mut canvas, sprite, x.round() as i64, y.round() as i64);
        }
    }

    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use isoshire_core::{CharacterId, Grid, Realm, SpriteMetrics};
    use std::collections::HashMap;

    fn solid(width: u32, height: u32, color: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba(color))
    }

    #[test]
    fn test_tile_paths_follow_location() {
        let tile = TileCell::with_realm(2, 3, Realm::Gondor);
        assert_eq!(
            tile_asset_path(tile, Location::Mixed),
            "tiles/gondor/r2-c3.png"
        );
        assert_eq!(
            tile_asset_path(tile, Location::Realm(Realm::Rohan)),
            "tiles/rohan/r2-c3.png"
        );
        assert_eq!(
            tile_asset_path(TileCell::new(0, 1), Location::Mixed),
            "tiles/shire/r0-c1.png"
        );
    }

    #[test]
    fn test_required_assets_are_deduplicated() {
        let mut grid = Grid::new(3);
        grid.set_tile(1, 1, TileCell::new(4, 4));
        grid.set_character(2, 2, CharacterId::parse("hobbit-5"));
        grid.set_character(0, 2, CharacterId::parse("hobbit-5"));
        let snapshot = MapSnapshot::new(grid, Location::Realm(Realm::Shire));

        assert_eq!(
            required_assets(&snapshot),
            vec![
                "tiles/shire/r0-c0.png".to_string(),
                "characters/hobbits/hobbit-5.png".to_string(),
                "tiles/shire/r4-c4.png".to_string(),
            ]
        );
    }

    #[test]
    fn test_sprite_placement() {
        let projector = IsoProjector::new(3, SpriteMetrics::default());
        // Top vertex of (0, 0) is at (256, 130)
        assert_eq!(tile_origin(&projector, 0, 0), (191.0, 0.0));
        assert_eq!(
            character_origin(&projector, 0, 0, 40.0, 80.0),
            (236.0, 82.0)
        );
    }

    #[test]
    fn test_compose_draws_tiles_and_characters() {
        let mut grid = Grid::new(3);
        grid.set_tile(0, 0, TileCell::new(1, 1));
        grid.set_character(0, 0, CharacterId::parse("hobbit-1"));
        let snapshot = MapSnapshot::new(grid, Location::Realm(Realm::Shire));
        let projector = IsoProjector::new(3, SpriteMetrics::default());

        // Only cell (0, 0) has a tile sprite available
        let mut sprites = HashMap::new();
        sprites.insert("tiles/shire/r1-c1.png".to_string(), solid(130, 230, [0, 255, 0, 255]));
        sprites.insert(
            "characters/hobbits/hobbit-1.png".to_string(),
            solid(10, 10, [255, 0, 0, 255]),
        );

        let canvas = compose(&snapshot, &projector, |path| sprites.get(path));
        assert_eq!(canvas.dimensions(), projector.canvas_size());

        // Character sits just above the centroid of (0, 0)
        let (cx, cy) = projector.cell_center(0, 0);
        assert_eq!(canvas.get_pixel(cx as u32, cy as u32 - 1), &Rgba([255, 0, 0, 255]));
        // Tile sprite covers the top vertex of (0, 0)
        let (tx, ty) = projector.to_screen(0.0, 0.0);
        assert_eq!(canvas.get_pixel(tx as u32, ty as u32), &Rgba([0, 255, 0, 255]));
        // Nothing drawn in the top-left corner
        assert_eq!(canvas.get_pixel(0, 0), &Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_missing_sprites_render_blank() {
        let snapshot = MapSnapshot::new(Grid::new(3), Location::Mixed);
        let projector = IsoProjector::new(3, SpriteMetrics::default());
        let canvas = compose(&snapshot, &projector, |_| None);
        assert!(canvas.pixels().all(|p| p.0 == [0, 0, 0, 0]));
    }
}
