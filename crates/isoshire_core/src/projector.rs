//! Grid ↔ isometric screen-space conversion
//!
//! Screen space has its origin at the top-left of the canvas with y growing
//! downwards. A cell's anchor is the top vertex of its diamond.

/// Pixel dimensions of the diamond footprint and of the sprites drawn on it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteMetrics {
    /// Full diamond width
    pub tile_width: f32,
    /// Full diamond height
    pub tile_height: f32,
    /// Width of one sliced tile sprite
    pub sprite_width: f32,
    /// Height of one sliced tile sprite
    pub sprite_height: f32,
    /// How far the sprite extends above the diamond's top vertex
    pub sprite_anchor: f32,
}

impl Default for SpriteMetrics {
    fn default() -> Self {
        Self {
            tile_width: 128.0,
            tile_height: 64.0,
            sprite_width: 130.0,
            sprite_height: 230.0,
            sprite_anchor: 130.0,
        }
    }
}

/// Pure isometric projection for a grid of a given size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IsoProjector {
    pub metrics: SpriteMetrics,
    pub grid_size: usize,
    pub origin_x: f32,
    pub origin_y: f32,
}

impl IsoProjector {
    /// Place the origin so the whole grid, including the tallest sprite on
    /// the top row, fits inside `canvas_size()`
    pub fn new(grid_size: usize, metrics: SpriteMetrics) -> Self {
        Self {
            metrics,
            grid_size,
            origin_x: (grid_size as f32 + 1.0) * metrics.tile_width / 2.0,
            origin_y: metrics.sprite_anchor,
        }
    }

    /// Canvas dimensions (width, height) in pixels
    pub fn canvas_size(&self) -> (u32, u32) {
        let n = self.grid_size as f32;
        let width = (n + 1.0) * self.metrics.tile_width;
        let height = n * self.metrics.tile_height + self.metrics.sprite_height;
        (width.ceil() as u32, height.ceil() as u32)
    }

    /// Top vertex of the diamond at (row, col)
    pub fn to_screen(&self, row: f32, col: f32) -> (f32, f32) {
        let half_w = self.metrics.tile_width / 2.0;
        let half_h = self.metrics.tile_height / 2.0;
        (
            self.origin_x + (col - row) * half_w,
            self.origin_y + (row + col) * half_h,
        )
    }

    /// Centroid of the diamond at (row, col)
    pub fn cell_center(&self, row: usize, col: usize) -> (f32, f32) {
        let (x, y) = self.to_screen(row as f32, col as f32);
        (x, y + self.metrics.tile_height / 2.0)
    }

    /// The four diamond vertices, clockwise from the top
    pub fn diamond(&self, row: usize, col: usize) -> [(f32, f32); 4] {
        let (x, y) = self.to_screen(row as f32, col as f32);
        let half_w = self.metrics.tile_width / 2.0;
        let half_h = self.metrics.tile_height / 2.0;
        [
            (x, y),
            (x + half_w, y + half_h),
            (x, y + self.metrics.tile_height),
            (x - half_w, y + half_h),
        ]
    }

    /// Inverse projection. No bounds check: the result may lie off-grid.
    pub fn to_grid(&self, screen_x: f32, screen_y: f32) -> (i32, i32) {
        let x = (screen_x - self.origin_x) / self.metrics.tile_width;
        let y = (screen_y - self.origin_y) / self.metrics.tile_height;
        ((y - x).floor() as i32, (x + y).floor() as i32)
    }

    /// Inverse projection restricted to cells inside the grid
    pub fn pick(&self, screen_x: f32, screen_y: f32) -> Option<(usize, usize)> {
        let (row, col) = self.to_grid(screen_x, screen_y);
        let n = self.grid_size as i32;
        if (0..n).contains(&row) && (0..n).contains(&col) {
            Some((row as usize, col as usize))
        } else {
            None
        }
    }
}
