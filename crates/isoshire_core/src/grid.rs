//! The N×N tile layer and character layer

use crate::{CharacterId, TileCell};

/// Smallest grid the editor accepts
pub const MIN_GRID_SIZE: usize = 3;
/// Largest grid the editor accepts
pub const MAX_GRID_SIZE: usize = 20;
/// Size of a freshly created map
pub const DEFAULT_GRID_SIZE: usize = 7;

/// A square grid holding a terrain layer and an occupant layer.
///
/// Both layers are stored row-major and always hold exactly `size * size`
/// entries. `Clone` is a deep copy, which is what history snapshots rely on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    size: usize,
    tiles: Vec<TileCell>,
    characters: Vec<Option<CharacterId>>,
}

impl Default for Grid {
    fn default() -> Self {
        Self::new(DEFAULT_GRID_SIZE)
    }
}

impl Grid {
    /// Create an empty grid: default tiles, no characters
    pub fn new(size: usize) -> Self {
        let cells = size * size;
        Self {
            size,
            tiles: vec![TileCell::default(); cells],
            characters: vec![None; cells],
        }
    }

    /// Build a grid from nested rows. Returns `None` if either layer is not
    /// exactly `size` rows of `size` entries.
    pub fn from_rows(
        size: usize,
        tiles: Vec<Vec<TileCell>>,
        characters: Vec<Vec<Option<CharacterId>>>,
    ) -> Option<Self> {
        let square = |len: usize, rows: &[usize]| len == size && rows.iter().all(|r| *r == size);

        let tile_lens: Vec<usize> = tiles.iter().map(Vec::len).collect();
        let char_lens: Vec<usize> = characters.iter().map(Vec::len).collect();
        if !square(tiles.len(), &tile_lens) || !square(characters.len(), &char_lens) {
            return None;
        }

        Some(Self {
            size,
            tiles: tiles.into_iter().flatten().collect(),
            characters: characters.into_iter().flatten().collect(),
        })
    }

    /// Whether `size` is an accepted grid size
    pub fn is_valid_size(size: usize) -> bool {
        (MIN_GRID_SIZE..=MAX_GRID_SIZE).contains(&size)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Discard all content and reallocate both layers at `size`
    pub fn resize(&mut self, size: usize) {
        *self = Self::new(size);
    }

    /// Whether every tile is default and no character is placed
    pub fn is_empty(&self) -> bool {
        self.tiles.iter().all(|t| *t == TileCell::default())
            && self.characters.iter().all(Option::is_none)
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        row < self.size && col < self.size
    }

    fn index(&self, row: usize, col: usize) -> Option<usize> {
        self.contains(row, col).then(|| row * self.size + col)
    }

    /// Get the tile at a position
    pub fn tile(&self, row: usize, col: usize) -> Option<TileCell> {
        self.index(row, col).map(|i| self.tiles[i])
    }

    /// Get the character at a position (outer `None` when off-grid)
    pub fn character(&self, row: usize, col: usize) -> Option<Option<CharacterId>> {
        self.index(row, col).map(|i| self.characters[i])
    }

    /// Write a tile. Returns `true` only if the stored value changed.
    pub fn set_tile(&mut self, row: usize, col: usize, tile: TileCell) -> bool {
        match self.index(row, col) {
            Some(i) if self.tiles[i] != tile => {
                self.tiles[i] = tile;
                true
            }
            _ => false,
        }
    }

    /// Write a character cell. Returns `true` only if the stored value changed.
    pub fn set_character(
        &mut self,
        row: usize,
        col: usize,
        character: Option<CharacterId>,
    ) -> bool {
        match self.index(row, col) {
            Some(i) if self.characters[i] != character => {
                self.characters[i] = character;
                true
            }
            _ => false,
        }
    }

    /// Iterate `(row, col, tile, character)` in row-major (back-to-front) order
    pub fn cells(
        &self,
    ) -> impl Iterator<Item = (usize, usize, TileCell, Option<CharacterId>)> + '_ {
        let size = self.size;
        self.tiles
            .iter()
            .zip(self.characters.iter())
            .enumerate()
            .map(move |(i, (tile, character))| (i / size, i % size, *tile, *character))
    }

    /// Tile layer as nested rows (wire form)
    pub fn tile_rows(&self) -> Vec<Vec<TileCell>> {
        self.tiles.chunks(self.size.max(1)).map(<[_]>::to_vec).collect()
    }

    /// Character layer as nested rows (wire form)
    pub fn character_rows(&self) -> Vec<Vec<Option<CharacterId>>> {
        self.characters
            .chunks(self.size.max(1))
            .map(<[_]>::to_vec)
            .collect()
    }

    /// Whether any character is placed
    pub fn has_characters(&self) -> bool {
        self.characters.iter().any(Option::is_some)
    }
}
