//! # Tiles
//!
//! A level is a grid of numeric tile codes. Each code resolves to a [`Tile`]
//! in the [`Tileset`]:
//!
//! ```text
//! sheet row = code / tiles_per_row
//! sheet col = code % tiles_per_row
//! ```
//!
//! The tileset image has exactly two rows. Row 0 holds passable decoration,
//! row 1 holds solid ground. Code 0 is the empty tile.

use crate::error::{TileMapError, TileMapResult};

/// A numeric tile code as stored in templates and in the world grid.
pub type TileCode = u16;

/// The empty tile (never drawn).
pub const EMPTY_TILE: TileCode = 0;

/// Number of rows in a tileset image.
pub const TILESET_ROWS: usize = 2;

/// How a tile interacts with moving entities.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TileKind {
    /// Entities pass through.
    #[default]
    Passable,
    /// Entities collide.
    Blocked,
}

impl TileKind {
    /// Returns true for [`TileKind::Blocked`].
    #[inline]
    #[must_use]
    pub const fn is_blocked(self) -> bool {
        matches!(self, Self::Blocked)
    }
}

/// Opaque reference to a tile's image: its cell in the tileset sheet.
///
/// The core never touches pixels; the render collaborator maps this to
/// whatever texture region it loaded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TileImage {
    /// Row in the tileset sheet.
    pub sheet_row: u16,
    /// Column in the tileset sheet.
    pub sheet_col: u16,
}

/// A single tile: image reference plus collision kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Tile {
    /// Where the image lives in the sheet.
    pub image: TileImage,
    /// Collision behaviour.
    pub kind: TileKind,
}

/// Catalog of every tile a code can resolve to.
#[derive(Clone, Debug)]
pub struct Tileset {
    /// Tiles per sheet row.
    tiles_per_row: u16,
    /// Tiles indexed by code.
    tiles: Vec<Tile>,
}

impl Tileset {
    /// Tiles across the bundled tileset sheet.
    pub const DEFAULT_TILES_PER_ROW: u16 = 20;

    /// Creates a tileset whose sheet is `tiles_per_row` tiles wide.
    ///
    /// # Errors
    ///
    /// Returns [`TileMapError::InvalidArgument`] if `tiles_per_row` is zero.
    pub fn new(tiles_per_row: u16) -> TileMapResult<Self> {
        if tiles_per_row == 0 {
            return Err(TileMapError::InvalidArgument(
                "tileset must have at least one tile per row".to_string(),
            ));
        }

        Ok(Self::build(tiles_per_row))
    }

    fn build(tiles_per_row: u16) -> Self {
        let mut tiles = Vec::with_capacity(TILESET_ROWS * usize::from(tiles_per_row));
        for sheet_row in 0..TILESET_ROWS as u16 {
            let kind = if sheet_row == 0 {
                TileKind::Passable
            } else {
                TileKind::Blocked
            };
            for sheet_col in 0..tiles_per_row {
                tiles.push(Tile {
                    image: TileImage { sheet_row, sheet_col },
                    kind,
                });
            }
        }

        Self { tiles_per_row, tiles }
    }

    /// Returns the sheet width in tiles.
    #[inline]
    #[must_use]
    pub const fn tiles_per_row(&self) -> u16 {
        self.tiles_per_row
    }

    /// Returns the number of valid codes (`0..len`).
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Returns true if the tileset has no tiles (never, once constructed).
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Returns true if `code` resolves to a tile.
    #[inline]
    #[must_use]
    pub fn contains(&self, code: TileCode) -> bool {
        usize::from(code) < self.tiles.len()
    }

    /// Resolves a code to its tile.
    #[inline]
    #[must_use]
    pub fn tile(&self, code: TileCode) -> Option<&Tile> {
        let row = usize::from(code / self.tiles_per_row);
        let col = usize::from(code % self.tiles_per_row);
        self.tiles.get(row * usize::from(self.tiles_per_row) + col)
    }

    /// Resolves a code to its collision kind.
    ///
    /// Codes outside the catalog are treated as passable.
    #[inline]
    #[must_use]
    pub fn kind(&self, code: TileCode) -> TileKind {
        self.tile(code).map_or(TileKind::Passable, |tile| tile.kind)
    }
}

impl Default for Tileset {
    fn default() -> Self {
        Self::build(Self::DEFAULT_TILES_PER_ROW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_resolution() {
        let tileset = Tileset::new(20).unwrap();

        assert_eq!(tileset.len(), 40);
        assert_eq!(tileset.kind(0), TileKind::Passable);
        assert_eq!(tileset.kind(19), TileKind::Passable);
        assert_eq!(tileset.kind(20), TileKind::Blocked);
        assert_eq!(tileset.kind(21), TileKind::Blocked);

        let tile = tileset.tile(21).unwrap();
        assert_eq!(tile.image, TileImage { sheet_row: 1, sheet_col: 1 });
    }

    #[test]
    fn test_out_of_catalog_codes() {
        let tileset = Tileset::new(4).unwrap();

        assert!(tileset.contains(7));
        assert!(!tileset.contains(8));
        assert!(tileset.tile(8).is_none());
        assert_eq!(tileset.kind(8), TileKind::Passable);
    }

    #[test]
    fn test_zero_width_tileset_rejected() {
        assert!(matches!(
            Tileset::new(0),
            Err(TileMapError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_default_matches_bundled_sheet() {
        let tileset = Tileset::default();
        assert_eq!(tileset.tiles_per_row(), Tileset::DEFAULT_TILES_PER_ROW);
        assert_eq!(tileset.kind(21), TileKind::Blocked);
    }
}
