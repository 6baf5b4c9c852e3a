//! # World Grid
//!
//! The live level: an append-only column store plus a camera.
//!
//! ```text
//!   col_offset                     len
//!       │◄──── cols_to_render ────►│
//!   ────┼──────────────────────────┼──────────── (generated ahead) ──┤
//!       │        viewport          │◄── ahead >= low_water_mark ───►│
//! ```
//!
//! The camera position is the world's offset on screen, so it moves from
//! `0` towards negative `x` as the level scrolls. It is clamped to
//! `[viewport_width - width, 0]` where `width` grows with every append.
//!
//! The grid is owned by the simulation thread. The generator worker only
//! shares the column store; [`WorldGrid::update`] is the single place that
//! asks it for more terrain.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::collision::TileQuery;
use crate::column_store::{ColumnAppender, ColumnStore};
use crate::error::{TileMapError, TileMapResult};
use crate::generator::ChunkGenerator;
use crate::template::TileTemplate;
use crate::tile::{Tile, TileCode, TileKind, Tileset, EMPTY_TILE};

/// Grid and camera settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Edge length of a square tile in pixels.
    pub tile_size: u32,
    /// Viewport width in pixels.
    pub viewport_width: u32,
    /// Viewport height in pixels. `viewport_height / tile_size` is the
    /// world height in tiles.
    pub viewport_height: u32,
    /// Camera smoothing factor in `(0, 1]`.
    pub tween: f64,
    /// Columns kept generated beyond the visible ones.
    pub low_water_margin: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            tile_size: 30,
            viewport_width: 600,
            viewport_height: 240,
            tween: 0.07,
            low_water_margin: 10,
        }
    }
}

impl GridConfig {
    /// Checks every field against its documented range.
    ///
    /// # Errors
    ///
    /// Returns [`TileMapError::InvalidArgument`] for a zero tile size, a
    /// viewport smaller than one tile, or a tween outside `(0, 1]`.
    pub fn validate(&self) -> TileMapResult<()> {
        if self.tile_size == 0 {
            return Err(TileMapError::InvalidArgument(
                "tile size must be positive".to_string(),
            ));
        }
        if self.viewport_width < self.tile_size || self.viewport_height < self.tile_size {
            return Err(TileMapError::InvalidArgument(format!(
                "viewport {}x{} is smaller than one {}px tile",
                self.viewport_width, self.viewport_height, self.tile_size
            )));
        }
        validate_tween(self.tween)
    }

    /// World height in tiles.
    #[inline]
    #[must_use]
    pub const fn rows(&self) -> usize {
        (self.viewport_height / self.tile_size) as usize
    }

    /// Columns that fit on screen.
    #[inline]
    #[must_use]
    pub const fn viewport_cols(&self) -> usize {
        (self.viewport_width / self.tile_size) as usize
    }
}

fn validate_tween(tween: f64) -> TileMapResult<()> {
    if tween > 0.0 && tween <= 1.0 {
        Ok(())
    } else {
        Err(TileMapError::InvalidArgument(format!(
            "tween {tween} is outside (0, 1]"
        )))
    }
}

/// Camera clamp range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    /// Leftmost allowed camera x.
    pub min_x: f64,
    /// Rightmost allowed camera x.
    pub max_x: f64,
    /// Topmost allowed camera y.
    pub min_y: f64,
    /// Bottommost allowed camera y.
    pub max_y: f64,
}

/// What the render collaborator needs to draw one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderView {
    /// Camera x (world offset on screen).
    pub camera_x: f64,
    /// Camera y.
    pub camera_y: f64,
    /// Tile edge in pixels.
    pub tile_size: u32,
    /// First visible row.
    pub row_offset: usize,
    /// First visible column.
    pub col_offset: usize,
    /// Rows drawn per frame.
    pub rows_to_render: usize,
    /// Columns drawn per frame.
    pub cols_to_render: usize,
}

/// One tile to draw.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VisibleTile {
    /// Screen x of the tile's left edge.
    pub screen_x: i64,
    /// Screen y of the tile's top edge.
    pub screen_y: i64,
    /// Raw code.
    pub code: TileCode,
    /// Resolved tile.
    pub tile: Tile,
}

// ============================================================================
// APPENDING
// ============================================================================

/// Proof that the append permit is held.
///
/// Every append republishes the grid length, and with it the width and
/// camera bounds.
pub struct GridAppender<'a> {
    columns: ColumnAppender<'a>,
    rows: usize,
}

impl<'a> GridAppender<'a> {
    /// Takes the append permit of `store`, blocking until it is free.
    pub fn lock(store: &'a ColumnStore, rows: usize) -> Self {
        Self {
            columns: store.lock(),
            rows,
        }
    }

    /// Appends every column of `template`. Returns the columns appended.
    ///
    /// # Errors
    ///
    /// Returns [`TileMapError::InvalidArgument`] if the template height does
    /// not match the world.
    pub fn append_template(&mut self, template: &TileTemplate) -> TileMapResult<usize> {
        if template.rows() != self.rows {
            return Err(TileMapError::InvalidArgument(format!(
                "template {} is {} rows high, world is {}",
                template.id(),
                template.rows(),
                self.rows
            )));
        }
        for column in template.columns() {
            self.columns.push(Arc::clone(column))?;
        }
        Ok(template.len())
    }

    /// Returns the current column count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if nothing has been appended yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

// ============================================================================
// WORLD GRID
// ============================================================================

/// The endless level.
#[derive(Debug)]
pub struct WorldGrid {
    config: GridConfig,
    tileset: Tileset,
    generator: Arc<ChunkGenerator>,

    x: f64,
    y: f64,
    row_offset: usize,
    col_offset: usize,

    rows: usize,
    rows_to_render: usize,
    cols_to_render: usize,
    low_water_mark: usize,
}

impl WorldGrid {
    /// Creates a grid over `generator`'s column store and seeds it with
    /// filler so the first screen is never empty.
    ///
    /// # Errors
    ///
    /// Returns [`TileMapError::InvalidArgument`] if `config` is out of range
    /// or the templates are not as high as the viewport, and
    /// [`TileMapError::Format`] if a template uses a code the tileset lacks.
    pub fn new(
        config: GridConfig,
        tileset: Tileset,
        generator: Arc<ChunkGenerator>,
    ) -> TileMapResult<Self> {
        config.validate()?;

        let rows = config.rows();
        let library = generator.library();
        if library.rows() != rows {
            return Err(TileMapError::InvalidArgument(format!(
                "templates are {} rows high, viewport fits {rows}",
                library.rows()
            )));
        }
        library.validate_codes(&tileset)?;

        let viewport_cols = config.viewport_cols();
        let mut grid = Self {
            rows,
            rows_to_render: rows + 2,
            cols_to_render: viewport_cols + 2,
            low_water_mark: viewport_cols + config.low_water_margin,
            config,
            tileset,
            generator,
            x: 0.0,
            y: 0.0,
            row_offset: 0,
            col_offset: 0,
        };

        let seeded = grid.generator.seed(grid.low_water_mark)?;
        tracing::info!(
            columns = grid.len(),
            seeded,
            low_water_mark = grid.low_water_mark,
            "world grid seeded"
        );

        grid.fix_bounds();
        Ok(grid)
    }

    /// Appends a template, waiting for the append permit.
    ///
    /// # Errors
    ///
    /// Returns [`TileMapError::InvalidArgument`] if the template height does
    /// not match the world.
    pub fn append_template(&self, template: &TileTemplate) -> TileMapResult<usize> {
        GridAppender::lock(self.generator.columns(), self.rows).append_template(template)
    }

    /// Returns the collision kind at `(row, col)`.
    ///
    /// Anything outside the generated grid is passable.
    #[must_use]
    pub fn query_tile_type(&self, row: i32, col: i32) -> TileKind {
        self.code_at(row, col)
            .map_or(TileKind::Passable, |code| self.tileset.kind(code))
    }

    /// Returns the code at `(row, col)` if it is inside the generated grid.
    #[must_use]
    pub fn code_at(&self, row: i32, col: i32) -> Option<TileCode> {
        let row = usize::try_from(row).ok()?;
        let col = usize::try_from(col).ok()?;
        if row >= self.rows {
            return None;
        }
        self.generator.columns().get(col)?.get(row).copied()
    }

    /// Moves the camera a `tween` fraction of the way towards the target,
    /// then clamps it to the bounds.
    pub fn set_position(&mut self, target_x: f64, target_y: f64) {
        self.x += (target_x - self.x) * self.config.tween;
        self.y += (target_y - self.y) * self.config.tween;
        self.fix_bounds();
    }

    /// Sets the camera smoothing factor. `1.0` snaps to the target.
    ///
    /// # Errors
    ///
    /// Returns [`TileMapError::InvalidArgument`] unless `0 < tween <= 1`.
    pub fn set_tween(&mut self, tween: f64) -> TileMapResult<()> {
        validate_tween(tween)?;
        self.config.tween = tween;
        Ok(())
    }

    /// Checks the low-water mark and hands work to the generator if too few
    /// columns are left ahead of the camera. Returns true if a run was
    /// requested.
    pub fn update(&mut self) -> bool {
        // Width may have grown since the last tick.
        self.fix_bounds();

        let ahead = self.columns_ahead();
        if ahead >= self.low_water_mark {
            return false;
        }

        let needed = self.low_water_mark - ahead;
        let shortest = self.generator.library().shortest_len().max(1);
        let workload = needed.div_ceil(shortest).clamp(1, crate::generator::MAX_WORKLOAD);

        if let Err(error) = self.generator.set_workload(workload) {
            tracing::warn!(%error, "watermark admission rejected");
            return false;
        }
        let queued = self.generator.request_run();
        tracing::debug!(ahead, workload, queued, "low-water mark reached");
        true
    }

    /// Moves the camera back to the origin. Generated columns are kept.
    pub fn reset(&mut self) {
        self.x = 0.0;
        self.y = 0.0;
        self.fix_bounds();
    }

    /// Returns true while the generator holds the append permit and the
    /// camera is about to outrun the generated terrain.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.generator.columns().is_locked() && self.columns_ahead() < self.cols_to_render
    }

    /// Returns the render collaborator's view of the current frame.
    #[must_use]
    pub fn render_view(&self) -> RenderView {
        RenderView {
            camera_x: self.x,
            camera_y: self.y,
            tile_size: self.config.tile_size,
            row_offset: self.row_offset,
            col_offset: self.col_offset,
            rows_to_render: self.rows_to_render,
            cols_to_render: self.cols_to_render,
        }
    }

    /// Iterates the tiles to draw this frame, skipping empty tiles.
    pub fn visible_tiles(&self) -> impl Iterator<Item = VisibleTile> + '_ {
        let ts = i64::from(self.config.tile_size);
        let origin_x = self.x as i64;
        let origin_y = self.y as i64;
        let columns = self.generator.columns();
        let row_end = (self.row_offset + self.rows_to_render).min(self.rows);
        let col_end = (self.col_offset + self.cols_to_render).min(columns.len());

        (self.row_offset..row_end).flat_map(move |row| {
            (self.col_offset..col_end).filter_map(move |col| {
                let code = *columns.get(col)?.get(row)?;
                if code == EMPTY_TILE {
                    return None;
                }
                let tile = *self.tileset.tile(code)?;
                Some(VisibleTile {
                    screen_x: origin_x + col as i64 * ts,
                    screen_y: origin_y + row as i64 * ts,
                    code,
                    tile,
                })
            })
        })
    }

    /// Returns the current camera clamp range.
    #[must_use]
    pub fn bounds(&self) -> Bounds {
        Bounds {
            min_x: f64::from(self.config.viewport_width) - self.width() as f64,
            max_x: 0.0,
            min_y: f64::from(self.config.viewport_height) - self.height() as f64,
            max_y: 0.0,
        }
    }

    fn fix_bounds(&mut self) {
        let bounds = self.bounds();
        if self.x < bounds.min_x {
            self.x = bounds.min_x;
        }
        if self.x > bounds.max_x {
            self.x = bounds.max_x;
        }
        if self.y < bounds.min_y {
            self.y = bounds.min_y;
        }
        if self.y > bounds.max_y {
            self.y = bounds.max_y;
        }

        let ts = f64::from(self.config.tile_size);
        self.col_offset = (-self.x / ts).max(0.0) as usize;
        self.row_offset = (-self.y / ts).max(0.0) as usize;
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    /// Camera x.
    #[inline]
    #[must_use]
    pub fn x(&self) -> f64 {
        self.x
    }

    /// Camera y.
    #[inline]
    #[must_use]
    pub fn y(&self) -> f64 {
        self.y
    }

    /// Tile edge in pixels.
    #[inline]
    #[must_use]
    pub fn tile_size(&self) -> u32 {
        self.config.tile_size
    }

    /// Current camera tween.
    #[inline]
    #[must_use]
    pub fn tween(&self) -> f64 {
        self.config.tween
    }

    /// World height in tiles.
    #[inline]
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Generated columns.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.generator.columns().len()
    }

    /// True before seeding (never, once constructed).
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Generated width in pixels.
    #[inline]
    #[must_use]
    pub fn width(&self) -> u64 {
        self.len() as u64 * u64::from(self.config.tile_size)
    }

    /// World height in pixels.
    #[inline]
    #[must_use]
    pub fn height(&self) -> u64 {
        self.rows as u64 * u64::from(self.config.tile_size)
    }

    /// First visible column.
    #[inline]
    #[must_use]
    pub fn col_offset(&self) -> usize {
        self.col_offset
    }

    /// First visible row.
    #[inline]
    #[must_use]
    pub fn row_offset(&self) -> usize {
        self.row_offset
    }

    /// Generated columns at or right of the first visible one.
    #[inline]
    #[must_use]
    pub fn columns_ahead(&self) -> usize {
        self.len().saturating_sub(self.col_offset)
    }

    /// Columns ahead below which generation is requested.
    #[inline]
    #[must_use]
    pub fn low_water_mark(&self) -> usize {
        self.low_water_mark
    }

    /// Grid settings.
    #[must_use]
    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Tile catalog.
    #[must_use]
    pub fn tileset(&self) -> &Tileset {
        &self.tileset
    }

    /// The generator feeding this grid.
    #[must_use]
    pub fn generator(&self) -> &Arc<ChunkGenerator> {
        &self.generator
    }
}

impl TileQuery for WorldGrid {
    #[inline]
    fn tile_size(&self) -> u32 {
        self.config.tile_size
    }

    #[inline]
    fn query_tile_type(&self, row: i32, col: i32) -> TileKind {
        WorldGrid::query_tile_type(self, row, col)
    }
}
