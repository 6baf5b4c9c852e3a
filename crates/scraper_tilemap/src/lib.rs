//! # SCRAPER Tile Map
//!
//! Endless level streaming for a side-scrolling runner.
//!
//! ## Design Principles
//!
//! 1. **Append-only**: The world only grows. A column that was readable stays
//!    readable, so collision queries never race with generation.
//! 2. **Chunked**: Terrain is built from pre-authored templates, appended
//!    whole.
//! 3. **Weather-driven**: The reported weather picks the template pool.
//! 4. **Deterministic**: Same seed + same weather = same level.
//!
//! ## Core Components
//!
//! - `Tileset`: code to tile catalog (passable / blocked)
//! - `TemplateLibrary`: immutable catalog of chunk templates and pools
//! - `ColumnStore`: segmented append-only column storage
//! - `ChunkGenerator` / `GeneratorWorker`: background terrain production
//! - `WorldGrid`: camera, bounds, render window, watermark admission
//! - `resolve`: corner-sampling entity collision
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use scraper_tilemap::{ChunkGenerator, GeneratorWorker, GridConfig, TemplateLibrary, Tileset, WorldGrid};
//!
//! let library = Arc::new(TemplateLibrary::builtin(8)?);
//! let generator = Arc::new(ChunkGenerator::new(library, "Rain", 12345));
//! let mut grid = WorldGrid::new(GridConfig::default(), Tileset::default(), Arc::clone(&generator))?;
//! let worker = GeneratorWorker::spawn(Arc::clone(&generator))?;
//! generator.activate();
//!
//! // Every tick
//! grid.update();
//! grid.set_position(grid.x() - 2.0, 0.0);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod collision;
pub mod column_store;
pub mod error;
pub mod generator;
pub mod grid;
pub mod pool;
pub mod template;
pub mod tile;

pub use collision::{
    resolve, Body, CollisionScratch, Contacts, CornerTiles, Corners, MotionFlags, Resolution,
    TileQuery,
};
pub use column_store::{ColumnAppender, ColumnStore};
pub use error::{TileMapError, TileMapResult};
pub use generator::{
    ChunkGenerator, GeneratorStats, GeneratorWorker, RunReport, DEFAULT_WORKLOAD, MAX_WORKLOAD,
    RUN_COLUMN_CAP,
};
pub use grid::{Bounds, GridAppender, GridConfig, RenderView, VisibleTile, WorldGrid};
pub use pool::{TemplatePool, WeatherCondition};
pub use template::{parse_template, Column, TemplateId, TemplateLibrary, TileTemplate};
pub use tile::{Tile, TileCode, TileImage, TileKind, Tileset, EMPTY_TILE, TILESET_ROWS};
