//! # Chunk Templates
//!
//! Pre-authored chunks of level terrain. The generator extends the world by
//! appending whole templates, column by column.
//!
//! ## Map File Format
//!
//! Map files are column-major (a transposed picture of the chunk):
//!
//! ```text
//! 3                  <- column count
//! 8                  <- row count, must equal the world height in tiles
//! 0 0 0 0 0 0 0 21   <- column 0, top to bottom
//! 0 0 0 0 0 0 21 21  <- column 1
//! 0 0 0 0 0 0 0 21   <- column 2
//! ```
//!
//! ## Manifest
//!
//! A TOML manifest lists every map file with its id, filler flag and the
//! weather pools it belongs to. See `assets/maps/templates.toml`.
//!
//! Templates are loaded once and never mutated; the library is shared
//! between the simulation thread and the generator worker through `Arc`.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::error::{TileMapError, TileMapResult};
use crate::pool::{TemplatePool, WeatherCondition};
use crate::tile::{TileCode, Tileset};

/// One column of tile codes, top to bottom.
///
/// Columns are shared between templates and every grid they were appended
/// to; they are never mutated after load.
pub type Column = Arc<[TileCode]>;

/// Stable template identifier (the manifest `id`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateId(String);

impl TemplateId {
    /// Creates an identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A pre-authored chunk of columns.
#[derive(Clone, Debug)]
pub struct TileTemplate {
    id: TemplateId,
    columns: Vec<Column>,
    rows: usize,
    extendable: bool,
    /// Membership in the two base pools (`Mixed` is derived).
    fair: bool,
    precipitation: bool,
}

impl TileTemplate {
    /// Builds a template from in-memory columns.
    ///
    /// # Errors
    ///
    /// Returns [`TileMapError::Format`] if there are no columns or any column
    /// is not exactly `rows` codes long.
    pub fn from_columns(
        id: impl Into<String>,
        rows: usize,
        columns: Vec<Vec<TileCode>>,
    ) -> TileMapResult<Self> {
        let id = TemplateId::new(id);
        if columns.is_empty() {
            return Err(TileMapError::format(id.as_str(), "template has no columns"));
        }
        if let Some((index, column)) = columns.iter().enumerate().find(|(_, c)| c.len() != rows) {
            return Err(TileMapError::format(
                id.as_str(),
                format!("column {index} has {} rows, expected {rows}", column.len()),
            ));
        }

        Ok(Self {
            id,
            columns: columns.into_iter().map(Column::from).collect(),
            rows,
            extendable: false,
            fair: false,
            precipitation: false,
        })
    }

    /// Marks the template as filler.
    #[must_use]
    pub fn with_extendable(mut self, extendable: bool) -> Self {
        self.extendable = extendable;
        self
    }

    /// Adds the template to a pool. `Mixed` adds it to both base pools.
    #[must_use]
    pub fn in_pool(mut self, pool: TemplatePool) -> Self {
        match pool {
            TemplatePool::Fair => self.fair = true,
            TemplatePool::Precipitation => self.precipitation = true,
            TemplatePool::Mixed => {
                self.fair = true;
                self.precipitation = true;
            }
        }
        self
    }

    /// Returns the template id.
    #[must_use]
    pub fn id(&self) -> &TemplateId {
        &self.id
    }

    /// Returns the columns, left to right.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Always false for a constructed template.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Returns the height in tiles.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Returns whether this template may be used as pure filler.
    #[must_use]
    pub fn extendable(&self) -> bool {
        self.extendable
    }

    /// Returns whether the template is drawn by `pool`.
    #[must_use]
    pub fn belongs_to(&self, pool: TemplatePool) -> bool {
        match pool {
            TemplatePool::Fair => self.fair,
            TemplatePool::Precipitation => self.precipitation,
            TemplatePool::Mixed => self.fair || self.precipitation,
        }
    }
}

/// Parses one map file.
///
/// # Errors
///
/// Returns [`TileMapError::Format`] if the header is missing or not numeric,
/// the row count differs from `rows`, a column line has the wrong number of
/// tokens, a token is not a tile code, or the column count does not match
/// the number of column lines.
pub fn parse_template(id: &str, text: &str, rows: usize) -> TileMapResult<TileTemplate> {
    let mut lines = text.lines().map(str::trim).filter(|line| !line.is_empty());

    let num_cols = parse_header(id, lines.next(), "column count")?;
    let num_rows = parse_header(id, lines.next(), "row count")?;
    if num_rows != rows {
        return Err(TileMapError::format(
            id,
            format!("template has {num_rows} rows, world is {rows} rows high"),
        ));
    }

    let mut columns = Vec::with_capacity(num_cols);
    for index in 0..num_cols {
        let line = lines.next().ok_or_else(|| {
            TileMapError::format(id, format!("expected {num_cols} columns, found {index}"))
        })?;

        let column = line
            .split_whitespace()
            .map(|token| {
                token.parse::<TileCode>().map_err(|_| {
                    TileMapError::format(id, format!("column {index}: {token:?} is not a tile code"))
                })
            })
            .collect::<TileMapResult<Vec<_>>>()?;

        if column.len() != rows {
            return Err(TileMapError::format(
                id,
                format!("column {index} has {} rows, expected {rows}", column.len()),
            ));
        }
        columns.push(column);
    }

    if lines.next().is_some() {
        return Err(TileMapError::format(
            id,
            format!("more column lines than the declared {num_cols}"),
        ));
    }

    TileTemplate::from_columns(id, rows, columns)
}

fn parse_header(id: &str, line: Option<&str>, what: &str) -> TileMapResult<usize> {
    let line = line.ok_or_else(|| TileMapError::format(id, format!("missing {what}")))?;
    line.parse::<usize>()
        .map_err(|_| TileMapError::format(id, format!("{what} {line:?} is not a number")))
}

// ============================================================================
// MANIFEST
// ============================================================================

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(rename = "template", default)]
    templates: Vec<ManifestEntry>,
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    id: String,
    file: String,
    #[serde(default)]
    extendable: bool,
    #[serde(default)]
    pools: Vec<TemplatePool>,
}

const BUILTIN_MANIFEST: &str = include_str!("../assets/maps/templates.toml");

const BUILTIN_MAPS: &[(&str, &str)] = &[
    ("default.map", include_str!("../assets/maps/default.map")),
    ("ledge.map", include_str!("../assets/maps/ledge.map")),
    ("bumps1.map", include_str!("../assets/maps/bumps1.map")),
    ("platforms1.map", include_str!("../assets/maps/platforms1.map")),
    ("pits1.map", include_str!("../assets/maps/pits1.map")),
    ("pits2.map", include_str!("../assets/maps/pits2.map")),
    ("platforms2.map", include_str!("../assets/maps/platforms2.map")),
    ("hole1.map", include_str!("../assets/maps/hole1.map")),
];

// ============================================================================
// LIBRARY
// ============================================================================

/// The immutable catalog of templates for one level.
#[derive(Debug)]
pub struct TemplateLibrary {
    rows: usize,
    templates: Vec<TileTemplate>,
    /// Template indices per pool, in catalog order.
    pools: [Vec<usize>; 3],
    /// Indices of extendable templates.
    fillers: Vec<usize>,
}

impl TemplateLibrary {
    /// Height of the bundled templates in tiles.
    pub const BUILTIN_ROWS: usize = 8;

    /// Builds a library from already-parsed templates.
    ///
    /// # Errors
    ///
    /// Returns [`TileMapError::Format`] if a template height differs from
    /// `rows`, two templates share an id, or the fair or precipitation pool
    /// ends up empty.
    pub fn from_templates(rows: usize, templates: Vec<TileTemplate>) -> TileMapResult<Self> {
        for (i, template) in templates.iter().enumerate() {
            if template.rows() != rows {
                return Err(TileMapError::format(
                    template.id().as_str(),
                    format!("template is {} rows high, world is {rows}", template.rows()),
                ));
            }
            if templates[..i].iter().any(|other| other.id() == template.id()) {
                return Err(TileMapError::format(
                    template.id().as_str(),
                    "duplicate template id",
                ));
            }
        }

        let pools = TemplatePool::ALL.map(|pool| {
            templates
                .iter()
                .enumerate()
                .filter(|(_, t)| t.belongs_to(pool))
                .map(|(i, _)| i)
                .collect::<Vec<_>>()
        });

        for pool in [TemplatePool::Fair, TemplatePool::Precipitation] {
            if pools[pool.index()].is_empty() {
                return Err(TileMapError::format(
                    "template library",
                    format!("no template belongs to the {pool} pool"),
                ));
            }
        }

        let fillers = templates
            .iter()
            .enumerate()
            .filter(|(_, t)| t.extendable())
            .map(|(i, _)| i)
            .collect();

        let library = Self {
            rows,
            templates,
            pools,
            fillers,
        };

        tracing::info!(
            templates = library.templates.len(),
            fair = library.pools[TemplatePool::Fair.index()].len(),
            precipitation = library.pools[TemplatePool::Precipitation.index()].len(),
            fillers = library.fillers.len(),
            "template library loaded"
        );

        Ok(library)
    }

    /// Loads the catalog described by a TOML manifest on disk.
    ///
    /// Map file paths are relative to the manifest's directory.
    ///
    /// # Errors
    ///
    /// Returns [`TileMapError::Io`] if a file cannot be read and
    /// [`TileMapError::Format`] if the manifest or any map is malformed.
    pub fn load_manifest(path: impl AsRef<Path>, rows: usize) -> TileMapResult<Self> {
        let path = path.as_ref();
        let manifest = std::fs::read_to_string(path)?;
        let dir = path.parent().unwrap_or_else(|| Path::new("."));

        Self::from_manifest_with(&manifest, &path.display().to_string(), rows, |file| {
            Ok(std::fs::read_to_string(dir.join(file))?)
        })
    }

    /// Loads the bundled catalog (maps compiled into the binary).
    ///
    /// # Errors
    ///
    /// Returns [`TileMapError::Format`] if `rows` differs from
    /// [`Self::BUILTIN_ROWS`].
    pub fn builtin(rows: usize) -> TileMapResult<Self> {
        Self::from_manifest_with(BUILTIN_MANIFEST, "templates.toml", rows, |file| {
            BUILTIN_MAPS
                .iter()
                .find(|(name, _)| *name == file)
                .map(|(_, text)| (*text).to_string())
                .ok_or_else(|| TileMapError::format(file, "not a bundled map file"))
        })
    }

    fn from_manifest_with<F>(
        manifest: &str,
        manifest_name: &str,
        rows: usize,
        mut read_map: F,
    ) -> TileMapResult<Self>
    where
        F: FnMut(&str) -> TileMapResult<String>,
    {
        let manifest: Manifest = toml::from_str(manifest)
            .map_err(|e| TileMapError::format(manifest_name, e.to_string()))?;

        let mut templates = Vec::with_capacity(manifest.templates.len());
        for entry in manifest.templates {
            let text = read_map(&entry.file)?;
            let template = entry
                .pools
                .iter()
                .fold(parse_template(&entry.id, &text, rows)?, |t, pool| t.in_pool(*pool))
                .with_extendable(entry.extendable);
            templates.push(template);
        }

        Self::from_templates(rows, templates)
    }

    /// Returns the height of every template in tiles.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Returns the number of templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Always false for a constructed library.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Returns every template in catalog order.
    #[must_use]
    pub fn templates(&self) -> &[TileTemplate] {
        &self.templates
    }

    /// Returns the template at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&TileTemplate> {
        self.templates.get(index)
    }

    /// Looks a template up by id.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&TileTemplate> {
        self.templates.iter().find(|t| t.id().as_str() == id)
    }

    /// Returns the catalog indices drawn by `pool`. Never empty.
    #[must_use]
    pub fn pool(&self, pool: TemplatePool) -> &[usize] {
        &self.pools[pool.index()]
    }

    /// Returns the ids of the pool a weather condition draws from.
    ///
    /// Total: every string, recognised or not, yields a non-empty pool.
    #[must_use]
    pub fn select_pool_for(&self, condition: &str) -> Vec<TemplateId> {
        self.pool(WeatherCondition::parse(condition).pool())
            .iter()
            .map(|&i| self.templates[i].id().clone())
            .collect()
    }

    /// Returns the catalog indices of filler templates.
    #[must_use]
    pub fn fillers(&self) -> &[usize] {
        &self.fillers
    }

    /// Returns the column count of the shortest template.
    #[must_use]
    pub fn shortest_len(&self) -> usize {
        self.templates.iter().map(TileTemplate::len).min().unwrap_or(1)
    }

    /// Checks that every code in every template resolves in `tileset`.
    ///
    /// # Errors
    ///
    /// Returns [`TileMapError::Format`] naming the first offending template.
    pub fn validate_codes(&self, tileset: &Tileset) -> TileMapResult<()> {
        for template in &self.templates {
            for (index, column) in template.columns().iter().enumerate() {
                if let Some(code) = column.iter().find(|&&code| !tileset.contains(code)) {
                    return Err(TileMapError::format(
                        template.id().as_str(),
                        format!(
                            "column {index}: code {code} is outside the tileset (0..{})",
                            tileset.len()
                        ),
                    ));
                }
            }
        }
        Ok(())
    }
}
