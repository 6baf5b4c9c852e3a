//! # Tile Map Error Types
//!
//! All errors that can occur while loading templates or building a level.

use thiserror::Error;

/// Errors that can occur in the tile-map system.
#[derive(Error, Debug)]
pub enum TileMapError {
    /// A template, map file or manifest is malformed.
    ///
    /// Fatal to level construction; never retried.
    #[error("format error in {source_name}: {reason}")]
    Format {
        /// File name or template id the error was found in.
        source_name: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A caller passed an argument outside its documented range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Reading a data file or spawning the worker thread failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl TileMapError {
    /// Shorthand for a [`TileMapError::Format`].
    pub(crate) fn format(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Format {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for tile-map operations.
pub type TileMapResult<T> = Result<T, TileMapError>;
