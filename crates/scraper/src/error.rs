//! # Game Error Types
//!
//! Errors that abort level construction. Per-tick problems never surface
//! here: entity deaths are [`crate::entity::FellOffMap`] values.

use scraper_tilemap::TileMapError;
use thiserror::Error;

/// Errors that can occur while configuring or building a level.
#[derive(Error, Debug)]
pub enum GameError {
    /// The tile map rejected its inputs.
    #[error(transparent)]
    TileMap(#[from] TileMapError),

    /// A config value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The config file is not valid TOML for [`crate::config::GameConfig`].
    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// The weather document is not valid JSON for a report.
    #[error("weather report parse error: {0}")]
    WeatherParse(#[from] serde_json::Error),

    /// Reading a file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for game operations.
pub type GameResult<T> = Result<T, GameError>;
