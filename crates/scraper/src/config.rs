//! # Game Configuration
//!
//! Loaded once at startup from TOML. Every field has a default, so an empty
//! file (or no file) is a valid configuration.
//!
//! ```toml
//! seed = 12345
//! templates = "assets/maps/templates.toml"
//!
//! [grid]
//! tile_size = 30
//! viewport_width = 600
//! viewport_height = 240
//!
//! [scroll]
//! speed = 2.0
//!
//! [hazards]
//! projectile_speed = 2.0
//! ```

use std::path::{Path, PathBuf};

use scraper_tilemap::GridConfig;
use serde::{Deserialize, Serialize};

use crate::error::{GameError, GameResult};

/// Scrolling speed of the level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollConfig {
    /// Pixels per tick at level start.
    pub speed: f64,
    /// Added to the speed every tick.
    pub acceleration: f64,
    /// Speed cap.
    pub max_speed: f64,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            speed: 2.0,
            acceleration: 0.0005,
            max_speed: 5.0,
        }
    }
}

/// Player spawn and combat settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Spawn x in world pixels.
    pub spawn_x: f64,
    /// Spawn y in world pixels (box centre).
    pub spawn_y: f64,
    /// Hit points.
    pub max_health: u32,
    /// Parries needed for one hit point.
    pub heal_threshold: u32,
    /// Invulnerability after a hit.
    pub flinch_ticks: u32,
    /// Length of the active parry window.
    pub parry_ticks: u32,
    /// Cooldown after a parry window.
    pub parry_cooldown_ticks: u32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            spawn_x: 100.0,
            spawn_y: 195.0,
            max_health: 4,
            heal_threshold: 5,
            flinch_ticks: 60,
            parry_ticks: 20,
            parry_cooldown_ticks: 40,
        }
    }
}

/// Hazard spawning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HazardConfig {
    /// Spawn projectiles at all.
    pub enabled: bool,
    /// Projectile speed in pixels per tick.
    pub projectile_speed: f64,
    /// Base spawn interval per humidity percent.
    pub interval_per_humidity_ms: u64,
    /// Floor for the base interval (dry weather).
    pub min_interval_ms: u64,
}

impl Default for HazardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            projectile_speed: 2.0,
            interval_per_humidity_ms: 15,
            min_interval_ms: 250,
        }
    }
}

/// Complete game configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Grid and camera.
    pub grid: GridConfig,
    /// Tileset sheet width in tiles.
    pub tiles_per_row: u16,
    /// Seed for chunk selection and hazard pacing.
    pub seed: u64,
    /// Template manifest on disk. `None` uses the bundled templates.
    pub templates: Option<PathBuf>,
    /// Simulation ticks per second.
    pub tick_rate_hz: u32,
    /// Scrolling.
    pub scroll: ScrollConfig,
    /// Player.
    pub player: PlayerConfig,
    /// Hazards.
    pub hazards: HazardConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            tiles_per_row: 20,
            seed: 0x5C2A_9E25,
            templates: None,
            tick_rate_hz: 60,
            scroll: ScrollConfig::default(),
            player: PlayerConfig::default(),
            hazards: HazardConfig::default(),
        }
    }
}

impl GameConfig {
    /// Loads and validates a TOML config file.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Io`] if the file cannot be read,
    /// [`GameError::ConfigParse`] if it is not valid TOML and
    /// [`GameError::InvalidConfig`] if a value is out of range.
    pub fn load(path: impl AsRef<Path>) -> GameResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&text)?;
        tracing::info!(path = %path.as_ref().display(), seed = config.seed, "config loaded");
        Ok(config)
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::ConfigParse`] or [`GameError::InvalidConfig`].
    pub fn from_toml_str(text: &str) -> GameResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every value against its range.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::TileMap`] for grid settings and
    /// [`GameError::InvalidConfig`] for everything else.
    pub fn validate(&self) -> GameResult<()> {
        self.grid.validate()?;

        if self.tiles_per_row == 0 {
            return Err(invalid("tiles_per_row must be positive"));
        }
        if self.tick_rate_hz == 0 {
            return Err(invalid("tick_rate_hz must be positive"));
        }
        if !(self.scroll.speed.is_finite() && self.scroll.speed > 0.0) {
            return Err(invalid("scroll.speed must be positive"));
        }
        if !(self.scroll.acceleration.is_finite() && self.scroll.acceleration >= 0.0) {
            return Err(invalid("scroll.acceleration must not be negative"));
        }
        if self.scroll.max_speed.is_nan() || self.scroll.max_speed < self.scroll.speed {
            return Err(invalid("scroll.max_speed must be at least scroll.speed"));
        }
        if self.player.max_health == 0 || self.player.heal_threshold == 0 {
            return Err(invalid("player.max_health and player.heal_threshold must be positive"));
        }
        if !(self.hazards.projectile_speed.is_finite() && self.hazards.projectile_speed > 0.0) {
            return Err(invalid("hazards.projectile_speed must be positive"));
        }
        if self.hazards.min_interval_ms == 0 {
            return Err(invalid("hazards.min_interval_ms must be positive"));
        }
        Ok(())
    }

    /// Converts milliseconds to whole ticks at the configured rate.
    #[must_use]
    pub fn ticks_from_ms(&self, ms: u64) -> u64 {
        ticks_from_ms(ms, self.tick_rate_hz)
    }
}

/// Converts milliseconds to whole ticks (at least one).
#[must_use]
pub fn ticks_from_ms(ms: u64, tick_rate_hz: u32) -> u64 {
    (ms.saturating_mul(u64::from(tick_rate_hz)) / 1000).max(1)
}

fn invalid(reason: &str) -> GameError {
    GameError::InvalidConfig(reason.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        let config = GameConfig::from_toml_str("").unwrap();
        assert_eq!(config, GameConfig::default());
    }

    #[test]
    fn test_partial_tables_keep_defaults() {
        let config = GameConfig::from_toml_str(
            "seed = 7\n[grid]\ntween = 1.0\n[scroll]\nspeed = 3.0\nmax_speed = 6.0\n",
        )
        .unwrap();

        assert_eq!(config.seed, 7);
        assert_eq!(config.grid.tween, 1.0);
        assert_eq!(config.grid.tile_size, 30);
        assert_eq!(config.scroll.speed, 3.0);
        assert_eq!(config.scroll.acceleration, 0.0005);
        assert_eq!(config.player.max_health, 4);
    }

    #[test]
    fn test_out_of_range_values_rejected() {
        for doc in [
            "tick_rate_hz = 0",
            "tiles_per_row = 0",
            "[scroll]\nspeed = -1.0",
            "[scroll]\nspeed = 4.0\nmax_speed = 3.0",
            "[hazards]\nprojectile_speed = 0.0",
            "[player]\nmax_health = 0",
        ] {
            assert!(
                matches!(GameConfig::from_toml_str(doc), Err(GameError::InvalidConfig(_))),
                "{doc:?}"
            );
        }

        assert!(matches!(
            GameConfig::from_toml_str("[grid]\ntween = 2.0"),
            Err(GameError::TileMap(_))
        ));
    }

    #[test]
    fn test_malformed_toml_rejected() {
        assert!(matches!(
            GameConfig::from_toml_str("seed = \"many\""),
            Err(GameError::ConfigParse(_))
        ));
    }

    #[test]
    fn test_ticks_from_ms() {
        let config = GameConfig::default();
        assert_eq!(config.ticks_from_ms(1000), 60);
        assert_eq!(config.ticks_from_ms(750), 45);
        assert_eq!(config.ticks_from_ms(0), 1);
    }
}
