//! # SCRAPER
//!
//! A weather-driven endless runner, minus the window.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐      ┌─────────────┐      ┌──────────────┐
//! │ WeatherReport│─────>│    Level    │─────>│  EventBus    │──> HUD / audio
//! └──────────────┘      │  (tick)     │      └──────────────┘
//!                       │             │─────> RenderView + visible tiles
//! ┌──────────────┐      │             │
//! │  GameConfig  │─────>│             │<───── chunk worker (scraper_tilemap)
//! └──────────────┘      └─────────────┘
//! ```
//!
//! The level owns exactly one grid/generator pair; the chunk worker is the
//! only thread besides the caller's.
//!
//! ## Example
//!
//! ```rust,ignore
//! use scraper::{GameConfig, Level, PlayerInput, WeatherReport};
//!
//! let mut level = Level::new(GameConfig::default(), WeatherReport::sample()?)?;
//! loop {
//!     let report = level.tick(PlayerInput::default());
//!     if !report.alive {
//!         level.reload()?;
//!     }
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod entity;
pub mod error;
pub mod events;
pub mod hazard;
pub mod level;
pub mod player;
pub mod weather;

pub use config::{GameConfig, HazardConfig, PlayerConfig, ScrollConfig};
pub use entity::{EntityState, FellOffMap, Kinematics, MovementTuning};
pub use error::{GameError, GameResult};
pub use events::{EventBus, EventReceiver, EventSender, GameEvent, DEFAULT_EVENT_CAPACITY};
pub use hazard::{HazardSpawner, Projectile, PROJECTILE_SIZE};
pub use level::{Level, TickReport};
pub use player::{
    DamageOutcome, HealOutcome, ParryPhase, Player, PlayerInput, PlayerTick, CATCH_UP_BOOST,
    PLAYER_SIZE,
};
pub use weather::{WeatherReport, SAMPLE_REPORT};
