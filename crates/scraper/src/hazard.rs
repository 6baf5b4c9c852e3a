//! # Hazards
//!
//! Projectiles fly left at a fixed speed through the terrain and die once
//! the camera has scrolled past them.
//!
//! The spawner is a countdown on the simulation thread. Each interval is
//! `base + rand(0..2 * base)` milliseconds, where `base` comes from the
//! weather humidity: damp weather spawns slower, dry weather faster.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use scraper_tilemap::WorldGrid;

use crate::config::{ticks_from_ms, GameConfig};
use crate::entity::{EntityState, FellOffMap, Kinematics, MovementTuning};
use crate::weather::WeatherReport;

/// Projectile box edge in pixels.
pub const PROJECTILE_SIZE: u32 = 30;

/// A hazard flying right to left.
#[derive(Clone, Debug)]
pub struct Projectile {
    body: Kinematics,
    tuning: MovementTuning,
    dead: bool,
}

impl Projectile {
    /// Creates a projectile centred on `(x, y)`.
    #[must_use]
    pub fn new(x: f64, y: f64, speed: f64) -> Self {
        Self {
            body: Kinematics::new(x, y, PROJECTILE_SIZE, PROJECTILE_SIZE),
            tuning: MovementTuning::projectile(speed),
            dead: false,
        }
    }

    /// Moves one tick to the left. Returns why it died, if it did.
    pub fn update(&mut self, grid: &WorldGrid) -> Option<FellOffMap> {
        if self.dead {
            return None;
        }
        let x = self.body.x - self.tuning.max_speed;
        let result = self.body.set_position(x, self.body.y, grid);
        if result.is_err() {
            self.dead = true;
        }
        result.err()
    }

    /// Removes the projectile at the end of the tick.
    pub fn kill(&mut self) {
        self.dead = true;
    }

    /// True once killed or scrolled out.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.dead
    }

    /// Position and box.
    #[must_use]
    pub fn body(&self) -> &Kinematics {
        &self.body
    }

    /// Pixels per tick.
    #[must_use]
    pub fn speed(&self) -> f64 {
        self.tuning.max_speed
    }

    /// Animation state.
    #[must_use]
    pub fn state(&self) -> EntityState {
        if self.dead {
            EntityState::Dead
        } else {
            EntityState::Idle
        }
    }
}

/// Spawns projectiles a screen ahead of the player.
#[derive(Debug)]
pub struct HazardSpawner {
    rng: ChaCha8Rng,
    base_interval_ms: u64,
    tick_rate_hz: u32,
    projectile_speed: f64,
    countdown: u64,
    active: bool,
    spawned: u64,
}

impl HazardSpawner {
    /// Creates an inactive spawner paced by `weather`.
    #[must_use]
    pub fn new(config: &GameConfig, weather: &WeatherReport, seed: u64) -> Self {
        let hazards = &config.hazards;
        let base_interval_ms =
            weather.hazard_base_interval_ms(hazards.interval_per_humidity_ms, hazards.min_interval_ms);

        let mut spawner = Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            base_interval_ms,
            tick_rate_hz: config.tick_rate_hz,
            projectile_speed: hazards.projectile_speed,
            countdown: 0,
            active: false,
            spawned: 0,
        };
        spawner.countdown = spawner.next_interval_ticks();
        spawner
    }

    /// Starts spawning.
    pub fn activate(&mut self) {
        self.active = true;
    }

    /// Stops spawning and restarts the countdown.
    pub fn deactivate(&mut self) {
        self.active = false;
        self.countdown = self.next_interval_ticks();
    }

    /// True while spawning.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Draws the next spawn interval in milliseconds.
    pub fn next_interval_ms(&mut self) -> u64 {
        let base = self.base_interval_ms;
        base + self.rng.gen_range(0..base.saturating_mul(2).max(1))
    }

    fn next_interval_ticks(&mut self) -> u64 {
        let ms = self.next_interval_ms();
        ticks_from_ms(ms, self.tick_rate_hz)
    }

    /// Counts down one tick. Returns a projectile when the interval runs
    /// out.
    ///
    /// The projectile starts one viewport width right of `player_x`, on a
    /// random row of the grid.
    pub fn tick(&mut self, player_x: f64, grid: &WorldGrid) -> Option<Projectile> {
        if !self.active {
            return None;
        }

        self.countdown = self.countdown.saturating_sub(1);
        if self.countdown > 0 {
            return None;
        }
        self.countdown = self.next_interval_ticks();

        let ts = f64::from(grid.tile_size());
        let row = self.rng.gen_range(0..grid.rows().max(1));
        let x = player_x + f64::from(grid.config().viewport_width);
        let y = row as f64 * ts + ts / 2.0;
        self.spawned += 1;

        tracing::debug!(x, y, next_in_ticks = self.countdown, "hazard spawned");
        Some(Projectile::new(x, y, self.projectile_speed))
    }

    /// Humidity-derived base interval.
    #[must_use]
    pub fn base_interval_ms(&self) -> u64 {
        self.base_interval_ms
    }

    /// Ticks until the next spawn.
    #[must_use]
    pub fn countdown(&self) -> u64 {
        self.countdown
    }

    /// Projectiles spawned so far.
    #[must_use]
    pub fn spawned(&self) -> u64 {
        self.spawned
    }
}
