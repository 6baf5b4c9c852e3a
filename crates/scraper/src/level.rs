//! # Level
//!
//! Owns one endless level: the template library, one grid/generator pair
//! with its worker thread, the player, the hazards and the camera.
//!
//! ## Tick
//!
//! ```text
//! scroll speed += acceleration
//! player.update      (tentative velocity → resolve → set_position)
//! grid.update        (low-water mark → generator workload)
//! camera target -= scroll speed, grid.set_position (tweened)
//! spawner.tick       (maybe a new projectile)
//! hazards            (move, contact: parry → heal, otherwise damage)
//! ```
//!
//! A dead player freezes the level until [`Level::reload`], which builds a
//! fresh grid/generator pair so memory stays bounded across runs.

use std::sync::Arc;

use scraper_tilemap::{
    ChunkGenerator, GeneratorWorker, RenderView, TemplateLibrary, Tileset, VisibleTile, WorldGrid,
};

use crate::config::GameConfig;
use crate::error::GameResult;
use crate::events::{EventBus, EventReceiver, EventSender, GameEvent};
use crate::hazard::{HazardSpawner, Projectile};
use crate::player::{DamageOutcome, HealOutcome, Player, PlayerInput};
use crate::weather::WeatherReport;

/// Summary of one tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TickReport {
    /// Tick number, starting at 1.
    pub tick: u64,
    /// The player is alive after this tick.
    pub alive: bool,
    /// Projectiles in flight.
    pub hazards: usize,
    /// Generated columns.
    pub columns: usize,
    /// The camera is about to outrun the generator.
    pub loading: bool,
}

/// One running level.
pub struct Level {
    config: GameConfig,
    weather: WeatherReport,
    library: Arc<TemplateLibrary>,
    tileset: Tileset,
    grid: WorldGrid,
    /// `None` only if a reload failed to start the new worker.
    worker: Option<GeneratorWorker>,
    player: Player,
    hazards: Vec<Projectile>,
    spawner: HazardSpawner,
    scroll_speed: f64,
    camera_target_x: f64,
    tick: u64,
    reloads: u64,
    bus: EventBus,
    events: EventSender,
}

impl Level {
    /// Builds a level from the configured template manifest, or the bundled
    /// templates if none is configured.
    ///
    /// # Errors
    ///
    /// Returns [`crate::GameError`] if the config is invalid, the templates
    /// cannot be loaded or the worker thread cannot be spawned.
    pub fn new(config: GameConfig, weather: WeatherReport) -> GameResult<Self> {
        config.validate()?;
        let rows = config.grid.rows();
        let library = match &config.templates {
            Some(path) => TemplateLibrary::load_manifest(path, rows)?,
            None => TemplateLibrary::builtin(rows)?,
        };
        Self::with_library(config, weather, Arc::new(library))
    }

    /// Builds a level over an already loaded library.
    ///
    /// # Errors
    ///
    /// See [`Level::new`].
    pub fn with_library(
        config: GameConfig,
        weather: WeatherReport,
        library: Arc<TemplateLibrary>,
    ) -> GameResult<Self> {
        config.validate()?;
        let tileset = Tileset::new(config.tiles_per_row)?;
        let grid = build_grid(&config, &weather, &library, &tileset, config.seed)?;
        let worker = start_worker(&grid)?;

        let mut spawner = HazardSpawner::new(&config, &weather, config.seed.rotate_left(32));
        if config.hazards.enabled {
            spawner.activate();
        }

        let bus = EventBus::default();
        let events = bus.sender();
        let scroll_speed = config.scroll.speed;

        tracing::info!(
            condition = %weather.condition,
            pool = %weather.pool(),
            hazard_interval_ms = spawner.base_interval_ms(),
            "level started"
        );

        Ok(Self {
            player: Player::new(config.player.clone(), scroll_speed),
            config,
            weather,
            library,
            tileset,
            grid,
            worker: Some(worker),
            hazards: Vec::new(),
            spawner,
            scroll_speed,
            camera_target_x: 0.0,
            tick: 0,
            reloads: 0,
            bus,
            events,
        })
    }

    /// Advances the level one tick.
    pub fn tick(&mut self, input: PlayerInput) -> TickReport {
        self.tick += 1;
        if self.player.is_dead() {
            return self.report();
        }

        self.scroll_speed =
            (self.scroll_speed + self.config.scroll.acceleration).min(self.config.scroll.max_speed);

        let outcome = self.player.update(input, self.scroll_speed, &self.grid);
        if outcome.contacts.landed_hard {
            self.events.send(GameEvent::LandedHard { x: self.player.x() });
        }
        if outcome.died.is_some() {
            self.on_player_death();
            return self.report();
        }

        self.grid.update();
        self.scroll_camera();

        if let Some(projectile) = self.spawner.tick(self.player.x(), &self.grid) {
            let body = projectile.body();
            self.events.send(GameEvent::HazardSpawned { x: body.x, y: body.y });
            self.hazards.push(projectile);
        }
        self.update_hazards();

        self.report()
    }

    fn scroll_camera(&mut self) {
        let min_x = self.grid.bounds().min_x;
        self.camera_target_x = (self.camera_target_x - self.scroll_speed).max(min_x);
        let target_y = f64::from(self.config.grid.viewport_height) / 2.0 - self.player.y();
        self.grid.set_position(self.camera_target_x, target_y);
    }

    fn update_hazards(&mut self) {
        let mut lethal = false;

        for hazard in &mut self.hazards {
            if hazard.update(&self.grid).is_some() {
                let body = hazard.body();
                self.events.send(GameEvent::HazardDestroyed {
                    x: body.x,
                    y: body.y,
                    parried: false,
                });
                continue;
            }
            if lethal || hazard.is_dead() || self.player.is_flinching() {
                continue;
            }
            if !hazard.body().intersects(self.player.body()) {
                continue;
            }

            if self.player.is_parrying() {
                hazard.kill();
                let body = hazard.body();
                self.events.send(GameEvent::HazardDestroyed {
                    x: body.x,
                    y: body.y,
                    parried: true,
                });
                let event = match self.player.heal() {
                    HealOutcome::Healed { health } => Some(GameEvent::PlayerHealed { health }),
                    HealOutcome::Counted { streak } => Some(GameEvent::Parried { streak }),
                    HealOutcome::FullHealth => None,
                };
                if let Some(event) = event {
                    self.events.send(event);
                }
                continue;
            }

            match self.player.damage() {
                DamageOutcome::Hurt { health } => {
                    self.events.send(GameEvent::PlayerDamaged { health });
                }
                DamageOutcome::Lethal => {
                    self.events.send(GameEvent::PlayerDamaged { health: 0 });
                    self.player.kill(&"lethal damage");
                    lethal = true;
                }
                DamageOutcome::Ignored => {}
            }
        }

        self.hazards.retain(|hazard| !hazard.is_dead());
        if lethal {
            self.on_player_death();
        }
    }

    fn on_player_death(&mut self) {
        self.spawner.deactivate();
        self.events.send(GameEvent::PlayerDied {
            distance: self.player.distance(),
            tick: self.tick,
        });
    }

    /// Starts over on a freshly generated level.
    ///
    /// The old worker is stopped and joined before the new one starts, so
    /// the level never has two.
    ///
    /// # Errors
    ///
    /// Returns [`crate::GameError`] if the new grid cannot be built or its
    /// worker cannot be spawned. The level is then left without a worker.
    pub fn reload(&mut self) -> GameResult<()> {
        let seed = self.config.seed.wrapping_add(self.reloads + 1);
        if let Some(old) = self.worker.take() {
            old.stop();
        }

        self.grid = build_grid(&self.config, &self.weather, &self.library, &self.tileset, seed)?;
        self.worker = Some(start_worker(&self.grid)?);
        self.reloads += 1;

        self.hazards.clear();
        self.scroll_speed = self.config.scroll.speed;
        self.camera_target_x = 0.0;
        self.player.respawn(self.scroll_speed);
        self.spawner.deactivate();
        if self.config.hazards.enabled {
            self.spawner.activate();
        }

        self.events.send(GameEvent::LevelReloaded);
        tracing::info!(reloads = self.reloads, seed, "level reloaded");
        Ok(())
    }

    fn report(&self) -> TickReport {
        TickReport {
            tick: self.tick,
            alive: !self.player.is_dead(),
            hazards: self.hazards.len(),
            columns: self.grid.len(),
            loading: self.grid.is_loading(),
        }
    }

    // ========================================================================
    // COLLABORATORS
    // ========================================================================

    /// Returns a handle on the event stream.
    #[must_use]
    pub fn events(&self) -> EventReceiver {
        self.bus.receiver()
    }

    /// Camera and visible window for the renderer.
    #[must_use]
    pub fn render_view(&self) -> RenderView {
        self.grid.render_view()
    }

    /// Tiles to draw this frame.
    pub fn visible_tiles(&self) -> impl Iterator<Item = VisibleTile> + '_ {
        self.grid.visible_tiles()
    }

    /// True while the camera is about to outrun the generator.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.grid.is_loading()
    }

    /// True if a full render window of terrain exists ahead of the camera.
    ///
    /// Drivers that run faster than real time (tests, the headless binary)
    /// wait on this before ticking.
    #[must_use]
    pub fn terrain_ready(&self) -> bool {
        self.grid.columns_ahead() >= self.grid.render_view().cols_to_render
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    /// The world grid.
    #[must_use]
    pub fn grid(&self) -> &WorldGrid {
        &self.grid
    }

    /// The player.
    #[must_use]
    pub fn player(&self) -> &Player {
        &self.player
    }

    /// Projectiles in flight.
    #[must_use]
    pub fn hazards(&self) -> &[Projectile] {
        &self.hazards
    }

    /// Adds a projectile, e.g. a scripted one.
    pub fn spawn_hazard(&mut self, projectile: Projectile) {
        self.hazards.push(projectile);
    }

    /// The hazard spawner.
    #[must_use]
    pub fn spawner(&self) -> &HazardSpawner {
        &self.spawner
    }

    /// The generator worker of the current grid.
    #[must_use]
    pub fn worker(&self) -> Option<&GeneratorWorker> {
        self.worker.as_ref()
    }

    /// The generator of the current grid.
    #[must_use]
    pub fn generator(&self) -> &Arc<ChunkGenerator> {
        self.grid.generator()
    }

    /// The template library.
    #[must_use]
    pub fn library(&self) -> &Arc<TemplateLibrary> {
        &self.library
    }

    /// The weather the level was built for.
    #[must_use]
    pub fn weather(&self) -> &WeatherReport {
        &self.weather
    }

    /// The level's configuration.
    #[must_use]
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Current scroll speed in pixels per tick.
    #[must_use]
    pub fn scroll_speed(&self) -> f64 {
        self.scroll_speed
    }

    /// Ticks since the level was created.
    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Times the level was reloaded.
    #[must_use]
    pub fn reloads(&self) -> u64 {
        self.reloads
    }
}

/// Builds a seeded grid over a new generator.
fn build_grid(
    config: &GameConfig,
    weather: &WeatherReport,
    library: &Arc<TemplateLibrary>,
    tileset: &Tileset,
    seed: u64,
) -> GameResult<WorldGrid> {
    let generator = Arc::new(ChunkGenerator::new(Arc::clone(library), &weather.condition, seed));
    Ok(WorldGrid::new(config.grid.clone(), tileset.clone(), generator)?)
}

/// Spawns and activates the worker for `grid`'s generator.
fn start_worker(grid: &WorldGrid) -> GameResult<GeneratorWorker> {
    let worker = GeneratorWorker::spawn(Arc::clone(grid.generator()))?;
    worker.generator().activate();
    Ok(worker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityState;
    use scraper_tilemap::{TemplatePool, TileTemplate};

    fn flat_library() -> Arc<TemplateLibrary> {
        let flat = TileTemplate::from_columns("flat", 8, vec![vec![0, 0, 0, 0, 0, 0, 0, 21]; 4])
            .unwrap()
            .with_extendable(true)
            .in_pool(TemplatePool::Mixed);
        Arc::new(TemplateLibrary::from_templates(8, vec![flat]).unwrap())
    }

    fn quiet_config() -> GameConfig {
        let mut config = GameConfig::default();
        config.hazards.enabled = false;
        config
    }

    #[test]
    fn test_player_runs_with_the_camera() {
        let mut level =
            Level::with_library(quiet_config(), WeatherReport::default(), flat_library()).unwrap();

        for _ in 0..600 {
            while !level.terrain_ready() {
                std::thread::yield_now();
            }
            assert!(level.tick(PlayerInput::default()).alive);
        }

        let player = level.player();
        assert_eq!(player.y(), 195.0);
        assert_eq!(player.state(), EntityState::Walking);
        assert!(player.distance() > 1000.0);
        assert!(level.grid().x() < -1000.0);
        assert!(level.scroll_speed() > 2.0);

        let screen_x = player.body().screen_x(level.grid().x());
        assert!((0.0..600.0).contains(&screen_x), "{screen_x}");
    }

    #[test]
    fn test_unparried_hit_damages() {
        let mut level =
            Level::with_library(quiet_config(), WeatherReport::default(), flat_library()).unwrap();
        let events = level.events();

        level.spawn_hazard(Projectile::new(130.0, 195.0, 2.0));
        level.tick(PlayerInput::default());

        assert_eq!(level.player().health(), 3);
        assert!(level.player().is_flinching());
        assert!(events.drain().contains(&GameEvent::PlayerDamaged { health: 3 }));
        assert_eq!(level.hazards().len(), 1);
    }

    #[test]
    fn test_parry_destroys_hazard() {
        let mut level =
            Level::with_library(quiet_config(), WeatherReport::default(), flat_library()).unwrap();
        let events = level.events();

        level.tick(PlayerInput::PARRY);
        level.spawn_hazard(Projectile::new(130.0, 195.0, 2.0));
        level.tick(PlayerInput::default());

        assert_eq!(level.player().health(), 4);
        assert!(level.hazards().is_empty());
        assert!(events
            .drain()
            .iter()
            .any(|e| matches!(e, GameEvent::HazardDestroyed { parried: true, .. })));
    }

    #[test]
    fn test_lethal_hits_freeze_until_reload() {
        let mut config = quiet_config();
        config.player.max_health = 1;
        let mut level = Level::with_library(config, WeatherReport::default(), flat_library()).unwrap();
        let events = level.events();

        level.spawn_hazard(Projectile::new(130.0, 195.0, 2.0));
        let report = level.tick(PlayerInput::default());
        assert!(!report.alive);
        assert!(events
            .drain()
            .iter()
            .any(|e| matches!(e, GameEvent::PlayerDied { .. })));

        let x = level.player().x();
        level.tick(PlayerInput::JUMP);
        assert_eq!(level.player().x(), x);

        let old_generator = Arc::clone(level.generator());
        level.reload().unwrap();
        assert!(!old_generator.is_active());
        assert!(!Arc::ptr_eq(&old_generator, level.generator()));
        assert!(level.worker().is_some_and(GeneratorWorker::is_running));
        assert!(level.tick(PlayerInput::default()).alive);
        assert_eq!(level.player().health(), 1);
        assert_eq!(level.reloads(), 1);
        assert!(events.drain().contains(&GameEvent::LevelReloaded));
    }

    #[test]
    fn test_reload_retires_the_old_worker_first() {
        let mut level =
            Level::with_library(quiet_config(), WeatherReport::default(), flat_library()).unwrap();

        // Leave the old generator a large backlog to be working on.
        let old_generator = Arc::clone(level.generator());
        old_generator.set_workload(100).unwrap();
        old_generator.request_run();

        level.reload().unwrap();

        // Joined: no thread holds the old generator and it grows no more.
        assert_eq!(Arc::strong_count(&old_generator), 1);
        assert!(!old_generator.is_active());
        let frozen = old_generator.columns().len();
        std::thread::sleep(std::time::Duration::from_millis(20));
        assert_eq!(old_generator.columns().len(), frozen);

        let worker = level.worker().unwrap();
        assert!(worker.is_running());
        assert!(Arc::ptr_eq(worker.generator(), level.generator()));
        assert!(level.generator().is_active());
    }

    #[test]
    fn test_hazards_spawn_when_enabled() {
        let mut config = GameConfig::default();
        config.hazards.enabled = true;
        let weather = WeatherReport {
            humidity: 0.0,
            ..WeatherReport::default()
        };
        let mut level = Level::with_library(config, weather, flat_library()).unwrap();

        for _ in 0..60 {
            level.tick(PlayerInput::PARRY);
        }
        assert!(level.spawner().spawned() >= 1);
    }

    #[test]
    fn test_manifest_path_must_exist() {
        let config = GameConfig {
            templates: Some("/nonexistent/templates.toml".into()),
            ..GameConfig::default()
        };
        assert!(Level::new(config, WeatherReport::default()).is_err());
    }
}
