//! # Player
//!
//! The runner. Moves forward on its own, jumps and dives on the jump button,
//! parries projectiles on the parry button.
//!
//! ## Movement
//!
//! - Horizontal speed accelerates towards the scroll speed. While the player
//!   is in the left third of the screen the cap is raised by
//!   [`CATCH_UP_BOOST`] so it drifts back towards the middle.
//! - Jump on the ground starts a jump. Jump in the air starts a dive at
//!   fixed speed; landing out of a dive is a hard landing.
//!
//! ## Combat
//!
//! ```text
//!   Ready ──parry──> Active (parry_ticks) ──> Cooldown (parry_cooldown_ticks) ──> Ready
//! ```
//!
//! A hit while not flinching costs one health point and starts the flinch
//! window. A hit while parrying heals instead: every `heal_threshold`
//! parries below full health restore one point.

use scraper_tilemap::{resolve, Contacts, WorldGrid};

use crate::config::PlayerConfig;
use crate::entity::{EntityState, FellOffMap, Kinematics, MovementTuning};

/// Player box edge in pixels.
pub const PLAYER_SIZE: u32 = 30;

/// Speed cap multiplier while the player lags behind.
pub const CATCH_UP_BOOST: f64 = 1.3;

/// Buttons held this tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlayerInput {
    /// Jump (or dive, in the air).
    pub jump: bool,
    /// Open a parry window.
    pub parry: bool,
}

impl PlayerInput {
    /// Jump only.
    pub const JUMP: Self = Self {
        jump: true,
        parry: false,
    };

    /// Parry only.
    pub const PARRY: Self = Self {
        jump: false,
        parry: true,
    };
}

/// Parry cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ParryPhase {
    /// A parry can be started.
    #[default]
    Ready,
    /// Hits are parried.
    Active {
        /// Ticks left in the window.
        remaining: u32,
    },
    /// Waiting before the next parry.
    Cooldown {
        /// Ticks left.
        remaining: u32,
    },
}

/// Result of taking a hit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Health dropped, flinch window started.
    Hurt {
        /// Health left.
        health: u32,
    },
    /// Health reached zero.
    Lethal,
    /// Already flinching or dead.
    Ignored,
}

/// Result of a successful parry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HealOutcome {
    /// Health is full, nothing counted.
    FullHealth,
    /// Parry counted towards the next heal.
    Counted {
        /// Parries since the last heal.
        streak: u32,
    },
    /// One health point restored.
    Healed {
        /// Health after healing.
        health: u32,
    },
}

/// What happened to the player during one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PlayerTick {
    /// Tile contacts made while moving.
    pub contacts: Contacts,
    /// Set if the player died this tick.
    pub died: Option<FellOffMap>,
}

/// The runner.
#[derive(Clone, Debug)]
pub struct Player {
    body: Kinematics,
    tuning: MovementTuning,
    config: PlayerConfig,
    health: u32,
    heal_counter: u32,
    parry: ParryPhase,
    flinch_remaining: u32,
    state: EntityState,
    dead: bool,
}

impl Player {
    /// Creates a player at the configured spawn point.
    #[must_use]
    pub fn new(config: PlayerConfig, scroll_speed: f64) -> Self {
        Self {
            body: Kinematics::new(config.spawn_x, config.spawn_y, PLAYER_SIZE, PLAYER_SIZE),
            tuning: MovementTuning::player(scroll_speed),
            health: config.max_health,
            config,
            heal_counter: 0,
            parry: ParryPhase::Ready,
            flinch_remaining: 0,
            state: EntityState::Idle,
            dead: false,
        }
    }

    /// Puts the player back at the spawn point with full health.
    pub fn respawn(&mut self, scroll_speed: f64) {
        *self = Self::new(self.config.clone(), scroll_speed);
    }

    /// Advances the player one tick.
    ///
    /// Does nothing once dead.
    pub fn update(&mut self, input: PlayerInput, scroll_speed: f64, grid: &WorldGrid) -> PlayerTick {
        if self.dead {
            return PlayerTick::default();
        }

        if input.jump {
            self.body.flags.jumping = true;
        }
        self.next_velocity(scroll_speed, grid);

        let resolution = resolve(&self.body.body(), grid);
        self.body.adopt(&resolution);
        let died = self
            .body
            .set_position(resolution.x, resolution.y, grid)
            .err();
        if let Some(cause) = died {
            self.kill(&cause);
        }

        self.flinch_remaining = self.flinch_remaining.saturating_sub(1);
        self.advance_parry(input.parry);
        self.state = self.derive_state();

        PlayerTick {
            contacts: resolution.contacts,
            died,
        }
    }

    fn next_velocity(&mut self, scroll_speed: f64, grid: &WorldGrid) {
        let third = f64::from(grid.config().viewport_width) / 3.0;
        self.tuning.max_speed = if self.body.screen_x(grid.x()) < third {
            scroll_speed * CATCH_UP_BOOST
        } else {
            scroll_speed
        };

        let t = &self.tuning;
        let body = &mut self.body;

        body.dx = (body.dx + t.move_speed).min(t.max_speed);

        if body.flags.fast_falling {
            body.flags.jumping = false;
            body.flags.falling = false;
            body.dy = t.fast_fall_speed;
        }

        if body.flags.jumping && !body.flags.falling {
            body.flags.jumping = false;
            body.dy = t.jump_start;
            body.flags.falling = true;
        }

        if body.flags.falling {
            body.dy += t.fall_speed;

            // Jump pressed again mid-air.
            if body.flags.jumping {
                body.flags.jumping = false;
                body.flags.falling = false;
                body.flags.fast_falling = true;
            }

            body.dy = body.dy.min(t.max_fall_speed);
        }
    }

    fn advance_parry(&mut self, pressed: bool) {
        self.parry = match self.parry {
            ParryPhase::Active { remaining } if remaining > 1 => ParryPhase::Active {
                remaining: remaining - 1,
            },
            ParryPhase::Active { .. } => ParryPhase::Cooldown {
                remaining: self.config.parry_cooldown_ticks,
            },
            ParryPhase::Cooldown { remaining } if remaining > 1 => ParryPhase::Cooldown {
                remaining: remaining - 1,
            },
            ParryPhase::Cooldown { .. } | ParryPhase::Ready => ParryPhase::Ready,
        };

        if pressed && self.parry == ParryPhase::Ready && self.config.parry_ticks > 0 {
            self.parry = ParryPhase::Active {
                remaining: self.config.parry_ticks,
            };
        }
    }

    fn derive_state(&self) -> EntityState {
        if self.dead {
            EntityState::Dead
        } else if self.is_parrying() {
            EntityState::Parrying
        } else if self.is_flinching() {
            EntityState::Flinching
        } else if self.body.dy > 0.0 {
            EntityState::Falling
        } else if self.body.dy < 0.0 {
            EntityState::Jumping
        } else if self.body.dx != 0.0 {
            EntityState::Walking
        } else {
            EntityState::Idle
        }
    }

    /// Takes one hit.
    pub fn damage(&mut self) -> DamageOutcome {
        if self.dead || self.is_flinching() {
            return DamageOutcome::Ignored;
        }

        self.health = self.health.saturating_sub(1);
        if self.health == 0 {
            return DamageOutcome::Lethal;
        }
        self.flinch_remaining = self.config.flinch_ticks;
        self.state = EntityState::Flinching;
        DamageOutcome::Hurt {
            health: self.health,
        }
    }

    /// Rewards a parry. Closes the parry window without a cooldown.
    pub fn heal(&mut self) -> HealOutcome {
        self.parry = ParryPhase::Ready;

        if self.health >= self.config.max_health {
            return HealOutcome::FullHealth;
        }

        self.heal_counter += 1;
        if self.heal_counter >= self.config.heal_threshold {
            self.heal_counter %= self.config.heal_threshold;
            self.health += 1;
            return HealOutcome::Healed {
                health: self.health,
            };
        }
        HealOutcome::Counted {
            streak: self.heal_counter,
        }
    }

    /// Kills the player. The level stays frozen until reloaded.
    pub fn kill(&mut self, cause: &dyn std::fmt::Display) {
        if self.dead {
            return;
        }
        self.dead = true;
        self.parry = ParryPhase::Ready;
        self.flinch_remaining = 0;
        self.body.dx = 0.0;
        self.body.dy = 0.0;
        self.state = EntityState::Dead;
        tracing::info!(x = self.body.x, %cause, "player died");
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    /// Position, velocity and box.
    #[must_use]
    pub fn body(&self) -> &Kinematics {
        &self.body
    }

    /// Current movement constants.
    #[must_use]
    pub fn tuning(&self) -> &MovementTuning {
        &self.tuning
    }

    /// World x.
    #[must_use]
    pub fn x(&self) -> f64 {
        self.body.x
    }

    /// World y.
    #[must_use]
    pub fn y(&self) -> f64 {
        self.body.y
    }

    /// Pixels run since spawning.
    #[must_use]
    pub fn distance(&self) -> f64 {
        self.body.x - self.config.spawn_x
    }

    /// Current health.
    #[must_use]
    pub fn health(&self) -> u32 {
        self.health
    }

    /// Maximum health.
    #[must_use]
    pub fn max_health(&self) -> u32 {
        self.config.max_health
    }

    /// Parries counted towards the next heal.
    #[must_use]
    pub fn heal_counter(&self) -> u32 {
        self.heal_counter
    }

    /// Parry cycle.
    #[must_use]
    pub fn parry_phase(&self) -> ParryPhase {
        self.parry
    }

    /// True while the parry window is open.
    #[must_use]
    pub fn is_parrying(&self) -> bool {
        matches!(self.parry, ParryPhase::Active { .. })
    }

    /// True during the invulnerability window after a hit.
    #[must_use]
    pub fn is_flinching(&self) -> bool {
        self.flinch_remaining > 0
    }

    /// True once killed.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.dead
    }

    /// Animation state.
    #[must_use]
    pub fn state(&self) -> EntityState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper_tilemap::{ChunkGenerator, GridConfig, TemplateLibrary, TemplatePool, TileTemplate, Tileset};
    use std::sync::Arc;

    /// Flat ground on the bottom row, long enough to run on.
    fn flat_grid() -> WorldGrid {
        let flat = TileTemplate::from_columns("flat", 8, vec![vec![0, 0, 0, 0, 0, 0, 0, 21]; 8])
            .unwrap()
            .with_extendable(true)
            .in_pool(TemplatePool::Mixed);
        let library = Arc::new(TemplateLibrary::from_templates(8, vec![flat]).unwrap());
        let generator = Arc::new(ChunkGenerator::new(library, "Clear", 3));
        generator.seed(400).unwrap();
        WorldGrid::new(GridConfig::default(), Tileset::default(), generator).unwrap()
    }

    /// Empty sky: nothing to stand on.
    fn void_grid() -> WorldGrid {
        let sky = TileTemplate::from_columns("sky", 8, vec![vec![0; 8]; 8])
            .unwrap()
            .in_pool(TemplatePool::Mixed);
        let library = Arc::new(TemplateLibrary::from_templates(8, vec![sky]).unwrap());
        let generator = Arc::new(ChunkGenerator::new(library, "Clear", 3));
        WorldGrid::new(GridConfig::default(), Tileset::default(), generator).unwrap()
    }

    fn player() -> Player {
        Player::new(PlayerConfig::default(), 2.0)
    }

    #[test]
    fn test_runs_forward_on_flat_ground() {
        let grid = flat_grid();
        let mut player = player();

        for _ in 0..30 {
            let tick = player.update(PlayerInput::default(), 2.0, &grid);
            assert!(tick.died.is_none());
        }

        assert_eq!(player.y(), 195.0);
        assert!(player.x() > 150.0);
        assert_eq!(player.state(), EntityState::Walking);
        // Left third of the screen: boosted cap.
        assert!((player.body().dx - 2.6).abs() < 1e-9);
    }

    #[test]
    fn test_jump_and_land() {
        let grid = flat_grid();
        let mut player = player();
        player.update(PlayerInput::default(), 2.0, &grid);

        player.update(PlayerInput::JUMP, 2.0, &grid);
        assert!(player.y() < 195.0);
        assert_eq!(player.state(), EntityState::Jumping);

        let mut landed = false;
        for _ in 0..200 {
            let tick = player.update(PlayerInput::default(), 2.0, &grid);
            if tick.contacts.landed {
                landed = true;
                assert!(!tick.contacts.landed_hard);
                break;
            }
        }
        assert!(landed);
        assert_eq!(player.y(), 195.0);
        assert!(!player.body().flags.falling);
    }

    #[test]
    fn test_dive_lands_hard() {
        let grid = flat_grid();
        let mut player = player();

        player.update(PlayerInput::JUMP, 2.0, &grid);
        for _ in 0..5 {
            player.update(PlayerInput::default(), 2.0, &grid);
        }
        player.update(PlayerInput::JUMP, 2.0, &grid);
        assert!(player.body().flags.fast_falling);

        let mut hard = false;
        for _ in 0..20 {
            let tick = player.update(PlayerInput::default(), 2.0, &grid);
            if tick.contacts.landed_hard {
                hard = true;
                break;
            }
        }
        assert!(hard);
        assert_eq!(player.y(), 195.0);
        assert!(!player.body().flags.fast_falling);
    }

    #[test]
    fn test_falls_off_map() {
        let grid = void_grid();
        let mut player = player();

        let mut cause = None;
        for _ in 0..200 {
            cause = player.update(PlayerInput::default(), 2.0, &grid).died;
            if cause.is_some() {
                break;
            }
        }

        assert!(matches!(cause, Some(FellOffMap::BelowMap { .. })));
        assert!(player.is_dead());
        assert_eq!(player.state(), EntityState::Dead);

        let x = player.x();
        player.update(PlayerInput::default(), 2.0, &grid);
        assert_eq!(player.x(), x);
    }

    #[test]
    fn test_damage_and_flinch() {
        let grid = flat_grid();
        let mut player = player();

        assert_eq!(player.damage(), DamageOutcome::Hurt { health: 3 });
        assert!(player.is_flinching());
        assert_eq!(player.damage(), DamageOutcome::Ignored);

        for _ in 0..60 {
            player.update(PlayerInput::default(), 2.0, &grid);
        }
        assert!(!player.is_flinching());

        assert_eq!(player.damage(), DamageOutcome::Hurt { health: 2 });
    }

    #[test]
    fn test_lethal_damage() {
        let config = PlayerConfig {
            max_health: 1,
            ..PlayerConfig::default()
        };
        let mut player = Player::new(config, 2.0);

        assert_eq!(player.damage(), DamageOutcome::Lethal);
        assert_eq!(player.health(), 0);
    }

    #[test]
    fn test_parry_cycle() {
        let grid = flat_grid();
        let mut player = player();

        player.update(PlayerInput::PARRY, 2.0, &grid);
        assert_eq!(player.parry_phase(), ParryPhase::Active { remaining: 20 });
        assert_eq!(player.state(), EntityState::Parrying);

        for _ in 0..20 {
            player.update(PlayerInput::PARRY, 2.0, &grid);
        }
        assert_eq!(player.parry_phase(), ParryPhase::Cooldown { remaining: 40 });

        for _ in 0..40 {
            player.update(PlayerInput::default(), 2.0, &grid);
        }
        assert_eq!(player.parry_phase(), ParryPhase::Ready);

        player.update(PlayerInput::PARRY, 2.0, &grid);
        assert!(player.is_parrying());
    }

    #[test]
    fn test_heal_every_threshold_parries() {
        let mut player = player();
        assert_eq!(player.heal(), HealOutcome::FullHealth);
        assert_eq!(player.heal_counter(), 0);

        player.damage();
        for streak in 1..5 {
            assert_eq!(player.heal(), HealOutcome::Counted { streak });
        }
        assert_eq!(player.heal(), HealOutcome::Healed { health: 4 });
        assert_eq!(player.heal_counter(), 0);
    }

    #[test]
    fn test_respawn_restores_player() {
        let grid = void_grid();
        let mut player = player();
        player.damage();
        for _ in 0..200 {
            player.update(PlayerInput::default(), 2.0, &grid);
        }
        assert!(player.is_dead());

        player.respawn(2.0);
        assert!(!player.is_dead());
        assert_eq!(player.health(), 4);
        assert_eq!((player.x(), player.y()), (100.0, 195.0));
        assert_eq!(player.distance(), 0.0);
    }
}
