//! # Entity Movement
//!
//! Shared plumbing for everything that moves through the tile map.
//!
//! Every tick an entity:
//! 1. computes a tentative velocity from its [`MovementTuning`],
//! 2. hands its [`Kinematics::body`] to [`scraper_tilemap::resolve`],
//! 3. adopts the corrected velocity and flags,
//! 4. assigns the corrected position with [`Kinematics::set_position`],
//!    which refuses positions off the map with a [`FellOffMap`].
//!
//! `FellOffMap` never escapes a tick: the owning entity turns it into its
//! own death transition.

use scraper_tilemap::{Body, CollisionScratch, MotionFlags, Resolution, WorldGrid};
use thiserror::Error;

/// Velocity constants of one entity kind, in pixels per tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MovementTuning {
    /// Horizontal acceleration.
    pub move_speed: f64,
    /// Horizontal speed cap.
    pub max_speed: f64,
    /// Horizontal deceleration.
    pub stop_speed: f64,
    /// Gravity.
    pub fall_speed: f64,
    /// Terminal falling speed.
    pub max_fall_speed: f64,
    /// Dive speed.
    pub fast_fall_speed: f64,
    /// Initial jump velocity (negative is up).
    pub jump_start: f64,
    /// Extra gravity once the jump button is released.
    pub stop_jump_speed: f64,
}

impl MovementTuning {
    /// Player constants. `max_speed` follows the scroll speed every tick.
    #[must_use]
    pub const fn player(scroll_speed: f64) -> Self {
        Self {
            move_speed: 0.4,
            max_speed: scroll_speed,
            stop_speed: 0.4,
            fall_speed: 0.15,
            max_fall_speed: 4.0,
            fast_fall_speed: 8.0,
            jump_start: -5.2,
            stop_jump_speed: 0.3,
        }
    }

    /// Straight-line flier: constant `speed`, no gravity.
    #[must_use]
    pub const fn projectile(speed: f64) -> Self {
        Self {
            move_speed: speed,
            max_speed: speed,
            stop_speed: 0.0,
            fall_speed: 0.0,
            max_fall_speed: 0.0,
            fast_fall_speed: 0.0,
            jump_start: 0.0,
            stop_jump_speed: 0.0,
        }
    }
}

/// A position assignment that would put the entity off the map.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum FellOffMap {
    /// Below the bottom of the world.
    #[error("fell below the map at y={y} (map height {map_height})")]
    BelowMap {
        /// Rejected y.
        y: f64,
        /// World height in pixels.
        map_height: f64,
    },

    /// Left of the camera.
    #[error("scrolled past at x={x} (camera x {camera_x})")]
    ScrolledPast {
        /// Rejected x.
        x: f64,
        /// Camera x at the time.
        camera_x: f64,
    },
}

/// Animation-level state derived after movement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum EntityState {
    /// Not moving.
    #[default]
    Idle,
    /// Running on the ground.
    Walking,
    /// Moving up.
    Jumping,
    /// Moving down.
    Falling,
    /// Invulnerable after a hit.
    Flinching,
    /// Parry window open.
    Parrying,
    /// Dead.
    Dead,
}

/// Position, velocity, box and airborne state of one entity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Kinematics {
    /// Centre x in world pixels.
    pub x: f64,
    /// Centre y in world pixels.
    pub y: f64,
    /// Horizontal velocity.
    pub dx: f64,
    /// Vertical velocity.
    pub dy: f64,
    /// Sprite width.
    pub width: u32,
    /// Sprite height.
    pub height: u32,
    /// Collision box width.
    pub collision_width: u32,
    /// Collision box height.
    pub collision_height: u32,
    /// Airborne state.
    pub flags: MotionFlags,
    /// Last resolver working state.
    pub scratch: CollisionScratch,
}

impl Kinematics {
    /// Creates an entity at rest with a collision box the size of its
    /// sprite.
    #[must_use]
    pub fn new(x: f64, y: f64, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            dx: 0.0,
            dy: 0.0,
            width,
            height,
            collision_width: width,
            collision_height: height,
            flags: MotionFlags::default(),
            scratch: CollisionScratch::default(),
        }
    }

    /// Returns the resolver input for the current tentative velocity.
    #[must_use]
    pub fn body(&self) -> Body {
        Body {
            x: self.x,
            y: self.y,
            dx: self.dx,
            dy: self.dy,
            width: self.collision_width,
            height: self.collision_height,
            flags: self.flags,
        }
    }

    /// Adopts the resolver's corrected velocity and flags. The position is
    /// assigned separately with [`Self::set_position`].
    pub fn adopt(&mut self, resolution: &Resolution) {
        self.dx = resolution.dx;
        self.dy = resolution.dy;
        self.flags = resolution.flags;
        self.scratch = resolution.scratch;
    }

    /// Moves the entity, unless the target is below the map or left of the
    /// camera.
    ///
    /// # Errors
    ///
    /// Returns [`FellOffMap`] and leaves the position unchanged.
    pub fn set_position(&mut self, x: f64, y: f64, grid: &WorldGrid) -> Result<(), FellOffMap> {
        let map_height = grid.height() as f64;
        if y > map_height {
            return Err(FellOffMap::BelowMap { y, map_height });
        }
        let camera_x = grid.x();
        if x + camera_x + f64::from(self.width) < 0.0 {
            return Err(FellOffMap::ScrolledPast { x, camera_x });
        }

        self.x = x;
        self.y = y;
        Ok(())
    }

    /// Left edge of the sprite on screen.
    #[must_use]
    pub fn screen_x(&self, camera_x: f64) -> f64 {
        self.x + camera_x - f64::from(self.width / 2)
    }

    /// Top edge of the sprite on screen.
    #[must_use]
    pub fn screen_y(&self, camera_y: f64) -> f64 {
        self.y + camera_y - f64::from(self.height / 2)
    }

    /// True if the collision boxes overlap.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        let (l1, t1, r1, b1) = self.collision_rect();
        let (l2, t2, r2, b2) = other.collision_rect();
        l1 < r2 && l2 < r1 && t1 < b2 && t2 < b1
    }

    fn collision_rect(&self) -> (f64, f64, f64, f64) {
        let left = self.x - f64::from(self.collision_width / 2);
        let top = self.y - f64::from(self.collision_height / 2);
        (
            left,
            top,
            left + f64::from(self.collision_width),
            top + f64::from(self.collision_height),
        )
    }

    /// True if any part of the sprite is inside the viewport.
    #[must_use]
    pub fn on_screen(&self, camera_x: f64, camera_y: f64, viewport_w: u32, viewport_h: u32) -> bool {
        let (w, h) = (f64::from(self.width), f64::from(self.height));
        let (sx, sy) = (self.x + camera_x, self.y + camera_y);
        sx + w >= 0.0
            && sx - w <= f64::from(viewport_w)
            && sy + h >= 0.0
            && sy - h <= f64::from(viewport_h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper_tilemap::{ChunkGenerator, GridConfig, TemplateLibrary, Tileset};
    use std::sync::Arc;

    fn grid() -> WorldGrid {
        let library = Arc::new(TemplateLibrary::builtin(8).unwrap());
        let generator = Arc::new(ChunkGenerator::new(library, "Clear", 1));
        let mut grid = WorldGrid::new(GridConfig::default(), Tileset::default(), generator).unwrap();
        grid.set_tween(1.0).unwrap();
        grid
    }

    #[test]
    fn test_set_position_inside_map() {
        let grid = grid();
        let mut entity = Kinematics::new(100.0, 195.0, 30, 30);

        assert!(entity.set_position(120.0, 240.0, &grid).is_ok());
        assert_eq!((entity.x, entity.y), (120.0, 240.0));
    }

    #[test]
    fn test_below_map_rejected() {
        let grid = grid();
        let mut entity = Kinematics::new(100.0, 195.0, 30, 30);

        let err = entity.set_position(100.0, 240.5, &grid).unwrap_err();
        assert!(matches!(err, FellOffMap::BelowMap { .. }));
        assert_eq!(entity.y, 195.0);
    }

    #[test]
    fn test_scrolled_past_rejected() {
        let mut grid = grid();
        grid.set_position(-300.0, 0.0);
        let mut entity = Kinematics::new(300.0, 195.0, 30, 30);

        assert!(entity.set_position(271.0, 195.0, &grid).is_ok());
        let err = entity.set_position(269.0, 195.0, &grid).unwrap_err();
        assert!(matches!(err, FellOffMap::ScrolledPast { .. }));
        assert_eq!(entity.x, 271.0);
    }

    #[test]
    fn test_intersects() {
        let a = Kinematics::new(100.0, 100.0, 30, 30);
        let touching = Kinematics::new(130.0, 100.0, 30, 30);
        let overlapping = Kinematics::new(129.0, 110.0, 30, 30);

        assert!(!a.intersects(&touching));
        assert!(a.intersects(&overlapping));
        assert!(overlapping.intersects(&a));
    }

    #[test]
    fn test_on_screen() {
        let entity = Kinematics::new(700.0, 100.0, 30, 30);
        assert!(!entity.on_screen(0.0, 0.0, 600, 240));
        assert!(entity.on_screen(-100.0, 0.0, 600, 240));
    }
}
