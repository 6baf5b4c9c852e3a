//! # Tile Collision
//!
//! Corner-sampling resolver shared by every moving entity.
//!
//! An entity's collision box is centred on `(x, y)`. Each tick the resolver
//! samples the four box corners at the tentative destination, one axis at a
//! time:
//!
//! 1. Vertical, corners at `(x, y + dy)`. Blocked above stops a jump under
//!    the ceiling, blocked below lands the entity on the floor.
//! 2. Horizontal, corners at `(x + dx, y)`. Blocked on the leading side
//!    stops the entity against the wall.
//! 3. Cliff check: a grounded entity with nothing one unit below its feet
//!    starts falling.
//!
//! The order matters and is part of the contract.
//!
//! Tile indices use floor division so boxes hanging off the left or top
//! edge resolve to negative indices, which are off-map and passable.

use crate::tile::TileKind;

/// Read-only tile access the resolver needs.
pub trait TileQuery {
    /// Edge of a square tile in pixels.
    fn tile_size(&self) -> u32;

    /// Collision kind at `(row, col)`. Off-map cells must be passable.
    fn query_tile_type(&self, row: i32, col: i32) -> TileKind;
}

/// Airborne state carried between ticks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MotionFlags {
    /// Jump requested or in progress.
    pub jumping: bool,
    /// Airborne.
    pub falling: bool,
    /// Diving towards the ground.
    pub fast_falling: bool,
}

/// The moving box handed to [`resolve`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Body {
    /// Centre x.
    pub x: f64,
    /// Centre y.
    pub y: f64,
    /// Tentative horizontal velocity.
    pub dx: f64,
    /// Tentative vertical velocity.
    pub dy: f64,
    /// Collision box width.
    pub width: u32,
    /// Collision box height.
    pub height: u32,
    /// Airborne state.
    pub flags: MotionFlags,
}

/// Blocked state of the four box corners.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Corners {
    /// Top-left corner blocked.
    pub top_left: bool,
    /// Top-right corner blocked.
    pub top_right: bool,
    /// Bottom-left corner blocked.
    pub bottom_left: bool,
    /// Bottom-right corner blocked.
    pub bottom_right: bool,
}

/// Tile indices a box at some position covers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CornerTiles {
    /// Leftmost column.
    pub left: i32,
    /// Rightmost column.
    pub right: i32,
    /// Topmost row.
    pub top: i32,
    /// Bottommost row.
    pub bottom: i32,
}

impl CornerTiles {
    /// Computes the covered tiles of a `width` x `height` box centred on
    /// `(x, y)`.
    #[must_use]
    pub fn at(x: f64, y: f64, width: u32, height: u32, tile_size: u32) -> Self {
        let ts = f64::from(tile_size);
        let half_w = f64::from(width / 2);
        let half_h = f64::from(height / 2);
        let index = |v: f64| (v / ts).floor() as i32;

        Self {
            left: index(x - half_w),
            right: index(x + half_w - 1.0),
            top: index(y - half_h),
            bottom: index(y + half_h - 1.0),
        }
    }

    /// Samples the blocked state of the four corners.
    #[must_use]
    pub fn sample(&self, tiles: &impl TileQuery) -> Corners {
        Corners {
            top_left: tiles.query_tile_type(self.top, self.left).is_blocked(),
            top_right: tiles.query_tile_type(self.top, self.right).is_blocked(),
            bottom_left: tiles.query_tile_type(self.bottom, self.left).is_blocked(),
            bottom_right: tiles.query_tile_type(self.bottom, self.right).is_blocked(),
        }
    }
}

/// Per-tick working state. Recomputed every tick, never persisted.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CollisionScratch {
    /// Untouched destination x.
    pub x_dest: f64,
    /// Untouched destination y.
    pub y_dest: f64,
    /// Corrected x.
    pub x_temp: f64,
    /// Corrected y.
    pub y_temp: f64,
    /// Corners of the last sample taken.
    pub corners: Corners,
    /// Row containing the entity centre.
    pub current_row: i32,
    /// Column containing the entity centre.
    pub current_col: i32,
}

/// Which sides made contact this tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Contacts {
    /// Hit a ceiling.
    pub ceiling: bool,
    /// Touched a floor while moving down.
    pub floor: bool,
    /// Hit a wall on the left.
    pub left_wall: bool,
    /// Hit a wall on the right.
    pub right_wall: bool,
    /// Went from airborne to grounded.
    pub landed: bool,
    /// Landed out of a fast fall.
    pub landed_hard: bool,
    /// Walked off a ledge.
    pub started_falling: bool,
}

/// Corrected movement for one tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Resolution {
    /// Corrected centre x.
    pub x: f64,
    /// Corrected centre y.
    pub y: f64,
    /// Horizontal velocity after contacts.
    pub dx: f64,
    /// Vertical velocity after contacts.
    pub dy: f64,
    /// Airborne state after contacts.
    pub flags: MotionFlags,
    /// Contacts made.
    pub contacts: Contacts,
    /// Working state, for debugging overlays.
    pub scratch: CollisionScratch,
}

/// Resolves one tick of movement against the tiles.
///
/// Never fails: cells outside the map are passable, so an entity over a gap
/// in the generated terrain simply falls.
#[must_use]
pub fn resolve(body: &Body, tiles: &impl TileQuery) -> Resolution {
    let tile_size = tiles.tile_size();
    let ts = f64::from(tile_size);
    let (w, h) = (body.width, body.height);
    let half_w = f64::from(w / 2);
    let half_h = f64::from(h / 2);

    let mut flags = body.flags;
    let mut contacts = Contacts::default();
    let (mut dx, mut dy) = (body.dx, body.dy);

    let mut scratch = CollisionScratch {
        x_dest: body.x + dx,
        y_dest: body.y + dy,
        x_temp: body.x,
        y_temp: body.y,
        current_row: (body.y / ts).floor() as i32,
        current_col: (body.x / ts).floor() as i32,
        ..CollisionScratch::default()
    };

    // Vertical.
    let dest = CornerTiles::at(body.x, scratch.y_dest, w, h, tile_size);
    scratch.corners = dest.sample(tiles);
    if dy < 0.0 {
        if scratch.corners.top_left || scratch.corners.top_right {
            dy = 0.0;
            scratch.y_temp = f64::from(dest.top + 1) * ts + half_h;
            contacts.ceiling = true;
        } else {
            scratch.y_temp += dy;
        }
    } else if dy > 0.0 {
        if scratch.corners.bottom_left || scratch.corners.bottom_right {
            dy = 0.0;
            scratch.y_temp = f64::from(dest.bottom) * ts - half_h;
            contacts.floor = true;
            contacts.landed = flags.falling || flags.fast_falling;
            contacts.landed_hard = flags.fast_falling;
            flags.falling = false;
            flags.fast_falling = false;
            flags.jumping = false;
        } else {
            scratch.y_temp += dy;
        }
    }

    // Horizontal.
    let dest = CornerTiles::at(scratch.x_dest, body.y, w, h, tile_size);
    scratch.corners = dest.sample(tiles);
    if dx < 0.0 {
        if scratch.corners.top_left || scratch.corners.bottom_left {
            dx = 0.0;
            scratch.x_temp = f64::from(dest.left + 1) * ts + half_w;
            contacts.left_wall = true;
        } else {
            scratch.x_temp += dx;
        }
    } else if dx > 0.0 {
        if scratch.corners.top_right || scratch.corners.bottom_right {
            dx = 0.0;
            scratch.x_temp = f64::from(dest.right) * ts - half_w;
            contacts.right_wall = true;
        } else {
            scratch.x_temp += dx;
        }
    }

    // Cliff.
    if !flags.falling && !flags.fast_falling {
        let below = CornerTiles::at(scratch.x_temp, scratch.y_temp + 1.0, w, h, tile_size);
        scratch.corners = below.sample(tiles);
        if !scratch.corners.bottom_left && !scratch.corners.bottom_right {
            flags.falling = true;
            contacts.started_falling = true;
        }
    }

    Resolution {
        x: scratch.x_temp,
        y: scratch.y_temp,
        dx,
        dy,
        flags,
        contacts,
        scratch,
    }
}
