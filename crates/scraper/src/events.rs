//! # Game Events
//!
//! One-way stream from the level to its collaborators.
//!
//! ```text
//! ┌─────────────┐      ┌─────────────┐      ┌─────────────┐
//! │    Level    │─────>│   Event     │─────>│  HUD/Audio  │
//! │   (tick)    │      │   Channel   │      │             │
//! └─────────────┘      └─────────────┘      └─────────────┘
//! ```
//!
//! The channel is bounded. A full channel drops events instead of stalling
//! the simulation thread.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

/// Channel capacity used by [`crate::Level`].
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Something a collaborator may want to react to.
#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    // =========================================================================
    // Player
    // =========================================================================
    /// The player lost health.
    PlayerDamaged {
        /// Health after the hit.
        health: u32,
    },

    /// The player gained health from parries.
    PlayerHealed {
        /// Health after healing.
        health: u32,
    },

    /// A parry landed.
    Parried {
        /// Parries counted towards the next heal.
        streak: u32,
    },

    /// The player hit the ground out of a dive.
    LandedHard {
        /// Landing x in world pixels.
        x: f64,
    },

    /// The player died.
    PlayerDied {
        /// Distance run from the spawn point, in pixels.
        distance: f64,
        /// Tick of death.
        tick: u64,
    },

    // =========================================================================
    // Hazards
    // =========================================================================
    /// A projectile entered the level.
    HazardSpawned {
        /// World x.
        x: f64,
        /// World y.
        y: f64,
    },

    /// A projectile was parried or scrolled out.
    HazardDestroyed {
        /// World x.
        x: f64,
        /// World y.
        y: f64,
        /// Destroyed by a parry.
        parried: bool,
    },

    // =========================================================================
    // Level
    // =========================================================================
    /// The level was rebuilt with a fresh grid.
    LevelReloaded,
}

/// Owner of both channel ends.
pub struct EventBus {
    sender: Sender<GameEvent>,
    receiver: Receiver<GameEvent>,
}

impl EventBus {
    /// Creates a bus holding at most `capacity` undelivered events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self { sender, receiver }
    }

    /// Returns a producer handle.
    #[must_use]
    pub fn sender(&self) -> EventSender {
        EventSender {
            sender: self.sender.clone(),
        }
    }

    /// Returns a consumer handle.
    #[must_use]
    pub fn receiver(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.receiver.clone(),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

/// Handle for sending events.
#[derive(Clone)]
pub struct EventSender {
    sender: Sender<GameEvent>,
}

impl EventSender {
    /// Sends without blocking. Returns `false` if the event was dropped.
    #[inline]
    pub fn send(&self, event: GameEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                tracing::debug!(?event, "event channel full, dropping");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Handle for receiving events.
#[derive(Clone)]
pub struct EventReceiver {
    receiver: Receiver<GameEvent>,
}

impl EventReceiver {
    /// Takes every pending event.
    #[inline]
    pub fn drain(&self) -> Vec<GameEvent> {
        self.receiver.try_iter().collect()
    }

    /// Takes one event if any is pending.
    #[inline]
    pub fn try_recv(&self) -> Option<GameEvent> {
        self.receiver.try_recv().ok()
    }

    /// Number of pending events.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// True if at least one event is pending.
    #[inline]
    #[must_use]
    pub fn has_events(&self) -> bool {
        !self.receiver.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_and_drain() {
        let bus = EventBus::new(8);
        let sender = bus.sender();
        let receiver = bus.receiver();

        assert!(sender.send(GameEvent::PlayerDamaged { health: 3 }));
        assert!(sender.send(GameEvent::LevelReloaded));
        assert_eq!(receiver.pending_count(), 2);

        let events = receiver.drain();
        assert_eq!(
            events,
            vec![GameEvent::PlayerDamaged { health: 3 }, GameEvent::LevelReloaded]
        );
        assert!(!receiver.has_events());
        assert!(receiver.try_recv().is_none());
    }

    #[test]
    fn test_full_channel_drops() {
        let bus = EventBus::new(1);
        let sender = bus.sender();

        assert!(sender.send(GameEvent::LevelReloaded));
        assert!(!sender.send(GameEvent::LevelReloaded));
        assert_eq!(bus.receiver().pending_count(), 1);
    }
}
