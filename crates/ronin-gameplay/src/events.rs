//! Event bus carrying combat outcomes to audio and UI collaborators.

use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use tracing::warn;

use ronin_common::{EntityId, Team};

use crate::level::LevelStatus;
use crate::moveset::{ActorKind, AnimState};

/// Events raised by the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CombatEvent {
    /// An entity took damage
    Hit {
        /// Damaged entity
        target: EntityId,
        /// Team of the damaged entity
        team: Team,
        /// Attacking entity
        source: EntityId,
        /// Damage amount
        damage: i32,
        /// Whether the hit knocked down
        knockdown: bool,
    },
    /// A hit was absorbed by a guard
    Blocked {
        /// Blocking entity
        target: EntityId,
        /// Whether a counter attack was queued
        countered: bool,
    },
    /// Health ran out
    Died {
        /// Fallen entity
        entity_id: EntityId,
        /// Its actor kind
        kind: ActorKind,
    },
    /// The player dashed
    Dashed {
        /// Charges left
        remaining: u32,
    },
    /// The player healed
    Healed {
        /// Health after healing
        health: i32,
        /// Charges left
        remaining: u32,
    },
    /// The player jumped
    Jumped,
    /// An attack swing started
    Swing {
        /// Attacking entity
        entity_id: EntityId,
        /// Attack state
        state: AnimState,
    },
    /// A projectile was launched
    ProjectileFired {
        /// Shooter
        entity_id: EntityId,
        /// Ammo left
        ammo: u32,
    },
    /// The level status changed
    StatusChanged {
        /// New status
        status: LevelStatus,
    },
}

impl CombatEvent {
    /// Short snake_case label for the event variant.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Hit { .. } => "hit",
            Self::Blocked { .. } => "blocked",
            Self::Died { .. } => "died",
            Self::Dashed { .. } => "dashed",
            Self::Healed { .. } => "healed",
            Self::Jumped => "jumped",
            Self::Swing { .. } => "swing",
            Self::ProjectileFired { .. } => "projectile_fired",
            Self::StatusChanged { .. } => "status_changed",
        }
    }
}

/// Events one frame may raise before further ones are dropped.
pub const FRAME_EVENT_CAPACITY: usize = 256;

/// Per-frame combat event channel.
///
/// Entities publish through a shared reference while the level holds the
/// other borrows of the frame; the level drains the channel once per update,
/// so the capacity bounds a single frame. Overflow is counted, never blocks.
#[derive(Debug)]
pub struct EventBus {
    sender: Sender<CombatEvent>,
    receiver: Receiver<CombatEvent>,
    dropped: AtomicUsize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(FRAME_EVENT_CAPACITY)
    }
}

impl EventBus {
    /// Creates a bus holding at most `capacity` undrained events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            dropped: AtomicUsize::new(0),
        }
    }

    /// Queues an event. Returns false when the frame's capacity is spent
    /// and the event was dropped.
    pub fn publish(&self, event: CombatEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event) | TrySendError::Disconnected(event)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!("Event bus full, dropped '{}' event ({dropped} so far)", event.name());
                false
            },
        }
    }

    /// Takes every queued event in publish order.
    pub fn drain(&self) -> Vec<CombatEvent> {
        self.receiver.try_iter().collect()
    }

    /// Events waiting to be drained.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Events lost to a full bus since creation.
    #[must_use]
    pub fn dropped_count(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}
