//! Domain events delivered by the host server.
//!
//! Every event concerns exactly one tracked subject and belongs to a
//! closed set of [`EventKind`]s known when blueprints are declared.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque, stable identity of a tracked subject (a player).
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(pub Uuid);

impl SubjectId {
    /// Creates a fresh random subject id.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SubjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A point or vector in world space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    /// East/west
    pub x: f64,
    /// Up/down
    pub y: f64,
    /// North/south
    pub z: f64,
}

impl Vec3 {
    /// Creates a vector.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Distance on the horizontal plane.
    #[must_use]
    pub fn horizontal_distance(self, other: Self) -> f64 {
        (self.x - other.x).hypot(self.z - other.z)
    }

    /// Euclidean distance.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        let dy = self.y - other.y;
        self.horizontal_distance(other).hypot(dy)
    }
}

/// Closed set of event types the engine routes on.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Subject moved
    Move,
    /// Subject was teleported by the server
    Teleport,
    /// Server applied velocity to the subject
    Velocity,
    /// Subject attacked another entity
    Attack,
    /// Subject broke a block
    BlockBreak,
    /// Subject placed a block
    BlockPlace,
    /// Subject interacted with the world
    Interact,
    /// Subject joined
    Join,
    /// Subject left
    Quit,
}

impl EventKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 9] = [
        Self::Move,
        Self::Teleport,
        Self::Velocity,
        Self::Attack,
        Self::BlockBreak,
        Self::BlockPlace,
        Self::Interact,
        Self::Join,
        Self::Quit,
    ];

    /// Stable label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Move => "move",
            Self::Teleport => "teleport",
            Self::Velocity => "velocity",
            Self::Attack => "attack",
            Self::BlockBreak => "block_break",
            Self::BlockPlace => "block_place",
            Self::Interact => "interact",
            Self::Join => "join",
            Self::Quit => "quit",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event-specific data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// Position update.
    Move {
        /// Position before the move
        from: Vec3,
        /// Position after the move
        to: Vec3,
        /// Whether the subject reports standing on ground
        #[serde(default)]
        on_ground: bool,
        /// World the subject is in
        #[serde(default)]
        world: String,
        /// Material of the block below the subject
        #[serde(default)]
        material: String,
    },
    /// Server-side teleport.
    Teleport {
        /// Destination
        to: Vec3,
    },
    /// Server-applied knockback or launch.
    Velocity {
        /// Applied velocity
        vector: Vec3,
    },
    /// Melee attack.
    Attack {
        /// Attacked entity
        target: SubjectId,
        /// Attacker eye position
        origin: Vec3,
        /// Target hit position
        hit: Vec3,
    },
    /// Block removal.
    BlockBreak {
        /// Block position
        position: Vec3,
        /// Block material
        material: String,
    },
    /// Block placement.
    BlockPlace {
        /// Block position
        position: Vec3,
        /// Block material
        material: String,
    },
    /// Generic interaction.
    Interact {
        /// Interaction target position
        position: Vec3,
    },
    /// Subject connected.
    Join,
    /// Subject disconnected.
    Quit,
}

impl EventPayload {
    /// The routing kind of this payload.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Move { .. } => EventKind::Move,
            Self::Teleport { .. } => EventKind::Teleport,
            Self::Velocity { .. } => EventKind::Velocity,
            Self::Attack { .. } => EventKind::Attack,
            Self::BlockBreak { .. } => EventKind::BlockBreak,
            Self::BlockPlace { .. } => EventKind::BlockPlace,
            Self::Interact { .. } => EventKind::Interact,
            Self::Join => EventKind::Join,
            Self::Quit => EventKind::Quit,
        }
    }
}

/// One event for one subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Subject the event concerns
    pub subject: SubjectId,
    /// When the host observed the event
    pub at: DateTime<Utc>,
    /// Event data
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl DomainEvent {
    /// Creates an event.
    #[must_use]
    pub const fn new(subject: SubjectId, at: DateTime<Utc>, payload: EventPayload) -> Self {
        Self {
            subject,
            at,
            payload,
        }
    }

    /// The routing kind of this event.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        self.payload.kind()
    }
}
