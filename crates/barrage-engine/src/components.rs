//! Built-in component types.
//!
//! Per-object values live in component arrays (one entry per slot); per-pool
//! values are pool components shared by every object of the pool. All of them
//! are plain serde data so scenes can set them from JSON.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Array names
// ---------------------------------------------------------------------------

pub const POSITION: &str = "Position";
pub const VELOCITY: &str = "Velocity";
pub const ROTATION: &str = "Rotation";
pub const AGE: &str = "Age";
pub const SPAWN_TIMER: &str = "SpawnTimer";
pub const HEALTH: &str = "Health";

pub const COLLIDER: &str = "Collider";
pub const LIFETIME: &str = "Lifetime";
pub const BOUNDS: &str = "Bounds";
pub const SPAWNER: &str = "Spawner";

/// Pools whose objects hit others.
pub const TAG_HOSTILE: &str = "hostile";
/// Pools whose objects can be hit.
pub const TAG_TARGET: &str = "target";

// ---------------------------------------------------------------------------
// Per-object values
// ---------------------------------------------------------------------------

/// World position in scene units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_squared(self, other: Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

/// Units per second.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub x: f32,
    pub y: f32,
}

impl Velocity {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// A velocity of magnitude `speed` pointing at `angle` radians.
    pub fn from_angle(angle: f32, speed: f32) -> Self {
        Self {
            x: angle.cos() * speed,
            y: angle.sin() * speed,
        }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

/// Facing in radians.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rotation(pub f32);

/// Ticks since the object was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Age(pub u32);

/// Ticks counted by the spawn system for the object's spawner schedule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpawnTimer(pub u32);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Health(pub i32);

// ---------------------------------------------------------------------------
// Per-pool values
// ---------------------------------------------------------------------------

/// Circle collider shared by every object of the pool.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Collider {
    pub radius: f32,
    /// Damage dealt to a target's [`Health`] on contact.
    #[serde(default = "default_damage")]
    pub damage: i32,
    /// Whether the object is destroyed by its first contact.
    #[serde(default = "default_destroy_on_hit")]
    pub destroy_on_hit: bool,
}

fn default_damage() -> i32 {
    1
}

fn default_destroy_on_hit() -> bool {
    true
}

impl Default for Collider {
    fn default() -> Self {
        Self {
            radius: 0.0,
            damage: default_damage(),
            destroy_on_hit: default_destroy_on_hit(),
        }
    }
}

/// Objects are destroyed once their [`Age`] reaches `max_ticks`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifetime {
    pub max_ticks: u32,
}

/// Axis-aligned play area; objects whose position leaves it are destroyed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Bounds {
    pub fn contains(&self, position: Position) -> bool {
        (self.min_x..=self.max_x).contains(&position.x)
            && (self.min_y..=self.max_y).contains(&position.y)
    }
}

/// When each object of the pool fires one of the pool's spawn types.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Spawner {
    pub entries: Vec<SpawnerEntry>,
}

/// Fire `spawn_type` when the object's timer reaches `delay`, then every
/// `interval` ticks. An interval of 0 fires once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnerEntry {
    pub spawn_type: String,
    #[serde(default)]
    pub delay: u32,
    #[serde(default)]
    pub interval: u32,
}

impl SpawnerEntry {
    /// Whether the entry fires at timer value `ticks`.
    pub fn fires_at(&self, ticks: u32) -> bool {
        if ticks < self.delay {
            return false;
        }
        let since = ticks - self.delay;
        if self.interval == 0 {
            since == 0
        } else {
            since % self.interval == 0
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
