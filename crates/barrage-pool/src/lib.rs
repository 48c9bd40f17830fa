//! Barrage pool -- columnar object pools for bullet-hell simulations.
//!
//! A [`Pool`](pool::Pool) stores a homogeneous set of objects as parallel
//! component arrays with a contiguous live prefix. Objects are never
//! allocated one at a time: spawn events are queued on
//! [`SpawnType`](spawn::SpawnType)s, materialized in batches whose layout is
//! computed by [`SpawnLayer`](spawn::SpawnLayer)s and filled in by pluggable
//! [`SpawnRule`](spawn::SpawnRule)s, and destroyed objects are removed by a
//! single stable compaction pass per tick.
//!
//! Everything data-driven goes through one [`Registry`](registry::Registry),
//! which maps names in [`PoolArchetype`](archetype::PoolArchetype)s to Rust
//! types.
//!
//! # Quick Start
//!
//! ```
//! use barrage_pool::prelude::*;
//!
//! // A spawner pool with one object and a spawn type producing 3 groups of 2.
//! let mut spawner = Pool::new("spawner", 1);
//! spawner.create_objects("", 1);
//! let burst = spawner.add_spawn_type(
//!     SpawnType::new("burst", "bullets", "")
//!         .with_layer(SpawnLayer::new(3, 2).with_value_rule(Box::new(SetValue::new("Speed", 4.0f32)))),
//! );
//!
//! let mut bullets = Pool::new("bullets", 10);
//! bullets.add_array::<f32>("Speed");
//!
//! let mut random = Random::new(7);
//! spawner.spawn_types_mut()[burst].create_spawn(0);
//! bullets.queue_spawns(&mut spawner, burst, &mut random);
//! bullets.spawn_objects();
//! spawner.clear_spawn_queues();
//!
//! assert_eq!(bullets.active_count(), 6);
//! assert_eq!(bullets.component_array::<f32>("Speed").get(5), &4.0);
//! ```

#![deny(unsafe_code)]

pub mod archetype;
pub mod array;
pub mod behavior;
pub mod component;
pub mod pool;
pub mod random;
pub mod registry;
pub mod snapshot;
pub mod spawn;
pub mod system;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Configuration errors: unknown names, conflicting registrations and bad
/// parameter blocks. Runtime capacity limits are never errors.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("component type '{name}' not registered. Registered components: [{registered}]")]
    UnknownComponent { name: String, registered: String },

    #[error("component array type '{name}' not registered. Registered arrays: [{registered}]")]
    UnknownComponentArray { name: String, registered: String },

    #[error("spawn rule '{name}' not registered. Registered spawn rules: [{registered}]")]
    UnknownSpawnRule { name: String, registered: String },

    #[error("behavior node '{name}' not registered. Registered behavior nodes: [{registered}]")]
    UnknownBehaviorNode { name: String, registered: String },

    #[error("system '{name}' not registered. Registered systems: [{registered}]")]
    UnknownSystem { name: String, registered: String },

    #[error("tag '{name}' not registered. Registered tags: [{registered}]")]
    UnknownTag { name: String, registered: String },

    #[error("pool '{pool}' has no object archetype '{name}'")]
    UnknownObjectArchetype { pool: String, name: String },

    #[error("pool '{pool}' has no component array '{name}'")]
    MissingArray { pool: String, name: String },

    /// A name already bound to a different Rust type.
    #[error("{kind} '{name}' is already registered as {existing}, cannot register {requested}")]
    DuplicateName {
        kind: &'static str,
        name: String,
        existing: &'static str,
        requested: &'static str,
    },

    #[error("a pool named '{0}' already exists")]
    DuplicatePool(String),

    #[error("component array '{name}' stores {stored}, not {requested}")]
    TypeMismatch {
        name: String,
        stored: &'static str,
        requested: &'static str,
    },

    #[error("invalid parameters for {kind} '{name}': {source}")]
    Deserialization {
        kind: &'static str,
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::archetype::{
        ObjectArchetype, PoolArchetype, SpawnLayerArchetype, SpawnRuleArchetype, SpawnTypeArchetype,
        StartingObjects, SystemArchetype,
    };
    pub use crate::array::{ComponentArray, Element, TypedArray, DESTRUCTIBLE};
    pub use crate::behavior::{
        BehaviorContext, BehaviorNode, BehaviorNodeRecipe, BehaviorState, BehaviorTree,
    };
    pub use crate::component::Component;
    pub use crate::pool::{ObjectTemplate, Pool, PoolData};
    pub use crate::random::Random;
    pub use crate::registry::Registry;
    pub use crate::snapshot::PoolSnapshot;
    pub use crate::spawn::rules::{CopyFromSource, RandomGroupCount, SetValue};
    pub use crate::spawn::{GroupInfo, SpawnLayer, SpawnRule, SpawnRuleInfo, SpawnSlot, SpawnType};
    pub use crate::system::{PoolId, PoolSet, PoolType, Subscriptions, System, SystemContext};
    pub use crate::PoolError;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
