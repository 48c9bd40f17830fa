//! Barrage engine -- a deterministic bullet-hell simulation built on
//! [`barrage_pool`].
//!
//! The engine supplies what the pool crate leaves open: concrete component
//! types ([`components`]), bullet-pattern spawn rules ([`rules`]), behavior
//! leaves ([`behaviors`]), the standard per-tick systems ([`systems`]), a
//! [`Space`](space::Space) that owns pools and systems, a fixed-timestep
//! [`TickLoop`](tick::TickLoop), JSON [`SceneConfig`](scene::SceneConfig)s
//! and BLAKE3 state hashes for determinism checks.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//!
//! use barrage_engine::prelude::*;
//!
//! let scene = SceneConfig::from_json_str(r#"{
//!     "tick": { "seed": 7 },
//!     "pools": [
//!         {
//!             "name": "emitter",
//!             "capacity": 1,
//!             "component_arrays": ["Position", "SpawnTimer"],
//!             "components": { "Spawner": { "entries": [{ "spawn_type": "ring", "interval": 10 }] } },
//!             "spawn_types": [{
//!                 "name": "ring",
//!                 "destination": "bullets",
//!                 "layers": [{
//!                     "num_groups": 8,
//!                     "value_rules": [
//!                         { "rule": "CopyPosition" },
//!                         { "rule": "RingVelocity", "params": { "speed": 60.0 } }
//!                     ]
//!                 }]
//!             }],
//!             "starting_objects": [{ "count": 1 }]
//!         },
//!         { "name": "bullets", "capacity": 64, "component_arrays": ["Position", "Velocity"] }
//!     ]
//! }"#).unwrap();
//!
//! let registry = Arc::new(barrage_engine::builtin_registry().unwrap());
//! let mut tick_loop = scene.build(registry).unwrap();
//! tick_loop.run_ticks(11);
//! assert_eq!(tick_loop.space().pool("bullets").unwrap().active_count(), 16);
//! ```

#![deny(unsafe_code)]

pub mod behaviors;
pub mod components;
pub mod logging;
pub mod rules;
pub mod scene;
pub mod snapshot;
pub mod space;
pub mod systems;
pub mod tick;

pub use barrage_pool;

use barrage_pool::registry::Registry;
use barrage_pool::spawn::rules::{CopyFromSource, SetValue};
use barrage_pool::PoolError;

use crate::behaviors::{Chance, Destroy, SetVelocityNode};
use crate::components::*;
use crate::rules::{AngleSweep, CopyPosition, LineSpread, RandomSpeed, RingVelocity, SetVelocity};
use crate::systems::*;

/// Register every engine component, rule, node, system and tag.
pub fn register_builtins(registry: &mut Registry) -> Result<(), PoolError> {
    registry.register_component_array::<Position>(POSITION)?;
    registry.register_component_array::<Velocity>(VELOCITY)?;
    registry.register_component_array::<Rotation>(ROTATION)?;
    registry.register_component_array::<Age>(AGE)?;
    registry.register_component_array::<SpawnTimer>(SPAWN_TIMER)?;
    registry.register_component_array::<Health>(HEALTH)?;

    registry.register_component::<Collider>(COLLIDER)?;
    registry.register_component::<components::Lifetime>(components::LIFETIME)?;
    registry.register_component::<components::Bounds>(components::BOUNDS)?;
    registry.register_component::<Spawner>(SPAWNER)?;

    registry.register_spawn_rule::<CopyPosition>("CopyPosition")?;
    registry.register_spawn_rule::<LineSpread>("LineSpread")?;
    registry.register_spawn_rule::<SetVelocity>("SetVelocity")?;
    registry.register_spawn_rule::<RingVelocity>("RingVelocity")?;
    registry.register_spawn_rule::<AngleSweep>("AngleSweep")?;
    registry.register_spawn_rule::<RandomSpeed>("RandomSpeed")?;
    registry.register_spawn_rule::<SetValue<Health>>("SetHealth")?;
    registry.register_spawn_rule::<CopyFromSource<Velocity>>("CopyVelocity")?;

    registry.register_behavior_node::<SetVelocityNode>("SetVelocity")?;
    registry.register_behavior_node::<Destroy>("Destroy")?;
    registry.register_behavior_node::<Chance>("Chance")?;

    registry.register_system::<DestructionSystem>(DESTRUCTION)?;
    registry.register_system::<SpawnSystem>(SPAWN)?;
    registry.register_system::<CreationSystem>(CREATION)?;
    registry.register_system::<BehaviorSystem>(BEHAVIOR)?;
    registry.register_system::<MovementSystem>(MOVEMENT)?;
    registry.register_system::<LifetimeSystem>(systems::LIFETIME)?;
    registry.register_system::<BoundsSystem>(systems::BOUNDS)?;
    registry.register_system::<CollisionSystem>(COLLISION)?;

    registry.register_tag(TAG_HOSTILE);
    registry.register_tag(TAG_TARGET);
    Ok(())
}

/// A core [`Registry`] with [`register_builtins`] applied.
pub fn builtin_registry() -> Result<Registry, PoolError> {
    let mut registry = Registry::new();
    register_builtins(&mut registry)?;
    Ok(registry)
}

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use barrage_pool::prelude::*;

    pub use crate::components::{
        Age, Bounds, Collider, Health, Lifetime, Position, Rotation, SpawnTimer, Spawner, SpawnerEntry,
        Velocity,
    };
    pub use crate::scene::SceneConfig;
    pub use crate::snapshot::SpaceSnapshot;
    pub use crate::space::Space;
    pub use crate::tick::{FrameClock, TickConfig, TickDiagnostics, TickLoop};
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_register_once() {
        let registry = builtin_registry().unwrap();
        for name in DEFAULT_ORDER {
            assert!(registry.has_system(name), "{name}");
        }
        assert!(registry.has_spawn_rule("AngleSweep"));
        assert!(registry.has_behavior_node("Destroy"));
        assert!(registry.has_tag(TAG_HOSTILE));
    }

    #[test]
    fn registering_twice_is_harmless() {
        let mut registry = builtin_registry().unwrap();
        register_builtins(&mut registry).unwrap();
    }
}
