//! Built-in systems.
//!
//! A scene without an explicit system list runs these in [`DEFAULT_ORDER`]:
//! destroyed objects are compacted away first, then spawners queue events,
//! the creation system materializes them, behaviors and motion update the
//! survivors, and finally lifetime, bounds and collision mark objects for the
//! next tick's compaction.

mod behavior;
mod bounds;
mod collision;
mod creation;
mod destruction;
mod lifetime;
mod movement;
mod spawn;

pub use behavior::BehaviorSystem;
pub use bounds::BoundsSystem;
pub use collision::CollisionSystem;
pub use creation::CreationSystem;
pub use destruction::DestructionSystem;
pub use lifetime::LifetimeSystem;
pub use movement::MovementSystem;
pub use spawn::SpawnSystem;

pub const DESTRUCTION: &str = "Destruction";
pub const SPAWN: &str = "Spawn";
pub const CREATION: &str = "Creation";
pub const BEHAVIOR: &str = "Behavior";
pub const MOVEMENT: &str = "Movement";
pub const LIFETIME: &str = "Lifetime";
pub const BOUNDS: &str = "Bounds";
pub const COLLISION: &str = "Collision";

/// Registered names of the built-in systems in execution order.
pub const DEFAULT_ORDER: [&str; 8] = [
    DESTRUCTION,
    SPAWN,
    CREATION,
    BEHAVIOR,
    MOVEMENT,
    LIFETIME,
    BOUNDS,
    COLLISION,
];
