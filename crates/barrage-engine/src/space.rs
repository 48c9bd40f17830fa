//! The simulation space: pools, systems and the shared random generator.
//!
//! Every tick runs the registered systems once, in registration order. Each
//! system only sees the pools it subscribed to, and subscriptions are kept
//! current as pools come and go: adding a pool offers it to every system,
//! removing it withdraws it from all of them.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, trace};

use barrage_pool::archetype::PoolArchetype;
use barrage_pool::pool::Pool;
use barrage_pool::random::Random;
use barrage_pool::registry::Registry;
use barrage_pool::system::{PoolId, PoolSet, System, SystemContext};
use barrage_pool::PoolError;

use crate::tick::{assert_valid_dt, TickConfig, TickDiagnostics};

struct RegisteredSystem {
    name: String,
    /// Names of systems that must execute before this one.
    after: Vec<String>,
    system: Box<dyn System>,
}

/// Pools and the systems that update them.
pub struct Space {
    registry: Arc<Registry>,
    pools: PoolSet,
    systems: Vec<RegisteredSystem>,
    random: Random,
    tick_counter: u64,
    fixed_dt: f64,
    last_diagnostics: TickDiagnostics,
}

impl Space {
    /// An empty space ticking at `config.fixed_dt`.
    ///
    /// # Panics
    ///
    /// Panics if `config.fixed_dt` is not positive and finite.
    pub fn new(registry: Arc<Registry>, config: &TickConfig) -> Self {
        assert_valid_dt(config.fixed_dt);
        Self {
            registry,
            pools: PoolSet::new(),
            systems: Vec::new(),
            random: Random::new(config.seed),
            tick_counter: 0,
            fixed_dt: config.fixed_dt,
            last_diagnostics: TickDiagnostics::default(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    // -- pools --------------------------------------------------------------

    /// Add a pool and subscribe it to every system whose pool types it
    /// matches.
    pub fn add_pool(&mut self, pool: Pool) -> Result<PoolId, PoolError> {
        let id = self.pools.insert(pool)?;
        if let Some(pool) = self.pools.get(id) {
            let mut joined = 0;
            for entry in &mut self.systems {
                if entry.system.subscribe(id, pool) {
                    joined += 1;
                }
            }
            debug!(pool = pool.name(), capacity = pool.capacity(), systems = joined, "pool added");
        }
        Ok(id)
    }

    /// Instantiate `archetype` with this space's registry and add it.
    pub fn add_pool_from_archetype(&mut self, archetype: &PoolArchetype) -> Result<PoolId, PoolError> {
        let pool = Pool::from_archetype(archetype, &self.registry)?;
        self.add_pool(pool)
    }

    /// Unsubscribe the pool from every system and take it out of the space.
    pub fn remove_pool(&mut self, id: PoolId) -> Option<Pool> {
        for entry in &mut self.systems {
            entry.system.unsubscribe(id);
        }
        let pool = self.pools.remove(id)?;
        debug!(pool = pool.name(), "pool removed");
        Some(pool)
    }

    pub fn pool(&self, name: &str) -> Option<&Pool> {
        self.pools.by_name(name)
    }

    pub fn pool_mut(&mut self, name: &str) -> Option<&mut Pool> {
        self.pools.by_name_mut(name)
    }

    pub fn pool_id(&self, name: &str) -> Option<PoolId> {
        self.pools.id_of(name)
    }

    pub fn pools(&self) -> &PoolSet {
        &self.pools
    }

    /// Direct access to the pools. Appropriate for setup and tests; during
    /// simulation pools should only change through systems.
    pub fn pools_mut(&mut self) -> &mut PoolSet {
        &mut self.pools
    }

    // -- systems ------------------------------------------------------------

    /// Register a system to run each tick after the ones already registered.
    ///
    /// # Panics
    ///
    /// Panics if a system with the same name is already registered.
    pub fn add_system(&mut self, name: &str, system: Box<dyn System>) {
        self.add_system_after(name, &[], system);
    }

    /// Register a system with explicit execution dependencies.
    ///
    /// Every system in `after` must already be registered, so the execution
    /// order always satisfies the declared dependencies. Existing pools are
    /// offered to the new system immediately.
    ///
    /// # Panics
    ///
    /// - If any system in `after` is not already registered.
    /// - If a system with this name already exists.
    pub fn add_system_after(&mut self, name: &str, after: &[&str], mut system: Box<dyn System>) {
        for dep in after {
            assert!(
                self.has_system(dep),
                "system '{name}' declares dependency on '{dep}', but '{dep}' is not registered"
            );
        }
        assert!(!self.has_system(name), "duplicate system name: {name:?}");

        for (id, pool) in self.pools.iter() {
            system.subscribe(id, pool);
        }
        self.systems.push(RegisteredSystem {
            name: name.to_owned(),
            after: after.iter().map(|dep| dep.to_string()).collect(),
            system,
        });
    }

    pub fn has_system(&self, name: &str) -> bool {
        self.systems.iter().any(|entry| entry.name == name)
    }

    /// Names of all registered systems, in execution order.
    pub fn system_names(&self) -> Vec<&str> {
        self.systems.iter().map(|entry| entry.name.as_str()).collect()
    }

    /// Systems `name` was declared to run after.
    pub fn system_dependencies(&self, name: &str) -> Option<&[String]> {
        self.systems
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.after.as_slice())
    }

    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    // -- ticking ------------------------------------------------------------

    /// Run every system once, in order, then advance the tick counter.
    pub fn tick(&mut self) {
        let tick_start = Instant::now();
        let mut system_times = Vec::with_capacity(self.systems.len());
        let dt = self.fixed_dt as f32;

        for entry in &mut self.systems {
            let start = Instant::now();
            let mut ctx = SystemContext {
                pools: &mut self.pools,
                random: &mut self.random,
                dt,
                tick: self.tick_counter,
            };
            entry.system.update(&mut ctx);
            system_times.push((entry.name.clone(), start.elapsed()));
        }

        self.tick_counter += 1;
        self.last_diagnostics = TickDiagnostics {
            system_times,
            total_time: tick_start.elapsed(),
        };
        trace!(tick = self.tick_counter, total = ?self.last_diagnostics.total_time, "tick");
    }

    pub fn run_ticks(&mut self, count: u64) {
        for _ in 0..count {
            self.tick();
        }
    }

    // -- accessors ----------------------------------------------------------

    pub fn tick_count(&self) -> u64 {
        self.tick_counter
    }

    /// `tick_count * fixed_dt`, free of accumulated rounding.
    pub fn sim_time(&self) -> f64 {
        self.tick_counter as f64 * self.fixed_dt
    }

    pub fn fixed_dt(&self) -> f64 {
        self.fixed_dt
    }

    pub fn random(&self) -> &Random {
        &self.random
    }

    pub fn random_mut(&mut self) -> &mut Random {
        &mut self.random
    }

    pub fn last_diagnostics(&self) -> &TickDiagnostics {
        &self.last_diagnostics
    }
}

impl fmt::Debug for Space {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Space")
            .field("pools", &self.pools.len())
            .field("systems", &self.system_names())
            .field("tick", &self.tick_counter)
            .field("fixed_dt", &self.fixed_dt)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
