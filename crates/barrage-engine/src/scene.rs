//! Scene files: a tick configuration, a system list and pool archetypes.
//!
//! ```json
//! {
//!   "tick": { "fixed_dt": 0.016666, "seed": 42 },
//!   "pools": [
//!     { "name": "bullets", "capacity": 2048, "component_arrays": ["Position", "Velocity"] }
//!   ]
//! }
//! ```
//!
//! Without a `systems` list the built-in systems run in their default order.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use tracing::info;

use barrage_pool::archetype::{PoolArchetype, SystemArchetype};
use barrage_pool::registry::Registry;

use crate::space::Space;
use crate::systems::DEFAULT_ORDER;
use crate::tick::{TickConfig, TickLoop};

/// A whole simulation described as data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    #[serde(default)]
    pub tick: TickConfig,
    /// Systems in execution order.
    #[serde(default = "default_systems")]
    pub systems: Vec<SystemArchetype>,
    #[serde(default)]
    pub pools: Vec<PoolArchetype>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            tick: TickConfig::default(),
            systems: default_systems(),
            pools: Vec::new(),
        }
    }
}

/// The built-in systems in [`DEFAULT_ORDER`], without parameters.
pub fn default_systems() -> Vec<SystemArchetype> {
    DEFAULT_ORDER
        .iter()
        .map(|name| SystemArchetype {
            system: (*name).to_owned(),
            ..SystemArchetype::default()
        })
        .collect()
}

impl SceneConfig {
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("failed to parse scene JSON")
    }

    pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scene file {}", path.display()))?;
        Self::from_json_str(&json).with_context(|| format!("in scene file {}", path.display()))
    }

    /// Instantiate every system, then every pool, into a new space.
    ///
    /// Unknown names, bad parameters and misordered `after` constraints are
    /// reported as errors rather than panics.
    pub fn build(&self, registry: Arc<Registry>) -> anyhow::Result<TickLoop> {
        let mut space = Space::new(Arc::clone(&registry), &self.tick);

        for archetype in &self.systems {
            let name = archetype.instance_name();
            if space.has_system(name) {
                bail!("system '{name}' is listed twice");
            }
            let after: Vec<&str> = archetype.after.iter().map(String::as_str).collect();
            for dep in &after {
                if !space.has_system(dep) {
                    bail!("system '{name}' runs after '{dep}', which is not listed before it");
                }
            }
            let system = registry
                .parse_system(&archetype.system, &archetype.params)
                .with_context(|| format!("failed to build system '{name}'"))?;
            space.add_system_after(name, &after, system);
        }

        for archetype in &self.pools {
            space
                .add_pool_from_archetype(archetype)
                .with_context(|| format!("failed to build pool '{}'", archetype.name))?;
        }

        info!(
            pools = space.pools().len(),
            systems = space.system_count(),
            seed = space.random().seed(),
            "scene built"
        );
        Ok(TickLoop::new(space, self.tick.max_ticks_per_frame))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
