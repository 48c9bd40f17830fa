//! Serializable pool descriptors and their instantiation.
//!
//! A [`PoolArchetype`] names everything a pool is made of: tags, component
//! arrays, pool components, object templates, spawn types, a behavior tree
//! and objects to create up front. [`Pool::from_archetype`] resolves every
//! name through the [`Registry`] and fails on the first unknown one, so a
//! pool that comes out of it is fully wired.
//!
//! ```
//! use barrage_pool::prelude::*;
//!
//! let archetype: PoolArchetype = serde_json::from_value(serde_json::json!({
//!     "name": "walls",
//!     "capacity": 4,
//!     "starting_objects": [{ "count": 2 }]
//! }))
//! .unwrap();
//! let pool = Pool::from_archetype(&archetype, &Registry::new()).unwrap();
//! assert_eq!(pool.active_count(), 2);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::array::DESTRUCTIBLE;
use crate::behavior::{BehaviorNodeRecipe, BehaviorTree};
use crate::pool::{ObjectTemplate, Pool};
use crate::registry::Registry;
use crate::spawn::{SpawnLayer, SpawnType};
use crate::PoolError;

fn one() -> u32 {
    1
}

/// A spawn or size rule by registered name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpawnRuleArchetype {
    pub rule: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnLayerArchetype {
    #[serde(default = "one")]
    pub num_groups: u32,
    /// Only read for the first layer.
    #[serde(default = "one")]
    pub objects_per_group: u32,
    #[serde(default)]
    pub size_rules: Vec<SpawnRuleArchetype>,
    #[serde(default)]
    pub value_rules: Vec<SpawnRuleArchetype>,
}

impl Default for SpawnLayerArchetype {
    fn default() -> Self {
        Self {
            num_groups: 1,
            objects_per_group: 1,
            size_rules: Vec::new(),
            value_rules: Vec::new(),
        }
    }
}

/// A spawn type owned by the source pool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpawnTypeArchetype {
    pub name: String,
    /// Pool receiving the objects.
    pub destination: String,
    /// Object archetype of the destination pool; empty for type defaults.
    #[serde(default)]
    pub archetype: String,
    #[serde(default)]
    pub layers: Vec<SpawnLayerArchetype>,
}

/// Named starting values for new objects, keyed by array name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectArchetype {
    pub name: String,
    #[serde(default)]
    pub values: BTreeMap<String, Value>,
}

/// Objects created when the pool is instantiated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StartingObjects {
    #[serde(default)]
    pub archetype: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoolArchetype {
    pub name: String,
    pub capacity: usize,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub component_arrays: Vec<String>,
    #[serde(default)]
    pub components: BTreeMap<String, Value>,
    #[serde(default)]
    pub object_archetypes: Vec<ObjectArchetype>,
    #[serde(default)]
    pub spawn_types: Vec<SpawnTypeArchetype>,
    #[serde(default)]
    pub behavior: Option<BehaviorNodeRecipe>,
    #[serde(default)]
    pub starting_objects: Vec<StartingObjects>,
}

/// A system by registered name, with an optional instance name and ordering
/// constraint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemArchetype {
    pub system: String,
    /// Instance name; defaults to the registered name.
    #[serde(default)]
    pub name: Option<String>,
    /// Name of a system this one must run after.
    #[serde(default)]
    pub after: Option<String>,
    #[serde(default)]
    pub params: Value,
}

impl SystemArchetype {
    pub fn instance_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.system)
    }
}

impl SpawnTypeArchetype {
    pub fn build(&self, registry: &Registry) -> Result<SpawnType, PoolError> {
        let mut spawn_type = SpawnType::new(&self.name, &self.destination, &self.archetype);
        for layer in &self.layers {
            let mut built = SpawnLayer::new(layer.num_groups, layer.objects_per_group);
            for rule in &layer.size_rules {
                built.add_size_rule(registry.parse_spawn_rule(&rule.rule, &rule.params)?);
            }
            for rule in &layer.value_rules {
                built.add_value_rule(registry.parse_spawn_rule(&rule.rule, &rule.params)?);
            }
            spawn_type.add_layer(built);
        }
        Ok(spawn_type)
    }
}

impl Pool {
    /// Instantiate a pool from its descriptor.
    pub fn from_archetype(archetype: &PoolArchetype, registry: &Registry) -> Result<Self, PoolError> {
        let mut pool = Pool::new(&archetype.name, archetype.capacity);

        for tag in &archetype.tags {
            registry.check_tag(tag)?;
            pool.add_tag(tag);
        }

        for name in &archetype.component_arrays {
            if name == DESTRUCTIBLE {
                continue;
            }
            let array = registry
                .allocate_component_array(name, archetype.capacity)
                .ok_or_else(|| registry.unknown_array(name))?;
            pool.add_component_array(name, array);
        }

        for (name, params) in &archetype.components {
            pool.add_component(name, registry.parse_component(name, params)?);
        }

        for object in &archetype.object_archetypes {
            let mut template = ObjectTemplate::new(&object.name);
            for (array, value) in &object.values {
                if !pool.has_component_array(array) {
                    return Err(PoolError::MissingArray {
                        pool: archetype.name.clone(),
                        name: array.clone(),
                    });
                }
                template.set_value(array, registry.parse_array_value(array, value)?);
            }
            pool.add_object_template(template);
        }

        for spawn_type in &archetype.spawn_types {
            pool.add_spawn_type(spawn_type.build(registry)?);
        }

        if let Some(recipe) = &archetype.behavior {
            pool.set_behavior_tree(BehaviorTree::build(recipe, registry)?);
        }

        for start in &archetype.starting_objects {
            if !start.archetype.is_empty() && pool.object_template(&start.archetype).is_none() {
                return Err(PoolError::UnknownObjectArchetype {
                    pool: archetype.name.clone(),
                    name: start.archetype.clone(),
                });
            }
            pool.create_objects(&start.archetype, start.count);
        }

        debug!(
            pool = %archetype.name,
            capacity = archetype.capacity,
            arrays = archetype.component_arrays.len(),
            spawn_types = archetype.spawn_types.len(),
            active = pool.active_count(),
            "instantiated pool archetype"
        );
        Ok(pool)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
