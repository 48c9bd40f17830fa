//! Name-keyed factories for every pluggable type.
//!
//! Archetype data refers to components, component arrays, spawn rules,
//! behavior nodes and systems by name. The [`Registry`] maps each name to the
//! Rust type registered under it and knows how to allocate a default instance
//! or parse one from a JSON parameter block.
//!
//! One registry is built at startup and shared by reference. Registering the
//! same name twice with the same type is a no-op; registering a different
//! type under a taken name is an error.

use std::any::TypeId;
use std::collections::{BTreeMap, BTreeSet};

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::array::{ComponentArray, Element, TypedArray, DESTRUCTIBLE};
use crate::behavior::{BehaviorNode, Selector, Sequence, Succeed, Wait};
use crate::component::Component;
use crate::spawn::rules::RandomGroupCount;
use crate::spawn::SpawnRule;
use crate::system::System;
use crate::PoolError;

type Parse<T> = fn(&Value) -> Result<T, serde_json::Error>;

/// Deserialize `T` from a parameter block. A missing block (`null`) is read
/// as a unit value first and an empty object second, so both unit structs
/// and structs with defaulted fields accept it.
fn parse_params<T: DeserializeOwned>(params: &Value) -> Result<T, serde_json::Error> {
    match params {
        Value::Null => T::deserialize(&Value::Null)
            .or_else(|_| T::deserialize(&Value::Object(serde_json::Map::new()))),
        other => T::deserialize(other),
    }
}

fn parse_component<T: Element>(params: &Value) -> Result<Box<dyn Component>, serde_json::Error> {
    Ok(Box::new(parse_params::<T>(params)?))
}

fn allocate_component<T: Element>() -> Box<dyn Component> {
    Box::new(T::default())
}

fn parse_array_value<T: Element>(value: &Value) -> Result<Box<dyn ComponentArray>, serde_json::Error> {
    Ok(Box::new(TypedArray::from_value(parse_params::<T>(value)?)))
}

fn allocate_array<T: Element>(capacity: usize) -> Box<dyn ComponentArray> {
    Box::new(TypedArray::<T>::new(capacity))
}

fn parse_spawn_rule<R>(params: &Value) -> Result<Box<dyn SpawnRule>, serde_json::Error>
where
    R: SpawnRule + DeserializeOwned + 'static,
{
    Ok(Box::new(parse_params::<R>(params)?))
}

fn parse_behavior_node<N>(params: &Value) -> Result<Box<dyn BehaviorNode>, serde_json::Error>
where
    N: BehaviorNode + DeserializeOwned + 'static,
{
    Ok(Box::new(parse_params::<N>(params)?))
}

fn build_system<S>(params: &Value) -> Result<Box<dyn System>, serde_json::Error>
where
    S: System + Default + 'static,
{
    let mut system = S::default();
    if !params.is_null() {
        system.configure(params)?;
    }
    Ok(Box::new(system))
}

#[derive(Debug, Clone, Copy)]
struct TypeTag {
    id: TypeId,
    name: &'static str,
}

impl TypeTag {
    fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }
}

struct ComponentEntry {
    ty: TypeTag,
    allocate: fn() -> Box<dyn Component>,
    parse: Parse<Box<dyn Component>>,
}

struct ArrayEntry {
    ty: TypeTag,
    allocate: fn(usize) -> Box<dyn ComponentArray>,
    parse_value: Parse<Box<dyn ComponentArray>>,
}

struct FactoryEntry<T> {
    ty: TypeTag,
    parse: Parse<T>,
}

/// Check `name` is free in `map` or already bound to `ty`. Returns whether a
/// new entry should be inserted.
fn claim<E>(
    map: &BTreeMap<String, E>,
    kind: &'static str,
    name: &str,
    ty: TypeTag,
    existing: impl Fn(&E) -> TypeTag,
) -> Result<bool, PoolError> {
    match map.get(name).map(existing) {
        None => Ok(true),
        Some(bound) if bound.id == ty.id => Ok(false),
        Some(bound) => Err(PoolError::DuplicateName {
            kind,
            name: name.to_owned(),
            existing: bound.name,
            requested: ty.name,
        }),
    }
}

fn names<E>(map: &BTreeMap<String, E>) -> String {
    map.keys().map(String::as_str).collect::<Vec<_>>().join(", ")
}

/// Factories for every named type an archetype may mention.
pub struct Registry {
    components: BTreeMap<String, ComponentEntry>,
    arrays: BTreeMap<String, ArrayEntry>,
    spawn_rules: BTreeMap<String, FactoryEntry<Box<dyn SpawnRule>>>,
    behavior_nodes: BTreeMap<String, FactoryEntry<Box<dyn BehaviorNode>>>,
    systems: BTreeMap<String, FactoryEntry<Box<dyn System>>>,
    tags: BTreeSet<String>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("components", &self.components.keys().collect::<Vec<_>>())
            .field("arrays", &self.arrays.keys().collect::<Vec<_>>())
            .field("spawn_rules", &self.spawn_rules.keys().collect::<Vec<_>>())
            .field("behavior_nodes", &self.behavior_nodes.keys().collect::<Vec<_>>())
            .field("systems", &self.systems.keys().collect::<Vec<_>>())
            .field("tags", &self.tags)
            .finish()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// A registry holding the core types: the Destructible array, the
    /// composite behavior nodes and the [`RandomGroupCount`] size rule.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.arrays.insert(
            DESTRUCTIBLE.to_owned(),
            ArrayEntry {
                ty: TypeTag::of::<bool>(),
                allocate: allocate_array::<bool>,
                parse_value: parse_array_value::<bool>,
            },
        );
        registry.insert_behavior_node::<Sequence>("Sequence");
        registry.insert_behavior_node::<Selector>("Selector");
        registry.insert_behavior_node::<Succeed>("Succeed");
        registry.insert_behavior_node::<Wait>("Wait");
        registry.spawn_rules.insert(
            "RandomGroupCount".to_owned(),
            FactoryEntry {
                ty: TypeTag::of::<RandomGroupCount>(),
                parse: parse_spawn_rule::<RandomGroupCount>,
            },
        );
        registry
    }

    /// A registry with nothing registered, not even the core types.
    pub fn empty() -> Self {
        Self {
            components: BTreeMap::new(),
            arrays: BTreeMap::new(),
            spawn_rules: BTreeMap::new(),
            behavior_nodes: BTreeMap::new(),
            systems: BTreeMap::new(),
            tags: BTreeSet::new(),
        }
    }

    fn insert_behavior_node<N>(&mut self, name: &str)
    where
        N: BehaviorNode + DeserializeOwned + 'static,
    {
        self.behavior_nodes.insert(
            name.to_owned(),
            FactoryEntry {
                ty: TypeTag::of::<N>(),
                parse: parse_behavior_node::<N>,
            },
        );
    }

    // -- registration -------------------------------------------------------

    /// Register `T` as a per-pool component.
    pub fn register_component<T: Element>(&mut self, name: &str) -> Result<(), PoolError> {
        let ty = TypeTag::of::<T>();
        if claim(&self.components, "component", name, ty, |e| e.ty)? {
            self.components.insert(
                name.to_owned(),
                ComponentEntry {
                    ty,
                    allocate: allocate_component::<T>,
                    parse: parse_component::<T>,
                },
            );
        }
        Ok(())
    }

    /// Register `T` as the element type of a per-object component array.
    pub fn register_component_array<T: Element>(&mut self, name: &str) -> Result<(), PoolError> {
        let ty = TypeTag::of::<T>();
        if claim(&self.arrays, "component array", name, ty, |e| e.ty)? {
            self.arrays.insert(
                name.to_owned(),
                ArrayEntry {
                    ty,
                    allocate: allocate_array::<T>,
                    parse_value: parse_array_value::<T>,
                },
            );
        }
        Ok(())
    }

    pub fn register_spawn_rule<R>(&mut self, name: &str) -> Result<(), PoolError>
    where
        R: SpawnRule + DeserializeOwned + 'static,
    {
        let ty = TypeTag::of::<R>();
        if claim(&self.spawn_rules, "spawn rule", name, ty, |e| e.ty)? {
            self.spawn_rules.insert(
                name.to_owned(),
                FactoryEntry {
                    ty,
                    parse: parse_spawn_rule::<R>,
                },
            );
        }
        Ok(())
    }

    pub fn register_behavior_node<N>(&mut self, name: &str) -> Result<(), PoolError>
    where
        N: BehaviorNode + DeserializeOwned + 'static,
    {
        if claim(&self.behavior_nodes, "behavior node", name, TypeTag::of::<N>(), |e| e.ty)? {
            self.insert_behavior_node::<N>(name);
        }
        Ok(())
    }

    /// Register a system type. Scene data builds it with `Default` and then
    /// passes its parameters to [`System::configure`].
    pub fn register_system<S>(&mut self, name: &str) -> Result<(), PoolError>
    where
        S: System + Default + 'static,
    {
        let ty = TypeTag::of::<S>();
        if claim(&self.systems, "system", name, ty, |e| e.ty)? {
            self.systems.insert(
                name.to_owned(),
                FactoryEntry {
                    ty,
                    parse: build_system::<S>,
                },
            );
        }
        Ok(())
    }

    pub fn register_tag(&mut self, tag: &str) {
        self.tags.insert(tag.to_owned());
    }

    // -- lookup -------------------------------------------------------------

    pub fn has_component(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    pub fn has_component_array(&self, name: &str) -> bool {
        self.arrays.contains_key(name)
    }

    pub fn has_spawn_rule(&self, name: &str) -> bool {
        self.spawn_rules.contains_key(name)
    }

    pub fn has_behavior_node(&self, name: &str) -> bool {
        self.behavior_nodes.contains_key(name)
    }

    pub fn has_system(&self, name: &str) -> bool {
        self.systems.contains_key(name)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Element type registered for the array `name`.
    pub fn array_type_name(&self, name: &str) -> Option<&'static str> {
        self.arrays.get(name).map(|e| e.ty.name)
    }

    // -- factories ----------------------------------------------------------

    /// A default-valued component, or `None` if `name` is not registered.
    pub fn allocate_component(&self, name: &str) -> Option<Box<dyn Component>> {
        self.components.get(name).map(|e| (e.allocate)())
    }

    /// A default-filled array of `capacity` slots, or `None` if `name` is
    /// not registered.
    pub fn allocate_component_array(&self, name: &str, capacity: usize) -> Option<Box<dyn ComponentArray>> {
        self.arrays.get(name).map(|e| (e.allocate)(capacity))
    }

    pub fn parse_component(&self, name: &str, params: &Value) -> Result<Box<dyn Component>, PoolError> {
        let entry = self
            .components
            .get(name)
            .ok_or_else(|| PoolError::UnknownComponent {
                name: name.to_owned(),
                registered: names(&self.components),
            })?;
        (entry.parse)(params).map_err(|source| PoolError::Deserialization {
            kind: "component",
            name: name.to_owned(),
            source,
        })
    }

    /// Parse one element of array `name` into a single-slot array, used for
    /// object template values.
    pub fn parse_array_value(&self, name: &str, value: &Value) -> Result<Box<dyn ComponentArray>, PoolError> {
        let entry = self
            .arrays
            .get(name)
            .ok_or_else(|| self.unknown_array(name))?;
        (entry.parse_value)(value).map_err(|source| PoolError::Deserialization {
            kind: "component array",
            name: name.to_owned(),
            source,
        })
    }

    pub(crate) fn unknown_array(&self, name: &str) -> PoolError {
        PoolError::UnknownComponentArray {
            name: name.to_owned(),
            registered: names(&self.arrays),
        }
    }

    pub fn parse_spawn_rule(&self, name: &str, params: &Value) -> Result<Box<dyn SpawnRule>, PoolError> {
        let entry = self
            .spawn_rules
            .get(name)
            .ok_or_else(|| PoolError::UnknownSpawnRule {
                name: name.to_owned(),
                registered: names(&self.spawn_rules),
            })?;
        (entry.parse)(params).map_err(|source| PoolError::Deserialization {
            kind: "spawn rule",
            name: name.to_owned(),
            source,
        })
    }

    pub fn parse_behavior_node(&self, name: &str, params: &Value) -> Result<Box<dyn BehaviorNode>, PoolError> {
        let entry = self
            .behavior_nodes
            .get(name)
            .ok_or_else(|| PoolError::UnknownBehaviorNode {
                name: name.to_owned(),
                registered: names(&self.behavior_nodes),
            })?;
        (entry.parse)(params).map_err(|source| PoolError::Deserialization {
            kind: "behavior node",
            name: name.to_owned(),
            source,
        })
    }

    pub fn parse_system(&self, name: &str, params: &Value) -> Result<Box<dyn System>, PoolError> {
        let entry = self.systems.get(name).ok_or_else(|| PoolError::UnknownSystem {
            name: name.to_owned(),
            registered: names(&self.systems),
        })?;
        (entry.parse)(params).map_err(|source| PoolError::Deserialization {
            kind: "system",
            name: name.to_owned(),
            source,
        })
    }

    /// Fails with [`PoolError::UnknownTag`] unless `tag` is registered.
    pub fn check_tag(&self, tag: &str) -> Result<(), PoolError> {
        if self.has_tag(tag) {
            Ok(())
        } else {
            Err(PoolError::UnknownTag {
                name: tag.to_owned(),
                registered: self.tags.iter().map(String::as_str).collect::<Vec<_>>().join(", "),
            })
        }
    }

    /// Registered names per kind, sorted.
    pub fn component_names(&self) -> Vec<&str> {
        self.components.keys().map(String::as_str).collect()
    }

    pub fn component_array_names(&self) -> Vec<&str> {
        self.arrays.keys().map(String::as_str).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Health(u32);

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    struct Collider {
        radius: f32,
        solid: bool,
    }

    #[test]
    fn core_types_are_preregistered() {
        let registry = Registry::new();
        assert!(registry.has_component_array(DESTRUCTIBLE));
        for node in ["Sequence", "Selector", "Succeed", "Wait"] {
            assert!(registry.has_behavior_node(node), "{node}");
        }
        assert!(registry.has_spawn_rule("RandomGroupCount"));
        assert!(!Registry::empty().has_component_array(DESTRUCTIBLE));
    }

    #[test]
    fn same_type_reregistration_is_noop() {
        let mut registry = Registry::new();
        registry.register_component_array::<Health>("Health").unwrap();
        registry.register_component_array::<Health>("Health").unwrap();
        assert_eq!(registry.component_array_names(), vec![DESTRUCTIBLE, "Health"]);
    }

    #[test]
    fn conflicting_registration_is_rejected() {
        let mut registry = Registry::new();
        registry.register_component::<Health>("Health").unwrap();
        let err = registry.register_component::<Collider>("Health").unwrap_err();
        assert!(matches!(err, PoolError::DuplicateName { kind: "component", .. }));
        assert!(err.to_string().contains("Health"));
    }

    #[test]
    fn allocate_unknown_names_returns_none() {
        let registry = Registry::new();
        assert!(registry.allocate_component("Nope").is_none());
        assert!(registry.allocate_component_array("Nope", 4).is_none());
    }

    #[test]
    fn allocate_array_with_capacity() {
        let mut registry = Registry::new();
        registry.register_component_array::<Health>("Health").unwrap();
        let array = registry.allocate_component_array("Health", 6).unwrap();
        assert_eq!(array.capacity(), 6);
        assert!(array.as_any().downcast_ref::<TypedArray<Health>>().is_some());
    }

    #[test]
    fn parse_component_with_defaults() {
        let mut registry = Registry::new();
        registry.register_component::<Collider>("Collider").unwrap();
        let collider = registry.parse_component("Collider", &json!({"radius": 2.0})).unwrap();
        assert_eq!(
            collider.as_any().downcast_ref::<Collider>(),
            Some(&Collider { radius: 2.0, solid: false })
        );
        let default = registry.parse_component("Collider", &Value::Null).unwrap();
        assert_eq!(default.as_any().downcast_ref::<Collider>(), Some(&Collider::default()));
    }

    #[test]
    fn unknown_names_list_registered_ones() {
        let mut registry = Registry::new();
        registry.register_component::<Health>("Health").unwrap();
        let err = registry.parse_component("Shield", &Value::Null).unwrap_err();
        assert_eq!(
            err.to_string(),
            "component type 'Shield' not registered. Registered components: [Health]"
        );
    }

    #[test]
    fn bad_parameters_are_deserialization_errors() {
        let registry = Registry::new();
        let err = registry
            .parse_behavior_node("Wait", &json!({"ticks": "soon"}))
            .unwrap_err();
        assert!(matches!(err, PoolError::Deserialization { kind: "behavior node", .. }));
    }

    #[test]
    fn unit_nodes_accept_missing_params() {
        let registry = Registry::new();
        assert!(registry.parse_behavior_node("Sequence", &Value::Null).is_ok());
        assert!(registry
            .parse_spawn_rule("RandomGroupCount", &json!({"min": 1, "max": 3}))
            .is_ok());
    }

    #[test]
    fn tags_must_be_registered() {
        let mut registry = Registry::new();
        registry.register_tag("enemy");
        assert!(registry.check_tag("enemy").is_ok());
        assert!(matches!(
            registry.check_tag("boss"),
            Err(PoolError::UnknownTag { .. })
        ));
    }
}
