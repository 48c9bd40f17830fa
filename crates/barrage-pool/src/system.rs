//! Systems and the pool set they run over.
//!
//! A [`System`] declares the kinds of pools it wants as [`PoolType`]s. When a
//! pool is added to a space, every system is asked to
//! [`subscribe`](System::subscribe) it, and the pool joins each group whose
//! requirements it meets. Systems then iterate their groups through
//! [`Subscriptions::update_pool_group`] and
//! [`Subscriptions::update_interaction`] without looking pools up by name.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::pool::Pool;
use crate::random::Random;
use crate::PoolError;

// ---------------------------------------------------------------------------
// PoolId / PoolSet
// ---------------------------------------------------------------------------

/// Stable handle to a pool in a [`PoolSet`]. Ids are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PoolId(pub u32);

impl PoolId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// All pools of a space, addressable by id or by name.
#[derive(Debug, Clone, Default)]
pub struct PoolSet {
    slots: Vec<Option<Pool>>,
    names: HashMap<String, PoolId>,
}

impl PoolSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pool. Pool names are unique within a set.
    pub fn insert(&mut self, pool: Pool) -> Result<PoolId, PoolError> {
        if self.names.contains_key(pool.name()) {
            return Err(PoolError::DuplicatePool(pool.name().to_owned()));
        }
        let id = PoolId(self.slots.len() as u32);
        self.names.insert(pool.name().to_owned(), id);
        self.slots.push(Some(pool));
        Ok(id)
    }

    pub fn remove(&mut self, id: PoolId) -> Option<Pool> {
        let pool = self.slots.get_mut(id.index())?.take()?;
        self.names.remove(pool.name());
        Some(pool)
    }

    pub fn get(&self, id: PoolId) -> Option<&Pool> {
        self.slots.get(id.index())?.as_ref()
    }

    pub fn get_mut(&mut self, id: PoolId) -> Option<&mut Pool> {
        self.slots.get_mut(id.index())?.as_mut()
    }

    pub fn id_of(&self, name: &str) -> Option<PoolId> {
        self.names.get(name).copied()
    }

    pub fn by_name(&self, name: &str) -> Option<&Pool> {
        self.get(self.id_of(name)?)
    }

    pub fn by_name_mut(&mut self, name: &str) -> Option<&mut Pool> {
        let id = self.id_of(name)?;
        self.get_mut(id)
    }

    /// Two distinct pools borrowed mutably at once. `None` if `a == b` or
    /// either pool is missing.
    pub fn pair_mut(&mut self, a: PoolId, b: PoolId) -> Option<(&mut Pool, &mut Pool)> {
        if a == b {
            return None;
        }
        let (low, high) = if a < b { (a, b) } else { (b, a) };
        if high.index() >= self.slots.len() {
            return None;
        }
        let (head, tail) = self.slots.split_at_mut(high.index());
        let low_pool = head[low.index()].as_mut()?;
        let high_pool = tail[0].as_mut()?;
        if a < b {
            Some((low_pool, high_pool))
        } else {
            Some((high_pool, low_pool))
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Live pools in id order.
    pub fn iter(&self) -> impl Iterator<Item = (PoolId, &Pool)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|pool| (PoolId(i as u32), pool)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (PoolId, &mut Pool)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_mut().map(|pool| (PoolId(i as u32), pool)))
    }

    pub fn ids(&self) -> Vec<PoolId> {
        self.iter().map(|(id, _)| id).collect()
    }
}

// ---------------------------------------------------------------------------
// PoolType / Subscriptions
// ---------------------------------------------------------------------------

/// Requirements a pool must meet to join a system's group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolType {
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub arrays: Vec<String>,
    #[serde(default)]
    pub components: Vec<String>,
}

impl PoolType {
    /// A group with no requirements; every pool matches until some are
    /// added.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            ..Self::default()
        }
    }

    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tags.push(tag.to_owned());
        self
    }

    pub fn with_array(mut self, array: &str) -> Self {
        self.arrays.push(array.to_owned());
        self
    }

    pub fn with_component(mut self, component: &str) -> Self {
        self.components.push(component.to_owned());
        self
    }

    /// Whether `pool` has every required tag, array and component.
    pub fn matches(&self, pool: &Pool) -> bool {
        self.tags.iter().all(|tag| pool.has_tag(tag))
            && self.arrays.iter().all(|array| pool.has_component_array(array))
            && self
                .components
                .iter()
                .all(|component| pool.has_component(component))
    }
}

/// A system's declared pool types and the pools currently matching each.
#[derive(Debug, Clone, Default)]
pub struct Subscriptions {
    types: Vec<PoolType>,
    groups: Vec<Vec<PoolId>>,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, pool_type: PoolType) -> Self {
        self.add_type(pool_type);
        self
    }

    pub fn add_type(&mut self, pool_type: PoolType) {
        self.types.push(pool_type);
        self.groups.push(Vec::new());
    }

    pub fn pool_types(&self) -> &[PoolType] {
        &self.types
    }

    /// Add `id` to every group `pool` matches. Returns whether it joined any.
    pub fn subscribe(&mut self, id: PoolId, pool: &Pool) -> bool {
        let mut joined = false;
        for (pool_type, group) in self.types.iter().zip(self.groups.iter_mut()) {
            if pool_type.matches(pool) && !group.contains(&id) {
                group.push(id);
                joined = true;
            }
        }
        joined
    }

    /// Remove `id` from every group.
    pub fn unsubscribe(&mut self, id: PoolId) {
        for group in &mut self.groups {
            group.retain(|&member| member != id);
        }
    }

    /// Pools in the group named `name`, in subscription order. Empty for an
    /// unknown group.
    pub fn group(&self, name: &str) -> &[PoolId] {
        match self.types.iter().position(|t| t.name == name) {
            Some(index) => &self.groups[index],
            None => &[],
        }
    }

    /// Call `f` on every pool of group `group`.
    pub fn update_pool_group<F>(&self, group: &str, pools: &mut PoolSet, mut f: F)
    where
        F: FnMut(PoolId, &mut Pool),
    {
        for &id in self.group(group) {
            if let Some(pool) = pools.get_mut(id) {
                f(id, pool);
            }
        }
    }

    /// Call `f` on every pair `(a, b)` with `a` in `first` and `b` in `second`.
    /// A pool is never paired with itself.
    pub fn update_interaction<F>(&self, first: &str, second: &str, pools: &mut PoolSet, mut f: F)
    where
        F: FnMut(&mut Pool, &mut Pool),
    {
        for &a in self.group(first) {
            for &b in self.group(second) {
                if let Some((pool_a, pool_b)) = pools.pair_mut(a, b) {
                    f(pool_a, pool_b);
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

/// Everything a system can touch during one tick.
#[derive(Debug)]
pub struct SystemContext<'a> {
    pub pools: &'a mut PoolSet,
    pub random: &'a mut Random,
    /// Fixed simulation step in seconds.
    pub dt: f32,
    pub tick: u64,
}

/// A per-tick update over the pools matching the system's pool types.
pub trait System: Send + Sync {
    fn subscriptions(&self) -> &Subscriptions;

    fn subscriptions_mut(&mut self) -> &mut Subscriptions;

    fn update(&mut self, ctx: &mut SystemContext<'_>);

    /// Apply parameters from scene data. The default accepts anything.
    fn configure(&mut self, _params: &serde_json::Value) -> Result<(), serde_json::Error> {
        Ok(())
    }

    fn subscribe(&mut self, id: PoolId, pool: &Pool) -> bool {
        self.subscriptions_mut().subscribe(id, pool)
    }

    fn unsubscribe(&mut self, id: PoolId) {
        self.subscriptions_mut().unsubscribe(id);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(name: &str, tags: &[&str]) -> Pool {
        let mut pool = Pool::new(name, 4);
        for tag in tags {
            pool.add_tag(tag);
        }
        pool
    }

    #[test]
    fn duplicate_pool_names_are_rejected() {
        let mut pools = PoolSet::new();
        pools.insert(pool("a", &[])).unwrap();
        let err = pools.insert(pool("a", &[])).unwrap_err();
        assert!(matches!(err, PoolError::DuplicatePool(name) if name == "a"));
    }

    #[test]
    fn ids_stay_stable_after_removal() {
        let mut pools = PoolSet::new();
        let a = pools.insert(pool("a", &[])).unwrap();
        let b = pools.insert(pool("b", &[])).unwrap();
        assert!(pools.remove(a).is_some());
        assert!(pools.get(a).is_none());
        assert_eq!(pools.by_name("b").map(Pool::name), Some("b"));
        let c = pools.insert(pool("a", &[])).unwrap();
        assert_ne!(c, a);
        assert_eq!(pools.ids(), vec![b, c]);
    }

    #[test]
    fn pair_mut_returns_pools_in_argument_order() {
        let mut pools = PoolSet::new();
        let a = pools.insert(pool("a", &[])).unwrap();
        let b = pools.insert(pool("b", &[])).unwrap();
        let (first, second) = pools.pair_mut(b, a).unwrap();
        assert_eq!((first.name(), second.name()), ("b", "a"));
        assert!(pools.pair_mut(a, a).is_none());
    }

    #[test]
    fn subscription_matches_tags_arrays_and_components() {
        let mut subscriptions = Subscriptions::new()
            .with_type(PoolType::new("moving").with_array("Speed"))
            .with_type(PoolType::new("enemies").with_tag("enemy").with_component("Damage"));

        let mut bullets = pool("bullets", &[]);
        bullets.add_array::<f32>("Speed");
        let mut enemies = pool("enemies", &["enemy"]);
        enemies.insert_component("Damage", 3u32);

        assert!(subscriptions.subscribe(PoolId(0), &bullets));
        assert!(subscriptions.subscribe(PoolId(1), &enemies));
        assert!(!subscriptions.subscribe(PoolId(2), &pool("walls", &[])));
        assert_eq!(subscriptions.group("moving"), &[PoolId(0)]);
        assert_eq!(subscriptions.group("enemies"), &[PoolId(1)]);
        assert!(subscriptions.group("unknown").is_empty());

        subscriptions.unsubscribe(PoolId(0));
        assert!(subscriptions.group("moving").is_empty());
    }

    #[test]
    fn interaction_skips_identical_pools() {
        let mut pools = PoolSet::new();
        pools.insert(pool("a", &["solid"])).unwrap();
        pools.insert(pool("b", &["solid"])).unwrap();
        let mut subscriptions = Subscriptions::new().with_type(PoolType::new("solid").with_tag("solid"));
        for (id, pool) in pools.iter() {
            subscriptions.subscribe(id, pool);
        }
        let mut pairs = Vec::new();
        subscriptions.update_interaction("solid", "solid", &mut pools, |x, y| {
            pairs.push((x.name().to_owned(), y.name().to_owned()));
        });
        assert_eq!(
            pairs,
            vec![("a".to_owned(), "b".to_owned()), ("b".to_owned(), "a".to_owned())]
        );
    }
}
