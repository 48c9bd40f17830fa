//! Serializable export of a pool's live contents.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The live objects and pool components of one pool, as JSON values.
///
/// Only slots `[0, active)` are exported, so two pools with the same live
/// contents produce equal snapshots whatever their free slots hold. Maps are
/// `BTreeMap`s for a deterministic serialization order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub name: String,
    pub capacity: usize,
    pub active: usize,
    /// Array name to a JSON array of `active` elements.
    pub arrays: BTreeMap<String, serde_json::Value>,
    /// Pool component name to its JSON value.
    pub components: BTreeMap<String, serde_json::Value>,
}

impl PoolSnapshot {
    pub fn array(&self, name: &str) -> Option<&serde_json::Value> {
        self.arrays.get(name)
    }

    pub fn component(&self, name: &str) -> Option<&serde_json::Value> {
        self.components.get(name)
    }
}

#[cfg(test)]
mod tests {
    use crate::pool::Pool;

    #[test]
    fn snapshot_ignores_free_slots() {
        let mut a = Pool::new("p", 4);
        a.add_array::<i32>("v");
        a.create_objects("", 2);
        a.component_array_mut::<i32>("v").set(3, 77);

        let mut b = Pool::new("p", 4);
        b.add_array::<i32>("v");
        b.create_objects("", 2);

        assert_eq!(a.snapshot(), b.snapshot());
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let mut pool = Pool::new("p", 2);
        pool.insert_component("Damage", 5u32);
        pool.create_objects("", 1);
        let snapshot = pool.snapshot();
        let text = serde_json::to_string(&snapshot).unwrap();
        let back: super::PoolSnapshot = serde_json::from_str(&text).unwrap();
        assert_eq!(back, snapshot);
        assert_eq!(back.component("Damage"), Some(&serde_json::json!(5)));
        assert_eq!(back.array("Destructible"), Some(&serde_json::json!([false])));
    }
}
