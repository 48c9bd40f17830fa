//! The [`Pool`]: a homogeneous set of objects stored as parallel component
//! arrays with a live prefix.
//!
//! # Layout
//!
//! A pool has a fixed `capacity` and an `active` count. Slots `[0, active)`
//! are live; `[active, capacity)` are free. Every component array owned by the
//! pool has exactly `capacity` slots, so the same index addresses the same
//! object in every array. Indices are stable only between compactions.
//!
//! # Lifecycle within a tick
//!
//! 1. **Queue.** [`Pool::queue_spawns`] finalizes a spawn type's group counts,
//!    truncates the batch to the free capacity and runs the spawn rules
//!    against the reserved range `[active + queued, active + queued + n)`.
//!    The reserved slots are written but not yet live.
//! 2. **Commit.** [`Pool::spawn_objects`] adds every reserved slot to the
//!    live prefix. It must run exactly once per tick, after all queuing.
//! 3. **Compact.** [`Pool::handle_destructions`] finds the first slot whose
//!    Destructible flag is set and stably partitions every array around the
//!    dead slots. Spawn-type state and the behavior tree are compacted with
//!    the same flags, and the Destructible array itself goes last because its
//!    result is the new active count. A pool with no dead objects is left
//!    untouched.
//!
//! ```
//! use barrage_pool::prelude::*;
//!
//! let mut pool = Pool::new("bullets", 8);
//! pool.add_array::<f32>("Speed");
//! let created = pool.create_objects("", 5);
//! assert_eq!(created, 0..5);
//!
//! pool.mark_destroyed(1);
//! pool.mark_destroyed(3);
//! assert_eq!(pool.handle_destructions(), 2);
//! assert_eq!(pool.active_count(), 3);
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Range;

use tracing::{trace, warn};

use crate::array::{compact_flags, first_destroyed, ComponentArray, Element, TypedArray, DESTRUCTIBLE};
use crate::behavior::BehaviorTree;
use crate::component::Component;
use crate::random::Random;
use crate::snapshot::PoolSnapshot;
use crate::spawn::SpawnType;
use crate::PoolError;

// ---------------------------------------------------------------------------
// PoolData
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct NamedArray {
    name: String,
    array: Box<dyn ComponentArray>,
}

/// The component arrays and pool components of a pool.
///
/// Split from [`Pool`] so spawn rules and behavior nodes can borrow one pool's
/// data mutably while the pool's spawn types or behavior tree are borrowed
/// too. Arrays keep their insertion order, which fixes the order compaction
/// visits them in.
#[derive(Debug, Clone, Default)]
pub struct PoolData {
    arrays: Vec<NamedArray>,
    array_index: HashMap<String, usize>,
    components: BTreeMap<String, Box<dyn Component>>,
}

impl PoolData {
    pub fn new() -> Self {
        Self::default()
    }

    // -- component arrays ---------------------------------------------------

    /// Add `array` under `name`, replacing any array already stored there.
    pub fn add_component_array(&mut self, name: &str, array: Box<dyn ComponentArray>) {
        match self.array_index.get(name) {
            Some(&position) => self.arrays[position].array = array,
            None => {
                self.array_index.insert(name.to_owned(), self.arrays.len());
                self.arrays.push(NamedArray {
                    name: name.to_owned(),
                    array,
                });
            }
        }
    }

    pub fn has_component_array(&self, name: &str) -> bool {
        self.array_index.contains_key(name)
    }

    /// Array names in insertion order.
    pub fn component_array_names(&self) -> impl Iterator<Item = &str> {
        self.arrays.iter().map(|slot| slot.name.as_str())
    }

    pub fn dyn_component_array(&self, name: &str) -> Option<&dyn ComponentArray> {
        let position = *self.array_index.get(name)?;
        Some(self.arrays[position].array.as_ref())
    }

    pub fn dyn_component_array_mut(&mut self, name: &str) -> Option<&mut dyn ComponentArray> {
        let position = *self.array_index.get(name)?;
        Some(self.arrays[position].array.as_mut())
    }

    /// The array stored under `name`, if it exists and stores `T`.
    pub fn get_component_array<T: Element>(&self, name: &str) -> Option<&TypedArray<T>> {
        self.dyn_component_array(name)?
            .as_any()
            .downcast_ref::<TypedArray<T>>()
    }

    pub fn get_component_array_mut<T: Element>(&mut self, name: &str) -> Option<&mut TypedArray<T>> {
        self.dyn_component_array_mut(name)?
            .as_any_mut()
            .downcast_mut::<TypedArray<T>>()
    }

    /// The array stored under `name`.
    ///
    /// # Panics
    ///
    /// Panics if the pool has no array called `name` or if it stores a type
    /// other than `T`. Both are bugs in the calling code.
    pub fn component_array<T: Element>(&self, name: &str) -> &TypedArray<T> {
        let array = self
            .dyn_component_array(name)
            .unwrap_or_else(|| self.missing_array(name));
        array
            .as_any()
            .downcast_ref::<TypedArray<T>>()
            .unwrap_or_else(|| array_type_mismatch::<T>(name, array))
    }

    /// Mutable access to the array stored under `name`.
    ///
    /// # Panics
    ///
    /// Same conditions as [`component_array`](Self::component_array).
    pub fn component_array_mut<T: Element>(&mut self, name: &str) -> &mut TypedArray<T> {
        let Some(&position) = self.array_index.get(name) else {
            self.missing_array(name)
        };
        let array = self.arrays[position].array.as_mut();
        let element = array.element_type_name();
        match array.as_any_mut().downcast_mut::<TypedArray<T>>() {
            Some(typed) => typed,
            None => panic!(
                "component array '{name}' stores {element}, not {}",
                std::any::type_name::<T>()
            ),
        }
    }

    /// Two different arrays borrowed mutably at once.
    ///
    /// # Panics
    ///
    /// Panics if `first == second`, or under the conditions of
    /// [`component_array`](Self::component_array).
    pub fn component_array_pair_mut<A: Element, B: Element>(
        &mut self,
        first: &str,
        second: &str,
    ) -> (&mut TypedArray<A>, &mut TypedArray<B>) {
        assert_ne!(first, second, "cannot borrow component array '{first}' twice");
        let Some(&a) = self.array_index.get(first) else {
            self.missing_array(first)
        };
        let Some(&b) = self.array_index.get(second) else {
            self.missing_array(second)
        };
        let (slot_a, slot_b) = if a < b {
            let (head, tail) = self.arrays.split_at_mut(b);
            (&mut head[a], &mut tail[0])
        } else {
            let (head, tail) = self.arrays.split_at_mut(a);
            (&mut tail[0], &mut head[b])
        };
        (downcast_slot(slot_a), downcast_slot(slot_b))
    }

    fn missing_array(&self, name: &str) -> ! {
        let names: Vec<&str> = self.component_array_names().collect();
        panic!(
            "component array '{name}' is not part of this pool. Arrays: [{}]",
            names.join(", ")
        )
    }

    /// Grow every array to at least `capacity` slots.
    pub fn set_capacity(&mut self, capacity: usize) {
        for slot in &mut self.arrays {
            slot.array.set_capacity(capacity);
        }
    }

    // -- pool components ----------------------------------------------------

    /// Add `component` under `name`, replacing any existing value.
    pub fn add_component(&mut self, name: &str, component: Box<dyn Component>) {
        self.components.insert(name.to_owned(), component);
    }

    /// Typed convenience for [`add_component`](Self::add_component).
    pub fn insert_component<T: Element>(&mut self, name: &str, value: T) {
        self.add_component(name, Box::new(value));
    }

    pub fn has_component(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    /// Component names in sorted order.
    pub fn component_names(&self) -> impl Iterator<Item = &str> {
        self.components.keys().map(String::as_str)
    }

    pub fn get_component<T: Element>(&self, name: &str) -> Option<&T> {
        self.components.get(name)?.as_any().downcast_ref::<T>()
    }

    pub fn get_component_mut<T: Element>(&mut self, name: &str) -> Option<&mut T> {
        self.components.get_mut(name)?.as_any_mut().downcast_mut::<T>()
    }

    /// # Panics
    ///
    /// Panics if the component is missing or stores a type other than `T`.
    pub fn component<T: Element>(&self, name: &str) -> &T {
        match self.components.get(name) {
            Some(value) => value.as_any().downcast_ref::<T>().unwrap_or_else(|| {
                panic!(
                    "component '{name}' stores {}, not {}",
                    value.type_name(),
                    std::any::type_name::<T>()
                )
            }),
            None => panic!("component '{name}' is not part of this pool"),
        }
    }

    /// # Panics
    ///
    /// Same conditions as [`component`](Self::component).
    pub fn component_mut<T: Element>(&mut self, name: &str) -> &mut T {
        match self.components.get_mut(name) {
            Some(value) => {
                let stored = value.type_name();
                match value.as_any_mut().downcast_mut::<T>() {
                    Some(typed) => typed,
                    None => panic!(
                        "component '{name}' stores {stored}, not {}",
                        std::any::type_name::<T>()
                    ),
                }
            }
            None => panic!("component '{name}' is not part of this pool"),
        }
    }

    // -- destruction --------------------------------------------------------

    /// Destructible flags, if this data carries them.
    pub fn destructible(&self) -> Option<&[bool]> {
        self.get_component_array::<bool>(DESTRUCTIBLE)
            .map(TypedArray::as_slice)
    }

    fn destructible_mut(&mut self) -> Option<&mut TypedArray<bool>> {
        self.get_component_array_mut::<bool>(DESTRUCTIBLE)
    }

    /// Compact every array over `[write_index, end_index)`.
    ///
    /// Arrays other than Destructible are compacted first, then `aux` sees the
    /// still-unmodified flags so auxiliary per-object state can follow, and
    /// finally the Destructible array is compacted against itself. Returns the
    /// new end of the live range.
    fn compact(&mut self, write_index: usize, end_index: usize, aux: impl FnOnce(&[bool])) -> usize {
        let Some(&position) = self.array_index.get(DESTRUCTIBLE) else {
            return end_index;
        };
        let (before, rest) = self.arrays.split_at_mut(position);
        let Some((flags_slot, after)) = rest.split_first_mut() else {
            return end_index;
        };
        let Some(flags) = flags_slot
            .array
            .as_any_mut()
            .downcast_mut::<TypedArray<bool>>()
        else {
            panic!("the {DESTRUCTIBLE} array must store bool");
        };

        for slot in before.iter_mut().chain(after.iter_mut()) {
            slot.array
                .handle_destructions(flags.as_slice(), write_index, end_index);
        }
        aux(flags.as_slice());
        compact_flags(flags.as_mut_slice(), write_index, end_index)
    }

    /// Reset `range` to `template`'s values (or type defaults) and clear the
    /// Destructible flags so the slots come up live.
    fn initialize(&mut self, template: Option<&ObjectTemplate>, range: Range<usize>) {
        for slot in &mut self.arrays {
            match template.and_then(|t| t.value(&slot.name)) {
                Some(value) => slot.array.copy_value(value, 0, range.clone()),
                None => slot.array.reset_range(range.clone()),
            }
        }
        if let Some(flags) = self.destructible_mut() {
            flags.fill(range, &false);
        }
    }

    fn snapshot_arrays(&self, live: usize) -> BTreeMap<String, serde_json::Value> {
        self.arrays
            .iter()
            .map(|slot| (slot.name.clone(), slot.array.to_json(0..live)))
            .collect()
    }

    fn snapshot_components(&self) -> BTreeMap<String, serde_json::Value> {
        self.components
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect()
    }
}

fn downcast_slot<T: Element>(slot: &mut NamedArray) -> &mut TypedArray<T> {
    let element = slot.array.element_type_name();
    match slot.array.as_any_mut().downcast_mut::<TypedArray<T>>() {
        Some(typed) => typed,
        None => panic!(
            "component array '{}' stores {element}, not {}",
            slot.name,
            std::any::type_name::<T>()
        ),
    }
}

fn array_type_mismatch<T: Element>(name: &str, array: &dyn ComponentArray) -> ! {
    panic!(
        "component array '{name}' stores {}, not {}",
        array.element_type_name(),
        std::any::type_name::<T>()
    )
}

// ---------------------------------------------------------------------------
// ObjectTemplate
// ---------------------------------------------------------------------------

/// Starting values for new objects, keyed by component-array name.
///
/// Each value is held in a single-slot array of the same element type as the
/// pool's array, so initialization is a typed copy with no parsing.
#[derive(Debug, Clone, Default)]
pub struct ObjectTemplate {
    name: String,
    values: Vec<(String, Box<dyn ComponentArray>)>,
}

impl ObjectTemplate {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            values: Vec::new(),
        }
    }

    /// Builder-style typed [`set_value`](Self::set_value).
    pub fn with_value<T: Element>(mut self, array: &str, value: T) -> Self {
        self.set_value(array, Box::new(TypedArray::from_value(value)));
        self
    }

    /// Set the starting value for `array`. `value` must be a single-slot array.
    pub fn set_value(&mut self, array: &str, value: Box<dyn ComponentArray>) {
        match self.values.iter_mut().find(|(name, _)| name == array) {
            Some((_, existing)) => *existing = value,
            None => self.values.push((array.to_owned(), value)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self, array: &str) -> Option<&dyn ComponentArray> {
        self.values
            .iter()
            .find(|(name, _)| name == array)
            .map(|(_, value)| value.as_ref())
    }

    /// Names of the arrays this template sets.
    pub fn array_names(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(name, _)| name.as_str())
    }
}

fn find_template<'t>(
    templates: &'t [ObjectTemplate],
    name: &str,
    pool: &str,
) -> Option<&'t ObjectTemplate> {
    if name.is_empty() {
        return None;
    }
    let found = templates.iter().find(|t| t.name == name);
    if found.is_none() {
        warn!(pool = %pool, archetype = %name, "unknown object archetype, using defaults");
    }
    found
}

// ---------------------------------------------------------------------------
// Pool
// ---------------------------------------------------------------------------

/// A homogeneous set of objects with a fixed capacity and a live prefix.
#[derive(Debug, Clone)]
pub struct Pool {
    name: String,
    capacity: usize,
    active: usize,
    queued: usize,
    tags: BTreeSet<String>,
    data: PoolData,
    templates: Vec<ObjectTemplate>,
    spawn_types: Vec<SpawnType>,
    behavior: Option<BehaviorTree>,
}

impl Pool {
    /// An empty pool holding at most `capacity` objects. The Destructible
    /// array is always present.
    pub fn new(name: &str, capacity: usize) -> Self {
        let mut data = PoolData::new();
        data.add_component_array(DESTRUCTIBLE, Box::new(TypedArray::<bool>::new(capacity)));
        Self {
            name: name.to_owned(),
            capacity,
            active: 0,
            queued: 0,
            tags: BTreeSet::new(),
            data,
            templates: Vec::new(),
            spawn_types: Vec::new(),
            behavior: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of live objects. Slots `[0, active_count)` are live.
    pub fn active_count(&self) -> usize {
        self.active
    }

    /// Slots reserved by queued spawns and not yet committed.
    pub fn queued_count(&self) -> usize {
        self.queued
    }

    /// Slots neither live nor reserved.
    pub fn free_count(&self) -> usize {
        self.capacity - self.active - self.queued
    }

    pub fn is_full(&self) -> bool {
        self.free_count() == 0
    }

    pub fn is_empty(&self) -> bool {
        self.active == 0
    }

    pub fn data(&self) -> &PoolData {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut PoolData {
        &mut self.data
    }

    // -- arrays and components ----------------------------------------------

    /// Add a component array, grown to the pool's capacity. The Destructible
    /// array is managed by the pool and cannot be replaced.
    pub fn add_component_array(&mut self, name: &str, mut array: Box<dyn ComponentArray>) {
        if name == DESTRUCTIBLE {
            return;
        }
        array.set_capacity(self.capacity);
        self.data.add_component_array(name, array);
    }

    /// Typed convenience: add a default-filled array of `T`.
    pub fn add_array<T: Element>(&mut self, name: &str) {
        self.add_component_array(name, Box::new(TypedArray::<T>::new(self.capacity)));
    }

    /// See [`PoolData::component_array`].
    pub fn component_array<T: Element>(&self, name: &str) -> &TypedArray<T> {
        self.data.component_array(name)
    }

    /// See [`PoolData::component_array_mut`].
    pub fn component_array_mut<T: Element>(&mut self, name: &str) -> &mut TypedArray<T> {
        self.data.component_array_mut(name)
    }

    pub fn get_component_array<T: Element>(&self, name: &str) -> Option<&TypedArray<T>> {
        self.data.get_component_array(name)
    }

    /// Checked form of [`component_array`](Self::component_array) for callers
    /// validating configuration up front.
    pub fn try_component_array<T: Element>(&self, name: &str) -> Result<&TypedArray<T>, PoolError> {
        let array = self
            .data
            .dyn_component_array(name)
            .ok_or_else(|| PoolError::MissingArray {
                pool: self.name.clone(),
                name: name.to_owned(),
            })?;
        array
            .as_any()
            .downcast_ref::<TypedArray<T>>()
            .ok_or_else(|| PoolError::TypeMismatch {
                name: name.to_owned(),
                stored: array.element_type_name(),
                requested: std::any::type_name::<T>(),
            })
    }

    pub fn has_component_array(&self, name: &str) -> bool {
        self.data.has_component_array(name)
    }

    pub fn insert_component<T: Element>(&mut self, name: &str, value: T) {
        self.data.insert_component(name, value);
    }

    pub fn add_component(&mut self, name: &str, component: Box<dyn Component>) {
        self.data.add_component(name, component);
    }

    /// See [`PoolData::component`].
    pub fn component<T: Element>(&self, name: &str) -> &T {
        self.data.component(name)
    }

    pub fn get_component<T: Element>(&self, name: &str) -> Option<&T> {
        self.data.get_component(name)
    }

    pub fn has_component(&self, name: &str) -> bool {
        self.data.has_component(name)
    }

    // -- tags ---------------------------------------------------------------

    pub fn add_tag(&mut self, tag: &str) {
        self.tags.insert(tag.to_owned());
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    // -- object templates ---------------------------------------------------

    /// Add or replace a named object template.
    pub fn add_object_template(&mut self, template: ObjectTemplate) {
        match self.templates.iter_mut().find(|t| t.name == template.name) {
            Some(existing) => *existing = template,
            None => self.templates.push(template),
        }
    }

    pub fn object_template(&self, name: &str) -> Option<&ObjectTemplate> {
        self.templates.iter().find(|t| t.name == name)
    }

    // -- spawn types --------------------------------------------------------

    /// Add a spawn type this pool is the source of. Returns its index.
    pub fn add_spawn_type(&mut self, mut spawn_type: SpawnType) -> usize {
        spawn_type.set_capacity(self.capacity);
        self.spawn_types.push(spawn_type);
        self.spawn_types.len() - 1
    }

    pub fn spawn_types(&self) -> &[SpawnType] {
        &self.spawn_types
    }

    pub fn spawn_types_mut(&mut self) -> &mut [SpawnType] {
        &mut self.spawn_types
    }

    pub fn spawn_type_index(&self, name: &str) -> Option<usize> {
        self.spawn_types.iter().position(|s| s.name() == name)
    }

    pub fn spawn_type(&self, name: &str) -> Option<&SpawnType> {
        self.spawn_types.iter().find(|s| s.name() == name)
    }

    pub fn spawn_type_mut(&mut self, name: &str) -> Option<&mut SpawnType> {
        self.spawn_types.iter_mut().find(|s| s.name() == name)
    }

    // -- behavior -----------------------------------------------------------

    pub fn set_behavior_tree(&mut self, mut tree: BehaviorTree) {
        tree.set_capacity(self.capacity);
        self.behavior = Some(tree);
    }

    pub fn behavior_tree(&self) -> Option<&BehaviorTree> {
        self.behavior.as_ref()
    }

    /// Run one behavior-tree step for every live object. No-op without a tree.
    pub fn update_behavior(&mut self, random: &mut Random, dt: f32) {
        let Pool {
            data,
            behavior,
            active,
            ..
        } = self;
        if let Some(tree) = behavior {
            tree.update(data, *active, random, dt);
        }
    }

    // -- capacity -----------------------------------------------------------

    /// Grow the pool, its arrays and its per-source spawn state. Never
    /// shrinks.
    pub fn set_capacity(&mut self, capacity: usize) {
        if capacity <= self.capacity {
            return;
        }
        self.capacity = capacity;
        self.data.set_capacity(capacity);
        for spawn_type in &mut self.spawn_types {
            spawn_type.set_capacity(capacity);
        }
        if let Some(tree) = &mut self.behavior {
            tree.set_capacity(capacity);
        }
    }

    // -- creation -----------------------------------------------------------

    /// Create up to `count` live objects immediately from the named object
    /// template (an empty name or unknown template uses type defaults).
    /// Pending spawns are committed first so the live prefix stays
    /// contiguous. Returns the slots created; fewer than `count` when the
    /// pool fills up.
    pub fn create_objects(&mut self, archetype: &str, count: usize) -> Range<usize> {
        if self.queued > 0 {
            self.spawn_objects();
        }
        let count = count.min(self.free_count());
        let range = self.active..self.active + count;
        if count > 0 {
            let template = find_template(&self.templates, archetype, &self.name);
            self.data.initialize(template, range.clone());
            self.active += count;
        }
        range
    }

    /// Reserve and initialize slots for the queued spawns of
    /// `source.spawn_types()[spawn_type]`, which must target this pool.
    ///
    /// Returns the number of reserved slots; zero when the pool is full or
    /// nothing is queued. Sources that do not fit are dropped from the queue.
    ///
    /// # Panics
    ///
    /// Panics if `spawn_type` is out of range for `source`.
    pub fn queue_spawns(&mut self, source: &mut Pool, spawn_type: usize, random: &mut Random) -> usize {
        let first_index = self.active + self.queued;
        let free = self.free_count();
        let Pool {
            data: source_data,
            spawn_types,
            ..
        } = source;
        let spawn_type = &mut spawn_types[spawn_type];
        let reserved = run_spawn_type(
            &mut self.data,
            &self.templates,
            &self.name,
            first_index,
            free,
            Some(&*source_data),
            spawn_type,
            random,
        );
        self.queued += reserved;
        reserved
    }

    /// [`queue_spawns`](Self::queue_spawns) for a spawn type whose source and
    /// destination are both this pool.
    pub fn queue_own_spawns(&mut self, spawn_type: usize, random: &mut Random) -> usize {
        let first_index = self.active + self.queued;
        let free = self.free_count();
        let Pool {
            name,
            data,
            templates,
            spawn_types,
            ..
        } = self;
        let reserved = run_spawn_type(
            data,
            templates,
            name,
            first_index,
            free,
            None,
            &mut spawn_types[spawn_type],
            random,
        );
        self.queued += reserved;
        reserved
    }

    /// Commit every reserved slot to the live prefix. Returns how many
    /// objects became live.
    pub fn spawn_objects(&mut self) -> usize {
        let committed = self.queued;
        self.active += committed;
        self.queued = 0;
        if committed > 0 {
            trace!(pool = %self.name, committed, active = self.active, "spawned objects");
        }
        committed
    }

    /// Clear the queued sources of every spawn type this pool owns.
    pub fn clear_spawn_queues(&mut self) {
        for spawn_type in &mut self.spawn_types {
            spawn_type.clear_spawns();
        }
    }

    // -- destruction --------------------------------------------------------

    /// Destructible flags for every slot.
    pub fn destructible(&self) -> &[bool] {
        self.data
            .destructible()
            .unwrap_or_else(|| panic!("pool '{}' lost its {DESTRUCTIBLE} array", self.name))
    }

    /// Mark the live object at `index` for destruction at the next
    /// compaction.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not a live slot.
    pub fn mark_destroyed(&mut self, index: usize) {
        assert!(
            index < self.active,
            "object {index} is not live in pool '{}' (active {})",
            self.name,
            self.active
        );
        self.data.component_array_mut::<bool>(DESTRUCTIBLE).set(index, true);
    }

    pub fn is_destroyed(&self, index: usize) -> bool {
        self.destructible()[index]
    }

    /// First live slot marked for destruction.
    pub fn first_destroyed(&self) -> Option<usize> {
        first_destroyed(self.destructible(), self.active)
    }

    /// Remove every live object marked for destruction, keeping survivors in
    /// order. Returns the number of objects removed.
    ///
    /// Slots reserved by queued spawns are compacted along with the live
    /// prefix so they stay directly behind it.
    pub fn handle_destructions(&mut self) -> usize {
        let Some(first) = self.first_destroyed() else {
            return 0;
        };
        let end = self.active + self.queued;
        let Pool {
            data,
            spawn_types,
            behavior,
            ..
        } = self;
        let new_end = data.compact(first, end, |flags| {
            for spawn_type in spawn_types.iter_mut() {
                spawn_type.handle_destructions(flags, first, end);
            }
            if let Some(tree) = behavior {
                tree.handle_destructions(flags, first, end);
            }
        });
        let destroyed = end - new_end;
        self.active -= destroyed;
        trace!(
            pool = %self.name,
            first_destroyed = first,
            destroyed,
            active = self.active,
            "compacted pool"
        );
        destroyed
    }

    // -- snapshot -----------------------------------------------------------

    /// Export the live contents of every array and every pool component.
    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            name: self.name.clone(),
            capacity: self.capacity,
            active: self.active,
            arrays: self.data.snapshot_arrays(self.active),
            components: self.data.snapshot_components(),
        }
    }
}

/// Run one spawn type against a destination's data. Returns the number of
/// slots reserved starting at `first_index`.
#[allow(clippy::too_many_arguments)]
fn run_spawn_type(
    dest: &mut PoolData,
    templates: &[ObjectTemplate],
    dest_name: &str,
    first_index: usize,
    free: usize,
    source: Option<&PoolData>,
    spawn_type: &mut SpawnType,
    random: &mut Random,
) -> usize {
    if !spawn_type.has_spawns() {
        return 0;
    }
    debug_assert_eq!(
        spawn_type.destination(),
        dest_name,
        "spawn type '{}' queued on the wrong pool",
        spawn_type.name()
    );

    spawn_type.reset_group_info();
    spawn_type.apply_size_rules(first_index, source, dest, random);
    spawn_type.finalize_group_info();
    let size = spawn_type.calculate_spawn_size(free);
    if size == 0 {
        return 0;
    }

    let template = find_template(templates, spawn_type.archetype(), dest_name);
    dest.initialize(template, first_index..first_index + size);
    spawn_type.apply_value_rules(first_index, source, dest, random);

    trace!(
        pool = %dest_name,
        spawn_type = %spawn_type.name(),
        sources = spawn_type.sources().len(),
        first_index,
        size,
        "queued spawns"
    );
    size
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
