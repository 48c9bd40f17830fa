//! Columnar per-object storage.
//!
//! Every pool stores its per-object data as a set of [`ComponentArray`]s, one
//! per registered component-array name. An array always holds exactly
//! `capacity` slots; the owning pool decides which prefix of them is live.
//! Slots past the live prefix keep whatever values were last moved there and
//! are reset before they are handed out again.
//!
//! The single compaction primitive shared by every array, every stateful
//! spawn rule and the behavior tree is
//! [`ComponentArray::handle_destructions`]: a stable partition of the slot
//! range `[write_index, end_index)` by the pool's Destructible flags. It runs
//! in one pass, in place, without allocating, and returns the new end of the
//! live range.
//!
//! ```
//! use barrage_pool::array::{ComponentArray, TypedArray};
//!
//! let mut values = TypedArray::from_vec(vec![10, 11, 12, 13, 14]);
//! let destroyed = [false, true, false, true, false];
//! let live = values.handle_destructions(&destroyed, 0, 5);
//! assert_eq!(live, 3);
//! assert_eq!(&values.as_slice()[..live], &[10, 12, 14]);
//! ```

use std::any::Any;
use std::fmt;
use std::ops::Range;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Name under which every pool stores its per-object destruction flags.
pub const DESTRUCTIBLE: &str = "Destructible";

// ---------------------------------------------------------------------------
// Element
// ---------------------------------------------------------------------------

/// Bound shared by every type stored in a component array or used as a pool
/// component: plain data that can be cloned, defaulted and exchanged as JSON.
pub trait Element:
    Clone + Default + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

impl<T> Element for T where
    T: Clone + Default + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

// ---------------------------------------------------------------------------
// ComponentArray
// ---------------------------------------------------------------------------

/// A capacity-sized column of a single component type, indexed by object slot.
pub trait ComponentArray: fmt::Debug + Send + Sync {
    /// Number of slots.
    fn capacity(&self) -> usize;

    /// Grow to at least `capacity` slots. Existing slots are preserved and the
    /// array never shrinks.
    fn set_capacity(&mut self, capacity: usize);

    /// Deep copy with the same dynamic type.
    fn clone_array(&self) -> Box<dyn ComponentArray>;

    /// Stable partition of `[write_index, end_index)` by liveness.
    ///
    /// Every slot whose `destroyed` flag is `false` moves down to the next
    /// free write position, keeping survivors in their relative order.
    /// Returns the final write position, i.e. `write_index` plus the number of
    /// survivors in the range.
    fn handle_destructions(&mut self, destroyed: &[bool], write_index: usize, end_index: usize)
        -> usize;

    /// Write a clone of `source[source_index]` into every slot of `range`.
    ///
    /// # Panics
    ///
    /// Panics if `source` stores a different element type.
    fn copy_value(&mut self, source: &dyn ComponentArray, source_index: usize, range: Range<usize>);

    /// Reset every slot of `range` to the element type's default.
    fn reset_range(&mut self, range: Range<usize>);

    /// Export the slots of `range` as a JSON array.
    fn to_json(&self, range: Range<usize>) -> serde_json::Value;

    /// Rust type name of the element, for diagnostics.
    fn element_type_name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl Clone for Box<dyn ComponentArray> {
    fn clone(&self) -> Self {
        self.clone_array()
    }
}

// ---------------------------------------------------------------------------
// TypedArray
// ---------------------------------------------------------------------------

/// Generic [`ComponentArray`] over a `Vec<T>` whose length is the capacity.
#[derive(Clone, Default, PartialEq)]
pub struct TypedArray<T> {
    data: Vec<T>,
}

impl<T: Element> TypedArray<T> {
    /// `capacity` default-valued slots.
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![T::default(); capacity],
        }
    }

    /// Take ownership of existing values; the capacity is `values.len()`.
    pub fn from_vec(values: Vec<T>) -> Self {
        Self { data: values }
    }

    /// A single-slot array holding `value`. Used for object templates.
    pub fn from_value(value: T) -> Self {
        Self { data: vec![value] }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// All slots, live or not. Contiguous, suitable for handing to a renderer.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// # Panics
    ///
    /// Panics if `index >= capacity`.
    #[inline]
    pub fn get(&self, index: usize) -> &T {
        &self.data[index]
    }

    /// # Panics
    ///
    /// Panics if `index >= capacity`.
    #[inline]
    pub fn get_mut(&mut self, index: usize) -> &mut T {
        &mut self.data[index]
    }

    #[inline]
    pub fn set(&mut self, index: usize, value: T) {
        self.data[index] = value;
    }

    /// Fill `range` with clones of `value`.
    pub fn fill(&mut self, range: Range<usize>, value: &T) {
        for slot in &mut self.data[range] {
            *slot = value.clone();
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for TypedArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedArray")
            .field("element", &std::any::type_name::<T>())
            .field("capacity", &self.data.len())
            .finish()
    }
}

impl<T: Element> ComponentArray for TypedArray<T> {
    fn capacity(&self) -> usize {
        self.data.len()
    }

    fn set_capacity(&mut self, capacity: usize) {
        if capacity > self.data.len() {
            self.data.resize(capacity, T::default());
        }
    }

    fn clone_array(&self) -> Box<dyn ComponentArray> {
        Box::new(self.clone())
    }

    fn handle_destructions(
        &mut self,
        destroyed: &[bool],
        write_index: usize,
        end_index: usize,
    ) -> usize {
        let mut write = write_index;
        for read in write_index..end_index {
            if !destroyed[read] {
                if read != write {
                    self.data.swap(write, read);
                }
                write += 1;
            }
        }
        write
    }

    fn copy_value(
        &mut self,
        source: &dyn ComponentArray,
        source_index: usize,
        range: Range<usize>,
    ) {
        let source = source
            .as_any()
            .downcast_ref::<TypedArray<T>>()
            .unwrap_or_else(|| {
                panic!(
                    "cannot copy {} into an array of {}",
                    source.element_type_name(),
                    std::any::type_name::<T>()
                )
            });
        let value = source.get(source_index).clone();
        self.fill(range, &value);
    }

    fn reset_range(&mut self, range: Range<usize>) {
        self.fill(range, &T::default());
    }

    fn to_json(&self, range: Range<usize>) -> serde_json::Value {
        // Element values are plain data; a failing Serialize impl exports as null.
        serde_json::to_value(&self.data[range]).unwrap_or(serde_json::Value::Null)
    }

    fn element_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Destructible flags
// ---------------------------------------------------------------------------

/// Compact the Destructible flags against themselves.
///
/// Same contract as [`ComponentArray::handle_destructions`] with the flags
/// as both data and predicate: afterwards `[write_index, result)` is all
/// `false` and `[result, end_index)` is all `true`. The result is the new end
/// of the live range.
pub fn compact_flags(flags: &mut [bool], write_index: usize, end_index: usize) -> usize {
    let mut write = write_index;
    for read in write_index..end_index {
        if !flags[read] {
            flags[write] = false;
            write += 1;
        }
    }
    for flag in &mut flags[write..end_index] {
        *flag = true;
    }
    write
}

/// Index of the first `true` flag in `[0, end_index)`.
pub fn first_destroyed(flags: &[bool], end_index: usize) -> Option<usize> {
    flags[..end_index].iter().position(|&destroyed| destroyed)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_array_is_default_filled() {
        let arr = TypedArray::<u32>::new(4);
        assert_eq!(arr.as_slice(), &[0, 0, 0, 0]);
        assert_eq!(arr.capacity(), 4);
    }

    #[test]
    fn set_capacity_grows_and_preserves() {
        let mut arr = TypedArray::from_vec(vec![1u32, 2, 3]);
        arr.set_capacity(5);
        assert_eq!(arr.as_slice(), &[1, 2, 3, 0, 0]);
    }

    #[test]
    fn set_capacity_never_shrinks() {
        let mut arr = TypedArray::from_vec(vec![1u32, 2, 3]);
        arr.set_capacity(1);
        assert_eq!(arr.as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn clone_array_is_deep() {
        let arr = TypedArray::from_vec(vec![String::from("a"), String::from("b")]);
        let mut copy = arr.clone_array();
        copy.as_any_mut()
            .downcast_mut::<TypedArray<String>>()
            .unwrap()
            .set(0, "z".to_owned());
        assert_eq!(arr.get(0), "a");
    }

    #[test]
    fn compaction_preserves_survivor_order() {
        let mut arr = TypedArray::from_vec(vec!['a', 'b', 'c', 'd', 'e', 'f']);
        let flags = [true, false, true, true, false, false];
        let live = arr.handle_destructions(&flags, 0, 6);
        assert_eq!(live, 3);
        assert_eq!(&arr.as_slice()[..3], &['b', 'e', 'f']);
    }

    #[test]
    fn compaction_respects_write_index() {
        let mut arr = TypedArray::from_vec(vec![0, 1, 2, 3, 4, 5]);
        let flags = [false, false, true, false, true, false];
        let live = arr.handle_destructions(&flags, 2, 6);
        assert_eq!(live, 4);
        assert_eq!(&arr.as_slice()[..4], &[0, 1, 3, 5]);
    }

    #[test]
    fn compaction_does_not_touch_slots_past_end() {
        let mut arr = TypedArray::from_vec(vec![0, 1, 2, 3, 4, 5]);
        let flags = [true, false, false, true, true, false];
        let live = arr.handle_destructions(&flags, 0, 4);
        assert_eq!(live, 2);
        assert_eq!(&arr.as_slice()[4..], &[4, 5]);
    }

    #[test]
    fn compaction_with_no_dead_is_identity() {
        let mut arr = TypedArray::from_vec(vec![7, 8, 9]);
        let live = arr.handle_destructions(&[false, false, false], 0, 3);
        assert_eq!(live, 3);
        assert_eq!(arr.as_slice(), &[7, 8, 9]);
    }

    #[test]
    fn compact_flags_partitions_in_place() {
        let mut flags = vec![false, true, false, true, false];
        let live = compact_flags(&mut flags, 1, 5);
        assert_eq!(live, 3);
        assert_eq!(flags, vec![false, false, false, true, true]);
    }

    #[test]
    fn first_destroyed_scans_live_prefix_only() {
        let flags = [false, false, false, true];
        assert_eq!(first_destroyed(&flags, 3), None);
        assert_eq!(first_destroyed(&flags, 4), Some(3));
    }

    #[test]
    fn copy_value_fills_range() {
        let template = TypedArray::from_value(5u8);
        let mut arr = TypedArray::<u8>::new(4);
        arr.copy_value(&template, 0, 1..3);
        assert_eq!(arr.as_slice(), &[0, 5, 5, 0]);
        arr.reset_range(0..4);
        assert_eq!(arr.as_slice(), &[0, 0, 0, 0]);
    }

    #[test]
    #[should_panic(expected = "cannot copy")]
    fn copy_value_type_mismatch_panics() {
        let template = TypedArray::from_value(5u8);
        let mut arr = TypedArray::<u32>::new(2);
        arr.copy_value(&template, 0, 0..1);
    }

    #[test]
    fn to_json_exports_range() {
        let arr = TypedArray::from_vec(vec![1, 2, 3]);
        assert_eq!(arr.to_json(0..2), serde_json::json!([1, 2]));
    }
}
