//! Spawn rules and the grouping algebra behind spawn events.
//!
//! A [`SpawnType`] turns a list of queued source objects into a batch of new
//! objects in a destination pool. Its [`SpawnLayer`]s describe how many
//! objects each source produces ("3 groups of 5, repeated twice"), and every
//! layer carries [`SpawnRule`]s that either adjust the counts (size rules) or
//! write initial values into the new slots (value rules).
//!
//! # Destination indices
//!
//! Within one layer, each new object is addressed by `(object, group,
//! layer_copy)`. The slot it lands in is
//!
//! ```text
//! first + layer_copy * (num_groups * num_objects_per_group)
//!       + group * num_objects_per_group
//!       + object
//! ```
//!
//! and rules always visit slots with `layer_copy` outermost, then `group`,
//! then `object`. [`GroupInfo::slots`] yields exactly that order, which keeps
//! random draws reproducible for a given seed.

pub mod layer;
pub mod rules;
pub mod spawn_type;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::pool::PoolData;
use crate::random::Random;

pub use layer::SpawnLayer;
pub use spawn_type::SpawnType;

// ---------------------------------------------------------------------------
// GroupInfo
// ---------------------------------------------------------------------------

/// Replication counts for one source object within one spawn layer.
///
/// Recomputed on every spawn event. For layer `i > 0`,
/// `num_objects_per_group(i) = num_groups(i - 1) * num_objects_per_group(i - 1)`
/// and, for every layer, `num_layer_copies = total / objects_in_layer`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupInfo {
    pub num_groups: u32,
    pub num_objects_per_group: u32,
    pub num_layer_copies: u32,
}

impl GroupInfo {
    pub fn new(num_groups: u32, num_objects_per_group: u32, num_layer_copies: u32) -> Self {
        Self {
            num_groups,
            num_objects_per_group,
            num_layer_copies,
        }
    }

    /// Objects covered by one copy of this layer.
    #[inline]
    pub fn objects_in_layer(&self) -> usize {
        (self.num_groups as usize).saturating_mul(self.num_objects_per_group as usize)
    }

    /// Objects covered by all copies of this layer.
    #[inline]
    pub fn total_objects(&self) -> usize {
        self.objects_in_layer()
            .saturating_mul(self.num_layer_copies as usize)
    }

    /// Absolute slot of `(object, group, layer_copy)` for a batch starting at
    /// `first`.
    #[inline]
    pub fn destination_index(&self, first: usize, object: u32, group: u32, layer_copy: u32) -> usize {
        first
            + layer_copy as usize * self.objects_in_layer()
            + group as usize * self.num_objects_per_group as usize
            + object as usize
    }

    /// Every slot of the batch starting at `first`, `layer_copy` outermost,
    /// then `group`, then `object`.
    pub fn slots(&self, first: usize) -> SpawnSlots {
        SpawnSlots {
            info: *self,
            first,
            object: 0,
            group: 0,
            layer_copy: 0,
        }
    }
}

/// One new object addressed within its layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnSlot {
    /// Absolute slot index in the destination pool.
    pub index: usize,
    pub object: u32,
    pub group: u32,
    pub layer_copy: u32,
}

/// Iterator returned by [`GroupInfo::slots`].
#[derive(Debug, Clone)]
pub struct SpawnSlots {
    info: GroupInfo,
    first: usize,
    object: u32,
    group: u32,
    layer_copy: u32,
}

impl Iterator for SpawnSlots {
    type Item = SpawnSlot;

    fn next(&mut self) -> Option<SpawnSlot> {
        let info = self.info;
        if info.num_groups == 0 || info.num_objects_per_group == 0 {
            return None;
        }
        if self.layer_copy >= info.num_layer_copies {
            return None;
        }
        let slot = SpawnSlot {
            index: info.destination_index(self.first, self.object, self.group, self.layer_copy),
            object: self.object,
            group: self.group,
            layer_copy: self.layer_copy,
        };
        self.object += 1;
        if self.object == info.num_objects_per_group {
            self.object = 0;
            self.group += 1;
            if self.group == info.num_groups {
                self.group = 0;
                self.layer_copy += 1;
            }
        }
        Some(slot)
    }
}

// ---------------------------------------------------------------------------
// SpawnRuleInfo
// ---------------------------------------------------------------------------

/// Everything a rule sees while executing for one source object in one layer.
pub struct SpawnRuleInfo<'a> {
    source: Option<&'a PoolData>,
    dest: &'a mut PoolData,
    /// Slot of the source object in the source pool.
    pub source_index: usize,
    /// First destination slot of this source's batch.
    pub first_index: usize,
    /// Counts for this source in this layer. Size rules may rewrite
    /// `num_groups`; the pool copies it back before finalizing.
    pub group_info: GroupInfo,
    /// Position of the layer within its spawn type.
    pub layer: usize,
    pub random: &'a mut Random,
}

impl<'a> SpawnRuleInfo<'a> {
    /// Build the info for one rule invocation. `source` is `None` when the
    /// destination pool is also the source.
    pub fn new(
        source: Option<&'a PoolData>,
        dest: &'a mut PoolData,
        source_index: usize,
        first_index: usize,
        group_info: GroupInfo,
        layer: usize,
        random: &'a mut Random,
    ) -> Self {
        Self {
            source,
            dest,
            source_index,
            first_index,
            group_info,
            layer,
            random,
        }
    }

    /// Data of the pool the source object lives in.
    pub fn source(&self) -> &PoolData {
        match self.source {
            Some(source) => source,
            None => &*self.dest,
        }
    }

    /// Data of the pool receiving the new objects.
    pub fn dest(&self) -> &PoolData {
        &*self.dest
    }

    pub fn dest_mut(&mut self) -> &mut PoolData {
        &mut *self.dest
    }

    /// Whether the destination pool spawns from itself.
    pub fn is_self_spawn(&self) -> bool {
        self.source.is_none()
    }

    /// Slots of this source's batch in the fixed iteration order.
    pub fn slots(&self) -> SpawnSlots {
        self.group_info.slots(self.first_index)
    }
}

impl fmt::Debug for SpawnRuleInfo<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpawnRuleInfo")
            .field("source_index", &self.source_index)
            .field("first_index", &self.first_index)
            .field("group_info", &self.group_info)
            .field("layer", &self.layer)
            .field("self_spawn", &self.is_self_spawn())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// SpawnRule
// ---------------------------------------------------------------------------

/// A pluggable unit that computes part of a spawn event.
///
/// Rules are cloned from archetype data when a pool is instantiated and live
/// as long as the pool. A rule that keeps running state per source object
/// must size it in [`set_capacity`](Self::set_capacity) and keep it aligned
/// with the source pool in [`handle_destructions`](Self::handle_destructions).
pub trait SpawnRule: fmt::Debug + Send + Sync {
    fn execute(&mut self, info: &mut SpawnRuleInfo<'_>);

    fn clone_rule(&self) -> Box<dyn SpawnRule>;

    /// Called with the source pool's capacity whenever it changes.
    fn set_capacity(&mut self, _capacity: usize) {}

    /// Called with the source pool's Destructible flags during compaction.
    fn handle_destructions(&mut self, _destroyed: &[bool], _write_index: usize, _end_index: usize) {
    }
}

impl Clone for Box<dyn SpawnRule> {
    fn clone(&self) -> Self {
        self.clone_rule()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
