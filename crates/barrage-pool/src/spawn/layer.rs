//! One level of grouping within a spawn type.

use crate::array::{ComponentArray, TypedArray};
use crate::pool::PoolData;
use crate::random::Random;

use super::{GroupInfo, SpawnRule, SpawnRuleInfo};

/// Base counts, per-source [`GroupInfo`] and the rules of one layer.
///
/// The per-source group info is indexed by the *source* pool's object slots,
/// so it is sized with the source pool's capacity and compacted with the
/// source pool's destructions.
#[derive(Debug, Clone)]
pub struct SpawnLayer {
    num_groups: u32,
    num_objects_per_group: u32,
    group_info: TypedArray<GroupInfo>,
    size_rules: Vec<Box<dyn SpawnRule>>,
    value_rules: Vec<Box<dyn SpawnRule>>,
}

impl SpawnLayer {
    /// A layer producing `num_groups` groups. `num_objects_per_group` is only
    /// used by the first layer of a spawn type; later layers derive theirs
    /// from the layer before.
    pub fn new(num_groups: u32, num_objects_per_group: u32) -> Self {
        Self {
            num_groups,
            num_objects_per_group,
            group_info: TypedArray::new(0),
            size_rules: Vec::new(),
            value_rules: Vec::new(),
        }
    }

    /// Builder-style [`add_size_rule`](Self::add_size_rule).
    pub fn with_size_rule(mut self, rule: Box<dyn SpawnRule>) -> Self {
        self.add_size_rule(rule);
        self
    }

    /// Builder-style [`add_value_rule`](Self::add_value_rule).
    pub fn with_value_rule(mut self, rule: Box<dyn SpawnRule>) -> Self {
        self.add_value_rule(rule);
        self
    }

    /// Append a rule that adjusts this layer's counts before finalization.
    pub fn add_size_rule(&mut self, mut rule: Box<dyn SpawnRule>) {
        rule.set_capacity(self.group_info.capacity());
        self.size_rules.push(rule);
    }

    /// Append a rule that writes initial values into new objects.
    pub fn add_value_rule(&mut self, mut rule: Box<dyn SpawnRule>) {
        rule.set_capacity(self.group_info.capacity());
        self.value_rules.push(rule);
    }

    pub fn num_groups(&self) -> u32 {
        self.num_groups
    }

    pub fn num_objects_per_group(&self) -> u32 {
        self.num_objects_per_group
    }

    pub fn size_rules(&self) -> &[Box<dyn SpawnRule>] {
        &self.size_rules
    }

    pub fn value_rules(&self) -> &[Box<dyn SpawnRule>] {
        &self.value_rules
    }

    /// Group info computed for `source` in the current spawn event.
    pub fn group_info(&self, source: usize) -> GroupInfo {
        *self.group_info.get(source)
    }

    pub fn group_info_mut(&mut self, source: usize) -> &mut GroupInfo {
        self.group_info.get_mut(source)
    }

    /// Seed `source`'s group info from the layer's base counts.
    pub fn reset_group_info(&mut self, source: usize) {
        self.group_info.set(
            source,
            GroupInfo::new(self.num_groups, self.num_objects_per_group, 1),
        );
    }

    pub fn set_capacity(&mut self, capacity: usize) {
        self.group_info.set_capacity(capacity);
        for rule in self.size_rules.iter_mut().chain(self.value_rules.iter_mut()) {
            rule.set_capacity(capacity);
        }
    }

    pub fn handle_destructions(&mut self, destroyed: &[bool], write_index: usize, end_index: usize) {
        self.group_info
            .handle_destructions(destroyed, write_index, end_index);
        for rule in self.size_rules.iter_mut().chain(self.value_rules.iter_mut()) {
            rule.handle_destructions(destroyed, write_index, end_index);
        }
    }

    /// Run the size rules for `source`, storing the adjusted counts.
    pub(crate) fn apply_size_rules(
        &mut self,
        layer: usize,
        source: usize,
        first_index: usize,
        source_data: Option<&PoolData>,
        dest: &mut PoolData,
        random: &mut Random,
    ) {
        let mut group_info = self.group_info(source);
        for rule in &mut self.size_rules {
            let mut info = SpawnRuleInfo::new(
                source_data,
                dest,
                source,
                first_index,
                group_info,
                layer,
                random,
            );
            rule.execute(&mut info);
            group_info = info.group_info;
        }
        self.group_info.set(source, group_info);
    }

    /// Run the value rules for `source`'s batch starting at `first_index`.
    pub(crate) fn apply_value_rules(
        &mut self,
        layer: usize,
        source: usize,
        first_index: usize,
        source_data: Option<&PoolData>,
        dest: &mut PoolData,
        random: &mut Random,
    ) {
        let group_info = self.group_info(source);
        for rule in &mut self.value_rules {
            let mut info = SpawnRuleInfo::new(
                source_data,
                dest,
                source,
                first_index,
                group_info,
                layer,
                random,
            );
            rule.execute(&mut info);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
