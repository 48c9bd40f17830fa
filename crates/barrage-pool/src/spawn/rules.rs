//! Generic spawn rules usable with any registered component type.
//!
//! Concrete games register monomorphized versions under their own names,
//! e.g. `registry.register_spawn_rule::<SetValue<Velocity>>("SetVelocity")`.

use serde::{Deserialize, Serialize};

use crate::array::Element;

use super::{SpawnRule, SpawnRuleInfo};

/// Write the same value into `array` for every new object of the layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetValue<T> {
    pub array: String,
    pub value: T,
}

impl<T: Element> SetValue<T> {
    pub fn new(array: &str, value: T) -> Self {
        Self {
            array: array.to_owned(),
            value,
        }
    }
}

impl<T: Element> SpawnRule for SetValue<T> {
    fn execute(&mut self, info: &mut SpawnRuleInfo<'_>) {
        let slots = info.slots();
        let values = info.dest_mut().component_array_mut::<T>(&self.array);
        for slot in slots {
            values.set(slot.index, self.value.clone());
        }
    }

    fn clone_rule(&self) -> Box<dyn SpawnRule> {
        Box::new(self.clone())
    }
}

/// Copy the source object's value of `array` into the same array of every new
/// object. Both pools must store `array` with the same element type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyFromSource<T> {
    pub array: String,
    #[serde(skip)]
    marker: std::marker::PhantomData<fn() -> T>,
}

impl<T: Element> CopyFromSource<T> {
    pub fn new(array: &str) -> Self {
        Self {
            array: array.to_owned(),
            marker: std::marker::PhantomData,
        }
    }
}

impl<T: Element> SpawnRule for CopyFromSource<T> {
    fn execute(&mut self, info: &mut SpawnRuleInfo<'_>) {
        let value = info
            .source()
            .component_array::<T>(&self.array)
            .get(info.source_index)
            .clone();
        let slots = info.slots();
        let values = info.dest_mut().component_array_mut::<T>(&self.array);
        for slot in slots {
            values.set(slot.index, value.clone());
        }
    }

    fn clone_rule(&self) -> Box<dyn SpawnRule> {
        Box::new(self.clone())
    }
}

/// Size rule: draw this layer's group count uniformly from `[min, max]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RandomGroupCount {
    pub min: u32,
    pub max: u32,
}

impl SpawnRule for RandomGroupCount {
    fn execute(&mut self, info: &mut SpawnRuleInfo<'_>) {
        let min = self.min.min(i32::MAX as u32) as i32;
        let max = self.max.min(i32::MAX as u32) as i32;
        info.group_info.num_groups = info.random.range_int(min, max) as u32;
    }

    fn clone_rule(&self) -> Box<dyn SpawnRule> {
        Box::new(self.clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::TypedArray;
    use crate::pool::PoolData;
    use crate::random::Random;
    use crate::spawn::GroupInfo;

    fn data_with(name: &str, capacity: usize) -> PoolData {
        let mut data = PoolData::new();
        data.add_component_array(name, Box::new(TypedArray::<i32>::new(capacity)));
        data
    }

    #[test]
    fn set_value_writes_every_slot_of_the_batch() {
        let mut dest = data_with("hp", 8);
        let mut random = Random::new(1);
        let mut rule = SetValue::new("hp", 3i32);
        let mut info =
            SpawnRuleInfo::new(None, &mut dest, 0, 2, GroupInfo::new(2, 2, 1), 0, &mut random);
        rule.execute(&mut info);
        assert_eq!(
            dest.component_array::<i32>("hp").as_slice(),
            &[0, 0, 3, 3, 3, 3, 0, 0]
        );
    }

    #[test]
    fn copy_from_source_reads_the_source_slot() {
        let mut source = data_with("team", 4);
        source.component_array_mut::<i32>("team").set(2, 9);
        let mut dest = data_with("team", 4);
        let mut random = Random::new(1);
        let mut rule = CopyFromSource::<i32>::new("team");
        let mut info = SpawnRuleInfo::new(
            Some(&source),
            &mut dest,
            2,
            0,
            GroupInfo::new(3, 1, 1),
            0,
            &mut random,
        );
        rule.execute(&mut info);
        assert_eq!(dest.component_array::<i32>("team").as_slice(), &[9, 9, 9, 0]);
    }

    #[test]
    fn random_group_count_stays_in_range() {
        let mut dest = PoolData::new();
        let mut random = Random::new(77);
        let mut rule = RandomGroupCount { min: 2, max: 5 };
        for _ in 0..100 {
            let mut info =
                SpawnRuleInfo::new(None, &mut dest, 0, 0, GroupInfo::new(1, 1, 1), 0, &mut random);
            rule.execute(&mut info);
            assert!((2..=5).contains(&info.group_info.num_groups));
        }
    }
}
