//! Named spawn recipes and their per-tick queue of source objects.

use tracing::debug;

use crate::pool::PoolData;
use crate::random::Random;

use super::{GroupInfo, SpawnLayer};

/// A recipe for producing objects in a destination pool from source objects.
///
/// Spawning is two-phase. During a tick, systems call
/// [`create_spawn`](Self::create_spawn) to queue source indices. The
/// destination pool later reserves slots and runs the rules
/// ([`Pool::queue_spawns`](crate::pool::Pool::queue_spawns)), and the
/// creation pass commits the objects and clears the queue.
///
/// Layers are ordered: layer `i` derives its objects-per-group from layer
/// `i - 1`, so [`finalize_group_info`](Self::finalize_group_info) must run
/// before [`calculate_spawn_size`](Self::calculate_spawn_size).
#[derive(Debug, Clone)]
pub struct SpawnType {
    name: String,
    destination: String,
    archetype: String,
    layers: Vec<SpawnLayer>,
    sources: Vec<usize>,
    capacity: usize,
}

impl SpawnType {
    /// A spawn type producing objects of `archetype` in the pool named
    /// `destination`.
    pub fn new(name: &str, destination: &str, archetype: &str) -> Self {
        Self {
            name: name.to_owned(),
            destination: destination.to_owned(),
            archetype: archetype.to_owned(),
            layers: Vec::new(),
            sources: Vec::new(),
            capacity: 0,
        }
    }

    /// Builder-style [`add_layer`](Self::add_layer).
    pub fn with_layer(mut self, layer: SpawnLayer) -> Self {
        self.add_layer(layer);
        self
    }

    /// Append an inner layer.
    pub fn add_layer(&mut self, mut layer: SpawnLayer) {
        layer.set_capacity(self.capacity);
        self.layers.push(layer);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the pool receiving the spawned objects.
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Name of the destination pool's object archetype used for defaults.
    pub fn archetype(&self) -> &str {
        &self.archetype
    }

    pub fn layers(&self) -> &[SpawnLayer] {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut [SpawnLayer] {
        &mut self.layers
    }

    /// Source indices queued this tick, in queue order.
    pub fn sources(&self) -> &[usize] {
        &self.sources
    }

    pub fn has_spawns(&self) -> bool {
        !self.sources.is_empty()
    }

    /// Queue `source` for the next materialization. No objects are allocated.
    ///
    /// # Panics
    ///
    /// Panics if `source` is outside the source pool's capacity.
    pub fn create_spawn(&mut self, source: usize) {
        assert!(
            source < self.capacity,
            "spawn source {source} out of range for spawn type '{}' (capacity {})",
            self.name,
            self.capacity
        );
        self.sources.push(source);
    }

    /// Drop every queued source.
    pub fn clear_spawns(&mut self) {
        self.sources.clear();
    }

    /// Seed every layer's group info for the queued sources from the base
    /// counts. Runs before size rules and [`finalize_group_info`](Self::finalize_group_info).
    pub fn reset_group_info(&mut self) {
        for layer in &mut self.layers {
            for &source in &self.sources {
                layer.reset_group_info(source);
            }
        }
    }

    /// Propagate objects-per-group forward and layer copies backward for
    /// every queued source. With no layers this is a no-op.
    pub fn finalize_group_info(&mut self) {
        if self.layers.is_empty() {
            return;
        }
        for &source in &self.sources {
            let mut previous: Option<GroupInfo> = None;
            for layer in &mut self.layers {
                let info = layer.group_info_mut(source);
                if let Some(prev) = previous {
                    // Saturates so oversized layers fall to truncation.
                    info.num_objects_per_group = prev.num_groups.saturating_mul(prev.num_objects_per_group);
                }
                previous = Some(*info);
            }

            let total = previous.map_or(0, |last| last.objects_in_layer());
            for layer in self.layers.iter_mut().rev() {
                let info = layer.group_info_mut(source);
                let in_layer = info.objects_in_layer();
                info.num_layer_copies = if in_layer == 0 {
                    0
                } else {
                    u32::try_from(total / in_layer).unwrap_or(u32::MAX)
                };
            }
        }
    }

    /// Objects `source` produces in the current event (the last layer's
    /// groups times objects-per-group). Zero without layers.
    pub fn source_spawn_size(&self, source: usize) -> usize {
        self.layers
            .last()
            .map_or(0, |last| last.group_info(source).objects_in_layer())
    }

    /// Total objects the queued sources produce, capped at `max_spawns`.
    ///
    /// Sources are taken in queue order. As soon as the running total would
    /// exceed `max_spawns`, that source and every later one are removed from
    /// the queue; no source is partially fulfilled.
    pub fn calculate_spawn_size(&mut self, max_spawns: usize) -> usize {
        let mut total: usize = 0;
        for position in 0..self.sources.len() {
            let size = self.source_spawn_size(self.sources[position]);
            if total.saturating_add(size) > max_spawns {
                let dropped = self.sources.len() - position;
                self.sources.truncate(position);
                debug!(
                    spawn_type = %self.name,
                    destination = %self.destination,
                    dropped_sources = dropped,
                    max_spawns,
                    "spawn truncated at destination capacity"
                );
                break;
            }
            total += size;
        }
        total
    }

    /// Run every layer's size rules for every queued source. Sources are
    /// visited in queue order, layers innermost.
    pub(crate) fn apply_size_rules(
        &mut self,
        first_index: usize,
        source_data: Option<&PoolData>,
        dest: &mut PoolData,
        random: &mut Random,
    ) {
        for &source in &self.sources {
            for (layer_index, layer) in self.layers.iter_mut().enumerate() {
                layer.apply_size_rules(layer_index, source, first_index, source_data, dest, random);
            }
        }
    }

    /// Run every layer's value rules. Each source's batch starts where the
    /// previous source's batch ended.
    pub(crate) fn apply_value_rules(
        &mut self,
        first_index: usize,
        source_data: Option<&PoolData>,
        dest: &mut PoolData,
        random: &mut Random,
    ) {
        let mut batch_start = first_index;
        for &source in &self.sources {
            for (layer_index, layer) in self.layers.iter_mut().enumerate() {
                layer.apply_value_rules(layer_index, source, batch_start, source_data, dest, random);
            }
            batch_start += self.source_spawn_size(source);
        }
    }

    /// Grow per-source state to the source pool's capacity.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = self.capacity.max(capacity);
        for layer in &mut self.layers {
            layer.set_capacity(capacity);
        }
    }

    /// Keep per-source state aligned with the source pool's compaction.
    pub fn handle_destructions(&mut self, destroyed: &[bool], write_index: usize, end_index: usize) {
        for layer in &mut self.layers {
            layer.handle_destructions(destroyed, write_index, end_index);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn two_layer_type() -> SpawnType {
        let mut spawn_type = SpawnType::new("burst", "bullets", "bullet")
            .with_layer(SpawnLayer::new(2, 3))
            .with_layer(SpawnLayer::new(4, 1));
        spawn_type.set_capacity(4);
        spawn_type
    }

    #[test]
    fn group_info_propagates_across_layers() {
        let mut spawn_type = two_layer_type();
        spawn_type.create_spawn(0);
        spawn_type.reset_group_info();
        spawn_type.finalize_group_info();

        let inner = spawn_type.layers()[0].group_info(0);
        let outer = spawn_type.layers()[1].group_info(0);
        assert_eq!(outer.num_objects_per_group, 6);
        let total = outer.objects_in_layer();
        assert_eq!(total, 24);
        assert_eq!(inner.num_layer_copies as usize, total / 6);
        assert_eq!(outer.num_layer_copies, 1);
        assert_eq!(spawn_type.source_spawn_size(0), 24);
    }

    #[test]
    fn zero_layers_spawn_nothing() {
        let mut spawn_type = SpawnType::new("empty", "bullets", "bullet");
        spawn_type.set_capacity(2);
        spawn_type.create_spawn(1);
        spawn_type.reset_group_info();
        spawn_type.finalize_group_info();
        assert_eq!(spawn_type.calculate_spawn_size(100), 0);
        assert_eq!(spawn_type.sources(), &[1]);
    }

    #[test]
    fn zero_groups_give_zero_copies() {
        let mut spawn_type = SpawnType::new("none", "bullets", "bullet")
            .with_layer(SpawnLayer::new(0, 3))
            .with_layer(SpawnLayer::new(2, 1));
        spawn_type.set_capacity(1);
        spawn_type.create_spawn(0);
        spawn_type.reset_group_info();
        spawn_type.finalize_group_info();
        assert_eq!(spawn_type.layers()[0].group_info(0).num_layer_copies, 0);
        assert_eq!(spawn_type.source_spawn_size(0), 0);
    }

    #[test]
    fn truncation_drops_whole_sources() {
        let mut spawn_type = SpawnType::new("ring", "bullets", "bullet")
            .with_layer(SpawnLayer::new(5, 1));
        spawn_type.set_capacity(4);
        for source in 0..4 {
            spawn_type.create_spawn(source);
        }
        spawn_type.reset_group_info();
        spawn_type.finalize_group_info();

        assert_eq!(spawn_type.calculate_spawn_size(12), 10);
        assert_eq!(spawn_type.sources(), &[0, 1]);
    }

    #[test]
    fn exact_fit_keeps_every_source() {
        let mut spawn_type = SpawnType::new("ring", "bullets", "bullet")
            .with_layer(SpawnLayer::new(5, 1));
        spawn_type.set_capacity(2);
        spawn_type.create_spawn(0);
        spawn_type.create_spawn(1);
        spawn_type.reset_group_info();
        spawn_type.finalize_group_info();
        assert_eq!(spawn_type.calculate_spawn_size(10), 10);
        assert_eq!(spawn_type.sources().len(), 2);
    }

    #[test]
    fn full_destination_drops_everything() {
        let mut spawn_type = SpawnType::new("ring", "bullets", "bullet")
            .with_layer(SpawnLayer::new(5, 1));
        spawn_type.set_capacity(1);
        spawn_type.create_spawn(0);
        spawn_type.reset_group_info();
        spawn_type.finalize_group_info();
        assert_eq!(spawn_type.calculate_spawn_size(0), 0);
        assert!(!spawn_type.has_spawns());
    }

    #[test]
    fn oversized_layers_are_truncated() {
        let mut spawn_type = SpawnType::new("flood", "bullets", "bullet")
            .with_layer(SpawnLayer::new(70_000, 70_000))
            .with_layer(SpawnLayer::new(2, 1));
        spawn_type.set_capacity(1);
        spawn_type.create_spawn(0);
        spawn_type.reset_group_info();
        spawn_type.finalize_group_info();

        let outer = spawn_type.layers()[1].group_info(0);
        assert_eq!(outer.num_objects_per_group, u32::MAX);
        assert!(spawn_type.source_spawn_size(0) > 1_000_000);
        assert_eq!(spawn_type.calculate_spawn_size(1_000_000), 0);
        assert!(!spawn_type.has_spawns());
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn create_spawn_past_capacity_panics() {
        let mut spawn_type = two_layer_type();
        spawn_type.create_spawn(4);
    }
}
