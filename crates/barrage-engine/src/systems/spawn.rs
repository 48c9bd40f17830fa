use tracing::warn;

use barrage_pool::system::{PoolType, Subscriptions, System, SystemContext};

use crate::components::{SpawnTimer, Spawner, SpawnerEntry, SPAWNER, SPAWN_TIMER};

const SPAWNERS: &str = "spawners";

/// Queues spawn events on the spawn types named by each pool's [`Spawner`]
/// schedule. The events are materialized later in the tick by
/// [`CreationSystem`](super::CreationSystem).
#[derive(Debug)]
pub struct SpawnSystem {
    subscriptions: Subscriptions,
}

impl Default for SpawnSystem {
    fn default() -> Self {
        Self {
            subscriptions: Subscriptions::new().with_type(
                PoolType::new(SPAWNERS)
                    .with_component(SPAWNER)
                    .with_array(SPAWN_TIMER),
            ),
        }
    }
}

impl System for SpawnSystem {
    fn subscriptions(&self) -> &Subscriptions {
        &self.subscriptions
    }

    fn subscriptions_mut(&mut self) -> &mut Subscriptions {
        &mut self.subscriptions
    }

    fn update(&mut self, ctx: &mut SystemContext<'_>) {
        self.subscriptions.update_pool_group(SPAWNERS, ctx.pools, |_, pool| {
            let spawner = pool.component::<Spawner>(SPAWNER).clone();
            let mut schedule: Vec<(usize, SpawnerEntry)> = Vec::with_capacity(spawner.entries.len());
            for entry in spawner.entries {
                match pool.spawn_type_index(&entry.spawn_type) {
                    Some(index) => schedule.push((index, entry)),
                    None => warn!(
                        pool = pool.name(),
                        spawn_type = %entry.spawn_type,
                        "spawner names an unknown spawn type, entry skipped"
                    ),
                }
            }

            for object in 0..pool.active_count() {
                if pool.is_destroyed(object) {
                    continue;
                }
                let ticks = pool.component_array::<SpawnTimer>(SPAWN_TIMER).get(object).0;
                for (index, entry) in &schedule {
                    if entry.fires_at(ticks) {
                        pool.spawn_types_mut()[*index].create_spawn(object);
                    }
                }
                let timer = pool
                    .component_array_mut::<SpawnTimer>(SPAWN_TIMER)
                    .get_mut(object);
                timer.0 = timer.0.saturating_add(1);
            }
        });
    }
}
