use tracing::{trace, warn};

use barrage_pool::system::{PoolId, PoolType, Subscriptions, System, SystemContext};

const POOLS: &str = "pools";

/// Materializes every queued spawn event.
///
/// All spawn types of all pools are queued into their destination pools
/// first, so every destination reserves its slots before any of them are
/// committed. Then each pool commits its reservations and the source queues
/// are cleared.
#[derive(Debug)]
pub struct CreationSystem {
    subscriptions: Subscriptions,
}

impl Default for CreationSystem {
    fn default() -> Self {
        Self {
            subscriptions: Subscriptions::new().with_type(PoolType::new(POOLS)),
        }
    }
}

impl System for CreationSystem {
    fn subscriptions(&self) -> &Subscriptions {
        &self.subscriptions
    }

    fn subscriptions_mut(&mut self) -> &mut Subscriptions {
        &mut self.subscriptions
    }

    fn update(&mut self, ctx: &mut SystemContext<'_>) {
        let sources = self.subscriptions.group(POOLS);

        let mut pending: Vec<(PoolId, usize, PoolId)> = Vec::new();
        for &source in sources {
            let Some(pool) = ctx.pools.get(source) else {
                continue;
            };
            for (index, spawn_type) in pool.spawn_types().iter().enumerate() {
                if !spawn_type.has_spawns() {
                    continue;
                }
                match ctx.pools.id_of(spawn_type.destination()) {
                    Some(destination) => pending.push((source, index, destination)),
                    None => warn!(
                        pool = pool.name(),
                        spawn_type = spawn_type.name(),
                        destination = spawn_type.destination(),
                        "spawn destination pool does not exist, events dropped"
                    ),
                }
            }
        }

        for (source, index, destination) in pending {
            let reserved = if source == destination {
                match ctx.pools.get_mut(source) {
                    Some(pool) => pool.queue_own_spawns(index, ctx.random),
                    None => 0,
                }
            } else {
                match ctx.pools.pair_mut(destination, source) {
                    Some((dest, source)) => dest.queue_spawns(source, index, ctx.random),
                    None => 0,
                }
            };
            trace!(tick = ctx.tick, spawn_type = index, reserved, "queued spawns");
        }

        for (_, pool) in ctx.pools.iter_mut() {
            pool.spawn_objects();
        }
        for (_, pool) in ctx.pools.iter_mut() {
            pool.clear_spawn_queues();
        }
    }
}
