use tracing::trace;

use barrage_pool::system::{PoolType, Subscriptions, System, SystemContext};

const POOLS: &str = "pools";

/// Compacts every pool, removing the objects marked during the previous tick.
#[derive(Debug)]
pub struct DestructionSystem {
    subscriptions: Subscriptions,
}

impl Default for DestructionSystem {
    fn default() -> Self {
        Self {
            subscriptions: Subscriptions::new().with_type(PoolType::new(POOLS)),
        }
    }
}

impl System for DestructionSystem {
    fn subscriptions(&self) -> &Subscriptions {
        &self.subscriptions
    }

    fn subscriptions_mut(&mut self) -> &mut Subscriptions {
        &mut self.subscriptions
    }

    fn update(&mut self, ctx: &mut SystemContext<'_>) {
        let tick = ctx.tick;
        self.subscriptions.update_pool_group(POOLS, ctx.pools, |_, pool| {
            let removed = pool.handle_destructions();
            if removed > 0 {
                trace!(tick, pool = pool.name(), removed, "compacted pool");
            }
        });
    }
}
