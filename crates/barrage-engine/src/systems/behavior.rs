use barrage_pool::system::{PoolType, Subscriptions, System, SystemContext};

const POOLS: &str = "pools";

/// Steps the behavior tree of every pool that has one.
#[derive(Debug)]
pub struct BehaviorSystem {
    subscriptions: Subscriptions,
}

impl Default for BehaviorSystem {
    fn default() -> Self {
        Self {
            subscriptions: Subscriptions::new().with_type(PoolType::new(POOLS)),
        }
    }
}

impl System for BehaviorSystem {
    fn subscriptions(&self) -> &Subscriptions {
        &self.subscriptions
    }

    fn subscriptions_mut(&mut self) -> &mut Subscriptions {
        &mut self.subscriptions
    }

    fn update(&mut self, ctx: &mut SystemContext<'_>) {
        let dt = ctx.dt;
        let random = &mut *ctx.random;
        self.subscriptions.update_pool_group(POOLS, ctx.pools, |_, pool| {
            pool.update_behavior(random, dt);
        });
    }
}
