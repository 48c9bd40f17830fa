use barrage_pool::array::DESTRUCTIBLE;
use barrage_pool::system::{PoolType, Subscriptions, System, SystemContext};

use crate::components::{Age, Lifetime, AGE, LIFETIME};

const AGING: &str = "aging";

/// Advances every live object's [`Age`] and marks objects whose age reached
/// the pool's [`Lifetime`]. A `max_ticks` of 0, or no `Lifetime` component,
/// means objects never expire.
#[derive(Debug)]
pub struct LifetimeSystem {
    subscriptions: Subscriptions,
}

impl Default for LifetimeSystem {
    fn default() -> Self {
        Self {
            subscriptions: Subscriptions::new().with_type(PoolType::new(AGING).with_array(AGE)),
        }
    }
}

impl System for LifetimeSystem {
    fn subscriptions(&self) -> &Subscriptions {
        &self.subscriptions
    }

    fn subscriptions_mut(&mut self) -> &mut Subscriptions {
        &mut self.subscriptions
    }

    fn update(&mut self, ctx: &mut SystemContext<'_>) {
        self.subscriptions.update_pool_group(AGING, ctx.pools, |_, pool| {
            let max_ticks = pool
                .get_component::<Lifetime>(LIFETIME)
                .map_or(0, |lifetime| lifetime.max_ticks);
            let active = pool.active_count();
            let (ages, destroyed) = pool
                .data_mut()
                .component_array_pair_mut::<Age, bool>(AGE, DESTRUCTIBLE);
            for object in 0..active {
                let age = ages.get_mut(object);
                age.0 = age.0.saturating_add(1);
                if max_ticks > 0 && age.0 >= max_ticks {
                    destroyed.set(object, true);
                }
            }
        });
    }
}
