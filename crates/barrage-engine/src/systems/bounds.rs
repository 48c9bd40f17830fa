use barrage_pool::array::DESTRUCTIBLE;
use barrage_pool::system::{PoolType, Subscriptions, System, SystemContext};

use crate::components::{Bounds, Position, BOUNDS, POSITION};

const BOUNDED: &str = "bounded";

/// Marks objects that left their pool's [`Bounds`].
#[derive(Debug)]
pub struct BoundsSystem {
    subscriptions: Subscriptions,
}

impl Default for BoundsSystem {
    fn default() -> Self {
        Self {
            subscriptions: Subscriptions::new()
                .with_type(PoolType::new(BOUNDED).with_array(POSITION).with_component(BOUNDS)),
        }
    }
}

impl System for BoundsSystem {
    fn subscriptions(&self) -> &Subscriptions {
        &self.subscriptions
    }

    fn subscriptions_mut(&mut self) -> &mut Subscriptions {
        &mut self.subscriptions
    }

    fn update(&mut self, ctx: &mut SystemContext<'_>) {
        self.subscriptions.update_pool_group(BOUNDED, ctx.pools, |_, pool| {
            let bounds = *pool.component::<Bounds>(BOUNDS);
            let active = pool.active_count();
            let (destroyed, positions) = pool
                .data_mut()
                .component_array_pair_mut::<bool, Position>(DESTRUCTIBLE, POSITION);
            for object in 0..active {
                if !bounds.contains(*positions.get(object)) {
                    destroyed.set(object, true);
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use barrage_pool::prelude::*;

    #[test]
    fn marks_objects_outside() {
        let mut pool = Pool::new("bullets", 3);
        pool.add_array::<Position>(POSITION);
        pool.insert_component(
            BOUNDS,
            Bounds {
                min_x: -1.0,
                min_y: -1.0,
                max_x: 1.0,
                max_y: 1.0,
            },
        );
        pool.create_objects("", 3);
        pool.component_array_mut::<Position>(POSITION)
            .set(1, Position::new(2.0, 0.0));

        let mut pools = PoolSet::new();
        let id = pools.insert(pool).unwrap();
        let mut system = BoundsSystem::default();
        system.subscribe(id, pools.get(id).unwrap());
        let mut random = Random::new(1);
        system.update(&mut SystemContext {
            pools: &mut pools,
            random: &mut random,
            dt: 1.0,
            tick: 0,
        });

        let pool = pools.get(id).unwrap();
        assert_eq!(&pool.destructible()[..3], &[false, true, false]);
    }
}
