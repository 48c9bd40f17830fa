use barrage_pool::system::{PoolType, Subscriptions, System, SystemContext};

use crate::components::{Position, Rotation, Velocity, POSITION, ROTATION, VELOCITY};

const MOVING: &str = "moving";
const FACING: &str = "facing";

/// Integrates `Position += Velocity * dt` for every live object, then turns
/// pools with a `Rotation` array to face their velocity.
#[derive(Debug)]
pub struct MovementSystem {
    subscriptions: Subscriptions,
}

impl Default for MovementSystem {
    fn default() -> Self {
        Self {
            subscriptions: Subscriptions::new()
                .with_type(PoolType::new(MOVING).with_array(POSITION).with_array(VELOCITY))
                .with_type(PoolType::new(FACING).with_array(ROTATION).with_array(VELOCITY)),
        }
    }
}

impl System for MovementSystem {
    fn subscriptions(&self) -> &Subscriptions {
        &self.subscriptions
    }

    fn subscriptions_mut(&mut self) -> &mut Subscriptions {
        &mut self.subscriptions
    }

    fn update(&mut self, ctx: &mut SystemContext<'_>) {
        let dt = ctx.dt;
        self.subscriptions.update_pool_group(MOVING, ctx.pools, |_, pool| {
            let active = pool.active_count();
            let (positions, velocities) = pool
                .data_mut()
                .component_array_pair_mut::<Position, Velocity>(POSITION, VELOCITY);
            let live = positions.as_mut_slice()[..active]
                .iter_mut()
                .zip(&velocities.as_slice()[..active]);
            for (position, velocity) in live {
                position.x += velocity.x * dt;
                position.y += velocity.y * dt;
            }
        });

        self.subscriptions.update_pool_group(FACING, ctx.pools, |_, pool| {
            let active = pool.active_count();
            let (rotations, velocities) = pool
                .data_mut()
                .component_array_pair_mut::<Rotation, Velocity>(ROTATION, VELOCITY);
            let live = rotations.as_mut_slice()[..active]
                .iter_mut()
                .zip(&velocities.as_slice()[..active]);
            for (rotation, velocity) in live {
                // A stopped object keeps its last facing.
                if velocity.length() > f32::EPSILON {
                    rotation.0 = velocity.y.atan2(velocity.x);
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
    fn integrates_live_objects_only() {
        let mut pool = Pool::new("bullets", 3);
        pool.add_array::<Position>(POSITION);
        pool.add_array::<Velocity>(VELOCITY);
        pool.add_array::<Rotation>(ROTATION);
        pool.create_objects("", 2);
        for i in 0..3 {
            pool.component_array_mut::<Velocity>(VELOCITY)
                .set(i, Velocity::new(0.0, 10.0));
        }

        let mut pools = PoolSet::new();
        let id = pools.insert(pool).unwrap();
        let mut system = MovementSystem::default();
        assert!(system.subscribe(id, pools.get(id).unwrap()));

        let mut random = Random::new(1);
        let mut ctx = SystemContext {
            pools: &mut pools,
            random: &mut random,
            dt: 0.5,
            tick: 0,
        };
        system.update(&mut ctx);

        let pool = pools.get(id).unwrap();
        let positions = pool.component_array::<Position>(POSITION);
        assert_eq!(positions.get(0), &Position::new(0.0, 5.0));
        assert_eq!(positions.get(1), &Position::new(0.0, 5.0));
        assert_eq!(positions.get(2), &Position::default());
        let facing = pool.component_array::<Rotation>(ROTATION).get(0).0;
        assert!((facing - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    }
}
