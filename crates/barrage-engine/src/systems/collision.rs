use barrage_pool::pool::Pool;
use barrage_pool::system::{PoolType, Subscriptions, System, SystemContext};
use tracing::trace;

use crate::components::{
    Collider, Health, Position, COLLIDER, HEALTH, POSITION, TAG_HOSTILE, TAG_TARGET,
};

const HOSTILE: &str = "hostile";
const TARGETS: &str = "targets";

/// Circle overlap tests between every hostile pool and every target pool.
///
/// On contact the target loses the attacker's damage from its [`Health`]
/// array and is destroyed at zero, or is destroyed outright when it has no
/// health and its collider is `destroy_on_hit`. An attacker with
/// `destroy_on_hit` stops at its first contact.
#[derive(Debug)]
pub struct CollisionSystem {
    subscriptions: Subscriptions,
    scratch: Scratch,
}

/// Position buffers reused across pool pairs and ticks.
#[derive(Debug, Default)]
struct Scratch {
    attackers: Vec<Position>,
    targets: Vec<Position>,
}

impl Scratch {
    fn load(buffer: &mut Vec<Position>, pool: &Pool) {
        buffer.clear();
        buffer.extend_from_slice(&pool.component_array::<Position>(POSITION).as_slice()[..pool.active_count()]);
    }
}

impl Default for CollisionSystem {
    fn default() -> Self {
        let collidable = |name: &str, tag: &str| {
            PoolType::new(name)
                .with_tag(tag)
                .with_array(POSITION)
                .with_component(COLLIDER)
        };
        Self {
            subscriptions: Subscriptions::new()
                .with_type(collidable(HOSTILE, TAG_HOSTILE))
                .with_type(collidable(TARGETS, TAG_TARGET)),
            scratch: Scratch::default(),
        }
    }
}

impl System for CollisionSystem {
    fn subscriptions(&self) -> &Subscriptions {
        &self.subscriptions
    }

    fn subscriptions_mut(&mut self) -> &mut Subscriptions {
        &mut self.subscriptions
    }

    fn update(&mut self, ctx: &mut SystemContext<'_>) {
        let tick = ctx.tick;
        let scratch = &mut self.scratch;
        self.subscriptions
            .update_interaction(HOSTILE, TARGETS, ctx.pools, |attackers, targets| {
                let hits = collide(attackers, targets, scratch);
                if hits > 0 {
                    trace!(tick, attackers = attackers.name(), targets = targets.name(), hits, "collisions");
                }
            });
    }
}

/// Returns the number of contacts.
fn collide(attackers: &mut Pool, targets: &mut Pool, scratch: &mut Scratch) -> usize {
    let attack = *attackers.component::<Collider>(COLLIDER);
    let defend = *targets.component::<Collider>(COLLIDER);
    let reach = attack.radius + defend.radius;
    let reach_squared = reach * reach;
    let has_health = targets.has_component_array(HEALTH);

    Scratch::load(&mut scratch.attackers, attackers);
    Scratch::load(&mut scratch.targets, targets);

    let mut hits = 0;
    for (attacker, from) in scratch.attackers.iter().enumerate() {
        if attackers.is_destroyed(attacker) {
            continue;
        }
        for (target, to) in scratch.targets.iter().enumerate() {
            if targets.is_destroyed(target) || from.distance_squared(*to) > reach_squared {
                continue;
            }
            hits += 1;
            let killed = if has_health {
                let health = targets.component_array_mut::<Health>(HEALTH).get_mut(target);
                health.0 = health.0.saturating_sub(attack.damage);
                health.0 <= 0
            } else {
                defend.destroy_on_hit
            };
            if killed {
                targets.mark_destroyed(target);
            }
            if attack.destroy_on_hit {
                attackers.mark_destroyed(attacker);
                break;
            }
        }
    }
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use barrage_pool::prelude::*;

    fn collidable(name: &str, tag: &str, radius: f32, positions: &[(f32, f32)]) -> Pool {
        let mut pool = Pool::new(name, positions.len());
        pool.add_tag(tag);
        pool.add_array::<Position>(POSITION);
        pool.insert_component(
            COLLIDER,
            Collider {
                radius,
                ..Collider::default()
            },
        );
        pool.create_objects("", positions.len());
        for (i, &(x, y)) in positions.iter().enumerate() {
            pool.component_array_mut::<Position>(POSITION)
                .set(i, Position::new(x, y));
        }
        pool
    }

    #[test]
    fn bullet_stops_at_first_contact() {
        let mut bullets = collidable("bullets", TAG_HOSTILE, 0.5, &[(0.0, 0.0), (10.0, 0.0)]);
        let mut player = collidable("player", TAG_TARGET, 0.5, &[(0.5, 0.0), (0.0, 0.5)]);
        assert_eq!(collide(&mut bullets, &mut player, &mut Scratch::default()), 1);
        assert_eq!(&bullets.destructible()[..2], &[true, false]);
        assert_eq!(&player.destructible()[..2], &[true, false]);
    }

    #[test]
    fn health_absorbs_damage() {
        let mut bullets = collidable("bullets", TAG_HOSTILE, 1.0, &[(0.0, 0.0), (0.0, 0.0)]);
        let mut boss = collidable("boss", TAG_TARGET, 1.0, &[(0.0, 0.0)]);
        boss.add_array::<Health>(HEALTH);
        boss.component_array_mut::<Health>(HEALTH).set(0, Health(3));

        assert_eq!(collide(&mut bullets, &mut boss, &mut Scratch::default()), 2);
        assert_eq!(boss.component_array::<Health>(HEALTH).get(0), &Health(1));
        assert!(!boss.is_destroyed(0));
        assert!(bullets.is_destroyed(0) && bullets.is_destroyed(1));
    }

    #[test]
    fn huge_damage_saturates_health() {
        let mut bullets = collidable("bullets", TAG_HOSTILE, 1.0, &[(0.0, 0.0)]);
        bullets.insert_component(
            COLLIDER,
            Collider {
                radius: 1.0,
                damage: i32::MAX,
                ..Collider::default()
            },
        );
        let mut boss = collidable("boss", TAG_TARGET, 1.0, &[(0.0, 0.0)]);
        boss.add_array::<Health>(HEALTH);
        boss.component_array_mut::<Health>(HEALTH).set(0, Health(-5));

        assert_eq!(collide(&mut bullets, &mut boss, &mut Scratch::default()), 1);
        assert_eq!(boss.component_array::<Health>(HEALTH).get(0), &Health(i32::MIN));
        assert!(boss.is_destroyed(0));
    }

    #[test]
    fn scratch_buffers_are_reused() {
        let mut scratch = Scratch::default();
        let mut bullets = collidable("bullets", TAG_HOSTILE, 0.5, &[(0.0, 0.0), (5.0, 0.0), (9.0, 0.0)]);
        let mut player = collidable("player", TAG_TARGET, 0.5, &[(20.0, 0.0)]);
        assert_eq!(collide(&mut bullets, &mut player, &mut scratch), 0);
        let capacity = scratch.attackers.capacity();

        bullets.mark_destroyed(2);
        bullets.handle_destructions();
        assert_eq!(collide(&mut bullets, &mut player, &mut scratch), 0);
        assert_eq!(scratch.attackers.len(), 2);
        assert_eq!(scratch.attackers.capacity(), capacity);
    }

    #[test]
    fn system_pairs_tagged_pools() {
        let mut pools = PoolSet::new();
        let bullets = pools
            .insert(collidable("bullets", TAG_HOSTILE, 1.0, &[(0.0, 0.0)]))
            .unwrap();
        let player = pools
            .insert(collidable("player", TAG_TARGET, 1.0, &[(1.0, 0.0)]))
            .unwrap();
        let mut system = CollisionSystem::default();
        for id in [bullets, player] {
            system.subscribe(id, pools.get(id).unwrap());
        }
        let mut random = Random::new(1);
        system.update(&mut SystemContext {
            pools: &mut pools,
            random: &mut random,
            dt: 1.0,
            tick: 0,
        });
        assert!(pools.get(player).unwrap().is_destroyed(0));
    }
}
