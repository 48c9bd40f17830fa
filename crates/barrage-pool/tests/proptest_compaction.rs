//! Property tests for pool compaction.
//!
//! Random liveness patterns and random operation sequences are applied to
//! pools, and the ordering and alignment guarantees of compaction are checked
//! after every step.

use barrage_pool::array::{compact_flags, first_destroyed};
use barrage_pool::prelude::*;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum PoolOp {
    Create(usize),
    Destroy(usize),
    Compact,
}

fn pool_op_strategy() -> impl Strategy<Value = PoolOp> {
    prop_oneof![
        (0..6usize).prop_map(PoolOp::Create),
        (0..40usize).prop_map(PoolOp::Destroy),
        Just(PoolOp::Compact),
    ]
}

/// A pool whose `Id` array holds a unique tag per created object.
fn tagged_pool(capacity: usize) -> Pool {
    let mut pool = Pool::new("tagged", capacity);
    pool.add_array::<u64>("Id");
    pool.add_array::<f32>("Shadow");
    pool
}

fn live_ids(pool: &Pool) -> Vec<u64> {
    pool.component_array::<u64>("Id").as_slice()[..pool.active_count()].to_vec()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2_000))]

    #[test]
    fn compaction_is_a_stable_partition(flags in prop::collection::vec(any::<bool>(), 0..64)) {
        let values: Vec<usize> = (0..flags.len()).collect();
        let mut array = TypedArray::from_vec(values);
        let new_end = array.handle_destructions(&flags, 0, flags.len());

        let expected: Vec<usize> = (0..flags.len()).filter(|&i| !flags[i]).collect();
        prop_assert_eq!(new_end, expected.len());
        prop_assert_eq!(&array.as_slice()[..new_end], expected.as_slice());
    }

    #[test]
    fn compaction_from_write_index_leaves_prefix(
        flags in prop::collection::vec(any::<bool>(), 1..64),
        split in 0..64usize,
    ) {
        let write_index = split % flags.len();
        let mut flags = flags;
        for flag in &mut flags[..write_index] {
            *flag = false;
        }
        let mut array = TypedArray::from_vec((0..flags.len()).collect::<Vec<usize>>());
        let new_end = array.handle_destructions(&flags, write_index, flags.len());

        prop_assert_eq!(&array.as_slice()[..write_index], &(0..write_index).collect::<Vec<_>>()[..]);
        let survivors = flags.iter().filter(|dead| !**dead).count();
        prop_assert_eq!(new_end, survivors);
    }

    #[test]
    fn compact_flags_matches_array_compaction(flags in prop::collection::vec(any::<bool>(), 0..64)) {
        let mut array = TypedArray::from_vec((0..flags.len()).collect::<Vec<usize>>());
        let array_end = array.handle_destructions(&flags, 0, flags.len());

        let mut own = flags.clone();
        let flags_end = compact_flags(&mut own, 0, flags.len());
        prop_assert_eq!(array_end, flags_end);
        prop_assert!(own[..flags_end].iter().all(|dead| !dead));
        prop_assert_eq!(first_destroyed(&own, flags_end), None);
    }

    #[test]
    fn second_compaction_is_a_noop(flags in prop::collection::vec(any::<bool>(), 1..32)) {
        let mut pool = tagged_pool(flags.len());
        pool.create_objects("", flags.len());
        for i in 0..flags.len() {
            pool.component_array_mut::<u64>("Id").set(i, i as u64);
        }
        for (i, dead) in flags.iter().enumerate() {
            if *dead {
                pool.mark_destroyed(i);
            }
        }
        pool.handle_destructions();
        let after_first = live_ids(&pool);
        prop_assert_eq!(pool.handle_destructions(), 0);
        prop_assert_eq!(live_ids(&pool), after_first);
    }

    #[test]
    fn pool_invariants_hold_under_random_ops(ops in prop::collection::vec(pool_op_strategy(), 1..60)) {
        let mut pool = tagged_pool(24);
        let mut model: Vec<u64> = Vec::new();
        let mut next_id = 1u64;

        for op in ops {
            match op {
                PoolOp::Create(count) => {
                    let range = pool.create_objects("", count);
                    for i in range {
                        pool.component_array_mut::<u64>("Id").set(i, next_id);
                        pool.component_array_mut::<f32>("Shadow").set(i, next_id as f32);
                        model.push(next_id);
                        next_id += 1;
                    }
                }
                PoolOp::Destroy(i) => {
                    if pool.active_count() > 0 {
                        pool.mark_destroyed(i % pool.active_count());
                    }
                }
                PoolOp::Compact => {
                    let flags = pool.destructible()[..pool.active_count()].to_vec();
                    let mut position = 0;
                    model.retain(|_| {
                        let keep = !flags[position];
                        position += 1;
                        keep
                    });
                    pool.handle_destructions();
                    prop_assert_eq!(live_ids(&pool), model.clone());
                }
            }

            prop_assert!(pool.active_count() <= pool.capacity());
            prop_assert_eq!(pool.queued_count(), 0);
            let ids = live_ids(&pool);
            let shadows = &pool.component_array::<f32>("Shadow").as_slice()[..pool.active_count()];
            for (id, shadow) in ids.iter().zip(shadows) {
                prop_assert_eq!(*id as f32, *shadow);
            }
        }
    }
}
