//! Space snapshots and deterministic state hashing.
//!
//! A [`SpaceSnapshot`] captures the live contents of every pool plus the tick
//! counter and a fingerprint of the random generator. Its BLAKE3 hash is a
//! compact proof of simulation state: two runs of the same scene with the
//! same seed must produce the same hash at the same tick.

use serde::{Deserialize, Serialize};

use barrage_pool::snapshot::PoolSnapshot;

use crate::space::Space;

/// Serializable state of a [`Space`] at one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpaceSnapshot {
    pub tick: u64,
    /// Seed the space's random generator started from.
    pub seed: u64,
    /// Next value the random generator would produce.
    pub rng_fingerprint: u64,
    /// Pools in insertion order.
    pub pools: Vec<PoolSnapshot>,
    /// BLAKE3 hex digest of everything above.
    pub state_hash: String,
}

impl SpaceSnapshot {
    pub fn pool(&self, name: &str) -> Option<&PoolSnapshot> {
        self.pools.iter().find(|pool| pool.name == name)
    }

    /// Recompute the hash and compare it with the stored one.
    pub fn verify(&self) -> bool {
        compute_hash(self.tick, self.seed, self.rng_fingerprint, &self.pools) == self.state_hash
    }
}

/// BLAKE3 over the JSON serialization of the hashed fields. Pool snapshots
/// keep their maps in `BTreeMap`s, so the bytes are deterministic.
fn compute_hash(tick: u64, seed: u64, rng_fingerprint: u64, pools: &[PoolSnapshot]) -> String {
    #[derive(Serialize)]
    struct HashableState<'a> {
        tick: u64,
        seed: u64,
        rng_fingerprint: u64,
        pools: &'a [PoolSnapshot],
    }

    let state = HashableState {
        tick,
        seed,
        rng_fingerprint,
        pools,
    };
    let bytes = serde_json::to_vec(&state).expect("pool snapshots are always JSON-serializable");
    blake3::hash(&bytes).to_hex().to_string()
}

impl Space {
    pub fn capture_snapshot(&self) -> SpaceSnapshot {
        let tick = self.tick_count();
        let seed = self.random().seed();
        let rng_fingerprint = self.random().clone().next_raw();
        let pools: Vec<PoolSnapshot> = self.pools().iter().map(|(_, pool)| pool.snapshot()).collect();
        let state_hash = compute_hash(tick, seed, rng_fingerprint, &pools);
        SpaceSnapshot {
            tick,
            seed,
            rng_fingerprint,
            pools,
            state_hash,
        }
    }

    /// Hash of the current state; see [`SpaceSnapshot::state_hash`].
    pub fn state_hash(&self) -> String {
        self.capture_snapshot().state_hash
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use barrage_pool::prelude::*;

    use crate::tick::TickConfig;

    use super::*;

    fn space(seed: u64) -> Space {
        let config = TickConfig {
            seed,
            ..TickConfig::default()
        };
        let mut space = Space::new(Arc::new(Registry::new()), &config);
        let mut pool = Pool::new("p", 4);
        pool.add_array::<i32>("v");
        pool.create_objects("", 2);
        space.add_pool(pool).unwrap();
        space
    }

    #[test]
    fn equal_states_hash_equal() {
        assert_eq!(space(3).state_hash(), space(3).state_hash());
        assert_eq!(space(3).state_hash().len(), 64);
    }

    #[test]
    fn seed_and_contents_change_the_hash() {
        let base = space(3).state_hash();
        assert_ne!(space(4).state_hash(), base);

        let mut changed = space(3);
        if let Some(pool) = changed.pool_mut("p") {
            pool.component_array_mut::<i32>("v").set(1, 7);
        }
        assert_ne!(changed.state_hash(), base);
    }

    #[test]
    fn snapshot_verifies_and_detects_tampering() {
        let mut snapshot = space(3).capture_snapshot();
        assert!(snapshot.verify());
        assert_eq!(snapshot.pool("p").map(|p| p.active), Some(2));
        snapshot.tick += 1;
        assert!(!snapshot.verify());
    }
}
