//! Pool bookkeeping under long spawn/despawn churn

use fruit_drop::Tuning;
use fruit_drop::sim::{
    CircleWorld, FruitLifecycle, ObjectPool, PhysicsBridge, PoolKey, RankChain, RankId, SpawnMode,
};
use glam::Vec2;
use proptest::prelude::*;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

const WARM: usize = 12;
const RANKS: u8 = 4;

fn warmed() -> (RankChain, PhysicsBridge<CircleWorld>, FruitLifecycle) {
    let chain = RankChain::classic();
    let mut bridge = PhysicsBridge::new(CircleWorld::default());
    let mut life = FruitLifecycle::new(&chain, Tuning::default().grace_seconds);
    for rank in 0..RANKS {
        life.warm(&mut bridge, &chain, RankId(rank), WARM).unwrap();
    }
    (chain, bridge, life)
}

#[test]
fn test_ten_thousand_cycles_allocate_nothing() {
    let (chain, mut bridge, mut life) = warmed();
    let bodies_after_warm = bridge.physics().body_count();
    let mut live: Vec<PoolKey> = Vec::new();
    let mut rng = Pcg32::seed_from_u64(42);

    for cycle in 0..10_000 {
        let rank = RankId(rng.random_range(0..RANKS));
        let at_cap = life.pool().live_count_of(rank) >= WARM;
        if !live.is_empty() && (at_cap || rng.random_bool(0.5)) {
            let idx = rng.random_range(0..live.len());
            let key = live.swap_remove(idx);
            life.despawn(&mut bridge, key).unwrap();
        } else if !at_cap {
            let pos = Vec2::new(rng.random_range(-3.0..3.0), 2.0);
            let key = life
                .spawn(&mut bridge, &chain, rank, pos, SpawnMode::Dynamic, cycle as f32)
                .unwrap();
            live.push(key);
        }

        for r in 0..RANKS {
            let r = RankId(r);
            assert_eq!(life.pool().total_of(r), WARM, "rank {:?} at cycle {}", r, cycle);
        }
    }

    assert_eq!(life.pool().capacity(), WARM * RANKS as usize);
    assert_eq!(bridge.physics().body_count(), bodies_after_warm);
    assert_eq!(life.live_count(), live.len());
}

#[test]
fn test_double_release_is_rejected() {
    let mut pool: ObjectPool<u32> = ObjectPool::new(2);
    let (key, _) = pool.acquire_with(RankId(1), |k| k.0);
    assert_eq!(pool.release(key), Ok(RankId(1)));
    assert!(pool.release(key).is_err());
    assert_eq!(pool.free_count(RankId(1)), 1);
}

#[derive(Debug, Clone)]
enum Op {
    Spawn(u8),
    Despawn(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..RANKS).prop_map(Op::Spawn),
        any::<usize>().prop_map(Op::Despawn),
    ]
}

proptest! {
    /// Every slot is either live or free, never both, never lost
    #[test]
    fn prop_free_plus_live_is_total(ops in prop::collection::vec(op(), 1..200)) {
        let (chain, mut bridge, mut life) = warmed();
        let mut live: Vec<PoolKey> = Vec::new();

        for op in ops {
            match op {
                Op::Spawn(rank) => {
                    let key = life
                        .spawn(&mut bridge, &chain, RankId(rank), Vec2::new(0.0, 2.0), SpawnMode::Dynamic, 0.0)
                        .unwrap();
                    prop_assert!(!live.contains(&key));
                    live.push(key);
                }
                Op::Despawn(i) if !live.is_empty() => {
                    let key = live.swap_remove(i % live.len());
                    life.despawn(&mut bridge, key).unwrap();
                }
                Op::Despawn(_) => {}
            }

            let pool = life.pool();
            let mut total = 0;
            for r in 0..RANKS {
                let r = RankId(r);
                prop_assert_eq!(pool.free_count(r) + pool.live_count_of(r), pool.total_of(r));
                prop_assert!(pool.total_of(r) >= WARM);
                total += pool.total_of(r);
            }
            prop_assert_eq!(total, pool.capacity());
            prop_assert_eq!(pool.live_count(), live.len());
        }
    }
}
