//! Spawn/despawn orchestration over the fruit pool
//!
//! Every activation goes through `spawn` and every deactivation through
//! `despawn`, so the pool invariant (free XOR live) and the per-activation
//! reset live in one place.

use glam::Vec2;

use super::bridge::{PARK_POSITION, PhysicsBridge};
use super::fruit::{Fruit, StableId};
use super::physics::{BodyKind, Physics};
use super::pool::{ObjectPool, PoolKey};
use super::rank::{RankChain, RankId};
use crate::error::CoreError;
use crate::tuning::Tuning;

/// Body type requested at spawn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnMode {
    /// Falls freely
    Dynamic,
    /// Held kinematic by the crane
    Hanging,
}

#[derive(Debug)]
pub struct FruitLifecycle {
    pool: ObjectPool<Fruit>,
    next_stable_id: u64,
    grace_seconds: f32,
    /// Scratch for `clear_all`
    scratch: Vec<PoolKey>,
}

impl FruitLifecycle {
    pub fn new(chain: &RankChain, grace_seconds: f32) -> Self {
        Self {
            pool: ObjectPool::new(chain.len()),
            next_stable_id: 1,
            grace_seconds,
            scratch: Vec::new(),
        }
    }

    /// Activate a fruit of `rank` at `position`
    ///
    /// Recycles a pooled instance when one is free, otherwise builds a new
    /// one. Velocity is zeroed, simulation enabled, the body set dynamic (or
    /// kinematic when hanging), detection fidelity re-armed and the spawn
    /// grace window started. A fresh stable id is assigned.
    pub fn spawn<P: Physics>(
        &mut self,
        bridge: &mut PhysicsBridge<P>,
        chain: &RankChain,
        rank: RankId,
        position: Vec2,
        mode: SpawnMode,
        now: f32,
    ) -> Result<PoolKey, CoreError> {
        let template = chain.get(rank).ok_or(CoreError::UnknownRank(rank))?;

        let (key, fresh) = self.pool.acquire_with(rank, |key| {
            let body = bridge.create_fruit_body(template, position, key, true);
            Fruit::new(rank, body)
        });

        let stable_id = StableId(self.next_stable_id);
        self.next_stable_id += 1;

        let fruit = self.pool.get_mut(key).ok_or(CoreError::NotLive(key))?;
        fruit.activate(stable_id, now, self.grace_seconds);
        fruit.hanging = mode == SpawnMode::Hanging;
        let body = fruit.body;

        let physics = bridge.physics_mut();
        physics.set_position(body, position);
        physics.set_simulated(body, true);
        physics.set_body_kind(
            body,
            match mode {
                SpawnMode::Dynamic => BodyKind::Dynamic,
                SpawnMode::Hanging => BodyKind::Kinematic,
            },
        );
        bridge.halt(body);
        fruit.tuner.rearm(bridge.physics_mut(), body, now);

        log::debug!(
            "spawned {:?} rank {} id {} ({})",
            key,
            rank.0,
            stable_id.0,
            if fresh { "fresh" } else { "recycled" }
        );
        Ok(key)
    }

    /// Deactivate a live fruit and return it to its rank's bucket
    ///
    /// The handle must not be used by the caller afterwards.
    pub fn despawn<P: Physics>(
        &mut self,
        bridge: &mut PhysicsBridge<P>,
        key: PoolKey,
    ) -> Result<(), CoreError> {
        let fruit = self.pool.get_mut(key).ok_or(CoreError::NotLive(key))?;
        fruit.hanging = false;
        let body = fruit.body;

        bridge.halt(body);
        let physics = bridge.physics_mut();
        physics.set_simulated(body, false);
        physics.set_body_kind(body, BodyKind::Dynamic);
        physics.set_position(body, PARK_POSITION);

        self.pool.release(key)?;
        Ok(())
    }

    /// Pre-build `count` inactive instances of `rank`
    ///
    /// No grace window, no stable id, no scoring: the instances sit in the
    /// free queue with simulation disabled.
    pub fn warm<P: Physics>(
        &mut self,
        bridge: &mut PhysicsBridge<P>,
        chain: &RankChain,
        rank: RankId,
        count: usize,
    ) -> Result<(), CoreError> {
        let template = chain.get(rank).ok_or(CoreError::UnknownRank(rank))?;
        for _ in 0..count {
            self.pool.insert_free(rank, |key| {
                let body = bridge.create_fruit_body(template, PARK_POSITION, key, false);
                Fruit::new(rank, body)
            });
        }
        Ok(())
    }

    /// Warm every rank listed in `tuning.warm_counts`
    pub fn warm_from_tuning<P: Physics>(
        &mut self,
        bridge: &mut PhysicsBridge<P>,
        chain: &RankChain,
        tuning: &Tuning,
    ) {
        for (i, &count) in tuning.warm_counts.iter().enumerate() {
            let rank = RankId(i as u8);
            if let Err(e) = self.warm(bridge, chain, rank, count) {
                log::warn!("skipping warm-up for rank {}: {}", i, e);
            }
        }
    }

    /// Return every live fruit to the pool
    pub fn clear_all<P: Physics>(&mut self, bridge: &mut PhysicsBridge<P>) -> usize {
        self.scratch.clear();
        self.scratch.extend(self.pool.iter_live().map(|(key, _)| key));
        let mut cleared = 0;
        for i in 0..self.scratch.len() {
            let key = self.scratch[i];
            match self.despawn(bridge, key) {
                Ok(()) => cleared += 1,
                Err(e) => log::warn!("clear skipped {:?}: {}", key, e),
            }
        }
        cleared
    }

    /// Per-step fidelity/sleep management for every live fruit
    pub fn tune<P: Physics>(&mut self, bridge: &mut PhysicsBridge<P>, now: f32, tuning: &Tuning) {
        for (_, fruit) in self.pool.iter_live_mut() {
            let body = fruit.body;
            fruit.tuner.update(bridge.physics_mut(), body, now, tuning);
        }
    }

    #[inline]
    pub fn get(&self, key: PoolKey) -> Option<&Fruit> {
        self.pool.get(key)
    }

    #[inline]
    pub fn get_mut(&mut self, key: PoolKey) -> Option<&mut Fruit> {
        self.pool.get_mut(key)
    }

    pub fn pool(&self) -> &ObjectPool<Fruit> {
        &self.pool
    }

    pub fn live_count(&self) -> usize {
        self.pool.live_count()
    }

    /// Stable id the next activation will receive
    pub fn peek_stable_id(&self) -> StableId {
        StableId(self.next_stable_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::arena::CircleWorld;
    use crate::sim::physics::DetectionMode;

    fn setup() -> (RankChain, PhysicsBridge<CircleWorld>, FruitLifecycle) {
        let chain = RankChain::classic();
        let bridge = PhysicsBridge::new(CircleWorld::default());
        let lifecycle = FruitLifecycle::new(&chain, 0.1);
        (chain, bridge, lifecycle)
    }

    #[test]
    fn test_spawn_resets_physical_state() {
        let (chain, mut bridge, mut life) = setup();
        let key = life
            .spawn(&mut bridge, &chain, RankId(2), Vec2::new(1.0, 4.0), SpawnMode::Dynamic, 0.0)
            .unwrap();
        let fruit = life.get(key).unwrap();
        let body = fruit.body;
        assert_eq!(fruit.rank, RankId(2));
        assert_eq!(fruit.stable_id, StableId(1));
        assert!(fruit.in_grace(0.05));
        assert!(!fruit.merge_locked);

        let physics = bridge.physics();
        assert_eq!(physics.position(body), Vec2::new(1.0, 4.0));
        assert_eq!(physics.velocity(body), Vec2::ZERO);
        assert!(physics.is_simulated(body));
        assert_eq!(physics.body_kind(body), BodyKind::Dynamic);
        assert_eq!(physics.detection_mode(body), DetectionMode::Continuous);
    }

    #[test]
    fn test_hanging_spawn_is_kinematic() {
        let (chain, mut bridge, mut life) = setup();
        let key = life
            .spawn(&mut bridge, &chain, RankId(0), Vec2::new(0.0, 9.0), SpawnMode::Hanging, 0.0)
            .unwrap();
        let fruit = life.get(key).unwrap();
        assert!(fruit.hanging);
        assert_eq!(bridge.physics().body_kind(fruit.body), BodyKind::Kinematic);
    }

    #[test]
    fn test_despawn_disables_and_recycles() {
        let (chain, mut bridge, mut life) = setup();
        let key = life
            .spawn(&mut bridge, &chain, RankId(0), Vec2::new(0.0, 3.0), SpawnMode::Dynamic, 0.0)
            .unwrap();
        let body = life.get(key).unwrap().body;
        bridge.physics_mut().set_velocity(body, Vec2::new(2.0, -1.0));

        life.despawn(&mut bridge, key).unwrap();
        assert!(life.get(key).is_none());
        assert_eq!(bridge.physics().velocity(body), Vec2::ZERO);
        assert!(!bridge.physics().is_simulated(body));
        assert_eq!(life.pool().free_count(RankId(0)), 1);

        // Second despawn is an error, not a double free
        assert_eq!(life.despawn(&mut bridge, key), Err(CoreError::NotLive(key)));

        let again = life
            .spawn(&mut bridge, &chain, RankId(0), Vec2::new(1.0, 3.0), SpawnMode::Dynamic, 1.0)
            .unwrap();
        assert_eq!(again, key);
        assert_eq!(life.get(again).unwrap().stable_id, StableId(2));
    }

    #[test]
    fn test_unknown_rank_is_skipped() {
        let (chain, mut bridge, mut life) = setup();
        let result = life.spawn(&mut bridge, &chain, RankId(40), Vec2::ZERO, SpawnMode::Dynamic, 0.0);
        assert_eq!(result, Err(CoreError::UnknownRank(RankId(40))));
        assert_eq!(life.live_count(), 0);
        assert_eq!(life.peek_stable_id(), StableId(1));
    }

    #[test]
    fn test_warm_has_no_gameplay_side_effects() {
        let (chain, mut bridge, mut life) = setup();
        life.warm(&mut bridge, &chain, RankId(1), 5).unwrap();
        assert_eq!(life.pool().free_count(RankId(1)), 5);
        assert_eq!(life.live_count(), 0);
        assert_eq!(life.peek_stable_id(), StableId(1));
        assert_eq!(bridge.physics().body_count(), 5);

        life.spawn(&mut bridge, &chain, RankId(1), Vec2::new(0.0, 2.0), SpawnMode::Dynamic, 0.0)
            .unwrap();
        // Recycled, not built
        assert_eq!(bridge.physics().body_count(), 5);
    }

    #[test]
    fn test_clear_all() {
        let (chain, mut bridge, mut life) = setup();
        for i in 0..4 {
            life.spawn(
                &mut bridge,
                &chain,
                RankId(i),
                Vec2::new(i as f32, 2.0),
                SpawnMode::Dynamic,
                0.0,
            )
            .unwrap();
        }
        assert_eq!(life.clear_all(&mut bridge), 4);
        assert_eq!(life.live_count(), 0);
        assert_eq!(life.pool().capacity(), 4);
    }
}
