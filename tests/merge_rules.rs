//! Merge resolution rules across whole passes

use std::collections::HashSet;

use fruit_drop::Tuning;
use fruit_drop::sim::{
    ArenaConfig, CircleWorld, FruitLifecycle, Game, GameEvent, MergeResolver, PhysicsBridge,
    PoolKey, RankChain, RankId, SpawnMode, StableId,
};
use glam::Vec2;
use proptest::prelude::*;

struct Field {
    chain: RankChain,
    bridge: PhysicsBridge<CircleWorld>,
    life: FruitLifecycle,
    resolver: MergeResolver,
}

impl Field {
    fn new() -> Self {
        let tuning = Tuning::default();
        let chain = RankChain::classic();
        let world = CircleWorld::new(ArenaConfig {
            gravity: Vec2::ZERO,
            ..ArenaConfig::default()
        });
        Self {
            life: FruitLifecycle::new(&chain, tuning.grace_seconds),
            chain,
            bridge: PhysicsBridge::new(world),
            resolver: MergeResolver::new(&tuning),
        }
    }

    fn spawn_at(&mut self, rank: u8, x: f32, y: f32, now: f32) -> PoolKey {
        self.life
            .spawn(
                &mut self.bridge,
                &self.chain,
                RankId(rank),
                Vec2::new(x, y),
                SpawnMode::Dynamic,
                now,
            )
            .unwrap()
    }

    fn spawn(&mut self, rank: u8, x: f32, y: f32) -> PoolKey {
        self.spawn_at(rank, x, y, 0.0)
    }

    fn resolve(&mut self, now: f32) -> usize {
        self.resolver
            .resolve(now, &self.chain, &mut self.life, &mut self.bridge)
            .len()
    }
}

#[test]
fn test_three_way_tie_merges_two_highest_ids() {
    let mut field = Field::new();
    // Far-apart fillers of another rank take ids 1-4, 6 and 8
    for (x, y) in [(-3.0, 1.0), (3.0, 1.0), (-3.0, 3.0), (3.0, 3.0)] {
        field.spawn(3, x, y);
    }
    let id5 = field.spawn(0, 0.0, 2.0);
    field.spawn(3, -3.0, 5.0);
    let id7 = field.spawn(0, 0.3, 2.0);
    field.spawn(3, 3.0, 5.0);
    let id9 = field.spawn(0, 0.15, 2.2);

    let outcomes = field
        .resolver
        .resolve(1.0, &field.chain, &mut field.life, &mut field.bridge)
        .to_vec();

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].consumed, [StableId(7), StableId(9)]);
    assert!(field.life.get(id5).is_some());
    assert!(field.life.get(id7).is_none());
    assert!(field.life.get(id9).is_none());
}

#[test]
fn test_terminal_rank_never_spawns() {
    let mut field = Field::new();
    let top = field.chain.terminal().0;
    field.spawn(top, -1.0, 2.0);
    field.spawn(top, 1.0, 2.0);
    let capacity = field.life.pool().capacity();

    for i in 1..20 {
        assert_eq!(field.resolve(i as f32 * 0.1), 0);
    }
    assert_eq!(field.life.live_count(), 2);
    assert_eq!(field.life.pool().capacity(), capacity);
}

#[test]
fn test_merge_product_is_immune_during_grace() {
    let mut field = Field::new();
    // A waiting strawberry right where the cherries' product will appear
    let waiting = field.spawn(1, 0.2, 2.0);
    field.spawn(0, 0.0, 2.0);
    field.spawn(0, 0.4, 2.0);

    assert_eq!(field.resolve(1.0), 1);
    assert!(field.life.get(waiting).is_some());

    // Product spawned at t=1.0; grace is 0.1
    assert_eq!(field.resolve(1.05), 0);
    assert!(field.life.get(waiting).is_some());
    assert_eq!(field.resolve(1.11), 1);
    assert!(field.life.get(waiting).is_none());
}

#[test]
fn test_resolution_pass_end_to_end() {
    let mut tuning = Tuning::default();
    tuning.arena.gravity = Vec2::ZERO;
    let mut game = Game::headless(tuning, 1).unwrap();
    let free_before = game.lifecycle.pool().free_count(RankId(0));

    let a = game.spawn_fruit(RankId(0), Vec2::new(0.0, 2.0)).unwrap();
    let b = game.spawn_fruit(RankId(0), Vec2::new(0.4, 2.0)).unwrap();
    assert_eq!(game.lifecycle.get(a).unwrap().stable_id, StableId(1));
    assert_eq!(game.lifecycle.get(b).unwrap().stable_id, StableId(2));

    let outcomes = game
        .resolver
        .resolve(1.0, &game.chain, &mut game.lifecycle, &mut game.bridge)
        .to_vec();
    for outcome in &outcomes {
        game.session.add_score(outcome.score);
    }

    let fruits: Vec<_> = game.fruits().collect();
    assert_eq!(fruits.len(), 1);
    assert_eq!(fruits[0].rank, RankId(1));
    assert!((fruits[0].position - Vec2::new(0.2, 2.0)).length() < 1e-5);
    assert_eq!(game.lifecycle.pool().free_count(RankId(0)), free_before);
    assert_eq!(game.session.score(), 3);
}

#[test]
fn test_resting_pair_merges_through_full_step() {
    let mut game = Game::headless(Tuning::default(), 1).unwrap();
    game.spawn_fruit(RankId(0), Vec2::new(0.0, 0.25)).unwrap();
    game.spawn_fruit(RankId(0), Vec2::new(0.45, 0.25)).unwrap();

    for _ in 0..12 {
        game.step(1.0 / 60.0);
    }

    let merged: Vec<_> = game
        .drain_events()
        .filter(|e| matches!(e, GameEvent::Merged { .. }))
        .collect();
    assert_eq!(merged.len(), 1);
    assert_eq!(game.session.score(), 3);
    let ranks: Vec<_> = game.fruits().map(|f| f.rank).collect();
    assert_eq!(ranks, vec![RankId(1)]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Committed pairs form a matching and every commit is applied
    #[test]
    fn prop_commits_are_disjoint(
        fruits in prop::collection::vec((0u8..3, -1.5f32..1.5, 1.0f32..4.0), 2..40),
    ) {
        let mut field = Field::new();
        for &(rank, x, y) in &fruits {
            field.spawn(rank, x, y);
        }
        let live_before = field.life.live_count();

        field.resolver.sweep(1.0, &field.chain, &mut field.life, &mut field.bridge);
        let commits = field.resolver.pending().to_vec();

        let mut seen = HashSet::new();
        for commit in &commits {
            prop_assert!(commit.initiator != commit.partner);
            prop_assert!(seen.insert(commit.initiator));
            prop_assert!(seen.insert(commit.partner));
            let a = field.life.get(commit.initiator).unwrap();
            let b = field.life.get(commit.partner).unwrap();
            prop_assert_eq!(a.rank, b.rank);
            prop_assert!(b.stable_id > a.stable_id);
        }

        field.resolver.apply(1.0, &field.chain, &mut field.life, &mut field.bridge);
        prop_assert_eq!(field.resolver.outcomes().len(), commits.len());
        prop_assert_eq!(field.life.live_count(), live_before - commits.len());
    }

    /// Over consecutive physics steps no fruit joins two merges in one step
    #[test]
    fn prop_at_most_one_merge_per_step(
        drops in prop::collection::vec((0u8..2, -2.5f32..2.5), 4..24),
    ) {
        let mut game = Game::headless(Tuning::default(), 5).unwrap();
        for (i, &(rank, x)) in drops.iter().enumerate() {
            game.spawn_fruit(RankId(rank), Vec2::new(x, 1.0 + i as f32 * 0.6)).unwrap();
        }
        for _ in 0..180 {
            game.step(1.0 / 60.0);
            let mut consumed = HashSet::new();
            for outcome in game.resolver.outcomes() {
                for id in outcome.consumed {
                    prop_assert!(consumed.insert(id));
                }
            }
        }
    }
}
