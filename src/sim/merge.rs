//! Merge resolution
//!
//! Once per physics step every live fruit searches its contacts and overlaps
//! for a same-rank partner. Fruits are visited in descending stable-id order
//! and each picks the candidate with the highest stable id; a merge commits
//! only when that candidate's id is higher than the initiator's, so each
//! pair is driven by exactly one side.
//!
//! Commits only lock the pair. Spawning the product, the impulse, scoring
//! and despawning both inputs happen after the sweep, in commit order, so a
//! slot released mid-sweep can never be handed out to a later check.

use glam::Vec2;

use super::bridge::PhysicsBridge;
use super::fruit::StableId;
use super::lifecycle::{FruitLifecycle, SpawnMode};
use super::physics::Physics;
use super::pool::PoolKey;
use super::rank::{RankChain, RankId};
use crate::error::CoreError;
use crate::tuning::Tuning;

/// A locked pair awaiting its side effects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeCommit {
    pub initiator: PoolKey,
    pub partner: PoolKey,
    pub rank: RankId,
}

/// A completed merge
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergeOutcome {
    pub from: RankId,
    pub into: RankId,
    /// Midpoint of the two inputs, where the product appeared
    pub position: Vec2,
    /// Points awarded (score value of the product's rank)
    pub score: u32,
    pub product: PoolKey,
    pub consumed: [StableId; 2],
}

#[derive(Debug)]
pub struct MergeResolver {
    cooldown: f32,
    impulse_min: f32,
    impulse_max: f32,
    /// Visit order for the current sweep
    order: Vec<(StableId, PoolKey)>,
    commits: Vec<MergeCommit>,
    outcomes: Vec<MergeOutcome>,
}

impl MergeResolver {
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            cooldown: tuning.merge_attempt_cooldown,
            impulse_min: tuning.merge_impulse_min,
            impulse_max: tuning.merge_impulse_max,
            order: Vec::new(),
            commits: Vec::new(),
            outcomes: Vec::new(),
        }
    }

    /// Run one resolution pass: sweep, then apply every commit
    pub fn resolve<P: Physics>(
        &mut self,
        now: f32,
        chain: &RankChain,
        lifecycle: &mut FruitLifecycle,
        bridge: &mut PhysicsBridge<P>,
    ) -> &[MergeOutcome] {
        self.sweep(now, chain, lifecycle, bridge);
        self.apply(now, chain, lifecycle, bridge);
        &self.outcomes
    }

    /// Candidate search for every live fruit. Only locks pairs.
    pub fn sweep<P: Physics>(
        &mut self,
        now: f32,
        chain: &RankChain,
        lifecycle: &mut FruitLifecycle,
        bridge: &mut PhysicsBridge<P>,
    ) {
        self.commits.clear();
        self.order.clear();
        self.order.extend(
            lifecycle
                .pool()
                .iter_live()
                .map(|(key, fruit)| (fruit.stable_id, key)),
        );
        self.order.sort_unstable_by(|a, b| b.0.cmp(&a.0));

        for i in 0..self.order.len() {
            let key = self.order[i].1;
            let Some(partner) = self.best_candidate(key, now, chain, lifecycle, bridge) else {
                continue;
            };
            if let Err(e) = self.try_merge(key, partner, now, chain, lifecycle) {
                log::warn!("merge of {:?} with {:?} rejected: {}", key, partner, e);
            }
        }
    }

    /// Highest-id eligible partner for `key`, if any
    fn best_candidate<P: Physics>(
        &self,
        key: PoolKey,
        now: f32,
        chain: &RankChain,
        lifecycle: &FruitLifecycle,
        bridge: &mut PhysicsBridge<P>,
    ) -> Option<PoolKey> {
        let me = lifecycle.get(key)?;
        if !me.is_mergeable(now) || me.hanging || chain.is_terminal(me.rank) {
            return None;
        }
        let (rank, body) = (me.rank, me.body);

        bridge.gather_candidates(body);
        let mut best: Option<(StableId, PoolKey)> = None;
        for hit in bridge.candidates() {
            if hit.trigger {
                continue;
            }
            let Some(other_key) = bridge.owner_of(hit.body) else {
                continue;
            };
            if other_key == key {
                continue;
            }
            let Some(other) = lifecycle.get(other_key) else {
                continue;
            };
            if other.merge_locked || other.rank != rank || other.in_grace(now) || other.hanging {
                continue;
            }
            if best.is_none_or(|(id, _)| other.stable_id > id) {
                best = Some((other.stable_id, other_key));
            }
        }
        best.map(|(_, k)| k)
    }

    /// Authoritative merge check between an initiator and its chosen partner
    ///
    /// Stamps the initiator's debounce, re-validates both sides and locks the
    /// pair when the partner has the higher stable id. Returns whether a
    /// commit was recorded. Errors are invariant violations the caller
    /// should log.
    pub fn try_merge(
        &mut self,
        initiator: PoolKey,
        partner: PoolKey,
        now: f32,
        chain: &RankChain,
        lifecycle: &mut FruitLifecycle,
    ) -> Result<bool, CoreError> {
        let me = lifecycle
            .get_mut(initiator)
            .ok_or(CoreError::NotLive(initiator))?;
        if me.is_debounced(now, self.cooldown) {
            return Ok(false);
        }
        me.last_merge_attempt_at = now;
        if me.merge_locked {
            return Err(CoreError::AlreadyLocked(initiator));
        }
        if me.in_grace(now) {
            return Ok(false);
        }
        let (rank, my_id) = (me.rank, me.stable_id);

        let other = lifecycle.get(partner).ok_or(CoreError::NotLive(partner))?;
        if other.merge_locked {
            return Err(CoreError::AlreadyLocked(partner));
        }
        if other.in_grace(now) || other.rank != rank {
            return Ok(false);
        }
        if chain.next_of(rank).is_none() {
            return Err(CoreError::TerminalRank(rank));
        }
        if other.stable_id <= my_id {
            return Ok(false);
        }

        for key in [initiator, partner] {
            if let Some(fruit) = lifecycle.get_mut(key) {
                fruit.merge_locked = true;
            }
        }
        self.commits.push(MergeCommit {
            initiator,
            partner,
            rank,
        });
        Ok(true)
    }

    /// Apply every recorded commit in order
    pub fn apply<P: Physics>(
        &mut self,
        now: f32,
        chain: &RankChain,
        lifecycle: &mut FruitLifecycle,
        bridge: &mut PhysicsBridge<P>,
    ) {
        self.outcomes.clear();
        for i in 0..self.commits.len() {
            let commit = self.commits[i];
            match self.apply_one(commit, now, chain, lifecycle, bridge) {
                Ok(outcome) => {
                    log::debug!(
                        "merged rank {} -> {} at ({:.2}, {:.2}) for {}",
                        outcome.from.0,
                        outcome.into.0,
                        outcome.position.x,
                        outcome.position.y,
                        outcome.score
                    );
                    self.outcomes.push(outcome);
                }
                Err(e) => {
                    log::warn!("dropping merge commit {:?}: {}", commit, e);
                    for key in [commit.initiator, commit.partner] {
                        if let Some(fruit) = lifecycle.get_mut(key) {
                            fruit.merge_locked = false;
                        }
                    }
                }
            }
        }
        self.commits.clear();
    }

    fn apply_one<P: Physics>(
        &self,
        commit: MergeCommit,
        now: f32,
        chain: &RankChain,
        lifecycle: &mut FruitLifecycle,
        bridge: &mut PhysicsBridge<P>,
    ) -> Result<MergeOutcome, CoreError> {
        let a = lifecycle
            .get(commit.initiator)
            .ok_or(CoreError::NotLive(commit.initiator))?;
        let b = lifecycle
            .get(commit.partner)
            .ok_or(CoreError::NotLive(commit.partner))?;
        let consumed = [a.stable_id, b.stable_id];
        let (body_a, body_b) = (a.body, b.body);
        let next = chain
            .next_of(commit.rank)
            .ok_or(CoreError::TerminalRank(commit.rank))?;

        bridge.wake_dynamic(body_a);
        bridge.wake_dynamic(body_b);

        let physics = bridge.physics();
        let position = (physics.position(body_a) + physics.position(body_b)) * 0.5;
        let momentum = bridge.momentum(body_a) + bridge.momentum(body_b);

        let product = lifecycle.spawn(bridge, chain, next.id, position, SpawnMode::Dynamic, now)?;
        if let Some(fruit) = lifecycle.get(product) {
            let pop = momentum.clamp(self.impulse_min, self.impulse_max);
            bridge.physics_mut().apply_impulse(fruit.body, Vec2::Y * pop);
        }

        lifecycle.despawn(bridge, commit.initiator)?;
        lifecycle.despawn(bridge, commit.partner)?;

        Ok(MergeOutcome {
            from: commit.rank,
            into: next.id,
            position,
            score: next.score_value,
            product,
            consumed,
        })
    }

    /// Commits recorded by the last sweep and not yet applied
    pub fn pending(&self) -> &[MergeCommit] {
        &self.commits
    }

    /// Outcomes of the last pass
    pub fn outcomes(&self) -> &[MergeOutcome] {
        &self.outcomes
    }
}
