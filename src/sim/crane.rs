//! Player-controlled dropper
//!
//! Holds one kinematic fruit at the hang height. Releasing the press drops
//! it, the crane snaps back to center and a new fruit is scheduled after a
//! delay measured in sim time (so pausing the sim pauses the timer).

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::bridge::PhysicsBridge;
use super::lifecycle::{FruitLifecycle, SpawnMode};
use super::physics::Physics;
use super::pool::PoolKey;
use super::rank::{RankChain, RankId};
use crate::tuning::Tuning;

#[derive(Debug, Clone)]
pub struct Crane {
    x: f32,
    min_x: f32,
    max_x: f32,
    center_x: f32,
    hang_y: f32,
    post_drop_delay: f32,
    starting_ranks: u8,
    carried: Option<PoolKey>,
    /// Sim seconds until the next carried fruit appears
    pending_spawn: Option<f32>,
    rng: Pcg32,
    pressed: bool,
    ui_blocked: bool,
}

impl Crane {
    pub fn new(tuning: &Tuning, seed: u64) -> Self {
        Self {
            x: tuning.crane_center_x,
            min_x: tuning.crane_min_x,
            max_x: tuning.crane_max_x,
            center_x: tuning.crane_center_x,
            hang_y: tuning.hang_y,
            post_drop_delay: tuning.post_drop_delay,
            starting_ranks: tuning.starting_ranks,
            carried: None,
            pending_spawn: None,
            rng: Pcg32::seed_from_u64(seed),
            pressed: false,
            ui_blocked: false,
        }
    }

    /// Hang point
    #[inline]
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.hang_y)
    }

    #[inline]
    pub fn carried(&self) -> Option<PoolKey> {
        self.carried
    }

    pub fn has_pending_spawn(&self) -> bool {
        self.pending_spawn.is_some()
    }

    /// Follow the pointer, clamped to the rails
    pub fn set_target_x(&mut self, x: f32) {
        self.x = x.clamp(self.min_x, self.max_x);
    }

    pub fn center_instant(&mut self) {
        self.x = self.center_x;
    }

    /// While blocked, presses are ignored
    pub fn set_ui_blocked(&mut self, blocked: bool) {
        self.ui_blocked = blocked;
        if blocked {
            self.pressed = false;
        }
    }

    pub fn is_ui_blocked(&self) -> bool {
        self.ui_blocked
    }

    /// Forget any press in progress so its release does not drop
    pub fn clear_press(&mut self) {
        self.pressed = false;
    }

    /// Feed the current press state; true on the release edge
    pub fn update_press(&mut self, pressed: bool) -> bool {
        if self.ui_blocked {
            self.pressed = false;
            return false;
        }
        let released = self.pressed && !pressed;
        self.pressed = pressed;
        released
    }

    /// Uniform pick among the starting ranks
    pub fn pick_rank(&mut self, chain: &RankChain) -> RankId {
        let n = usize::from(self.starting_ranks).clamp(1, chain.len().max(1));
        RankId(self.rng.random_range(0..n) as u8)
    }

    /// Spawn a hanging fruit now, cancelling any scheduled spawn
    pub fn spawn_now<P: Physics>(
        &mut self,
        lifecycle: &mut FruitLifecycle,
        bridge: &mut PhysicsBridge<P>,
        chain: &RankChain,
        now: f32,
    ) -> Option<PoolKey> {
        self.pending_spawn = None;
        if let Some(key) = self.carried {
            if lifecycle.get(key).is_some() {
                return Some(key);
            }
            self.carried = None;
        }
        let rank = self.pick_rank(chain);
        match lifecycle.spawn(bridge, chain, rank, self.position(), SpawnMode::Hanging, now) {
            Ok(key) => {
                self.carried = Some(key);
                Some(key)
            }
            Err(e) => {
                log::warn!("crane spawn failed: {}", e);
                None
            }
        }
    }

    /// Schedule the next carried fruit `after` seconds of sim time from now
    pub fn schedule_spawn(&mut self, after: f32) {
        self.pending_spawn = Some(after.max(0.0));
    }

    /// Release the carried fruit into the simulation
    ///
    /// Snaps the crane to center and schedules the next fruit. Returns the
    /// dropped fruit, or None when nothing (live) was held.
    pub fn drop_carried<P: Physics>(
        &mut self,
        lifecycle: &mut FruitLifecycle,
        bridge: &mut PhysicsBridge<P>,
        now: f32,
    ) -> Option<PoolKey> {
        let key = self.carried.take()?;
        let Some(fruit) = lifecycle.get_mut(key) else {
            log::warn!("carried fruit {:?} vanished before drop", key);
            return None;
        };
        fruit.hanging = false;
        let body = fruit.body;

        bridge.physics_mut().set_simulated(body, true);
        bridge.wake_dynamic(body);
        // Falling fruit gets full-fidelity detection again
        fruit.tuner.rearm(bridge.physics_mut(), body, now);

        self.center_instant();
        self.schedule_spawn(self.post_drop_delay);
        log::debug!("dropped {:?}", key);
        Some(key)
    }

    /// Despawn the carried fruit and cancel any scheduled spawn
    pub fn force_clear_carried<P: Physics>(
        &mut self,
        lifecycle: &mut FruitLifecycle,
        bridge: &mut PhysicsBridge<P>,
    ) {
        self.pending_spawn = None;
        if let Some(key) = self.carried.take() {
            if let Err(e) = lifecycle.despawn(bridge, key) {
                log::warn!("carried fruit already gone: {}", e);
            }
        }
    }

    /// Per-step: keep the carried fruit on the hook and run the spawn timer.
    /// Returns a newly spawned carried fruit.
    pub fn tick<P: Physics>(
        &mut self,
        dt: f32,
        lifecycle: &mut FruitLifecycle,
        bridge: &mut PhysicsBridge<P>,
        chain: &RankChain,
        now: f32,
    ) -> Option<PoolKey> {
        if let Some(fruit) = self.carried.and_then(|key| lifecycle.get(key)) {
            bridge.physics_mut().set_position(fruit.body, self.position());
        }

        let remaining = self.pending_spawn.as_mut()?;
        *remaining -= dt;
        if *remaining > 0.0 {
            return None;
        }
        self.spawn_now(lifecycle, bridge, chain, now)
    }

    /// Back to center with no press in progress
    pub fn reset(&mut self) {
        self.center_instant();
        self.pressed = false;
    }
}
