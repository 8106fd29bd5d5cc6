//! Fruit objects and their per-activation state
//!
//! Position, velocity and body type live in the physics simulation; a fruit
//! only holds the handle. Everything here is reset on each activation.

use serde::{Deserialize, Serialize};

use super::physics::{BodyHandle, BodyKind, DetectionMode, Physics};
use super::rank::RankId;
use crate::tuning::Tuning;

/// "Never attempted" sentinel for the merge debounce
const NEVER: f32 = f32::NEG_INFINITY;

/// Monotonic activation counter used only for merge tie-breaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StableId(pub u64);

/// A pooled fruit
#[derive(Debug, Clone)]
pub struct Fruit {
    /// Archetype; changes only through despawn/respawn
    pub rank: RankId,
    pub stable_id: StableId,
    /// Committed to a merge this activation
    pub merge_locked: bool,
    /// Overlaps are ignored until this sim time
    pub spawn_grace_until: f32,
    /// Sim time of the last merge attempt this fruit initiated
    pub last_merge_attempt_at: f32,
    pub body: BodyHandle,
    /// Parented to the crane
    pub hanging: bool,
    pub tuner: PhysicsTuner,
}

impl Fruit {
    /// Inactive fruit wrapping a freshly created body
    pub fn new(rank: RankId, body: BodyHandle) -> Self {
        Self {
            rank,
            stable_id: StableId(0),
            merge_locked: false,
            spawn_grace_until: 0.0,
            last_merge_attempt_at: NEVER,
            body,
            hanging: false,
            tuner: PhysicsTuner::default(),
        }
    }

    /// Reset per-activation state
    pub fn activate(&mut self, stable_id: StableId, now: f32, grace: f32) {
        self.stable_id = stable_id;
        self.merge_locked = false;
        self.last_merge_attempt_at = NEVER;
        self.hanging = false;
        self.arm_grace(now, grace);
    }

    pub fn arm_grace(&mut self, now: f32, seconds: f32) {
        self.spawn_grace_until = now + seconds.max(0.0);
    }

    #[inline]
    pub fn in_grace(&self, now: f32) -> bool {
        now < self.spawn_grace_until
    }

    /// Unlocked and out of grace
    #[inline]
    pub fn is_mergeable(&self, now: f32) -> bool {
        !self.merge_locked && !self.in_grace(now)
    }

    #[inline]
    pub fn is_debounced(&self, now: f32, cooldown: f32) -> bool {
        now - self.last_merge_attempt_at < cooldown
    }
}

/// Collision-fidelity and sleep management for one body
///
/// Detection starts continuous and steps down to discrete once the fruit has
/// absorbed its first impacts. A calm dynamic body is put to sleep; motion
/// wakes it again.
#[derive(Debug, Clone, Default)]
pub struct PhysicsTuner {
    born_at: f32,
    calm_since: Option<f32>,
}

impl PhysicsTuner {
    /// Call whenever the fruit is freshly spawned or produced by a merge
    pub fn rearm<P: Physics + ?Sized>(&mut self, physics: &mut P, body: BodyHandle, now: f32) {
        self.born_at = now;
        self.calm_since = None;
        physics.set_detection_mode(body, DetectionMode::Continuous);
        physics.wake(body);
    }

    pub fn update<P: Physics + ?Sized>(
        &mut self,
        physics: &mut P,
        body: BodyHandle,
        now: f32,
        tuning: &Tuning,
    ) {
        // Hanging or disabled bodies never sleep
        if physics.body_kind(body) == BodyKind::Kinematic || !physics.is_simulated(body) {
            self.calm_since = None;
            return;
        }

        if physics.detection_mode(body) == DetectionMode::Continuous
            && now - self.born_at >= tuning.continuous_duration
        {
            physics.set_detection_mode(body, DetectionMode::Discrete);
        }

        let speed_sq = physics.velocity(body).length_squared();
        let calm = speed_sq < tuning.sleep_velocity * tuning.sleep_velocity
            && physics.angular_velocity(body).abs() < tuning.sleep_angular_velocity;

        if calm {
            match self.calm_since {
                None => self.calm_since = Some(now),
                Some(since) if now - since >= tuning.sleep_time && physics.is_awake(body) => {
                    physics.sleep(body);
                }
                Some(_) => {}
            }
        } else {
            self.calm_since = None;
            if !physics.is_awake(body) {
                physics.wake(body);
            }
        }
    }
}
