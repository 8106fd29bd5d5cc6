//! Loss-line settle detector
//!
//! A thin trigger spans the container at the loss height. A fruit resting
//! against it for long enough ends the run; passing through or bouncing off
//! does not. Each touching fruit keeps its own settle timer.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::bridge::PhysicsBridge;
use super::fruit::StableId;
use super::lifecycle::FruitLifecycle;
use super::physics::{Aabb, BodyHandle, BodyKind, Physics};
use super::pool::PoolKey;
use crate::tuning::Tuning;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LossState {
    Idle,
    /// At least one fruit against the line
    Touching,
    /// Terminal until reset
    Lost,
}

#[derive(Debug, Clone, Copy)]
struct SettleTimer {
    key: PoolKey,
    /// Guards against the slot being recycled between steps
    stable_id: StableId,
    still_for: f32,
}

#[derive(Debug)]
pub struct LossLine {
    trigger: BodyHandle,
    required_still_time: f32,
    settle_velocity: f32,
    state: LossState,
    timers: Vec<SettleTimer>,
    touching: Vec<PoolKey>,
}

impl LossLine {
    /// Create the trigger volume and an idle detector
    pub fn new<P: Physics>(bridge: &mut PhysicsBridge<P>, tuning: &Tuning) -> Self {
        let half = tuning.arena.half_width;
        let half_thickness = tuning.loss_line_thickness * 0.5;
        let trigger = bridge.physics_mut().create_trigger(Aabb::new(
            Vec2::new(-half, tuning.loss_line_y - half_thickness),
            Vec2::new(half, tuning.loss_line_y + half_thickness),
        ));
        Self {
            trigger,
            required_still_time: tuning.required_still_time,
            settle_velocity: tuning.settle_velocity,
            state: LossState::Idle,
            timers: Vec::new(),
            touching: Vec::new(),
        }
    }

    /// Advance the timers by one step. Returns true on the step the run is lost.
    pub fn update<P: Physics>(
        &mut self,
        dt: f32,
        bridge: &mut PhysicsBridge<P>,
        lifecycle: &FruitLifecycle,
    ) -> bool {
        if self.state == LossState::Lost {
            return false;
        }

        bridge.fruits_in_trigger(self.trigger, &mut self.touching);

        // Contact lost (or the slot changed hands): timer gone
        let touching = &self.touching;
        self.timers.retain(|t| {
            touching.contains(&t.key)
                && lifecycle
                    .get(t.key)
                    .is_some_and(|f| f.stable_id == t.stable_id)
        });

        let mut lost = false;
        for &key in &self.touching {
            let Some(fruit) = lifecycle.get(key) else {
                continue;
            };
            let physics = bridge.physics();
            if fruit.hanging || physics.body_kind(fruit.body) == BodyKind::Kinematic {
                continue;
            }
            let settled = bridge.speed(fruit.body) <= self.settle_velocity;

            let idx = match self.timers.iter().position(|t| t.key == key) {
                Some(idx) => idx,
                None => {
                    self.timers.push(SettleTimer {
                        key,
                        stable_id: fruit.stable_id,
                        still_for: 0.0,
                    });
                    self.timers.len() - 1
                }
            };
            let timer = &mut self.timers[idx];
            if settled {
                timer.still_for += dt;
                if timer.still_for >= self.required_still_time {
                    lost = true;
                }
            } else {
                timer.still_for = 0.0;
            }
        }

        self.state = if lost {
            log::info!("fruit settled on the loss line");
            LossState::Lost
        } else if self.timers.is_empty() {
            LossState::Idle
        } else {
            LossState::Touching
        };
        lost
    }

    /// Back to idle with no timers
    pub fn reset(&mut self) {
        self.state = LossState::Idle;
        self.timers.clear();
    }

    #[inline]
    pub fn state(&self) -> LossState {
        self.state
    }

    pub fn trigger(&self) -> BodyHandle {
        self.trigger
    }

    /// Accumulated still time of a touching fruit
    pub fn still_time_of(&self, key: PoolKey) -> Option<f32> {
        self.timers
            .iter()
            .find(|t| t.key == key)
            .map(|t| t.still_for)
    }
}
