//! Per-run session: score, running flag, best score and the loss line

use serde::{Deserialize, Serialize};

use super::bridge::PhysicsBridge;
use super::lifecycle::FruitLifecycle;
use super::loss::{LossLine, LossState};
use super::physics::Physics;
use crate::best_score::BestScore;
use crate::tuning::Tuning;

/// Notifications for the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionEvent {
    ScoreChanged(u64),
    NewBest(u64),
    GameOver { final_score: u64, best: u64 },
    /// Score crossed the next midgame break threshold
    MidgameBreakDue,
}

#[derive(Debug)]
pub struct DropSession {
    score: u64,
    running: bool,
    best: BestScore,
    loss: LossLine,
    break_interval: u64,
    next_break_at: u64,
    break_outstanding: bool,
    events: Vec<SessionEvent>,
}

impl DropSession {
    pub fn new(best: BestScore, loss: LossLine, tuning: &Tuning) -> Self {
        Self {
            score: 0,
            running: false,
            best,
            loss,
            break_interval: tuning.score_ad_interval,
            next_break_at: tuning.score_ad_interval,
            break_outstanding: false,
            events: Vec::new(),
        }
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running
    }

    #[inline]
    pub fn score(&self) -> u64 {
        self.score
    }

    #[inline]
    pub fn best(&self) -> u64 {
        self.best.best()
    }

    pub fn loss_state(&self) -> LossState {
        self.loss.state()
    }

    pub fn loss_line(&self) -> &LossLine {
        &self.loss
    }

    /// Begin play; score is kept
    pub fn start(&mut self) {
        self.running = true;
        log::info!("Round started");
    }

    pub fn add_score(&mut self, amount: u32) {
        if amount == 0 {
            return;
        }
        self.score += u64::from(amount);
        self.events.push(SessionEvent::ScoreChanged(self.score));

        if self.best.submit(self.score) {
            self.events.push(SessionEvent::NewBest(self.score));
        }

        if self.break_interval > 0 && self.score >= self.next_break_at {
            // Skip thresholds jumped over in one award
            while self.next_break_at <= self.score {
                self.next_break_at += self.break_interval;
            }
            if !self.break_outstanding {
                self.break_outstanding = true;
                self.events.push(SessionEvent::MidgameBreakDue);
            }
        }
    }

    /// The outstanding midgame break finished (or failed)
    pub fn break_finished(&mut self) {
        self.break_outstanding = false;
    }

    pub fn break_outstanding(&self) -> bool {
        self.break_outstanding
    }

    /// Per-step loss check; ends the run when the line reports a loss
    pub fn update_loss<P: Physics>(
        &mut self,
        dt: f32,
        bridge: &mut PhysicsBridge<P>,
        lifecycle: &FruitLifecycle,
    ) -> bool {
        if !self.running {
            return false;
        }
        if self.loss.update(dt, bridge, lifecycle) {
            self.game_over();
            return true;
        }
        false
    }

    /// End the run. Emits `GameOver` once per run.
    pub fn game_over(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.best.submit(self.score);
        log::info!("Game over: score {} best {}", self.score, self.best.best());
        self.events.push(SessionEvent::GameOver {
            final_score: self.score,
            best: self.best.best(),
        });
    }

    /// Zero the score and re-arm the loss line for a new run
    pub fn reset(&mut self) {
        self.running = false;
        self.score = 0;
        self.next_break_at = self.break_interval;
        self.loss.reset();
        self.events.push(SessionEvent::ScoreChanged(0));
    }

    /// Leave play without a game over
    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn drain_events(&mut self) -> std::vec::Drain<'_, SessionEvent> {
        self.events.drain(..)
    }
}
