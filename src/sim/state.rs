//! Game aggregate
//!
//! Owns every service explicitly (no globals): the physics bridge, the fruit
//! lifecycle, the merge resolver, the session, the crane and the round flow.
//! Sim-time work happens in `step`; UI-time work in `update_ui`.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::arena::CircleWorld;
use super::bridge::PhysicsBridge;
use super::crane::Crane;
use super::fruit::StableId;
use super::lifecycle::{FruitLifecycle, SpawnMode};
use super::loss::LossLine;
use super::merge::MergeResolver;
use super::physics::Physics;
use super::pool::PoolKey;
use super::rank::{RankChain, RankId};
use super::sequence::{CountdownLabel, Fade, FlowSignal, FlowState, RoundFlow, RoundIntent};
use super::session::{DropSession, SessionEvent};
use crate::best_score::BestScore;
use crate::error::CoreError;
use crate::gate::{AdGate, GateKind, GateStatus, NoAds};
use crate::persistence::{KeyValueStore, MemoryStore};
use crate::tuning::Tuning;

/// Game events for audio/visual feedback
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    ScoreChanged(u64),
    NewBest(u64),
    GameOver { final_score: u64, best: u64 },
    Merged {
        from: RankId,
        into: RankId,
        position: Vec2,
        score: u32,
    },
    /// A new fruit is hanging from the crane
    Carried(RankId),
    Dropped(RankId),
    Countdown(CountdownLabel),
    /// Field cleared for a new round
    RoundPrepared,
    RoundStarted,
    RoundCancelled,
    MidgameBreak,
    ReturnedToMenu,
}

/// Read-only view of a live fruit for presentation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FruitView {
    pub key: PoolKey,
    pub rank: RankId,
    pub stable_id: StableId,
    pub position: Vec2,
    pub radius: f32,
    pub hanging: bool,
}

pub struct Game<P: Physics> {
    pub tuning: Tuning,
    pub chain: RankChain,
    pub bridge: PhysicsBridge<P>,
    pub lifecycle: FruitLifecycle,
    pub resolver: MergeResolver,
    pub session: DropSession,
    pub crane: Crane,
    pub flow: RoundFlow,
    pub tutorial: Fade,
    gate: Box<dyn AdGate>,
    break_pending: bool,
    tutorial_shown: bool,
    /// Accumulated sim time (frozen while paused or not running)
    sim_time: f32,
    /// Accumulated unscaled time
    wall_time: f64,
    sim_ticks: u64,
    events: Vec<GameEvent>,
    signals: Vec<FlowSignal>,
}

impl Game<CircleWorld> {
    /// Reference world, in-memory store, no ads
    pub fn headless(tuning: Tuning, seed: u64) -> Result<Self, CoreError> {
        let world = CircleWorld::new(tuning.arena.clone());
        Self::new(
            world,
            RankChain::classic(),
            tuning,
            Box::new(MemoryStore::new()),
            Box::new(NoAds),
            seed,
        )
    }
}

impl<P: Physics> Game<P> {
    pub fn new(
        physics: P,
        chain: RankChain,
        tuning: Tuning,
        store: Box<dyn KeyValueStore>,
        gate: Box<dyn AdGate>,
        seed: u64,
    ) -> Result<Self, CoreError> {
        tuning.validate()?;

        let mut bridge = PhysicsBridge::new(physics);
        let mut lifecycle = FruitLifecycle::new(&chain, tuning.grace_seconds);
        lifecycle.warm_from_tuning(&mut bridge, &chain, &tuning);

        let loss = LossLine::new(&mut bridge, &tuning);
        let best = BestScore::load(store, tuning.best_key.clone());
        let session = DropSession::new(best, loss, &tuning);

        log::info!(
            "Game ready: {} ranks, seed {}, {} pooled",
            chain.len(),
            seed,
            lifecycle.pool().capacity()
        );

        Ok(Self {
            resolver: MergeResolver::new(&tuning),
            crane: Crane::new(&tuning, seed),
            flow: RoundFlow::new(tuning.countdown_seconds),
            tutorial: Fade::new(tuning.tutorial_fade),
            tuning,
            chain,
            bridge,
            lifecycle,
            session,
            gate,
            break_pending: false,
            tutorial_shown: false,
            sim_time: 0.0,
            wall_time: 0.0,
            sim_ticks: 0,
            events: Vec::new(),
            signals: Vec::new(),
        })
    }

    #[inline]
    pub fn sim_time(&self) -> f32 {
        self.sim_time
    }

    #[inline]
    pub fn sim_ticks(&self) -> u64 {
        self.sim_ticks
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.session.is_running()
    }

    pub fn flow_state(&self) -> FlowState {
        self.flow.state()
    }

    pub fn drain_events(&mut self) -> std::vec::Drain<'_, GameEvent> {
        self.events.drain(..)
    }

    /// Live fruits, including the one on the crane
    pub fn fruits(&self) -> impl Iterator<Item = FruitView> + '_ {
        self.lifecycle.pool().iter_live().map(|(key, fruit)| FruitView {
            key,
            rank: fruit.rank,
            stable_id: fruit.stable_id,
            position: self.bridge.physics().position(fruit.body),
            radius: self.chain.get(fruit.rank).map_or(0.0, |r| r.radius),
            hanging: fruit.hanging,
        })
    }

    /// Place a falling fruit directly (bypassing the crane)
    pub fn spawn_fruit(&mut self, rank: RankId, position: Vec2) -> Result<PoolKey, CoreError> {
        self.lifecycle.spawn(
            &mut self.bridge,
            &self.chain,
            rank,
            position,
            SpawnMode::Dynamic,
            self.sim_time,
        )
    }

    // === Player actions ===

    pub fn request_start(&mut self) {
        self.request(RoundIntent::Start);
    }

    pub fn request_replay(&mut self) {
        self.request(RoundIntent::Replay);
    }

    fn request(&mut self, intent: RoundIntent) {
        if self
            .flow
            .request(intent, self.gate.as_mut(), self.wall_time, &mut self.signals)
        {
            self.crane.set_ui_blocked(true);
        }
        self.handle_signals();
    }

    /// Abandon a pending gate or countdown
    pub fn cancel(&mut self) {
        self.flow.cancel(self.gate.as_mut(), &mut self.signals);
        self.handle_signals();
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.flow.set_paused(paused);
    }

    pub fn toggle_pause(&mut self) {
        let paused = self.flow.is_paused();
        self.set_paused(!paused);
    }

    /// Back to the menu, clearing the field and the score
    pub fn quit(&mut self) {
        self.flow.quit(self.gate.as_mut());
        self.session.reset();
        self.clear_field();
        self.tutorial.hide();
        self.crane.set_ui_blocked(false);
        self.pump_session_events();
        self.events.push(GameEvent::ReturnedToMenu);
        log::info!("Returned to menu");
    }

    /// Release the carried fruit (only while play advances)
    pub fn drop_carried(&mut self) -> Option<PoolKey> {
        if !self.session.is_running() || self.flow.time_scale() == 0.0 {
            return None;
        }
        let key = self
            .crane
            .drop_carried(&mut self.lifecycle, &mut self.bridge, self.sim_time)?;
        if let Some(fruit) = self.lifecycle.get(key) {
            self.events.push(GameEvent::Dropped(fruit.rank));
        }
        Some(key)
    }

    // === Time ===

    /// One sim step: physics, merges, scoring, tuning, crane, loss line
    pub fn step(&mut self, dt: f32) {
        self.sim_time += dt;
        self.sim_ticks += 1;
        let now = self.sim_time;

        self.bridge.step(dt);

        let outcomes = self
            .resolver
            .resolve(now, &self.chain, &mut self.lifecycle, &mut self.bridge);
        for outcome in outcomes {
            self.events.push(GameEvent::Merged {
                from: outcome.from,
                into: outcome.into,
                position: outcome.position,
                score: outcome.score,
            });
            self.session.add_score(outcome.score);
        }

        self.lifecycle.tune(&mut self.bridge, now, &self.tuning);

        if let Some(key) =
            self.crane
                .tick(dt, &mut self.lifecycle, &mut self.bridge, &self.chain, now)
        {
            self.push_carried(key);
        }

        if self
            .session
            .update_loss(dt, &mut self.bridge, &self.lifecycle)
        {
            self.flow.game_over();
            self.crane.force_clear_carried(&mut self.lifecycle, &mut self.bridge);
            self.crane.set_ui_blocked(true);
        }

        self.pump_session_events();
    }

    /// Unscaled-time work: round flow, tutorial fade, midgame break
    pub fn update_ui(&mut self, dt: f32) {
        self.wall_time += f64::from(dt);

        self.flow
            .tick(dt, self.gate.as_mut(), self.wall_time, &mut self.signals);
        self.handle_signals();

        self.tutorial.tick(dt);

        if self.break_pending {
            let status = self.gate.poll(self.wall_time);
            if status.is_done() {
                self.break_pending = false;
                self.session.break_finished();
            }
        }
    }

    fn push_carried(&mut self, key: PoolKey) {
        if let Some(fruit) = self.lifecycle.get(key) {
            self.events.push(GameEvent::Carried(fruit.rank));
        }
    }

    fn clear_field(&mut self) {
        self.crane
            .force_clear_carried(&mut self.lifecycle, &mut self.bridge);
        let cleared = self.lifecycle.clear_all(&mut self.bridge);
        if cleared > 0 {
            log::debug!("cleared {} fruits", cleared);
        }
        self.crane.reset();
    }

    fn handle_signals(&mut self) {
        let mut signals = std::mem::take(&mut self.signals);
        for signal in signals.drain(..) {
            match signal {
                FlowSignal::PrepareRound(_) => {
                    self.clear_field();
                    self.session.reset();
                    self.tutorial.hide();
                    self.events.push(GameEvent::RoundPrepared);
                }
                FlowSignal::CountdownStep(label) => {
                    log::debug!("countdown {}", label);
                    self.events.push(GameEvent::Countdown(label));
                }
                FlowSignal::BeginRound(intent) => {
                    self.session.start();
                    self.crane.set_ui_blocked(false);
                    self.crane.clear_press();
                    if let Some(key) = self.crane.spawn_now(
                        &mut self.lifecycle,
                        &mut self.bridge,
                        &self.chain,
                        self.sim_time,
                    ) {
                        self.push_carried(key);
                    }
                    if intent == RoundIntent::Start
                        && self.tuning.show_tutorial_on_start
                        && !self.tutorial_shown
                    {
                        self.tutorial_shown = true;
                        self.tutorial.show_for(self.tuning.tutorial_seconds);
                    }
                    self.events.push(GameEvent::RoundStarted);
                }
                FlowSignal::Cancelled => {
                    if self.flow.state() == FlowState::Menu && self.session.is_running() {
                        self.session.stop();
                        self.clear_field();
                    }
                    self.crane.set_ui_blocked(false);
                    self.crane.clear_press();
                    self.events.push(GameEvent::RoundCancelled);
                }
            }
        }
        // Hand the buffer back to keep its capacity
        self.signals = signals;
        self.pump_session_events();
    }

    fn pump_session_events(&mut self) {
        let mut break_due = false;
        for event in self.session.drain_events() {
            self.events.push(match event {
                SessionEvent::ScoreChanged(score) => GameEvent::ScoreChanged(score),
                SessionEvent::NewBest(score) => GameEvent::NewBest(score),
                SessionEvent::GameOver { final_score, best } => {
                    GameEvent::GameOver { final_score, best }
                }
                SessionEvent::MidgameBreakDue => {
                    break_due = true;
                    GameEvent::MidgameBreak
                }
            });
        }
        if break_due {
            self.begin_break();
        }
    }

    fn begin_break(&mut self) {
        match self.gate.begin(GateKind::Midgame, self.wall_time) {
            GateStatus::Pending => self.break_pending = true,
            status => {
                if let GateStatus::Failed(reason) = status {
                    log::info!("midgame break skipped: {}", reason);
                }
                self.session.break_finished();
            }
        }
    }
}

impl<P: Physics> std::fmt::Debug for Game<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Game")
            .field("flow", &self.flow.state())
            .field("score", &self.session.score())
            .field("live", &self.lifecycle.live_count())
            .field("sim_time", &self.sim_time)
            .finish_non_exhaustive()
    }
}
