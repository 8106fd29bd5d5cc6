//! Round flow and its timed UI sequences
//!
//! Runs on unscaled time: pausing the simulation does not pause a
//! countdown or a fade.

use serde::{Deserialize, Serialize};

use crate::gate::{AdGate, GateKind, GateStatus};

/// Number pop duration
pub const NUMBER_POP: f32 = 0.55;
/// Gap after each number
pub const NUMBER_GAP: f32 = 0.05;
/// "GO!" pop duration
pub const GO_POP: f32 = 0.45;

/// Back-ease overshoot
const BACK_OVERSHOOT: f32 = 1.70158;

/// Overshooting ease, 0 → 1
#[inline]
pub fn ease_out_back(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    let c3 = BACK_OVERSHOOT + 1.0;
    let u = t - 1.0;
    1.0 + c3 * u * u * u + BACK_OVERSHOOT * u * u
}

#[inline]
pub fn ease_out_quad(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t) * (1.0 - t)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CountdownLabel {
    Number(u32),
    Go,
}

impl std::fmt::Display for CountdownLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CountdownLabel::Number(n) => write!(f, "{n}"),
            CountdownLabel::Go => f.write_str("GO!"),
        }
    }
}

/// 3, 2, 1, GO! with a pop-in scale per label
#[derive(Debug, Clone)]
pub struct Countdown {
    label: CountdownLabel,
    elapsed: f32,
    finished: bool,
}

impl Countdown {
    pub fn new(seconds: u32) -> Self {
        Self {
            label: if seconds == 0 {
                CountdownLabel::Go
            } else {
                CountdownLabel::Number(seconds)
            },
            elapsed: 0.0,
            finished: false,
        }
    }

    #[inline]
    pub fn label(&self) -> CountdownLabel {
        self.label
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn label_duration(&self) -> f32 {
        match self.label {
            CountdownLabel::Number(_) => NUMBER_POP + NUMBER_GAP,
            CountdownLabel::Go => GO_POP,
        }
    }

    /// Advance; returns each label shown after the current one, in order
    pub fn tick(&mut self, dt: f32, shown: &mut Vec<CountdownLabel>) {
        if self.finished {
            return;
        }
        self.elapsed += dt;
        while !self.finished && self.elapsed >= self.label_duration() {
            self.elapsed -= self.label_duration();
            match self.label {
                CountdownLabel::Number(n) if n > 1 => {
                    self.label = CountdownLabel::Number(n - 1);
                    shown.push(self.label);
                }
                CountdownLabel::Number(_) => {
                    self.label = CountdownLabel::Go;
                    shown.push(self.label);
                }
                CountdownLabel::Go => self.finished = true,
            }
        }
    }

    /// Display scale of the current label
    pub fn scale(&self) -> f32 {
        match self.label {
            CountdownLabel::Number(_) => {
                let t = (self.elapsed / NUMBER_POP).min(1.0);
                // 0.6 → 1.15 on the way in, settle to 1.0
                if t < 0.6 {
                    0.6 + 0.55 * ease_out_back(t / 0.6)
                } else {
                    1.15 - 0.15 * ease_out_quad((t - 0.6) / 0.4)
                }
            }
            CountdownLabel::Go => {
                let t = (self.elapsed / GO_POP).min(1.0);
                0.6 + 0.6 * ease_out_back(t)
            }
        }
    }
}

/// Timed overlay: fade in, hold, fade out
#[derive(Debug, Clone)]
pub struct Fade {
    alpha: f32,
    target: f32,
    fade_time: f32,
    hold: Option<f32>,
}

impl Fade {
    pub fn new(fade_time: f32) -> Self {
        Self {
            alpha: 0.0,
            target: 0.0,
            fade_time,
            hold: None,
        }
    }

    /// Fade in and hide again after `seconds`
    pub fn show_for(&mut self, seconds: f32) {
        self.target = 1.0;
        self.hold = Some(seconds.max(0.0));
    }

    pub fn hide(&mut self) {
        self.target = 0.0;
        self.hold = None;
    }

    pub fn tick(&mut self, dt: f32) {
        if let Some(hold) = self.hold.as_mut() {
            *hold -= dt;
            if *hold <= 0.0 {
                self.hide();
            }
        }
        if self.fade_time <= 0.0 {
            self.alpha = self.target;
        } else {
            let step = dt / self.fade_time;
            self.alpha = if self.alpha < self.target {
                (self.alpha + step).min(self.target)
            } else {
                (self.alpha - step).max(self.target)
            };
        }
    }

    #[inline]
    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Anything on screen
    pub fn is_visible(&self) -> bool {
        self.alpha > 0.0 || self.target > 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundIntent {
    Start,
    Replay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowState {
    Menu,
    /// Waiting on the rewarded gate
    AwaitingGate(RoundIntent),
    Countdown(RoundIntent),
    Running,
    GameOver,
}

/// What the owner of the flow must do in response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowSignal {
    /// Gate done: clear the field for the new round
    PrepareRound(RoundIntent),
    CountdownStep(CountdownLabel),
    /// Countdown over: play begins
    BeginRound(RoundIntent),
    /// Gate or countdown abandoned; back where the request came from
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct RoundFlow {
    state: FlowState,
    countdown: Option<Countdown>,
    countdown_seconds: u32,
    paused: bool,
    /// Where a cancel returns to
    origin: FlowState,
    shown: Vec<CountdownLabel>,
}

impl RoundFlow {
    pub fn new(countdown_seconds: u32) -> Self {
        Self {
            state: FlowState::Menu,
            countdown: None,
            countdown_seconds,
            paused: false,
            origin: FlowState::Menu,
            shown: Vec::new(),
        }
    }

    #[inline]
    pub fn state(&self) -> FlowState {
        self.state
    }

    pub fn countdown(&self) -> Option<&Countdown> {
        self.countdown.as_ref()
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// 1 while play advances, 0 otherwise
    pub fn time_scale(&self) -> f32 {
        if self.state == FlowState::Running && !self.paused {
            1.0
        } else {
            0.0
        }
    }

    /// Ask for a round. Start is accepted from the menu, replay from the
    /// game-over screen (or mid-run). Returns false when ignored.
    pub fn request(
        &mut self,
        intent: RoundIntent,
        gate: &mut dyn AdGate,
        now: f64,
        out: &mut Vec<FlowSignal>,
    ) -> bool {
        let allowed = match intent {
            RoundIntent::Start => self.state == FlowState::Menu,
            RoundIntent::Replay => matches!(self.state, FlowState::GameOver | FlowState::Running),
        };
        if !allowed {
            log::debug!("ignoring {:?} request in {:?}", intent, self.state);
            return false;
        }
        self.origin = self.state;
        self.paused = false;
        match gate.begin(GateKind::Rewarded, now) {
            GateStatus::Pending => self.state = FlowState::AwaitingGate(intent),
            status => {
                if let GateStatus::Failed(reason) = status {
                    log::info!("gate failed ({}), continuing", reason);
                }
                self.enter_countdown(intent, out);
            }
        }
        true
    }

    fn enter_countdown(&mut self, intent: RoundIntent, out: &mut Vec<FlowSignal>) {
        out.push(FlowSignal::PrepareRound(intent));
        let countdown = Countdown::new(self.countdown_seconds);
        out.push(FlowSignal::CountdownStep(countdown.label()));
        self.countdown = Some(countdown);
        self.state = FlowState::Countdown(intent);
    }

    /// Advance on unscaled time
    pub fn tick(&mut self, dt: f32, gate: &mut dyn AdGate, now: f64, out: &mut Vec<FlowSignal>) {
        match self.state {
            FlowState::AwaitingGate(intent) => {
                let status = gate.poll(now);
                if status.is_done() {
                    if let GateStatus::Failed(reason) = status {
                        log::info!("gate failed ({}), continuing", reason);
                    }
                    self.enter_countdown(intent, out);
                }
            }
            FlowState::Countdown(intent) => {
                let Some(countdown) = self.countdown.as_mut() else {
                    self.state = FlowState::Running;
                    out.push(FlowSignal::BeginRound(intent));
                    return;
                };
                self.shown.clear();
                countdown.tick(dt, &mut self.shown);
                out.extend(self.shown.iter().map(|&label| FlowSignal::CountdownStep(label)));
                if countdown.is_finished() {
                    self.countdown = None;
                    self.state = FlowState::Running;
                    out.push(FlowSignal::BeginRound(intent));
                }
            }
            FlowState::Menu | FlowState::Running | FlowState::GameOver => {}
        }
    }

    /// Abandon a pending gate or countdown. Returns false when there was
    /// nothing to cancel.
    pub fn cancel(&mut self, gate: &mut dyn AdGate, out: &mut Vec<FlowSignal>) -> bool {
        match self.state {
            FlowState::AwaitingGate(_) | FlowState::Countdown(_) => {
                gate.cancel();
                self.countdown = None;
                // A replay abandoned mid-run does not resume the old round
                self.state = match self.origin {
                    FlowState::Running => FlowState::Menu,
                    origin => origin,
                };
                out.push(FlowSignal::Cancelled);
                true
            }
            _ => false,
        }
    }

    pub fn game_over(&mut self) {
        self.state = FlowState::GameOver;
        self.paused = false;
        self.countdown = None;
    }

    /// Back to the menu from anywhere
    pub fn quit(&mut self, gate: &mut dyn AdGate) {
        if matches!(self.state, FlowState::AwaitingGate(_)) {
            gate.cancel();
        }
        self.state = FlowState::Menu;
        self.paused = false;
        self.countdown = None;
    }

    /// Only meaningful while running
    pub fn set_paused(&mut self, paused: bool) {
        if self.state == FlowState::Running {
            self.paused = paused;
        }
    }
}
