//! Asynchronous gates in front of round start/replay and midgame breaks
//!
//! A gate is anything that takes a while and then completes or fails: in
//! the shipped game, an ad. The round flow treats failure the same as
//! completion, so a missing or broken backend never blocks play.

/// What the gate is being asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateKind {
    /// Blocks round start/replay until done
    Rewarded,
    /// Shown during play, never blocks
    Midgame,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateStatus {
    Pending,
    Completed,
    Failed(String),
}

impl GateStatus {
    #[inline]
    pub fn is_done(&self) -> bool {
        !matches!(self, GateStatus::Pending)
    }
}

/// Wall-clock driven gate. `now` is unscaled seconds.
pub trait AdGate {
    fn begin(&mut self, kind: GateKind, now: f64) -> GateStatus;
    /// Status of the outstanding request; `Completed` when none
    fn poll(&mut self, now: f64) -> GateStatus;
    /// Drop the outstanding request without completing it
    fn cancel(&mut self);
}

/// Completes every request immediately
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAds;

impl AdGate for NoAds {
    fn begin(&mut self, _kind: GateKind, _now: f64) -> GateStatus {
        GateStatus::Completed
    }

    fn poll(&mut self, _now: f64) -> GateStatus {
        GateStatus::Completed
    }

    fn cancel(&mut self) {}
}

/// Fake ad network: every request takes a fixed time, with per-kind
/// cooldowns and one request in flight at a time.
#[derive(Debug, Clone)]
pub struct SimulatedAds {
    pub duration: f64,
    pub rewarded_cooldown: f64,
    pub midgame_cooldown: f64,
    /// Requests complete with this result
    pub succeed: bool,
    pub(crate) showing: Option<(GateKind, f64)>,
    pub(crate) last_rewarded: Option<f64>,
    pub(crate) last_midgame: Option<f64>,
}

impl Default for SimulatedAds {
    fn default() -> Self {
        Self {
            duration: 2.0,
            rewarded_cooldown: 2.0,
            midgame_cooldown: 1.0,
            succeed: true,
            showing: None,
            last_rewarded: None,
            last_midgame: None,
        }
    }
}

impl SimulatedAds {
    pub fn is_showing(&self) -> bool {
        self.showing.is_some()
    }

    fn finish(&mut self) -> GateStatus {
        self.showing = None;
        if self.succeed {
            GateStatus::Completed
        } else {
            GateStatus::Failed("simulated_failure".into())
        }
    }
}

impl AdGate for SimulatedAds {
    fn begin(&mut self, kind: GateKind, now: f64) -> GateStatus {
        if self.showing.is_some() {
            return GateStatus::Failed("ad_already_showing".into());
        }
        let (last, cooldown) = match kind {
            GateKind::Rewarded => (&mut self.last_rewarded, self.rewarded_cooldown),
            GateKind::Midgame => (&mut self.last_midgame, self.midgame_cooldown),
        };
        if last.is_some_and(|t| now - t < cooldown) {
            return GateStatus::Failed("cooldown".into());
        }
        *last = Some(now);
        log::info!("showing {:?} ad", kind);
        self.showing = Some((kind, now));
        if self.duration <= 0.0 {
            return self.finish();
        }
        GateStatus::Pending
    }

    fn poll(&mut self, now: f64) -> GateStatus {
        match self.showing {
            None => GateStatus::Completed,
            Some((_, started)) if now - started >= self.duration => self.finish(),
            Some(_) => GateStatus::Pending,
        }
    }

    fn cancel(&mut self) {
        if let Some((kind, _)) = self.showing.take() {
            log::info!("{:?} ad cancelled", kind);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_ads_is_instant() {
        let mut gate = NoAds;
        assert_eq!(gate.begin(GateKind::Rewarded, 0.0), GateStatus::Completed);
    }

    #[test]
    fn test_simulated_ad_takes_duration() {
        let mut gate = SimulatedAds::default();
        assert_eq!(gate.begin(GateKind::Rewarded, 10.0), GateStatus::Pending);
        assert_eq!(gate.poll(11.0), GateStatus::Pending);
        assert_eq!(gate.poll(12.0), GateStatus::Completed);
        assert!(!gate.is_showing());
    }

    #[test]
    fn test_one_request_at_a_time() {
        let mut gate = SimulatedAds::default();
        gate.begin(GateKind::Midgame, 0.0);
        assert_eq!(
            gate.begin(GateKind::Rewarded, 0.5),
            GateStatus::Failed("ad_already_showing".into())
        );
    }

    #[test]
    fn test_cooldown_rejects() {
        let mut gate = SimulatedAds {
            duration: 0.0,
            ..SimulatedAds::default()
        };
        assert_eq!(gate.begin(GateKind::Rewarded, 0.0), GateStatus::Completed);
        assert!(matches!(gate.begin(GateKind::Rewarded, 1.0), GateStatus::Failed(_)));
        assert_eq!(gate.begin(GateKind::Rewarded, 2.5), GateStatus::Completed);
    }

    #[test]
    fn test_failure_and_cancel() {
        let mut gate = SimulatedAds {
            succeed: false,
            ..SimulatedAds::default()
        };
        gate.begin(GateKind::Rewarded, 0.0);
        assert!(matches!(gate.poll(3.0), GateStatus::Failed(_)));

        gate.begin(GateKind::Midgame, 5.0);
        gate.cancel();
        assert_eq!(gate.poll(5.1), GateStatus::Completed);
    }
}
