//! Data-driven game balance
//!
//! Every timing window, threshold and layout constant the core uses lives
//! here. Loaded from JSON once at startup; any missing field falls back to
//! its default so partial files are fine.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::sim::arena::ArenaConfig;

/// Gameplay tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Merge ===
    /// Post-spawn merge immunity (seconds)
    pub grace_seconds: f32,
    /// Minimum time between two merge attempts by the same fruit (seconds)
    pub merge_attempt_cooldown: f32,
    /// Bounds for the upward "pop" impulse applied to a merge product
    pub merge_impulse_min: f32,
    pub merge_impulse_max: f32,

    // === Fidelity / sleep ===
    /// Time a fresh fruit keeps continuous collision detection
    pub continuous_duration: f32,
    /// Linear speed under which a fruit counts as calm
    pub sleep_velocity: f32,
    /// Angular speed under which a fruit counts as calm
    pub sleep_angular_velocity: f32,
    /// Calm time before a fruit is put to sleep
    pub sleep_time: f32,

    // === Loss line ===
    /// Height of the loss boundary
    pub loss_line_y: f32,
    /// Thickness of the loss trigger volume
    pub loss_line_thickness: f32,
    /// Still time against the boundary that ends the run
    pub required_still_time: f32,
    /// Speed at or under which a touching fruit counts as settled
    pub settle_velocity: f32,

    // === Crane ===
    pub crane_min_x: f32,
    pub crane_max_x: f32,
    pub crane_center_x: f32,
    pub hang_y: f32,
    /// Delay between a drop and the next carried fruit (sim seconds)
    pub post_drop_delay: f32,
    /// The crane picks among the first N ranks
    pub starting_ranks: u8,

    // === Flow / UI (unscaled time) ===
    pub countdown_seconds: u32,
    pub tutorial_seconds: f32,
    pub tutorial_fade: f32,
    pub show_tutorial_on_start: bool,

    // === Session ===
    /// Midgame ad every N points
    pub score_ad_interval: u64,
    /// Persistence key for the best score
    pub best_key: String,

    // === Pool ===
    /// Instances pre-built per rank at level start (index = rank)
    pub warm_counts: Vec<usize>,

    // === Reference simulator ===
    pub arena: ArenaConfig,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            grace_seconds: 0.10,
            merge_attempt_cooldown: 0.03,
            merge_impulse_min: 0.5,
            merge_impulse_max: 6.0,

            continuous_duration: 0.25,
            sleep_velocity: 0.07,
            sleep_angular_velocity: 5.0,
            sleep_time: 0.7,

            loss_line_y: 7.6,
            loss_line_thickness: 0.1,
            required_still_time: 0.8,
            settle_velocity: 0.22,

            crane_min_x: -3.4,
            crane_max_x: 3.4,
            crane_center_x: 0.0,
            hang_y: 9.0,
            post_drop_delay: 3.0,
            starting_ranks: 4,

            countdown_seconds: 3,
            tutorial_seconds: 2.5,
            tutorial_fade: 0.18,
            show_tutorial_on_start: true,

            score_ad_interval: 200,
            best_key: "SUIKA_BEST".to_string(),

            warm_counts: vec![12, 12, 12, 12],

            arena: ArenaConfig::default(),
        }
    }
}

impl Tuning {
    /// Parse tuning from JSON
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Load tuning from a JSON file, falling back to defaults
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(json) => match Self::from_json(&json) {
                Ok(tuning) => {
                    log::info!("Loaded tuning from {}", path.display());
                    tuning
                }
                Err(e) => {
                    log::warn!("Ignoring tuning file {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                log::info!("No tuning at {} ({}), using defaults", path.display(), e);
                Self::default()
            }
        }
    }

    /// Reject values that would break the timing windows
    pub fn validate(&self) -> Result<(), CoreError> {
        let non_negative = [
            ("grace_seconds", self.grace_seconds),
            ("merge_attempt_cooldown", self.merge_attempt_cooldown),
            ("continuous_duration", self.continuous_duration),
            ("sleep_time", self.sleep_time),
            ("required_still_time", self.required_still_time),
            ("post_drop_delay", self.post_drop_delay),
            ("tutorial_seconds", self.tutorial_seconds),
            ("tutorial_fade", self.tutorial_fade),
        ];
        for (name, value) in non_negative {
            if !(value >= 0.0) {
                return Err(CoreError::Config(format!("{name} must be >= 0, got {value}")));
            }
        }
        if self.merge_impulse_min > self.merge_impulse_max {
            return Err(CoreError::Config(
                "merge_impulse_min exceeds merge_impulse_max".into(),
            ));
        }
        if self.crane_min_x > self.crane_max_x {
            return Err(CoreError::Config("crane_min_x exceeds crane_max_x".into()));
        }
        if self.starting_ranks == 0 {
            return Err(CoreError::Config("starting_ranks must be at least 1".into()));
        }
        Ok(())
    }
}
