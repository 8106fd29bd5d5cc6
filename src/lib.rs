//! Fruit Drop - a merge-the-fruit physics puzzle core
//!
//! Core modules:
//! - `sim`: Deterministic game core (pool, ranks, merges, crane, loss line)
//! - `persistence`: Key/value storage for the best score
//! - `gate`: Asynchronous gates (ads) in front of round start and midgame breaks
//! - `tuning`: Data-driven game balance

pub mod best_score;
pub mod error;
pub mod gate;
pub mod persistence;
pub mod sim;
pub mod tuning;

pub use best_score::BestScore;
pub use error::CoreError;
pub use tuning::Tuning;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Longest frame fed to the accumulator
    pub const MAX_FRAME_DT: f32 = 0.1;
}
