//! Deterministic game core
//!
//! All gameplay logic lives here:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by stable id) for merge resolution
//! - Physics behind the `Physics` capability; no rendering or platform code

pub mod arena;
pub mod bridge;
pub mod collision;
pub mod crane;
pub mod fruit;
pub mod lifecycle;
pub mod loss;
pub mod merge;
pub mod physics;
pub mod pool;
pub mod rank;
pub mod sequence;
pub mod session;
pub mod state;
pub mod tick;

pub use arena::{ArenaConfig, CircleWorld};
pub use bridge::PhysicsBridge;
pub use collision::CollisionResult;
pub use crane::Crane;
pub use fruit::{Fruit, PhysicsTuner, StableId};
pub use lifecycle::{FruitLifecycle, SpawnMode};
pub use loss::{LossLine, LossState};
pub use merge::{MergeCommit, MergeOutcome, MergeResolver};
pub use physics::{
    Aabb, BodyDesc, BodyHandle, BodyKind, ContactEvent, ContactPhase, DetectionMode, Overlap,
    Physics,
};
pub use pool::{ObjectPool, PoolKey};
pub use rank::{Rank, RankChain, RankId};
pub use sequence::{
    Countdown, CountdownLabel, Fade, FlowSignal, FlowState, RoundFlow, RoundIntent,
};
pub use session::{DropSession, SessionEvent};
pub use state::{FruitView, Game, GameEvent};
pub use tick::{TickInput, tick};
