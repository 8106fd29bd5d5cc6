//! Physics capability consumed by the game core
//!
//! The core never integrates bodies itself. Anything that can report
//! overlaps, buffer contact events, switch body types, sleep/wake and take
//! impulses can drive the merge engine. `sim::arena::CircleWorld` is the
//! reference implementation used by the binary and the tests.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Opaque handle to a simulated body or trigger volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BodyHandle(pub u32);

impl BodyHandle {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Body type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyKind {
    /// Immobile, not affected by gravity or contacts (hanging from the crane)
    Kinematic,
    /// Fully simulated
    Dynamic,
}

/// Collision-detection fidelity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectionMode {
    /// Swept, robust, expensive
    Continuous,
    /// Per-step, cheap
    Discrete,
}

/// Template for a new circular body
#[derive(Debug, Clone, Copy)]
pub struct BodyDesc {
    pub position: Vec2,
    pub radius: f32,
    pub mass: f32,
    /// Created with simulation disabled
    pub simulated: bool,
}

/// Axis-aligned box used for trigger volumes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    /// Closest point inside the box to `p`
    #[inline]
    pub fn closest_point(&self, p: Vec2) -> Vec2 {
        p.clamp(self.min, self.max)
    }
}

/// One overlap reported by a query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Overlap {
    pub body: BodyHandle,
    /// Trigger-only (non-solid) collider
    pub trigger: bool,
}

/// Contact callback phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactPhase {
    Enter,
    Stay,
}

/// Buffered contact callback between two solid bodies
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactEvent {
    pub a: BodyHandle,
    pub b: BodyHandle,
    pub phase: ContactPhase,
}

/// Capabilities the core needs from a 2D simulator.
///
/// Calls with a handle the simulator does not know are no-ops; getters
/// return zero values.
pub trait Physics {
    /// Create a solid circular body (dynamic, awake, continuous detection)
    fn create_body(&mut self, desc: BodyDesc) -> BodyHandle;
    /// Create a trigger volume (reports overlaps, never collides)
    fn create_trigger(&mut self, area: Aabb) -> BodyHandle;

    fn position(&self, body: BodyHandle) -> Vec2;
    fn set_position(&mut self, body: BodyHandle, position: Vec2);
    fn velocity(&self, body: BodyHandle) -> Vec2;
    fn set_velocity(&mut self, body: BodyHandle, velocity: Vec2);
    fn angular_velocity(&self, body: BodyHandle) -> f32;
    fn set_angular_velocity(&mut self, body: BodyHandle, omega: f32);
    fn mass(&self, body: BodyHandle) -> f32;

    fn body_kind(&self, body: BodyHandle) -> BodyKind;
    fn set_body_kind(&mut self, body: BodyHandle, kind: BodyKind);
    fn is_simulated(&self, body: BodyHandle) -> bool;
    fn set_simulated(&mut self, body: BodyHandle, simulated: bool);
    fn detection_mode(&self, body: BodyHandle) -> DetectionMode;
    fn set_detection_mode(&mut self, body: BodyHandle, mode: DetectionMode);

    fn apply_impulse(&mut self, body: BodyHandle, impulse: Vec2);
    fn wake(&mut self, body: BodyHandle);
    fn sleep(&mut self, body: BodyHandle);
    fn is_awake(&self, body: BodyHandle) -> bool;

    /// Append every simulated collider overlapping `body` to `out`
    /// (excluding `body` itself). Works for triggers too.
    fn query_overlaps(&self, body: BodyHandle, out: &mut Vec<Overlap>);

    /// Move contact enter/stay events buffered since the last drain into `out`
    fn drain_contacts(&mut self, out: &mut Vec<ContactEvent>);

    /// Advance the simulation by `dt` seconds
    fn step(&mut self, dt: f32);
}
