//! Reference circle-body simulator
//!
//! A small, deterministic implementation of the `Physics` capability:
//! gravity, an open-top container, circle-circle contact resolution,
//! sleeping and buffered contact events. Good enough to drive the merge
//! engine headless and in tests; it makes no attempt at rotational dynamics.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::{circle_aabb, circle_circle, circle_container};
use super::physics::{
    Aabb, BodyDesc, BodyHandle, BodyKind, ContactEvent, ContactPhase, DetectionMode, Overlap,
    Physics,
};

/// Closing speed above which a contact wakes a sleeping body
const WAKE_APPROACH_SPEED: f32 = 0.5;

/// Container and solver parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    pub gravity: Vec2,
    /// Walls sit at x = ±half_width
    pub half_width: f32,
    pub floor_y: f32,
    pub restitution: f32,
    /// Fraction of tangential speed removed on wall contact
    pub wall_friction: f32,
    /// Per-second linear damping
    pub linear_damping: f32,
    pub angular_damping: f32,
    /// Distance under which resting bodies still count as touching
    pub contact_skin: f32,
    pub solver_iterations: u32,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            gravity: Vec2::new(0.0, -9.81),
            half_width: 3.6,
            floor_y: 0.0,
            restitution: 0.15,
            wall_friction: 0.1,
            linear_damping: 0.05,
            angular_damping: 0.5,
            contact_skin: 0.02,
            solver_iterations: 4,
        }
    }
}

#[derive(Debug, Clone)]
struct Body {
    pos: Vec2,
    vel: Vec2,
    omega: f32,
    radius: f32,
    mass: f32,
    kind: BodyKind,
    simulated: bool,
    awake: bool,
    detection: DetectionMode,
    /// Some = trigger volume
    trigger: Option<Aabb>,
}

impl Body {
    #[inline]
    fn is_solid(&self) -> bool {
        self.simulated && self.trigger.is_none()
    }

    #[inline]
    fn moves(&self) -> bool {
        self.is_solid() && self.kind == BodyKind::Dynamic && self.awake
    }

    #[inline]
    fn inverse_mass(&self) -> f32 {
        if self.kind == BodyKind::Dynamic && self.mass > 0.0 {
            1.0 / self.mass
        } else {
            0.0
        }
    }
}

/// Deterministic circle world
#[derive(Debug, Clone)]
pub struct CircleWorld {
    config: ArenaConfig,
    bodies: Vec<Body>,
    /// Sorted solid pairs touching at the end of the previous step
    touching: Vec<(u32, u32)>,
    touching_next: Vec<(u32, u32)>,
    contacts: Vec<ContactEvent>,
}

impl Default for CircleWorld {
    fn default() -> Self {
        Self::new(ArenaConfig::default())
    }
}

impl CircleWorld {
    pub fn new(config: ArenaConfig) -> Self {
        Self {
            config,
            bodies: Vec::new(),
            touching: Vec::new(),
            touching_next: Vec::new(),
            contacts: Vec::new(),
        }
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    #[inline]
    fn body(&self, handle: BodyHandle) -> Option<&Body> {
        self.bodies.get(handle.index())
    }

    #[inline]
    fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut Body> {
        self.bodies.get_mut(handle.index())
    }

    fn integrate(&mut self, dt: f32) {
        let gravity = self.config.gravity;
        let damping = (1.0 - self.config.linear_damping * dt).clamp(0.0, 1.0);
        let angular_damping = (1.0 - self.config.angular_damping * dt).clamp(0.0, 1.0);
        let half_width = self.config.half_width;
        let floor_y = self.config.floor_y;

        for body in self.bodies.iter_mut().filter(|b| b.moves()) {
            body.vel += gravity * dt;
            body.vel *= damping;
            body.omega *= angular_damping;

            // Continuous bodies advance in sub-steps no longer than half a
            // radius so a fast drop cannot tunnel through the floor.
            let travel = body.vel.length() * dt;
            let substeps = match body.detection {
                DetectionMode::Continuous => {
                    ((travel / (body.radius * 0.5)).ceil() as u32).clamp(1, 8)
                }
                DetectionMode::Discrete => 1,
            };
            let sub_dt = dt / substeps as f32;
            for _ in 0..substeps {
                body.pos += body.vel * sub_dt;
                if body.detection == DetectionMode::Continuous {
                    Self::resolve_container(body, half_width, floor_y, &self.config);
                }
            }
            if body.detection == DetectionMode::Discrete {
                Self::resolve_container(body, half_width, floor_y, &self.config);
            }
        }
    }

    fn resolve_container(body: &mut Body, half_width: f32, floor_y: f32, config: &ArenaConfig) {
        let wall = circle_container(body.pos, body.radius, half_width, floor_y);
        if !wall.hit {
            return;
        }
        body.pos += wall.normal * wall.penetration;
        let vn = body.vel.dot(wall.normal);
        if vn < 0.0 {
            let normal_part = wall.normal * vn;
            let tangent_part = body.vel - normal_part;
            body.vel = tangent_part * (1.0 - config.wall_friction)
                - normal_part * config.restitution;
        }
    }

    fn solve_pairs(&mut self) {
        let restitution = self.config.restitution;
        let count = self.bodies.len();
        for _ in 0..self.config.solver_iterations {
            for i in 0..count {
                for j in (i + 1)..count {
                    let (left, right) = self.bodies.split_at_mut(j);
                    let a = &mut left[i];
                    let b = &mut right[0];
                    if !a.is_solid() || !b.is_solid() {
                        continue;
                    }
                    let inv_a = a.inverse_mass();
                    let inv_b = b.inverse_mass();
                    if inv_a + inv_b == 0.0 {
                        continue;
                    }
                    let hit = circle_circle(a.pos, a.radius, b.pos, b.radius, 0.0);
                    if !hit.hit || hit.penetration <= 0.0 {
                        continue;
                    }
                    // Only a real impact wakes a sleeper, not resting pressure
                    let approach = -(a.vel - b.vel).dot(hit.normal);
                    if approach > WAKE_APPROACH_SPEED {
                        if !a.awake && inv_a > 0.0 {
                            a.awake = true;
                        }
                        if !b.awake && inv_b > 0.0 {
                            b.awake = true;
                        }
                    }

                    let share = hit.penetration / (inv_a + inv_b);
                    a.pos += hit.normal * share * inv_a;
                    b.pos -= hit.normal * share * inv_b;

                    let relative = a.vel - b.vel;
                    let vn = relative.dot(hit.normal);
                    if vn < 0.0 {
                        let j_mag = -(1.0 + restitution) * vn / (inv_a + inv_b);
                        a.vel += hit.normal * j_mag * inv_a;
                        b.vel -= hit.normal * j_mag * inv_b;
                    }
                }
            }
        }
    }

    fn collect_contacts(&mut self) {
        let skin = self.config.contact_skin;
        self.touching_next.clear();
        for i in 0..self.bodies.len() {
            let a = &self.bodies[i];
            if !a.is_solid() {
                continue;
            }
            for j in (i + 1)..self.bodies.len() {
                let b = &self.bodies[j];
                if !b.is_solid() {
                    continue;
                }
                if circle_circle(a.pos, a.radius, b.pos, b.radius, skin).hit {
                    self.touching_next.push((i as u32, j as u32));
                }
            }
        }

        for &(i, j) in &self.touching_next {
            let phase = if self.touching.binary_search(&(i, j)).is_ok() {
                ContactPhase::Stay
            } else {
                ContactPhase::Enter
            };
            self.contacts.push(ContactEvent {
                a: BodyHandle(i),
                b: BodyHandle(j),
                phase,
            });
        }
        std::mem::swap(&mut self.touching, &mut self.touching_next);
    }
}

impl Physics for CircleWorld {
    fn create_body(&mut self, desc: BodyDesc) -> BodyHandle {
        let handle = BodyHandle(self.bodies.len() as u32);
        self.bodies.push(Body {
            pos: desc.position,
            vel: Vec2::ZERO,
            omega: 0.0,
            radius: desc.radius,
            mass: desc.mass,
            kind: BodyKind::Dynamic,
            simulated: desc.simulated,
            awake: true,
            detection: DetectionMode::Continuous,
            trigger: None,
        });
        handle
    }

    fn create_trigger(&mut self, area: Aabb) -> BodyHandle {
        let handle = BodyHandle(self.bodies.len() as u32);
        self.bodies.push(Body {
            pos: (area.min + area.max) * 0.5,
            vel: Vec2::ZERO,
            omega: 0.0,
            radius: 0.0,
            mass: 0.0,
            kind: BodyKind::Kinematic,
            simulated: true,
            awake: true,
            detection: DetectionMode::Discrete,
            trigger: Some(area),
        });
        handle
    }

    fn position(&self, body: BodyHandle) -> Vec2 {
        self.body(body).map_or(Vec2::ZERO, |b| b.pos)
    }

    fn set_position(&mut self, body: BodyHandle, position: Vec2) {
        if let Some(b) = self.body_mut(body) {
            b.pos = position;
        }
    }

    fn velocity(&self, body: BodyHandle) -> Vec2 {
        self.body(body).map_or(Vec2::ZERO, |b| b.vel)
    }

    fn set_velocity(&mut self, body: BodyHandle, velocity: Vec2) {
        if let Some(b) = self.body_mut(body) {
            b.vel = velocity;
        }
    }

    fn angular_velocity(&self, body: BodyHandle) -> f32 {
        self.body(body).map_or(0.0, |b| b.omega)
    }

    fn set_angular_velocity(&mut self, body: BodyHandle, omega: f32) {
        if let Some(b) = self.body_mut(body) {
            b.omega = omega;
        }
    }

    fn mass(&self, body: BodyHandle) -> f32 {
        self.body(body).map_or(0.0, |b| b.mass)
    }

    fn body_kind(&self, body: BodyHandle) -> BodyKind {
        self.body(body).map_or(BodyKind::Dynamic, |b| b.kind)
    }

    fn set_body_kind(&mut self, body: BodyHandle, kind: BodyKind) {
        if let Some(b) = self.body_mut(body) {
            if b.trigger.is_none() {
                b.kind = kind;
            }
        }
    }

    fn is_simulated(&self, body: BodyHandle) -> bool {
        self.body(body).is_some_and(|b| b.simulated)
    }

    fn set_simulated(&mut self, body: BodyHandle, simulated: bool) {
        if let Some(b) = self.body_mut(body) {
            b.simulated = simulated;
        }
    }

    fn detection_mode(&self, body: BodyHandle) -> DetectionMode {
        self.body(body).map_or(DetectionMode::Discrete, |b| b.detection)
    }

    fn set_detection_mode(&mut self, body: BodyHandle, mode: DetectionMode) {
        if let Some(b) = self.body_mut(body) {
            b.detection = mode;
        }
    }

    fn apply_impulse(&mut self, body: BodyHandle, impulse: Vec2) {
        if let Some(b) = self.body_mut(body) {
            let inv = b.inverse_mass();
            if inv > 0.0 {
                b.vel += impulse * inv;
                b.awake = true;
            }
        }
    }

    fn wake(&mut self, body: BodyHandle) {
        if let Some(b) = self.body_mut(body) {
            b.awake = true;
        }
    }

    fn sleep(&mut self, body: BodyHandle) {
        if let Some(b) = self.body_mut(body) {
            b.awake = false;
            b.vel = Vec2::ZERO;
            b.omega = 0.0;
        }
    }

    fn is_awake(&self, body: BodyHandle) -> bool {
        self.body(body).is_some_and(|b| b.awake)
    }

    fn query_overlaps(&self, body: BodyHandle, out: &mut Vec<Overlap>) {
        let Some(me) = self.body(body) else {
            return;
        };
        if !me.simulated {
            return;
        }
        let skin = self.config.contact_skin;

        for (i, other) in self.bodies.iter().enumerate() {
            if i == body.index() || !other.simulated {
                continue;
            }
            let hit = match (me.trigger, other.trigger) {
                (Some(_), Some(_)) => false,
                (Some(area), None) => circle_aabb(other.pos, other.radius, &area),
                (None, Some(area)) => circle_aabb(me.pos, me.radius, &area),
                (None, None) => circle_circle(me.pos, me.radius, other.pos, other.radius, skin).hit,
            };
            if hit {
                out.push(Overlap {
                    body: BodyHandle(i as u32),
                    trigger: other.trigger.is_some(),
                });
            }
        }
    }

    fn drain_contacts(&mut self, out: &mut Vec<ContactEvent>) {
        out.append(&mut self.contacts);
    }

    fn step(&mut self, dt: f32) {
        // Events describe the latest step only
        self.contacts.clear();
        self.integrate(dt);
        self.solve_pairs();
        self.collect_contacts();
    }
}
