//! Adapter between the physics capability and the merge engine
//!
//! Maps bodies back to the pooled fruit that owns them, buffers the contact
//! events of the latest step, and owns the scratch buffers used by per-step
//! queries so steady-state play does not allocate.

use glam::Vec2;

use super::physics::{BodyDesc, BodyHandle, BodyKind, ContactEvent, Overlap, Physics};
use super::pool::PoolKey;
use super::rank::Rank;

/// Where freshly built, inactive bodies are parked
pub const PARK_POSITION: Vec2 = Vec2::new(0.0, -100.0);

const HIT_CAPACITY: usize = 16;
const CONTACT_CAPACITY: usize = 128;

#[derive(Debug)]
pub struct PhysicsBridge<P: Physics> {
    physics: P,
    /// Pool slot owning each body, indexed by body handle
    owners: Vec<Option<PoolKey>>,
    hits: Vec<Overlap>,
    contacts: Vec<ContactEvent>,
}

impl<P: Physics> PhysicsBridge<P> {
    pub fn new(physics: P) -> Self {
        Self {
            physics,
            owners: Vec::new(),
            hits: Vec::with_capacity(HIT_CAPACITY),
            contacts: Vec::with_capacity(CONTACT_CAPACITY),
        }
    }

    #[inline]
    pub fn physics(&self) -> &P {
        &self.physics
    }

    #[inline]
    pub fn physics_mut(&mut self) -> &mut P {
        &mut self.physics
    }

    /// Build the body for a new pooled fruit and remember its owner
    pub fn create_fruit_body(
        &mut self,
        template: &Rank,
        position: Vec2,
        owner: PoolKey,
        simulated: bool,
    ) -> BodyHandle {
        let body = self.physics.create_body(BodyDesc {
            position,
            radius: template.radius,
            mass: template.mass,
            simulated,
        });
        let idx = body.index();
        if idx >= self.owners.len() {
            self.owners.resize(idx + 1, None);
        }
        self.owners[idx] = Some(owner);
        body
    }

    /// Pool slot owning `body`, if it is a fruit body
    #[inline]
    pub fn owner_of(&self, body: BodyHandle) -> Option<PoolKey> {
        self.owners.get(body.index()).copied().flatten()
    }

    /// Advance the simulation and buffer the contacts it reported
    pub fn step(&mut self, dt: f32) {
        self.physics.step(dt);
        self.contacts.clear();
        self.physics.drain_contacts(&mut self.contacts);
    }

    /// Contact events buffered by the latest step
    pub fn contacts(&self) -> &[ContactEvent] {
        &self.contacts
    }

    /// Collect merge candidates for `body` into the hit buffer: every
    /// collider from an explicit overlap query plus every contact partner
    /// from the latest step, without duplicates.
    pub fn gather_candidates(&mut self, body: BodyHandle) {
        self.hits.clear();
        self.physics.query_overlaps(body, &mut self.hits);

        for contact in &self.contacts {
            let other = if contact.a == body {
                contact.b
            } else if contact.b == body {
                contact.a
            } else {
                continue;
            };
            if !self.hits.iter().any(|h| h.body == other) {
                self.hits.push(Overlap {
                    body: other,
                    trigger: false,
                });
            }
        }
    }

    /// Result of the last `gather_candidates`
    #[inline]
    pub fn candidates(&self) -> &[Overlap] {
        &self.hits
    }

    /// Fruit bodies overlapping a trigger volume
    pub fn fruits_in_trigger(&mut self, trigger: BodyHandle, out: &mut Vec<PoolKey>) {
        out.clear();
        self.hits.clear();
        self.physics.query_overlaps(trigger, &mut self.hits);
        for hit in &self.hits {
            if hit.trigger {
                continue;
            }
            if let Some(owner) = self.owners.get(hit.body.index()).copied().flatten() {
                out.push(owner);
            }
        }
    }

    /// Ensure the body is dynamic and awake
    pub fn wake_dynamic(&mut self, body: BodyHandle) {
        self.physics.set_body_kind(body, BodyKind::Dynamic);
        if !self.physics.is_awake(body) {
            self.physics.wake(body);
        }
    }

    /// Zero linear and angular velocity
    pub fn halt(&mut self, body: BodyHandle) {
        self.physics.set_velocity(body, Vec2::ZERO);
        self.physics.set_angular_velocity(body, 0.0);
    }

    #[inline]
    pub fn speed(&self, body: BodyHandle) -> f32 {
        self.physics.velocity(body).length()
    }

    /// Linear momentum magnitude (mass × speed)
    #[inline]
    pub fn momentum(&self, body: BodyHandle) -> f32 {
        self.physics.mass(body) * self.speed(body)
    }
}
