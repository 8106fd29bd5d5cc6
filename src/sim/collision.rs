//! Collision detection and response for circular fruit
//!
//! Narrow-phase helpers for the reference simulator: circle vs circle,
//! circle vs trigger box, and circle vs the open-top container walls.

use glam::Vec2;

use super::physics::Aabb;

/// Result of a collision check
#[derive(Debug, Clone)]
pub struct CollisionResult {
    /// Whether a collision occurred
    pub hit: bool,
    /// Surface normal at contact, pointing from the obstacle toward the body
    pub normal: Vec2,
    /// Penetration depth (for position correction)
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            normal: Vec2::ZERO,
            penetration: 0.0,
        }
    }
}

/// Check two circles for overlap
///
/// The normal points from `b` toward `a`. `skin` widens the test so resting
/// bodies separated by solver slop still count as touching.
pub fn circle_circle(
    a_pos: Vec2,
    a_radius: f32,
    b_pos: Vec2,
    b_radius: f32,
    skin: f32,
) -> CollisionResult {
    let delta = a_pos - b_pos;
    let dist_sq = delta.length_squared();
    let reach = a_radius + b_radius + skin;

    if dist_sq >= reach * reach {
        return CollisionResult::miss();
    }

    let dist = dist_sq.sqrt();
    // Coincident centers: push straight up
    let normal = if dist > 1e-6 { delta / dist } else { Vec2::Y };
    CollisionResult {
        hit: true,
        normal,
        penetration: (a_radius + b_radius - dist).max(0.0),
    }
}

/// Check a circle against a box (trigger volumes)
pub fn circle_aabb(pos: Vec2, radius: f32, area: &Aabb) -> bool {
    let closest = area.closest_point(pos);
    (pos - closest).length_squared() <= radius * radius
}

/// Check a circle against the container: left wall, right wall and floor
///
/// The container is open at the top. Returns the deepest wall contact.
pub fn circle_container(pos: Vec2, radius: f32, half_width: f32, floor_y: f32) -> CollisionResult {
    let mut best = CollisionResult::miss();

    let candidates = [
        (pos.x - radius + half_width, Vec2::X),
        (half_width - (pos.x + radius), -Vec2::X),
        (pos.y - radius - floor_y, Vec2::Y),
    ];

    for (gap, normal) in candidates {
        if gap < 0.0 && -gap > best.penetration {
            best = CollisionResult {
                hit: true,
                normal,
                penetration: -gap,
            };
        }
    }

    best
}
