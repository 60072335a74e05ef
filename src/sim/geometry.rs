//! Collision geometry for circles and the container boundary
//!
//! Screen-style coordinates: x grows right, y grows down, the square field
//! spans `[0, size]` on both axes.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::WORLD_SIZE;
use crate::{cartesian_to_polar, polar_to_cartesian};

/// Result of a collision check
#[derive(Debug, Clone)]
pub struct Contact {
    /// Whether the shapes overlap
    pub hit: bool,
    /// Unit normal pointing from the second shape toward the first
    pub normal: Vec2,
    /// Overlap depth (for position correction)
    pub penetration: f32,
}

impl Contact {
    pub fn miss() -> Self {
        Self {
            hit: false,
            normal: Vec2::ZERO,
            penetration: 0.0,
        }
    }
}

/// Check overlap between two circles
///
/// Coincident centers (closer than 1e-4) have no defined normal; they are
/// pushed apart along +x.
pub fn circle_contact(pos_a: Vec2, radius_a: f32, pos_b: Vec2, radius_b: f32) -> Contact {
    let diff = pos_a - pos_b;
    let dist = diff.length();
    let reach = radius_a + radius_b;
    if dist < 1.0e-4 {
        return Contact {
            hit: true,
            normal: Vec2::X,
            penetration: reach - dist,
        };
    }

    if dist >= reach {
        return Contact::miss();
    }

    Contact {
        hit: true,
        normal: diff / dist,
        penetration: reach - dist,
    }
}

/// Shape of the container blocks are confined to
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Boundary {
    /// Axis-aligned square `[0, size]²`
    Square { size: f32 },
    /// Circle of `radius` centered in a `2 * radius` square
    Circle { radius: f32 },
}

impl Default for Boundary {
    fn default() -> Self {
        Boundary::Square { size: WORLD_SIZE }
    }
}

impl Boundary {
    /// Side of the square that encloses the play field
    pub fn extent(&self) -> f32 {
        match *self {
            Boundary::Square { size } => size,
            Boundary::Circle { radius } => 2.0 * radius,
        }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::splat(self.extent() / 2.0)
    }

    /// Push a circle back inside and bounce its velocity.
    ///
    /// The normal velocity component is reflected and scaled by `restitution`
    /// only when moving into the wall. Returns the total penetration removed.
    pub fn confine(&self, pos: &mut Vec2, vel: &mut Vec2, radius: f32, restitution: f32) -> f32 {
        match *self {
            Boundary::Square { size } => {
                let mut depth = 0.0;
                if pos.x - radius < 0.0 {
                    depth += radius - pos.x;
                    vel.x = vel.x.abs() * restitution;
                    pos.x = radius;
                }
                if pos.x + radius > size {
                    depth += pos.x + radius - size;
                    vel.x = -vel.x.abs() * restitution;
                    pos.x = size - radius;
                }
                if pos.y - radius < 0.0 {
                    depth += radius - pos.y;
                    vel.y = vel.y.abs() * restitution;
                    pos.y = radius;
                }
                if pos.y + radius > size {
                    depth += pos.y + radius - size;
                    vel.y = -vel.y.abs() * restitution;
                    pos.y = size - radius;
                }
                depth
            }
            Boundary::Circle { radius: arena } => {
                let center = self.center();
                let contact = outer_wall_contact(*pos - center, radius, arena);
                if !contact.hit {
                    return 0.0;
                }
                let inward = contact.normal;
                let vn = vel.dot(inward);
                if vn < 0.0 {
                    // Moving outward: flip and damp the normal part only
                    *vel -= (1.0 + restitution) * vn * inward;
                }
                let (_, theta) = cartesian_to_polar(*pos - center);
                *pos = center + polar_to_cartesian((arena - radius).max(0.0), theta);
                contact.penetration
            }
        }
    }

    /// Move a circle back inside without touching its velocity
    pub fn clamp_position(&self, pos: &mut Vec2, radius: f32) {
        match *self {
            Boundary::Square { size } => {
                let lo = radius.min(size / 2.0);
                let hi = (size - radius).max(size / 2.0);
                *pos = pos.clamp(Vec2::splat(lo), Vec2::splat(hi));
            }
            Boundary::Circle { radius: arena } => {
                let center = self.center();
                let offset = *pos - center;
                let max_r = (arena - radius).max(0.0);
                if offset.length() > max_r {
                    *pos = center + offset.clamp_length_max(max_r);
                }
            }
        }
    }

    /// Area enclosed by the boundary
    pub fn area(&self) -> f32 {
        match *self {
            Boundary::Square { size } => size * size,
            Boundary::Circle { radius } => std::f32::consts::PI * radius * radius,
        }
    }

    /// Whether a circle fits fully inside
    pub fn contains(&self, pos: Vec2, radius: f32) -> bool {
        match *self {
            Boundary::Square { size } => {
                pos.x - radius >= 0.0
                    && pos.y - radius >= 0.0
                    && pos.x + radius <= size
                    && pos.y + radius <= size
            }
            Boundary::Circle { radius: arena } => {
                (pos - self.center()).length() + radius <= arena
            }
        }
    }
}

/// Check a circle against the inside of a circular arena wall centered at the origin
pub fn outer_wall_contact(pos: Vec2, radius: f32, arena_radius: f32) -> Contact {
    let (r, theta) = cartesian_to_polar(pos);

    if r + radius > arena_radius {
        return Contact {
            hit: true,
            normal: -polar_to_cartesian(1.0, theta), // Point inward
            penetration: r + radius - arena_radius,
        };
    }

    Contact::miss()
}
