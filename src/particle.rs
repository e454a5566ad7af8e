//! Particle records and the per-particle integration rule.
//!
//! Particles live in a fixed pool and are never deallocated. A slot is
//! activated and fully reinitialized by an [`Emitter`](crate::Emitter),
//! advanced by [`Particle::integrate`] once per frame, and deactivated by
//! the integrator when its lifetime runs out.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// 8-bit RGBA color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba::new(255, 255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Color as normalized floats in `[0, 1]`.
    pub fn to_array(self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        ]
    }
}

/// A single slot in the particle pool.
///
/// Fields of an inactive particle are stale. Force and integration code
/// must check [`Particle::active`] before reading anything else.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Particle {
    pub position: Vec2,
    pub velocity: Vec2,
    /// Acceleration accumulated for the current frame.
    pub acceleration: Vec2,
    /// Remaining lifetime in seconds.
    pub lifetime: f32,
    /// Lifetime the particle was emitted with.
    pub max_lifetime: f32,
    /// Display size.
    pub size: f32,
    pub color: Rgba,
    pub active: bool,
    /// Rainbow coloring requested by the emitter.
    pub rainbow: bool,
}

impl Particle {
    /// Accumulate a force for this frame (unit mass).
    #[inline]
    pub fn apply_force(&mut self, force: Vec2) {
        self.acceleration += force;
    }

    /// Advance by `dt` seconds.
    ///
    /// Velocity picks up the accumulated acceleration, position picks up
    /// the new velocity, and lifetime counts down. The particle deactivates
    /// once its lifetime reaches zero. Acceleration is cleared here and
    /// nowhere else. Does nothing on an inactive particle.
    ///
    /// Returns `true` if the particle died during this step.
    pub fn integrate(&mut self, dt: f32) -> bool {
        if !self.active {
            return false;
        }

        self.velocity += self.acceleration * dt;
        self.position += self.velocity * dt;

        self.lifetime -= dt;
        let died = self.lifetime <= 0.0;
        if died {
            self.active = false;
        }

        self.acceleration = Vec2::ZERO;
        died
    }

    /// Remaining fraction of lifetime, `1.0` at birth and `0.0` at death.
    pub fn life_ratio(&self) -> f32 {
        if self.max_lifetime > 0.0 {
            (self.lifetime / self.max_lifetime).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}
