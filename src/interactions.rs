//! Per-particle force accumulation.
//!
//! Every frame each active particle receives:
//!
//! 1. constant gravity,
//! 2. the sum of all active force fields,
//! 3. short-range repulsion from nearby particles, if interaction is enabled.
//!
//! Repulsion falls off linearly from `repulsion_strength` at distance zero
//! to nothing at `repulsion_radius`, directed away from the neighbor.
//! Neighbors come from the spatial grid, which returns a superset; exact
//! distance filtering happens here.

use crate::field::ForceFields;
use crate::spatial::SpatialGrid;
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Global force parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForceConstants {
    /// Constant acceleration applied to every particle (+y is down).
    pub gravity: Vec2,
    /// Distance at which repulsion vanishes.
    pub repulsion_radius: f32,
    /// Repulsion at zero distance.
    pub repulsion_strength: f32,
    /// Squared distance at or below which neither repulsion nor force
    /// fields act, keeping the `1 / distance` terms finite.
    pub min_distance_sq: f32,
}

impl Default for ForceConstants {
    fn default() -> Self {
        Self {
            gravity: Vec2::new(0.0, 98.0),
            repulsion_radius: 15.0,
            repulsion_strength: 500.0,
            min_distance_sq: 0.01,
        }
    }
}

impl ForceConstants {
    /// Repulsion felt by a particle displaced by `delta` from a neighbor.
    pub fn repulsion(&self, delta: Vec2) -> Vec2 {
        let dist_sq = delta.length_squared();
        let radius = self.repulsion_radius;
        if dist_sq < radius * radius && dist_sq > self.min_distance_sq {
            let dist = dist_sq.sqrt();
            delta * (self.repulsion_strength * (1.0 - dist / radius) / dist)
        } else {
            Vec2::ZERO
        }
    }
}

/// Read-only inputs shared by all workers during the force pass.
pub(crate) struct ForceContext<'a> {
    pub constants: &'a ForceConstants,
    pub fields: &'a ForceFields,
    pub grid: &'a SpatialGrid,
    pub interaction_enabled: bool,
}

impl ForceContext<'_> {
    /// Total force on particle `index` at `position`.
    pub fn force_on(&self, index: usize, position: Vec2) -> Vec2 {
        let eps = self.constants.min_distance_sq;
        let mut force = self.constants.gravity + self.fields.force_at(position, eps);

        if self.interaction_enabled {
            for other in self.grid.neighbors_of(position) {
                if other != index {
                    force += self.constants.repulsion(position - self.grid.position(other));
                }
            }
        }

        force
    }
}
