//! Simulation configuration.
//!
//! [`SimulationConfig`] collects every tunable of the kernel. It can be
//! built with `with_*` methods or loaded from JSON; missing JSON fields
//! fall back to their defaults.
//!
//! ```ignore
//! let config = SimulationConfig::new()
//!     .with_capacity(50_000)
//!     .with_threads(4)
//!     .with_cell_size(30.0)
//!     .with_repulsion(15.0, 500.0);
//! let mut system = ParticleSystem::new(config)?;
//! ```

use crate::error::SimulationError;
use crate::interactions::ForceConstants;
use crate::spatial::SpatialConfig;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Complete kernel configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of particle slots in the pool.
    pub capacity: usize,
    /// Number of worker threads.
    pub threads: usize,
    pub spatial: SpatialConfig,
    pub forces: ForceConstants,
    /// Whether neighbor repulsion starts enabled.
    pub interaction_enabled: bool,
    /// Base seed for emitter random streams. `None` uses system entropy.
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            capacity: 10_000,
            threads: default_threads(),
            spatial: SpatialConfig::default(),
            forces: ForceConstants::default(),
            interaction_enabled: true,
            seed: None,
        }
    }
}

impl SimulationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_spatial(mut self, spatial: SpatialConfig) -> Self {
        self.spatial = spatial;
        self
    }

    pub fn with_cell_size(mut self, cell_size: f32) -> Self {
        self.spatial.cell_size = cell_size;
        self
    }

    pub fn with_world_size(mut self, world_size: Vec2) -> Self {
        self.spatial.world_size = world_size;
        self
    }

    pub fn with_cell_capacity(mut self, cell_capacity: usize) -> Self {
        self.spatial.cell_capacity = cell_capacity;
        self
    }

    pub fn with_gravity(mut self, gravity: Vec2) -> Self {
        self.forces.gravity = gravity;
        self
    }

    /// Set the repulsion cutoff radius and strength.
    ///
    /// The radius is independent of the grid cell size. Neighbor queries
    /// only see one cell in every direction, so radii larger than the cell
    /// size miss some neighbors.
    pub fn with_repulsion(mut self, radius: f32, strength: f32) -> Self {
        self.forces.repulsion_radius = radius;
        self.forces.repulsion_strength = strength;
        self
    }

    /// Squared distance at or below which repulsion and force fields are skipped.
    pub fn with_min_distance_sq(mut self, min_distance_sq: f32) -> Self {
        self.forces.min_distance_sq = min_distance_sq;
        self
    }

    pub fn with_interaction(mut self, enabled: bool) -> Self {
        self.interaction_enabled = enabled;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Check the construction-time invariants.
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.capacity == 0 {
            return Err(SimulationError::ZeroCapacity);
        }
        if self.threads == 0 {
            return Err(SimulationError::ZeroThreads);
        }
        self.spatial.validate()?;
        let radius = self.forces.repulsion_radius;
        if !(radius.is_finite() && radius > 0.0) {
            return Err(SimulationError::InvalidInteractionRadius(radius));
        }
        let min_distance_sq = self.forces.min_distance_sq;
        if !(min_distance_sq.is_finite() && min_distance_sq >= 0.0) {
            return Err(SimulationError::InvalidMinDistance(min_distance_sq));
        }
        if radius > self.spatial.cell_size {
            log::warn!(
                "repulsion radius {} exceeds grid cell size {}; some neighbors will be missed",
                radius,
                self.spatial.cell_size
            );
        }
        Ok(())
    }

    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, SimulationError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, SimulationError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Save the configuration to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SimulationError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Load a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SimulationError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SimulationConfig::default();
        assert!(config.threads > 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_sizes() {
        assert!(matches!(
            SimulationConfig::new().with_capacity(0).validate(),
            Err(SimulationError::ZeroCapacity)
        ));
        assert!(matches!(
            SimulationConfig::new().with_threads(0).validate(),
            Err(SimulationError::ZeroThreads)
        ));
        assert!(matches!(
            SimulationConfig::new().with_repulsion(f32::NAN, 1.0).validate(),
            Err(SimulationError::InvalidInteractionRadius(_))
        ));
        assert!(matches!(
            SimulationConfig::new().with_cell_size(-1.0).validate(),
            Err(SimulationError::InvalidCellSize(_))
        ));
    }

    #[test]
    fn test_json_partial_uses_defaults() {
        let config = SimulationConfig::from_json(r#"{ "capacity": 500, "threads": 2 }"#).unwrap();
        assert_eq!(config.capacity, 500);
        assert_eq!(config.threads, 2);
        assert_eq!(config.spatial, SpatialConfig::default());
        assert_eq!(config.forces, ForceConstants::default());
        assert!(config.interaction_enabled);
    }

    #[test]
    fn test_min_distance_from_json_and_validated() {
        let config =
            SimulationConfig::from_json(r#"{ "forces": { "min_distance_sq": 0.25 } }"#).unwrap();
        assert_eq!(config.forces.min_distance_sq, 0.25);
        assert_eq!(config.forces.repulsion_radius, 15.0);
        assert!(config.validate().is_ok());

        assert!(matches!(
            SimulationConfig::new().with_min_distance_sq(-1.0).validate(),
            Err(SimulationError::InvalidMinDistance(_))
        ));
        assert!(matches!(
            SimulationConfig::new().with_min_distance_sq(f32::INFINITY).validate(),
            Err(SimulationError::InvalidMinDistance(_))
        ));
    }

    #[test]
    fn test_json_rejects_garbage() {
        assert!(matches!(
            SimulationConfig::from_json("{ capacity: }"),
            Err(SimulationError::Json(_))
        ));
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("swarmkit-config-{}.json", std::process::id()));
        let config = SimulationConfig::new()
            .with_capacity(321)
            .with_threads(3)
            .with_gravity(Vec2::new(1.0, 2.0))
            .with_seed(11);
        config.save(&path).unwrap();
        let loaded = SimulationConfig::load(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            SimulationConfig::load("/definitely/not/here.json"),
            Err(SimulationError::Io(_))
        ));
    }
}
