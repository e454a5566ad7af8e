//! # swarmkit
//!
//! A real-time 2D particle simulation kernel. A fixed pool of particles is
//! advanced every frame by a team of worker threads, subject to emitters,
//! gravity, point force fields and short-range repulsion between
//! neighbors found through a uniform spatial grid.
//!
//! Rendering and input are left to the caller: it feeds a frame time and
//! emitter/force-field commands in, then reads particle state back out.
//!
//! ## Quick Start
//!
//! ```ignore
//! use swarmkit::prelude::*;
//!
//! fn main() -> Result<(), SimulationError> {
//!     let mut system = ParticleSystem::new(
//!         SimulationConfig::new().with_capacity(50_000).with_threads(4),
//!     )?;
//!
//!     system.add_emitter(
//!         EmitterSettings::new(Vec2::new(640.0, 620.0), EmitterShape::Point)
//!             .with_rate(500.0)
//!             .with_speed(200.0),
//!     );
//!     let cursor = system.add_force_field(Vec2::new(640.0, 360.0), 150.0, -500.0);
//!
//!     let mut clock = FrameClock::new();
//!     loop {
//!         system.update_force_field_position(cursor, read_mouse());
//!         system.update(clock.tick());
//!         system.for_each_active(|p| draw(p.position, p.color, p.size, p.life_ratio));
//!     }
//! }
//! ```
//!
//! ## Frame Protocol
//!
//! Each [`ParticleSystem::update`] call runs, strictly in order:
//!
//! 1. **Emit** - every emitter spawns into inactive pool slots.
//! 2. **Rebuild** - the spatial grid is rebuilt from the active particles.
//! 3. **Force + integrate** - workers are released at a barrier; each one
//!    owns a disjoint contiguous range of the pool, accumulates forces for
//!    its active particles and integrates them, then meets the coordinator
//!    at a second barrier.
//!
//! When `update` returns every worker is parked, so the caller may read or
//! mutate anything until the next call.
//!
//! ## Degradation
//!
//! The kernel never fails at runtime:
//!
//! | Situation | Behavior |
//! |-----------|----------|
//! | Pool full | Excess spawns are dropped; emitters report the real count |
//! | Grid cell full | Extra particles skip neighbor repulsion that frame |
//! | Stale handle | The call is ignored |
//!
//! Only construction can fail (see [`SimulationError`]).

pub mod config;
pub mod emitter;
mod error;
pub mod field;
pub mod interactions;
mod particle;
mod simulation;
pub mod spatial;
pub mod store;
pub mod time;
mod view;
mod worker;

pub use bytemuck;
pub use config::SimulationConfig;
pub use emitter::{ColorRange, Emitter, EmitterSettings, EmitterShape, ParticleModifier, SpiralPhase};
pub use error::SimulationError;
pub use field::{ForceField, ForceFields};
pub use glam::Vec2;
pub use interactions::ForceConstants;
pub use particle::{Particle, Rgba};
pub use simulation::{FrameStats, ParticleSystem};
pub use spatial::{SpatialConfig, SpatialGrid};
pub use store::{partition_range, ParticleStore, StoreGuard};
pub use view::{ParticleInstance, ParticleView};

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use swarmkit::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::SimulationConfig;
    pub use crate::emitter::{ColorRange, Emitter, EmitterSettings, EmitterShape};
    pub use crate::error::SimulationError;
    pub use crate::field::ForceField;
    pub use crate::particle::{Particle, Rgba};
    pub use crate::simulation::{FrameStats, ParticleSystem};
    pub use crate::time::FrameClock;
    pub use crate::view::{ParticleInstance, ParticleView};
    pub use crate::Vec2;
}
