//! The simulation coordinator.
//!
//! [`ParticleSystem`] owns the particle pool, emitters, force fields, the
//! spatial grid and the worker pool. Each call to
//! [`update`](ParticleSystem::update) runs one frame:
//!
//! 1. every emitter spawns into the pool (sequential),
//! 2. the spatial grid is rebuilt from the active particles (sequential),
//! 3. workers accumulate forces and integrate their partitions (parallel),
//! 4. control returns once every worker is done.
//!
//! All other methods run between frames on the caller's thread, so
//! mutations of emitters and force fields never race with the workers.
//!
//! Emitter and force-field handles are plain indices. Removing an entry
//! shifts the handles after it down by one; stale handles are ignored.

use crate::config::SimulationConfig;
use crate::emitter::{Emitter, EmitterSettings};
use crate::error::SimulationError;
use crate::field::{ForceField, ForceFields};
use crate::spatial::SpatialGrid;
use crate::store::ParticleStore;
use crate::view::{ParticleInstance, ParticleView};
use crate::worker::{FrameInputs, Shared, WorkerPool};
use glam::Vec2;
use std::sync::Arc;

/// Summary of one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frame number, starting at 1.
    pub frame: u64,
    /// Particles spawned by emitters this frame.
    pub emitted: usize,
    /// Active particles after integration.
    pub active: usize,
    /// Particles left out of the spatial grid by full cells.
    pub grid_dropped: usize,
}

/// Multithreaded particle simulation.
#[derive(Debug)]
pub struct ParticleSystem {
    config: SimulationConfig,
    emitters: Vec<Emitter>,
    workers: WorkerPool,
    frame: u64,
    /// Number of emitters created so far, used to derive seeds.
    spawned_emitters: u64,
}

impl ParticleSystem {
    /// Build the pool, grid and worker threads.
    ///
    /// Fails if the configuration is invalid or a worker thread cannot be spawned.
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        config.validate()?;

        let store = ParticleStore::new(config.capacity, config.threads);
        let inputs = FrameInputs {
            dt: 0.0,
            interaction_enabled: config.interaction_enabled,
            constants: config.forces,
            fields: ForceFields::new(),
            grid: SpatialGrid::new(config.spatial, config.capacity),
        };
        let (cols, rows) = inputs.grid.dimensions();

        let workers = WorkerPool::spawn(Arc::new(Shared::new(store, inputs)))?;

        log::info!(
            "particle system ready: {} slots, {} workers, {}x{} grid cells of {}",
            config.capacity,
            config.threads,
            cols,
            rows,
            config.spatial.cell_size
        );

        Ok(Self {
            config,
            emitters: Vec::new(),
            workers,
            frame: 0,
            spawned_emitters: 0,
        })
    }

    fn shared(&self) -> &Shared {
        self.workers.shared()
    }

    /// Advance the simulation by `dt` seconds.
    ///
    /// `dt` is used as given; callers should clamp it (see
    /// [`FrameClock`](crate::time::FrameClock)) to keep integration stable.
    pub fn update(&mut self, dt: f32) -> FrameStats {
        let (emitted, grid_dropped) = {
            let shared = self.workers.shared();
            let mut store = shared.store.lock();
            let mut inputs = shared.frame_mut();

            let emitted = self
                .emitters
                .iter_mut()
                .map(|emitter| emitter.update(dt, &mut store))
                .sum();

            inputs.dt = dt;
            let dropped = inputs.grid.rebuild(&store);
            (emitted, dropped)
        };

        self.workers.run_frame();
        self.frame += 1;

        let stats = FrameStats {
            frame: self.frame,
            emitted,
            active: self.active_count(),
            grid_dropped,
        };
        log::trace!(
            "frame {}: emitted {}, active {}, grid dropped {}",
            stats.frame,
            stats.emitted,
            stats.active,
            stats.grid_dropped
        );
        stats
    }

    /// Deactivate all particles and remove every emitter and force field.
    ///
    /// Capacity, thread count and configuration are kept.
    pub fn reset(&mut self) {
        let shared = self.workers.shared();
        shared.store.lock().deactivate_all();
        {
            let mut inputs = shared.frame_mut();
            inputs.fields.clear();
            inputs.grid.clear();
            inputs.interaction_enabled = self.config.interaction_enabled;
        }
        self.emitters.clear();
        self.frame = 0;
        log::debug!("particle system reset");
    }

    // ========== Emitters ==========

    fn next_emitter(&mut self, settings: EmitterSettings) -> Emitter {
        let n = self.spawned_emitters;
        self.spawned_emitters += 1;
        match self.config.seed {
            Some(seed) => Emitter::with_seed(settings, seed.wrapping_add(n)),
            None => Emitter::new(settings),
        }
    }

    /// Add an emitter and return its handle.
    pub fn add_emitter(&mut self, settings: EmitterSettings) -> usize {
        let emitter = self.next_emitter(settings);
        self.push_emitter(emitter)
    }

    /// Add a preconfigured emitter (for example one with modifiers).
    pub fn push_emitter(&mut self, emitter: Emitter) -> usize {
        log::debug!("adding {:?} emitter at {}", emitter.settings().shape, emitter.position());
        self.emitters.push(emitter);
        self.emitters.len() - 1
    }

    /// Remove an emitter. Stale handles are ignored.
    pub fn remove_emitter(&mut self, handle: usize) -> Option<Emitter> {
        if handle >= self.emitters.len() {
            return None;
        }
        log::debug!("removing emitter {}", handle);
        Some(self.emitters.remove(handle))
    }

    pub fn emitter(&self, handle: usize) -> Option<&Emitter> {
        self.emitters.get(handle)
    }

    pub fn emitter_mut(&mut self, handle: usize) -> Option<&mut Emitter> {
        self.emitters.get_mut(handle)
    }

    pub fn set_emitter_position(&mut self, handle: usize, position: Vec2) {
        if let Some(emitter) = self.emitters.get_mut(handle) {
            emitter.set_position(position);
        }
    }

    pub fn emitter_count(&self) -> usize {
        self.emitters.len()
    }

    /// Spawn `count` particles right away from a one-shot emitter.
    ///
    /// Returns how many fit in the pool.
    pub fn emit_burst(&mut self, settings: EmitterSettings, count: usize) -> usize {
        let mut emitter = self.next_emitter(settings);
        let emitted = emitter.emit(count, &mut self.shared().store.lock());
        log::debug!("burst emitted {} of {} particles", emitted, count);
        emitted
    }

    // ========== Force fields ==========

    /// Add an active force field and return its handle.
    pub fn add_force_field(&mut self, position: Vec2, radius: f32, strength: f32) -> usize {
        let handle = self
            .shared()
            .frame_mut()
            .fields
            .add(ForceField::new(position, radius, strength));
        log::debug!("added force field {} at {} (strength {})", handle, position, strength);
        handle
    }

    /// Remove a force field. Stale handles are ignored.
    pub fn remove_force_field(&mut self, handle: usize) -> Option<ForceField> {
        let removed = self.shared().frame_mut().fields.remove(handle);
        if removed.is_some() {
            log::debug!("removed force field {}", handle);
        }
        removed
    }

    pub fn update_force_field_position(&mut self, handle: usize, position: Vec2) {
        self.shared().frame_mut().fields.set_position(handle, position);
    }

    /// Strength of a field, `0.0` for a stale handle.
    pub fn get_force_field_strength(&self, handle: usize) -> f32 {
        self.shared().frame().fields.strength(handle)
    }

    pub fn set_force_field_strength(&mut self, handle: usize, strength: f32) {
        self.shared().frame_mut().fields.set_strength(handle, strength);
    }

    /// Swap a field between attracting and repelling.
    pub fn toggle_force_field_polarity(&mut self, handle: usize) {
        self.shared().frame_mut().fields.toggle_polarity(handle);
    }

    pub fn set_force_field_active(&mut self, handle: usize, active: bool) {
        self.shared().frame_mut().fields.set_active(handle, active);
    }

    pub fn force_field(&self, handle: usize) -> Option<ForceField> {
        self.shared().frame().fields.get(handle).copied()
    }

    pub fn force_fields(&self) -> Vec<ForceField> {
        self.shared().frame().fields.iter().copied().collect()
    }

    pub fn force_field_count(&self) -> usize {
        self.shared().frame().fields.len()
    }

    // ========== Interaction ==========

    pub fn set_particle_interaction_enabled(&mut self, enabled: bool) {
        self.shared().frame_mut().interaction_enabled = enabled;
        log::debug!("particle interaction {}", if enabled { "enabled" } else { "disabled" });
    }

    pub fn is_particle_interaction_enabled(&self) -> bool {
        self.shared().frame().interaction_enabled
    }

    // ========== Reading state ==========

    /// Call `f` for every active particle, in pool order.
    pub fn for_each_active<F: FnMut(ParticleView)>(&self, mut f: F) {
        let store = self.shared().store.lock();
        for (index, particle) in store.iter_active() {
            f(ParticleView::new(index, particle));
        }
    }

    /// Collect every active particle.
    pub fn active_particles(&self) -> Vec<ParticleView> {
        let mut views = Vec::with_capacity(self.active_count());
        self.for_each_active(|view| views.push(view));
        views
    }

    /// Replace the contents of `out` with one instance per active particle.
    ///
    /// Returns the number of instances written.
    pub fn write_instances(&self, out: &mut Vec<ParticleInstance>) -> usize {
        out.clear();
        let store = self.shared().store.lock();
        out.extend(store.iter_active().map(|(_, p)| ParticleInstance::from(p)));
        out.len()
    }

    pub fn active_count(&self) -> usize {
        self.shared().store.lock().active_count()
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    pub fn thread_count(&self) -> usize {
        self.workers.len()
    }

    /// Number of frames run since construction or the last reset.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }
}
