//! Persistent worker threads for the parallel force and integration pass.
//!
//! Workers and the coordinating thread meet at two barriers every frame:
//!
//! ```text
//! coordinator: emit, rebuild grid | start | (waits)              | finish | caller reads state
//! worker i:    (parked)           | start | forces + integrate i | finish | (parked)
//! ```
//!
//! Everything the coordinator writes before `start` is visible to every
//! worker, and everything the workers write before `finish` is visible to
//! the coordinator afterwards. Workers never block anywhere else.
//!
//! Workers start behind a one-shot launch gate. The gate only opens once
//! every worker thread exists; if spawning fails partway, it is opened with
//! an abort signal instead and the workers already started are joined.
//!
//! Shutdown is cooperative: the coordinator raises the shutdown flag and
//! passes the start barrier one last time. Workers check the flag right
//! after `start` and exit instead of processing.
//!
//! A worker that panics leaves the barriers one participant short, which
//! stalls the next frame indefinitely.

use crate::error::SimulationError;
use crate::field::ForceFields;
use crate::interactions::{ForceConstants, ForceContext};
use crate::spatial::SpatialGrid;
use crate::store::{ParticleStore, Partition};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier, Condvar, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread::{self, JoinHandle};

/// Inputs the coordinator prepares before releasing the workers.
///
/// Written only while workers are parked; read-only during the pass.
#[derive(Debug)]
pub(crate) struct FrameInputs {
    pub dt: f32,
    pub interaction_enabled: bool,
    pub constants: ForceConstants,
    pub fields: ForceFields,
    pub grid: SpatialGrid,
}

/// One-shot signal releasing freshly spawned workers.
#[derive(Debug, Default)]
struct LaunchGate {
    /// `None` until opened; then whether workers should run.
    state: Mutex<Option<bool>>,
    opened: Condvar,
}

impl LaunchGate {
    fn open(&self, run: bool) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = Some(run);
        self.opened.notify_all();
    }

    /// Block until opened. Returns whether to run.
    fn wait(&self) -> bool {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let state = self
            .opened
            .wait_while(state, |s| s.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        (*state).unwrap_or(false)
    }
}

/// State shared between the coordinator and the workers.
#[derive(Debug)]
pub(crate) struct Shared {
    pub store: ParticleStore,
    frame: RwLock<FrameInputs>,
    start: Barrier,
    finish: Barrier,
    shutdown: AtomicBool,
    launch: LaunchGate,
}

impl Shared {
    pub fn new(store: ParticleStore, inputs: FrameInputs) -> Self {
        let participants = store.partition_count() + 1;
        Self {
            store,
            frame: RwLock::new(inputs),
            start: Barrier::new(participants),
            finish: Barrier::new(participants),
            shutdown: AtomicBool::new(false),
            launch: LaunchGate::default(),
        }
    }

    pub fn frame(&self) -> RwLockReadGuard<'_, FrameInputs> {
        self.frame.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn frame_mut(&self) -> RwLockWriteGuard<'_, FrameInputs> {
        self.frame.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Force and integration pass over one partition.
///
/// Returns the number of particles that died.
pub(crate) fn step_partition(part: &mut Partition, inputs: &FrameInputs) -> usize {
    let ctx = ForceContext {
        constants: &inputs.constants,
        fields: &inputs.fields,
        grid: &inputs.grid,
        interaction_enabled: inputs.interaction_enabled,
    };

    let base = part.base();
    let (particles, free) = part.split_mut();
    let mut deaths = 0;

    for (local, particle) in particles.iter_mut().enumerate() {
        if !particle.active {
            continue;
        }
        particle.apply_force(ctx.force_on(base + local, particle.position));
        if particle.integrate(inputs.dt) {
            free.push(local);
            deaths += 1;
        }
    }

    deaths
}

fn worker_loop(id: usize, shared: Arc<Shared>) {
    if !shared.launch.wait() {
        log::trace!("worker {} aborted before launch", id);
        return;
    }
    log::trace!("worker {} started", id);
    loop {
        shared.start.wait();
        if shared.shutdown.load(Ordering::Acquire) {
            break;
        }

        {
            let inputs = shared.frame();
            let mut part = shared.store.partition(id);
            step_partition(&mut part, &inputs);
        }

        shared.finish.wait();
    }
    log::trace!("worker {} exiting", id);
}

/// Fixed pool of worker threads, one per store partition.
#[derive(Debug)]
pub(crate) struct WorkerPool {
    shared: Arc<Shared>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn one worker per partition of the shared store.
    ///
    /// If any thread fails to spawn, the ones already running are stopped
    /// and joined before the error is returned.
    pub fn spawn(shared: Arc<Shared>) -> Result<Self, SimulationError> {
        Self::spawn_with(shared, |id, body| {
            thread::Builder::new()
                .name(format!("swarmkit-worker-{}", id))
                .spawn(body)
        })
    }

    fn spawn_with<F>(shared: Arc<Shared>, mut spawn_thread: F) -> Result<Self, SimulationError>
    where
        F: FnMut(usize, Box<dyn FnOnce() + Send>) -> io::Result<JoinHandle<()>>,
    {
        let count = shared.store.partition_count();
        let mut handles = Vec::with_capacity(count);

        for id in 0..count {
            let worker_shared = Arc::clone(&shared);
            match spawn_thread(id, Box::new(move || worker_loop(id, worker_shared))) {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    log::warn!("failed to spawn worker {} of {}: {}", id, count, e);
                    shared.launch.open(false);
                    for handle in handles {
                        let _ = handle.join();
                    }
                    return Err(SimulationError::WorkerSpawn(e));
                }
            }
        }

        shared.launch.open(true);
        Ok(Self { shared, handles })
    }

    pub fn shared(&self) -> &Shared {
        &self.shared
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Release the workers for one pass and wait until all have finished.
    ///
    /// The caller must not hold the store or frame locks.
    pub fn run_frame(&self) {
        self.shared.start.wait();
        self.shared.finish.wait();
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if self.handles.is_empty() {
            return;
        }
        self.shared.shutdown.store(true, Ordering::Release);
        self.shared.start.wait();

        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                log::warn!("particle worker panicked before shutdown");
            }
        }
        log::info!("particle workers shut down");
    }
}
