//! Fixed-capacity particle pool split into per-worker partitions.
//!
//! The pool is divided into contiguous index ranges, one per worker (see
//! [`partition_range`]). Each range lives behind its own mutex together
//! with a free-list stack of its inactive slots, so:
//!
//! - a worker only ever locks its own partition during the parallel phase,
//! - the coordinator locks every partition (via [`ParticleStore::lock`])
//!   only while no worker is running,
//! - slot allocation is O(1) per partition instead of a scan over the pool.
//!
//! Indices handed out by the store are global pool indices.

use crate::particle::Particle;
use std::ops::Range;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Index range owned by worker `id` out of `workers`, over a pool of `total` slots.
///
/// Every worker gets `total / workers` slots; the last one also absorbs the
/// remainder. The ranges of all workers cover `0..total` exactly once.
pub fn partition_range(id: usize, workers: usize, total: usize) -> Range<usize> {
    debug_assert!(workers > 0 && id < workers);
    let per_worker = total / workers;
    let start = id * per_worker;
    let end = if id + 1 == workers { total } else { start + per_worker };
    start..end
}

/// One worker's slice of the pool.
#[derive(Debug)]
pub(crate) struct Partition {
    base: usize,
    particles: Vec<Particle>,
    /// Local indices of inactive slots. Popped from the back.
    free: Vec<usize>,
}

impl Partition {
    fn new(range: Range<usize>) -> Self {
        let len = range.len();
        Self {
            base: range.start,
            particles: vec![Particle::default(); len],
            // Reversed so the lowest index is handed out first.
            free: (0..len).rev().collect(),
        }
    }

    /// Global index of the first slot.
    pub(crate) fn base(&self) -> usize {
        self.base
    }

    fn end(&self) -> usize {
        self.base + self.particles.len()
    }

    /// Mutable particles plus the free list, for the worker pass.
    pub(crate) fn split_mut(&mut self) -> (&mut [Particle], &mut Vec<usize>) {
        (&mut self.particles, &mut self.free)
    }

    fn active_count(&self) -> usize {
        self.particles.len() - self.free.len()
    }

    fn claim(&mut self) -> Option<(usize, &mut Particle)> {
        let local = self.free.pop()?;
        Some((self.base + local, &mut self.particles[local]))
    }

    fn release(&mut self, local: usize) {
        self.particles[local].active = false;
        self.free.push(local);
    }

    fn deactivate_all(&mut self) {
        for p in &mut self.particles {
            p.active = false;
        }
        self.free.clear();
        self.free.extend((0..self.particles.len()).rev());
    }
}

/// The particle pool.
#[derive(Debug)]
pub struct ParticleStore {
    partitions: Vec<Mutex<Partition>>,
    capacity: usize,
}

impl ParticleStore {
    /// Create a pool of `capacity` inactive particles split across `workers` partitions.
    ///
    /// # Panics
    ///
    /// Panics if `workers` is zero.
    pub fn new(capacity: usize, workers: usize) -> Self {
        assert!(workers > 0, "ParticleStore needs at least one partition");
        let partitions = (0..workers)
            .map(|id| Mutex::new(Partition::new(partition_range(id, workers, capacity))))
            .collect();
        Self { partitions, capacity }
    }

    /// Total number of slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of partitions (equal to the worker count).
    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    /// Lock a single partition. Used by worker `id` during the parallel phase.
    pub(crate) fn partition(&self, id: usize) -> MutexGuard<'_, Partition> {
        self.partitions[id].lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock the whole pool for exclusive access.
    ///
    /// Must not be held while workers are processing a frame.
    pub fn lock(&self) -> StoreGuard<'_> {
        StoreGuard {
            parts: self
                .partitions
                .iter()
                .map(|m| m.lock().unwrap_or_else(PoisonError::into_inner))
                .collect(),
        }
    }
}

/// Exclusive access to every partition of a [`ParticleStore`].
pub struct StoreGuard<'a> {
    parts: Vec<MutexGuard<'a, Partition>>,
}

impl StoreGuard<'_> {
    /// Total number of slots.
    pub fn capacity(&self) -> usize {
        self.parts.iter().map(|p| p.particles.len()).sum()
    }

    /// Number of active particles.
    pub fn active_count(&self) -> usize {
        self.parts.iter().map(|p| p.active_count()).sum()
    }

    /// Whether any slot is inactive.
    pub fn has_free_slot(&self) -> bool {
        self.parts.iter().any(|p| !p.free.is_empty())
    }

    /// Take an inactive slot, returning its global index and the particle.
    ///
    /// The particle is still marked inactive; the caller is expected to
    /// reinitialize it and set `active`. Returns `None` when the pool is full.
    pub fn claim_slot(&mut self) -> Option<(usize, &mut Particle)> {
        let part = self.parts.iter_mut().find(|p| !p.free.is_empty())?;
        part.claim()
    }

    /// Return a slot taken with [`claim_slot`](Self::claim_slot) that ended up unused.
    ///
    /// The particle is marked inactive and the slot becomes claimable again.
    /// Only valid for a slot claimed since the last frame; releasing a slot
    /// that is already free would hand it out twice.
    pub fn release(&mut self, index: usize) -> bool {
        let slot = self.parts.partition_point(|p| p.end() <= index);
        match self.parts.get_mut(slot) {
            Some(part) if index >= part.base && index < part.end() => {
                let local = index - part.base;
                part.release(local);
                true
            }
            _ => false,
        }
    }

    /// Particle at a global index.
    pub fn get(&self, index: usize) -> Option<&Particle> {
        let slot = self.parts.partition_point(|p| p.end() <= index);
        let part = self.parts.get(slot)?;
        part.particles.get(index - part.base)
    }

    /// All slots in global index order, active or not.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Particle)> + '_ {
        self.parts.iter().flat_map(|part| {
            let base = part.base;
            part.particles.iter().enumerate().map(move |(i, p)| (base + i, p))
        })
    }

    /// Active particles in global index order.
    pub fn iter_active(&self) -> impl Iterator<Item = (usize, &Particle)> + '_ {
        self.iter().filter(|(_, p)| p.active)
    }

    /// Deactivate every particle and return all slots to the free lists.
    pub fn deactivate_all(&mut self) {
        for part in &mut self.parts {
            part.deactivate_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_ranges_cover_pool_once() {
        for &workers in &[1usize, 3, 7] {
            for &total in &[10usize, 100, 101, 1000, 1003, 2] {
                let mut seen = vec![0u32; total];
                let mut expected_start = 0;
                for id in 0..workers {
                    let range = partition_range(id, workers, total);
                    assert_eq!(range.start, expected_start, "gap or overlap at worker {}", id);
                    expected_start = range.end;
                    for i in range {
                        seen[i] += 1;
                    }
                }
                assert_eq!(expected_start, total);
                assert!(seen.iter().all(|&c| c == 1), "workers={} total={}", workers, total);
            }
        }
    }

    #[test]
    fn test_last_partition_absorbs_remainder() {
        assert_eq!(partition_range(0, 3, 10), 0..3);
        assert_eq!(partition_range(1, 3, 10), 3..6);
        assert_eq!(partition_range(2, 3, 10), 6..10);
    }

    #[test]
    fn test_claim_until_full() {
        let store = ParticleStore::new(10, 3);
        let mut guard = store.lock();
        assert_eq!(guard.capacity(), 10);

        let mut claimed = Vec::new();
        while let Some((index, p)) = guard.claim_slot() {
            p.active = true;
            claimed.push(index);
        }
        claimed.sort_unstable();
        assert_eq!(claimed, (0..10).collect::<Vec<_>>());
        assert!(!guard.has_free_slot());
        assert_eq!(guard.active_count(), 10);
    }

    #[test]
    fn test_first_claim_is_lowest_index() {
        let store = ParticleStore::new(8, 2);
        let mut guard = store.lock();
        let (index, _) = guard.claim_slot().unwrap();
        assert_eq!(index, 0);
    }

    #[test]
    fn test_get_maps_global_index() {
        let store = ParticleStore::new(10, 3);
        {
            let mut guard = store.lock();
            for _ in 0..10 {
                let (index, p) = guard.claim_slot().unwrap();
                p.active = true;
                p.lifetime = index as f32;
            }
        }
        let guard = store.lock();
        for i in 0..10 {
            assert_eq!(guard.get(i).unwrap().lifetime, i as f32);
        }
        assert!(guard.get(10).is_none());
    }

    #[test]
    fn test_more_workers_than_slots() {
        let store = ParticleStore::new(2, 7);
        let guard = store.lock();
        assert_eq!(guard.capacity(), 2);
        assert_eq!(guard.iter().count(), 2);
        assert!(guard.get(1).is_some());
    }

    #[test]
    fn test_release_returns_slot() {
        let store = ParticleStore::new(4, 2);
        let mut guard = store.lock();
        while let Some((_, p)) = guard.claim_slot() {
            p.active = true;
        }
        assert!(!guard.has_free_slot());

        assert!(guard.release(3));
        assert!(!guard.release(4));
        assert_eq!(guard.active_count(), 3);
        assert_eq!(guard.iter_active().count(), 3);
        assert_eq!(guard.claim_slot().map(|(i, _)| i), Some(3));
    }

    #[test]
    fn test_deactivate_all_restores_free_slots() {
        let store = ParticleStore::new(5, 2);
        let mut guard = store.lock();
        while let Some((_, p)) = guard.claim_slot() {
            p.active = true;
        }
        guard.deactivate_all();
        assert_eq!(guard.active_count(), 0);
        assert_eq!(guard.iter_active().count(), 0);
        assert!(guard.has_free_slot());
    }
}
