//! Uniform spatial grid for short-range neighbor queries.
//!
//! The grid covers `world_size` starting at the origin and is rebuilt from
//! scratch every frame. Each cell holds at most `cell_capacity` particle
//! indices; excess indices are dropped for that frame. Positions outside
//! the covered area are clamped into the border cells.
//!
//! Storage is one flat `cells * cell_capacity` table plus a per-cell fill
//! count, allocated once. A rebuild only resets the counts and walks the
//! active particles, so it never allocates.
//!
//! The grid also keeps a snapshot of every active particle's position as
//! of the last rebuild. Neighbor forces read positions from this snapshot
//! rather than from the live pool, which other workers are writing.

use crate::error::SimulationError;
use crate::store::StoreGuard;
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Configuration for the spatial grid.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialConfig {
    /// Size of each square cell in world units.
    pub cell_size: f32,
    /// Extent of the covered area, starting at the origin.
    pub world_size: Vec2,
    /// Maximum number of particle indices stored per cell.
    pub cell_capacity: usize,
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self {
            cell_size: 30.0,
            world_size: Vec2::new(1280.0, 720.0),
            cell_capacity: 64,
        }
    }
}

impl SpatialConfig {
    pub fn new(cell_size: f32, world_size: Vec2) -> Self {
        Self {
            cell_size,
            world_size,
            ..Default::default()
        }
    }

    /// Set the per-cell index bound.
    pub fn with_cell_capacity(mut self, cell_capacity: usize) -> Self {
        self.cell_capacity = cell_capacity;
        self
    }

    /// Number of columns and rows.
    pub fn dimensions(&self) -> (usize, usize) {
        let cols = (self.world_size.x / self.cell_size).ceil().max(1.0) as usize;
        let rows = (self.world_size.y / self.cell_size).ceil().max(1.0) as usize;
        (cols, rows)
    }

    /// Total number of cells in the grid.
    pub fn total_cells(&self) -> usize {
        let (cols, rows) = self.dimensions();
        cols * rows
    }

    pub(crate) fn validate(&self) -> Result<(), SimulationError> {
        if !(self.cell_size.is_finite() && self.cell_size > 0.0) {
            return Err(SimulationError::InvalidCellSize(self.cell_size));
        }
        if !(self.world_size.is_finite() && self.world_size.x > 0.0 && self.world_size.y > 0.0) {
            return Err(SimulationError::InvalidWorldSize);
        }
        if self.cell_capacity == 0 {
            return Err(SimulationError::ZeroCellCapacity);
        }
        Ok(())
    }
}

/// Bounded uniform grid over particle positions.
#[derive(Debug)]
pub struct SpatialGrid {
    config: SpatialConfig,
    cols: usize,
    rows: usize,
    /// Fill count per cell.
    counts: Vec<usize>,
    /// `cell * cell_capacity + slot` -> particle index.
    entries: Vec<usize>,
    /// Position snapshot by global particle index.
    positions: Vec<Vec2>,
    indexed: usize,
    dropped: usize,
}

impl SpatialGrid {
    /// Create an empty grid able to snapshot a pool of `pool_capacity` particles.
    pub fn new(config: SpatialConfig, pool_capacity: usize) -> Self {
        let (cols, rows) = config.dimensions();
        let cells = cols * rows;
        Self {
            config,
            cols,
            rows,
            counts: vec![0; cells],
            entries: vec![0; cells * config.cell_capacity],
            positions: vec![Vec2::ZERO; pool_capacity],
            indexed: 0,
            dropped: 0,
        }
    }

    pub fn config(&self) -> &SpatialConfig {
        &self.config
    }

    /// Number of columns and rows.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.cols, self.rows)
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.counts.fill(0);
        self.indexed = 0;
        self.dropped = 0;
    }

    /// Rebuild from the active particles of the pool.
    ///
    /// Returns the number of particles that did not fit in their cell.
    pub fn rebuild(&mut self, store: &StoreGuard<'_>) -> usize {
        self.clear();
        for (index, particle) in store.iter_active() {
            self.insert(index, particle.position);
        }
        self.dropped
    }

    /// Record a particle at `position`.
    ///
    /// Returns `false` if its cell is already full; the position snapshot
    /// is updated either way.
    pub fn insert(&mut self, index: usize, position: Vec2) -> bool {
        if let Some(slot) = self.positions.get_mut(index) {
            *slot = position;
        }

        let cell = self.cell_index(position);
        let count = &mut self.counts[cell];
        if *count >= self.config.cell_capacity {
            self.dropped += 1;
            return false;
        }
        self.entries[cell * self.config.cell_capacity + *count] = index;
        *count += 1;
        self.indexed += 1;
        true
    }

    /// Clamped cell coordinates containing `position`.
    pub fn cell_of(&self, position: Vec2) -> (usize, usize) {
        let cx = (position.x / self.config.cell_size).floor() as i64;
        let cy = (position.y / self.config.cell_size).floor() as i64;
        (
            cx.clamp(0, self.cols as i64 - 1) as usize,
            cy.clamp(0, self.rows as i64 - 1) as usize,
        )
    }

    fn cell_index(&self, position: Vec2) -> usize {
        let (col, row) = self.cell_of(position);
        row * self.cols + col
    }

    /// Indices stored in one cell.
    pub fn cell(&self, col: usize, row: usize) -> &[usize] {
        if col >= self.cols || row >= self.rows {
            return &[];
        }
        self.cell_slice(row * self.cols + col)
    }

    fn cell_slice(&self, cell: usize) -> &[usize] {
        let start = cell * self.config.cell_capacity;
        &self.entries[start..start + self.counts[cell]]
    }

    /// Indices in the 3x3 block of cells around `position`.
    ///
    /// This is a superset of the particles within one cell size of
    /// `position` (as long as no cell overflowed) and may include the
    /// querying particle itself. Callers filter by exact distance.
    pub fn neighbors_of(&self, position: Vec2) -> impl Iterator<Item = usize> + '_ {
        let (col, row) = self.cell_of(position);
        let cols = col.saturating_sub(1)..=(col + 1).min(self.cols - 1);
        let rows = row.saturating_sub(1)..=(row + 1).min(self.rows - 1);
        let stride = self.cols;

        rows.flat_map(move |r| cols.clone().map(move |c| r * stride + c))
            .flat_map(move |cell| self.cell_slice(cell).iter().copied())
    }

    /// Same as [`neighbors_of`](Self::neighbors_of), collected into `buf`.
    ///
    /// `buf` is cleared first.
    pub fn neighbors_into(&self, position: Vec2, buf: &mut Vec<usize>) {
        buf.clear();
        buf.extend(self.neighbors_of(position));
    }

    /// Position of particle `index` as of the last rebuild.
    #[inline]
    pub fn position(&self, index: usize) -> Vec2 {
        self.positions[index]
    }

    /// Number of indices stored since the last rebuild.
    pub fn len(&self) -> usize {
        self.indexed
    }

    pub fn is_empty(&self) -> bool {
        self.indexed == 0
    }

    /// Number of indices dropped by full cells since the last rebuild.
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}
