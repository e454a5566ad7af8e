//! Error types for swarmkit.
//!
//! The simulation kernel degrades silently at runtime (saturated pool,
//! overflowing grid cells, stale handles). The only failures surfaced to
//! callers are construction-time configuration problems and I/O around
//! configuration files.

use std::fmt;

/// Errors that can occur while building or configuring a simulation.
#[derive(Debug)]
pub enum SimulationError {
    /// Particle pool capacity was zero.
    ZeroCapacity,
    /// Worker thread count was zero.
    ZeroThreads,
    /// Spatial grid cell size was zero, negative or not finite.
    InvalidCellSize(f32),
    /// Spatial grid world extent was zero, negative or not finite.
    InvalidWorldSize,
    /// Per-cell capacity of the spatial grid was zero.
    ZeroCellCapacity,
    /// Repulsion radius was zero, negative or not finite.
    InvalidInteractionRadius(f32),
    /// Minimum interaction distance was negative or not finite.
    InvalidMinDistance(f32),
    /// The operating system refused to spawn a worker thread.
    WorkerSpawn(std::io::Error),
    /// Failed to read or write a configuration file.
    Io(std::io::Error),
    /// Failed to parse or serialize a configuration.
    Json(serde_json::Error),
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::ZeroCapacity => write!(f, "Particle pool capacity must be greater than zero"),
            SimulationError::ZeroThreads => write!(f, "Worker thread count must be greater than zero"),
            SimulationError::InvalidCellSize(size) => {
                write!(f, "Spatial grid cell size must be a positive finite number, got {}", size)
            }
            SimulationError::InvalidWorldSize => {
                write!(f, "Spatial grid world size must be positive and finite on both axes")
            }
            SimulationError::ZeroCellCapacity => write!(f, "Spatial grid cell capacity must be greater than zero"),
            SimulationError::InvalidInteractionRadius(radius) => {
                write!(f, "Repulsion radius must be a positive finite number, got {}", radius)
            }
            SimulationError::InvalidMinDistance(d) => {
                write!(f, "Minimum squared interaction distance must be finite and non-negative, got {}", d)
            }
            SimulationError::WorkerSpawn(e) => write!(f, "Failed to spawn worker thread: {}", e),
            SimulationError::Io(e) => write!(f, "Failed to access configuration file: {}", e),
            SimulationError::Json(e) => write!(f, "Invalid configuration JSON: {}", e),
        }
    }
}

impl std::error::Error for SimulationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimulationError::WorkerSpawn(e) => Some(e),
            SimulationError::Io(e) => Some(e),
            SimulationError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SimulationError {
    fn from(e: std::io::Error) -> Self {
        SimulationError::Io(e)
    }
}

impl From<serde_json::Error> for SimulationError {
    fn from(e: serde_json::Error) -> Self {
        SimulationError::Json(e)
    }
}
