//! Error types for the simulation core.
//!
//! Numeric degeneracies are never errors; they are damped by softening. What
//! remains is resource exhaustion, mismatched buffers and GPU failures.

use std::collections::TryReserveError;
use std::fmt;

use common::GpuError;

/// Errors that can occur while generating or stepping a simulation.
#[derive(Debug)]
pub enum SimulationError {
    /// Particle buffers for the requested count could not be allocated.
    Allocation {
        requested: usize,
        source: TryReserveError,
    },
    /// An integrator was handed buffers whose lengths disagree.
    BufferLength { expected: usize, actual: usize },
    /// GPU backend failure.
    Gpu(GpuError),
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::Allocation { requested, source } => write!(
                f,
                "Failed to allocate particle buffers for {} particles: {}",
                requested, source
            ),
            SimulationError::BufferLength { expected, actual } => write!(
                f,
                "Particle buffer length mismatch: expected {}, got {}",
                expected, actual
            ),
            SimulationError::Gpu(e) => write!(f, "GPU error: {}", e),
        }
    }
}

impl std::error::Error for SimulationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimulationError::Allocation { source, .. } => Some(source),
            SimulationError::Gpu(e) => Some(e),
            SimulationError::BufferLength { .. } => None,
        }
    }
}

impl From<GpuError> for SimulationError {
    fn from(e: GpuError) -> Self {
        SimulationError::Gpu(e)
    }
}
