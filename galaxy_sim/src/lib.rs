//! N-body galaxy simulation core
//!
//! Three scenarios share one pipeline:
//! - Universe: a uniform sphere expanding outward
//! - Galaxy: a six-armed spiral disk around a central black hole
//! - Collision: two spiral galaxies on a closing course, each with its own black hole
//!
//! Each frame the black holes advance first, then every particle integrates
//! softened gravity from a strided sample of the others plus the black holes.
//! Rendering is left to the caller; the core exposes positions, velocities,
//! colors and sizes as parallel arrays.

pub mod black_hole;
pub mod config;
pub mod error;
pub mod generator;
pub mod integrator;
pub mod orientation;
pub mod palette;
pub mod params;
pub mod rotation;
pub mod simulation;

pub use black_hole::{BlackHole, BlackHoleDynamics};
pub use config::{BlackHoleConfig, SimulationConfig, SimulationType};
pub use error::SimulationError;
pub use generator::{generate, GeneratorParams, ParticleBuffers};
pub use integrator::{CpuIntegrator, ForceIntegrator, GpuIntegrator};
pub use orientation::{GalaxyOrientation, OrientationPair, OrientationSequencer};
pub use palette::{ColorPalette, Gradient};
pub use params::{BlackHoleParams, SimulationParameters};
pub use simulation::{RunState, Simulation, SimulationStats};
