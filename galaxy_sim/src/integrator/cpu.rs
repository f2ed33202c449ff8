//! CPU backend, data-parallel over particles with rayon

use glam::Vec3;
use rayon::iter::{IndexedParallelIterator, IntoParallelRefMutIterator, ParallelIterator};

use super::{check_lengths, euler_step, particle_acceleration, ForceIntegrator};
use crate::error::SimulationError;
use crate::params::SimulationParameters;

/// Integrator running on the CPU, in parallel with
/// [rayon](https://github.com/rayon-rs/rayon) unless built with [`CpuIntegrator::sequential`].
#[derive(Debug, Clone, Copy)]
pub struct CpuIntegrator {
    parallel: bool,
}

impl Default for CpuIntegrator {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuIntegrator {
    /// Data-parallel over particles on the rayon global pool.
    pub fn new() -> Self {
        Self { parallel: true }
    }

    /// Single-threaded, same results as the parallel variant.
    pub fn sequential() -> Self {
        Self { parallel: false }
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }
}

impl ForceIntegrator for CpuIntegrator {
    fn name(&self) -> &'static str {
        if self.parallel {
            "cpu-parallel"
        } else {
            "cpu-sequential"
        }
    }

    fn step(
        &mut self,
        params: &SimulationParameters,
        positions_in: &[Vec3],
        positions_out: &mut [Vec3],
        velocities: &mut [Vec3],
    ) -> Result<(), SimulationError> {
        check_lengths(positions_in, positions_out, velocities)?;
        let dt = params.delta_time;

        let update = |index: usize, position_out: &mut Vec3, velocity: &mut Vec3| {
            let acceleration = particle_acceleration(index, positions_in, params);
            let (position, new_velocity) =
                euler_step(positions_in[index], *velocity, acceleration, dt);
            *position_out = position;
            *velocity = new_velocity;
        };

        if self.parallel {
            positions_out
                .par_iter_mut()
                .zip(velocities.par_iter_mut())
                .enumerate()
                .for_each(|(index, (position_out, velocity))| update(index, position_out, velocity));
        } else {
            positions_out
                .iter_mut()
                .zip(velocities.iter_mut())
                .enumerate()
                .for_each(|(index, (position_out, velocity))| update(index, position_out, velocity));
        }

        Ok(())
    }
}
