//! Per-particle force integration
//!
//! Every particle reads the same input position snapshot and the same black
//! hole state, and writes only its own output slot. Velocities are updated in
//! place; each lane touches only its own entry.
//!
//! Integration is explicit Euler (`v += a·dt; x += v·dt`). It drifts in energy
//! over long runs. That is a known limitation, not something the integrator
//! corrects for.

use glam::Vec3;

use crate::black_hole::spin_acceleration;
use crate::error::SimulationError;
use crate::params::{BlackHoleParams, SimulationParameters};

pub mod cpu;
pub mod gpu;

pub use cpu::CpuIntegrator;
pub use gpu::GpuIntegrator;

/// Outward push per unit of penetration inside an accretion radius
pub const ACCRETION_REPULSION: f32 = 10.0;

/// A backend that advances every particle by one step
pub trait ForceIntegrator {
    /// Short backend name for logging
    fn name(&self) -> &'static str;

    /// Read `positions_in`, write `positions_out`, update `velocities` in place.
    ///
    /// All three slices must have the same length.
    fn step(
        &mut self,
        params: &SimulationParameters,
        positions_in: &[Vec3],
        positions_out: &mut [Vec3],
        velocities: &mut [Vec3],
    ) -> Result<(), SimulationError>;
}

impl<T: ForceIntegrator + ?Sized> ForceIntegrator for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn step(
        &mut self,
        params: &SimulationParameters,
        positions_in: &[Vec3],
        positions_out: &mut [Vec3],
        velocities: &mut [Vec3],
    ) -> Result<(), SimulationError> {
        (**self).step(params, positions_in, positions_out, velocities)
    }
}

/// Error unless the output and velocity slices match the input length.
pub fn check_lengths(
    positions_in: &[Vec3],
    positions_out: &[Vec3],
    velocities: &[Vec3],
) -> Result<(), SimulationError> {
    let expected = positions_in.len();
    for actual in [positions_out.len(), velocities.len()] {
        if actual != expected {
            return Err(SimulationError::BufferLength { expected, actual });
        }
    }
    Ok(())
}

/// Softened gravity from every `interaction_stride`-th particle, skipping `index`.
///
/// Particles have unit mass: `G·d / (|d|² + ε²)^1.5`.
pub fn pairwise_acceleration(index: usize, positions: &[Vec3], params: &SimulationParameters) -> Vec3 {
    let position = positions[index];
    let g = params.gravitational_constant;
    let softening_sq = params.softening_squared();
    let stride = params.interaction_stride.max(1) as usize;

    positions
        .iter()
        .enumerate()
        .step_by(stride)
        .filter(|(j, _)| *j != index)
        .fold(Vec3::ZERO, |accel, (_, other)| {
            let offset = *other - position;
            let inv = (offset.length_squared() + softening_sq).sqrt().recip();
            accel + offset * (g * inv * inv * inv)
        })
}

/// Acceleration from one black hole on a particle at `position`.
///
/// Inside the accretion radius the hole pushes the particle outward, linearly
/// in penetration depth, instead of attracting it. A particle exactly at the
/// center is pushed along +Y. Outside, softened gravity scaled by the hole's
/// mass plus the frame-dragging term.
pub fn black_hole_acceleration(
    position: Vec3,
    hole: &BlackHoleParams,
    g: f32,
    softening_sq: f32,
) -> Vec3 {
    let offset = hole.position() - position;
    let dist_sq = offset.length_squared();
    let dist = dist_sq.sqrt();

    if dist < hole.accretion_radius {
        let away = if dist > 1e-6 { -offset / dist } else { Vec3::Y };
        return away * ((hole.accretion_radius - dist) * ACCRETION_REPULSION);
    }

    let softened = dist_sq + softening_sq;
    let inv = softened.sqrt().recip();
    offset * (g * hole.mass * inv * inv * inv) + spin_acceleration(hole.spin, -offset, softened)
}

/// Total acceleration on particle `index`
pub fn particle_acceleration(index: usize, positions: &[Vec3], params: &SimulationParameters) -> Vec3 {
    let position = positions[index];
    let softening_sq = params.softening_squared();

    params
        .black_holes
        .iter()
        .filter(|hole| hole.is_enabled())
        .fold(pairwise_acceleration(index, positions, params), |accel, hole| {
            accel
                + black_hole_acceleration(
                    position,
                    hole,
                    params.gravitational_constant,
                    softening_sq,
                )
        })
}

/// One explicit Euler step; returns `(position, velocity)`.
#[inline]
pub fn euler_step(position: Vec3, velocity: Vec3, acceleration: Vec3, dt: f32) -> (Vec3, Vec3) {
    let velocity = velocity + acceleration * dt;
    (position + velocity * dt, velocity)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hole_at(position: Vec3, mass: f32, accretion_radius: f32) -> BlackHoleParams {
        BlackHoleParams {
            position: position.to_array(),
            mass,
            spin: 0.0,
            accretion_radius,
            enabled: 1,
            _padding: 0.0,
        }
    }

    #[test]
    fn test_pairwise_is_symmetric() {
        let positions = [Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)];
        let params = SimulationParameters {
            gravitational_constant: 2.0,
            smoothing_length: 1.0,
            ..Default::default()
        };
        let a0 = pairwise_acceleration(0, &positions, &params);
        let a1 = pairwise_acceleration(1, &positions, &params);
        assert!(a0.x > 0.0);
        assert!((a0 + a1).length() < 1e-7);
        // 2 × 10 / 101^1.5
        assert!((a0.x - 20.0 / 101f32.powf(1.5)).abs() < 1e-6);
    }

    #[test]
    fn test_stride_skips_particles() {
        let positions: Vec<Vec3> = (0..4).map(|i| Vec3::new(i as f32 * 10.0, 0.0, 0.0)).collect();
        let params = SimulationParameters {
            gravitational_constant: 1.0,
            smoothing_length: 1.0,
            ..Default::default()
        }
        .with_stride(2);
        // Particle 1 samples 0 and 2, which cancel
        assert!(pairwise_acceleration(1, &positions, &params).length() < 1e-7);
        // Particle 3 samples 0 and 2 only
        let expected = Vec3::new(-30.0, 0.0, 0.0) / 901f32.powf(1.5)
            + Vec3::new(-10.0, 0.0, 0.0) / 101f32.powf(1.5);
        assert!((pairwise_acceleration(3, &positions, &params) - expected).length() < 1e-6);
    }

    #[test]
    fn test_coincident_particles_are_finite() {
        let positions = [Vec3::ONE, Vec3::ONE];
        let params = SimulationParameters {
            gravitational_constant: 1.0,
            smoothing_length: 0.5,
            ..Default::default()
        };
        let accel = particle_acceleration(0, &positions, &params);
        assert!(accel.is_finite());
        assert_eq!(accel, Vec3::ZERO);
    }

    #[test]
    fn test_accretion_repels_at_center() {
        let hole = hole_at(Vec3::new(5.0, 5.0, 5.0), 1000.0, 20.0);
        let accel = black_hole_acceleration(Vec3::new(5.0, 5.0, 5.0), &hole, 1.0, 1.0);
        assert!(accel.length() > 0.0);
        assert!((accel.length() - 200.0).abs() < 1e-4);
    }

    #[test]
    fn test_accretion_repels_inside_radius() {
        let hole = hole_at(Vec3::ZERO, 1000.0, 20.0);
        let position = Vec3::new(5.0, 0.0, 0.0);
        let accel = black_hole_acceleration(position, &hole, 1.0, 1.0);
        assert!(accel.x > 0.0);
        assert!((accel.x - 150.0).abs() < 1e-3);
    }

    #[test]
    fn test_black_hole_attracts_outside_radius() {
        let hole = hole_at(Vec3::ZERO, 1000.0, 20.0);
        let position = Vec3::new(100.0, 0.0, 0.0);
        let accel = black_hole_acceleration(position, &hole, 1.0, 0.0);
        assert!(accel.x < 0.0);
        assert!((accel.x + 0.1).abs() < 1e-5);
    }

    #[test]
    fn test_spinning_hole_adds_tangential_push() {
        let mut hole = hole_at(Vec3::ZERO, 0.0, 0.0);
        hole.spin = 1.0;
        let position = Vec3::new(100.0, 0.0, 0.0);
        let accel = black_hole_acceleration(position, &hole, 1.0, 0.0);
        assert!(accel.x.abs() < 1e-6);
        assert!((accel.z.abs() - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_disabled_holes_are_ignored() {
        let mut params = SimulationParameters {
            gravitational_constant: 1.0,
            smoothing_length: 1.0,
            ..Default::default()
        };
        params.black_holes[0] = hole_at(Vec3::new(50.0, 0.0, 0.0), 1e6, 0.0);
        params.black_holes[0].enabled = 0;
        let positions = [Vec3::ZERO];
        assert_eq!(particle_acceleration(0, &positions, &params), Vec3::ZERO);
    }

    #[test]
    fn test_euler_step() {
        let (position, velocity) =
            euler_step(Vec3::ZERO, Vec3::X, Vec3::new(0.0, 2.0, 0.0), 0.5);
        assert_eq!(velocity, Vec3::new(1.0, 1.0, 0.0));
        assert_eq!(position, Vec3::new(0.5, 0.5, 0.0));
    }

    #[test]
    fn test_check_lengths() {
        let a = [Vec3::ZERO; 3];
        let b = [Vec3::ZERO; 2];
        assert!(check_lengths(&a, &a, &a).is_ok());
        assert!(matches!(
            check_lengths(&a, &b, &a),
            Err(SimulationError::BufferLength {
                expected: 3,
                actual: 2
            })
        ));
    }
}
