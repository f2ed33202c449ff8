//! Initial conditions: expanding universe, spiral galaxy, galaxy collision
//!
//! Output is structure-of-arrays: positions, velocities, colors and sizes, all
//! indexed by particle. Size is a render attribute that also scales initial
//! speed and color brightness.

use glam::{Mat3, Vec3};
use rand::seq::SliceRandom;
use rand::Rng;
use std::f32::consts::{PI, TAU};

use crate::config::{SimulationConfig, SimulationType};
use crate::error::SimulationError;
use crate::orientation::{CollisionCourse, OrientationPair};
use crate::palette::ColorPalette;

/// Fraction of particles drawn from the large end of the size range
pub const LARGE_FRACTION: f64 = 0.001;

/// Large particles start this fraction of the size range above `min_size`
pub const SIZE_THRESHOLD_FRACTION: f32 = 0.01;

/// Evenly spaced spiral arms
pub const ARM_COUNT: u32 = 6;

const SPIRAL_TIGHTNESS: f32 = 2.5;
/// Angular scatter of a particle around its arm before decay
const ARM_SPREAD: f32 = PI / 6.0;
/// `rr = radius × U^0.8`, more centrally concentrated than a uniform-area disk
const RADIAL_EXPONENT: f32 = 0.8;
/// Inside this fraction of the radius the core spin boost applies
const CORE_FRACTION: f32 = 0.3;

/// Particle state as parallel arrays
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParticleBuffers {
    pub positions: Vec<Vec3>,
    pub velocities: Vec<Vec3>,
    pub colors: Vec<[f32; 4]>,
    pub sizes: Vec<f32>,
}

impl ParticleBuffers {
    /// Empty buffers with room for `count` particles. Fails instead of
    /// truncating when the memory cannot be reserved.
    pub fn allocate(count: usize) -> Result<Self, SimulationError> {
        let mut buffers = Self::default();
        let alloc_err = |source| SimulationError::Allocation {
            requested: count,
            source,
        };
        buffers.positions.try_reserve_exact(count).map_err(alloc_err)?;
        buffers.velocities.try_reserve_exact(count).map_err(alloc_err)?;
        buffers.colors.try_reserve_exact(count).map_err(alloc_err)?;
        buffers.sizes.try_reserve_exact(count).map_err(alloc_err)?;
        Ok(buffers)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Everything the generator needs, snapshotted from the configuration
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorParams {
    pub sim_type: SimulationType,
    pub count: usize,
    pub radius: f32,
    pub thickness: f32,
    pub initial_speed: f32,
    pub core_spin: f32,
    pub min_size: f32,
    pub max_size: f32,
    pub collision_velocity: f32,
    /// Disk rotations of the first and second collision galaxy
    pub rotations: [Mat3; 2],
    /// Whether the second collision galaxy co-rotates with the first
    pub same_direction: bool,
    pub random_colors: bool,
}

impl GeneratorParams {
    pub fn from_config(config: &SimulationConfig, orientation: Option<&OrientationPair>) -> Self {
        let orientation = orientation.copied().unwrap_or_default();
        Self {
            sim_type: config.sim_type,
            count: config.particle_count,
            radius: config.radius,
            thickness: config.thickness,
            initial_speed: config.initial_speed,
            core_spin: config.core_spin,
            min_size: config.min_size,
            max_size: config.max_size,
            collision_velocity: config.collision_velocity,
            rotations: [orientation.first, orientation.second],
            same_direction: orientation.same_direction,
            random_colors: config.random_colors,
        }
    }

    fn size_factor(&self, size: f32) -> f32 {
        if self.max_size <= 0.0 {
            return 1.0;
        }
        (size / self.max_size).max(0.0).sqrt()
    }
}

/// Generate a full particle set. `palette` is refreshed for this run and used
/// to color the particles.
pub fn generate(
    params: &GeneratorParams,
    palette: &mut ColorPalette,
    rng: &mut impl Rng,
) -> Result<ParticleBuffers, SimulationError> {
    let mut buffers = ParticleBuffers::allocate(params.count)?;
    generate_sizes(&mut buffers.sizes, params.count, params.min_size, params.max_size, rng);

    match params.sim_type {
        SimulationType::Universe => generate_universe(params, &mut buffers, rng),
        SimulationType::Galaxy => {
            let sizes = std::mem::take(&mut buffers.sizes);
            push_spiral_disk(params, &sizes, 1.0, &mut buffers, rng);
            buffers.sizes = sizes;
        }
        SimulationType::Collision => generate_collision(params, &mut buffers, rng),
    }

    palette.refresh(params.random_colors, rng);
    buffers.colors.resize(params.count, [0.0; 4]);
    palette.apply(
        params.sim_type,
        &buffers.velocities,
        &buffers.sizes,
        (params.min_size, params.max_size),
        &mut buffers.colors,
    );

    log::debug!(
        "Generated {} particles for {} (radius {}, speed {})",
        buffers.len(),
        params.sim_type.name(),
        params.radius,
        params.initial_speed
    );

    Ok(buffers)
}

/// Size at which a particle counts as large: `min + 1%` of the range
pub fn size_threshold(min_size: f32, max_size: f32) -> f32 {
    min_size + (max_size - min_size) * SIZE_THRESHOLD_FRACTION
}

/// `max(1, floor(count × 0.001))`, never more than `count`
pub fn large_particle_count(count: usize) -> usize {
    (((count as f64) * LARGE_FRACTION).floor() as usize)
        .max(1)
        .min(count)
}

/// Fill `sizes` with `count` shuffled sizes: regular particles skewed toward
/// `min_size`, a handful of large ones skewed toward `max_size`. Writes into
/// the caller's (already reserved) buffer.
pub fn generate_sizes(
    sizes: &mut Vec<f32>,
    count: usize,
    min_size: f32,
    max_size: f32,
    rng: &mut impl Rng,
) {
    let threshold = size_threshold(min_size, max_size);
    let large = large_particle_count(count);

    sizes.clear();
    for _ in 0..count - large {
        let u: f32 = rng.gen();
        sizes.push(min_size + (threshold - min_size) * u * u);
    }
    for _ in 0..large {
        let u: f32 = rng.gen();
        sizes.push(threshold + (max_size - threshold) * u.powf(0.33));
    }

    sizes.shuffle(rng);
}

/// Uniform ball with radial outward velocities
fn generate_universe(params: &GeneratorParams, buffers: &mut ParticleBuffers, rng: &mut impl Rng) {
    for &size in &buffers.sizes {
        let u: f32 = rng.gen();
        let r = params.radius * u.cbrt();
        let theta = rng.gen_range(0.0..TAU);
        let cos_phi: f32 = rng.gen_range(-1.0..=1.0);
        let sin_phi = (1.0 - cos_phi * cos_phi).max(0.0).sqrt();
        let direction = Vec3::new(sin_phi * theta.cos(), cos_phi, sin_phi * theta.sin());

        buffers.positions.push(direction * r);
        buffers
            .velocities
            .push(direction * (params.initial_speed * params.size_factor(size)));
    }
}

/// Append one spiral disk in the XZ plane, centered on the origin, rotating
/// about +Y (`tangent_sign` of -1 reverses it). Uses one entry of `sizes` per
/// particle.
fn push_spiral_disk(
    params: &GeneratorParams,
    sizes: &[f32],
    tangent_sign: f32,
    buffers: &mut ParticleBuffers,
    rng: &mut impl Rng,
) {
    let radius = params.radius.max(f32::EPSILON);
    let core = radius * CORE_FRACTION;

    for &size in sizes {
        let arm = rng.gen_range(0..ARM_COUNT);
        let arm_offset = arm as f32 * TAU / ARM_COUNT as f32;
        let rr = radius * rng.gen::<f32>().powf(RADIAL_EXPONENT);

        // Scatter is wide in the core and tight in the arms
        let base = rr.powf(0.15) * SPIRAL_TIGHTNESS * 0.4;
        let decay = 0.15 + 0.85 * (-3.0 * rr / radius).exp();
        let noise = rng.gen_range(-1.0f32..=1.0) * ARM_SPREAD;
        let angle = base + arm_offset + noise * decay;

        let height =
            params.thickness * 0.5 * rng.gen_range(-1.0f32..=1.0) * (-rr / radius).exp();
        let radial = Vec3::new(angle.cos(), 0.0, angle.sin());

        let mut speed = params.initial_speed * (rr / radius).sqrt() * params.size_factor(size);
        if rr < core {
            speed += params.core_spin * (core - rr) / core;
        }
        let tangent = Vec3::Y.cross(radial) * tangent_sign;

        buffers.positions.push(radial * rr + Vec3::Y * height);
        buffers.velocities.push(tangent * speed);
    }
}

/// Two disks, split evenly, each recentred, rotated and sent toward the other
fn generate_collision(params: &GeneratorParams, buffers: &mut ParticleBuffers, rng: &mut impl Rng) {
    let half = params.count / 2;
    let course = CollisionCourse::new(params.radius, params.initial_speed, params.collision_velocity);
    let sizes = std::mem::take(&mut buffers.sizes);

    for (galaxy, range) in [(0, 0..half), (1, half..params.count)] {
        let start = range.start;
        let tangent_sign = if galaxy == 1 && !params.same_direction {
            -1.0
        } else {
            1.0
        };
        push_spiral_disk(params, &sizes[range], tangent_sign, buffers, rng);

        let positions = &mut buffers.positions[start..];
        let velocities = &mut buffers.velocities[start..];
        if positions.is_empty() {
            continue;
        }

        let centroid = positions.iter().copied().sum::<Vec3>() / positions.len() as f32;
        let rotation = params.rotations[galaxy];
        for (position, velocity) in positions.iter_mut().zip(velocities.iter_mut()) {
            *position = rotation * (*position - centroid) + course.centers[galaxy];
            *velocity = rotation * *velocity + course.velocities[galaxy];
        }
    }

    buffers.sizes = sizes;
}
