//! Inbound configuration for the simulation core
//!
//! Values here are written by an outside collaborator (a control panel, a preset
//! file, a test) at any time. The orchestrator snapshots them: structural fields
//! at reset, runtime fields at the start of every running tick.

use serde::{Deserialize, Serialize};

/// What kind of initial conditions to generate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulationType {
    /// Expanding sphere of particles
    Universe,
    /// Single rotating spiral galaxy
    #[default]
    Galaxy,
    /// Two spiral galaxies on a collision course
    Collision,
}

impl SimulationType {
    pub fn name(&self) -> &'static str {
        match self {
            SimulationType::Universe => "universe",
            SimulationType::Galaxy => "galaxy",
            SimulationType::Collision => "collision",
        }
    }

    /// Parse a mode name; unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "universe" => Some(SimulationType::Universe),
            "galaxy" => Some(SimulationType::Galaxy),
            "collision" => Some(SimulationType::Collision),
            _ => None,
        }
    }
}

/// Per black hole settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlackHoleConfig {
    pub enabled: bool,
    pub mass: f32,
    /// Signed, the sign picks the rotation direction
    pub spin: f32,
    pub accretion_radius: f32,
}

impl BlackHoleConfig {
    pub fn new(mass: f32, spin: f32) -> Self {
        Self {
            enabled: true,
            mass,
            spin,
            accretion_radius: 40.0,
        }
    }
}

/// Complete configuration snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    // Structural: applied on reset
    pub sim_type: SimulationType,
    pub particle_count: usize,
    pub radius: f32,
    pub thickness: f32,
    pub initial_speed: f32,
    pub core_spin: f32,
    pub collision_velocity: f32,
    pub min_size: f32,
    pub max_size: f32,
    pub random_colors: bool,

    // Runtime: applied every tick
    pub delta_time: f32,
    pub gravitational_constant: f32,
    pub smoothing_length: f32,
    /// Fraction of particles each particle interacts with, 0..=1
    pub interaction_rate: f32,
    pub black_holes: [BlackHoleConfig; 2],
    /// Scales the mutual gravity between the two black holes
    pub black_hole_gravity: f32,

    // Render passthrough, never read by the physics
    pub opacity: f32,
    pub bloom: f32,
    pub color_mix: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            sim_type: SimulationType::Galaxy,
            particle_count: 20_000,
            radius: 5000.0,
            thickness: 50.0,
            initial_speed: 2.0,
            core_spin: 1.0,
            collision_velocity: 1.0,
            min_size: 2.0,
            max_size: 60.0,
            random_colors: false,
            delta_time: 0.1,
            gravitational_constant: common::constants::G,
            smoothing_length: 10.0,
            interaction_rate: 0.01,
            black_holes: [
                BlackHoleConfig::new(50_000.0, 1.0),
                BlackHoleConfig::new(50_000.0, 1.0),
            ],
            black_hole_gravity: 1.0,
            opacity: 0.8,
            bloom: 0.5,
            color_mix: 0.5,
        }
    }
}

impl SimulationConfig {
    pub fn new(sim_type: SimulationType) -> Self {
        Self {
            sim_type,
            ..Default::default()
        }
    }

    pub fn with_particle_count(mut self, count: usize) -> Self {
        self.particle_count = count;
        self
    }

    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_thickness(mut self, thickness: f32) -> Self {
        self.thickness = thickness;
        self
    }

    pub fn with_initial_speed(mut self, speed: f32) -> Self {
        self.initial_speed = speed;
        self
    }

    pub fn with_core_spin(mut self, core_spin: f32) -> Self {
        self.core_spin = core_spin;
        self
    }

    pub fn with_sizes(mut self, min_size: f32, max_size: f32) -> Self {
        self.min_size = min_size;
        self.max_size = max_size;
        self
    }

    pub fn with_interaction_rate(mut self, rate: f32) -> Self {
        self.interaction_rate = rate;
        self
    }

    pub fn with_gravitational_constant(mut self, g: f32) -> Self {
        self.gravitational_constant = g;
        self
    }

    pub fn with_delta_time(mut self, dt: f32) -> Self {
        self.delta_time = dt;
        self
    }

    pub fn with_black_holes_enabled(mut self, enabled: bool) -> Self {
        for hole in &mut self.black_holes {
            hole.enabled = enabled;
        }
        self
    }

    /// Stride between sampled particles in the pairwise force sum.
    pub fn interaction_stride(&self) -> u32 {
        interaction_stride(self.interaction_rate)
    }

    /// Copy of this configuration with out-of-range values clamped.
    pub fn sanitized(&self) -> Self {
        let mut cfg = self.clone();

        if cfg.particle_count == 0 {
            log::warn!("particle_count must be at least 1, using 1");
            cfg.particle_count = 1;
        }
        if !(cfg.radius > MIN_LENGTH) {
            log::warn!("radius {} too small, using {}", cfg.radius, MIN_LENGTH);
            cfg.radius = MIN_LENGTH;
        }
        if !(cfg.smoothing_length > MIN_LENGTH) {
            log::warn!(
                "smoothing_length {} too small, using {}",
                cfg.smoothing_length,
                MIN_LENGTH
            );
            cfg.smoothing_length = MIN_LENGTH;
        }
        if !(0.0..=1.0).contains(&cfg.interaction_rate) {
            let clamped = if cfg.interaction_rate > 1.0 { 1.0 } else { 0.0 };
            log::warn!(
                "interaction_rate {} outside 0..=1, using {}",
                cfg.interaction_rate,
                clamped
            );
            cfg.interaction_rate = clamped;
        }
        if !(cfg.max_size > 0.0) {
            log::warn!("max_size {} must be positive, using 1", cfg.max_size);
            cfg.max_size = 1.0;
        }
        if !(cfg.min_size >= 0.0) || cfg.min_size > cfg.max_size {
            let clamped = cfg.min_size.clamp(0.0, cfg.max_size);
            let clamped = if clamped.is_nan() { 0.0 } else { clamped };
            log::warn!("min_size {} outside 0..=max_size, using {}", cfg.min_size, clamped);
            cfg.min_size = clamped;
        }
        cfg.thickness = cfg.thickness.max(0.0);
        for (i, hole) in cfg.black_holes.iter_mut().enumerate() {
            if hole.mass < 0.0 || hole.accretion_radius < 0.0 {
                log::warn!("black hole {} has negative mass or accretion radius, clamping", i);
                hole.mass = hole.mass.max(0.0);
                hole.accretion_radius = hole.accretion_radius.max(0.0);
            }
        }

        cfg
    }

    /// Overwrite only the fields that take effect on a running tick.
    pub fn apply_runtime(&mut self, other: &SimulationConfig) {
        self.delta_time = other.delta_time;
        self.gravitational_constant = other.gravitational_constant;
        self.smoothing_length = other.smoothing_length;
        self.interaction_rate = other.interaction_rate;
        self.black_holes = other.black_holes;
        self.black_hole_gravity = other.black_hole_gravity;
        self.opacity = other.opacity;
        self.bloom = other.bloom;
        self.color_mix = other.color_mix;
    }
}

/// Smallest radius or smoothing length accepted after sanitizing
const MIN_LENGTH: f32 = 1e-3;

/// Map an interaction rate in 0..=1 to a stride: `floor(1 / rate)`, at least 1.
///
/// A rate of zero (or below) disables pairwise sampling beyond the first particle.
pub fn interaction_stride(rate: f32) -> u32 {
    if !(rate > 0.0) {
        return u32::MAX;
    }
    // float-to-int casts saturate
    ((1.0 / rate).floor() as u32).max(1)
}
