//! Per-frame parameter block shared by the black hole step and the integrator
//!
//! Layout matches the `Params` uniform in `shaders/integrate.wgsl`: fields in
//! declaration order, 16-byte aligned, padding spelled out.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::config::SimulationConfig;

/// One black hole as the integrator sees it
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct BlackHoleParams {
    pub position: [f32; 3],
    pub mass: f32,
    pub spin: f32,
    pub accretion_radius: f32,
    /// Nonzero when the hole acts on particles
    pub enabled: u32,
    pub _padding: f32,
}

impl BlackHoleParams {
    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled != 0
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct SimulationParameters {
    pub delta_time: f32,
    pub gravitational_constant: f32,
    pub smoothing_length: f32,
    pub particle_count: u32,
    /// Always at least 1
    pub interaction_stride: u32,
    // Render passthrough
    pub bloom: f32,
    pub color_mix: f32,
    pub opacity: f32,
    pub black_holes: [BlackHoleParams; 2],
}

const _: () = assert!(std::mem::size_of::<BlackHoleParams>() == 32);
const _: () = assert!(std::mem::size_of::<SimulationParameters>() == 96);
const _: () = assert!(std::mem::size_of::<SimulationParameters>() % 16 == 0);

impl Default for SimulationParameters {
    fn default() -> Self {
        Self::zeroed().with_stride(1)
    }
}

impl SimulationParameters {
    /// Scalar fields from `config`. Black hole entries are left for the
    /// black hole step to publish.
    pub fn from_config(config: &SimulationConfig) -> Self {
        let mut params = Self::default();
        params.apply_config(config);
        params
    }

    /// Refresh the scalar fields from `config`, keeping black hole entries.
    pub fn apply_config(&mut self, config: &SimulationConfig) {
        self.delta_time = config.delta_time;
        self.gravitational_constant = config.gravitational_constant;
        self.smoothing_length = config.smoothing_length;
        self.particle_count = u32::try_from(config.particle_count).unwrap_or(u32::MAX);
        self.interaction_stride = config.interaction_stride().max(1);
        self.bloom = config.bloom;
        self.color_mix = config.color_mix;
        self.opacity = config.opacity;
    }

    pub fn with_stride(mut self, stride: u32) -> Self {
        self.interaction_stride = stride.max(1);
        self
    }

    pub fn softening_squared(&self) -> f32 {
        self.smoothing_length * self.smoothing_length
    }
}
