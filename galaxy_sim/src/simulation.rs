//! Frame loop: black hole step, particle integration, buffer swap

use glam::Vec3;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::black_hole::BlackHoleDynamics;
use crate::config::SimulationConfig;
use crate::error::SimulationError;
use crate::generator::{self, GeneratorParams};
use crate::integrator::ForceIntegrator;
use crate::orientation::OrientationSequencer;
use crate::palette::ColorPalette;
use crate::params::SimulationParameters;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Stopped,
    Running,
}

/// Snapshot of aggregate quantities for logging
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationStats {
    pub frame: u64,
    /// Simulated time since the last reset
    pub elapsed: f32,
    /// Mean particle position
    pub center_of_mass: Vec3,
    /// Sum of `½|v|²` over all particles
    pub kinetic_energy: f32,
    /// Present only while both black holes are active
    pub black_hole_separation: Option<f32>,
}

/// The simulation core.
///
/// Owns two position buffers and flips between them every tick: the
/// integrator reads the current one and writes the other, so no particle
/// observes another particle's update from the same frame.
pub struct Simulation {
    /// Values collaborators may edit at any time
    pending: SimulationConfig,
    pending_dirty: bool,
    /// Values the running simulation uses
    config: SimulationConfig,
    integrator: Box<dyn ForceIntegrator>,

    positions: [Vec<Vec3>; 2],
    /// When set, the second position buffer is current
    flip: bool,
    velocities: Vec<Vec3>,
    colors: Vec<[f32; 4]>,
    sizes: Vec<f32>,

    black_holes: BlackHoleDynamics,
    params: SimulationParameters,
    sequencer: OrientationSequencer,
    palette: ColorPalette,
    rng: StdRng,

    state: RunState,
    frame: u64,
    elapsed: f32,
}

impl Simulation {
    /// Build and generate an initial (stopped) state, seeding from entropy.
    pub fn new(
        config: SimulationConfig,
        integrator: Box<dyn ForceIntegrator>,
    ) -> Result<Self, SimulationError> {
        Self::with_rng(config, integrator, StdRng::from_entropy())
    }

    /// Same as [`Simulation::new`] with a fixed seed, for reproducible runs.
    pub fn with_seed(
        config: SimulationConfig,
        integrator: Box<dyn ForceIntegrator>,
        seed: u64,
    ) -> Result<Self, SimulationError> {
        Self::with_rng(config, integrator, StdRng::seed_from_u64(seed))
    }

    fn with_rng(
        config: SimulationConfig,
        integrator: Box<dyn ForceIntegrator>,
        rng: StdRng,
    ) -> Result<Self, SimulationError> {
        let config = config.sanitized();
        let mut sim = Self {
            black_holes: BlackHoleDynamics::new(&config),
            params: SimulationParameters::from_config(&config),
            pending: config.clone(),
            pending_dirty: false,
            config,
            integrator,
            positions: [Vec::new(), Vec::new()],
            flip: false,
            velocities: Vec::new(),
            colors: Vec::new(),
            sizes: Vec::new(),
            sequencer: OrientationSequencer::new(),
            palette: ColorPalette::default(),
            rng,
            state: RunState::Stopped,
            frame: 0,
            elapsed: 0.0,
        };
        log::info!("Simulation using {} integrator", sim.integrator.name());
        sim.reset(false)?;
        Ok(sim)
    }

    pub fn start(&mut self) {
        self.state = RunState::Running;
    }

    pub fn pause(&mut self) {
        self.state = RunState::Stopped;
    }

    pub fn toggle(&mut self) {
        self.state = match self.state {
            RunState::Running => RunState::Stopped,
            RunState::Stopped => RunState::Running,
        };
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == RunState::Running
    }

    /// Swap the force backend. Particle state is kept.
    pub fn set_integrator(&mut self, integrator: Box<dyn ForceIntegrator>) {
        log::info!(
            "Switching integrator from {} to {}",
            self.integrator.name(),
            integrator.name()
        );
        self.integrator = integrator;
    }

    pub fn integrator_name(&self) -> &'static str {
        self.integrator.name()
    }

    /// Regenerate particles and black holes from the pending configuration,
    /// then enter `Running` if `run` is set, `Stopped` otherwise.
    ///
    /// On failure nothing changes: particles, black holes, the orientation
    /// sequence and the random source are all left as they were.
    pub fn reset(&mut self, run: bool) -> Result<(), SimulationError> {
        let config = self.pending.sanitized();
        let mut rng = self.rng.clone();
        let mut sequencer = self.sequencer.clone();
        let mut palette = self.palette;

        let mut black_holes = self.black_holes.clone();
        let orientation = black_holes.initialize(&config, &mut sequencer, &mut rng);
        let gen_params = GeneratorParams::from_config(&config, orientation.as_ref());
        let buffers = generator::generate(&gen_params, &mut palette, &mut rng)?;
        let back = try_clone(&buffers.positions)?;

        let mut params = SimulationParameters::from_config(&config);
        black_holes.publish(&mut params);

        self.positions = [buffers.positions, back];
        self.flip = false;
        self.velocities = buffers.velocities;
        self.colors = buffers.colors;
        self.sizes = buffers.sizes;
        self.black_holes = black_holes;
        self.params = params;
        self.config = config;
        self.pending_dirty = false;
        self.rng = rng;
        self.sequencer = sequencer;
        self.palette = palette;
        self.frame = 0;
        self.elapsed = 0.0;
        self.state = if run { RunState::Running } else { RunState::Stopped };

        log::info!(
            "Reset {} simulation: {} particles, radius {}{}",
            self.config.sim_type.name(),
            self.positions[0].len(),
            self.config.radius,
            orientation
                .map(|pair| format!(", {} orientation", pair.orientation.name()))
                .unwrap_or_default()
        );
        Ok(())
    }

    /// Advance one frame. Returns `Ok(false)` without touching anything while
    /// stopped.
    ///
    /// Black hole state and runtime settings are committed only once the
    /// integrator step succeeds; on error the frame is left as it was.
    pub fn tick(&mut self) -> Result<bool, SimulationError> {
        if self.state == RunState::Stopped {
            return Ok(false);
        }

        let mut config = self.config.clone();
        let mut params = self.params;
        let mut black_holes = self.black_holes.clone();
        if self.pending_dirty {
            config.apply_runtime(&self.pending.sanitized());
            params.apply_config(&config);
            black_holes.apply_settings(&config);
        }

        let dt = config.delta_time;
        black_holes.advance(dt, config.gravitational_constant);
        black_holes.publish(&mut params);

        // Only the back buffer is written, so the current snapshot survives a failed step
        let [first, second] = &mut self.positions;
        let (input, output) = if self.flip { (second, first) } else { (first, second) };
        self.integrator.step(&params, input, output, &mut self.velocities)?;

        self.flip = !self.flip;
        self.config = config;
        self.params = params;
        self.black_holes = black_holes;
        self.pending_dirty = false;
        self.frame += 1;
        self.elapsed += dt;
        log::trace!("Frame {} done", self.frame);
        Ok(true)
    }

    /// Recompute colors from current velocities with the active palette.
    pub fn recolor(&mut self) {
        self.palette.apply(
            self.config.sim_type,
            &self.velocities,
            &self.sizes,
            (self.config.min_size, self.config.max_size),
            &mut self.colors,
        );
    }

    /// Editable configuration. Runtime fields take effect on the next running
    /// tick, structural fields on the next reset.
    pub fn pending_config_mut(&mut self) -> &mut SimulationConfig {
        self.pending_dirty = true;
        &mut self.pending
    }

    pub fn pending_config(&self) -> &SimulationConfig {
        &self.pending
    }

    /// Configuration in effect
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Positions after the most recent tick
    pub fn positions(&self) -> &[Vec3] {
        &self.positions[usize::from(self.flip)]
    }

    pub fn velocities(&self) -> &[Vec3] {
        &self.velocities
    }

    pub fn colors(&self) -> &[[f32; 4]] {
        &self.colors
    }

    pub fn sizes(&self) -> &[f32] {
        &self.sizes
    }

    pub fn parameters(&self) -> &SimulationParameters {
        &self.params
    }

    pub fn black_holes(&self) -> &BlackHoleDynamics {
        &self.black_holes
    }

    pub fn palette(&self) -> &ColorPalette {
        &self.palette
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn particle_count(&self) -> usize {
        self.velocities.len()
    }

    pub fn stats(&self) -> SimulationStats {
        let positions = self.positions();
        let center_of_mass = if positions.is_empty() {
            Vec3::ZERO
        } else {
            positions.iter().copied().sum::<Vec3>() / positions.len() as f32
        };
        let kinetic_energy = self
            .velocities
            .iter()
            .map(|v| 0.5 * v.length_squared())
            .sum();

        SimulationStats {
            frame: self.frame,
            elapsed: self.elapsed,
            center_of_mass,
            kinetic_energy,
            black_hole_separation: self.black_holes.separation(),
        }
    }
}

fn try_clone(values: &[Vec3]) -> Result<Vec<Vec3>, SimulationError> {
    let mut copy = Vec::new();
    copy.try_reserve_exact(values.len())
        .map_err(|source| SimulationError::Allocation {
            requested: values.len(),
            source,
        })?;
    copy.extend_from_slice(values);
    Ok(copy)
}
