//! Headless galaxy simulation driver
//!
//! Usage: `galaxy_sim [universe|galaxy|collision] [frames] [--gpu]`
//!
//! Runs the chosen scenario for a number of frames and logs statistics every
//! 60 frames. Set `RUST_LOG=debug` for more detail.

use galaxy_sim::{
    CpuIntegrator, ForceIntegrator, GpuIntegrator, Simulation, SimulationConfig, SimulationType,
};

const DEFAULT_FRAMES: u64 = 600;
const STATS_INTERVAL: u64 = 60;

struct Args {
    sim_type: SimulationType,
    frames: u64,
    gpu: bool,
}

fn parse_args() -> Args {
    let mut args = Args {
        sim_type: SimulationType::default(),
        frames: DEFAULT_FRAMES,
        gpu: false,
    };

    for arg in std::env::args().skip(1) {
        if arg == "--gpu" {
            args.gpu = true;
        } else if let Some(sim_type) = SimulationType::from_name(&arg) {
            args.sim_type = sim_type;
        } else if let Ok(frames) = arg.parse() {
            args.frames = frames;
        } else {
            log::warn!("Ignoring unrecognized argument '{}'", arg);
        }
    }
    args
}

fn integrator(gpu: bool) -> Box<dyn ForceIntegrator> {
    if gpu {
        match GpuIntegrator::new_blocking() {
            Ok(integrator) => {
                log::info!("GPU integrator on {}", integrator.adapter_name());
                return Box::new(integrator);
            }
            Err(e) => log::warn!("{}; falling back to the CPU integrator", e),
        }
    }
    Box::new(CpuIntegrator::new())
}

fn main() {
    common::init_logging();
    let args = parse_args();

    let config = SimulationConfig::new(args.sim_type);
    let mut sim = match Simulation::new(config, integrator(args.gpu)) {
        Ok(sim) => sim,
        Err(e) => {
            log::error!("Failed to initialize simulation: {}", e);
            std::process::exit(1);
        }
    };

    sim.start();
    let started = std::time::Instant::now();

    for _ in 0..args.frames {
        if let Err(e) = sim.tick() {
            log::error!("Frame {} failed: {}", sim.frame() + 1, e);
            std::process::exit(1);
        }

        if sim.frame() % STATS_INTERVAL == 0 {
            let stats = sim.stats();
            let separation = stats
                .black_hole_separation
                .map(|d| format!(", black hole separation {:.1}", d))
                .unwrap_or_default();
            log::info!(
                "Frame {} (t = {:.1}): center of mass ({:.1}, {:.1}, {:.1}), kinetic energy {:.3e}{}",
                stats.frame,
                stats.elapsed,
                stats.center_of_mass.x,
                stats.center_of_mass.y,
                stats.center_of_mass.z,
                stats.kinetic_energy,
                separation
            );
        }
    }

    let seconds = started.elapsed().as_secs_f32();
    log::info!(
        "Ran {} frames of {} particles in {:.2}s ({:.1} fps, {} integrator)",
        sim.frame(),
        sim.particle_count(),
        seconds,
        sim.frame() as f32 / seconds.max(f32::EPSILON),
        sim.integrator_name()
    );
}
