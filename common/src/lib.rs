//! Common utilities for physics simulations
//!
//! This crate provides the shared headless GPU setup, buffer helpers and logging
//! initialization used by the simulation crates.

pub mod compute;

pub use compute::*;

/// Initialize `env_logger` with an `info` default filter. `RUST_LOG` overrides it.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}

/// Physical constants used in simulations
pub mod constants {
    /// Gravitational constant (scaled for visualization)
    pub const G: f32 = 1.0;

    /// Threads per workgroup for particle compute dispatches
    pub const WORKGROUP_SIZE: u32 = 256;
}
