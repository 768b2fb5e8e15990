//! Simulation backend module.
//!
//! This module provides an in-memory bus/device model for development and
//! testing without physical hardware. It enforces the constraints a real bus
//! would (unique addresses, non-overlapping GPIO ranges, unique indicator
//! names) and supports fault injection.

mod driver;
mod state;

pub use driver::SimulationBackend;
pub use state::{SimEvent, SimStats};

use crate::driver_registry::Backend;
use evo_common::expander::config::LoaderConfig;
use evo_common::expander::driver::DriverError;
use std::sync::Arc;

/// Factory function to create a simulation backend instance.
pub fn create_backend(config: &LoaderConfig) -> Result<Backend, DriverError> {
    Ok(Backend::from_shared(Arc::new(SimulationBackend::new(
        &config.simulation,
    ))))
}
