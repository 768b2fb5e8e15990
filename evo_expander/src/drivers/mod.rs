//! Expander backend implementations.
//!
//! This module contains all backend implementations:
//!
//! - [`simulation`] - In-memory bus and device model for development and testing
//!
//! # Adding New Backends
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Implement `BusLookup`, `ExpanderDriver` and `IndicatorDriver` from
//!    `evo_common::expander::driver`
//! 3. Register a factory in [`register_all_backends`]

pub mod simulation;

use crate::driver_registry::DriverRegistry;

/// Register all built-in backends.
pub fn register_all_backends(registry: &mut DriverRegistry) {
    registry.register("simulation", simulation::create_backend);
}
