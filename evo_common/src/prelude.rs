//! Prelude module for common re-exports.
//!
//! ```rust
//! use evo_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig, Validate};
pub use crate::expander::config::{ConfigOrigin, LoaderConfig};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{CHANNELS_16, CHANNELS_8, DEFAULT_CONFIG_PATH};

// ─── Expander ───────────────────────────────────────────────────────
pub use crate::expander::driver::{
    BusHandle, BusLookup, DriverError, ExpanderDriver, ExpanderHandle, IndicatorDriver,
    IndicatorHandle, LoadError,
};
pub use crate::expander::types::{
    ChipVariant, DefaultState, ExpanderConfig, IndicatorConfig, IndicatorDescriptor, Request,
};
