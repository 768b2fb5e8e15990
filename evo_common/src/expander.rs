//! I/O expander domain types, collaborator contracts and configuration.
//!
//! This module contains everything the expander loader shares with its
//! backends:
//! - [`types`] - Requests, chip variants, expander and indicator configuration
//! - [`driver`] - Collaborator traits, raw handles and error taxonomy
//! - [`config`] - `LoaderConfig` loaded from `expander.toml`

pub mod config;
pub mod driver;
pub mod types;
