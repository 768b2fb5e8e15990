//! EVO Common Library
//!
//! This crate provides shared constants, configuration loading utilities and
//! the I/O expander domain types for all EVO workspace crates.
//!
//! # Module Structure
//!
//! - [`config`] - Configuration loading traits and types
//! - [`consts`] - System-wide numeric limits and default paths
//! - [`expander`] - Expander request/config types, collaborator traits, errors
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! Add to your `Cargo.toml` with alias for shorter imports:
//! ```toml
//! [dependencies]
//! evo = { package = "evo_common", path = "../evo_common" }
//! ```
//!
//! Then import:
//! ```rust,ignore
//! use evo::expander::types::{ChipVariant, Request};
//! use evo::config::{ConfigLoader, SharedConfig};
//! ```

pub mod config;
pub mod consts;
pub mod expander;
pub mod prelude;
