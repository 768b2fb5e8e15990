//! # EVO Expander Library
//!
//! Dynamic instantiation and teardown of bus-attached I/O expanders, each
//! optionally paired with an indicator bank built on the expander's pins.
//!
//! Backends implement the collaborator traits defined in
//! `evo_common::expander::driver`.
//!
//! # Module Structure
//!
//! - [`handle`] - Owned resource handles released on drop
//! - [`entry`] - `Entry`, the unit of ownership for one device
//! - [`registry`] - Lock-guarded collection of live entries
//! - [`loader`] - Acquisition chain with rollback, bulk teardown
//! - [`control`] - Text command endpoint
//! - [`driver_registry`] - Backend factory registration
//! - [`drivers`] - Backend implementations
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                    evo_expander (single crate)                   │
//! │  ┌─────────────┐    ┌──────────────┐    ┌─────────────────────┐  │
//! │  │  Control    │───►│   Loader     │───►│  Registry           │  │
//! │  │  Endpoint   │    │ (build/tear) │    │  Mutex<Vec<Entry>>  │  │
//! │  └─────────────┘    └──────┬───────┘    └─────────────────────┘  │
//! │                            │                                     │
//! │                            ▼                                     │
//! │   ┌───────────┐  ┌────────────────┐  ┌─────────────────┐         │
//! │   │ BusLookup │  │ ExpanderDriver │  │ IndicatorDriver │ (traits)│
//! │   └───────────┘  └────────────────┘  └─────────────────┘         │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

#![deny(warnings)]
#![deny(missing_docs)]

pub mod control;
pub mod driver_registry;
pub mod drivers;
pub mod entry;
pub mod handle;
pub mod loader;
pub mod registry;

// Re-export key types for convenience
pub use crate::control::{ControlEndpoint, USAGE};
pub use crate::driver_registry::{Backend, DriverRegistry};
pub use crate::entry::{Entry, EntryId, EntrySummary, TeardownReport};
pub use crate::loader::{Loader, ShutdownSummary};
pub use crate::registry::Registry;
