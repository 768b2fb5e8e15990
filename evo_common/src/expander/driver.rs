//! Expander collaborator traits and error types.
//!
//! This module defines:
//! - `BusLookup`, `ExpanderDriver`, `IndicatorDriver` - External contracts the
//!   loader acquires resources through
//! - `BusHandle`, `ExpanderHandle`, `IndicatorHandle` - Raw handles issued by them
//! - `DriverError` - What a collaborator reports
//! - `LoadError` - What a `create` caller sees

use crate::expander::types::{ChipVariant, ExpanderConfig, IndicatorDescriptor};
use std::fmt;
use thiserror::Error;

/// Error reported by a collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// The requested object (bus, backend) does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The driver refused the request.
    #[error("Rejected: {0}")]
    Rejected(String),

    /// The driver ran out of resources.
    #[error("Out of resources: {0}")]
    OutOfResources(String),

    /// Destroy was called with a handle the driver does not know (anymore).
    #[error("Unknown handle: {0}")]
    UnknownHandle(u64),
}

/// Error returned by the loader's `create` operation.
///
/// Every variant is terminal: whatever was acquired for the request has been
/// released by the time the caller sees it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// Malformed or out-of-range request. No side effects.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The requested bus does not exist.
    #[error("Bus {0} not found")]
    DeviceNotFound(u32),

    /// The expander driver rejected the device.
    #[error("Driver initialization failed: {0}")]
    DriverInitFailed(String),

    /// The indicator driver rejected the bank; the expander was rolled back.
    #[error("Indicator initialization failed: {0}")]
    IndicatorInitFailed(String),

    /// Resource exhaustion during acquisition.
    #[error("Allocation failed: {0}")]
    AllocationFailed(String),
}

impl LoadError {
    /// Negative status code reported by the control endpoint.
    pub fn errno(&self) -> i32 {
        match self {
            Self::InvalidArgument(_) => -libc::EINVAL,
            Self::DeviceNotFound(_) => -libc::ENODEV,
            Self::DriverInitFailed(_) => -libc::EINVAL,
            Self::IndicatorInitFailed(_) => -libc::EIO,
            Self::AllocationFailed(_) => -libc::ENOMEM,
        }
    }
}

/// Handle to a resolved bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusHandle {
    id: u32,
    name: String,
}

impl BusHandle {
    /// Create a handle. Only called by `BusLookup` implementations.
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// Bus number.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Human readable bus name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

macro_rules! raw_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        ///
        /// Not `Clone`: the value is consumed by the matching destroy call.
        #[derive(Debug, PartialEq, Eq, Hash)]
        pub struct $name(u64);

        impl $name {
            /// Wrap a driver-assigned identifier.
            pub fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            /// Driver-assigned identifier.
            pub fn raw(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "#{}", self.0)
            }
        }
    };
}

raw_handle!(
    /// Raw handle to an instantiated expander device.
    ExpanderHandle
);

raw_handle!(
    /// Raw handle to an instantiated indicator bank.
    IndicatorHandle
);

/// Resolves bus numbers to bus handles.
pub trait BusLookup: Send + Sync {
    /// Resolve `bus_id`.
    ///
    /// # Errors
    /// `DriverError::NotFound` if no such bus exists.
    fn resolve(&self, bus_id: u32) -> Result<BusHandle, DriverError>;
}

/// Instantiates and destroys expander devices on a bus.
///
/// Both calls are synchronous and may block on device I/O.
pub trait ExpanderDriver: Send + Sync {
    /// Instantiate a `variant` device at `address` on `bus`.
    fn create_expander(
        &self,
        bus: &BusHandle,
        address: u16,
        variant: ChipVariant,
        config: &ExpanderConfig,
    ) -> Result<ExpanderHandle, DriverError>;

    /// Destroy a device created by [`ExpanderDriver::create_expander`].
    ///
    /// Destroying an already destroyed handle is a caller error.
    fn destroy_expander(&self, handle: ExpanderHandle) -> Result<(), DriverError>;
}

/// Instantiates and destroys indicator banks.
pub trait IndicatorDriver: Send + Sync {
    /// Instantiate one bank driving every descriptor's pin.
    fn create_indicator_bank(
        &self,
        descriptors: &[IndicatorDescriptor],
    ) -> Result<IndicatorHandle, DriverError>;

    /// Destroy a bank created by [`IndicatorDriver::create_indicator_bank`].
    fn destroy_indicator_bank(&self, handle: IndicatorHandle) -> Result<(), DriverError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errno_mapping() {
        assert_eq!(LoadError::InvalidArgument("x".into()).errno(), -libc::EINVAL);
        assert_eq!(LoadError::DeviceNotFound(99).errno(), -libc::ENODEV);
        assert_eq!(LoadError::DriverInitFailed("x".into()).errno(), -libc::EINVAL);
        assert_eq!(LoadError::IndicatorInitFailed("x".into()).errno(), -libc::EIO);
        assert_eq!(LoadError::AllocationFailed("x".into()).errno(), -libc::ENOMEM);
    }

    #[test]
    fn error_display() {
        let err = LoadError::DeviceNotFound(99);
        assert!(err.to_string().contains("99"));

        let err = DriverError::UnknownHandle(7);
        assert!(err.to_string().contains('7'));
    }

    #[test]
    fn raw_handles_round_trip_identifier() {
        let handle = ExpanderHandle::from_raw(42);
        assert_eq!(handle.raw(), 42);
        assert_eq!(handle.to_string(), "#42");
        assert_eq!(IndicatorHandle::from_raw(3), IndicatorHandle::from_raw(3));
    }
}
