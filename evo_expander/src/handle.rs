//! Owned resource handles.
//!
//! An [`Owned`] wraps a raw handle together with the driver that issued it.
//! The handle is destroyed exactly once: either explicitly through
//! [`Owned::release`], which reports the driver's result, or implicitly when
//! the owner is dropped, which logs a failure instead. Dropping a half-built
//! entry therefore rolls back everything it holds.

use evo_common::expander::driver::{
    DriverError, ExpanderDriver, ExpanderHandle, IndicatorDriver, IndicatorHandle,
};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// A kind of releasable resource.
pub trait Resource {
    /// Raw handle type issued by the driver.
    type Handle;
    /// Driver that destroys the handle.
    type Driver: ?Sized;
    /// Short name used in log lines.
    const KIND: &'static str;

    /// Driver-assigned identifier of `handle`.
    fn raw(handle: &Self::Handle) -> u64;

    /// Hand `handle` back to `driver`.
    fn destroy(driver: &Self::Driver, handle: Self::Handle) -> Result<(), DriverError>;
}

/// Expander devices.
pub struct ExpanderResource;

impl Resource for ExpanderResource {
    type Handle = ExpanderHandle;
    type Driver = dyn ExpanderDriver;
    const KIND: &'static str = "expander";

    fn raw(handle: &ExpanderHandle) -> u64 {
        handle.raw()
    }

    fn destroy(driver: &Self::Driver, handle: ExpanderHandle) -> Result<(), DriverError> {
        driver.destroy_expander(handle)
    }
}

/// Indicator banks.
pub struct IndicatorResource;

impl Resource for IndicatorResource {
    type Handle = IndicatorHandle;
    type Driver = dyn IndicatorDriver;
    const KIND: &'static str = "indicator bank";

    fn raw(handle: &IndicatorHandle) -> u64 {
        handle.raw()
    }

    fn destroy(driver: &Self::Driver, handle: IndicatorHandle) -> Result<(), DriverError> {
        driver.destroy_indicator_bank(handle)
    }
}

/// Exclusive owner of one acquired resource.
pub struct Owned<R: Resource> {
    raw: u64,
    handle: Option<R::Handle>,
    driver: Arc<R::Driver>,
}

/// Owned expander device.
pub type OwnedExpander = Owned<ExpanderResource>;

/// Owned indicator bank.
pub type OwnedIndicatorBank = Owned<IndicatorResource>;

impl<R: Resource> Owned<R> {
    /// Take ownership of `handle`, to be destroyed through `driver`.
    pub fn new(handle: R::Handle, driver: Arc<R::Driver>) -> Self {
        Self {
            raw: R::raw(&handle),
            handle: Some(handle),
            driver,
        }
    }

    /// Driver-assigned identifier.
    pub fn raw(&self) -> u64 {
        self.raw
    }

    /// Destroy the resource now and report the driver's verdict.
    ///
    /// Consumes the owner, so the resource cannot be released twice.
    pub fn release(mut self) -> Result<(), DriverError> {
        match self.handle.take() {
            Some(handle) => {
                debug!("Releasing {} #{}", R::KIND, self.raw);
                R::destroy(&*self.driver, handle)
            }
            None => Ok(()),
        }
    }
}

impl<R: Resource> Drop for Owned<R> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            debug!("Rolling back {} #{}", R::KIND, self.raw);
            if let Err(e) = R::destroy(&*self.driver, handle) {
                warn!("Failed to release {} #{}: {}", R::KIND, self.raw, e);
            }
        }
    }
}

impl<R: Resource> fmt::Debug for Owned<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Owned")
            .field("kind", &R::KIND)
            .field("raw", &self.raw)
            .field("live", &self.handle.is_some())
            .finish()
    }
}
