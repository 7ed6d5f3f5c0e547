//! Instrument bus abstraction.
//!
//! The driver never talks to GPIB hardware directly. It holds a
//! [`BusResource`], an addressed endpoint opened by a [`ResourceManager`]:
//!
//! - [`visa::VisaResourceManager`] opens real resources through the system
//!   VISA library (`instrument_visa` feature).
//! - [`mock::MockResourceManager`] hands out [`mock::MockBus`] endpoints that
//!   record every write and replay scripted responses.
//!
//! All operations are blocking. A resource is released when it is dropped.

pub mod mock;
pub mod visa;

use std::time::Duration;
use thiserror::Error;

/// VISA search expression matching every instrument resource.
pub const ALL_INSTRUMENTS: &str = "?*::INSTR";

/// Errors raised by a bus resource or resource manager.
#[derive(Error, Debug)]
pub enum BusError {
    /// Operating system level I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No response arrived before the read timeout.
    #[error("Read timed out")]
    Timeout,

    /// The resource has been closed or the connection dropped.
    #[error("Resource closed")]
    Closed,

    /// The VISA library reported a failure.
    #[error("VISA error: {0}")]
    Visa(String),

    /// No resource exists at the given address.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// The backend was not compiled in.
    #[error("Feature '{0}' is not enabled. Please build with --features {0}")]
    FeatureNotEnabled(String),
}

/// An open, addressed endpoint on the instrument bus.
pub trait BusResource: Send {
    /// Address the resource was opened with (e.g. `GPIB1::20::INSTR`).
    fn resource_name(&self) -> &str;

    /// Write one command, appending the write terminator.
    fn write_line(&mut self, command: &str) -> Result<(), BusError>;

    /// Block until one terminated response line arrives or the timeout expires.
    ///
    /// The returned text does not include the read terminator.
    fn read_line(&mut self) -> Result<String, BusError>;

    /// Clear any pending bus condition (device clear).
    fn clear(&mut self) -> Result<(), BusError>;

    /// Set the I/O timeout applied to subsequent reads.
    fn set_timeout(&mut self, timeout: Duration) -> Result<(), BusError>;
}

impl<T: BusResource + ?Sized> BusResource for Box<T> {
    fn resource_name(&self) -> &str {
        (**self).resource_name()
    }

    fn write_line(&mut self, command: &str) -> Result<(), BusError> {
        (**self).write_line(command)
    }

    fn read_line(&mut self) -> Result<String, BusError> {
        (**self).read_line()
    }

    fn clear(&mut self) -> Result<(), BusError> {
        (**self).clear()
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<(), BusError> {
        (**self).set_timeout(timeout)
    }
}

/// Enumerates and opens bus resources.
pub trait ResourceManager {
    /// Resource type handed out by [`ResourceManager::open`].
    type Resource: BusResource;

    /// Addresses of every instrument currently visible on the bus.
    fn list_resources(&self) -> Result<Vec<String>, BusError>;

    /// Open the resource at `address`.
    fn open(&self, address: &str) -> Result<Self::Resource, BusError>;
}

/// List the instruments visible to the system VISA library.
///
/// Fails with [`BusError::FeatureNotEnabled`] when built without
/// `instrument_visa`.
pub fn list_resources() -> Result<Vec<String>, BusError> {
    let manager = visa::VisaResourceManager::new()?;
    manager.list_resources()
}
