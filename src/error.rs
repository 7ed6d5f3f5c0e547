//! Error types for the HP 5316 driver.
//!
//! `CounterError` is the single error type returned by the driver session.
//! Lower layers have their own error enums that convert into it with `#[from]`:
//!
//! - **`BusError`** (see [`crate::bus`]): anything the bus resource reports,
//!   from I/O failures to VISA status codes.
//! - **`DecodeError`** (see [`crate::measurement`]): a response that cannot be
//!   turned into a `Measurement`.
//!
//! Validation failures (`InvalidType`, `OutOfRange`, `InvalidValue`,
//! `UnknownSetting`) are raised at the setter boundary before anything is
//! written to the instrument. They are permanent: the caller has to supply a
//! different value.

use thiserror::Error;

use crate::bus::BusError;
use crate::measurement::DecodeError;

/// Convenience alias for results using the driver error type.
pub type CounterResult<T> = std::result::Result<T, CounterError>;

/// Primary error type for the counter driver.
#[derive(Error, Debug)]
pub enum CounterError {
    /// A setting was given a value of the wrong type, e.g. a string for a
    /// trigger level or a float for the timeout.
    #[error("Setting '{setting}' expects {expected}, got {found}")]
    InvalidType {
        /// Setting name
        setting: &'static str,
        /// Human readable description of the accepted types
        expected: &'static str,
        /// Type of the rejected value
        found: &'static str,
    },

    /// A numeric setting was outside its permitted range.
    #[error("Setting '{setting}' must be between {min} and {max}, got {value}")]
    OutOfRange {
        /// Setting name
        setting: &'static str,
        /// Rejected value
        value: f64,
        /// Lower bound (inclusive)
        min: f64,
        /// Upper bound (inclusive)
        max: f64,
    },

    /// A value had the right type but names no known variant.
    #[error("Invalid value for '{setting}': {value}")]
    InvalidValue {
        /// Setting name
        setting: &'static str,
        /// Rejected value as text
        value: String,
    },

    /// No setting with this name exists.
    #[error("Unknown setting '{0}'")]
    UnknownSetting(String),

    /// Bus communication failed.
    #[error("Bus error: {0}")]
    Bus(#[from] BusError),

    /// The instrument response could not be decoded.
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Configuration could not be loaded or failed validation.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<figment::Error> for CounterError {
    fn from(err: figment::Error) -> Self {
        CounterError::Config(err.to_string())
    }
}
