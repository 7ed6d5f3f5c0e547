//! # HP 5316 Counter Driver
//!
//! Remote control of an HP 5316A/B universal frequency/period counter over
//! GPIB. The driver writes fixed command tokens, keeps a local mirror of the
//! settings it has written, and decodes the counter's fixed-width readings.
//!
//! ## Crate Structure
//!
//! - **`bus`**: The `BusResource` / `ResourceManager` seam, with a VISA backend
//!   (`instrument_visa` feature) and a scriptable mock.
//! - **`commands`**: Setting enums and the command token tables.
//! - **`measurement`**: `Measurement`, `Unit` and the response decoder.
//! - **`settings`**: `CounterSettings`, the mirrored configuration, and
//!   name-based setting lookup.
//! - **`driver`**: `Hp5316`, the session object.
//! - **`config`**: Figment-based `AppConfig` (TOML file + `HP5316_` env).
//! - **`logging`**: `tracing-subscriber` setup for the binary.
//! - **`error`**: `CounterError` and the `CounterResult` alias.
//!
//! ## Example
//!
//! ```rust
//! use hp5316::bus::mock::MockBus;
//! use hp5316::commands::MeasMode;
//! use hp5316::driver::Hp5316;
//! use hp5316::measurement::Unit;
//! use std::time::Duration;
//!
//! # fn main() -> hp5316::error::CounterResult<()> {
//! let bus = MockBus::repeating("GPIB1::20::INSTR", "F00001000.000000000");
//! let mut counter = Hp5316::with_resource(bus, Duration::ZERO)?;
//! counter.set_meas_mode(MeasMode::FreqA)?;
//!
//! let reading = counter.measure()?.expect("mock always answers");
//! assert_eq!(reading.unit, Unit::Hertz);
//! assert_eq!(reading.value, 1000.0);
//! # Ok(())
//! # }
//! ```

pub mod bus;
pub mod commands;
pub mod config;
pub mod driver;
pub mod error;
pub mod logging;
pub mod measurement;
pub mod settings;

pub use driver::Hp5316;
pub use error::{CounterError, CounterResult};
pub use measurement::{Measurement, Unit};
