//! VISA-backed bus resources for GPIB/USB/Ethernet instruments
//!
//! Wraps the `visa-rs` crate. Requires the `instrument_visa` feature and a
//! VISA implementation (NI-VISA, Keysight IO Libraries, ...) installed on the
//! host. Without the feature every constructor returns
//! [`BusError::FeatureNotEnabled`] so callers can still be built and tested.
//!
//! Supports resource strings like:
//! - "GPIB1::20::INSTR" (GPIB interface 1, primary address 20)
//! - "USB0::0x1234::0x5678::SERIAL::INSTR" (USB)
//! - "TCPIP0::192.168.1.100::INSTR" (Ethernet/LXI)

use super::{BusError, BusResource, ResourceManager};
#[cfg(feature = "instrument_visa")]
use super::ALL_INSTRUMENTS;
use std::time::Duration;

#[cfg(feature = "instrument_visa")]
use std::ffi::CString;
#[cfg(feature = "instrument_visa")]
use std::io::{BufRead, BufReader, Write};
#[cfg(feature = "instrument_visa")]
use std::sync::Arc;
#[cfg(feature = "instrument_visa")]
use tracing::debug;
#[cfg(feature = "instrument_visa")]
use visa_rs::enums::attribute::{AttrTmoValue, HasAttribute};
#[cfg(feature = "instrument_visa")]
use visa_rs::prelude::{AccessMode, AsResourceManager, DefaultRM, Instrument};

/// Terminator appended to every write and expected after every response.
pub const TERMINATOR: &str = "\r\n";

/// How long `open` may wait for the resource lock.
pub const OPEN_TIMEOUT: Duration = Duration::from_secs(1);

#[cfg(not(feature = "instrument_visa"))]
fn feature_disabled() -> BusError {
    BusError::FeatureNotEnabled("instrument_visa".to_string())
}

#[cfg(feature = "instrument_visa")]
fn visa_err(context: &str, err: visa_rs::Error) -> BusError {
    BusError::Visa(format!("{}: {}", context, err))
}

#[cfg(feature = "instrument_visa")]
fn io_err(err: std::io::Error) -> BusError {
    if err.kind() == std::io::ErrorKind::TimedOut {
        BusError::Timeout
    } else {
        BusError::Io(err)
    }
}

#[cfg(feature = "instrument_visa")]
fn resource_id(text: &str) -> Result<visa_rs::VisaString, BusError> {
    let c_string = CString::new(text)
        .map_err(|_| BusError::Visa(format!("Resource string contains NUL: {:?}", text)))?;
    Ok(visa_rs::VisaString::from(c_string))
}

// =============================================================================
// VisaResourceManager
// =============================================================================

/// Resource manager backed by the default VISA resource manager.
///
/// Dropping a VISA manager session closes every session opened through it,
/// so each opened resource holds a reference to the manager session.
pub struct VisaResourceManager {
    #[cfg(feature = "instrument_visa")]
    rm: Arc<DefaultRM>,
}

impl VisaResourceManager {
    /// Open the default VISA resource manager.
    #[cfg(feature = "instrument_visa")]
    pub fn new() -> Result<Self, BusError> {
        let rm = DefaultRM::new().map_err(|e| visa_err("Failed to create VISA resource manager", e))?;
        Ok(Self { rm: Arc::new(rm) })
    }

    /// Open the default VISA resource manager.
    #[cfg(not(feature = "instrument_visa"))]
    pub fn new() -> Result<Self, BusError> {
        Err(feature_disabled())
    }
}

impl ResourceManager for VisaResourceManager {
    type Resource = VisaResource;

    #[cfg(feature = "instrument_visa")]
    fn list_resources(&self) -> Result<Vec<String>, BusError> {
        let expr = resource_id(ALL_INSTRUMENTS)?;
        let mut list = match self.rm.find_res_list(&expr) {
            Ok(list) => list,
            // VISA reports "no resources" as an error status
            Err(e) => {
                debug!("VISA find_res_list returned {}", e);
                return Ok(Vec::new());
            }
        };

        let mut names = Vec::new();
        while let Some(name) = list
            .find_next()
            .map_err(|e| visa_err("Failed to enumerate VISA resources", e))?
        {
            names.push(name.to_string());
        }
        debug!("VISA resources: {:?}", names);
        Ok(names)
    }

    #[cfg(not(feature = "instrument_visa"))]
    fn list_resources(&self) -> Result<Vec<String>, BusError> {
        Err(feature_disabled())
    }

    #[cfg(feature = "instrument_visa")]
    fn open(&self, address: &str) -> Result<VisaResource, BusError> {
        let id = resource_id(address)?;
        let instrument = self
            .rm
            .open(&id, AccessMode::NO_LOCK, OPEN_TIMEOUT)
            .map_err(|e| visa_err(&format!("Failed to open VISA resource {}", address), e))?;

        debug!("VISA resource '{}' opened", address);
        Ok(VisaResource {
            name: address.to_string(),
            instrument,
            _rm: Arc::clone(&self.rm),
        })
    }

    #[cfg(not(feature = "instrument_visa"))]
    fn open(&self, address: &str) -> Result<VisaResource, BusError> {
        let _ = address;
        Err(feature_disabled())
    }
}

// =============================================================================
// VisaResource
// =============================================================================

/// One open VISA session.
///
/// Shares the manager session it was opened from; the manager session closes
/// once the manager and every resource opened through it are dropped.
pub struct VisaResource {
    name: String,
    // Field order matters: the instrument session closes before its manager.
    #[cfg(feature = "instrument_visa")]
    instrument: Instrument,
    #[cfg(feature = "instrument_visa")]
    _rm: Arc<DefaultRM>,
}

impl BusResource for VisaResource {
    fn resource_name(&self) -> &str {
        &self.name
    }

    #[cfg(feature = "instrument_visa")]
    fn write_line(&mut self, command: &str) -> Result<(), BusError> {
        let line = format!("{}{}", command, TERMINATOR);
        self.instrument.write_all(line.as_bytes()).map_err(io_err)?;
        debug!("VISA write sent: {}", command);
        Ok(())
    }

    #[cfg(not(feature = "instrument_visa"))]
    fn write_line(&mut self, _command: &str) -> Result<(), BusError> {
        Err(feature_disabled())
    }

    #[cfg(feature = "instrument_visa")]
    fn read_line(&mut self) -> Result<String, BusError> {
        let mut response = String::new();
        let mut reader = BufReader::new(&self.instrument);
        let n = reader.read_line(&mut response).map_err(io_err)?;
        if n == 0 {
            return Err(BusError::Closed);
        }
        let response = response.trim_end_matches(['\r', '\n']).to_string();
        debug!("VISA read: {:?}", response);
        Ok(response)
    }

    #[cfg(not(feature = "instrument_visa"))]
    fn read_line(&mut self) -> Result<String, BusError> {
        Err(feature_disabled())
    }

    #[cfg(feature = "instrument_visa")]
    fn clear(&mut self) -> Result<(), BusError> {
        self.instrument
            .clear()
            .map_err(|e| visa_err("VISA device clear failed", e))
    }

    #[cfg(not(feature = "instrument_visa"))]
    fn clear(&mut self) -> Result<(), BusError> {
        Err(feature_disabled())
    }

    #[cfg(feature = "instrument_visa")]
    fn set_timeout(&mut self, timeout: Duration) -> Result<(), BusError> {
        let millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        let attr = AttrTmoValue::new_checked(millis)
            .ok_or_else(|| BusError::Visa(format!("Timeout {}ms not accepted by VISA", millis)))?;
        self.instrument
            .set_attr(attr)
            .map_err(|e| visa_err("Failed to set VISA timeout", e))
    }

    #[cfg(not(feature = "instrument_visa"))]
    fn set_timeout(&mut self, _timeout: Duration) -> Result<(), BusError> {
        Err(feature_disabled())
    }
}
