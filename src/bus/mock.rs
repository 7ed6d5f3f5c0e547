//! Mock bus resources for testing without a counter on the bench.
//!
//! `MockBus` keeps a [`BusLog`] of everything the driver does to it. The log is
//! shared, so a test can keep a handle after the bus has been moved into the
//! driver:
//!
//! ```rust
//! use hp5316::bus::mock::MockBus;
//! use hp5316::driver::Hp5316;
//! use std::time::Duration;
//!
//! let bus = MockBus::new("GPIB0::20::INSTR");
//! let log = bus.log();
//! let _counter = Hp5316::with_resource(bus, Duration::ZERO).unwrap();
//! assert_eq!(log.writes()[0], "WA1");
//! ```
//!
//! Reads are served from a queue of scripted results first, then from an
//! optional repeating reading. With neither, a read times out.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::{BusError, BusResource, ResourceManager};

// =============================================================================
// BusLog - shared record of bus traffic
// =============================================================================

#[derive(Debug, Default)]
struct LogInner {
    writes: Vec<String>,
    timeouts: Vec<Duration>,
    clears: usize,
    reads: usize,
}

/// Cloneable handle onto the traffic seen by a [`MockBus`].
#[derive(Debug, Clone, Default)]
pub struct BusLog {
    inner: Arc<Mutex<LogInner>>,
}

impl BusLog {
    fn lock(&self) -> MutexGuard<'_, LogInner> {
        // A panicking test thread must not hide the log from the others
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Every command written, in order, without terminators.
    pub fn writes(&self) -> Vec<String> {
        self.lock().writes.clone()
    }

    /// Most recent command written.
    pub fn last_write(&self) -> Option<String> {
        self.lock().writes.last().cloned()
    }

    /// Every timeout applied to the resource, in order.
    pub fn timeouts(&self) -> Vec<Duration> {
        self.lock().timeouts.clone()
    }

    /// Number of device clears issued.
    pub fn clears(&self) -> usize {
        self.lock().clears
    }

    /// Number of read attempts, successful or not.
    pub fn reads(&self) -> usize {
        self.lock().reads
    }

    /// Forget everything recorded so far.
    pub fn reset(&self) {
        *self.lock() = LogInner::default();
    }
}

// =============================================================================
// MockBus - scripted bus resource
// =============================================================================

/// Bus resource that records traffic and replays scripted responses.
#[derive(Debug)]
pub struct MockBus {
    name: String,
    log: BusLog,
    responses: VecDeque<Result<String, BusError>>,
    repeating: Option<String>,
    fail_writes: bool,
    fail_clear: bool,
}

impl MockBus {
    /// New mock resource with no scripted responses.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            log: BusLog::default(),
            responses: VecDeque::new(),
            repeating: None,
            fail_writes: false,
            fail_clear: false,
        }
    }

    /// Mock resource answering every read with the same reading.
    ///
    /// `MockBus::repeating("GPIB0::20::INSTR", "F00001000.000000000")` stands in
    /// for a counter measuring a steady 1 kHz signal.
    pub fn repeating(name: impl Into<String>, response: impl Into<String>) -> Self {
        let mut bus = Self::new(name);
        bus.repeating = Some(response.into());
        bus
    }

    /// Handle onto this bus's traffic log.
    pub fn log(&self) -> BusLog {
        self.log.clone()
    }

    /// Queue a response for the next read.
    pub fn push_response(&mut self, response: impl Into<String>) {
        self.responses.push_back(Ok(response.into()));
    }

    /// Queue a failure for the next read.
    pub fn push_error(&mut self, error: BusError) {
        self.responses.push_back(Err(error));
    }

    /// Builder form of [`MockBus::push_response`].
    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.push_response(response);
        self
    }

    /// Make every subsequent write fail with [`BusError::Closed`].
    pub fn fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Make every subsequent device clear fail with [`BusError::Closed`].
    pub fn fail_clear(&mut self, fail: bool) {
        self.fail_clear = fail;
    }
}

impl BusResource for MockBus {
    fn resource_name(&self) -> &str {
        &self.name
    }

    fn write_line(&mut self, command: &str) -> Result<(), BusError> {
        if self.fail_writes {
            return Err(BusError::Closed);
        }
        self.log.lock().writes.push(command.to_string());
        Ok(())
    }

    fn read_line(&mut self) -> Result<String, BusError> {
        self.log.lock().reads += 1;
        match self.responses.pop_front() {
            Some(result) => result,
            None => self.repeating.clone().ok_or(BusError::Timeout),
        }
    }

    fn clear(&mut self) -> Result<(), BusError> {
        if self.fail_clear {
            return Err(BusError::Closed);
        }
        self.log.lock().clears += 1;
        Ok(())
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<(), BusError> {
        self.log.lock().timeouts.push(timeout);
        Ok(())
    }
}

// =============================================================================
// MockResourceManager
// =============================================================================

/// Resource manager serving pre-registered [`MockBus`] endpoints.
///
/// Each registered bus can be opened once; a second `open` of the same address
/// fails with [`BusError::NotFound`].
#[derive(Debug, Default)]
pub struct MockResourceManager {
    resources: Mutex<HashMap<String, MockBus>>,
}

impl MockResourceManager {
    /// Empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `bus` available under its resource name.
    pub fn register(&self, bus: MockBus) {
        let mut resources = self.resources.lock().unwrap_or_else(|e| e.into_inner());
        resources.insert(bus.resource_name().to_string(), bus);
    }
}

impl ResourceManager for MockResourceManager {
    type Resource = MockBus;

    fn list_resources(&self) -> Result<Vec<String>, BusError> {
        let resources = self.resources.lock().unwrap_or_else(|e| e.into_inner());
        let mut names: Vec<String> = resources.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn open(&self, address: &str) -> Result<MockBus, BusError> {
        let mut resources = self.resources.lock().unwrap_or_else(|e| e.into_inner());
        resources
            .remove(address)
            .ok_or_else(|| BusError::NotFound(address.to_string()))
    }
}
