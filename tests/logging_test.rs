//! Subscriber installation runs in its own test binary since it is global.

use hp5316::config::LoggingConfig;
use hp5316::logging::{self, LogFormat, LoggingOptions};
use tracing::Level;

#[test]
fn test_init_is_idempotent() {
    let options = LoggingOptions::new(Level::WARN).with_format(LogFormat::Compact);
    assert!(logging::init(options.clone()).is_ok());
    assert!(logging::init(options.with_ansi(false)).is_ok());

    let from_config = LoggingOptions::from_config(&LoggingConfig::default()).unwrap();
    assert!(logging::init(from_config).is_ok());
    tracing::warn!("still logging after repeated init");
}
