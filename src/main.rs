//! CLI Entry Point for hp5316
//!
//! Provides command-line access to an HP 5316 counter:
//! - Listing the instruments visible to VISA
//! - Configuring the counter and polling readings
//! - Sending a soft reset or full initialize
//!
//! # Usage
//!
//! Poll three period readings on channel A:
//! ```bash
//! hp5316 measure --resource GPIB1::20::INSTR --meas-mode period_a \
//!     --trigger-level-mode set_level --trigger-level-a 0.01 --count 3
//! ```
//!
//! Try it without hardware:
//! ```bash
//! hp5316 measure --mock --count 3
//! ```

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use hp5316::bus::mock::MockBus;
use hp5316::bus::visa::VisaResourceManager;
use hp5316::bus::{self, BusResource};
use hp5316::commands::{GateMode, MeasMode, TriggerLevelMode, TriggerSlope};
use hp5316::config::AppConfig;
use hp5316::driver::Hp5316;
use hp5316::logging::{self, LogFormat, LoggingOptions};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Reading served by `--mock`: a steady 1 kHz signal.
const MOCK_READING: &str = "F00001000.000000000";
const MOCK_RESOURCE: &str = "MOCK::20::INSTR";

#[derive(Parser)]
#[command(name = "hp5316")]
#[command(about = "Driver for the HP 5316 universal counter", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log output format; overrides the config file
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List instruments visible to VISA
    List,

    /// Configure the counter and poll readings
    Measure {
        #[command(flatten)]
        connect: ConnectArgs,

        #[command(flatten)]
        settings: SettingArgs,

        /// Number of readings to take
        #[arg(long, default_value_t = 3)]
        count: u32,

        /// Pause between readings in milliseconds
        #[arg(long, default_value_t = 0)]
        interval_ms: u64,
    },

    /// Soft reset (RE)
    Reset {
        #[command(flatten)]
        connect: ConnectArgs,
    },

    /// Full initialize (IN), then push the default settings
    Initialize {
        #[command(flatten)]
        connect: ConnectArgs,
    },
}

#[derive(Args)]
struct ConnectArgs {
    /// VISA resource address (e.g. GPIB1::20::INSTR)
    #[arg(long)]
    resource: Option<String>,

    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Use a simulated counter instead of VISA
    #[arg(long)]
    mock: bool,

    /// Pause after each configuration write in milliseconds
    #[arg(long)]
    settle_ms: Option<u64>,
}

#[derive(Args)]
struct SettingArgs {
    /// Measurement function (e.g. freq_a, period_a)
    #[arg(long)]
    meas_mode: Option<MeasMode>,

    /// Gate mode (long_front, short_front, long_rear, short_rear)
    #[arg(long)]
    gate_mode: Option<GateMode>,

    /// Trigger level source (front_control, set_level)
    #[arg(long)]
    trigger_level_mode: Option<TriggerLevelMode>,

    /// Channel A trigger level in volts
    #[arg(long, allow_negative_numbers = true)]
    trigger_level_a: Option<f64>,

    /// Channel B trigger level in volts
    #[arg(long, allow_negative_numbers = true)]
    trigger_level_b: Option<f64>,

    /// Channel A slope (positive, negative)
    #[arg(long)]
    slope_a: Option<TriggerSlope>,

    /// Channel B slope (positive, negative)
    #[arg(long)]
    slope_b: Option<TriggerSlope>,

    /// Read timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u32>,
}

impl SettingArgs {
    fn apply_to(&self, config: &mut AppConfig) {
        let settings = &mut config.settings;
        if let Some(mode) = self.meas_mode {
            settings.meas_mode = mode;
        }
        if let Some(mode) = self.gate_mode {
            settings.gate_mode = mode;
        }
        if let Some(mode) = self.trigger_level_mode {
            settings.trigger_level_mode = mode;
        }
        if let Some(volts) = self.trigger_level_a {
            settings.trigger_level_a = volts;
        }
        if let Some(volts) = self.trigger_level_b {
            settings.trigger_level_b = volts;
        }
        if let Some(slope) = self.slope_a {
            settings.trigger_slope_a = slope;
        }
        if let Some(slope) = self.slope_b {
            settings.trigger_slope_b = slope;
        }
        if let Some(ms) = self.timeout_ms {
            settings.timeout_ms = ms;
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::List => {
            init_logging(&cli.log_level, cli.log_format, &AppConfig::load()?)?;
            list()
        }
        Commands::Measure {
            connect,
            settings,
            count,
            interval_ms,
        } => {
            let mut config = load_config(&connect)?;
            settings.apply_to(&mut config);
            config.validate().context("Invalid counter settings")?;
            init_logging(&cli.log_level, cli.log_format, &config)?;

            let interval = Duration::from_millis(interval_ms);
            if connect.mock {
                let bus = MockBus::repeating(mock_resource(&config), MOCK_READING);
                let counter =
                    Hp5316::with_settings(bus, config.counter.settle_time, &config.settings)?;
                measure(counter, count, interval)
            } else {
                let rm = VisaResourceManager::new()?;
                let counter = Hp5316::connect_with(
                    &rm,
                    resource(&config)?,
                    config.counter.settle_time,
                    &config.settings,
                )
                .context("Failed to configure counter")?;
                measure(counter, count, interval)
            }
        }
        Commands::Reset { connect } => {
            let config = load_config(&connect)?;
            init_logging(&cli.log_level, cli.log_format, &config)?;
            with_counter(&connect, &config, |counter| Ok(counter.reset()?))
        }
        Commands::Initialize { connect } => {
            let config = load_config(&connect)?;
            init_logging(&cli.log_level, cli.log_format, &config)?;
            with_counter(&connect, &config, |counter| Ok(counter.initialize()?))
        }
    }
}

fn load_config(connect: &ConnectArgs) -> Result<AppConfig> {
    let mut config = match &connect.config {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => AppConfig::load().context("Failed to load config from environment")?,
    };
    if let Some(resource) = &connect.resource {
        config.counter.resource = Some(resource.clone());
    }
    if let Some(ms) = connect.settle_ms {
        config.counter.settle_time = Duration::from_millis(ms);
    }
    Ok(config)
}

fn init_logging(
    level: &Option<String>,
    format: Option<LogFormat>,
    config: &AppConfig,
) -> Result<()> {
    let mut logging_config = config.logging.clone();
    if let Some(level) = level {
        logging_config.level = level.clone();
    }
    if let Some(format) = format {
        logging_config.format = format;
    }
    let options = LoggingOptions::from_config(&logging_config).map_err(|e| anyhow!(e))?;
    logging::init(options).map_err(|e| anyhow!(e))
}

fn resource(config: &AppConfig) -> Result<&str> {
    config
        .counter
        .resource
        .as_deref()
        .ok_or_else(|| anyhow!("No resource given; pass --resource or set counter.resource"))
}

fn mock_resource(config: &AppConfig) -> String {
    config
        .counter
        .resource
        .clone()
        .unwrap_or_else(|| MOCK_RESOURCE.to_string())
}

fn with_counter<F>(connect: &ConnectArgs, config: &AppConfig, action: F) -> Result<()>
where
    F: FnOnce(&mut Hp5316<Box<dyn BusResource>>) -> Result<()>,
{
    let bus: Box<dyn BusResource> = if connect.mock {
        Box::new(MockBus::new(mock_resource(config)))
    } else {
        let rm = VisaResourceManager::new()?;
        Box::new(bus::ResourceManager::open(&rm, resource(config)?)?)
    };
    let mut counter = Hp5316::with_settings(bus, config.counter.settle_time, &config.settings)?;
    action(&mut counter)
}

fn list() -> Result<()> {
    let resources = bus::list_resources().context("Failed to list VISA resources")?;
    if resources.is_empty() {
        println!("No instruments found");
    }
    for name in resources {
        println!("{}", name);
    }
    Ok(())
}

fn measure<B: BusResource>(mut counter: Hp5316<B>, count: u32, interval: Duration) -> Result<()> {
    info!(
        resource = counter.resource_name(),
        meas_mode = %counter.meas_mode(),
        "Polling {} readings",
        count
    );

    for i in 0..count {
        if i > 0 && !interval.is_zero() {
            std::thread::sleep(interval);
        }
        match counter.measure()? {
            Some(m) => println!(
                "{:?}\t{}\t{}\t{}",
                m.raw, m.value, m.unit, m.overflow
            ),
            None => println!("no reading"),
        }
    }
    Ok(())
}
