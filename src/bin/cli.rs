//! Senselink CLI - talk to a sensor over its UART link
//!
//! Every sensor command is reachable from here, against real hardware or
//! the built-in virtual sensor (`--simulate`).

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use senselink_core::cli::{
    format_commands, format_reading, lookup_command, print_exit_codes,
};
use senselink_core::config::LoggingConfig;
use senselink_core::core::command::ids;
use senselink_core::core::transport::list_ports;
use senselink_core::{
    ByteChannel, CliResult, CommandDescriptor, CommandRegistry, Device, LinkConfig, OutputFormat,
    SerialChannel, VirtualSensor,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;

/// CLI output format
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum Format {
    /// Human-readable text
    #[default]
    Text,
    /// JSON format for scripting
    Json,
    /// Hex dump
    Hex,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Text => OutputFormat::Text,
            Format::Json => OutputFormat::Json,
            Format::Hex => OutputFormat::Hex,
        }
    }
}

/// Senselink CLI
#[derive(Parser, Debug)]
#[command(name = "senselink", version, about = "Sensor UART command/response client", long_about = None)]
struct Cli {
    /// Config file (default: platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Serial port name (e.g., COM3, /dev/ttyUSB0)
    #[arg(short, long, global = true, env = "SENSELINK_PORT")]
    port: Option<String>,

    /// Baud rate
    #[arg(short, long, global = true)]
    baud: Option<u32>,

    /// Reply timeout in milliseconds
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Resends allowed per exchange
    #[arg(short, long, global = true)]
    retries: Option<u32>,

    /// Use the virtual sensor instead of a serial port
    #[arg(long, global = true)]
    simulate: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Text, global = true)]
    format: Format,

    /// Verbose output (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List available serial ports
    ListPorts,

    /// Print the command registry
    Commands,

    /// Run any command by name or hex id (e.g. 0x42)
    Exec {
        /// Command name or id
        command: String,

        /// Value for write-style commands
        #[arg(long)]
        value: Option<u32>,
    },

    /// Read firmware, hardware and protocol versions
    Version,

    /// Read the sensor identity block
    Info,

    /// Read one value (temperature, pressure, status, ...)
    Read {
        /// Command name
        name: String,
    },

    /// Trigger a measurement
    Measure {
        /// Measurement mode byte
        value: u32,
    },

    /// Shut the sensor down
    Shutdown,

    /// Download engineering data
    Engdata {
        /// Write the raw data to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the exit code table
    ExitCodes,
}

type Link = Device<Box<dyn ByteChannel + Send>>;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => return report(&cli, &CliResult::from_anyhow(&e)),
    };

    let _guard = match init_logging(&cli, &config.logging) {
        Ok(guard) => guard,
        Err(e) => return report(&cli, &CliResult::from_anyhow(&e)),
    };

    let result = run(&cli, &config).unwrap_or_else(|e| CliResult::from_anyhow(&e));
    report(&cli, &result)
}

fn report(cli: &Cli, result: &CliResult) -> ExitCode {
    match result {
        CliResult::Error(_, msg) => eprintln!("Error: {msg}"),
        CliResult::Success(Some(msg)) if !cli.quiet => eprintln!("{msg}"),
        CliResult::Success(_) => {}
    }
    result.to_exit_code()
}

/// File settings with command line overrides applied
fn load_config(cli: &Cli) -> anyhow::Result<LinkConfig> {
    let mut config = match &cli.config {
        Some(path) => LinkConfig::load_from(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => LinkConfig::load()?,
    };

    if let Some(port) = &cli.port {
        config.serial.port = port.clone();
    }
    if let Some(baud) = cli.baud {
        config.serial.baud_rate = baud;
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.serial.timeout_ms = timeout_ms;
    }
    if let Some(retries) = cli.retries {
        config.protocol.retries = retries;
    }
    if let Some(file) = &cli.log_file {
        config.logging.file = Some(file.clone());
    }

    config.validate()?;
    Ok(config)
}

fn init_logging(cli: &Cli, logging: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => logging.level.as_str(),
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (file_writer, guard) = match &logging.file {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let name = path.file_name().context("log file path has no file name")?;
            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    let subscriber = tracing_subscriber::registry().with(filter);
    if logging.json {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(file_writer.map(|w| fmt::layer().json().with_writer(w)))
            .try_init()
            .context("failed to init logging")?;
    } else {
        subscriber
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(file_writer.map(|w| fmt::layer().with_ansi(false).with_writer(w)))
            .try_init()
            .context("failed to init logging")?;
    }

    Ok(guard)
}

fn connect(cli: &Cli, config: &LinkConfig) -> anyhow::Result<Link> {
    let channel: Box<dyn ByteChannel + Send> = if cli.simulate {
        info!("Using virtual sensor");
        Box::new(VirtualSensor::new())
    } else {
        let serial = SerialChannel::open(&config.serial)?;
        info!("Connected to {}", serial.connection_info());
        Box::new(serial)
    };

    Ok(Device::new(channel, config.protocol.retries)
        .with_max_engdata_chunks(config.protocol.max_engdata_chunks))
}

fn run(cli: &Cli, config: &LinkConfig) -> anyhow::Result<CliResult> {
    let format = OutputFormat::from(cli.format);

    match &cli.command {
        Commands::ListPorts => list_serial_ports(cli),
        Commands::Commands => {
            let registry = CommandRegistry::standard();
            print!("{}", format_commands(registry.iter(), format));
            Ok(CliResult::success())
        }
        Commands::ExitCodes => {
            print_exit_codes();
            Ok(CliResult::success())
        }
        Commands::Exec { command, value } => {
            let descriptor = match lookup_command(&CommandRegistry::standard(), command) {
                Ok(descriptor) => descriptor,
                Err(result) => return Ok(result),
            };
            let device = connect(cli, config)?;
            execute(&device, &descriptor, *value, format)
        }
        Commands::Version => run_by_id(cli, config, ids::VERSION, None, format),
        Commands::Info => run_by_id(cli, config, ids::SENSOR_INFO, None, format),
        Commands::Read { name } => {
            let descriptor = match lookup_command(&CommandRegistry::standard(), name) {
                Ok(descriptor) => descriptor,
                Err(result) => return Ok(result),
            };
            let device = connect(cli, config)?;
            execute(&device, &descriptor, None, format)
        }
        Commands::Measure { value } => run_by_id(cli, config, ids::MEASURE, Some(*value), format),
        Commands::Shutdown => run_by_id(cli, config, ids::SHUTDOWN, None, format),
        Commands::Engdata { output } => {
            let device = connect(cli, config)?;
            let data = device.engineering_data()?;
            debug!("{:?}", device.stats());

            match output {
                Some(path) => {
                    std::fs::write(path, &data).with_context(|| format!("writing {}", path.display()))?;
                    Ok(CliResult::success_with_message(format!(
                        "Wrote {} bytes to {}",
                        data.len(),
                        path.display()
                    )))
                }
                None => {
                    let descriptor = device.registry().get(ids::ENGDATA)?;
                    let reading = senselink_core::Reading::EngineeringData(data);
                    println!("{}", format_reading(descriptor, &reading, format));
                    Ok(CliResult::success())
                }
            }
        }
    }
}

fn run_by_id(
    cli: &Cli,
    config: &LinkConfig,
    id: u8,
    value: Option<u32>,
    format: OutputFormat,
) -> anyhow::Result<CliResult> {
    let device = connect(cli, config)?;
    let descriptor = device.registry().get(id)?.clone();
    execute(&device, &descriptor, value, format)
}

fn execute(
    device: &Link,
    descriptor: &CommandDescriptor,
    value: Option<u32>,
    format: OutputFormat,
) -> anyhow::Result<CliResult> {
    let reading = device
        .execute(descriptor.id, value)
        .with_context(|| format!("{} (0x{:02x})", descriptor.name, descriptor.id))?;
    debug!("{:?}", device.stats());

    println!("{}", format_reading(descriptor, &reading, format));
    Ok(CliResult::success())
}

fn list_serial_ports(cli: &Cli) -> anyhow::Result<CliResult> {
    let ports = list_ports()?;

    if ports.is_empty() {
        if !cli.quiet {
            println!("No serial ports found.");
        }
        return Ok(CliResult::success());
    }

    match cli.format {
        Format::Json => {
            let json: Vec<serde_json::Value> = ports
                .iter()
                .map(|p| {
                    serde_json::json!({
                        "name": p.port_name,
                        "type": format!("{:?}", p.port_type)
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        _ => {
            for port in &ports {
                println!("{} [{:?}]", port.port_name, port.port_type);
            }
        }
    }

    Ok(CliResult::success())
}
