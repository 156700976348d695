use std::time::{Duration, Instant};

use clap::{Args, Subcommand};
use trigno_frame::{
    BlockLayout, PortMap, AUXILIARY_CHANNELS, AUXILIARY_PORT, COMMAND_PORT, DEFAULT_STATION_HOST,
    PRIMARY_CHANNELS, PRIMARY_PORT,
};
use trigno_session::{SessionConfig, SessionError, TrignoClient};
use trigno_transport::TransportError;

use crate::exit::{frame_error, session_error, CliError, CliResult, TIMEOUT, USAGE};
use crate::output::OutputFormat;

pub mod acquire;
pub mod info;
pub mod mock;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a mock base station until its client quits.
    Mock(MockArgs),
    /// Record from a station for a fixed duration and summarize the samples.
    Acquire(AcquireArgs),
    /// Connect to a station and print its greeting.
    Info(InfoArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Mock(args) => mock::run(args, format),
        Command::Acquire(args) => acquire::run(args, format),
        Command::Info(args) => info::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Ports and block layouts shared by the client and mock commands.
#[derive(Args, Debug, Clone)]
pub struct ChannelArgs {
    /// Command channel port.
    #[arg(long, default_value_t = COMMAND_PORT)]
    pub command_port: u16,
    /// Primary (EMG) data port.
    #[arg(long, default_value_t = PRIMARY_PORT)]
    pub primary_port: u16,
    /// Auxiliary data port.
    #[arg(long, default_value_t = AUXILIARY_PORT)]
    pub auxiliary_port: u16,
    /// Values per block on the primary channel.
    #[arg(long, default_value_t = PRIMARY_CHANNELS)]
    pub primary_channels: usize,
    /// Values per block on the auxiliary channel.
    #[arg(long, default_value_t = AUXILIARY_CHANNELS)]
    pub auxiliary_channels: usize,
}

impl ChannelArgs {
    pub fn ports(&self) -> PortMap {
        PortMap {
            command: self.command_port,
            primary: self.primary_port,
            auxiliary: self.auxiliary_port,
        }
    }

    pub fn layouts(&self) -> CliResult<(BlockLayout, BlockLayout)> {
        let primary = BlockLayout::new(self.primary_channels)
            .map_err(|err| frame_error("invalid --primary-channels", err))?;
        let auxiliary = BlockLayout::new(self.auxiliary_channels)
            .map_err(|err| frame_error("invalid --auxiliary-channels", err))?;
        Ok((primary, auxiliary))
    }
}

/// Where to find the station and how long to wait for it.
#[derive(Args, Debug, Clone)]
pub struct StationArgs {
    /// Station address.
    #[arg(long, env = "TRIGNO_HOST", default_value = DEFAULT_STATION_HOST)]
    pub host: String,
    /// Read deadline on every channel (e.g. 5s, 500ms, or "none").
    #[arg(long, env = "TRIGNO_TIMEOUT", default_value = "5s")]
    pub timeout: String,
    #[command(flatten)]
    pub channels: ChannelArgs,
}

impl StationArgs {
    pub fn session_config(&self) -> CliResult<SessionConfig> {
        let (primary, auxiliary) = self.channels.layouts()?;
        Ok(SessionConfig::new(self.host.clone())
            .with_ports(self.channels.ports())
            .with_timeout(parse_timeout(&self.timeout)?)
            .with_primary_layout(primary)
            .with_auxiliary_layout(auxiliary))
    }
}

#[derive(Args, Debug)]
pub struct MockArgs {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,
    /// Blocks per second on each data channel.
    #[arg(long, default_value_t = trigno_mock::DEFAULT_SAMPLE_RATE_HZ)]
    pub rate: f64,
    /// Greeting sent once the client connected.
    #[arg(long, default_value = trigno_mock::DEFAULT_GREETING)]
    pub greeting: String,
    /// Write deadline on the data channels (e.g. 250ms, or "none").
    #[arg(long, default_value = "250ms")]
    pub write_timeout: String,
    #[command(flatten)]
    pub channels: ChannelArgs,
}

#[derive(Args, Debug)]
pub struct AcquireArgs {
    #[command(flatten)]
    pub station: StationArgs,
    /// How long to acquire (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub duration: String,
    /// Pair this sensor before starting (repeatable).
    #[arg(long, value_name = "ID")]
    pub pair: Vec<u32>,
    /// Blocks to read per channel between checks of the deadline.
    #[arg(long, default_value_t = 200)]
    pub chunk: usize,
}

#[derive(Args, Debug)]
pub struct InfoArgs {
    #[command(flatten)]
    pub station: StationArgs,
    /// Query the paired state of this sensor (repeatable).
    #[arg(long, value_name = "ID")]
    pub sensor: Vec<u32>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Connect, retrying while the station refuses connections.
///
/// Retries stop at the session timeout; without a timeout a single attempt
/// is made.
pub fn connect_with_retry(config: &SessionConfig) -> CliResult<TrignoClient> {
    let start = Instant::now();
    loop {
        match TrignoClient::connect(config) {
            Ok(client) => return Ok(client),
            Err(err) => {
                let Some(timeout) = config.timeout else {
                    return Err(session_error("connect failed", err));
                };
                if !is_retryable_connect_error(&err) {
                    return Err(session_error("connect failed", err));
                }
                if start.elapsed() >= timeout {
                    return Err(CliError::new(
                        TIMEOUT,
                        format!("connect timed out after {timeout:?}"),
                    ));
                }
                std::thread::sleep(Duration::from_millis(50));
            }
        }
    }
}

fn is_retryable_connect_error(err: &SessionError) -> bool {
    match err {
        SessionError::Connect {
            source: TransportError::Connect { source, .. },
            ..
        } => source.kind() == std::io::ErrorKind::ConnectionRefused,
        _ => false,
    }
}

/// Parse `5s`, `150ms` or a bare number of seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

/// Like [`parse_duration`], with `none` meaning no deadline.
pub fn parse_timeout(input: &str) -> CliResult<Option<Duration>> {
    if input.trim().eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    parse_duration(input).map(Some)
}
