use std::io::ErrorKind;
use std::thread::JoinHandle;

use tracing::{debug, info, warn};
use trigno_frame::{ChannelRole, FrameError, LineReader, LineWriter, PortMap};
use trigno_transport::{StationListener, StationStream};

use crate::config::StationConfig;
use crate::error::{Result, StationError};
use crate::generator::{sample_period, Generator};

/// Counters reported when the station shuts down.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StationSummary {
    /// Command lines processed, including unknown ones.
    pub commands: usize,
    /// START commands that actually started the generators.
    pub acquisitions: usize,
    /// Blocks written on the primary channel.
    pub primary_blocks: u64,
    /// Blocks written on the auxiliary channel.
    pub auxiliary_blocks: u64,
}

/// A stand-in for the base station.
///
/// Serves exactly one client: one accepted connection per port, then the
/// command loop until QUIT or until the client closes the command channel.
/// Sensor pairing is not implemented; pairing commands get
/// `INVALID COMMAND` like any other unknown line.
pub struct MockStation {
    config: StationConfig,
    command: StationListener,
    primary: StationListener,
    auxiliary: StationListener,
}

impl MockStation {
    /// Bind all three listeners.
    ///
    /// The command listener is bound last, so a client that reaches it also
    /// finds both data ports listening.
    pub fn bind(config: StationConfig) -> Result<Self> {
        sample_period(config.sample_rate_hz)?;
        let auxiliary = StationListener::bind(&config.host, config.ports.auxiliary, "auxiliary")?;
        let primary = StationListener::bind(&config.host, config.ports.primary, "primary")?;
        let command = StationListener::bind(&config.host, config.ports.command, "command")?;
        Ok(Self {
            config,
            command,
            primary,
            auxiliary,
        })
    }

    /// The ports actually bound (resolves ephemeral ports).
    pub fn ports(&self) -> PortMap {
        PortMap {
            command: self.command.port(),
            primary: self.primary.port(),
            auxiliary: self.auxiliary.port(),
        }
    }

    pub fn config(&self) -> &StationConfig {
        &self.config
    }

    /// Accept one client on each port and serve it until it quits.
    pub fn run(self) -> Result<StationSummary> {
        info!(ports = ?self.ports(), "waiting for station client");
        let command = self.command.accept()?;
        let primary = self.primary.accept()?;
        let auxiliary = self.auxiliary.accept()?;
        info!(peer = %command.peer_addr(), "station client connected");

        primary.set_write_timeout(self.config.write_timeout)?;
        auxiliary.set_write_timeout(self.config.write_timeout)?;
        let (reader, writer) = LineReader::split(command)?;

        let mut station = CommandLoop {
            config: self.config,
            reader,
            writer,
            primary,
            auxiliary,
            acquisition: None,
            summary: StationSummary::default(),
        };
        let result = station.serve();
        station.finish();
        result.map(|()| station.summary)
    }

    /// Run the station on its own thread.
    pub fn spawn(self) -> Result<StationHandle> {
        let ports = self.ports();
        let name = "trigno-station".to_string();
        let handle = std::thread::Builder::new()
            .name(name.clone())
            .spawn(move || self.run())
            .map_err(|source| StationError::Spawn { name, source })?;
        Ok(StationHandle { ports, handle })
    }
}

impl std::fmt::Debug for MockStation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockStation")
            .field("config", &self.config)
            .field("ports", &self.ports())
            .finish()
    }
}

/// A station running on a background thread.
#[derive(Debug)]
pub struct StationHandle {
    ports: PortMap,
    handle: JoinHandle<Result<StationSummary>>,
}

impl StationHandle {
    pub fn ports(&self) -> PortMap {
        self.ports
    }

    /// Wait for the station to finish serving its client.
    pub fn join(self) -> Result<StationSummary> {
        self.handle
            .join()
            .map_err(|_| StationError::StationPanicked)?
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Both generators of one START..STOP span.
struct Acquisition {
    primary: Generator,
    auxiliary: Generator,
}

impl Acquisition {
    fn start(
        config: &StationConfig,
        primary: &StationStream,
        auxiliary: &StationStream,
    ) -> Result<Self> {
        let primary = Generator::spawn(
            ChannelRole::Primary,
            primary.try_clone()?,
            config.primary,
            config.sample_rate_hz,
        )?;
        let auxiliary = match Generator::spawn(
            ChannelRole::Auxiliary,
            auxiliary.try_clone()?,
            config.auxiliary,
            config.sample_rate_hz,
        ) {
            Ok(generator) => generator,
            Err(err) => {
                if let Err(stop_err) = primary.stop() {
                    warn!(error = %stop_err, "aborted start left primary generator unjoined");
                }
                return Err(err);
            }
        };
        Ok(Self { primary, auxiliary })
    }

    /// Stop and join both generators. Both are joined even if one panicked.
    fn stop(self) -> Result<(u64, u64)> {
        let primary = self.primary.stop();
        let auxiliary = self.auxiliary.stop();
        Ok((primary?, auxiliary?))
    }
}

enum Reply {
    Continue(&'static str),
    Quit(&'static str),
}

struct CommandLoop {
    config: StationConfig,
    reader: LineReader<StationStream>,
    writer: LineWriter<StationStream>,
    primary: StationStream,
    auxiliary: StationStream,
    acquisition: Option<Acquisition>,
    summary: StationSummary,
}

impl CommandLoop {
    fn serve(&mut self) -> Result<()> {
        self.writer.send_line(&self.config.greeting)?;

        loop {
            let line = match self.reader.read_line() {
                Ok(line) => line,
                Err(FrameError::ConnectionClosed) => {
                    info!("station client closed the command channel");
                    return Ok(());
                }
                Err(FrameError::Io(err)) if err.kind() == ErrorKind::ConnectionReset => {
                    info!("station client reset the command channel");
                    return Ok(());
                }
                Err(err) => return Err(err.into()),
            };

            let command = line.trim();
            debug!(%command, "processing command");
            self.summary.commands += 1;

            match self.process(command)? {
                Reply::Continue(reply) => self.writer.send_line(reply)?,
                Reply::Quit(reply) => {
                    self.writer.send_line(reply)?;
                    return Ok(());
                }
            }
        }
    }

    fn process(&mut self, command: &str) -> Result<Reply> {
        let reply = match command {
            "QUIT" => return Ok(Reply::Quit("BYE")),
            "MASTER" => "NEW MASTER",
            "START" => {
                if self.acquisition.is_none() {
                    self.acquisition =
                        Some(Acquisition::start(&self.config, &self.primary, &self.auxiliary)?);
                    self.summary.acquisitions += 1;
                    info!(rate_hz = self.config.sample_rate_hz, "acquisition started");
                }
                "OK"
            }
            "STOP" => {
                self.stop_acquisition()?;
                "OK"
            }
            other => {
                warn!(command = %other, "unknown command");
                "INVALID COMMAND"
            }
        };
        Ok(Reply::Continue(reply))
    }

    /// Join both generators. Returns only once neither can write again.
    fn stop_acquisition(&mut self) -> Result<()> {
        let Some(acquisition) = self.acquisition.take() else {
            return Ok(());
        };
        let (primary, auxiliary) = acquisition.stop()?;
        self.summary.primary_blocks += primary;
        self.summary.auxiliary_blocks += auxiliary;
        info!(primary, auxiliary, "acquisition stopped");
        Ok(())
    }

    /// Stop any running acquisition and close all client connections.
    fn finish(&mut self) {
        if let Err(err) = self.stop_acquisition() {
            warn!(error = %err, "failed to stop acquisition during shutdown");
        }

        let closing = [
            (ChannelRole::Command, self.reader.get_ref()),
            (ChannelRole::Primary, &self.primary),
            (ChannelRole::Auxiliary, &self.auxiliary),
        ];
        for (role, stream) in closing {
            if let Err(err) = stream.shutdown() {
                warn!(channel = %role, error = %err, "failed to close client connection");
            }
        }
        info!(commands = self.summary.commands, "station closed");
    }
}
