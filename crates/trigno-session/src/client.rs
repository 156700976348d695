use tracing::{debug, info, warn};
use trigno_frame::{ChannelRole, SampleMatrix, SampleReader};
use trigno_transport::StationStream;

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::session::{CommandSession, SessionState};

/// A connected Trigno session: the command channel plus both data channels.
///
/// All three channels are opened by [`TrignoClient::connect`] and closed
/// together by [`TrignoClient::close`] (or on drop). Every call blocks the
/// calling thread for at most the configured timeout per read.
pub struct TrignoClient {
    session: CommandSession,
    primary: SampleReader<StationStream>,
    auxiliary: SampleReader<StationStream>,
    master_reply: String,
    closed: bool,
}

impl TrignoClient {
    /// Open all three channels, read the greeting and claim mastership.
    ///
    /// If any channel fails to open, the channels opened before it are shut
    /// down and nothing is left connected.
    pub fn connect(config: &SessionConfig) -> Result<Self> {
        let command = open_channel(config, ChannelRole::Command, &[])?;
        let primary = open_channel(
            config,
            ChannelRole::Primary,
            &[(ChannelRole::Command, &command)],
        )?;
        let auxiliary = open_channel(
            config,
            ChannelRole::Auxiliary,
            &[
                (ChannelRole::Command, &command),
                (ChannelRole::Primary, &primary),
            ],
        )?;

        let mut session = CommandSession::open(command, config.timeout)?;
        let master_reply = session.claim_master()?;
        info!(
            host = %config.host,
            greeting = %session.greeting(),
            master = %master_reply,
            "station session established"
        );

        Ok(Self {
            session,
            primary: SampleReader::new(primary, config.primary),
            auxiliary: SampleReader::new(auxiliary, config.auxiliary),
            master_reply,
            closed: false,
        })
    }

    /// The station's greeting line.
    pub fn greeting(&self) -> &str {
        self.session.greeting()
    }

    /// The reply to the mastership claim.
    pub fn master_reply(&self) -> &str {
        &self.master_reply
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// Start acquisition on both data channels.
    pub fn start(&mut self) -> Result<String> {
        let reply = self.session.start()?;
        info!(%reply, "acquisition started");
        Ok(reply)
    }

    /// Stop acquisition.
    pub fn stop(&mut self) -> Result<String> {
        let reply = self.session.stop()?;
        info!(%reply, "acquisition stopped");
        Ok(reply)
    }

    /// Pair a sensor. `false` for any negative or missing reply.
    pub fn pair_sensor(&mut self, sensor: u32) -> Result<bool> {
        self.session.pair_sensor(sensor)
    }

    /// Whether the station reports the sensor as paired.
    pub fn is_paired(&mut self, sensor: u32) -> Result<bool> {
        self.session.is_paired(sensor)
    }

    /// Send a command outside the fixed vocabulary.
    pub fn send_command(&mut self, line: &str) -> Result<String> {
        self.session.send_command(line)
    }

    /// Read up to `max_blocks` blocks from the primary channel (`None` =
    /// until the read deadline expires or the stream ends).
    pub fn read_primary(&mut self, max_blocks: Option<usize>) -> Result<SampleMatrix> {
        self.read(ChannelRole::Primary, max_blocks)
    }

    /// Read up to `max_blocks` blocks from the auxiliary channel.
    pub fn read_auxiliary(&mut self, max_blocks: Option<usize>) -> Result<SampleMatrix> {
        self.read(ChannelRole::Auxiliary, max_blocks)
    }

    fn read(&mut self, role: ChannelRole, max_blocks: Option<usize>) -> Result<SampleMatrix> {
        if self.closed {
            return Err(SessionError::Disconnected);
        }
        let reader = match role {
            ChannelRole::Auxiliary => &mut self.auxiliary,
            _ => &mut self.primary,
        };
        let matrix = reader.read_blocks(max_blocks)?;
        debug!(channel = %role, samples = matrix.samples(), "read data channel");
        Ok(matrix)
    }

    /// Quit the session and close all three channels.
    ///
    /// Best-effort: a failed QUIT is logged and the channels are closed
    /// anyway. Calling it again does nothing.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if self.session.state() != SessionState::Disconnected {
            match self.session.quit() {
                Ok(reply) => debug!(%reply, "station acknowledged quit"),
                Err(err) => warn!(error = %err, "quit failed, closing channels anyway"),
            }
        }

        let closing = [
            (ChannelRole::Command, self.session.shutdown()),
            (ChannelRole::Primary, shutdown(self.primary.get_ref())),
            (ChannelRole::Auxiliary, shutdown(self.auxiliary.get_ref())),
        ];
        for (role, result) in closing {
            if let Err(err) = result {
                warn!(channel = %role, error = %err, "failed to shut down channel");
            }
        }
        info!("station session closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for TrignoClient {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for TrignoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrignoClient")
            .field("session", &self.session)
            .field("primary", &self.primary.layout())
            .field("auxiliary", &self.auxiliary.layout())
            .field("closed", &self.closed)
            .finish()
    }
}

fn open_channel(
    config: &SessionConfig,
    role: ChannelRole,
    opened: &[(ChannelRole, &StationStream)],
) -> Result<StationStream> {
    let port = config.ports.port(role);
    match StationStream::connect(&config.host, port, config.timeout) {
        Ok(stream) => Ok(stream),
        Err(source) => {
            for (opened_role, stream) in opened {
                if let Err(err) = stream.shutdown() {
                    warn!(channel = %opened_role, error = %err, "failed to shut down channel");
                }
            }
            warn!(channel = %role, port, error = %source, "channel failed to open");
            Err(SessionError::Connect {
                channel: role,
                source,
            })
        }
    }
}

fn shutdown(stream: &StationStream) -> Result<()> {
    stream.shutdown().map_err(Into::into)
}
