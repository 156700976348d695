use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use tracing::{debug, warn};
use trigno_frame::{FrameError, LineReader, LineWriter};
use trigno_transport::StationStream;

use crate::command::{is_paired_reply, pairing_complete, pairing_initiated, Command};
use crate::error::{Result, SessionError};

/// Where a command session stands.
///
/// Replies are not validated against the state: the station is the
/// authority, the state only records which acknowledged commands got us here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Greeting received, mastership not claimed yet.
    Connected,
    /// Mastership claimed, not acquiring.
    Master,
    /// START acknowledged.
    Acquiring,
    /// QUIT sent. No further commands are accepted.
    Disconnected,
}

/// The command channel of a station session.
///
/// One command is in flight at a time. Every read is bounded by the
/// channel's deadline; an expired deadline fails that call with
/// [`SessionError::Timeout`] and leaves the session usable.
pub struct CommandSession<R = StationStream, W = StationStream> {
    reader: LineReader<R>,
    writer: LineWriter<W>,
    timeout: Option<Duration>,
    greeting: String,
    state: SessionState,
}

impl CommandSession {
    /// Take over a connected command channel and read the station greeting.
    ///
    /// `timeout` becomes the read and write deadline of the channel.
    pub fn open(stream: StationStream, timeout: Option<Duration>) -> Result<Self> {
        stream.set_read_timeout(timeout)?;
        stream.set_write_timeout(timeout)?;
        let (reader, writer) = LineReader::split(stream)?;
        Self::from_lines(reader, writer, timeout)
    }

    /// Shut down the command channel.
    pub fn shutdown(&self) -> Result<()> {
        self.reader.get_ref().shutdown().map_err(Into::into)
    }
}

impl<R: Read, W: Write> CommandSession<R, W> {
    /// Build a session over any reader/writer pair and read the greeting.
    ///
    /// `timeout` is only used to report [`SessionError::Timeout`]; applying
    /// the deadline is up to the streams.
    pub fn new(reader: R, writer: W, timeout: Option<Duration>) -> Result<Self> {
        Self::from_lines(LineReader::new(reader), LineWriter::new(writer), timeout)
    }

    fn from_lines(
        reader: LineReader<R>,
        writer: LineWriter<W>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let mut session = Self {
            reader,
            writer,
            timeout,
            greeting: String::new(),
            state: SessionState::Connected,
        };
        let greeting = session.recv()?;
        debug!(%greeting, "station greeting");
        session.greeting = greeting;
        Ok(session)
    }

    /// The first line the station sent. Opaque version identifier.
    pub fn greeting(&self) -> &str {
        &self.greeting
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Send any command line and return the single-line reply.
    pub fn send_command(&mut self, line: &str) -> Result<String> {
        self.send(line)?;
        self.recv()
    }

    /// Claim mastership. Any reply counts as success and is returned.
    pub fn claim_master(&mut self) -> Result<String> {
        let reply = self.exchange(Command::Master)?;
        self.state = SessionState::Master;
        Ok(reply)
    }

    /// Start acquisition.
    pub fn start(&mut self) -> Result<String> {
        let reply = self.exchange(Command::Start)?;
        self.state = SessionState::Acquiring;
        Ok(reply)
    }

    /// Stop acquisition.
    ///
    /// The station guarantees its data producers have ceased by the time
    /// the acknowledgement arrives.
    pub fn stop(&mut self) -> Result<String> {
        let reply = self.exchange(Command::Stop)?;
        self.state = SessionState::Master;
        Ok(reply)
    }

    /// Send QUIT. The session is disconnected afterwards whether or not the
    /// station acknowledged.
    pub fn quit(&mut self) -> Result<String> {
        let result = self.exchange(Command::Quit);
        self.state = SessionState::Disconnected;
        result
    }

    /// Pair a sensor.
    ///
    /// The station answers twice: first that pairing was initiated, then,
    /// once the sensor is found, that it completed. No second read happens
    /// if the first reply lacks the initiated token. A timeout on either
    /// reply is a failed pairing, not an error.
    pub fn pair_sensor(&mut self, sensor: u32) -> Result<bool> {
        let command = Command::pair(sensor)?;
        let Some(first) = negative_on_timeout(self.exchange(command))? else {
            return Ok(false);
        };
        if !pairing_initiated(&first) {
            debug!(sensor, reply = %first, "pairing not initiated");
            return Ok(false);
        }

        let Some(second) = negative_on_timeout(self.recv())? else {
            return Ok(false);
        };
        let paired = pairing_complete(&second);
        debug!(sensor, reply = %second, paired, "pairing finished");
        Ok(paired)
    }

    /// Ask whether a sensor is paired. Only an exact `YES` counts.
    pub fn is_paired(&mut self, sensor: u32) -> Result<bool> {
        let command = Command::paired_query(sensor)?;
        let reply = negative_on_timeout(self.exchange(command))?;
        Ok(reply.is_some_and(|reply| is_paired_reply(&reply)))
    }

    fn exchange(&mut self, command: Command) -> Result<String> {
        self.send(&command.to_string())?;
        self.recv()
    }

    fn send(&mut self, line: &str) -> Result<()> {
        if self.state == SessionState::Disconnected {
            return Err(SessionError::Disconnected);
        }
        self.writer
            .send_line(line)
            .map_err(|err| self.classify(err))?;
        debug!(command = %line, "sent command");
        Ok(())
    }

    fn recv(&mut self) -> Result<String> {
        let reply = self.reader.read_line().map_err(|err| self.classify(err))?;
        debug!(%reply, "received reply");
        Ok(reply)
    }

    fn classify(&self, err: FrameError) -> SessionError {
        match err {
            err if err.is_timeout() => SessionError::Timeout(self.timeout.unwrap_or_default()),
            FrameError::ConnectionClosed => SessionError::Disconnected,
            FrameError::Io(io) if is_disconnect(io.kind()) => SessionError::Disconnected,
            other => SessionError::Frame(other),
        }
    }
}

fn is_disconnect(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::BrokenPipe | ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted
    )
}

fn negative_on_timeout(result: Result<String>) -> Result<Option<String>> {
    match result {
        Ok(reply) => Ok(Some(reply)),
        Err(SessionError::Timeout(after)) => {
            warn!(?after, "no reply from station, treating as negative");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

impl<R, W> std::fmt::Debug for CommandSession<R, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSession")
            .field("greeting", &self.greeting)
            .field("state", &self.state)
            .field("timeout", &self.timeout)
            .finish()
    }
}
