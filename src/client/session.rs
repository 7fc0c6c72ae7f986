//! A single, self-healing connection to a SysDB server.
//!
//! A [`Session`] is either connected, holding exactly one transport stream, or
//! disconnected with no stream at all. A broken stream is never repaired; it is
//! dropped and replaced by a freshly dialed and authenticated one.
//!
//! # Reconnecting
//!
//! The protocol has no request identifiers, so a command cannot safely be sent
//! twice. A failed [`Session::send`] or [`Session::receive`] therefore closes the
//! stream and makes exactly one attempt to reconnect and repeat the operation. If
//! reconnecting fails too, the first error is reported.
//!
//! A stream that ended in the middle of a frame is out of sync with the server.
//! Such a read is not repeated; the session is just closed.
use log::{debug, info, warn};

use crate::protocol::{Message, ProtocolError, ServerLog, Status};

use super::{ClientError, ClientResult, transport::Connector};

pub struct Session<C: Connector> {
    connector: C,
    user: String,
    stream: Option<C::Stream>,
}

impl<C: Connector> Session<C> {
    /// Creates a disconnected session.
    pub fn new(connector: C, user: impl Into<String>) -> Self {
        Self {
            connector,
            user: user.into(),
            stream: None,
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Dials a new stream and starts up a session as the configured user,
    /// replacing any existing stream.
    pub fn connect(&mut self) -> ClientResult<()> {
        self.close();

        let stream = self.connector.connect().map_err(ClientError::Connect)?;
        self.stream = Some(stream);

        if let Err(e) = self.startup() {
            self.close();
            return Err(e);
        }
        info!("started session for user '{}'", self.user);
        Ok(())
    }

    fn startup(&mut self) -> ClientResult<()> {
        self.write(&Message::new(Status::STARTUP, self.user.as_bytes()))?;

        let reply = self.read()?;
        match reply.kind {
            Status::OK => Ok(()),
            Status::ERROR => Err(ClientError::Handshake(reply.text())),
            other => Err(ClientError::UnsupportedHandshake(other)),
        }
    }

    /// Releases the stream. Safe to call on a disconnected session.
    pub fn close(&mut self) {
        if self.stream.take().is_some() {
            debug!("closed session for user '{}'", self.user);
        }
    }

    /// Sends a message, reconnecting once if the stream is broken or missing.
    pub fn send(&mut self, message: &Message) -> ClientResult<()> {
        let first = match self.write(message) {
            Ok(()) => return Ok(()),
            Err(e @ ProtocolError::BodyTooLarge(_)) => return Err(e.into()),
            Err(_) if !self.is_connected() => None,
            Err(e) => {
                warn!("send failed, reconnecting: {e}");
                self.close();
                Some(ClientError::from(e))
            }
        };

        if let Err(e) = self.connect() {
            return Err(first.unwrap_or(e));
        }
        self.write(message).map_err(|e| {
            self.close();
            e.into()
        })
    }

    /// Receives the next message, reconnecting once if the stream is broken or
    /// missing.
    pub fn receive(&mut self) -> ClientResult<Message> {
        let first = match self.read() {
            Ok(message) => return Ok(message),
            Err(_) if !self.is_connected() => None,
            Err(e) if e.is_truncated() => {
                self.close();
                return Err(e.into());
            }
            Err(e) => {
                warn!("receive failed, reconnecting: {e}");
                self.close();
                Some(ClientError::from(e))
            }
        };

        if let Err(e) = self.connect() {
            return Err(first.unwrap_or(e));
        }
        self.read().map_err(|e| {
            self.close();
            e.into()
        })
    }

    /// Sends a request and waits for its reply.
    ///
    /// `LOG` notifications arriving before the reply are handed to `on_log` in
    /// order. An `ERROR` reply fails the call with the text sent by the server;
    /// any other reply is returned.
    pub fn call<F>(&mut self, request: &Message, mut on_log: F) -> ClientResult<Message>
    where
        F: FnMut(ServerLog),
    {
        self.send(request)?;
        loop {
            let reply = self.receive()?;
            match reply.kind {
                Status::LOG => on_log(ServerLog::from_message(&reply)),
                Status::ERROR => return Err(ClientError::Server(reply.text())),
                _ => return Ok(reply),
            }
        }
    }

    fn write(&mut self, message: &Message) -> Result<(), ProtocolError> {
        match self.stream.as_mut() {
            Some(stream) => message.write_to(stream),
            None => Err(not_connected()),
        }
    }

    fn read(&mut self) -> Result<Message, ProtocolError> {
        match self.stream.as_mut() {
            Some(stream) => Message::read_from(stream),
            None => Err(not_connected()),
        }
    }
}

fn not_connected() -> ProtocolError {
    ProtocolError::Io(std::io::Error::new(
        std::io::ErrorKind::NotConnected,
        "session is not connected",
    ))
}
