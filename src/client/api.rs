use std::fmt;

use log::{debug, info};
use serde::Serialize;

use crate::{
    config::ClientConfig,
    protocol::{DataKind, Message, Status},
    types::{Host, Timeseries},
};

use super::{
    ClientError, ClientResult,
    pool::Pool,
    session::Session,
    transport::{Connector, Dialer},
};

/// Version of a SysDB server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    /// Build information following the version number, possibly empty.
    pub extra: String,
}

impl ServerVersion {
    fn from_body(body: &[u8]) -> ClientResult<Self> {
        let (raw, extra) = body
            .split_first_chunk::<4>()
            .ok_or(ClientError::ShortVersion(body.len()))?;
        let version = u32::from_be_bytes(*raw);

        Ok(Self {
            major: version / 10000,
            minor: version / 100 % 100,
            patch: version % 100,
            extra: String::from_utf8_lossy(extra).into_owned(),
        })
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}{}", self.major, self.minor, self.patch, self.extra)
    }
}

/// Object returned by a query, depending on the command it ran.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryResult {
    Hosts(Vec<Host>),
    Host(Host),
    Timeseries(Timeseries),
}

/// Client for a SysDB server backed by a fixed pool of sessions.
///
/// All sessions are connected when the client is built. Each call takes one
/// session out of the pool for the whole request/response exchange, so at most
/// `pool_size` requests are in flight and callers beyond that block until a
/// session is returned.
///
/// # Example
/// ```rust,no_run
/// use sysdb::{Client, ClientConfig};
///
/// let client = Client::connect(&ClientConfig::new("unix:/var/run/sysdbd.sock", "admin")).unwrap();
/// let hosts = client.query("LIST hosts;").unwrap();
/// client.close();
/// ```
pub struct Client<C: Connector = Dialer> {
    pool: Pool<Session<C>>,
}

impl Client<Dialer> {
    pub fn connect(config: &ClientConfig) -> ClientResult<Self> {
        let dialer = Dialer::from_config(config)?;
        info!(
            "connecting to {} as '{}' with {} sessions",
            dialer.address(),
            config.user,
            config.pool_size
        );
        Self::with_connector(dialer, &config.user, config.pool_size)
    }
}

impl<C: Connector + Clone> Client<C> {
    /// Builds a client of `size` sessions opened through `connector`. Fails if
    /// any of them cannot be connected.
    pub fn with_connector(connector: C, user: &str, size: usize) -> ClientResult<Self> {
        if size == 0 {
            return Err(ClientError::EmptyPool);
        }

        let mut sessions = Vec::with_capacity(size);
        for _ in 0..size {
            let mut session = Session::new(connector.clone(), user);
            session.connect()?;
            sessions.push(session);
        }

        Ok(Self {
            pool: Pool::new(sessions),
        })
    }
}

impl<C: Connector> Client<C> {
    pub fn pool_size(&self) -> usize {
        self.pool.capacity()
    }

    /// Sends a request on a pooled session and returns the terminal reply.
    ///
    /// Server log notifications received on the way are forwarded to the `log`
    /// facade. An `ERROR` reply is returned as [`ClientError::Server`].
    pub fn call(&self, request: &Message) -> ClientResult<Message> {
        let mut session = self.pool.acquire()?;
        debug!("calling type={} len={}", request.kind, request.body.len());
        session.call(request, |entry| entry.emit())
    }

    /// Checks that the server is responsive.
    pub fn ping(&self) -> ClientResult<()> {
        let reply = self.call(&Message::empty(Status::PING))?;
        expect(Status::OK, &reply)
    }

    pub fn server_version(&self) -> ClientResult<ServerVersion> {
        let reply = self.call(&Message::empty(Status::SERVER_VERSION))?;
        expect(Status::OK, &reply)?;
        ServerVersion::from_body(&reply.body)
    }

    /// Runs a query and decodes the returned object.
    pub fn query(&self, query: &str) -> ClientResult<QueryResult> {
        let reply = self.call(&Message::new(Status::QUERY, query))?;
        expect(Status::DATA, &reply)?;

        let result = match reply.data_kind()? {
            DataKind::HostList => QueryResult::Hosts(reply.unmarshal()?),
            DataKind::Host => QueryResult::Host(reply.unmarshal()?),
            DataKind::Timeseries => QueryResult::Timeseries(reply.unmarshal()?),
        };
        Ok(result)
    }

    /// Closes all sessions, waiting for in-flight calls to finish. Later calls
    /// fail with [`ClientError::Closed`].
    pub fn close(&self) {
        let sessions = self.pool.close();
        let count = sessions.len();
        for mut session in sessions {
            session.close();
        }
        if count > 0 {
            info!("closed client, released {count} sessions");
        }
    }
}

fn expect(expected: Status, reply: &Message) -> ClientResult<()> {
    if reply.kind != expected {
        return Err(ClientError::UnexpectedReply {
            expected,
            actual: reply.kind,
        });
    }
    Ok(())
}
