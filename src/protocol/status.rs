use std::fmt;

use bincode::{Decode, Encode};

/// Type of a protocol message.
///
/// Depending on the direction a status either names the command a client requests
/// or classifies the reply of the server. Both sets share the numeric space, so
/// e.g. [`Status::OK`] and [`Status::IDLE`] are the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Encode, Decode)]
pub struct Status(pub u32);

impl Status {
    /// A command was successful.
    pub const OK: Status = Status(0);
    /// A command has failed; the body holds the error text.
    pub const ERROR: Status = Status(1);
    /// Asynchronous log notification.
    pub const LOG: Status = Status(2);
    /// A successful query returning data.
    pub const DATA: Status = Status(100);

    /// Internal state of an idle connection.
    pub const IDLE: Status = Status(0);
    pub const PING: Status = Status(1);
    pub const STARTUP: Status = Status(2);
    pub const QUERY: Status = Status(3);
    pub const FETCH: Status = Status(4);
    pub const LIST: Status = Status(5);
    pub const LOOKUP: Status = Status(6);
    pub const TIMESERIES: Status = Status(7);
    pub const SERVER_VERSION: Status = Status(8);
}

impl From<u32> for Status {
    fn from(value: u32) -> Self {
        Status(value)
    }
}

impl From<Status> for u32 {
    fn from(value: Status) -> Self {
        value.0
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shape of the document carried in a `DATA` reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataKind {
    /// A list of hosts, produced by `LIST` and `LOOKUP`.
    HostList,
    /// A single host, produced by `FETCH`.
    Host,
    /// A set of time-series, produced by `TIMESERIES`.
    Timeseries,
}

impl DataKind {
    /// Maps the command status found at the start of a `DATA` body.
    pub fn from_status(status: Status) -> Option<Self> {
        match status {
            Status::LIST | Status::LOOKUP => Some(DataKind::HostList),
            Status::FETCH => Some(DataKind::Host),
            Status::TIMESERIES => Some(DataKind::Timeseries),
            _ => None,
        }
    }
}
