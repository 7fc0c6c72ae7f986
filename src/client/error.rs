use std::io;

use thiserror::Error;

use crate::protocol::{ProtocolError, Status};

use super::{pool::PoolClosed, query::QueryError};

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid address {0:?}")]
    InvalidAddress(String),

    #[error("failed to connect: {0}")]
    Connect(#[source] io::Error),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("failed to startup session: {0}")]
    Handshake(String),

    #[error("failed to startup session: unsupported reply of type {0}")]
    UnsupportedHandshake(Status),

    /// `ERROR` reply; holds the text sent by the server.
    #[error("{0}")]
    Server(String),

    #[error("unexpected reply of type {actual}, expected {expected}")]
    UnexpectedReply { expected: Status, actual: Status },

    #[error("server version reply too short ({0} bytes)")]
    ShortVersion(usize),

    #[error("client pool requires at least one session")]
    EmptyPool,

    #[error("client is closed")]
    Closed,

    #[error(transparent)]
    Query(#[from] QueryError),
}

impl From<PoolClosed> for ClientError {
    fn from(_: PoolClosed) -> Self {
        ClientError::Closed
    }
}
