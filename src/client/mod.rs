//! SysDB client.
//!
//! [`Client`] is the entry point for applications: it owns a fixed pool of
//! [`Session`]s, each a single connection that transparently reconnects once
//! after a transport failure. Lower level access is available through
//! [`Session`] directly, e.g. to drive the protocol over a custom [`Connector`].
//!
//! # Addresses
//!
//! A server address is either `host:port` for TCP, or a UNIX domain socket given
//! as an absolute path or prefixed with `unix:`.
//!
//! # Concurrency
//!
//! A client may be shared between threads. Requests on one session are strictly
//! sequential since the protocol does not support pipelining; requests on
//! different sessions are unordered relative to each other.
mod api;
mod error;
mod pool;
mod query;
mod session;
#[cfg(test)]
mod testing;
mod transport;

pub use api::{Client, QueryResult, ServerVersion};
pub use error::{ClientError, ClientResult};
pub use pool::{Pool, PoolClosed, Pooled};
pub use query::{Arg, Identifier, QueryError, escape_string, query_string};
pub use session::Session;
pub use transport::{Address, Connector, Dialer, Transport};
