pub mod client;
pub mod config;
pub mod protocol;
pub mod types;

pub use client::{Client, ClientError, ClientResult, Identifier, QueryResult, query_string};
pub use config::ClientConfig;
pub use protocol::{Message, Status};
