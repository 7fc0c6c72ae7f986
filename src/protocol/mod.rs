//! SysDB front-end wire protocol.
//!
//! This module defines the framing used between a SysDB client and server instance,
//! the status codes carried in every frame and the helpers needed to interpret the
//! body of a data-bearing reply.
//!
//! # Overview
//!
//! Every exchange is a strict request/response pair on one connection: the client
//! writes a single frame and reads frames back until it sees a terminal reply. The
//! server may interleave asynchronous `LOG` frames before the terminal reply; these
//! carry operator-visible diagnostics and never replace the actual answer.
//!
//! # Key Components
//!
//! - [`Status`]: Numeric message type shared by requests and replies.
//! - [`Message`]: One decoded frame; a status plus its raw body.
//! - [`DataKind`]: Shape of the document carried in a `DATA` reply.
//! - [`ServerLog`]: Decoded asynchronous log notification.
//!
//! # Binary Format
//!
//! - Each frame begins with an 8 byte header: the status code followed by the body
//!   length, both unsigned 32-bit big-endian integers.
//! - The body follows verbatim. Its interpretation depends on the status.
//! - `DATA` bodies start with a 4 byte status naming the command that produced them,
//!   followed by a UTF-8 JSON document.
//!
//! Streams have to be in blocking mode. A partially written or read frame leaves
//! client and server out of sync and the connection must be discarded.
//!
//! # See Also
//!
//! - [`client`](crate::client): Sessions and the pooled client built on this codec.
//! - [`types`](crate::types): Objects decoded from `DATA` bodies.
mod message;
mod status;

pub use message::{HEADER_SIZE, Message, ProtocolError, ServerLog};
pub use status::{DataKind, Status};
