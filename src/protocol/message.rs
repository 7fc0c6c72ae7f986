use std::io::{self, Read, Write};

use bincode::{
    Decode, Encode,
    config::{BigEndian, Configuration, Fixint},
    decode_from_slice, encode_into_slice,
};
use log::{Level, log, trace};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::types::LogPriority;

use super::{DataKind, Status};

/// Size of the fixed frame header in bytes.
pub const HEADER_SIZE: usize = 8;

/// Size of the status prefix of `DATA` and `LOG` bodies.
const STATUS_PREFIX_SIZE: usize = 4;

/// Upper bound for the up-front body allocation; larger bodies grow while reading.
const READ_RESERVE: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("transport I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("connection closed by peer")]
    Closed,
    #[error("truncated frame: stream ended {missing} bytes short of the declared {part}")]
    Truncated { part: &'static str, missing: usize },
    #[error("message body of {0} bytes does not fit a frame")]
    BodyTooLarge(usize),
    #[error("failed to encode frame header: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    #[error("failed to decode frame header: {0}")]
    Decode(#[from] bincode::error::DecodeError),
    #[error("message of type {0} is not a DATA message")]
    NotData(Status),
    #[error("unsupported DATA status {0}")]
    UnsupportedStatus(Status),
    #[error("DATA message body too short ({0} bytes)")]
    BodyTooShort(usize),
    #[error("failed to unmarshal DATA body: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProtocolError {
    /// Whether the stream ended inside a frame. Such a stream is out of sync with
    /// the server and cannot be used for another frame. A stream that ended
    /// between frames is [`ProtocolError::Closed`] instead.
    pub fn is_truncated(&self) -> bool {
        matches!(self, ProtocolError::Truncated { .. })
    }
}

#[derive(Debug, Encode, Decode)]
struct Header {
    kind: Status,
    len: u32,
}

fn config() -> Configuration<BigEndian, Fixint> {
    bincode::config::standard()
        .with_big_endian()
        .with_fixed_int_encoding()
}

/// A raw message of the SysDB front-end protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub kind: Status,
    pub body: Vec<u8>,
}

impl Message {
    pub fn new(kind: Status, body: impl Into<Vec<u8>>) -> Self {
        Self {
            kind,
            body: body.into(),
        }
    }

    pub fn empty(kind: Status) -> Self {
        Self::new(kind, Vec::new())
    }

    /// Body interpreted as text, e.g. the error of an `ERROR` reply.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Writes the message as one frame. The header and body are written with a
    /// single `write_all` so a blocking writer never emits a partial frame on
    /// success.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), ProtocolError> {
        let len =
            u32::try_from(self.body.len()).map_err(|_| ProtocolError::BodyTooLarge(self.body.len()))?;
        let header = Header {
            kind: self.kind,
            len,
        };

        let mut frame = vec![0; HEADER_SIZE + self.body.len()];
        encode_into_slice(header, &mut frame[..HEADER_SIZE], config())?;
        frame[HEADER_SIZE..].copy_from_slice(&self.body);

        writer.write_all(&frame)?;
        writer.flush()?;
        trace!("wrote frame type={} len={len}", self.kind);
        Ok(())
    }

    /// Reads exactly one frame.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self, ProtocolError> {
        let raw = read_header(reader)?;
        let (header, _): (Header, usize) = decode_from_slice(&raw, config())?;

        let expected = header.len as usize;
        let mut body = Vec::with_capacity(expected.min(READ_RESERVE));
        let read = reader
            .take(u64::from(header.len))
            .read_to_end(&mut body)?;
        if read < expected {
            return Err(ProtocolError::Truncated {
                part: "body",
                missing: expected - read,
            });
        }

        trace!("read frame type={} len={}", header.kind, header.len);
        Ok(Self {
            kind: header.kind,
            body,
        })
    }

    /// Determines the shape of the document in a `DATA` message.
    pub fn data_kind(&self) -> Result<DataKind, ProtocolError> {
        let (status, _) = self.data_prefix()?;
        DataKind::from_status(status).ok_or(ProtocolError::UnsupportedStatus(status))
    }

    /// Parses the document of a `DATA` message. An empty body yields the default
    /// value of `T`.
    pub fn unmarshal<T>(&self) -> Result<T, ProtocolError>
    where
        T: DeserializeOwned + Default,
    {
        if self.kind != Status::DATA {
            return Err(ProtocolError::NotData(self.kind));
        }
        if self.body.is_empty() {
            return Ok(T::default());
        }

        let (_, document) = self.data_prefix()?;
        Ok(serde_json::from_slice(document)?)
    }

    fn data_prefix(&self) -> Result<(Status, &[u8]), ProtocolError> {
        if self.kind != Status::DATA {
            return Err(ProtocolError::NotData(self.kind));
        }
        split_status(&self.body).ok_or(ProtocolError::BodyTooShort(self.body.len()))
    }
}

fn read_header<R: Read>(reader: &mut R) -> Result<[u8; HEADER_SIZE], ProtocolError> {
    let mut raw = [0; HEADER_SIZE];
    let mut filled = 0;

    while filled < HEADER_SIZE {
        match reader.read(&mut raw[filled..]) {
            Ok(0) if filled == 0 => return Err(ProtocolError::Closed),
            Ok(0) => {
                return Err(ProtocolError::Truncated {
                    part: "header",
                    missing: HEADER_SIZE - filled,
                });
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(raw)
}

fn split_status(body: &[u8]) -> Option<(Status, &[u8])> {
    let (prefix, rest) = body.split_first_chunk::<STATUS_PREFIX_SIZE>()?;
    Some((Status(u32::from_be_bytes(*prefix)), rest))
}

/// Asynchronous log notification sent by the server ahead of a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerLog {
    /// Raw priority sub-header, absent if the body was too short to carry one.
    pub priority: Option<u32>,
    pub text: String,
}

impl ServerLog {
    pub fn from_message(message: &Message) -> Self {
        match split_status(&message.body) {
            Some((priority, text)) => Self {
                priority: Some(priority.0),
                text: String::from_utf8_lossy(text).into_owned(),
            },
            None => Self {
                priority: None,
                text: message.text(),
            },
        }
    }

    pub fn level(&self) -> Level {
        self.priority
            .and_then(|p| LogPriority::try_from(p).ok())
            .map_or(Level::Info, LogPriority::level)
    }

    /// Forwards the notification to the `log` facade.
    pub fn emit(&self) {
        log!(target: "sysdb::server", self.level(), "{}", self.text);
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::BTreeMap,
        io::{Cursor, Seek, SeekFrom},
    };

    use super::*;

    fn data(status: Status, document: &str) -> Message {
        let mut body = status.0.to_be_bytes().to_vec();
        body.extend_from_slice(document.as_bytes());
        Message::new(Status::DATA, body)
    }

    #[test]
    fn read_write_message() {
        let mut stream = Cursor::new(Vec::new());
        let messages = vec![
            Message::new(Status::QUERY, "LIST hosts;"),
            Message::empty(Status::PING),
            Message::new(Status::DATA, vec![0, 0, 0, 5, b'[', b']']),
        ];

        for message in &messages {
            message.write_to(&mut stream).unwrap();
        }
        stream.seek(SeekFrom::Start(0)).unwrap();

        for message in messages {
            assert_eq!(Message::read_from(&mut stream).unwrap(), message);
        }
    }

    #[test]
    fn header_layout() {
        let mut out = Vec::new();
        Message::new(Status::DATA, "abc").write_to(&mut out).unwrap();

        assert_eq!(out, vec![0, 0, 0, 100, 0, 0, 0, 3, b'a', b'b', b'c']);
    }

    #[test]
    fn read_truncated_header() {
        let mut stream = Cursor::new(vec![0, 0, 0, 3, 0]);
        let err = Message::read_from(&mut stream).unwrap_err();

        assert!(err.is_truncated());
        assert!(matches!(
            err,
            ProtocolError::Truncated {
                part: "header",
                missing: 3
            }
        ));
    }

    #[test]
    fn read_from_closed_stream() {
        let mut stream = Cursor::new(Vec::new());
        let err = Message::read_from(&mut stream).unwrap_err();

        assert!(matches!(err, ProtocolError::Closed));
        assert!(!err.is_truncated());
    }

    #[test]
    fn read_truncated_body() {
        let mut stream = Cursor::new(vec![0, 0, 0, 3, 0, 0, 0, 10, b'x', b'y']);
        let err = Message::read_from(&mut stream).unwrap_err();

        assert!(matches!(
            err,
            ProtocolError::Truncated {
                part: "body",
                missing: 8
            }
        ));
    }

    #[test]
    fn data_kind_of_reply() {
        let inputs = vec![
            (Status::LIST, DataKind::HostList),
            (Status::LOOKUP, DataKind::HostList),
            (Status::FETCH, DataKind::Host),
            (Status::TIMESERIES, DataKind::Timeseries),
        ];

        for (status, expected) in inputs {
            assert_eq!(data(status, "{}").data_kind().unwrap(), expected);
        }
    }

    #[test]
    fn data_kind_rejects_other_messages() {
        let err = Message::new(Status::OK, vec![0, 0, 0, 5]).data_kind().unwrap_err();
        assert!(matches!(err, ProtocolError::NotData(Status::OK)));

        let err = data(Status::QUERY, "[]").data_kind().unwrap_err();
        assert!(matches!(err, ProtocolError::UnsupportedStatus(Status::QUERY)));

        let err = Message::new(Status::DATA, vec![0, 5]).data_kind().unwrap_err();
        assert!(matches!(err, ProtocolError::BodyTooShort(2)));
    }

    #[test]
    fn unmarshal_document() {
        let message = data(Status::LIST, r#"{"a": ["x", "y"]}"#);
        let value: BTreeMap<String, Vec<String>> = message.unmarshal().unwrap();

        assert_eq!(value["a"], vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn unmarshal_empty_body() {
        let value: Vec<String> = Message::empty(Status::DATA).unmarshal().unwrap();
        assert!(value.is_empty());
    }

    #[test]
    fn unmarshal_errors() {
        let err = Message::new(Status::DATA, vec![0, 0, 5])
            .unmarshal::<Vec<String>>()
            .unwrap_err();
        assert!(matches!(err, ProtocolError::BodyTooShort(3)));

        let err = Message::new(Status::ERROR, "nope")
            .unmarshal::<Vec<String>>()
            .unwrap_err();
        assert!(matches!(err, ProtocolError::NotData(Status::ERROR)));

        let err = data(Status::LIST, "[1, 2")
            .unmarshal::<Vec<u32>>()
            .unwrap_err();
        assert!(matches!(err, ProtocolError::Json(_)));
    }

    #[test]
    fn server_log_from_message() {
        let mut body = 4u32.to_be_bytes().to_vec();
        body.extend_from_slice(b"disk almost full");
        let entry = ServerLog::from_message(&Message::new(Status::LOG, body));

        assert_eq!(entry.priority, Some(4));
        assert_eq!(entry.text, "disk almost full");
        assert_eq!(entry.level(), Level::Warn);

        let entry = ServerLog::from_message(&Message::new(Status::LOG, "hi"));
        assert_eq!(entry.priority, None);
        assert_eq!(entry.text, "hi");
        assert_eq!(entry.level(), Level::Info);
    }
}
