use std::{
    fmt,
    io::{self, Read, Write},
    net::TcpStream,
    path::PathBuf,
    str::FromStr,
    time,
};

#[cfg(unix)]
use std::os::unix::net::UnixStream;

use log::debug;

use crate::config::ClientConfig;

use super::{ClientError, ClientResult};

/// Location of a SysDB server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    /// `host:port`
    Tcp(String),
    /// UNIX domain socket, given as `unix:<path>` or an absolute path.
    Unix(PathBuf),
}

impl FromStr for Address {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(path) = s.strip_prefix("unix:") {
            if path.is_empty() {
                return Err(ClientError::InvalidAddress(s.to_string()));
            }
            return Ok(Address::Unix(PathBuf::from(path)));
        }

        match s {
            "" => Err(ClientError::InvalidAddress(s.to_string())),
            s if s.starts_with('/') => Ok(Address::Unix(PathBuf::from(s))),
            s => Ok(Address::Tcp(s.to_string())),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Tcp(addr) => f.write_str(addr),
            Address::Unix(path) => write!(f, "unix:{}", path.display()),
        }
    }
}

/// Opens transport streams for a session.
///
/// A session calls [`Connector::connect`] on construction and again whenever it
/// has to replace a broken stream.
pub trait Connector {
    type Stream: Read + Write;

    fn connect(&self) -> io::Result<Self::Stream>;
}

/// Stream to a SysDB server over TCP or a UNIX domain socket.
#[derive(Debug)]
pub enum Transport {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl Read for Transport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Transport::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            Transport::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for Transport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Transport::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            Transport::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Transport::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            Transport::Unix(stream) => stream.flush(),
        }
    }
}

/// Production [`Connector`] dialing an [`Address`] in blocking mode.
#[derive(Debug, Clone)]
pub struct Dialer {
    address: Address,
    read_timeout: Option<time::Duration>,
    write_timeout: Option<time::Duration>,
}

impl Dialer {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            read_timeout: None,
            write_timeout: None,
        }
    }

    pub fn from_config(config: &ClientConfig) -> ClientResult<Self> {
        Ok(Self {
            address: config.address.parse()?,
            read_timeout: config.read_timeout,
            write_timeout: config.write_timeout,
        })
    }

    pub fn address(&self) -> &Address {
        &self.address
    }
}

impl Connector for Dialer {
    type Stream = Transport;

    fn connect(&self) -> io::Result<Transport> {
        debug!("dialing {}", self.address);
        match &self.address {
            Address::Tcp(addr) => {
                let stream = TcpStream::connect(addr.as_str())?;
                stream.set_read_timeout(self.read_timeout)?;
                stream.set_write_timeout(self.write_timeout)?;
                stream.set_nodelay(true)?;
                Ok(Transport::Tcp(stream))
            }
            #[cfg(unix)]
            Address::Unix(path) => {
                let stream = UnixStream::connect(path)?;
                stream.set_read_timeout(self.read_timeout)?;
                stream.set_write_timeout(self.write_timeout)?;
                Ok(Transport::Unix(stream))
            }
            #[cfg(not(unix))]
            Address::Unix(path) => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("UNIX domain sockets are not supported: {}", path.display()),
            )),
        }
    }
}
