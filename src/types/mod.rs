//! Objects stored in SysDB and the value types they are built from.
//!
//! These are plain records populated from the JSON document of a `DATA` reply.
//! [`Duration`] and [`Time`] carry the SysDB specific text encodings; everything
//! else maps onto ordinary JSON values.
mod duration;
mod time;

use std::collections::BTreeMap;

use log::Level;
use serde::{Deserialize, Serialize};

pub use duration::{Duration, ParseDurationError};
pub use time::{ParseTimeError, TIME_LAYOUT, Time};

/// Priority of a server log message, modelled after syslog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogPriority {
    Emerg,
    Err,
    Warning,
    Notice,
    Info,
    Debug,
}

impl TryFrom<u32> for LogPriority {
    type Error = u32;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(LogPriority::Emerg),
            3 => Ok(LogPriority::Err),
            4 => Ok(LogPriority::Warning),
            5 => Ok(LogPriority::Notice),
            6 => Ok(LogPriority::Info),
            7 => Ok(LogPriority::Debug),
            other => Err(other),
        }
    }
}

impl LogPriority {
    pub fn level(self) -> Level {
        match self {
            LogPriority::Emerg | LogPriority::Err => Level::Error,
            LogPriority::Warning => Level::Warn,
            LogPriority::Notice | LogPriority::Info => Level::Info,
            LogPriority::Debug => Level::Debug,
        }
    }
}

/// A host, metric, or service attribute.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Attribute {
    pub name: String,
    pub value: String,
    pub last_update: Time,
    pub update_interval: Duration,
    pub backends: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metric {
    pub name: String,
    pub last_update: Time,
    pub update_interval: Duration,
    pub backends: Vec<String>,
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Service {
    pub name: String,
    pub last_update: Time,
    pub update_interval: Duration,
    pub backends: Vec<String>,
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Host {
    pub name: String,
    pub last_update: Time,
    pub update_interval: Duration,
    pub backends: Vec<String>,
    pub attributes: Vec<Attribute>,
    pub metrics: Vec<Metric>,
    pub services: Vec<Service>,
}

/// A datum at a certain point of time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataPoint {
    pub timestamp: Time,
    /// Carried as a JSON string on the wire.
    #[serde(with = "float_string")]
    pub value: f64,
}

/// A set of named data-point sequences over a common time range.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeseries {
    pub start: Time,
    pub end: Time,
    pub data: BTreeMap<String, Vec<DataPoint>>,
}

mod float_string {
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(|_| de::Error::custom(format!("invalid float {raw:?}")))
    }
}
