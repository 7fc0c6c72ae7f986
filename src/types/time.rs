use std::{fmt, str::FromStr, sync::LazyLock};

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use thiserror::Error;

/// Layout of timestamps in SysDB documents and queries.
pub const TIME_LAYOUT: &str = "%Y-%m-%d %H:%M:%S %z";

/// Literal shape of [`TIME_LAYOUT`]; chrono alone accepts unpadded fields,
/// `+hh:mm` offsets and arbitrary whitespace.
static LAYOUT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2} [0-9]{2}:[0-9]{2}:[0-9]{2} [+-][0-9]{4}$")
        .expect("pattern is valid")
});

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseTimeError {
    #[error("time {0:?} does not match the layout YYYY-MM-DD hh:mm:ss +zzzz")]
    Layout(String),
    #[error("invalid time {input:?}: {source}")]
    Invalid {
        input: String,
        source: chrono::ParseError,
    },
}

/// An instant in time with nanosecond precision.
///
/// Encoded as `YYYY-MM-DD hh:mm:ss +zzzz`; the textual form drops sub-second
/// precision. Comparisons use the instant, so the same moment expressed in
/// different offsets is equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Time(DateTime<FixedOffset>);

impl Time {
    pub fn new(datetime: DateTime<FixedOffset>) -> Self {
        Time(datetime)
    }

    pub fn as_datetime(&self) -> &DateTime<FixedOffset> {
        &self.0
    }
}

impl Default for Time {
    fn default() -> Self {
        DateTime::<Utc>::default().into()
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for Time {
    fn from(value: DateTime<Tz>) -> Self {
        Time(value.fixed_offset())
    }
}

impl From<Time> for DateTime<FixedOffset> {
    fn from(value: Time) -> Self {
        value.0
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(TIME_LAYOUT))
    }
}

impl FromStr for Time {
    type Err = ParseTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !LAYOUT.is_match(s) {
            return Err(ParseTimeError::Layout(s.to_string()));
        }

        DateTime::parse_from_str(s, TIME_LAYOUT)
            .map(Time)
            .map_err(|source| ParseTimeError::Invalid {
                input: s.to_string(),
                source,
            })
    }
}

impl Serialize for Time {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Time {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct Visitor;

        impl de::Visitor<'_> for Visitor {
            type Value = Time;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a quoted time such as \"2014-09-18 23:42:12 +0000\"")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_str(Visitor)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn instant() -> Time {
        NaiveDate::from_ymd_opt(2014, 9, 18)
            .unwrap()
            .and_hms_opt(23, 42, 12)
            .unwrap()
            .and_utc()
            .into()
    }

    #[test]
    fn decode_time() {
        let time: Time = serde_json::from_str(r#""2014-09-18 23:42:12 +0000""#).unwrap();

        assert_eq!(time, instant());
        assert_eq!(
            serde_json::to_string(&time).unwrap(),
            r#""2014-09-18 23:42:12 +0000""#
        );
    }

    #[test]
    fn decode_rejects() {
        let inputs = vec![
            "2014-09-18 23:42:12 +0000",
            r#""2014-09-18T23:42:12 +0000""#,
            r#""2014-09-18 23:42:12""#,
            r#""18.09.2014 23:42:12 +0000""#,
            r#""""#,
            r#""2014-9-18 23:42:12 +0000""#,
            r#""2014-09-18 3:42:12 +0000""#,
            r#""2014-09-18 23:42:12 +00:00""#,
            r#""2014-09-18  23:42:12   +0000""#,
            r#""2014-09-1823:42:12+0000""#,
            r#""2014-09-18 23:42:12 +0000 ""#,
        ];

        for input in inputs {
            assert!(
                serde_json::from_str::<Time>(input).is_err(),
                "{input} should be rejected"
            );
        }
    }

    #[test]
    fn parse_errors() {
        assert_eq!(
            "2014-9-18 23:42:12 +0000".parse::<Time>(),
            Err(ParseTimeError::Layout("2014-9-18 23:42:12 +0000".to_string()))
        );
        assert!(matches!(
            "2014-13-18 23:42:12 +0000".parse::<Time>(),
            Err(ParseTimeError::Invalid { .. })
        ));
    }

    #[test]
    fn equality_uses_instant() {
        let shifted: Time = "2014-09-19 01:42:12 +0200".parse().unwrap();

        assert_eq!(shifted, instant());
        assert_eq!(shifted.to_string(), "2014-09-19 01:42:12 +0200");
    }

    #[test]
    fn default_is_epoch() {
        assert_eq!(Time::default().to_string(), "1970-01-01 00:00:00 +0000");
    }
}
