//! Calendar-aware duration encoding.
//!
//! SysDB transports intervals as a compact sequence of `<count><unit>` components,
//! largest unit first, e.g. `1Y6M7D` or `5m2.5s`. Months and years are fixed
//! averages rather than real calendar spans, which keeps a [`Duration`] a plain
//! nanosecond count.
//!
//! | unit | suffix | length                 |
//! |------|--------|------------------------|
//! | year | `Y`    | 365.2425 days          |
//! | month| `M`    | 30.436875 days         |
//! | day  | `D`    | 24 hours               |
//! | hour | `h`    | 60 minutes             |
//! | min  | `m`    | 60 seconds             |
//! | sec  | `s`    | whole or fractional    |
//!
//! Whole seconds carry no suffix of their own; a trailing `s` is emitted once any
//! sub-minute part (whole seconds or a fraction) is present. Only seconds may carry
//! a fraction, with at most nanosecond precision.
use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de, ser};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseDurationError {
    #[error("empty duration")]
    Empty,
    #[error("invalid duration {0:?}")]
    Invalid(String),
    #[error("missing unit in duration {0:?}")]
    MissingUnit(String),
    #[error("invalid unit {unit:?} in duration {input:?}")]
    UnknownUnit { unit: String, input: String },
    #[error("fractional {unit:?} in duration {input:?}")]
    Fraction { unit: String, input: String },
    #[error("duration {0:?} out of range")]
    Overflow(String),
}

/// Elapsed time between two instants as a signed nanosecond count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Duration(i64);

impl Duration {
    pub const ZERO: Duration = Duration(0);
    pub const NANOSECOND: Duration = Duration(1);
    pub const SECOND: Duration = Duration(1_000_000_000);
    pub const MINUTE: Duration = Duration(60 * Self::SECOND.0);
    pub const HOUR: Duration = Duration(60 * Self::MINUTE.0);
    pub const DAY: Duration = Duration(24 * Self::HOUR.0);
    pub const MONTH: Duration = Duration(30_436_875 * 24 * 60 * 60 * 1000);
    pub const YEAR: Duration = Duration(3_652_425 * 24 * 60 * 60 * 100_000);

    pub const fn from_nanos(nanos: i64) -> Self {
        Duration(nanos)
    }

    pub const fn as_nanos(self) -> i64 {
        self.0
    }

    pub fn checked_mul(self, rhs: i64) -> Option<Self> {
        self.0.checked_mul(rhs).map(Duration)
    }

    pub fn checked_add(self, rhs: Duration) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Duration)
    }
}

/// Units in the order they are emitted, with their suffix.
const UNITS: [(Duration, &str); 6] = [
    (Duration::YEAR, "Y"),
    (Duration::MONTH, "M"),
    (Duration::DAY, "D"),
    (Duration::HOUR, "h"),
    (Duration::MINUTE, "m"),
    (Duration::SECOND, ""),
];

fn unit(suffix: &str) -> Option<Duration> {
    match suffix {
        "Y" => Some(Duration::YEAR),
        "M" => Some(Duration::MONTH),
        "D" => Some(Duration::DAY),
        "h" => Some(Duration::HOUR),
        "m" => Some(Duration::MINUTE),
        "s" | "" => Some(Duration::SECOND),
        _ => None,
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            return f.write_str("0s");
        }
        if self.0 < 0 {
            f.write_str("-")?;
        }

        let mut rem = self.0.unsigned_abs();
        let mut secs = false;
        for (interval, suffix) in UNITS {
            let interval = interval.0 as u64;
            if rem >= interval {
                write!(f, "{}{suffix}", rem / interval)?;
                rem %= interval;
                if interval == Duration::SECOND.0 as u64 {
                    secs = true;
                }
            }
        }

        if rem > 0 {
            let fraction = format!("{rem:09}");
            write!(f, ".{}", fraction.trim_end_matches('0'))?;
            secs = true;
        }
        if secs {
            f.write_str("s")?;
        }
        Ok(())
    }
}

impl FromStr for Duration {
    type Err = ParseDurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseDurationError::Empty);
        }

        let bytes = s.as_bytes();
        let overflow = || ParseDurationError::Overflow(s.to_string());
        let mut pos = 0;
        let mut total = Duration::ZERO;

        while pos < bytes.len() {
            let mut value: i64 = 0;
            let mut digits = 0;
            while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                value = value
                    .checked_mul(10)
                    .and_then(|v| v.checked_add(i64::from(bytes[pos] - b'0')))
                    .ok_or_else(overflow)?;
                digits += 1;
                pos += 1;
            }

            let mut fraction = false;
            if pos < bytes.len() && bytes[pos] == b'.' {
                fraction = true;
                pos += 1;

                // digits past nanosecond precision are dropped
                let mut scale: i64 = 1_000_000_000;
                while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                    if scale > 1 {
                        value = value
                            .checked_mul(10)
                            .and_then(|v| v.checked_add(i64::from(bytes[pos] - b'0')))
                            .ok_or_else(overflow)?;
                        scale /= 10;
                    }
                    digits += 1;
                    pos += 1;
                }
                value = value.checked_mul(scale).ok_or_else(overflow)?;
            }

            if pos >= bytes.len() {
                return Err(ParseDurationError::MissingUnit(s.to_string()));
            }
            if digits == 0 {
                return Err(ParseDurationError::Invalid(s.to_string()));
            }

            let start = pos;
            while pos < bytes.len() && bytes[pos] != b'.' && !bytes[pos].is_ascii_digit() {
                pos += 1;
            }
            let suffix = &s[start..pos];

            let mut interval = unit(suffix).ok_or_else(|| ParseDurationError::UnknownUnit {
                unit: suffix.to_string(),
                input: s.to_string(),
            })?;
            if fraction {
                if interval != Duration::SECOND {
                    return Err(ParseDurationError::Fraction {
                        unit: suffix.to_string(),
                        input: s.to_string(),
                    });
                }
                interval = Duration::NANOSECOND;
            }

            total = interval
                .checked_mul(value)
                .and_then(|d| total.checked_add(d))
                .ok_or_else(overflow)?;
        }

        Ok(total)
    }
}

impl Serialize for Duration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0 < 0 {
            return Err(ser::Error::custom(format!(
                "negative duration {self} cannot be encoded"
            )));
        }
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Duration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct Visitor;

        impl de::Visitor<'_> for Visitor {
            type Value = Duration;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a quoted SysDB duration such as \"1Y6M7D\"")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_str(Visitor)
    }
}
