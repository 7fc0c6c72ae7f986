//! Query string formatting.
//!
//! The front-end protocol has no notion of bound parameters, so values have to be
//! embedded into the query text. [`query_string`] substitutes each `%s` in a
//! template with the next argument, rendered so it cannot break out of its
//! position:
//!
//! - integers are written in decimal,
//! - floats in `%e` notation (`4.711000e+01`),
//! - text is wrapped in single quotes with embedded quotes doubled,
//! - [`Identifier`]s are written verbatim,
//! - times use the `YYYY-MM-DD hh:mm:ss +zzzz` layout.
//!
//! `%%` produces a literal percent sign. Any other directive is rejected.
//!
//! # Example
//! ```rust
//! use sysdb::query_string;
//!
//! let q = query_string!("FETCH host %s", "web'1").unwrap();
//! assert_eq!(q, "FETCH host 'web''1'");
//! ```
use std::sync::LazyLock;

use chrono::{DateTime, TimeZone};
use regex::Regex;
use thiserror::Error;

use crate::types::Time;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("missing argument for directive {0}")]
    MissingArgument(usize),
    #[error("{0} extra arguments for query")]
    ExtraArguments(usize),
    #[error("unsupported directive '{0}' in query")]
    BadDirective(String),
    #[error("malformed query near '{0}'")]
    Malformed(String),
}

/// Output of a formatting directive that did not get a proper value. A string
/// argument smuggling in such a token is rejected as well.
static MALFORMED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%!?[A-Za-z]?\(.+").expect("pattern is valid"));

/// A name inserted into a query without quoting or escaping. The caller is
/// responsible for it being a safe token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier(pub String);

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Identifier(value.to_string())
    }
}

/// A value that may be embedded into a query.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Identifier(String),
    Text(String),
    Time(Time),
}

macro_rules! impl_from_int {
    ($variant:ident, $target:ty: $($t:ty),*) => {
        $(
            impl From<$t> for Arg {
                fn from(value: $t) -> Self {
                    Arg::$variant(value as $target)
                }
            }
        )*
    };
}

impl_from_int!(Unsigned, u64: u8, u16, u32, u64, usize);
impl_from_int!(Signed, i64: i8, i16, i32, i64, isize);

impl From<f32> for Arg {
    fn from(value: f32) -> Self {
        Arg::Float(f64::from(value))
    }
}

impl From<f64> for Arg {
    fn from(value: f64) -> Self {
        Arg::Float(value)
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Arg::Text(value.to_string())
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Arg::Text(value)
    }
}

impl From<Identifier> for Arg {
    fn from(value: Identifier) -> Self {
        Arg::Identifier(value.0)
    }
}

impl From<Time> for Arg {
    fn from(value: Time) -> Self {
        Arg::Time(value)
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for Arg {
    fn from(value: DateTime<Tz>) -> Self {
        Arg::Time(value.into())
    }
}

impl Arg {
    fn render(&self) -> String {
        match self {
            Arg::Unsigned(v) => v.to_string(),
            Arg::Signed(v) => v.to_string(),
            Arg::Float(v) => format_exponent(*v),
            Arg::Identifier(v) => v.clone(),
            Arg::Text(v) => escape_string(v),
            Arg::Time(v) => v.to_string(),
        }
    }
}

/// Quotes a string for use in a query.
pub fn escape_string(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn format_exponent(v: f64) -> String {
    if v.is_nan() {
        return "NaN".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }

    let s = format!("{v:.6e}");
    match s.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or_default();
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{mantissa}e{sign}{:02}", exp.unsigned_abs())
        }
        None => s,
    }
}

/// Formats a query from a template and its arguments.
pub fn query_string(template: &str, args: &[Arg]) -> Result<String, QueryError> {
    let mut out = String::with_capacity(template.len());
    let mut args = args.iter();
    let mut directive = 0;
    let mut chars = template.chars();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }

        match chars.next() {
            Some('%') => out.push('%'),
            Some('s') => {
                directive += 1;
                let arg = args.next().ok_or(QueryError::MissingArgument(directive))?;
                out.push_str(&arg.render());
            }
            Some(other) => return Err(QueryError::BadDirective(format!("%{other}"))),
            None => return Err(QueryError::BadDirective("%".to_string())),
        }
    }

    let extra = args.count();
    if extra > 0 {
        return Err(QueryError::ExtraArguments(extra));
    }
    if let Some(m) = MALFORMED.find(&out) {
        return Err(QueryError::Malformed(m.as_str().to_string()));
    }
    Ok(out)
}

/// Formats a query, converting each argument into an [`Arg`].
#[macro_export]
macro_rules! query_string {
    ($template:expr $(, $arg:expr)* $(,)?) => {
        $crate::client::query_string($template, &[$($crate::client::Arg::from($arg)),*])
    };
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn timestamp() -> Time {
        NaiveDate::from_ymd_opt(2006, 1, 2)
            .unwrap()
            .and_hms_opt(15, 4, 5)
            .unwrap()
            .and_utc()
            .into()
    }

    #[test]
    fn format_queries() {
        let inputs = vec![
            (
                query_string!("some %s; foo %s", "thing", "bar"),
                "some 'thing'; foo 'bar'",
            ),
            (query_string!("s=%s", "'a"), "s='''a'"),
            (query_string!("t=%s", timestamp()), "t=2006-01-02 15:04:05 +0000"),
            (
                query_string!("i=%s; f=%s", 1234, 47.11),
                "i=1234; f=4.711000e+01",
            ),
            (
                query_string!("s=%s", "multi\nline\ntext"),
                "s='multi\nline\ntext'",
            ),
            (
                query_string!("FETCH %s %s", Identifier::from("host"), "web1"),
                "FETCH host 'web1'",
            ),
            (query_string!("n=%s; u=%s", -7i8, 7usize), "n=-7; u=7"),
            (query_string!("p=100%%"), "p=100%"),
        ];

        for (result, expected) in inputs {
            assert_eq!(result.unwrap(), expected);
        }
    }

    #[test]
    fn format_errors() {
        assert_eq!(
            query_string!("t=%d", timestamp()),
            Err(QueryError::BadDirective("%d".into()))
        );
        assert_eq!(
            query_string!("some %s; foo %s", "a", "b", "c"),
            Err(QueryError::ExtraArguments(1))
        );
        assert_eq!(
            query_string!("some %s; foo %s", "a"),
            Err(QueryError::MissingArgument(2))
        );
        assert!(query_string!("s=%d", "multi\nline\nerror").is_err());
        assert!(query_string!("trailing %").is_err());
    }

    #[test]
    fn rejects_smuggled_directive() {
        let err = query_string!("s=%s", "%!s(MISSING)").unwrap_err();
        assert!(matches!(err, QueryError::Malformed(_)));
    }

    #[test]
    fn float_notation() {
        let inputs = vec![
            (0.0, "0.000000e+00"),
            (1.0, "1.000000e+00"),
            (-0.00125, "-1.250000e-03"),
            (6.02214076e23, "6.022141e+23"),
            (1e100, "1.000000e+100"),
            (f64::INFINITY, "+Inf"),
        ];

        for (value, expected) in inputs {
            assert_eq!(format_exponent(value), expected);
        }
    }
}
