//! Custom scalar codecs
//!
//! A codec converts between a Rust value and its wire form: JSON for results and
//! variables, a query literal for inline arguments. `Long` is the only custom
//! scalar declared by generated schemas; the date-time and localized-string
//! codecs cover model types that service layers commonly expose.

use chrono::{DateTime, SecondsFormat, Utc};
use graphql_parser::query::Value as Literal;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScalarError {
    #[error("{scalar} cannot represent {found}")]
    Invalid { scalar: &'static str, found: String },

    #[error("{scalar} is out of range: {found}")]
    OutOfRange { scalar: &'static str, found: String },
}

impl ScalarError {
    fn invalid(scalar: &'static str, found: impl ToString) -> Self {
        Self::Invalid {
            scalar,
            found: found.to_string(),
        }
    }
}

/// Wire contract of one custom scalar
pub trait ScalarCodec {
    /// Name used in the schema
    const NAME: &'static str;

    type Value;

    fn serialize(value: &Self::Value) -> Value;

    /// Parse a variable value
    fn parse_value(input: &Value) -> Result<Self::Value, ScalarError>;

    /// Parse an inline argument of the query document
    fn parse_literal(literal: &Literal<'_, String>) -> Result<Self::Value, ScalarError>;
}

fn literal_kind(literal: &Literal<'_, String>) -> &'static str {
    match literal {
        Literal::Variable(_) => "a variable",
        Literal::Int(_) => "an integer literal",
        Literal::Float(_) => "a float literal",
        Literal::String(_) => "a string literal",
        Literal::Boolean(_) => "a boolean literal",
        Literal::Null => "null",
        Literal::Enum(_) => "an enum literal",
        Literal::List(_) => "a list literal",
        Literal::Object(_) => "an object literal",
    }
}

/// 64-bit integer; accepts JSON numbers and numeric strings
pub struct LongScalar;

impl LongScalar {
    fn parse_str(text: &str) -> Result<i64, ScalarError> {
        text.trim()
            .parse()
            .map_err(|_| ScalarError::invalid(Self::NAME, format!("\"{text}\"")))
    }
}

impl ScalarCodec for LongScalar {
    const NAME: &'static str = "Long";
    type Value = i64;

    fn serialize(value: &i64) -> Value {
        Value::from(*value)
    }

    fn parse_value(input: &Value) -> Result<i64, ScalarError> {
        match input {
            Value::Number(number) => number.as_i64().ok_or_else(|| ScalarError::OutOfRange {
                scalar: Self::NAME,
                found: number.to_string(),
            }),
            Value::String(text) => Self::parse_str(text),
            other => Err(ScalarError::invalid(Self::NAME, other)),
        }
    }

    fn parse_literal(literal: &Literal<'_, String>) -> Result<i64, ScalarError> {
        match literal {
            Literal::Int(number) => number.as_i64().ok_or_else(|| ScalarError::OutOfRange {
                scalar: Self::NAME,
                found: format!("{number:?}"),
            }),
            Literal::String(text) => Self::parse_str(text),
            other => Err(ScalarError::invalid(Self::NAME, literal_kind(other))),
        }
    }
}

/// UTC timestamp as RFC 3339; variables may also carry epoch milliseconds
pub struct DateTimeScalar;

impl DateTimeScalar {
    fn parse_str(text: &str) -> Result<DateTime<Utc>, ScalarError> {
        DateTime::parse_from_rfc3339(text.trim())
            .map(|parsed| parsed.with_timezone(&Utc))
            .map_err(|e| ScalarError::invalid(Self::NAME, format!("\"{text}\" ({e})")))
    }
}

impl ScalarCodec for DateTimeScalar {
    const NAME: &'static str = "DateTime";
    type Value = DateTime<Utc>;

    fn serialize(value: &DateTime<Utc>) -> Value {
        Value::String(value.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }

    fn parse_value(input: &Value) -> Result<DateTime<Utc>, ScalarError> {
        match input {
            Value::String(text) => Self::parse_str(text),
            Value::Number(number) => number
                .as_i64()
                .and_then(DateTime::<Utc>::from_timestamp_millis)
                .ok_or_else(|| ScalarError::OutOfRange {
                    scalar: Self::NAME,
                    found: number.to_string(),
                }),
            other => Err(ScalarError::invalid(Self::NAME, other)),
        }
    }

    fn parse_literal(literal: &Literal<'_, String>) -> Result<DateTime<Utc>, ScalarError> {
        match literal {
            Literal::String(text) => Self::parse_str(text),
            other => Err(ScalarError::invalid(Self::NAME, literal_kind(other))),
        }
    }
}

/// Locale -> text map, e.g. `{"en_US": "Widget", "de_DE": "Bauteil"}`
pub struct LocalizedStringScalar;

impl ScalarCodec for LocalizedStringScalar {
    const NAME: &'static str = "LocalizedString";
    type Value = BTreeMap<String, String>;

    fn serialize(value: &BTreeMap<String, String>) -> Value {
        Value::Object(
            value
                .iter()
                .map(|(locale, text)| (locale.clone(), Value::String(text.clone())))
                .collect(),
        )
    }

    fn parse_value(input: &Value) -> Result<BTreeMap<String, String>, ScalarError> {
        let Value::Object(entries) = input else {
            return Err(ScalarError::invalid(Self::NAME, input));
        };
        entries
            .iter()
            .map(|(locale, text)| match text {
                Value::String(text) => Ok((locale.clone(), text.clone())),
                other => Err(ScalarError::invalid(Self::NAME, format!("{locale}: {other}"))),
            })
            .collect()
    }

    fn parse_literal(literal: &Literal<'_, String>) -> Result<BTreeMap<String, String>, ScalarError> {
        let Literal::Object(entries) = literal else {
            return Err(ScalarError::invalid(Self::NAME, literal_kind(literal)));
        };
        entries
            .iter()
            .map(|(locale, text)| match text {
                Literal::String(text) => Ok((locale.clone(), text.clone())),
                other => Err(ScalarError::invalid(
                    Self::NAME,
                    format!("{locale}: {}", literal_kind(other)),
                )),
            })
            .collect()
    }
}
