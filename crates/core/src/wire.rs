//! Lenient serde adapters for record API columns.
//!
//! The record API serialises decimals as strings (`"7.50"`), dates as epoch milliseconds or ISO
//! text, and boolean clinical flags as `0`/`1`. These adapters accept every form it produces and
//! write back the canonical one.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{de::Error as _, Deserialize, Deserializer, Serializer};
use serde_json::Value;

pub(crate) fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn timestamp_from_value(value: &Value) -> Result<Option<NaiveDateTime>, String> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => parse_timestamp(s)
            .map(Some)
            .ok_or_else(|| format!("unrecognised date '{s}'")),
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::from_timestamp_millis)
            .map(|dt| Some(dt.naive_utc()))
            .ok_or_else(|| format!("epoch milliseconds out of range: {n}")),
        other => Err(format!("expected a date, found {other}")),
    }
}

fn number_from_value(value: &Value) -> Result<Option<f64>, String> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| format!("number out of range: {n}")),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(|| format!("expected a number, found '{s}'")),
        other => Err(format!("expected a number, found {other}")),
    }
}

pub(crate) mod number {
    use super::*;

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        let value = Value::deserialize(d)?;
        number_from_value(&value)
            .map_err(D::Error::custom)?
            .ok_or_else(|| D::Error::custom("missing number"))
    }
}

pub(crate) mod number_opt {
    use super::*;

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        let value = Option::<Value>::deserialize(d)?.unwrap_or(Value::Null);
        number_from_value(&value).map_err(D::Error::custom)
    }
}

/// Clinical flags: `0`/`1` on the wire, `bool` in Rust.
pub(crate) mod flag {
    use super::*;

    pub fn serialize<S: Serializer>(value: &bool, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        match Option::<Value>::deserialize(d)?.unwrap_or(Value::Null) {
            Value::Null => Ok(false),
            Value::Bool(b) => Ok(b),
            Value::Number(n) => match n.as_i64() {
                Some(0) => Ok(false),
                Some(1) => Ok(true),
                _ => Err(D::Error::custom(format!("expected 0 or 1, found {n}"))),
            },
            Value::String(s) => match s.trim() {
                "" | "0" => Ok(false),
                "1" => Ok(true),
                other => Err(D::Error::custom(format!("expected 0 or 1, found '{other}'"))),
            },
            other => Err(D::Error::custom(format!("expected 0 or 1, found {other}"))),
        }
    }
}

pub(crate) mod date_opt {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<NaiveDate>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(date) => s.serialize_str(&date.format("%Y-%m-%d").to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
        let value = Option::<Value>::deserialize(d)?.unwrap_or(Value::Null);
        timestamp_from_value(&value)
            .map(|ts| ts.map(|dt| dt.date()))
            .map_err(D::Error::custom)
    }
}

pub(crate) mod timestamp {
    use super::*;

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.format("%Y-%m-%dT%H:%M:%S").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let value = Value::deserialize(d)?;
        timestamp_from_value(&value)
            .map_err(D::Error::custom)?
            .ok_or_else(|| D::Error::custom("missing date"))
    }
}

pub(crate) mod timestamp_opt {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &Option<NaiveDateTime>,
        s: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(dt) => s.serialize_str(&dt.format("%Y-%m-%dT%H:%M:%S").to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<NaiveDateTime>, D::Error> {
        let value = Option::<Value>::deserialize(d)?.unwrap_or(Value::Null);
        timestamp_from_value(&value).map_err(D::Error::custom)
    }
}
