use std::cmp::Ordering;
use std::fmt;

use crate::error::{FkError, Result};
use crate::types::datatype::DataType;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Decimal(Decimal),
    Text(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    Json(JsonValue),
    Uuid(Uuid),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int(_) | Value::Decimal(_) => 2,
            Value::Text(_) => 3,
            Value::Bytes(_) => 4,
            Value::Date(_) | Value::DateTime(_) => 5,
            Value::Time(_) => 6,
            Value::Json(_) => 7,
            Value::Uuid(_) => 8,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&value_to_string(self))
    }
}

/// Parses a literal token for a column of the given type. `null` (any case)
/// yields `Value::Null`.
pub fn parse_value(dtype: &DataType, token: &str) -> Result<Value> {
    if token.eq_ignore_ascii_case("null") {
        return Ok(Value::Null);
    }
    let invalid = || FkError::InvalidValue {
        dtype: dtype.to_string(),
        token: token.to_string(),
    };
    match dtype {
        DataType::Bool => match token.to_lowercase().as_str() {
            "true" | "1" => Ok(Value::Bool(true)),
            "false" | "0" => Ok(Value::Bool(false)),
            _ => Err(invalid()),
        },
        DataType::Int => {
            let n: i32 = token.parse().map_err(|_| invalid())?;
            Ok(Value::Int(n as i64))
        }
        DataType::BigInt => token.parse().map(Value::Int).map_err(|_| invalid()),
        DataType::Decimal { .. } => token
            .parse::<Decimal>()
            .map(Value::Decimal)
            .map_err(|_| invalid()),
        DataType::Char { len, .. } | DataType::VarChar { len, .. } => {
            if token.chars().count() > *len {
                return Err(invalid());
            }
            Ok(Value::Text(token.to_string()))
        }
        DataType::Text { .. } => Ok(Value::Text(token.to_string())),
        DataType::Binary(_) | DataType::VarBinary(_) | DataType::Blob => {
            let raw = token.strip_prefix("0x").unwrap_or(token);
            let bytes = hex::decode(raw).map_err(|_| invalid())?;
            match dtype {
                DataType::Binary(len) | DataType::VarBinary(len) if bytes.len() > *len => {
                    Err(invalid())
                }
                DataType::Binary(len) => {
                    let mut padded = bytes;
                    padded.resize(*len, 0);
                    Ok(Value::Bytes(padded))
                }
                _ => Ok(Value::Bytes(bytes)),
            }
        }
        DataType::Date => NaiveDate::parse_from_str(token, "%Y-%m-%d")
            .map(Value::Date)
            .map_err(|_| invalid()),
        DataType::Time { .. } => NaiveTime::parse_from_str(token, "%H:%M:%S%.f")
            .map(Value::Time)
            .map_err(|_| invalid()),
        DataType::Datetime { .. } | DataType::Timestamp { .. } => {
            NaiveDateTime::parse_from_str(token, "%Y-%m-%d %H:%M:%S%.f")
                .or_else(|_| NaiveDateTime::parse_from_str(token, "%Y-%m-%dT%H:%M:%S%.f"))
                .map(Value::DateTime)
                .map_err(|_| invalid())
        }
        DataType::Enum(members) => members
            .iter()
            .find(|m| m.eq_ignore_ascii_case(token))
            .map(|m| Value::Text(m.clone()))
            .ok_or_else(invalid),
        DataType::Set(members) => {
            for part in token.split(',').filter(|p| !p.is_empty()) {
                if !members.iter().any(|m| m.eq_ignore_ascii_case(part)) {
                    return Err(invalid());
                }
            }
            Ok(Value::Text(token.to_string()))
        }
        DataType::Json => serde_json::from_str(token)
            .map(Value::Json)
            .map_err(|_| invalid()),
        DataType::Uuid => Uuid::parse_str(token).map(Value::Uuid).map_err(|_| invalid()),
    }
}

pub fn value_to_string(v: &Value) -> String {
    match v {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(n) => n.to_string(),
        Value::Decimal(d) => d.to_string(),
        Value::Text(s) => s.clone(),
        Value::Bytes(b) => format!("0x{}", hex::encode_upper(b)),
        Value::Date(d) => d.format("%Y-%m-%d").to_string(),
        Value::Time(t) => t.format("%H:%M:%S%.f").to_string(),
        Value::DateTime(ts) => ts.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
        Value::Json(j) => j.to_string(),
        Value::Uuid(u) => u.to_string(),
    }
}

/// Total order over values. NULL sorts first, integers and decimals compare
/// numerically, dates compare against datetimes at midnight. Values of
/// unrelated kinds are ordered by kind.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        (Value::Int(x), Value::Decimal(y)) => Decimal::from(*x).cmp(y),
        (Value::Decimal(x), Value::Int(y)) => x.cmp(&Decimal::from(*y)),
        (Value::Decimal(x), Value::Decimal(y)) => x.cmp(y),
        (Value::Text(x), Value::Text(y)) => x.cmp(y),
        (Value::Bytes(x), Value::Bytes(y)) => x.cmp(y),
        (Value::Date(x), Value::Date(y)) => x.cmp(y),
        (Value::DateTime(x), Value::DateTime(y)) => x.cmp(y),
        (Value::Date(x), Value::DateTime(y)) => midnight(x).cmp(y),
        (Value::DateTime(x), Value::Date(y)) => x.cmp(&midnight(y)),
        (Value::Time(x), Value::Time(y)) => x.cmp(y),
        (Value::Json(x), Value::Json(y)) => x.to_string().cmp(&y.to_string()),
        (Value::Uuid(x), Value::Uuid(y)) => x.cmp(y),
        _ => a.rank().cmp(&b.rank()),
    }
}

pub(crate) fn midnight(d: &NaiveDate) -> NaiveDateTime {
    d.and_time(NaiveTime::MIN)
}
