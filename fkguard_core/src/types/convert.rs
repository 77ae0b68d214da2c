use chrono::{NaiveDateTime, NaiveTime, Timelike};
use rust_decimal::Decimal;

use crate::types::datatype::DataType;
use crate::types::value::{midnight, Value};

/// Outcome of converting a value into another column type.
///
/// `FilterOut` is not an error: it means the value cannot be represented in
/// the target type, so no row of that type can ever hold it.
#[derive(Debug, Clone, PartialEq)]
pub enum Converted {
    Value(Value),
    FilterOut,
}

impl Converted {
    pub fn into_value(self) -> Option<Value> {
        match self {
            Converted::Value(v) => Some(v),
            Converted::FilterOut => None,
        }
    }
}

/// Converts `value`, held by a column of type `source`, into the
/// representation used by `target`.
pub fn convert_to_type(target: &DataType, source: &DataType, value: &Value) -> Converted {
    if value.is_null() {
        return Converted::Value(Value::Null);
    }
    match (target, value) {
        (DataType::Char { len, .. } | DataType::VarChar { len, .. }, Value::Text(s)) => {
            if s.chars().count() > *len {
                Converted::FilterOut
            } else {
                Converted::Value(Value::Text(s.clone()))
            }
        }
        (DataType::Text { .. }, Value::Text(s)) => Converted::Value(Value::Text(s.clone())),
        (DataType::VarBinary(len), Value::Bytes(b)) => {
            if b.len() > *len {
                Converted::FilterOut
            } else {
                Converted::Value(Value::Bytes(b.clone()))
            }
        }
        (DataType::Binary(len), Value::Bytes(b)) => {
            if b.len() > *len {
                return Converted::FilterOut;
            }
            let mut padded = b.clone();
            padded.resize(*len, 0);
            Converted::Value(Value::Bytes(padded))
        }
        (DataType::Blob, Value::Bytes(b)) => Converted::Value(Value::Bytes(b.clone())),
        (DataType::Decimal { precision, scale }, Value::Decimal(d)) => {
            convert_decimal(*d, *precision, *scale)
        }
        (DataType::Decimal { precision, scale }, Value::Int(n)) => {
            convert_decimal(Decimal::from(*n), *precision, *scale)
        }
        (DataType::Int | DataType::BigInt, Value::Int(n)) => {
            if matches!(target, DataType::Int) && i32::try_from(*n).is_err() {
                Converted::FilterOut
            } else {
                Converted::Value(Value::Int(*n))
            }
        }
        (DataType::Time { precision }, Value::Time(t)) => {
            if fits_precision(t.nanosecond(), *precision) {
                Converted::Value(Value::Time(*t))
            } else {
                Converted::FilterOut
            }
        }
        (DataType::Datetime { precision } | DataType::Timestamp { precision }, Value::DateTime(ts)) => {
            if fits_precision(ts.nanosecond(), *precision) {
                Converted::Value(Value::DateTime(*ts))
            } else {
                Converted::FilterOut
            }
        }
        (DataType::Datetime { .. } | DataType::Timestamp { .. }, Value::Date(d)) => {
            Converted::Value(Value::DateTime(midnight(d)))
        }
        (DataType::Date, Value::Date(d)) => Converted::Value(Value::Date(*d)),
        (DataType::Date, Value::DateTime(ts)) => date_only(ts),
        (DataType::Bool, Value::Bool(b)) => Converted::Value(Value::Bool(*b)),
        (DataType::Enum(_) | DataType::Set(_), Value::Text(s)) => {
            Converted::Value(Value::Text(s.clone()))
        }
        (DataType::Json, Value::Json(j)) => Converted::Value(Value::Json(j.clone())),
        (DataType::Uuid, Value::Uuid(u)) => Converted::Value(Value::Uuid(*u)),
        _ => {
            tracing::trace!(%source, %target, "value representation does not match target type");
            Converted::FilterOut
        }
    }
}

fn convert_decimal(d: Decimal, precision: u32, scale: u32) -> Converted {
    if d.normalize().scale() > scale {
        return Converted::FilterOut;
    }
    let int_digits = integer_digits(&d);
    if int_digits > precision.saturating_sub(scale) {
        return Converted::FilterOut;
    }
    let mut rescaled = d;
    rescaled.rescale(scale);
    Converted::Value(Value::Decimal(rescaled))
}

fn integer_digits(d: &Decimal) -> u32 {
    let whole = d.abs().trunc().normalize().to_string();
    whole.trim_start_matches('0').len() as u32
}

fn fits_precision(nanos: u32, precision: u8) -> bool {
    let step = 10u32.pow(9 - u32::from(precision.min(9)));
    nanos % step == 0
}

fn date_only(ts: &NaiveDateTime) -> Converted {
    if ts.time() == NaiveTime::MIN {
        Converted::Value(Value::Date(ts.date()))
    } else {
        Converted::FilterOut
    }
}
