use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{FkError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Charset {
    Utf8mb4,
    Latin1,
    Ascii,
    Binary,
}

impl Charset {
    fn parse(s: &str) -> Option<Charset> {
        match s {
            "utf8mb4" | "utf8" => Some(Charset::Utf8mb4),
            "latin1" => Some(Charset::Latin1),
            "ascii" => Some(Charset::Ascii),
            "binary" => Some(Charset::Binary),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Charset::Utf8mb4 => "utf8mb4",
            Charset::Latin1 => "latin1",
            Charset::Ascii => "ascii",
            Charset::Binary => "binary",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Bool,
    Int,
    BigInt,
    Decimal { precision: u32, scale: u32 },
    Char { len: usize, charset: Charset },
    VarChar { len: usize, charset: Charset },
    Text { charset: Charset },
    Binary(usize),
    VarBinary(usize),
    Blob,
    Date,
    Time { precision: u8 },
    Datetime { precision: u8 },
    Timestamp { precision: u8 },
    Enum(Vec<String>),
    Set(Vec<String>),
    Json,
    Uuid,
}

impl DataType {
    /// TIME columns, whatever their fractional precision.
    pub fn is_time_of_day(&self) -> bool {
        matches!(self, DataType::Time { .. })
    }

    /// DATE, DATETIME and TIMESTAMP columns.
    pub fn is_date_time(&self) -> bool {
        matches!(
            self,
            DataType::Date | DataType::Datetime { .. } | DataType::Timestamp { .. }
        )
    }

    pub fn is_character_string(&self) -> bool {
        matches!(
            self,
            DataType::Char { .. } | DataType::VarChar { .. } | DataType::Text { .. }
        )
    }

    pub fn is_binary_string(&self) -> bool {
        matches!(
            self,
            DataType::Binary(_) | DataType::VarBinary(_) | DataType::Blob
        )
    }

    pub fn is_text_or_blob(&self) -> bool {
        matches!(self, DataType::Text { .. } | DataType::Blob)
    }

    pub fn is_decimal(&self) -> bool {
        matches!(self, DataType::Decimal { .. })
    }

    /// Character set of a string type; binary strings report `Charset::Binary`.
    pub fn charset(&self) -> Option<Charset> {
        match self {
            DataType::Char { charset, .. }
            | DataType::VarChar { charset, .. }
            | DataType::Text { charset } => Some(*charset),
            DataType::Binary(_) | DataType::VarBinary(_) | DataType::Blob => Some(Charset::Binary),
            _ => None,
        }
    }

    /// Types that know how to convert values from another type into their own
    /// representation. Values of the others are only ever compared raw.
    pub fn is_extended(&self) -> bool {
        !matches!(
            self,
            DataType::Enum(_) | DataType::Set(_) | DataType::Json | DataType::Uuid
        )
    }

    /// Fractional-second precision for temporal types. DATE counts as 0.
    pub fn fractional_precision(&self) -> Option<u8> {
        match self {
            DataType::Date => Some(0),
            DataType::Time { precision }
            | DataType::Datetime { precision }
            | DataType::Timestamp { precision } => Some(*precision),
            _ => None,
        }
    }

    pub fn decimal_scale(&self) -> Option<u32> {
        match self {
            DataType::Decimal { scale, .. } => Some(*scale),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Bool => write!(f, "bool"),
            DataType::Int => write!(f, "int"),
            DataType::BigInt => write!(f, "bigint"),
            DataType::Decimal { precision, scale } => write!(f, "decimal({precision},{scale})"),
            DataType::Char { len, charset } => write!(f, "char({len}) charset {}", charset.as_str()),
            DataType::VarChar { len, charset } => {
                write!(f, "varchar({len}) charset {}", charset.as_str())
            }
            DataType::Text { charset } => write!(f, "text charset {}", charset.as_str()),
            DataType::Binary(len) => write!(f, "binary({len})"),
            DataType::VarBinary(len) => write!(f, "varbinary({len})"),
            DataType::Blob => write!(f, "blob"),
            DataType::Date => write!(f, "date"),
            DataType::Time { precision } => write!(f, "time({precision})"),
            DataType::Datetime { precision } => write!(f, "datetime({precision})"),
            DataType::Timestamp { precision } => write!(f, "timestamp({precision})"),
            DataType::Enum(members) => write!(f, "enum({})", quote_members(members)),
            DataType::Set(members) => write!(f, "set({})", quote_members(members)),
            DataType::Json => write!(f, "json"),
            DataType::Uuid => write!(f, "uuid"),
        }
    }
}

fn quote_members(members: &[String]) -> String {
    members
        .iter()
        .map(|m| format!("'{m}'"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Parses a column type such as `int`, `decimal(10,2)`, `varchar(20) charset latin1`
/// or `enum('a','b')`.
pub fn parse_datatype(s: &str) -> Result<DataType> {
    let lowered = s.trim().to_lowercase();
    let (head, charset) = split_charset(&lowered)?;
    let (name, args) = match head.find('(') {
        Some(open) => {
            let close = head
                .rfind(')')
                .ok_or_else(|| invalid_type(s))?;
            (head[..open].trim(), Some(&head[open + 1..close]))
        }
        None => (head.trim(), None),
    };
    let charset = charset.unwrap_or(Charset::Utf8mb4);

    let dtype = match (name, args) {
        ("bool" | "boolean", None) => DataType::Bool,
        ("int" | "integer", None) => DataType::Int,
        ("bigint", None) => DataType::BigInt,
        ("decimal", None) => DataType::Decimal {
            precision: 10,
            scale: 0,
        },
        ("decimal", Some(a)) => {
            let parts = parse_numbers(a, s)?;
            match parts.as_slice() {
                [p] => DataType::Decimal {
                    precision: *p,
                    scale: 0,
                },
                [p, sc] if sc <= p => DataType::Decimal {
                    precision: *p,
                    scale: *sc,
                },
                _ => return Err(invalid_type(s)),
            }
        }
        ("char", None) => DataType::Char { len: 1, charset },
        ("char", Some(a)) => DataType::Char {
            len: single_number(a, s)? as usize,
            charset,
        },
        ("varchar", Some(a)) => DataType::VarChar {
            len: single_number(a, s)? as usize,
            charset,
        },
        ("text", None) => DataType::Text { charset },
        ("binary", Some(a)) => DataType::Binary(single_number(a, s)? as usize),
        ("varbinary", Some(a)) => DataType::VarBinary(single_number(a, s)? as usize),
        ("blob", None) => DataType::Blob,
        ("date", None) => DataType::Date,
        ("time", None) => DataType::Time { precision: 0 },
        ("time", Some(a)) => DataType::Time {
            precision: fsp(a, s)?,
        },
        ("datetime", None) => DataType::Datetime { precision: 0 },
        ("datetime", Some(a)) => DataType::Datetime {
            precision: fsp(a, s)?,
        },
        ("timestamp", None) => DataType::Timestamp { precision: 0 },
        ("timestamp", Some(a)) => DataType::Timestamp {
            precision: fsp(a, s)?,
        },
        ("enum", Some(a)) => DataType::Enum(parse_members(a)),
        ("set", Some(a)) => DataType::Set(parse_members(a)),
        ("json", None) => DataType::Json,
        ("uuid", None) => DataType::Uuid,
        _ => return Err(invalid_type(s)),
    };
    Ok(dtype)
}

fn split_charset(s: &str) -> Result<(&str, Option<Charset>)> {
    for marker in [" character set ", " charset "] {
        if let Some(pos) = s.find(marker) {
            let name = s[pos + marker.len()..].trim();
            let charset = Charset::parse(name).ok_or_else(|| invalid_type(s))?;
            return Ok((&s[..pos], Some(charset)));
        }
    }
    Ok((s, None))
}

fn parse_numbers(args: &str, original: &str) -> Result<Vec<u32>> {
    args.split(',')
        .map(|p| p.trim().parse::<u32>().map_err(|_| invalid_type(original)))
        .collect()
}

fn single_number(args: &str, original: &str) -> Result<u32> {
    match parse_numbers(args, original)?.as_slice() {
        [n] => Ok(*n),
        _ => Err(invalid_type(original)),
    }
}

fn fsp(args: &str, original: &str) -> Result<u8> {
    let n = single_number(args, original)?;
    if n > 6 {
        return Err(invalid_type(original));
    }
    Ok(n as u8)
}

fn parse_members(args: &str) -> Vec<String> {
    args.split(',')
        .map(|m| m.trim().trim_matches('\'').trim_matches('"').to_string())
        .filter(|m| !m.is_empty())
        .collect()
}

fn invalid_type(s: &str) -> FkError {
    FkError::InvalidValue {
        dtype: "column type".to_string(),
        token: s.to_string(),
    }
}
