use std::cmp::Ordering;
use std::fmt;

use thiserror::Error;

/// Declared SQL column types understood by the catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum SqlType {
    TinyInt,
    SmallInt,
    MediumInt,
    Int,
    BigInt,
    Float,
    Double,
    Varchar,
    Text,
    Bool,
}

impl SqlType {
    /// Returns true for the integer family (including `BOOL`, stored as `TINYINT(1)`).
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            SqlType::TinyInt
                | SqlType::SmallInt
                | SqlType::MediumInt
                | SqlType::Int
                | SqlType::BigInt
                | SqlType::Bool
        )
    }

    pub fn is_string(self) -> bool {
        matches!(self, SqlType::Varchar | SqlType::Text)
    }

    /// Inclusive `(min, max)` range of a signed integer type.
    fn signed_bounds(self) -> (i128, i128) {
        match self {
            SqlType::TinyInt | SqlType::Bool => (i8::MIN as i128, i8::MAX as i128),
            SqlType::SmallInt => (i16::MIN as i128, i16::MAX as i128),
            SqlType::MediumInt => (-(1 << 23), (1 << 23) - 1),
            SqlType::Int => (i32::MIN as i128, i32::MAX as i128),
            _ => (i64::MIN as i128, i64::MAX as i128),
        }
    }

    /// Upper bound of an unsigned integer type.
    fn unsigned_upper(self) -> i128 {
        match self {
            SqlType::TinyInt | SqlType::Bool => u8::MAX as i128,
            SqlType::SmallInt => u16::MAX as i128,
            SqlType::MediumInt => (1 << 24) - 1,
            SqlType::Int => u32::MAX as i128,
            _ => u64::MAX as i128,
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SqlType::TinyInt => "tinyint",
            SqlType::SmallInt => "smallint",
            SqlType::MediumInt => "mediumint",
            SqlType::Int => "int",
            SqlType::BigInt => "bigint",
            SqlType::Float => "float",
            SqlType::Double => "double",
            SqlType::Varchar => "varchar",
            SqlType::Text => "text",
            SqlType::Bool => "tinyint(1)",
        };
        f.write_str(name)
    }
}

/// A column's declared type together with the flags that affect conversion.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct FieldType {
    pub tp: SqlType,
    #[serde(default)]
    pub unsigned: bool,
    /// Declared display/character length, e.g. `VARCHAR(20)`.
    #[serde(default)]
    pub flen: Option<u32>,
}

impl FieldType {
    pub fn new(tp: SqlType) -> Self {
        Self {
            tp,
            unsigned: false,
            flen: None,
        }
    }

    pub fn unsigned(tp: SqlType) -> Self {
        Self {
            tp,
            unsigned: true,
            flen: None,
        }
    }

    pub fn with_len(mut self, flen: u32) -> Self {
        self.flen = Some(flen);
        self
    }
}

impl From<SqlType> for FieldType {
    fn from(tp: SqlType) -> Self {
        FieldType::new(tp)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tp)?;
        if let Some(len) = self.flen {
            write!(f, "({len})")?;
        }
        if self.unsigned {
            f.write_str(" unsigned")?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Value {
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Bool(bool),
    Null,
}

/// Result of converting a value into a declared column type.
#[derive(Clone, Debug, PartialEq)]
pub enum Conversion {
    /// The value is representable without loss.
    Exact(Value),
    /// The value was rounded or cut to fit; the payload is the converted value.
    Truncated(Value),
    /// The value lies outside the target type's range.
    Overflow,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConvertError {
    #[error("cannot convert {value} to {target}")]
    Unsupported { value: String, target: SqlType },
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Parse a numeric literal the way the SQL front-end types it: integers
    /// become `Int` (or `UInt` past `i64::MAX`), everything else `Float`.
    pub fn parse_number(text: &str) -> Option<Value> {
        if let Ok(i) = text.parse::<i64>() {
            return Some(Value::Int(i));
        }
        if let Ok(u) = text.parse::<u64>() {
            return Some(Value::UInt(u));
        }
        text.parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(Value::Float)
    }

    /// Convert into `ft`, distinguishing exact, truncated and out-of-range results.
    pub fn convert_to(&self, ft: &FieldType) -> Result<Conversion, ConvertError> {
        if self.is_null() {
            return Ok(Conversion::Exact(Value::Null));
        }
        if ft.tp.is_integer() {
            return self.convert_to_integer(ft);
        }
        match ft.tp {
            SqlType::Float | SqlType::Double => match self.to_f64() {
                Some((f, exact)) if exact => Ok(Conversion::Exact(Value::Float(f))),
                Some((f, _)) => Ok(Conversion::Truncated(Value::Float(f))),
                None => Err(self.unsupported(ft.tp)),
            },
            SqlType::Varchar | SqlType::Text => {
                let text = self.to_string();
                match ft.flen {
                    Some(len) if text.chars().count() > len as usize => Ok(Conversion::Truncated(
                        Value::Text(text.chars().take(len as usize).collect()),
                    )),
                    _ => Ok(Conversion::Exact(Value::Text(text))),
                }
            }
            _ => Err(self.unsupported(ft.tp)),
        }
    }

    fn convert_to_integer(&self, ft: &FieldType) -> Result<Conversion, ConvertError> {
        let (value, truncated) = match self {
            Value::Int(i) => (*i as i128, false),
            Value::UInt(u) => (*u as i128, false),
            Value::Bool(b) => (*b as i128, false),
            Value::Float(f) => {
                if !f.is_finite() {
                    return Ok(Conversion::Overflow);
                }
                let rounded = f.round();
                (rounded as i128, rounded != *f)
            }
            Value::Text(s) => match parse_int_prefix(s) {
                Some(parsed) => parsed,
                None => return Ok(Conversion::Overflow),
            },
            Value::Null => return Ok(Conversion::Exact(Value::Null)),
        };

        let (lo, hi) = if ft.unsigned {
            (0, ft.tp.unsigned_upper())
        } else {
            ft.tp.signed_bounds()
        };
        if value < lo || value > hi {
            return Ok(Conversion::Overflow);
        }
        let converted = if ft.unsigned {
            Value::UInt(value as u64)
        } else {
            Value::Int(value as i64)
        };
        Ok(if truncated {
            Conversion::Truncated(converted)
        } else {
            Conversion::Exact(converted)
        })
    }

    /// Compare across numeric kinds; text compared with a number is read as a
    /// number. `None` when either side is NULL.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => None,
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Int(_) | Value::UInt(_) | Value::Bool(_), Value::Int(_) | Value::UInt(_) | Value::Bool(_)) => {
                Some(self.as_i128()?.cmp(&other.as_i128()?))
            }
            _ => {
                let (l, _) = self.to_f64()?;
                let (r, _) = other.to_f64()?;
                l.partial_cmp(&r)
            }
        }
    }

    fn as_i128(&self) -> Option<i128> {
        match self {
            Value::Int(i) => Some(*i as i128),
            Value::UInt(u) => Some(*u as i128),
            Value::Bool(b) => Some(*b as i128),
            _ => None,
        }
    }

    /// Numeric view of the value and whether it was read without loss.
    fn to_f64(&self) -> Option<(f64, bool)> {
        match self {
            Value::Int(i) => Some((*i as f64, true)),
            Value::UInt(u) => Some((*u as f64, true)),
            Value::Float(f) => Some((*f, true)),
            Value::Bool(b) => Some((*b as i64 as f64, true)),
            Value::Text(s) => {
                let trimmed = s.trim();
                if let Ok(f) = trimmed.parse::<f64>() {
                    return Some((f, true));
                }
                let prefix = numeric_prefix(trimmed);
                Some((prefix.parse::<f64>().unwrap_or(0.0), false))
            }
            Value::Null => None,
        }
    }

    fn unsupported(&self, target: SqlType) -> ConvertError {
        ConvertError::Unsupported {
            value: self.to_string(),
            target,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::UInt(u) => write!(f, "{u}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(s) => f.write_str(s),
            Value::Bool(b) => write!(f, "{}", *b as u8),
            Value::Null => f.write_str("NULL"),
        }
    }
}

/// Read an integer out of a string the way MySQL coerces it: a fully numeric
/// string is exact, a fractional one is rounded, and trailing garbage is cut.
/// Returns `None` when the number does not even fit an `i128`.
fn parse_int_prefix(s: &str) -> Option<(i128, bool)> {
    let trimmed = s.trim();
    if let Ok(i) = trimmed.parse::<i128>() {
        return Some((i, false));
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        if !f.is_finite() || f.abs() >= 1e38 {
            return None;
        }
        let rounded = f.round();
        return Some((rounded as i128, rounded != f));
    }
    let prefix = numeric_prefix(trimmed);
    match prefix.parse::<f64>() {
        Ok(f) if f.abs() >= 1e38 => None,
        Ok(f) => Some((f.round() as i128, true)),
        Err(_) => Some((0, true)),
    }
}

/// Longest leading slice of `s` that looks like a decimal number.
fn numeric_prefix(s: &str) -> &str {
    let bytes = s.as_bytes();
    let mut end = 0;
    if end < bytes.len() && (bytes[end] == b'-' || bytes[end] == b'+') {
        end += 1;
    }
    let mut seen_dot = false;
    while end < bytes.len() {
        match bytes[end] {
            b'0'..=b'9' => end += 1,
            b'.' if !seen_dot => {
                seen_dot = true;
                end += 1;
            }
            _ => break,
        }
    }
    &s[..end]
}
