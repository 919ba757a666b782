//! Field validation for untyped API records.
//!
//! Every domain object is built from a `serde_json::Value` through [`Fields`],
//! which checks one field at a time and fails on the first violation.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde_json::{Map, Value};
use url::Url;

use crate::error::{Constraint, ValidationError};

/// True iff `s` parses to a valid point in time.
pub fn is_valid_date(s: &str) -> bool {
    parse_date(s).is_some()
}

/// True iff `s` parses as a well-formed absolute URL.
pub fn is_valid_url(s: &str) -> bool {
    parse_url(s).is_some()
}

/// Parse a timestamp as sent by the API.
///
/// Accepts RFC 3339, RFC 2822, and offset-less ISO 8601 date-times or dates,
/// the latter two read as UTC.
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Parse an absolute URL.
pub fn parse_url(s: &str) -> Option<Url> {
    Url::parse(s).ok()
}

/// Check that `value` has between `min` and `max` characters.
pub fn check_length(
    field: &str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(ValidationError::new(field, Constraint::Length { min, max }));
    }
    Ok(())
}

/// Check that `value` matches `re`, reporting `pattern` on failure.
pub fn check_pattern(
    field: &str,
    value: &str,
    re: &Regex,
    pattern: &'static str,
) -> Result<(), ValidationError> {
    if !re.is_match(value) {
        return Err(ValidationError::new(field, Constraint::Pattern { pattern }));
    }
    Ok(())
}

/// Read-only view over a JSON object, with typed field accessors.
///
/// A `null` field is treated the same as an absent one.
#[derive(Debug, Clone, Copy)]
pub struct Fields<'a> {
    map: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
    /// Wrap a record. Fails if `value` is not a JSON object.
    pub fn new(value: &'a Value) -> Result<Self, ValidationError> {
        value
            .as_object()
            .map(|map| Self { map })
            .ok_or_else(|| {
                ValidationError::new("", Constraint::Type {
                    expected: "an object",
                })
            })
    }

    fn get(&self, name: &str) -> Option<&'a Value> {
        self.map.get(name).filter(|v| !v.is_null())
    }

    pub fn required(&self, name: &str) -> Result<&'a Value, ValidationError> {
        self.get(name)
            .ok_or_else(|| ValidationError::new(name, Constraint::Required))
    }

    pub fn integer(&self, name: &str) -> Result<i64, ValidationError> {
        as_integer(name, self.required(name)?)
    }

    pub fn optional_integer(&self, name: &str) -> Result<Option<i64>, ValidationError> {
        self.get(name).map(|v| as_integer(name, v)).transpose()
    }

    pub fn string(&self, name: &str) -> Result<&'a str, ValidationError> {
        as_str(name, self.required(name)?)
    }

    pub fn optional_string(&self, name: &str) -> Result<Option<&'a str>, ValidationError> {
        self.get(name).map(|v| as_str(name, v)).transpose()
    }

    pub fn date(&self, name: &str) -> Result<DateTime<Utc>, ValidationError> {
        let raw = self.string(name)?;
        parse_date(raw).ok_or_else(|| ValidationError::new(name, Constraint::Date))
    }

    pub fn url(&self, name: &str) -> Result<Url, ValidationError> {
        let raw = self.string(name)?;
        parse_url(raw).ok_or_else(|| ValidationError::new(name, Constraint::Url))
    }

    /// Loose check that a nested record is present and is an object.
    pub fn object(&self, name: &str) -> Result<&'a Value, ValidationError> {
        let value = self.required(name)?;
        if !value.is_object() {
            return Err(ValidationError::new(name, Constraint::Type {
                expected: "an object",
            }));
        }
        Ok(value)
    }

    pub fn optional_object(&self, name: &str) -> Result<Option<&'a Value>, ValidationError> {
        match self.get(name) {
            None => Ok(None),
            Some(_) => self.object(name).map(Some),
        }
    }

    pub fn array(&self, name: &str) -> Result<&'a [Value], ValidationError> {
        self.required(name)?
            .as_array()
            .map(Vec::as_slice)
            .ok_or_else(|| ValidationError::new(name, Constraint::Type {
                expected: "an array",
            }))
    }

    pub fn optional_integer_array(&self, name: &str) -> Result<Option<Vec<i64>>, ValidationError> {
        if self.get(name).is_none() {
            return Ok(None);
        }
        self.array(name)?
            .iter()
            .enumerate()
            .map(|(i, v)| as_integer(&format!("{name}[{i}]"), v))
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }
}

fn as_integer(name: &str, value: &Value) -> Result<i64, ValidationError> {
    if let Some(n) = value.as_i64() {
        return Ok(n);
    }
    // Integral floats such as `3.0` are accepted; the API is JSON-number typed.
    match value.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.007_199_254_740_992e15 => {
            Ok(f as i64)
        }
        _ => Err(ValidationError::new(name, Constraint::Type {
            expected: "an integer",
        })),
    }
}

fn as_str<'a>(name: &str, value: &'a Value) -> Result<&'a str, ValidationError> {
    value.as_str().ok_or_else(|| {
        ValidationError::new(name, Constraint::Type {
            expected: "a string",
        })
    })
}
