use std::fmt;

use anyhow::{Context, Result, anyhow, bail};
use chrono::NaiveDateTime;

/// A single typed cell held by a column. Narrow integer storage widens to
/// `Integer` when surfaced here.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
    DateTime(NaiveDateTime),
}

impl Value {
    pub fn as_display(&self) -> String {
        match self {
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => {
                if f.fract() == 0.0 {
                    (*f as i64).to_string()
                } else {
                    f.to_string()
                }
            }
            Value::Boolean(b) => b.to_string(),
            Value::String(s) => s.clone(),
            Value::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    pub fn to_integer(&self) -> Result<i64> {
        match self {
            Value::Integer(i) => Ok(*i),
            Value::Float(f) => integral_float(*f),
            Value::Boolean(b) => Ok(i64::from(*b)),
            Value::String(s) => parse_integer_text(s),
            Value::DateTime(_) => Err(anyhow!("Datetime values do not convert to integer")),
        }
    }

    pub fn to_float(&self) -> Result<f64> {
        match self {
            Value::Integer(i) => Ok(*i as f64),
            Value::Float(f) => Ok(*f),
            Value::Boolean(b) => Ok(f64::from(u8::from(*b))),
            Value::String(s) => parse_float_text(s),
            Value::DateTime(_) => Err(anyhow!("Datetime values do not convert to float")),
        }
    }

    pub fn to_boolean(&self) -> Result<bool> {
        match self {
            Value::Boolean(b) => Ok(*b),
            Value::Integer(0) => Ok(false),
            Value::Integer(1) => Ok(true),
            Value::String(s) => parse_boolean_token(s),
            other => Err(anyhow!("Cannot interpret {other} as boolean")),
        }
    }

    pub fn to_datetime(&self) -> Result<NaiveDateTime> {
        match self {
            Value::DateTime(dt) => Ok(*dt),
            Value::String(s) => parse_naive_datetime(s),
            other => Err(anyhow!("Cannot interpret {other} as datetime")),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

pub fn parse_naive_datetime(value: &str) -> Result<NaiveDateTime> {
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%d/%m/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    for fmt in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value.trim(), fmt) {
            return Ok(parsed);
        }
    }
    Err(anyhow!("Failed to parse '{value}' as datetime"))
}

/// Accepts plain integer text and integral float text ("3.0"); anything lossy
/// or non-numeric fails.
pub fn parse_integer_text(value: &str) -> Result<i64> {
    let trimmed = value.trim();
    if let Ok(parsed) = trimmed.parse::<i64>() {
        return Ok(parsed);
    }
    let as_float: f64 = trimmed
        .parse()
        .with_context(|| format!("Failed to parse '{value}' as integer"))?;
    integral_float(as_float).with_context(|| format!("Failed to parse '{value}' as integer"))
}

pub fn parse_float_text(value: &str) -> Result<f64> {
    value
        .trim()
        .parse()
        .with_context(|| format!("Failed to parse '{value}' as float"))
}

pub fn parse_boolean_token(value: &str) -> Result<bool> {
    let lowered = value.trim().to_ascii_lowercase();
    match lowered.as_str() {
        "true" | "t" | "yes" | "y" | "1" => Ok(true),
        "false" | "f" | "no" | "n" | "0" => Ok(false),
        _ => bail!("Failed to parse '{value}' as boolean"),
    }
}

fn integral_float(value: f64) -> Result<i64> {
    if !value.is_finite() || value.fract() != 0.0 {
        bail!("Value {value} is not an integral number");
    }
    if value < i64::MIN as f64 || value >= i64::MAX as f64 {
        bail!("Value {value} overflows the integer range");
    }
    Ok(value as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    #[test]
    fn parse_naive_datetime_supports_multiple_formats() {
        let expected =
            NaiveDateTime::parse_from_str("2024-05-06 14:30:00", "%Y-%m-%d %H:%M:%S").unwrap();
        assert_eq!(
            parse_naive_datetime("2024-05-06T14:30:00").unwrap(),
            expected
        );
        assert_eq!(
            parse_naive_datetime("06/05/2024 14:30:00").unwrap(),
            expected
        );
        assert_eq!(parse_naive_datetime("2024-05-06 14:30").unwrap(), expected);
        assert!(parse_naive_datetime("yesterday").is_err());
    }

    #[test]
    fn parse_integer_text_accepts_integral_float_text() {
        assert_eq!(parse_integer_text("42").unwrap(), 42);
        assert_eq!(parse_integer_text(" -7 ").unwrap(), -7);
        assert_eq!(parse_integer_text("3.0").unwrap(), 3);
        assert!(parse_integer_text("3.5").is_err());
        assert!(parse_integer_text("abc").is_err());
    }

    #[test]
    fn parse_boolean_token_covers_common_spellings() {
        assert!(parse_boolean_token("Yes").unwrap());
        assert!(!parse_boolean_token("0").unwrap());
        assert!(parse_boolean_token("maybe").is_err());
    }

    #[test]
    fn integral_floats_render_without_fraction() {
        assert_eq!(Value::Float(7.0).as_display(), "7");
        assert_eq!(Value::Float(5.3).as_display(), "5.3");
    }

    #[test]
    fn conversions_fail_loudly_on_incompatible_values() {
        assert!(Value::String("a".to_string()).to_integer().is_err());
        assert!(Value::Integer(2).to_boolean().is_err());
        assert_eq!(Value::Boolean(true).to_integer().unwrap(), 1);
        assert_eq!(Value::Integer(4).to_float().unwrap(), 4.0);
    }
}
