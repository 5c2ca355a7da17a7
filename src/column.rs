//! Concrete column storage and the closed set of runtime column types.

use std::{fmt, str::FromStr};

use anyhow::{Error, anyhow};
use chrono::NaiveDateTime;

use crate::data::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DType {
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Bool,
    Str,
    DateTime,
}

impl DType {
    pub fn is_integer(self) -> bool {
        matches!(self, DType::Int8 | DType::Int16 | DType::Int32 | DType::Int64)
    }

    pub fn is_float(self) -> bool {
        matches!(self, DType::Float32 | DType::Float64)
    }

    pub fn is_string(self) -> bool {
        matches!(self, DType::Str)
    }

    pub fn name(self) -> &'static str {
        match self {
            DType::Int8 => "int8",
            DType::Int16 => "int16",
            DType::Int32 => "int32",
            DType::Int64 => "int64",
            DType::Float32 => "float32",
            DType::Float64 => "float64",
            DType::Bool => "bool",
            DType::Str => "string",
            DType::DateTime => "datetime",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DType {
    type Err = Error;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token.trim().to_ascii_lowercase().as_str() {
            "int8" => Ok(DType::Int8),
            "int16" => Ok(DType::Int16),
            "int32" => Ok(DType::Int32),
            "int64" => Ok(DType::Int64),
            "float32" => Ok(DType::Float32),
            "float64" => Ok(DType::Float64),
            "bool" => Ok(DType::Bool),
            "string" => Ok(DType::Str),
            "datetime" => Ok(DType::DateTime),
            other => Err(anyhow!("Unknown column type '{other}'")),
        }
    }
}

/// A named table column's storage: one variant per concrete dtype, missing
/// values as `None`.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Int8(Vec<Option<i8>>),
    Int16(Vec<Option<i16>>),
    Int32(Vec<Option<i32>>),
    Int64(Vec<Option<i64>>),
    Float32(Vec<Option<f32>>),
    Float64(Vec<Option<f64>>),
    Bool(Vec<Option<bool>>),
    Str(Vec<Option<String>>),
    DateTime(Vec<Option<NaiveDateTime>>),
}

impl Column {
    pub fn dtype(&self) -> DType {
        match self {
            Column::Int8(_) => DType::Int8,
            Column::Int16(_) => DType::Int16,
            Column::Int32(_) => DType::Int32,
            Column::Int64(_) => DType::Int64,
            Column::Float32(_) => DType::Float32,
            Column::Float64(_) => DType::Float64,
            Column::Bool(_) => DType::Bool,
            Column::Str(_) => DType::Str,
            Column::DateTime(_) => DType::DateTime,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Column::Int8(v) => v.len(),
            Column::Int16(v) => v.len(),
            Column::Int32(v) => v.len(),
            Column::Int64(v) => v.len(),
            Column::Float32(v) => v.len(),
            Column::Float64(v) => v.len(),
            Column::Bool(v) => v.len(),
            Column::Str(v) => v.len(),
            Column::DateTime(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The cell at `row`, or `None` when missing or out of range.
    pub fn cell(&self, row: usize) -> Option<Value> {
        match self {
            Column::Int8(v) => v.get(row).copied().flatten().map(|x| Value::Integer(x.into())),
            Column::Int16(v) => v.get(row).copied().flatten().map(|x| Value::Integer(x.into())),
            Column::Int32(v) => v.get(row).copied().flatten().map(|x| Value::Integer(x.into())),
            Column::Int64(v) => v.get(row).copied().flatten().map(Value::Integer),
            Column::Float32(v) => v.get(row).copied().flatten().map(|x| Value::Float(x.into())),
            Column::Float64(v) => v.get(row).copied().flatten().map(Value::Float),
            Column::Bool(v) => v.get(row).copied().flatten().map(Value::Boolean),
            Column::Str(v) => v.get(row).and_then(|cell| cell.clone()).map(Value::String),
            Column::DateTime(v) => v.get(row).copied().flatten().map(Value::DateTime),
        }
    }

    pub fn cells(&self) -> impl Iterator<Item = Option<Value>> + '_ {
        (0..self.len()).map(|row| self.cell(row))
    }

    pub fn int64(values: impl IntoIterator<Item = i64>) -> Self {
        Column::Int64(values.into_iter().map(Some).collect())
    }

    pub fn float64(values: impl IntoIterator<Item = f64>) -> Self {
        Column::Float64(values.into_iter().map(Some).collect())
    }

    pub fn bools(values: impl IntoIterator<Item = bool>) -> Self {
        Column::Bool(values.into_iter().map(Some).collect())
    }

    pub fn strings<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        Column::Str(values.into_iter().map(|s| Some(s.into())).collect())
    }

    pub fn datetimes(values: impl IntoIterator<Item = NaiveDateTime>) -> Self {
        Column::DateTime(values.into_iter().map(Some).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dtype_tokens_round_trip() {
        for dtype in [
            DType::Int8,
            DType::Int16,
            DType::Int32,
            DType::Int64,
            DType::Float32,
            DType::Float64,
            DType::Bool,
            DType::Str,
            DType::DateTime,
        ] {
            assert_eq!(dtype.name().parse::<DType>().unwrap(), dtype);
        }
        assert!("int65".parse::<DType>().is_err());
    }

    #[test]
    fn narrow_integers_widen_through_cell() {
        let column = Column::Int8(vec![Some(5), None]);
        assert_eq!(column.cell(0), Some(Value::Integer(5)));
        assert_eq!(column.cell(1), None);
        assert_eq!(column.cell(2), None);
        assert!(column.dtype().is_integer());
    }

    #[test]
    fn constructor_helpers_hold_no_nulls() {
        let column = Column::strings(["a", "b"]);
        assert_eq!(column.len(), 2);
        assert_eq!(column.cell(1), Some(Value::String("b".to_string())));
    }
}
