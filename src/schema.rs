//! Schema model, type descriptors, validation, and column repair.
//!
//! This module owns [`TableSchema`] (the declared column contract a dataset is
//! guarded by), [`TypeDescriptor`] (the closed set of abstract categories and
//! exact dtypes a column may be required to satisfy), and the column-by-column
//! validation routine with its best-effort repair path.
//!
//! ## Responsibilities
//!
//! - YAML schema loading and saving via `serde_yaml`
//! - Scalar-or-sequence `datatype` parsing (a single descriptor normalizes to
//!   a one-element allowed set)
//! - Existence and type checking of declared columns, in declared order
//! - Best-effort coercion toward the first allowed descriptor, with the
//!   swallowed coercion failure preserved as the error cause

use std::{collections::HashSet, fmt, fs::File, io::BufReader, path::Path, str::FromStr};

use anyhow::{Context, Result, anyhow, ensure};
use itertools::Itertools;
use log::info;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use thiserror::Error;

use crate::{
    column::{Column, DType},
    data::Value,
    table::Table,
};

/// One acceptable shape for a column: an abstract category or an exact dtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeDescriptor {
    AnyInt,
    AnyFloat,
    StringLike,
    Exact(DType),
}

impl TypeDescriptor {
    pub fn matches(self, dtype: DType) -> bool {
        match self {
            TypeDescriptor::AnyInt => dtype.is_integer(),
            TypeDescriptor::AnyFloat => dtype.is_float(),
            TypeDescriptor::StringLike => dtype.is_string(),
            TypeDescriptor::Exact(expected) => dtype == expected,
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::AnyInt => f.write_str("any_int"),
            TypeDescriptor::AnyFloat => f.write_str("any_float"),
            TypeDescriptor::StringLike => f.write_str("string"),
            TypeDescriptor::Exact(dtype) => write!(f, "{dtype}"),
        }
    }
}

impl FromStr for TypeDescriptor {
    type Err = anyhow::Error;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token.trim().to_ascii_lowercase().as_str() {
            "any_int" => Ok(TypeDescriptor::AnyInt),
            "any_float" => Ok(TypeDescriptor::AnyFloat),
            "string" => Ok(TypeDescriptor::StringLike),
            other => other.parse::<DType>().map(TypeDescriptor::Exact),
        }
    }
}

impl Serialize for TypeDescriptor {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TypeDescriptor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let token = String::deserialize(deserializer)?;
        TypeDescriptor::from_str(&token).map_err(|err| de::Error::custom(err.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnRule {
    pub name: String,
    #[serde(
        rename = "datatype",
        serialize_with = "serialize_allowed",
        deserialize_with = "deserialize_allowed"
    )]
    pub allowed: Vec<TypeDescriptor>,
}

impl ColumnRule {
    pub fn new(name: impl Into<String>, allowed: Vec<TypeDescriptor>) -> Self {
        Self {
            name: name.into(),
            allowed,
        }
    }

    pub fn single(name: impl Into<String>, descriptor: TypeDescriptor) -> Self {
        Self::new(name, vec![descriptor])
    }

    pub fn accepts(&self, dtype: DType) -> bool {
        self.allowed.iter().any(|descriptor| descriptor.matches(dtype))
    }

    /// Repair aims at the first allowed descriptor.
    pub fn repair_target(&self) -> Option<TypeDescriptor> {
        self.allowed.first().copied()
    }

    pub fn expected_display(&self) -> String {
        self.allowed.iter().join(" | ")
    }
}

fn serialize_allowed<S>(allowed: &[TypeDescriptor], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if let [single] = allowed {
        single.serialize(serializer)
    } else {
        allowed.serialize(serializer)
    }
}

fn deserialize_allowed<'de, D>(deserializer: D) -> Result<Vec<TypeDescriptor>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(TypeDescriptor),
        Many(Vec<TypeDescriptor>),
    }
    match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(single) => Ok(vec![single]),
        OneOrMany::Many(list) => Ok(list),
    }
}

/// The declared contract a dataset's table is validated against.
///
/// `required` names columns that must exist with no type constraint; `columns`
/// carries the typed rules, checked in declared order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TableSchema {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    pub columns: Vec<ColumnRule>,
}

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Missing required column '{column}'")]
    MissingColumn { column: String },
    #[error("Column '{column}' expected {expected}, got {actual}")]
    TypeMismatch {
        column: String,
        expected: String,
        actual: DType,
    },
    #[error("Could not repair column '{column}' to {expected}")]
    UnrepairableColumn {
        column: String,
        expected: String,
        #[source]
        cause: Option<CoercionError>,
    },
}

/// A cell that refused conversion during a repair attempt. Swallowed by the
/// repair path and surfaced only as the cause of
/// [`SchemaError::UnrepairableColumn`].
#[derive(Error, Debug)]
#[error("Row {row} does not convert to {target}")]
pub struct CoercionError {
    row: usize,
    target: TypeDescriptor,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
}

impl TableSchema {
    pub fn new(columns: Vec<ColumnRule>) -> Self {
        Self {
            required: Vec::new(),
            columns,
        }
    }

    pub fn rule(&self, name: &str) -> Option<&ColumnRule> {
        self.columns.iter().find(|rule| rule.name == name)
    }

    /// Verifies the table against this schema, column by column in declared
    /// rule order.
    ///
    /// A column passes when any allowed descriptor matches its dtype. With
    /// `repair` enabled, a failing column is coerced toward the first allowed
    /// descriptor and re-checked; a coercion failure is swallowed (the column
    /// stays unchanged) and the re-check decides. With `repair` disabled the
    /// first failing column reports immediately and the table is untouched.
    pub fn validate(&self, table: &mut Table, repair: bool) -> Result<(), SchemaError> {
        for name in &self.required {
            if self.rule(name).is_none() && !table.contains_column(name) {
                return Err(SchemaError::MissingColumn {
                    column: name.clone(),
                });
            }
        }

        for rule in &self.columns {
            let dtype = match table.column(&rule.name) {
                Some(column) => column.dtype(),
                None => {
                    return Err(SchemaError::MissingColumn {
                        column: rule.name.clone(),
                    });
                }
            };
            if rule.accepts(dtype) {
                continue;
            }
            if !repair {
                return Err(SchemaError::TypeMismatch {
                    column: rule.name.clone(),
                    expected: rule.expected_display(),
                    actual: dtype,
                });
            }

            let cause = match rule.repair_target() {
                Some(target) => {
                    info!("Repairing column '{}' to match {target}", rule.name);
                    match table.column(&rule.name).map(|column| coerce_column(column, target)) {
                        Some(Ok(repaired)) => {
                            table.insert(rule.name.clone(), repaired);
                            None
                        }
                        Some(Err(err)) => Some(err),
                        None => None,
                    }
                }
                None => None,
            };

            let still_failing = table
                .column(&rule.name)
                .map(|column| !rule.accepts(column.dtype()))
                .unwrap_or(true);
            if still_failing {
                return Err(SchemaError::UnrepairableColumn {
                    column: rule.name.clone(),
                    expected: rule.expected_display(),
                    cause,
                });
            }
        }
        Ok(())
    }

    pub fn ensure_valid(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for rule in &self.columns {
            ensure!(
                seen.insert(rule.name.as_str()),
                "Duplicate column rule '{}'",
                rule.name
            );
            ensure!(
                !rule.allowed.is_empty(),
                "Column rule '{}' does not allow any type",
                rule.name
            );
        }
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening schema file {path:?}"))?;
        let reader = BufReader::new(file);
        let schema: TableSchema =
            serde_yaml::from_reader(reader).context("Parsing schema YAML")?;
        schema.ensure_valid()?;
        Ok(schema)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.ensure_valid()?;
        let file = File::create(path).with_context(|| format!("Creating schema file {path:?}"))?;
        serde_yaml::to_writer(file, self).context("Writing schema YAML")
    }
}

fn coerce_column(column: &Column, target: TypeDescriptor) -> Result<Column, CoercionError> {
    match target {
        TypeDescriptor::AnyInt => {
            let cells = collect_cells(column, target, Value::to_integer)?;
            Ok(downcast_integers(cells))
        }
        TypeDescriptor::AnyFloat => Ok(Column::Float64(collect_cells(
            column,
            target,
            Value::to_float,
        )?)),
        TypeDescriptor::StringLike => Ok(Column::Str(
            column
                .cells()
                .map(|cell| cell.map(|value| value.as_display()))
                .collect(),
        )),
        TypeDescriptor::Exact(dtype) => coerce_exact(column, dtype),
    }
}

fn coerce_exact(column: &Column, dtype: DType) -> Result<Column, CoercionError> {
    let target = TypeDescriptor::Exact(dtype);
    let coerced = match dtype {
        DType::Int8 => Column::Int8(collect_cells(column, target, |value| {
            narrow_integer::<i8>(value.to_integer()?)
        })?),
        DType::Int16 => Column::Int16(collect_cells(column, target, |value| {
            narrow_integer::<i16>(value.to_integer()?)
        })?),
        DType::Int32 => Column::Int32(collect_cells(column, target, |value| {
            narrow_integer::<i32>(value.to_integer()?)
        })?),
        DType::Int64 => Column::Int64(collect_cells(column, target, Value::to_integer)?),
        DType::Float32 => Column::Float32(collect_cells(column, target, |value| {
            Ok(value.to_float()? as f32)
        })?),
        DType::Float64 => Column::Float64(collect_cells(column, target, Value::to_float)?),
        DType::Bool => Column::Bool(collect_cells(column, target, Value::to_boolean)?),
        DType::Str => Column::Str(collect_cells(column, target, |value| {
            Ok(value.as_display())
        })?),
        DType::DateTime => Column::DateTime(collect_cells(column, target, Value::to_datetime)?),
    };
    Ok(coerced)
}

fn collect_cells<T>(
    column: &Column,
    target: TypeDescriptor,
    convert: impl Fn(&Value) -> Result<T>,
) -> Result<Vec<Option<T>>, CoercionError> {
    column
        .cells()
        .enumerate()
        .map(|(row, cell)| match cell {
            None => Ok(None),
            Some(value) => convert(&value).map(Some).map_err(|err| CoercionError {
                row,
                target,
                source: err.into(),
            }),
        })
        .collect()
}

fn narrow_integer<T: TryFrom<i64>>(value: i64) -> Result<T> {
    T::try_from(value)
        .map_err(|_| anyhow!("Value {value} is out of range for the target integer width"))
}

/// Stores `i64` cells in the smallest integer dtype that fits every value.
/// All-null input downcasts to `int8`.
fn downcast_integers(values: Vec<Option<i64>>) -> Column {
    let min = values.iter().flatten().min().copied().unwrap_or(0);
    let max = values.iter().flatten().max().copied().unwrap_or(0);
    if min >= i8::MIN as i64 && max <= i8::MAX as i64 {
        Column::Int8(values.into_iter().map(|v| v.map(|x| x as i8)).collect())
    } else if min >= i16::MIN as i64 && max <= i16::MAX as i64 {
        Column::Int16(values.into_iter().map(|v| v.map(|x| x as i16)).collect())
    } else if min >= i32::MIN as i64 && max <= i32::MAX as i64 {
        Column::Int32(values.into_iter().map(|v| v.map(|x| x as i32)).collect())
    } else {
        Column::Int64(values)
    }
}
