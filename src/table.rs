use std::borrow::Cow;
use std::fmt::{self, Write as _};

use thiserror::Error;

use crate::column::Column;

#[derive(Error, Debug)]
pub enum TableError {
    #[error("Duplicate column '{0}'")]
    DuplicateColumn(String),
    #[error("Column '{name}' holds {len} row(s) but the table holds {expected}")]
    RaggedColumn {
        name: String,
        len: usize,
        expected: usize,
    },
}

/// An ordered collection of named, equal-length columns sharing a row index.
///
/// Construction is permissive; [`Table::check_integrity`] is the structural
/// gate applied wherever a value must actually be a table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<(String, Column)>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_columns<N: Into<String>>(columns: impl IntoIterator<Item = (N, Column)>) -> Self {
        Self {
            columns: columns
                .into_iter()
                .map(|(name, column)| (name.into(), column))
                .collect(),
        }
    }

    /// Replaces an existing column of the same name in place, otherwise
    /// appends.
    pub fn insert(&mut self, name: impl Into<String>, column: Column) {
        let name = name.into();
        if let Some(slot) = self.columns.iter_mut().find(|(existing, _)| *existing == name) {
            slot.1 = column;
        } else {
            self.columns.push((name, column));
        }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, column)| column)
    }

    pub fn contains_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.columns
            .iter()
            .map(|(name, column)| (name.as_str(), column))
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.columns
            .first()
            .map(|(_, column)| column.len())
            .unwrap_or(0)
    }

    /// The structural "is a table" test: unique column names, equal lengths.
    pub fn check_integrity(&self) -> Result<(), TableError> {
        for (idx, (name, _)) in self.columns.iter().enumerate() {
            if self.columns[..idx].iter().any(|(seen, _)| seen == name) {
                return Err(TableError::DuplicateColumn(name.clone()));
            }
        }
        let expected = self.row_count();
        for (name, column) in &self.columns {
            if column.len() != expected {
                return Err(TableError::RaggedColumn {
                    name: name.clone(),
                    len: column.len(),
                    expected,
                });
            }
        }
        Ok(())
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.columns.is_empty() {
            return Ok(());
        }
        let headers: Vec<String> = self.names().map(String::from).collect();
        let rows: Vec<Vec<String>> = (0..self.row_count())
            .map(|row| {
                self.columns
                    .iter()
                    .map(|(_, column)| {
                        column
                            .cell(row)
                            .map(|value| value.as_display())
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect();
        f.write_str(&render_table(&headers, &rows))
    }
}

fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths = headers
        .iter()
        .map(|h| sanitize_cell(h).chars().count())
        .collect::<Vec<_>>();
    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(widths.len()) {
            widths[idx] = widths[idx].max(sanitize_cell(cell).chars().count());
        }
    }
    for width in &mut widths {
        *width = (*width).max(1);
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(headers, &widths));

    let separator_widths = widths.iter().map(|w| (*w).max(3)).collect::<Vec<_>>();
    let separator_cells = separator_widths
        .iter()
        .map(|w| "-".repeat(*w))
        .collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&separator_cells, &separator_widths));

    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths));
    }
    output
}

fn format_row(values: &[String], widths: &[usize]) -> String {
    let mut cells = Vec::with_capacity(values.len());
    for (idx, value) in values.iter().enumerate() {
        let Some(width) = widths.get(idx) else {
            break;
        };
        let sanitized = sanitize_cell(value);
        let padding = width.saturating_sub(sanitized.chars().count());
        let mut cell = sanitized.into_owned();
        if padding > 0 {
            cell.push_str(&" ".repeat(padding));
        }
        cells.push(cell);
    }
    let mut line = cells.join("  ");
    while line.ends_with(' ') {
        line.pop();
    }
    line
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(
            value
                .chars()
                .map(|ch| match ch {
                    '\n' | '\r' | '\t' => ' ',
                    other => other,
                })
                .collect(),
        )
    } else {
        Cow::Borrowed(value)
    }
}
