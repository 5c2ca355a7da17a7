//! The schema-guarded dataset wrapper and its thread-safe lazy accessor.
//!
//! A [`Dataset`] exclusively owns one table and the [`TableSchema`] it was
//! constructed with. A table supplied at construction is validated eagerly
//! (with repair); a dataset constructed empty materializes a fixed placeholder
//! table on first read, exactly once under concurrency. Replacement through
//! [`Dataset::set_data`] is structurally checked; the schema is not re-applied
//! there.

use std::sync::Arc;

use log::debug;
use parking_lot::RwLock;
use thiserror::Error;

use crate::{
    column::Column,
    schema::{SchemaError, TableSchema},
    table::{Table, TableError},
};

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("Assigned value must be a well-formed table")]
    InvalidAssignment(#[source] TableError),
}

#[derive(Debug)]
pub struct Dataset {
    schema: TableSchema,
    data: RwLock<Option<Arc<Table>>>,
}

impl Dataset {
    /// An empty dataset; the first read materializes the placeholder table.
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            data: RwLock::new(None),
        }
    }

    /// Wraps a caller-supplied table, validating it eagerly with repair
    /// enabled.
    pub fn with_table(schema: TableSchema, mut table: Table) -> Result<Self, DatasetError> {
        table
            .check_integrity()
            .map_err(DatasetError::InvalidAssignment)?;
        schema.validate(&mut table, true)?;
        Ok(Self {
            schema,
            data: RwLock::new(Some(Arc::new(table))),
        })
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// The current table, materializing the placeholder on first read.
    ///
    /// Double-checked: a shared read-lock fast path once populated, a write
    /// lock with a re-check for the one-time initialization. The placeholder
    /// is not validated against the schema.
    pub fn data(&self) -> Arc<Table> {
        if let Some(table) = self.data.read().as_ref() {
            return Arc::clone(table);
        }
        let mut slot = self.data.write();
        let table = slot.get_or_insert_with(|| {
            debug!("Materializing placeholder table on first read");
            Arc::new(placeholder_table())
        });
        Arc::clone(table)
    }

    /// Replaces the held table. The replacement must pass the structural
    /// integrity check; the schema is not re-applied here.
    pub fn set_data(&self, table: Table) -> Result<(), DatasetError> {
        let mut slot = self.data.write();
        table
            .check_integrity()
            .map_err(DatasetError::InvalidAssignment)?;
        *slot = Some(Arc::new(table));
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.data.read().is_some()
    }
}

fn placeholder_table() -> Table {
    let mut table = Table::new();
    table.insert("x", Column::int64([1, 2, 3]));
    table
}
