use std::sync::Arc;
use std::thread;

use frameguard::column::{Column, DType};
use frameguard::data::Value;
use frameguard::dataset::{Dataset, DatasetError};
use frameguard::schema::{ColumnRule, SchemaError, TableSchema, TypeDescriptor};
use frameguard::table::Table;

fn numeric_x_schema() -> TableSchema {
    TableSchema::new(vec![ColumnRule::new(
        "x",
        vec![
            TypeDescriptor::Exact(DType::Int64),
            TypeDescriptor::Exact(DType::Float64),
        ],
    )])
}

fn ragged_table() -> Table {
    Table::with_columns([
        ("x", Column::int64([1, 2, 3])),
        ("y", Column::int64([1])),
    ])
}

#[test]
fn first_read_materializes_the_placeholder() {
    let dataset = Dataset::new(numeric_x_schema());
    assert!(!dataset.is_loaded());

    let table = dataset.data();
    assert!(dataset.is_loaded());
    let column = table.column("x").expect("placeholder column");
    assert_eq!(column.dtype(), DType::Int64);
    let cells: Vec<_> = column.cells().collect();
    assert_eq!(
        cells,
        vec![
            Some(Value::Integer(1)),
            Some(Value::Integer(2)),
            Some(Value::Integer(3)),
        ]
    );
}

#[test]
fn concurrent_readers_observe_one_identical_table() {
    let dataset = Arc::new(Dataset::new(numeric_x_schema()));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let dataset = Arc::clone(&dataset);
            thread::spawn(move || dataset.data())
        })
        .collect();
    let tables: Vec<Arc<Table>> = handles
        .into_iter()
        .map(|handle| handle.join().expect("reader thread"))
        .collect();

    for table in &tables[1..] {
        assert!(Arc::ptr_eq(&tables[0], table));
    }
    assert!(Arc::ptr_eq(&tables[0], &dataset.data()));
}

#[test]
fn constructor_passes_floats_without_repair() {
    let table = Table::with_columns([("x", Column::float64([5.3, 7.0, 9.0, 1.0]))]);
    let dataset = Dataset::with_table(numeric_x_schema(), table.clone()).expect("valid table");
    assert_eq!(*dataset.data(), table);
}

#[test]
fn constructor_repairs_numeric_text_eagerly() {
    let table = Table::with_columns([("x", Column::strings(["1", "2"]))]);
    let dataset = Dataset::with_table(numeric_x_schema(), table).expect("repairable table");

    let held = dataset.data();
    let column = held.column("x").expect("column present");
    assert_eq!(column.dtype(), DType::Int64);
    assert_eq!(
        column.cells().collect::<Vec<_>>(),
        vec![Some(Value::Integer(1)), Some(Value::Integer(2))]
    );
}

#[test]
fn constructor_propagates_schema_failures() {
    let err = Dataset::with_table(numeric_x_schema(), Table::new()).expect_err("missing column");
    assert!(matches!(
        err,
        DatasetError::Schema(SchemaError::MissingColumn { ref column }) if column == "x"
    ));

    let err =
        Dataset::with_table(numeric_x_schema(), ragged_table()).expect_err("ragged table");
    assert!(matches!(err, DatasetError::InvalidAssignment(_)));
}

#[test]
fn set_data_rejects_malformed_tables_and_keeps_the_old_one() {
    let table = Table::with_columns([("x", Column::float64([1.0, 2.0]))]);
    let dataset = Dataset::with_table(numeric_x_schema(), table).expect("valid table");
    let before = dataset.data();

    let err = dataset.set_data(ragged_table()).expect_err("ragged table");
    assert!(matches!(err, DatasetError::InvalidAssignment(_)));
    assert!(Arc::ptr_eq(&before, &dataset.data()));
}

#[test]
fn set_data_replaces_without_schema_revalidation() {
    let table = Table::with_columns([("x", Column::float64([1.0, 2.0]))]);
    let dataset = Dataset::with_table(numeric_x_schema(), table).expect("valid table");

    // Well-formed but schema-violating: the setter only checks structure.
    let replacement = Table::with_columns([("label", Column::strings(["a", "b"]))]);
    dataset.set_data(replacement.clone()).expect("replacement accepted");
    assert_eq!(*dataset.data(), replacement);
}
