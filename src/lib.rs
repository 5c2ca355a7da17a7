pub mod column;
pub mod data;
pub mod dataset;
pub mod schema;
pub mod table;

use std::{env, sync::OnceLock};

use log::LevelFilter;

pub use column::{Column, DType};
pub use data::Value;
pub use dataset::{Dataset, DatasetError};
pub use schema::{ColumnRule, SchemaError, TableSchema, TypeDescriptor};
pub use table::{Table, TableError};

static LOGGER: OnceLock<()> = OnceLock::new();

pub fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("frameguard", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}
