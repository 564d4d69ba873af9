//! Database access layer.
//!
//! - Datasource context and connection pools
//! - Query execution with timeouts and row limits
//! - Row to JSON decoding
//! - Tagged decoding of catalog rows

pub mod catalog;
pub mod executor;
pub mod params;
pub mod pool;
pub mod types;

pub use catalog::{
    ColumnInfo, ColumnRow, ColumnShape, ForeignKeyInfo, ForeignKeyRow, IndexInfo, IndexRow,
    PrimaryKeyRow, group_indexes,
};
pub use executor::QueryExecutor;
pub use pool::{ActiveDatasource, ConnectionCheck, DatasourceManager, DbPool, PoolSettings};
