//! Query execution engine.
//!
//! Runs a [`BuiltQuery`] (or validated free-form SQL) against the active pool
//! with a timeout and a row limit. Rows are streamed and only `limit + 1` are
//! fetched, so a truncated result is detected without reading the whole set.
//!
//! Each driver module below provides the same interface; the code is kept
//! parallel so the differences stand out.

use crate::builder::BuiltQuery;
use crate::config::{DEFAULT_QUERY_TIMEOUT_SECS, DEFAULT_SHORT_QUERY_TIMEOUT_SECS};
use crate::db::pool::DbPool;
use crate::db::types::RowToJson;
use crate::error::{DbError, DbResult};
use crate::models::{MAX_ROW_LIMIT, QueryParam, RowSet};
use futures_util::StreamExt;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Executes queries with the configured timeouts.
#[derive(Debug, Clone, Copy)]
pub struct QueryExecutor {
    query_timeout: Duration,
    short_timeout: Duration,
}

impl QueryExecutor {
    pub fn new() -> Self {
        Self::with_timeouts(
            Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS),
            Duration::from_secs(DEFAULT_SHORT_QUERY_TIMEOUT_SECS),
        )
    }

    pub fn with_timeouts(query_timeout: Duration, short_timeout: Duration) -> Self {
        Self {
            query_timeout,
            short_timeout,
        }
    }

    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    pub fn short_timeout(&self) -> Duration {
        self.short_timeout
    }

    /// Catalog query under the standard timeout.
    pub async fn fetch(&self, pool: &DbPool, query: &BuiltQuery) -> DbResult<RowSet> {
        self.fetch_with(pool, &query.sql, &query.args, MAX_ROW_LIMIT, self.query_timeout)
            .await
    }

    /// Database-info query under the short timeout.
    pub async fn fetch_info(&self, pool: &DbPool, query: &BuiltQuery) -> DbResult<RowSet> {
        self.fetch_with(pool, &query.sql, &query.args, MAX_ROW_LIMIT, self.short_timeout)
            .await
    }

    /// Execute with an explicit row limit and timeout.
    ///
    /// `limit` is clamped to `1..=MAX_ROW_LIMIT`.
    pub async fn fetch_with(
        &self,
        pool: &DbPool,
        sql: &str,
        args: &[QueryParam],
        limit: u32,
        query_timeout: Duration,
    ) -> DbResult<RowSet> {
        let row_limit = limit.clamp(1, MAX_ROW_LIMIT);

        debug!(
            sql = %sql,
            args = args.len(),
            limit = row_limit,
            timeout_secs = query_timeout.as_secs(),
            "Executing query"
        );

        match pool {
            DbPool::MySql(p) => {
                let rows = mysql::fetch_rows(p, sql, args, row_limit, query_timeout).await?;
                Ok(process_rows(rows, row_limit))
            }
            DbPool::Postgres(p) => {
                let rows = postgres::fetch_rows(p, sql, args, row_limit, query_timeout).await?;
                Ok(process_rows(rows, row_limit))
            }
            DbPool::SQLite(p) => {
                let rows = sqlite::fetch_rows(p, sql, args, row_limit, query_timeout).await?;
                Ok(process_rows(rows, row_limit))
            }
        }
    }
}

impl Default for QueryExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert driver rows into a positional [`RowSet`].
fn process_rows<R: RowToJson>(rows: Vec<R>, row_limit: u32) -> RowSet {
    let Some(first) = rows.first() else {
        return RowSet::default();
    };

    let columns = first.column_names();
    let total_rows = rows.len();
    let truncated = total_rows > row_limit as usize;

    if truncated {
        warn!(limit = row_limit, "Query result truncated");
    }

    RowSet {
        columns,
        rows: rows
            .iter()
            .take(row_limit as usize)
            .map(RowToJson::to_json_values)
            .collect(),
        truncated,
    }
}

// =============================================================================
// Common Helper Functions
// =============================================================================

fn collect_rows<R>(results: Vec<Result<R, sqlx::Error>>) -> DbResult<Vec<R>> {
    let mut rows = Vec::with_capacity(results.len());
    for result in results {
        rows.push(result.map_err(DbError::from)?);
    }
    Ok(rows)
}

fn timeout_error(operation: &str, timeout: Duration) -> DbError {
    DbError::timeout(operation, timeout.as_secs())
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================

mod mysql {
    use super::*;
    use crate::db::params::bind_mysql_param;
    use sqlx::MySqlPool;
    use sqlx::mysql::MySqlRow;

    pub async fn fetch_rows(
        pool: &MySqlPool,
        sql: &str,
        args: &[QueryParam],
        row_limit: u32,
        query_timeout: Duration,
    ) -> DbResult<Vec<MySqlRow>> {
        let fetch_limit = row_limit as usize + 1;
        // Raw SQL without arguments avoids preparing statements that MySQL refuses to prepare
        let rows_future = if args.is_empty() {
            use sqlx::Executor;
            let stream = pool.fetch(sql);
            stream.take(fetch_limit).collect::<Vec<_>>()
        } else {
            let mut query = sqlx::query(sql);
            for arg in args {
                query = bind_mysql_param(query, arg);
            }
            let stream = query.fetch(pool);
            stream.take(fetch_limit).collect::<Vec<_>>()
        };

        match timeout(query_timeout, rows_future).await {
            Ok(results) => collect_rows(results),
            Err(_) => Err(timeout_error("query execution", query_timeout)),
        }
    }
}

mod postgres {
    use super::*;
    use crate::db::params::bind_postgres_param;
    use sqlx::PgPool;
    use sqlx::postgres::PgRow;

    pub async fn fetch_rows(
        pool: &PgPool,
        sql: &str,
        args: &[QueryParam],
        row_limit: u32,
        query_timeout: Duration,
    ) -> DbResult<Vec<PgRow>> {
        let fetch_limit = row_limit as usize + 1;
        let rows_future = if args.is_empty() {
            use sqlx::Executor;
            let stream = pool.fetch(sql);
            stream.take(fetch_limit).collect::<Vec<_>>()
        } else {
            let mut query = sqlx::query(sql);
            for arg in args {
                query = bind_postgres_param(query, arg);
            }
            let stream = query.fetch(pool);
            stream.take(fetch_limit).collect::<Vec<_>>()
        };

        match timeout(query_timeout, rows_future).await {
            Ok(results) => collect_rows(results),
            Err(_) => Err(timeout_error("query execution", query_timeout)),
        }
    }
}

mod sqlite {
    use super::*;
    use crate::db::params::bind_sqlite_param;
    use sqlx::SqlitePool;
    use sqlx::sqlite::SqliteRow;

    pub async fn fetch_rows(
        pool: &SqlitePool,
        sql: &str,
        args: &[QueryParam],
        row_limit: u32,
        query_timeout: Duration,
    ) -> DbResult<Vec<SqliteRow>> {
        let fetch_limit = row_limit as usize + 1;
        let rows_future = if args.is_empty() {
            use sqlx::Executor;
            let stream = pool.fetch(sql);
            stream.take(fetch_limit).collect::<Vec<_>>()
        } else {
            let mut query = sqlx::query(sql);
            for arg in args {
                query = bind_sqlite_param(query, arg);
            }
            let stream = query.fetch(pool);
            stream.take(fetch_limit).collect::<Vec<_>>()
        };

        match timeout(query_timeout, rows_future).await {
            Ok(results) => collect_rows(results),
            Err(_) => Err(timeout_error("query execution", query_timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_executor_defaults() {
        let executor = QueryExecutor::new();
        assert_eq!(executor.query_timeout(), Duration::from_secs(30));
        assert_eq!(executor.short_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_executor_custom_timeouts() {
        let executor =
            QueryExecutor::with_timeouts(Duration::from_secs(60), Duration::from_secs(5));
        assert_eq!(executor.query_timeout(), Duration::from_secs(60));
        assert_eq!(executor.short_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_timeout_error_message() {
        let err = timeout_error("query execution", Duration::from_secs(30));
        assert_eq!(err.to_string(), "Timeout: query execution exceeded 30s");
        assert!(err.is_retryable());
    }
}
