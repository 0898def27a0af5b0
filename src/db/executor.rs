use crate::db::pool::DuckDbConnectionManager;
use crate::db::rows::{ResultRow, SqlValue};
use crate::db::{ExecuteError, QueryRunner};
use async_trait::async_trait;
use duckdb::Connection;
use r2d2::Pool;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Executes model-generated SQL against the catalog database. One pooled
/// connection per call, checked out inside the blocking task and dropped on
/// every exit path of it.
pub struct QueryExecutor {
    pool: Pool<DuckDbConnectionManager>,
}

impl QueryExecutor {
    pub fn new(pool: Pool<DuckDbConnectionManager>) -> Self {
        Self { pool }
    }
}

fn db_error(e: impl std::fmt::Display) -> ExecuteError {
    ExecuteError::Database(e.to_string())
}

/// Runs the statement whole, no parameter binding, and materializes every
/// returned row in the store's native order. Statements that yield no result
/// set (DDL or DML without RETURNING) produce an empty vector.
fn collect_rows(conn: &Connection, sql: &str) -> Result<Vec<ResultRow>, ExecuteError> {
    let mut stmt = conn.prepare(sql).map_err(db_error)?;

    let mut rows = stmt.query([]).map_err(db_error)?;

    // Column metadata is only available once the statement has executed;
    // reading it earlier panics inside the driver.
    let mut column_names = Vec::new();
    if let Some(executed) = rows.as_ref() {
        let column_count = executed.column_count();
        column_names.reserve(column_count);
        for i in 0..column_count {
            match executed.column_name(i) {
                Ok(name) => column_names.push(name.to_string()),
                Err(e) => return Err(db_error(e)),
            }
        }
    }
    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(db_error)? {
        let mut columns = Vec::with_capacity(column_names.len());
        for (i, name) in column_names.iter().enumerate() {
            let value = row.get_ref(i).map_err(db_error)?;
            columns.push((name.clone(), SqlValue::from(value)));
        }
        out.push(ResultRow::new(columns));
    }

    Ok(out)
}

#[async_trait]
impl QueryRunner for QueryExecutor {
    async fn run(
        &self,
        sql: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<ResultRow>, ExecuteError> {
        if cancel.is_cancelled() {
            return Err(ExecuteError::Cancelled);
        }

        debug!("executing statement: {}", sql);

        let pool = self.pool.clone();
        let sql = sql.to_string();
        let task = tokio::task::spawn_blocking(move || -> Result<Vec<ResultRow>, ExecuteError> {
            let conn = pool.get().map_err(db_error)?;
            collect_rows(&conn, &sql)
        });

        // On cancellation the detached task still runs to completion, so the
        // pooled connection is always returned even when we stop waiting.
        tokio::select! {
            _ = cancel.cancelled() => Err(ExecuteError::Cancelled),
            joined = task => match joined {
                Ok(result) => result,
                Err(e) => {
                    error!("query task failed to complete: {}", e);
                    Err(ExecuteError::Database(format!("query task failed: {}", e)))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn in_memory_executor() -> QueryExecutor {
        let manager = DuckDbConnectionManager::new(":memory:".to_string());
        let pool = Pool::builder().max_size(2).build(manager).unwrap();
        QueryExecutor::new(pool)
    }

    #[tokio::test]
    async fn materializes_a_scalar_select() {
        let executor = in_memory_executor();
        let rows = executor
            .run("SELECT 1 AS one", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("one"), Some(&SqlValue::Integer(1)));
    }

    #[tokio::test]
    async fn captures_every_column_by_name_in_order() {
        let executor = in_memory_executor();
        let rows = executor
            .run(
                "SELECT 42 AS i, CAST(2.5 AS DOUBLE) AS f, 'abc' AS s, true AS b, NULL AS n",
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        let row = &rows[0];
        assert_eq!(
            row.column_names().collect::<Vec<_>>(),
            vec!["i", "f", "s", "b", "n"]
        );
        assert_eq!(row.get("i"), Some(&SqlValue::Integer(42)));
        assert_eq!(row.get("f"), Some(&SqlValue::Float(2.5)));
        assert_eq!(row.get("s"), Some(&SqlValue::Text("abc".to_string())));
        assert_eq!(row.get("b"), Some(&SqlValue::Boolean(true)));
        assert_eq!(row.get("n"), Some(&SqlValue::Null));
    }

    #[tokio::test]
    async fn decimal_values_come_back_as_floats() {
        let executor = in_memory_executor();
        let rows = executor
            .run(
                "SELECT CAST(19.99 AS DECIMAL(10, 2)) AS price",
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(rows[0].get("price"), Some(&SqlValue::Float(19.99)));
    }

    #[tokio::test]
    async fn date_values_map_to_timestamps() {
        let executor = in_memory_executor();
        let rows = executor
            .run("SELECT DATE '2001-07-08' AS d", &CancellationToken::new())
            .await
            .unwrap();
        match rows[0].get("d") {
            Some(SqlValue::Timestamp(ts)) => {
                assert_eq!((ts.year(), ts.month(), ts.day()), (2001, 7, 8));
            }
            other => panic!("expected timestamp, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn ddl_yields_an_empty_sequence_not_an_error() {
        let executor = in_memory_executor();
        let rows = executor
            .run("CREATE TABLE t (x INTEGER)", &CancellationToken::new())
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn empty_result_set_is_an_empty_sequence() {
        let executor = in_memory_executor();
        let rows = executor
            .run("SELECT 1 AS one WHERE 1 = 0", &CancellationToken::new())
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn syntax_errors_surface_the_store_message() {
        let executor = in_memory_executor();
        let err = executor
            .run("SELEKT broken", &CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            ExecuteError::Database(msg) => assert!(!msg.is_empty()),
            other => panic!("expected database error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn checkout_is_released_after_success_and_failure() {
        // Pool of one: a leaked checkout would stall the next run
        let manager = DuckDbConnectionManager::new(":memory:".to_string());
        let pool = Pool::builder().max_size(1).build(manager).unwrap();
        let executor = QueryExecutor::new(pool);
        let token = CancellationToken::new();

        for _ in 0..3 {
            executor.run("SELECT 1", &token).await.unwrap();
            executor.run("SELEKT broken", &token).await.unwrap_err();
        }
    }

    #[tokio::test]
    async fn cancelled_token_short_circuits() {
        let executor = in_memory_executor();
        let token = CancellationToken::new();
        token.cancel();
        let err = executor.run("SELECT 1", &token).await.unwrap_err();
        assert!(matches!(err, ExecuteError::Cancelled));
    }

    #[tokio::test]
    async fn cancellation_mid_wait_still_returns_the_checkout() {
        use std::sync::Arc;
        use std::time::Duration;

        let manager = DuckDbConnectionManager::new(":memory:".to_string());
        let pool = Pool::builder().max_size(1).build(manager).unwrap();
        let executor = Arc::new(QueryExecutor::new(pool.clone()));
        let token = CancellationToken::new();

        // Hold the only connection so the dispatched statement is stuck
        // waiting on its checkout when the cancellation fires.
        let held = pool.get().unwrap();

        let in_flight = tokio::spawn({
            let executor = Arc::clone(&executor);
            let token = token.clone();
            async move { executor.run("SELECT 1 AS one", &token).await }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();

        let err = in_flight.await.unwrap().unwrap_err();
        assert!(matches!(err, ExecuteError::Cancelled));

        // The detached task still completes and returns the checkout once
        // the held connection is released, so a fresh run succeeds.
        drop(held);
        let rows = executor
            .run("SELECT 1 AS one", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }
}
