pub mod executor;
pub mod pool;
pub mod rows;

use async_trait::async_trait;
use rows::ResultRow;
use std::error::Error;
use std::fmt;
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
pub enum ExecuteError {
    /// The caller's cancellation signal fired before or during execution.
    Cancelled,
    /// The store rejected or failed to run the statement; its message is
    /// carried as-is.
    Database(String),
}

impl fmt::Display for ExecuteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecuteError::Cancelled => write!(f, "query execution cancelled"),
            ExecuteError::Database(msg) => write!(f, "database error: {}", msg),
        }
    }
}

impl Error for ExecuteError {}

/// Seam between the pipeline and the relational store: run one statement,
/// materialize every returned row.
#[async_trait]
pub trait QueryRunner: Send + Sync {
    async fn run(
        &self,
        sql: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<ResultRow>, ExecuteError>;
}
