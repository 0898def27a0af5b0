use duckdb::Connection;
use r2d2::ManageConnection;

/// r2d2 manager for DuckDB connections. A pooled checkout is the unit of
/// scoped acquisition: dropped (and so returned) on every exit path.
pub struct DuckDbConnectionManager {
    connection_string: String,
}

impl DuckDbConnectionManager {
    pub fn new(connection_string: String) -> Self {
        Self { connection_string }
    }
}

impl ManageConnection for DuckDbConnectionManager {
    type Connection = Connection;
    type Error = duckdb::Error;

    fn connect(&self) -> Result<Self::Connection, Self::Error> {
        if self.connection_string == ":memory:" {
            Connection::open_in_memory()
        } else {
            Connection::open(&self.connection_string)
        }
    }

    fn is_valid(&self, conn: &mut Self::Connection) -> Result<(), Self::Error> {
        conn.execute_batch("SELECT 1")
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}
