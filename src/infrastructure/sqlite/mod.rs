pub mod migrations;
pub mod run_lock;
pub mod signal_repo;

use rusqlite::Connection;

use crate::domain::error::DomainError;

/// Open a connection in WAL mode with the schema applied.
pub fn open(db_path: &str) -> Result<Connection, DomainError> {
    let conn = Connection::open(db_path).map_err(|e| DomainError::Database(format!("DB error: {e}")))?;
    conn.pragma_update(None, "journal_mode", "WAL")
        .map_err(|e| DomainError::Database(format!("WAL error: {e}")))?;
    migrations::run_migrations(&conn)?;
    Ok(conn)
}
