//! Storage errors.
//!
//! `DbError` only says what went wrong in SQLite terms. The service layer
//! turns the ones with domain meaning into domain errors: a unique
//! violation on `cash_sessions.operator_id` is an already-open till, a
//! [`DbError::Conflict`] on close is a lost race.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// `field` is `table.column` as SQLite reports it. Raised by a second
    /// Active session per operator, or a second handover per session.
    #[error("Unique constraint failed on {field}")]
    UniqueViolation { field: String, value: String },

    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// A guarded write matched no row: the row changed state or version
    /// since it was read.
    #[error("{entity} {id} was modified concurrently")]
    Conflict { entity: String, id: String },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A JSON column could not be encoded or decoded.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// No connection became free within the acquire timeout.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// SQLite returned SQLITE_BUSY / SQLITE_LOCKED.
    #[error("Database is busy: {0}")]
    Busy(String),

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn conflict(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::Conflict {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Whether retrying the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DbError::PoolExhausted | DbError::Busy(_) | DbError::ConnectionFailed(_)
        )
    }

    /// True for a unique-index violation on `field` (`table.column`).
    pub fn is_unique_violation_on(&self, field: &str) -> bool {
        matches!(self, DbError::UniqueViolation { field: f, .. } if f.contains(field))
    }
}

/// Maps a SQLite error message onto a variant.
///
/// SQLite reports constraint failures as text, e.g.
/// `UNIQUE constraint failed: cash_sessions.operator_id`.
fn classify_sqlite_message(message: &str) -> DbError {
    if let Some(columns) = message.strip_prefix("UNIQUE constraint failed: ") {
        return DbError::UniqueViolation {
            field: columns.to_string(),
            value: String::new(),
        };
    }
    if message.starts_with("FOREIGN KEY constraint failed") {
        return DbError::ForeignKeyViolation {
            message: message.to_string(),
        };
    }
    if message.contains("database is locked") || message.contains("database table is locked") {
        return DbError::Busy(message.to_string());
    }
    DbError::QueryFailed(message.to_string())
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("row", "?"),
            sqlx::Error::Database(db_err) => classify_sqlite_message(db_err.message()),
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool closed".to_string()),
            sqlx::Error::Io(io) => DbError::ConnectionFailed(io.to_string()),
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::Serialization(format!("column {index}: {source}"))
            }
            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Serialization(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(DbError::PoolExhausted.is_transient());
        assert!(DbError::Busy("database is locked".into()).is_transient());
        assert!(!DbError::conflict("CashSession", "s-1").is_transient());
        assert!(!DbError::not_found("CashSession", "s-1").is_transient());
    }

    #[test]
    fn test_sqlite_message_classification() {
        let err = classify_sqlite_message("UNIQUE constraint failed: cash_sessions.operator_id");
        assert!(err.is_unique_violation_on("cash_sessions.operator_id"));

        assert!(matches!(
            classify_sqlite_message("FOREIGN KEY constraint failed"),
            DbError::ForeignKeyViolation { .. }
        ));
        assert!(classify_sqlite_message("database is locked").is_transient());
        assert!(matches!(
            classify_sqlite_message("no such table: foo"),
            DbError::QueryFailed(_)
        ));
    }

    #[test]
    fn test_unique_violation_on() {
        let err = DbError::duplicate("cash_sessions.operator_id", "op-1");
        assert!(err.is_unique_violation_on("cash_sessions.operator_id"));
        assert!(!err.is_unique_violation_on("treasury_movements.linked_session_id"));
    }
}
