use crate::store::StoreError;

/// SQLSTATE MySQL reports for deadlocks and serialization failures.
const SERIALIZATION_FAILURE: &str = "40001";

/// `?, ?, ?` for an IN list of `n` bound values.
pub fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// True when the statement lost a lock race and can simply be run again.
pub fn is_retryable(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some(SERIALIZATION_FAILURE),
        _ => false,
    }
}

/// Maps a driver error onto the store's error kinds. Unique-key violations
/// are how the schema reports a lost claim, so they surface as conflicts.
pub fn classify(e: sqlx::Error, conflict_msg: impl FnOnce() -> String) -> StoreError {
    match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            StoreError::Conflict(conflict_msg())
        }
        sqlx::Error::Database(db_err) if is_retryable(&e) => {
            StoreError::Conflict(format!("Lock contention, try again ({})", db_err.message()))
        }
        _ => StoreError::Database(e.to_string()),
    }
}

pub fn db_error(e: sqlx::Error) -> StoreError {
    StoreError::Database(e.to_string())
}
