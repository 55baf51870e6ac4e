use thiserror::Error;

/// Errors surfaced by the registries when a plain `sqlx::Error` is not
/// specific enough for the caller.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A target with this chat id is already registered.
    #[error("target {0} is already registered")]
    DuplicateTarget(i64),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// SQLite extended result codes for UNIQUE and PRIMARY KEY violations.
const SQLITE_CONSTRAINT_UNIQUE: &str = "2067";
const SQLITE_CONSTRAINT_PRIMARYKEY: &str = "1555";

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => matches!(
            db_err.code().as_deref(),
            Some(SQLITE_CONSTRAINT_UNIQUE) | Some(SQLITE_CONSTRAINT_PRIMARYKEY)
        ),
        _ => false,
    }
}
