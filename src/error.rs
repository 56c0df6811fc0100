/// Failure reported while running a query against the store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Message reported by SQLite itself, e.g. `no such table: restaurants`.
    #[error("{0}")]
    Engine(String),

    #[error(transparent)]
    Driver(sqlx::Error),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => Self::Engine(db_err.message().to_string()),
            other => Self::Driver(other),
        }
    }
}
