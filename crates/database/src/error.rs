use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Invalid database name {0:?}: only ASCII letters, digits and underscores are allowed")]
    InvalidDatabaseName(String),

    #[error("Database operation failed: {0}")]
    QueryError(#[from] sqlx::Error),

    #[error("Schema bootstrap failed on `{statement}`: {source}")]
    SchemaError {
        statement: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("The requested data was not found in the database.")]
    NotFound,
}

impl DbError {
    /// True when no pooled connection became available within the acquire timeout.
    pub fn is_pool_exhausted(&self) -> bool {
        matches!(self, DbError::QueryError(sqlx::Error::PoolTimedOut))
    }
}
