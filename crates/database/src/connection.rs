use crate::error::DbError;
use configuration::DatabaseSettings;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlPool, MySqlPoolOptions};
use sqlx::Connection;
use std::fmt;

/// Name of the database every connection works in, checked to be a plain
/// identifier so it can be spliced into `CREATE DATABASE` and `USE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseName(String);

impl DatabaseName {
    pub fn new(name: impl Into<String>) -> Result<Self, DbError> {
        let name = name.into();
        let valid = !name.is_empty()
            && name.len() <= 64
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if valid {
            Ok(Self(name))
        } else {
            Err(DbError::InvalidDatabaseName(name))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The name wrapped in backticks, ready for SQL text.
    pub fn quoted(&self) -> String {
        format!("`{}`", self.0)
    }
}

impl fmt::Display for DatabaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builds the bounded connection pool.
///
/// The pool is lazy: no connection is opened until the first `acquire`, so the
/// service can start before the database is reachable. Connections are not
/// bound to a database because it may not exist yet; callers select it with
/// [`select_database`] after acquiring. A `PoolConnection` goes back to the pool
/// when dropped, whatever state it is in.
pub fn connect(settings: &DatabaseSettings) -> MySqlPool {
    let options = MySqlConnectOptions::new()
        .host(&settings.host)
        .port(settings.port)
        .username(&settings.user)
        .password(&settings.password);

    MySqlPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(settings.acquire_timeout)
        .connect_lazy_with(options)
}

/// Liveness check: acquires a connection and pings the server.
pub async fn ping(pool: &MySqlPool) -> Result<(), DbError> {
    let mut conn = pool.acquire().await?;
    conn.ping().await?;
    Ok(())
}

/// Makes `database` the default schema of `conn`.
///
/// `USE` is not available through prepared statements, so it goes over the
/// text protocol.
pub async fn select_database(
    conn: &mut MySqlConnection,
    database: &DatabaseName,
) -> Result<(), DbError> {
    let sql = format!("USE {}", database.quoted());
    sqlx::Executor::execute(conn, sqlx::raw_sql(&sql)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_name_accepts_identifiers() {
        let name = DatabaseName::new("users_groups").unwrap();
        assert_eq!(name.as_str(), "users_groups");
        assert_eq!(name.quoted(), "`users_groups`");
    }

    #[test]
    fn database_name_rejects_anything_else() {
        for bad in ["", "users-groups", "db`; DROP TABLE users; --", "naïve"] {
            assert!(
                matches!(DatabaseName::new(bad), Err(DbError::InvalidDatabaseName(_))),
                "{bad:?} should be rejected"
            );
        }
        assert!(DatabaseName::new("a".repeat(65)).is_err());
    }

    #[tokio::test]
    async fn connect_is_lazy() {
        let settings = DatabaseSettings {
            host: "127.0.0.1".to_string(),
            port: 1,
            ..DatabaseSettings::default()
        };
        let pool = connect(&settings);
        assert_eq!(pool.size(), 0);
        assert_eq!(pool.options().get_max_connections(), settings.max_connections);
    }
}
