use crate::connection::{ping, DatabaseName};
use crate::error::DbError;
use crate::schema::{ensure_schema, SchemaOptions};
use sqlx::mysql::MySqlPool;
use std::time::Duration;
use tracing::{info, warn};

/// Blocks until the database answers a ping.
///
/// Retries every `retry_interval` with no upper bound; this is the only
/// retrying path in the service. Any connection held by a failed attempt is
/// returned to the pool before sleeping.
pub async fn wait_ready(pool: &MySqlPool, retry_interval: Duration) {
    info!("Waiting for the database to accept connections...");
    let mut attempt: u64 = 0;
    loop {
        attempt += 1;
        match ping(pool).await {
            Ok(()) => {
                info!(attempt, "Database is ready.");
                return;
            }
            Err(e) => {
                warn!(
                    attempt,
                    error = %e,
                    retry_in = ?retry_interval,
                    "Database is not ready, retrying."
                );
                tokio::time::sleep(retry_interval).await;
            }
        }
    }
}

/// Startup sequence: wait for the database, then make sure the schema exists.
pub async fn bootstrap(
    pool: &MySqlPool,
    database: &DatabaseName,
    options: SchemaOptions,
    retry_interval: Duration,
) -> Result<(), DbError> {
    wait_ready(pool, retry_interval).await;
    ensure_schema(pool, database, options).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::connect;
    use configuration::DatabaseSettings;

    fn unreachable_pool() -> MySqlPool {
        connect(&DatabaseSettings {
            host: "127.0.0.1".to_string(),
            port: 1,
            acquire_timeout: Duration::from_millis(100),
            ..DatabaseSettings::default()
        })
    }

    #[tokio::test]
    async fn wait_ready_keeps_retrying_while_the_database_is_down() {
        let pool = unreachable_pool();
        let result = tokio::time::timeout(
            Duration::from_millis(500),
            wait_ready(&pool, Duration::from_millis(20)),
        )
        .await;
        assert!(result.is_err(), "the gate must not give up on its own");
    }

    #[tokio::test]
    async fn ensure_schema_reports_connection_failures() {
        let pool = unreachable_pool();
        let database = DatabaseName::new("users_groups").unwrap();
        let result = ensure_schema(&pool, &database, SchemaOptions::default()).await;
        assert!(matches!(result, Err(DbError::QueryError(_))));
    }
}
