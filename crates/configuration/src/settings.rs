use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub membership: MembershipSettings,
    pub logging: LoggingSettings,
}

/// Where the HTTP listener binds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Connection details for the MariaDB/MySQL store and the pool built on top of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    /// The database the bootstrapper creates and every request selects.
    pub name: String,
    /// Upper bound on concurrently open connections.
    pub max_connections: u32,
    /// How long a request waits for a free connection before failing.
    #[serde(with = "humantime_serde")]
    pub acquire_timeout: Duration,
    /// Delay between liveness checks while waiting for the store at startup.
    #[serde(with = "humantime_serde")]
    pub retry_interval: Duration,
}

/// Rules for the `users_groups` association table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MembershipSettings {
    /// Declare `(user_id, group_id)` as the primary key so a user can be
    /// added to a group at most once. Only applies when the table is created.
    pub unique_pairs: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default `EnvFilter` directive; `RUST_LOG` takes precedence.
    pub filter: String,
    /// When set, logs are also written to a daily rolling file in this directory.
    pub directory: Option<String>,
}

// --- Default Implementations ---

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3306,
            user: "root".to_string(),
            password: String::new(),
            name: "users_groups".to_string(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(5),
            retry_interval: Duration::from_secs(2),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            directory: None,
        }
    }
}

impl Settings {
    /// Checks the values that cannot be expressed in the type system.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "server.port must not be 0".to_string(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::ValidationError(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.server.port, 3000);
        assert_eq!(settings.database.name, "users_groups");
        assert_eq!(settings.database.max_connections, 5);
        assert_eq!(settings.database.retry_interval, Duration::from_secs(2));
        assert!(!settings.membership.unique_pairs);
    }

    #[test]
    fn rejects_an_empty_pool() {
        let mut settings = Settings::default();
        settings.database.max_connections = 0;
        assert!(settings.validate().is_err());
    }
}
