use crate::connection::DatabaseName;
use crate::error::DbError;
use sqlx::mysql::MySqlPool;
use tracing::{debug, info};

/// Knobs for the tables the bootstrapper creates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchemaOptions {
    /// Make `(user_id, group_id)` the primary key of `users_groups`.
    pub unique_memberships: bool,
}

/// The statements [`ensure_schema`] runs, in order.
///
/// Every statement is `IF NOT EXISTS`, so running them against an existing
/// schema changes nothing.
pub fn bootstrap_statements(database: &DatabaseName, options: SchemaOptions) -> Vec<String> {
    let membership_key = if options.unique_memberships {
        "PRIMARY KEY (user_id, group_id), "
    } else {
        ""
    };

    vec![
        format!("CREATE DATABASE IF NOT EXISTS {}", database.quoted()),
        format!("USE {}", database.quoted()),
        "CREATE TABLE IF NOT EXISTS `users` (\
            id INT AUTO_INCREMENT PRIMARY KEY, \
            name VARCHAR(30) NOT NULL\
        ) ENGINE=InnoDB"
            .to_string(),
        "CREATE TABLE IF NOT EXISTS `groups` (\
            id INT AUTO_INCREMENT PRIMARY KEY, \
            name VARCHAR(30) NOT NULL\
        ) ENGINE=InnoDB"
            .to_string(),
        format!(
            "CREATE TABLE IF NOT EXISTS `users_groups` (\
                user_id INT NOT NULL, \
                group_id INT NOT NULL, \
                {membership_key}\
                FOREIGN KEY (user_id) REFERENCES `users`(id) ON DELETE CASCADE ON UPDATE CASCADE, \
                FOREIGN KEY (group_id) REFERENCES `groups`(id) ON DELETE CASCADE ON UPDATE CASCADE\
            ) ENGINE=InnoDB"
        ),
    ]
}

/// Creates the database and the `users`, `groups` and `users_groups` tables
/// if they are missing. Safe to run on every start.
pub async fn ensure_schema(
    pool: &MySqlPool,
    database: &DatabaseName,
    options: SchemaOptions,
) -> Result<(), DbError> {
    let mut conn = pool.acquire().await?;

    for statement in bootstrap_statements(database, options) {
        debug!(%statement, "Running schema statement.");
        sqlx::Executor::execute(&mut *conn, sqlx::raw_sql(&statement))
            .await
            .map_err(|source| DbError::SchemaError {
                statement: statement.clone(),
                source,
            })?;
    }

    info!(database = %database, ?options, "Database schema is in place.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> DatabaseName {
        DatabaseName::new("users_groups").unwrap()
    }

    #[test]
    fn statements_create_database_then_tables_in_dependency_order() {
        let statements = bootstrap_statements(&db(), SchemaOptions::default());
        assert_eq!(statements.len(), 5);
        assert_eq!(statements[0], "CREATE DATABASE IF NOT EXISTS `users_groups`");
        assert_eq!(statements[1], "USE `users_groups`");
        assert!(statements[2].starts_with("CREATE TABLE IF NOT EXISTS `users` "));
        assert!(statements[3].starts_with("CREATE TABLE IF NOT EXISTS `groups` "));
        assert!(statements[4].starts_with("CREATE TABLE IF NOT EXISTS `users_groups` "));
        assert!(statements.iter().skip(2).all(|s| s.contains("IF NOT EXISTS")));
    }

    #[test]
    fn membership_foreign_keys_cascade() {
        let statements = bootstrap_statements(&db(), SchemaOptions::default());
        let membership = &statements[4];
        assert_eq!(
            membership
                .matches("ON DELETE CASCADE ON UPDATE CASCADE")
                .count(),
            2
        );
        assert!(membership.contains("REFERENCES `users`(id)"));
        assert!(membership.contains("REFERENCES `groups`(id)"));
        assert!(!membership.contains("PRIMARY KEY"));
    }

    #[test]
    fn unique_memberships_adds_a_composite_key() {
        let statements = bootstrap_statements(
            &db(),
            SchemaOptions {
                unique_memberships: true,
            },
        );
        assert!(statements[4].contains("PRIMARY KEY (user_id, group_id)"));
    }

    #[test]
    fn names_are_limited_to_thirty_characters() {
        let statements = bootstrap_statements(&db(), SchemaOptions::default());
        assert!(statements[2].contains("name VARCHAR(30) NOT NULL"));
        assert!(statements[3].contains("name VARCHAR(30) NOT NULL"));
    }
}
