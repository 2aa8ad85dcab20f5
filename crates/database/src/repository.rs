use crate::connection::{select_database, DatabaseName};
use crate::DbError;
use core_types::{EntityName, Group, GroupWithMembers, Membership, User};
use sqlx::mysql::{MySql, MySqlPool, MySqlRow};
use sqlx::pool::PoolConnection;
use sqlx::{Connection, FromRow};

/// A table whose rows are `{id, name}`: users and groups share every
/// single-table operation.
pub trait Entity: for<'r> FromRow<'r, MySqlRow> + Send + Unpin {
    /// Table name, quoted for SQL text.
    const TABLE: &'static str;
}

impl Entity for User {
    const TABLE: &'static str = "`users`";
}

impl Entity for Group {
    const TABLE: &'static str = "`groups`";
}

/// The `DbRepository` provides a high-level, application-specific interface
/// to the database. It encapsulates all SQL queries and data access logic.
///
/// Each call checks out its own connection and returns it when the call ends,
/// on success and on error alike. Every value that comes from a request is
/// passed as a bound parameter.
#[derive(Debug, Clone)]
pub struct DbRepository {
    pool: MySqlPool,
    database: DatabaseName,
}

impl DbRepository {
    /// Creates a new `DbRepository` with a shared database connection pool.
    pub fn new(pool: MySqlPool, database: DatabaseName) -> Self {
        Self { pool, database }
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    pub fn database(&self) -> &DatabaseName {
        &self.database
    }

    /// Checks out a connection with the working database selected.
    async fn acquire(&self) -> Result<PoolConnection<MySql>, DbError> {
        let mut conn = self.pool.acquire().await?;
        select_database(&mut *conn, &self.database).await?;
        Ok(conn)
    }

    /// Fetches every row of the entity's table.
    pub async fn list<E: Entity>(&self) -> Result<Vec<E>, DbError> {
        let mut conn = self.acquire().await?;
        let sql = format!("SELECT id, name FROM {} ORDER BY id", E::TABLE);
        let rows = sqlx::query_as::<_, E>(&sql).fetch_all(&mut *conn).await?;
        Ok(rows)
    }

    /// Fetches the rows matching `id`: one, or none if it does not exist.
    pub async fn find<E: Entity>(&self, id: i32) -> Result<Vec<E>, DbError> {
        let mut conn = self.acquire().await?;
        let sql = format!("SELECT id, name FROM {} WHERE id = ?", E::TABLE);
        let rows = sqlx::query_as::<_, E>(&sql)
            .bind(id)
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows)
    }

    /// Inserts a row and returns the id the store assigned to it.
    pub async fn create<E: Entity>(&self, name: &EntityName) -> Result<u64, DbError> {
        let mut conn = self.acquire().await?;
        let sql = format!("INSERT INTO {} (name) VALUES (?)", E::TABLE);
        let result = sqlx::query(&sql)
            .bind(name.as_str())
            .execute(&mut *conn)
            .await?;
        Ok(result.last_insert_id())
    }

    /// Deletes the row matching `id`; memberships referencing it go with it.
    /// Returns the number of rows removed.
    pub async fn delete<E: Entity>(&self, id: i32) -> Result<u64, DbError> {
        let mut conn = self.acquire().await?;
        let sql = format!("DELETE FROM {} WHERE id = ?", E::TABLE);
        let result = sqlx::query(&sql).bind(id).execute(&mut *conn).await?;
        Ok(result.rows_affected())
    }

    /// Renames the row matching `id`. Returns the number of rows changed.
    pub async fn rename<E: Entity>(&self, id: i32, name: &EntityName) -> Result<u64, DbError> {
        let mut conn = self.acquire().await?;
        let sql = format!("UPDATE {} SET name = ? WHERE id = ?", E::TABLE);
        let result = sqlx::query(&sql)
            .bind(name.as_str())
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }

    /// Fetches a group with its members.
    ///
    /// Both reads run inside one transaction so the member list belongs to the
    /// group that was found. Returns `DbError::NotFound` without running the
    /// member query when the group does not exist.
    pub async fn get_group_with_members(&self, id: i32) -> Result<GroupWithMembers, DbError> {
        let mut conn = self.acquire().await?;
        let mut tx = conn.begin().await?;

        let group = sqlx::query_as::<_, Group>("SELECT id, name FROM `groups` WHERE id = ?")
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => DbError::NotFound,
                other => other.into(),
            })?;

        let usuarios = sqlx::query_as::<_, User>(
            r#"
            SELECT u.id, u.name
            FROM `users` u
            INNER JOIN `users_groups` ug ON u.id = ug.user_id
            WHERE ug.group_id = ?
            ORDER BY u.id
            "#,
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(GroupWithMembers { group, usuarios })
    }

    /// Adds a user to a group.
    ///
    /// Returns `true` when the store reports the row as inserted, i.e. exactly
    /// one affected row or an assigned identity.
    pub async fn add_membership(&self, membership: Membership) -> Result<bool, DbError> {
        let mut conn = self.acquire().await?;
        let result = sqlx::query("INSERT INTO `users_groups` (user_id, group_id) VALUES (?, ?)")
            .bind(membership.user_id)
            .bind(membership.group_id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() == 1 || result.last_insert_id() != 0)
    }

    /// Removes a user from a group. Returns the number of rows removed; zero
    /// means the pair was not a member.
    pub async fn remove_membership(&self, membership: Membership) -> Result<u64, DbError> {
        let mut conn = self.acquire().await?;
        let result = sqlx::query("DELETE FROM `users_groups` WHERE user_id = ? AND group_id = ?")
            .bind(membership.user_id)
            .bind(membership.group_id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }
}
