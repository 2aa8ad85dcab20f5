use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// Longest name the `users` and `groups` tables accept (`VARCHAR(30)`).
pub const MAX_NAME_LEN: usize = 30;

/// A row of the `users` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i32,
    pub name: String,
}

/// A row of the `groups` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Group {
    pub id: i32,
    pub name: String,
}

/// A row of the `users_groups` association table.
/// The pair is the identity; there is no surrogate id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Membership {
    pub user_id: i32,
    pub group_id: i32,
}

/// A group together with the users that belong to it.
///
/// Serializes flat, e.g. `{"id": 1, "name": "Devs", "usuarios": [...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupWithMembers {
    #[serde(flatten)]
    pub group: Group,
    pub usuarios: Vec<User>,
}

/// A validated user or group name: present, not blank, at most
/// [`MAX_NAME_LEN`] characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityName(String);

impl EntityName {
    pub fn parse(raw: Option<&str>) -> Result<Self, CoreError> {
        let raw = raw.ok_or_else(|| {
            CoreError::InvalidInput("name".to_string(), "the field is required".to_string())
        })?;
        if raw.trim().is_empty() {
            return Err(CoreError::InvalidInput(
                "name".to_string(),
                "must not be blank".to_string(),
            ));
        }
        // Counted in characters, like the column length.
        let len = raw.chars().count();
        if len > MAX_NAME_LEN {
            return Err(CoreError::InvalidInput(
                "name".to_string(),
                format!("must be at most {MAX_NAME_LEN} characters, got {len}"),
            ));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
