//! User repository contracts and SQLite implementation.
//!
//! Users are provisioned by the auth layer; the core reads them for member
//! projections and the projects-by-user listing, and writes profile edits.

use crate::model::user::{User, UserId};
use crate::repo::{ensure_tables, from_millis, parse_uuid, to_millis, RepoResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

const USER_SELECT_SQL: &str = "SELECT
    id,
    email,
    role,
    full_name,
    profile_picture_url,
    created_at,
    updated_at
FROM users";

/// Storage port for user lookups.
pub trait UserRepository {
    fn create_user(&self, user: &User) -> RepoResult<UserId>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    /// Replaces the editable profile fields. Returns `false` when no user has `id`.
    fn update_profile(
        &self,
        id: UserId,
        full_name: &str,
        profile_picture_url: Option<&str>,
        updated_at: DateTime<Utc>,
    ) -> RepoResult<bool>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["users"])?;
        Ok(Self { conn })
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, user: &User) -> RepoResult<UserId> {
        let created_at = to_millis(user.created_at);
        self.conn.execute(
            "INSERT INTO users (
                id,
                email,
                role,
                full_name,
                profile_picture_url,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                user.id.to_string(),
                user.email.as_str(),
                user.role.as_str(),
                user.full_name.as_deref(),
                user.profile_picture_url.as_deref(),
                created_at,
                to_millis(user.updated_at),
            ],
        )?;
        Ok(user.id)
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_user_row(row)?));
        }
        Ok(None)
    }

    fn update_profile(
        &self,
        id: UserId,
        full_name: &str,
        profile_picture_url: Option<&str>,
        updated_at: DateTime<Utc>,
    ) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE users
             SET
                full_name = ?1,
                profile_picture_url = ?2,
                updated_at = ?3
             WHERE id = ?4;",
            params![
                full_name,
                profile_picture_url,
                to_millis(updated_at),
                id.to_string(),
            ],
        )?;
        Ok(changed == 1)
    }
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    let id_text: String = row.get("id")?;
    Ok(User {
        id: parse_uuid("users.id", &id_text)?,
        email: row.get("email")?,
        role: row.get("role")?,
        full_name: row.get("full_name")?,
        profile_picture_url: row.get("profile_picture_url")?,
        created_at: from_millis("users.created_at", row.get("created_at")?)?,
        updated_at: from_millis("users.updated_at", row.get("updated_at")?)?,
    })
}
