//! Cookie sessions persisted in the database.

use chrono::{Duration, NaiveDateTime};
use diesel::prelude::*;

use super::users::UserRow;
use super::{RepoError, now};
use crate::crypto::{generate_token, hash_session_token};
use crate::db::DbPool;
use crate::db::schema::{sessions, users};
use crate::models::User;

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = sessions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct SessionRow {
    id: String,
    user_id: i32,
    csrf_token: String,
    created_at: NaiveDateTime,
    expires_at: NaiveDateTime,
}

/// An active session and the user it belongs to.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub csrf_token: String,
    pub expires_at: NaiveDateTime,
}

/// Repository for session storage.
///
/// Tokens handed to clients are hashed with the server secret before they
/// touch the database.
#[derive(Clone)]
pub struct SessionRepository {
    pool: DbPool,
    secret: String,
    ttl: Duration,
}

impl SessionRepository {
    pub fn new(pool: DbPool, secret: impl Into<String>, ttl: Duration) -> Self {
        Self {
            pool,
            secret: secret.into(),
            ttl,
        }
    }

    /// Start a session for a user. Returns the raw token for the cookie.
    pub fn create(&self, user_id: i32) -> Result<String, RepoError> {
        let mut conn = self.pool.get()?;
        let token = generate_token();
        let now = now();

        let row = SessionRow {
            id: hash_session_token(&self.secret, &token),
            user_id,
            csrf_token: generate_token(),
            created_at: now,
            expires_at: now + self.ttl,
        };
        diesel::insert_into(sessions::table)
            .values(&row)
            .execute(&mut conn)?;

        tracing::debug!(user_id, "Session created");
        Ok(token)
    }

    /// Look up an unexpired session by its raw token.
    pub fn find_active(&self, token: &str) -> Result<Option<Session>, RepoError> {
        let mut conn = self.pool.get()?;
        let id = hash_session_token(&self.secret, token);

        let result = sessions::table
            .inner_join(users::table)
            .filter(sessions::id.eq(&id))
            .filter(sessions::expires_at.gt(now()))
            .select((SessionRow::as_select(), UserRow::as_select()))
            .first::<(SessionRow, UserRow)>(&mut conn)
            .optional()?;

        Ok(result.map(|(session, user)| Session {
            user: User::from(user),
            csrf_token: session.csrf_token,
            expires_at: session.expires_at,
        }))
    }

    /// End a session. Returns whether it existed.
    pub fn delete(&self, token: &str) -> Result<bool, RepoError> {
        let mut conn = self.pool.get()?;
        let id = hash_session_token(&self.secret, token);

        let deleted = diesel::delete(sessions::table.filter(sessions::id.eq(id)))
            .execute(&mut conn)?;

        Ok(deleted > 0)
    }

    /// Remove all expired sessions. Returns how many were removed.
    pub fn purge_expired(&self) -> Result<usize, RepoError> {
        let mut conn = self.pool.get()?;

        let deleted = diesel::delete(sessions::table.filter(sessions::expires_at.le(now())))
            .execute(&mut conn)?;

        Ok(deleted)
    }
}
