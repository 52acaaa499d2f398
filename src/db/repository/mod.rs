//! Repositories: one per entity, each owning a handle to the pool.
//!
//! Every method checks out its own connection and returns it before
//! returning, so repositories can be freely combined in a handler even when
//! the pool holds a single connection. Multi-statement writes run inside a
//! diesel transaction on that one connection.

mod artists;
mod collections;
mod ratings;
mod releases;
mod reports;
mod sessions;
mod users;

use chrono::{NaiveDateTime, Utc};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;

use crate::models::ValidationError;

pub use artists::ArtistRepository;
pub use collections::CollectionRepository;
pub use ratings::{RatingRepository, ReactionRepository};
pub use releases::ReleaseRepository;
pub use reports::ReportRepository;
pub use sessions::{Session, SessionRepository};
pub use users::{NewUser, UserRepository};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Database error: {0}")]
    Database(DieselError),

    #[error("Connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    RateLimited(String),

    #[error("Unexpected value in column {column}: {value}")]
    Corrupt { column: &'static str, value: String },
}

impl From<DieselError> for RepoError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                RepoError::Conflict(format!("Already exists ({})", info.message()))
            }
            DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                RepoError::NotFound("Referenced record".into())
            }
            other => RepoError::Database(other),
        }
    }
}

/// Current UTC time as stored in timestamp columns.
pub(crate) fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Parse an enum stored as text, reporting the column on failure.
pub(crate) fn parse_column<T: std::str::FromStr>(
    column: &'static str,
    value: &str,
) -> Result<T, RepoError> {
    value.parse().map_err(|_| RepoError::Corrupt {
        column,
        value: value.to_string(),
    })
}

/// Escape `%`, `_` and `\` for a `LIKE ... ESCAPE '\'` pattern.
pub(crate) fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
pub(crate) mod testing {
    //! Fixtures shared by the repository tests.

    use super::*;
    use crate::db::{DbPool, in_memory_pool};
    use crate::models::catalog::{ArtistData, ReleaseData, ReleaseType, StreamingLinks};
    use crate::models::{Nickname, Release, User};

    pub fn pool() -> DbPool {
        in_memory_pool().expect("in-memory pool")
    }

    pub fn user(pool: &DbPool, nickname: &str) -> User {
        let repo = UserRepository::new(pool.clone());
        let (user, _) = repo
            .find_or_create_by_google(&format!("google-{nickname}"), None)
            .unwrap();
        repo.set_nickname(user.id, &Nickname::parse(nickname).unwrap())
            .unwrap()
    }

    pub fn release(pool: &DbPool, artist: &str, title: &str) -> Release {
        let artists = ArtistRepository::new(pool.clone());
        let artist = match artists.find_by_exact_name(artist).unwrap() {
            Some(artist) => artist,
            None => artists
                .create(&ArtistData {
                    name: artist.into(),
                    deezer_id: None,
                    itunes_id: None,
                    yandex_id: None,
                })
                .unwrap(),
        };
        ReleaseRepository::new(pool.clone())
            .create(&ReleaseData {
                title: title.into(),
                artist_id: artist.id,
                release_date: None,
                release_type: ReleaseType::Album,
                cover_url: None,
                links: StreamingLinks::default(),
                is_test_data: false,
            })
            .unwrap()
    }
}
