//! Database repository for artists.

use chrono::NaiveDateTime;
use diesel::prelude::*;

use super::collections::deactivate_undersized;
use super::releases::active_collections_containing;
use super::{RepoError, like_pattern, now};
use crate::db::DbPool;
use crate::db::schema::{artists, releases};
use crate::models::Artist;
use crate::models::catalog::ArtistData;

/// Database row representation for artists.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = artists)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ArtistRow {
    pub id: i32,
    pub name: String,
    pub deezer_id: Option<String>,
    pub itunes_id: Option<String>,
    pub yandex_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<ArtistRow> for Artist {
    fn from(row: ArtistRow) -> Self {
        Artist {
            id: row.id,
            name: row.name,
            deezer_id: row.deezer_id,
            itunes_id: row.itunes_id,
            yandex_id: row.yandex_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = artists)]
#[diesel(treat_none_as_null = true)]
struct ArtistChanges<'a> {
    name: &'a str,
    deezer_id: Option<&'a str>,
    itunes_id: Option<&'a str>,
    yandex_id: Option<&'a str>,
    updated_at: NaiveDateTime,
}

impl<'a> From<&'a ArtistData> for ArtistChanges<'a> {
    fn from(data: &'a ArtistData) -> Self {
        Self {
            name: &data.name,
            deezer_id: data.deezer_id.as_deref(),
            itunes_id: data.itunes_id.as_deref(),
            yandex_id: data.yandex_id.as_deref(),
            updated_at: now(),
        }
    }
}

/// Insert an artist on an existing connection.
pub(super) fn insert_artist(
    conn: &mut SqliteConnection,
    data: &ArtistData,
) -> Result<Artist, RepoError> {
    let row = diesel::insert_into(artists::table)
        .values((ArtistChanges::from(data), artists::created_at.eq(now())))
        .returning(ArtistRow::as_returning())
        .get_result(conn)?;
    Ok(Artist::from(row))
}

/// Find an artist by exact name on an existing connection.
pub(super) fn artist_by_exact_name(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<Option<Artist>, RepoError> {
    let row = artists::table
        .filter(artists::name.eq(name))
        .select(ArtistRow::as_select())
        .order(artists::id.asc())
        .first(conn)
        .optional()?;
    Ok(row.map(Artist::from))
}

/// Repository for artist database operations.
#[derive(Clone)]
pub struct ArtistRepository {
    pool: DbPool,
}

impl ArtistRepository {
    /// Create a new artist repository.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Find an artist by ID.
    pub fn find_by_id(&self, artist_id: i32) -> Result<Option<Artist>, RepoError> {
        let mut conn = self.pool.get()?;

        let result = artists::table
            .filter(artists::id.eq(artist_id))
            .select(ArtistRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(result.map(Artist::from))
    }

    /// Find an artist by exact name.
    pub fn find_by_exact_name(&self, name: &str) -> Result<Option<Artist>, RepoError> {
        let mut conn = self.pool.get()?;
        artist_by_exact_name(&mut conn, name)
    }

    /// Search artists by name with pagination.
    /// An empty query returns all artists.
    pub fn search(&self, query: &str, offset: i64, limit: i64) -> Result<Vec<Artist>, RepoError> {
        let mut conn = self.pool.get()?;
        let query = query.trim();

        let mut select = artists::table
            .select(ArtistRow::as_select())
            .order((artists::name.asc(), artists::id.asc()))
            .offset(offset)
            .limit(limit)
            .into_boxed();
        if !query.is_empty() {
            select = select.filter(artists::name.like(like_pattern(query)).escape('\\'));
        }

        let results = select.load(&mut conn)?;
        Ok(results.into_iter().map(Artist::from).collect())
    }

    /// Create a new artist.
    pub fn create(&self, data: &ArtistData) -> Result<Artist, RepoError> {
        let mut conn = self.pool.get()?;
        insert_artist(&mut conn, data)
    }

    /// Replace an artist's fields.
    pub fn update(&self, artist_id: i32, data: &ArtistData) -> Result<Artist, RepoError> {
        let mut conn = self.pool.get()?;

        let row = diesel::update(artists::table.filter(artists::id.eq(artist_id)))
            .set(ArtistChanges::from(data))
            .returning(ArtistRow::as_returning())
            .get_result(&mut conn)
            .optional()?;

        row.map(Artist::from)
            .ok_or_else(|| RepoError::NotFound(format!("Artist {artist_id}")))
    }

    /// Delete an artist and, by cascade, their releases.
    ///
    /// Active collections that drop below the minimum size are deactivated,
    /// as when a single release is deleted.
    pub fn delete(&self, artist_id: i32) -> Result<bool, RepoError> {
        let mut conn = self.pool.get()?;

        conn.transaction(|conn| {
            let release_ids: Vec<i32> = releases::table
                .filter(releases::artist_id.eq(artist_id))
                .select(releases::id)
                .load(conn)?;
            let affected = active_collections_containing(conn, &release_ids)?;
            let deleted = diesel::delete(artists::table.filter(artists::id.eq(artist_id)))
                .execute(conn)?;
            deactivate_undersized(conn, &affected)?;
            Ok(deleted > 0)
        })
    }
}
