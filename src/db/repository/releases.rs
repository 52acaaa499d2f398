//! Database repository for releases and their rating aggregates.

use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Bool, Date, Double, Integer, Nullable, Text, Timestamp};

use super::artists::{artist_by_exact_name, insert_artist};
use super::collections::deactivate_undersized;
use super::{RepoError, like_pattern, now, parse_column};
use crate::db::DbPool;
use crate::db::schema::{artists, collection_releases, collections, releases};
use crate::models::catalog::{
    ImportEntry, ImportReport, ReleaseData, ReleaseFilter, ReleaseSort, StreamingLinks,
};
use crate::models::{Release, ReleaseStats, ReleaseSummary};

/// Database row representation for releases.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = releases)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ReleaseRow {
    pub id: i32,
    pub title: String,
    pub artist_id: i32,
    pub release_date: Option<NaiveDate>,
    pub release_type: String,
    pub cover_url: Option<String>,
    pub yandex_music_url: Option<String>,
    pub apple_music_url: Option<String>,
    pub spotify_url: Option<String>,
    pub deezer_url: Option<String>,
    pub is_test_data: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl TryFrom<ReleaseRow> for Release {
    type Error = RepoError;

    fn try_from(row: ReleaseRow) -> Result<Self, Self::Error> {
        Ok(Release {
            id: row.id,
            title: row.title,
            artist_id: row.artist_id,
            release_date: row.release_date,
            release_type: parse_column("release_type", &row.release_type)?,
            cover_url: row.cover_url,
            links: StreamingLinks {
                yandex_music: row.yandex_music_url,
                apple_music: row.apple_music_url,
                spotify: row.spotify_url,
                deezer: row.deezer_url,
            },
            is_test_data: row.is_test_data,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = releases)]
#[diesel(treat_none_as_null = true)]
struct ReleaseChanges<'a> {
    title: &'a str,
    artist_id: i32,
    release_date: Option<NaiveDate>,
    release_type: &'a str,
    cover_url: Option<&'a str>,
    yandex_music_url: Option<&'a str>,
    apple_music_url: Option<&'a str>,
    spotify_url: Option<&'a str>,
    deezer_url: Option<&'a str>,
    is_test_data: bool,
    updated_at: NaiveDateTime,
}

impl<'a> From<&'a ReleaseData> for ReleaseChanges<'a> {
    fn from(data: &'a ReleaseData) -> Self {
        Self {
            title: &data.title,
            artist_id: data.artist_id,
            release_date: data.release_date,
            release_type: data.release_type.as_str(),
            cover_url: data.cover_url.as_deref(),
            yandex_music_url: data.links.yandex_music.as_deref(),
            apple_music_url: data.links.apple_music.as_deref(),
            spotify_url: data.links.spotify.as_deref(),
            deezer_url: data.links.deezer.as_deref(),
            is_test_data: data.is_test_data,
            updated_at: now(),
        }
    }
}

/// Columns shared by every release listing: the release, its artist name and
/// the rating aggregates. Callers append WHERE / GROUP BY / ORDER BY.
pub(super) const SUMMARY_SELECT: &str = r#"
    SELECT r.id AS id,
           r.title AS title,
           r.artist_id AS artist_id,
           r.release_date AS release_date,
           r.release_type AS release_type,
           r.cover_url AS cover_url,
           r.yandex_music_url AS yandex_music_url,
           r.apple_music_url AS apple_music_url,
           r.spotify_url AS spotify_url,
           r.deezer_url AS deezer_url,
           r.is_test_data AS is_test_data,
           r.created_at AS created_at,
           r.updated_at AS updated_at,
           a.name AS artist_name,
           AVG(rt.score) AS average_score,
           COUNT(rt.id) AS rating_count,
           COALESCE(SUM(CASE WHEN rt.text IS NOT NULL AND rt.text <> '' THEN 1 ELSE 0 END), 0) AS comment_count
    FROM releases r
    JOIN artists a ON a.id = r.artist_id
    LEFT JOIN ratings rt ON rt.release_id = r.id
"#;

/// One row of [`SUMMARY_SELECT`].
#[derive(Debug, QueryableByName)]
pub(super) struct SummaryRow {
    #[diesel(sql_type = Integer)]
    id: i32,
    #[diesel(sql_type = Text)]
    title: String,
    #[diesel(sql_type = Integer)]
    artist_id: i32,
    #[diesel(sql_type = Nullable<Date>)]
    release_date: Option<NaiveDate>,
    #[diesel(sql_type = Text)]
    release_type: String,
    #[diesel(sql_type = Nullable<Text>)]
    cover_url: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    yandex_music_url: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    apple_music_url: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    spotify_url: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    deezer_url: Option<String>,
    #[diesel(sql_type = Bool)]
    is_test_data: bool,
    #[diesel(sql_type = Timestamp)]
    created_at: NaiveDateTime,
    #[diesel(sql_type = Timestamp)]
    updated_at: NaiveDateTime,
    #[diesel(sql_type = Text)]
    artist_name: String,
    #[diesel(sql_type = Nullable<Double>)]
    average_score: Option<f64>,
    #[diesel(sql_type = BigInt)]
    rating_count: i64,
    #[diesel(sql_type = BigInt)]
    comment_count: i64,
}

impl TryFrom<SummaryRow> for ReleaseSummary {
    type Error = RepoError;

    fn try_from(row: SummaryRow) -> Result<Self, Self::Error> {
        let release = Release::try_from(ReleaseRow {
            id: row.id,
            title: row.title,
            artist_id: row.artist_id,
            release_date: row.release_date,
            release_type: row.release_type,
            cover_url: row.cover_url,
            yandex_music_url: row.yandex_music_url,
            apple_music_url: row.apple_music_url,
            spotify_url: row.spotify_url,
            deezer_url: row.deezer_url,
            is_test_data: row.is_test_data,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })?;
        Ok(ReleaseSummary {
            release,
            artist_name: row.artist_name,
            stats: ReleaseStats {
                average_score: row.average_score,
                rating_count: row.rating_count,
                comment_count: row.comment_count,
            }
            .rounded(),
        })
    }
}

pub(super) fn into_summaries(rows: Vec<SummaryRow>) -> Result<Vec<ReleaseSummary>, RepoError> {
    rows.into_iter().map(ReleaseSummary::try_from).collect()
}

fn order_clause(sort: ReleaseSort) -> &'static str {
    match sort {
        ReleaseSort::Newest => "r.release_date IS NULL, r.release_date DESC, r.id DESC",
        ReleaseSort::Top => {
            "average_score IS NULL, average_score DESC, rating_count DESC, r.id DESC"
        }
        ReleaseSort::Popular => "rating_count DESC, average_score DESC, r.id DESC",
    }
}

/// Repository for release database operations.
#[derive(Clone)]
pub struct ReleaseRepository {
    pool: DbPool,
}

impl ReleaseRepository {
    /// Create a new release repository.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Find a release by ID.
    pub fn find_by_id(&self, release_id: i32) -> Result<Option<Release>, RepoError> {
        let mut conn = self.pool.get()?;

        let result = releases::table
            .filter(releases::id.eq(release_id))
            .select(ReleaseRow::as_select())
            .first(&mut conn)
            .optional()?;

        result.map(Release::try_from).transpose()
    }

    /// Find a release with its artist name and rating aggregates.
    pub fn find_summary(&self, release_id: i32) -> Result<Option<ReleaseSummary>, RepoError> {
        let mut conn = self.pool.get()?;

        let sql = format!("{SUMMARY_SELECT} WHERE r.id = ? GROUP BY r.id");
        let row = diesel::sql_query(sql)
            .bind::<Integer, _>(release_id)
            .get_result::<SummaryRow>(&mut conn)
            .optional()?;

        row.map(ReleaseSummary::try_from).transpose()
    }

    /// Rating aggregates for one release.
    pub fn stats(&self, release_id: i32) -> Result<ReleaseStats, RepoError> {
        self.find_summary(release_id)?
            .map(|summary| summary.stats)
            .ok_or_else(|| RepoError::NotFound(format!("Release {release_id}")))
    }

    /// List releases with filters, sorting and pagination.
    pub fn list(
        &self,
        filter: &ReleaseFilter,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<ReleaseSummary>, RepoError> {
        let mut conn = self.pool.get()?;

        let sql = format!(
            r#"{SUMMARY_SELECT}
            WHERE (? OR r.is_test_data = 0)
              AND (? IS NULL OR r.release_type = ?)
              AND (? IS NULL OR r.artist_id = ?)
              AND (? IS NULL OR r.title LIKE ? ESCAPE '\' OR a.name LIKE ? ESCAPE '\')
            GROUP BY r.id
            ORDER BY {}
            LIMIT ? OFFSET ?"#,
            order_clause(filter.sort)
        );

        let release_type = filter.release_type.map(|t| t.as_str());
        let pattern = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(like_pattern);

        let rows = diesel::sql_query(sql)
            .bind::<Bool, _>(filter.include_test_data)
            .bind::<Nullable<Text>, _>(release_type)
            .bind::<Nullable<Text>, _>(release_type)
            .bind::<Nullable<Integer>, _>(filter.artist_id)
            .bind::<Nullable<Integer>, _>(filter.artist_id)
            .bind::<Nullable<Text>, _>(pattern.as_deref())
            .bind::<Nullable<Text>, _>(pattern.as_deref())
            .bind::<Nullable<Text>, _>(pattern.as_deref())
            .bind::<BigInt, _>(limit)
            .bind::<BigInt, _>(offset)
            .load::<SummaryRow>(&mut conn)?;

        into_summaries(rows)
    }

    /// Create a new release.
    pub fn create(&self, data: &ReleaseData) -> Result<Release, RepoError> {
        let mut conn = self.pool.get()?;

        conn.transaction(|conn| {
            ensure_artist_exists(conn, data.artist_id)?;
            insert_release(conn, data)
        })
    }

    /// Replace a release's fields.
    pub fn update(&self, release_id: i32, data: &ReleaseData) -> Result<Release, RepoError> {
        let mut conn = self.pool.get()?;

        conn.transaction(|conn| {
            ensure_artist_exists(conn, data.artist_id)?;
            let row = diesel::update(releases::table.filter(releases::id.eq(release_id)))
                .set(ReleaseChanges::from(data))
                .returning(ReleaseRow::as_returning())
                .get_result(conn)
                .optional()?;

            row.map(Release::try_from)
                .transpose()?
                .ok_or_else(|| RepoError::NotFound(format!("Release {release_id}")))
        })
    }

    /// Delete a release.
    ///
    /// Ratings, reactions, reports and collection memberships go with it.
    /// Active collections left with too few releases are deactivated in the
    /// same transaction.
    pub fn delete(&self, release_id: i32) -> Result<bool, RepoError> {
        let mut conn = self.pool.get()?;

        conn.transaction(|conn| {
            let affected = active_collections_containing(conn, &[release_id])?;
            let deleted = diesel::delete(releases::table.filter(releases::id.eq(release_id)))
                .execute(conn)?;
            deactivate_undersized(conn, &affected)?;
            Ok(deleted > 0)
        })
    }

    /// Delete every release flagged as test data. Returns how many were removed.
    pub fn purge_test_data(&self) -> Result<usize, RepoError> {
        let mut conn = self.pool.get()?;

        conn.transaction(|conn| {
            let ids: Vec<i32> = releases::table
                .filter(releases::is_test_data.eq(true))
                .select(releases::id)
                .load(conn)?;
            let affected = active_collections_containing(conn, &ids)?;
            let deleted = diesel::delete(releases::table.filter(releases::id.eq_any(&ids)))
                .execute(conn)?;
            deactivate_undersized(conn, &affected)?;
            Ok(deleted)
        })
    }

    /// Import already-fetched release metadata.
    ///
    /// Artists are matched by exact name and created when missing. A release
    /// with the same artist, title and type is skipped. The whole batch is
    /// one transaction.
    pub fn import(&self, entries: &[ImportEntry]) -> Result<ImportReport, RepoError> {
        let mut conn = self.pool.get()?;

        conn.transaction(|conn| {
            let mut report = ImportReport::default();
            for entry in entries {
                let artist = match artist_by_exact_name(conn, &entry.artist.name)? {
                    Some(artist) => artist,
                    None => {
                        report.artists_created += 1;
                        insert_artist(conn, &entry.artist)?
                    }
                };

                let duplicate: i64 = releases::table
                    .filter(releases::artist_id.eq(artist.id))
                    .filter(releases::title.eq(&entry.release.title))
                    .filter(releases::release_type.eq(entry.release.release_type.as_str()))
                    .count()
                    .get_result(conn)?;
                if duplicate > 0 {
                    report.releases_skipped += 1;
                    continue;
                }

                let data = ReleaseData {
                    artist_id: artist.id,
                    ..entry.release.clone()
                };
                insert_release(conn, &data)?;
                report.releases_created += 1;
            }
            Ok(report)
        })
    }
}

fn ensure_artist_exists(conn: &mut SqliteConnection, artist_id: i32) -> Result<(), RepoError> {
    let exists: i64 = artists::table
        .filter(artists::id.eq(artist_id))
        .count()
        .get_result(conn)?;
    if exists == 0 {
        return Err(RepoError::NotFound(format!("Artist {artist_id}")));
    }
    Ok(())
}

fn insert_release(conn: &mut SqliteConnection, data: &ReleaseData) -> Result<Release, RepoError> {
    let row = diesel::insert_into(releases::table)
        .values((ReleaseChanges::from(data), releases::created_at.eq(now())))
        .returning(ReleaseRow::as_returning())
        .get_result(conn)?;
    Release::try_from(row)
}

pub(super) fn active_collections_containing(
    conn: &mut SqliteConnection,
    release_ids: &[i32],
) -> Result<Vec<i32>, RepoError> {
    let ids = collection_releases::table
        .inner_join(collections::table)
        .filter(collection_releases::release_id.eq_any(release_ids))
        .filter(collections::is_active.eq(true))
        .select(collections::id)
        .distinct()
        .load(conn)?;
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::{RatingRepository, testing};
    use crate::models::catalog::{ArtistData, ReleaseType};
    use crate::models::Score;

    fn release_data(artist_id: i32, title: &str) -> ReleaseData {
        ReleaseData {
            title: title.into(),
            artist_id,
            release_date: None,
            release_type: ReleaseType::Album,
            cover_url: None,
            links: StreamingLinks::default(),
            is_test_data: false,
        }
    }

    #[test]
    fn test_create_requires_artist() {
        let pool = testing::pool();
        let repo = ReleaseRepository::new(pool);
        let err = repo.create(&release_data(42, "Orphan")).unwrap_err();
        assert!(matches!(err, RepoError::NotFound(_)));
    }

    #[test]
    fn test_summary_aggregates_ratings() {
        let pool = testing::pool();
        let release = testing::release(&pool, "Portishead", "Dummy");
        let a = testing::user(&pool, "alice");
        let b = testing::user(&pool, "bob");
        let c = testing::user(&pool, "carol");
        let ratings = RatingRepository::new(pool.clone());
        ratings.upsert(a.id, release.id, Score::new(10).unwrap(), Some("classic".into())).unwrap();
        ratings.upsert(b.id, release.id, Score::new(7).unwrap(), None).unwrap();
        ratings.upsert(c.id, release.id, Score::new(8).unwrap(), None).unwrap();

        let repo = ReleaseRepository::new(pool);
        let stats = repo.stats(release.id).unwrap();
        assert_eq!(stats.rating_count, 3);
        assert_eq!(stats.comment_count, 1);
        assert_eq!(stats.average_score, Some(8.3));
    }

    #[test]
    fn test_unrated_release_has_no_average() {
        let pool = testing::pool();
        let release = testing::release(&pool, "Slint", "Spiderland");
        let repo = ReleaseRepository::new(pool);
        let summary = repo.find_summary(release.id).unwrap().unwrap();
        assert_eq!(summary.artist_name, "Slint");
        assert_eq!(summary.stats, ReleaseStats::default());
    }

    #[test]
    fn test_list_hides_test_data_and_filters() {
        let pool = testing::pool();
        let real = testing::release(&pool, "Björk", "Homogenic");
        let repo = ReleaseRepository::new(pool.clone());
        let mut fake = release_data(real.artist_id, "Load Test Album");
        fake.is_test_data = true;
        repo.create(&fake).unwrap();
        let mut single = release_data(real.artist_id, "Jóga");
        single.release_type = ReleaseType::Single;
        repo.create(&single).unwrap();

        let public = repo.list(&ReleaseFilter::default(), 0, 50).unwrap();
        assert_eq!(public.len(), 2);
        assert!(public.iter().all(|s| !s.release.is_test_data));

        let all = ReleaseFilter {
            include_test_data: true,
            ..Default::default()
        };
        assert_eq!(repo.list(&all, 0, 50).unwrap().len(), 3);

        let singles = ReleaseFilter {
            release_type: Some(ReleaseType::Single),
            ..Default::default()
        };
        let found = repo.list(&singles, 0, 50).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].release.title, "Jóga");

        let by_artist_name = ReleaseFilter {
            search: Some("björk".into()),
            ..Default::default()
        };
        // SQLite LIKE folds ASCII only; the 'B' still matches case-insensitively.
        assert_eq!(repo.list(&by_artist_name, 0, 50).unwrap().len(), 2);
    }

    #[test]
    fn test_list_sorted_by_top() {
        let pool = testing::pool();
        let good = testing::release(&pool, "Artist", "Good");
        let great = testing::release(&pool, "Artist", "Great");
        let unrated = testing::release(&pool, "Artist", "Unrated");
        let user = testing::user(&pool, "critic");
        let ratings = RatingRepository::new(pool.clone());
        ratings.upsert(user.id, good.id, Score::new(6).unwrap(), None).unwrap();
        ratings.upsert(user.id, great.id, Score::new(9).unwrap(), None).unwrap();

        let repo = ReleaseRepository::new(pool);
        let filter = ReleaseFilter {
            sort: ReleaseSort::Top,
            ..Default::default()
        };
        let ids: Vec<i32> = repo
            .list(&filter, 0, 10)
            .unwrap()
            .into_iter()
            .map(|s| s.release.id)
            .collect();
        assert_eq!(ids, vec![great.id, good.id, unrated.id]);
    }

    #[test]
    fn test_import_creates_and_skips() {
        let pool = testing::pool();
        let repo = ReleaseRepository::new(pool);
        let entry = |artist: &str, title: &str| ImportEntry {
            artist: ArtistData {
                name: artist.into(),
                deezer_id: None,
                itunes_id: None,
                yandex_id: None,
            },
            release: release_data(0, title),
        };

        let report = repo
            .import(&[
                entry("Zemfira", "Vendetta"),
                entry("Zemfira", "Vendetta"),
                entry("Zemfira", "Borderline"),
                entry("Mumiy Troll", "Morskaya"),
            ])
            .unwrap();
        assert_eq!(report.artists_created, 2);
        assert_eq!(report.releases_created, 3);
        assert_eq!(report.releases_skipped, 1);

        let again = repo.import(&[entry("Zemfira", "Vendetta")]).unwrap();
        assert_eq!(again.artists_created, 0);
        assert_eq!(again.releases_skipped, 1);
    }

    #[test]
    fn test_purge_test_data() {
        let pool = testing::pool();
        let keep = testing::release(&pool, "Artist", "Keep");
        let repo = ReleaseRepository::new(pool);
        let mut fake = release_data(keep.artist_id, "Fake");
        fake.is_test_data = true;
        repo.create(&fake).unwrap();

        assert_eq!(repo.purge_test_data().unwrap(), 1);
        assert!(repo.find_by_id(keep.id).unwrap().is_some());
        assert_eq!(repo.purge_test_data().unwrap(), 0);
    }
}
