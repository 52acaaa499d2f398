//! Database repository for curated collections.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Bool, Integer};

use super::releases::{SUMMARY_SELECT, SummaryRow, into_summaries};
use super::{RepoError, now};
use crate::db::DbPool;
use crate::db::schema::{collection_releases, collections, releases};
use crate::models::collection::{CollectionData, CollectionDetail, CollectionSummary};
use crate::models::{Collection, MIN_ACTIVE_RELEASES, ValidationError};

/// Database row representation for collections.
#[derive(Debug, Clone, Queryable, QueryableByName, Selectable)]
#[diesel(table_name = collections)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CollectionRow {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub position: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<CollectionRow> for Collection {
    fn from(row: CollectionRow) -> Self {
        Collection {
            id: row.id,
            title: row.title,
            description: row.description,
            is_active: row.is_active,
            position: row.position,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(QueryableByName)]
struct SummaryWithCount {
    #[diesel(embed)]
    collection: CollectionRow,
    #[diesel(sql_type = BigInt)]
    release_count: i64,
}

#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = collections)]
#[diesel(treat_none_as_null = true)]
struct CollectionChanges<'a> {
    title: &'a str,
    description: Option<&'a str>,
    position: i32,
    updated_at: NaiveDateTime,
}

impl<'a> From<&'a CollectionData> for CollectionChanges<'a> {
    fn from(data: &'a CollectionData) -> Self {
        Self {
            title: &data.title,
            description: data.description.as_deref(),
            position: data.position,
            updated_at: now(),
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = collection_releases)]
struct NewMembership {
    collection_id: i32,
    release_id: i32,
    position: i32,
}

fn release_count(conn: &mut SqliteConnection, collection_id: i32) -> Result<i64, RepoError> {
    let count = collection_releases::table
        .filter(collection_releases::collection_id.eq(collection_id))
        .count()
        .get_result(conn)?;
    Ok(count)
}

fn load_collection(
    conn: &mut SqliteConnection,
    collection_id: i32,
) -> Result<Collection, RepoError> {
    collections::table
        .filter(collections::id.eq(collection_id))
        .select(CollectionRow::as_select())
        .first(conn)
        .optional()?
        .map(Collection::from)
        .ok_or_else(|| RepoError::NotFound(format!("Collection {collection_id}")))
}

/// Deactivate any of the given collections that dropped below the minimum
/// size. Returns the ids that were deactivated.
pub(super) fn deactivate_undersized(
    conn: &mut SqliteConnection,
    collection_ids: &[i32],
) -> Result<Vec<i32>, RepoError> {
    let mut deactivated = Vec::new();
    for &collection_id in collection_ids {
        if release_count(conn, collection_id)? >= MIN_ACTIVE_RELEASES as i64 {
            continue;
        }
        diesel::update(collections::table.filter(collections::id.eq(collection_id)))
            .set((collections::is_active.eq(false), collections::updated_at.eq(now())))
            .execute(conn)?;
        tracing::info!(collection_id, "Collection deactivated: too few releases left");
        deactivated.push(collection_id);
    }
    Ok(deactivated)
}

/// Repository for collection database operations.
#[derive(Clone)]
pub struct CollectionRepository {
    pool: DbPool,
}

impl CollectionRepository {
    /// Create a new collection repository.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Find a collection by ID.
    pub fn find_by_id(&self, collection_id: i32) -> Result<Option<Collection>, RepoError> {
        let mut conn = self.pool.get()?;

        let result = collections::table
            .filter(collections::id.eq(collection_id))
            .select(CollectionRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(result.map(Collection::from))
    }

    /// List collections in display order with their release counts.
    ///
    /// Test-data releases are only counted when `include_test_data` is set,
    /// matching what the detail view shows the same viewer.
    pub fn list(
        &self,
        include_inactive: bool,
        include_test_data: bool,
    ) -> Result<Vec<CollectionSummary>, RepoError> {
        let mut conn = self.pool.get()?;

        let rows = diesel::sql_query(
            r#"
            SELECT c.id AS id,
                   c.title AS title,
                   c.description AS description,
                   c.is_active AS is_active,
                   c.position AS position,
                   c.created_at AS created_at,
                   c.updated_at AS updated_at,
                   COUNT(r.id) AS release_count
            FROM collections c
            LEFT JOIN collection_releases cr ON cr.collection_id = c.id
            LEFT JOIN releases r ON r.id = cr.release_id AND (? OR r.is_test_data = 0)
            WHERE (? OR c.is_active = 1)
            GROUP BY c.id
            ORDER BY c.position ASC, c.id ASC
            "#,
        )
        .bind::<Bool, _>(include_test_data)
        .bind::<Bool, _>(include_inactive)
        .load::<SummaryWithCount>(&mut conn)?;

        Ok(rows
            .into_iter()
            .map(|row| CollectionSummary {
                collection: Collection::from(row.collection),
                release_count: row.release_count,
            })
            .collect())
    }

    /// A collection with its releases in curated order.
    pub fn detail(&self, collection_id: i32) -> Result<Option<CollectionDetail>, RepoError> {
        let mut conn = self.pool.get()?;

        let Some(collection) = collections::table
            .filter(collections::id.eq(collection_id))
            .select(CollectionRow::as_select())
            .first(&mut conn)
            .optional()?
        else {
            return Ok(None);
        };

        let sql = format!(
            r#"{SUMMARY_SELECT}
            JOIN collection_releases cr ON cr.release_id = r.id
            WHERE cr.collection_id = ?
            GROUP BY r.id
            ORDER BY MIN(cr.position) ASC"#
        );
        let rows = diesel::sql_query(sql)
            .bind::<Integer, _>(collection_id)
            .load::<SummaryRow>(&mut conn)?;

        Ok(Some(CollectionDetail {
            collection: Collection::from(collection),
            releases: into_summaries(rows)?,
        }))
    }

    /// Create a new, inactive collection.
    pub fn create(&self, data: &CollectionData) -> Result<Collection, RepoError> {
        let mut conn = self.pool.get()?;

        let row = diesel::insert_into(collections::table)
            .values((
                CollectionChanges::from(data),
                collections::is_active.eq(false),
                collections::created_at.eq(now()),
            ))
            .returning(CollectionRow::as_returning())
            .get_result(&mut conn)?;

        Ok(Collection::from(row))
    }

    /// Update title, description and position.
    pub fn update(&self, collection_id: i32, data: &CollectionData) -> Result<Collection, RepoError> {
        let mut conn = self.pool.get()?;

        let row = diesel::update(collections::table.filter(collections::id.eq(collection_id)))
            .set(CollectionChanges::from(data))
            .returning(CollectionRow::as_returning())
            .get_result(&mut conn)
            .optional()?;

        row.map(Collection::from)
            .ok_or_else(|| RepoError::NotFound(format!("Collection {collection_id}")))
    }

    /// Delete a collection. Releases are untouched.
    pub fn delete(&self, collection_id: i32) -> Result<bool, RepoError> {
        let mut conn = self.pool.get()?;

        let deleted = diesel::delete(collections::table.filter(collections::id.eq(collection_id)))
            .execute(&mut conn)?;

        Ok(deleted > 0)
    }

    /// Replace the collection's releases with `release_ids`, in that order.
    ///
    /// Every id must exist. An active collection cannot shrink below
    /// [`MIN_ACTIVE_RELEASES`].
    pub fn set_releases(&self, collection_id: i32, release_ids: &[i32]) -> Result<Collection, RepoError> {
        let mut conn = self.pool.get()?;

        conn.transaction(|conn| {
            let collection = load_collection(conn, collection_id)?;
            if collection.is_active && release_ids.len() < MIN_ACTIVE_RELEASES {
                return Err(ValidationError::new(
                    "releaseIds",
                    format!(
                        "an active collection needs at least {MIN_ACTIVE_RELEASES} releases; deactivate it first"
                    ),
                )
                .into());
            }

            let known: Vec<i32> = releases::table
                .filter(releases::id.eq_any(release_ids))
                .select(releases::id)
                .load(conn)?;
            if let Some(missing) = release_ids.iter().find(|id| !known.contains(id)) {
                return Err(ValidationError::new(
                    "releaseIds",
                    format!("release {missing} does not exist"),
                )
                .into());
            }

            diesel::delete(
                collection_releases::table
                    .filter(collection_releases::collection_id.eq(collection_id)),
            )
            .execute(conn)?;

            let memberships: Vec<NewMembership> = release_ids
                .iter()
                .enumerate()
                .map(|(position, &release_id)| NewMembership {
                    collection_id,
                    release_id,
                    position: position as i32,
                })
                .collect();
            diesel::insert_into(collection_releases::table)
                .values(&memberships)
                .execute(conn)?;

            diesel::update(collections::table.filter(collections::id.eq(collection_id)))
                .set(collections::updated_at.eq(now()))
                .execute(conn)?;

            load_collection(conn, collection_id)
        })
    }

    /// Activate or deactivate a collection.
    ///
    /// Activation requires at least [`MIN_ACTIVE_RELEASES`] releases.
    pub fn set_active(&self, collection_id: i32, active: bool) -> Result<Collection, RepoError> {
        let mut conn = self.pool.get()?;

        conn.transaction(|conn| {
            load_collection(conn, collection_id)?;
            if active {
                let count = release_count(conn, collection_id)?;
                if count < MIN_ACTIVE_RELEASES as i64 {
                    return Err(ValidationError::new(
                        "releases",
                        format!(
                            "a collection needs at least {MIN_ACTIVE_RELEASES} releases to be activated (has {count})"
                        ),
                    )
                    .into());
                }
            }

            diesel::update(collections::table.filter(collections::id.eq(collection_id)))
                .set((collections::is_active.eq(active), collections::updated_at.eq(now())))
                .execute(conn)?;

            load_collection(conn, collection_id)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::{ArtistRepository, ReleaseRepository, testing};

    fn data(title: &str) -> CollectionData {
        CollectionData {
            title: title.into(),
            description: None,
            position: 0,
        }
    }

    fn releases(pool: &DbPool, n: usize) -> Vec<i32> {
        (0..n)
            .map(|i| testing::release(pool, "Various", &format!("Release {i}")).id)
            .collect()
    }

    #[test]
    fn test_cannot_activate_with_fewer_than_five() {
        let pool = testing::pool();
        let ids = releases(&pool, 4);
        let repo = CollectionRepository::new(pool);
        let collection = repo.create(&data("Too small")).unwrap();
        assert!(!collection.is_active);

        repo.set_releases(collection.id, &ids).unwrap();
        let err = repo.set_active(collection.id, true).unwrap_err();
        assert!(matches!(err, RepoError::Validation(_)));
        assert!(!repo.find_by_id(collection.id).unwrap().unwrap().is_active);
    }

    #[test]
    fn test_activate_with_five() {
        let pool = testing::pool();
        let ids = releases(&pool, 5);
        let repo = CollectionRepository::new(pool);
        let collection = repo.create(&data("Just right")).unwrap();
        repo.set_releases(collection.id, &ids).unwrap();

        let active = repo.set_active(collection.id, true).unwrap();
        assert!(active.is_active);

        // Shrinking an active collection is refused.
        let err = repo.set_releases(collection.id, &ids[..3]).unwrap_err();
        assert!(matches!(err, RepoError::Validation(_)));

        let listed = repo.list(false, false).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].release_count, 5);
    }

    #[test]
    fn test_detail_preserves_order() {
        let pool = testing::pool();
        let mut ids = releases(&pool, 5);
        ids.reverse();
        let repo = CollectionRepository::new(pool);
        let collection = repo.create(&data("Ordered")).unwrap();
        repo.set_releases(collection.id, &ids).unwrap();

        let detail = repo.detail(collection.id).unwrap().unwrap();
        let got: Vec<i32> = detail.releases.iter().map(|r| r.release.id).collect();
        assert_eq!(got, ids);
    }

    #[test]
    fn test_unknown_release_rejected() {
        let pool = testing::pool();
        let repo = CollectionRepository::new(pool);
        let collection = repo.create(&data("Ghosts")).unwrap();
        let err = repo.set_releases(collection.id, &[12345]).unwrap_err();
        assert!(matches!(err, RepoError::Validation(_)));
    }

    #[test]
    fn test_inactive_hidden_from_public_list() {
        let pool = testing::pool();
        let repo = CollectionRepository::new(pool);
        repo.create(&data("Draft")).unwrap();
        assert!(repo.list(false, false).unwrap().is_empty());
        let all = repo.list(true, true).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].release_count, 0);
    }

    #[test]
    fn test_release_delete_deactivates_undersized_collection() {
        let pool = testing::pool();
        let ids = releases(&pool, 5);
        let repo = CollectionRepository::new(pool.clone());
        let collection = repo.create(&data("Fragile")).unwrap();
        repo.set_releases(collection.id, &ids).unwrap();
        repo.set_active(collection.id, true).unwrap();

        ReleaseRepository::new(pool).delete(ids[0]).unwrap();

        let after = repo.find_by_id(collection.id).unwrap().unwrap();
        assert!(!after.is_active);
    }

    #[test]
    fn test_artist_delete_deactivates_undersized_collection() {
        let pool = testing::pool();
        let mut ids = releases(&pool, 4);
        let solo = testing::release(&pool, "Solo Act", "Only Album");
        ids.push(solo.id);
        let repo = CollectionRepository::new(pool.clone());
        let collection = repo.create(&data("Mixed")).unwrap();
        repo.set_releases(collection.id, &ids).unwrap();
        repo.set_active(collection.id, true).unwrap();

        assert!(ArtistRepository::new(pool).delete(solo.artist_id).unwrap());

        let after = repo.find_by_id(collection.id).unwrap().unwrap();
        assert!(!after.is_active);
        assert_eq!(repo.list(true, true).unwrap()[0].release_count, 4);
    }

    #[test]
    fn test_public_count_skips_test_data() {
        let pool = testing::pool();
        let ids = releases(&pool, 6);
        {
            let mut conn = pool.get().unwrap();
            diesel::update(releases::table.filter(releases::id.eq(ids[0])))
                .set(releases::is_test_data.eq(true))
                .execute(&mut conn)
                .unwrap();
        }
        let repo = CollectionRepository::new(pool);
        let collection = repo.create(&data("Sampler")).unwrap();
        repo.set_releases(collection.id, &ids).unwrap();
        repo.set_active(collection.id, true).unwrap();

        assert_eq!(repo.list(false, false).unwrap()[0].release_count, 5);
        assert_eq!(repo.list(true, true).unwrap()[0].release_count, 6);
    }
}
