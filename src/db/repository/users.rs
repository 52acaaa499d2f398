//! Database repository for user operations.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Bool, Double, Nullable, Text, Timestamp};

use super::{RepoError, now};
use crate::db::DbPool;
use crate::db::schema::users;
use crate::models::user::UserProfile;
use crate::models::{Nickname, User};

/// Database row representation for users.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct UserRow {
    pub id: i32,
    pub google_id: String,
    pub email: Option<String>,
    pub nickname: Option<String>,
    pub is_admin: bool,
    pub created_at: NaiveDateTime,
    #[allow(dead_code)]
    pub updated_at: NaiveDateTime,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            google_id: row.google_id,
            email: row.email,
            nickname: row.nickname,
            is_admin: row.is_admin,
            created_at: row.created_at,
        }
    }
}

/// Data for inserting a new user.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
    pub google_id: &'a str,
    pub email: Option<&'a str>,
    pub nickname: Option<&'a str>,
    pub is_admin: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl<'a> NewUser<'a> {
    /// A user signing in for the first time; the nickname comes later.
    pub fn from_google(google_id: &'a str, email: Option<&'a str>) -> Self {
        let now = now();
        Self {
            google_id,
            email,
            nickname: None,
            is_admin: false,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(QueryableByName)]
struct ProfileRow {
    #[diesel(sql_type = Text)]
    nickname: String,
    #[diesel(sql_type = Timestamp)]
    joined_at: NaiveDateTime,
    #[diesel(sql_type = BigInt)]
    rating_count: i64,
    #[diesel(sql_type = BigInt)]
    comment_count: i64,
    #[diesel(sql_type = Nullable<Double>)]
    average_score: Option<f64>,
}

/// Repository for user database operations.
#[derive(Clone)]
pub struct UserRepository {
    pool: DbPool,
}

impl UserRepository {
    /// Create a new user repository.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Find a user by ID.
    pub fn find_by_id(&self, user_id: i32) -> Result<Option<User>, RepoError> {
        let mut conn = self.pool.get()?;

        let result = users::table
            .filter(users::id.eq(user_id))
            .select(UserRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(result.map(User::from))
    }

    /// Find a user by nickname (case-insensitive).
    pub fn find_by_nickname(&self, nickname: &str) -> Result<Option<User>, RepoError> {
        let mut conn = self.pool.get()?;

        // The column is declared COLLATE NOCASE.
        let result = users::table
            .filter(users::nickname.eq(nickname))
            .select(UserRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(result.map(User::from))
    }

    /// Find a user by Google subject.
    pub fn find_by_google_id(&self, google_id: &str) -> Result<Option<User>, RepoError> {
        let mut conn = self.pool.get()?;

        let result = users::table
            .filter(users::google_id.eq(google_id))
            .select(UserRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(result.map(User::from))
    }

    /// Get all users ordered by sign-up.
    pub fn find_all(&self) -> Result<Vec<User>, RepoError> {
        self.list(0, i64::MAX)
    }

    /// Get a page of users ordered by sign-up.
    pub fn list(&self, offset: i64, limit: i64) -> Result<Vec<User>, RepoError> {
        let mut conn = self.pool.get()?;

        let results = users::table
            .select(UserRow::as_select())
            .order(users::id.asc())
            .offset(offset)
            .limit(limit)
            .load(&mut conn)?;

        Ok(results.into_iter().map(User::from).collect())
    }

    /// Create a new user.
    pub fn create(&self, new_user: &NewUser) -> Result<User, RepoError> {
        let mut conn = self.pool.get()?;

        let row = diesel::insert_into(users::table)
            .values(new_user)
            .returning(UserRow::as_returning())
            .get_result(&mut conn)
            .map_err(|e| match RepoError::from(e) {
                RepoError::Conflict(_) => RepoError::Conflict(format!(
                    "A user with Google id '{}' or the same nickname already exists",
                    new_user.google_id
                )),
                other => other,
            })?;

        Ok(User::from(row))
    }

    /// Resolve a Google sign-in to a local user, creating one on first login.
    ///
    /// The stored email is refreshed on every login. Returns the user and
    /// whether it was just created. Concurrent first logins for the same
    /// subject converge on one row through the unique `google_id` index.
    pub fn find_or_create_by_google(
        &self,
        google_id: &str,
        email: Option<&str>,
    ) -> Result<(User, bool), RepoError> {
        let mut conn = self.pool.get()?;

        conn.transaction(|conn| {
            let existing = users::table
                .filter(users::google_id.eq(google_id))
                .select(UserRow::as_select())
                .first(conn)
                .optional()?;

            let new_user = NewUser::from_google(google_id, email);
            let row = diesel::insert_into(users::table)
                .values(&new_user)
                .on_conflict(users::google_id)
                .do_update()
                .set((users::email.eq(email), users::updated_at.eq(now())))
                .returning(UserRow::as_returning())
                .get_result(conn)?;

            Ok((User::from(row), existing.is_none()))
        })
    }

    /// Set or change a user's nickname.
    ///
    /// Fails with `Conflict` when another user already holds the name in any
    /// letter case. The unique index settles races between concurrent
    /// signups; the pre-check only produces a friendlier message.
    pub fn set_nickname(&self, user_id: i32, nickname: &Nickname) -> Result<User, RepoError> {
        let mut conn = self.pool.get()?;
        let taken = || RepoError::Conflict(format!("Nickname '{}' is already taken", nickname.as_str()));

        conn.transaction(|conn| {
            let holder: Option<i32> = users::table
                .filter(users::nickname.eq(nickname.as_str()))
                .select(users::id)
                .first(conn)
                .optional()?;
            if holder.is_some_and(|id| id != user_id) {
                return Err(taken());
            }

            let row = diesel::update(users::table.filter(users::id.eq(user_id)))
                .set((
                    users::nickname.eq(nickname.as_str()),
                    users::updated_at.eq(now()),
                ))
                .returning(UserRow::as_returning())
                .get_result(conn)
                .optional()
                .map_err(|e| match RepoError::from(e) {
                    RepoError::Conflict(_) => taken(),
                    other => other,
                })?;

            row.map(User::from)
                .ok_or_else(|| RepoError::NotFound(format!("User {user_id}")))
        })
    }

    /// Grant or revoke admin rights.
    pub fn set_admin(&self, user_id: i32, is_admin: bool) -> Result<User, RepoError> {
        let mut conn = self.pool.get()?;

        let row = diesel::update(users::table.filter(users::id.eq(user_id)))
            .set((users::is_admin.eq(is_admin), users::updated_at.eq(now())))
            .returning(UserRow::as_returning())
            .get_result(&mut conn)
            .optional()?;

        row.map(User::from)
            .ok_or_else(|| RepoError::NotFound(format!("User {user_id}")))
    }

    /// Check if there are any admins.
    pub fn has_admins(&self) -> Result<bool, RepoError> {
        let mut conn = self.pool.get()?;

        let count: i64 = users::table
            .filter(users::is_admin.eq(true))
            .count()
            .get_result(&mut conn)?;

        Ok(count > 0)
    }

    /// Public profile with rating activity.
    ///
    /// Ratings on test-data releases only count when `include_test_data`
    /// is set, as in the user's rating listing.
    pub fn profile(
        &self,
        nickname: &str,
        include_test_data: bool,
    ) -> Result<Option<UserProfile>, RepoError> {
        let mut conn = self.pool.get()?;

        let row = diesel::sql_query(
            r#"
            SELECT u.nickname AS nickname,
                   u.created_at AS joined_at,
                   COUNT(r.id) AS rating_count,
                   COALESCE(SUM(CASE WHEN r.text IS NOT NULL AND r.text <> '' THEN 1 ELSE 0 END), 0) AS comment_count,
                   AVG(r.score) AS average_score
            FROM users u
            LEFT JOIN ratings r ON r.user_id = u.id
                AND r.release_id IN (SELECT id FROM releases WHERE ? OR is_test_data = 0)
            WHERE u.nickname = ?
            GROUP BY u.id
            "#,
        )
        .bind::<Bool, _>(include_test_data)
        .bind::<Text, _>(nickname)
        .get_result::<ProfileRow>(&mut conn)
        .optional()?;

        Ok(row.map(|row| UserProfile {
            nickname: row.nickname,
            joined_at: row.joined_at,
            rating_count: row.rating_count,
            comment_count: row.comment_count,
            average_score: row.average_score.map(|avg| (avg * 10.0).round() / 10.0),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::{RatingRepository, testing};
    use crate::db::schema::releases;
    use crate::models::Score;

    #[test]
    fn test_first_login_creates_user() {
        let pool = testing::pool();
        let repo = UserRepository::new(pool);

        let (user, created) = repo
            .find_or_create_by_google("sub-1", Some("a@example.com"))
            .unwrap();
        assert!(created);
        assert_eq!(user.nickname, None);

        let (again, created) = repo
            .find_or_create_by_google("sub-1", Some("new@example.com"))
            .unwrap();
        assert!(!created);
        assert_eq!(again.id, user.id);
        assert_eq!(again.email.as_deref(), Some("new@example.com"));
    }

    #[test]
    fn test_nickname_unique_case_insensitive() {
        let pool = testing::pool();
        let repo = UserRepository::new(pool);
        let (a, _) = repo.find_or_create_by_google("sub-a", None).unwrap();
        let (b, _) = repo.find_or_create_by_google("sub-b", None).unwrap();

        repo.set_nickname(a.id, &Nickname::parse("Melody").unwrap())
            .unwrap();
        let err = repo
            .set_nickname(b.id, &Nickname::parse("melody").unwrap())
            .unwrap_err();
        assert!(matches!(err, RepoError::Conflict(_)));

        // Re-setting your own nickname in another case is fine.
        let renamed = repo
            .set_nickname(a.id, &Nickname::parse("MELODY").unwrap())
            .unwrap();
        assert_eq!(renamed.nickname.as_deref(), Some("MELODY"));
    }

    #[test]
    fn test_unique_index_rejects_duplicate_insert() {
        // Bypasses the pre-check, as a concurrent signup would.
        let pool = testing::pool();
        let repo = UserRepository::new(pool);
        let mut first = NewUser::from_google("sub-x", None);
        first.nickname = Some("racer");
        repo.create(&first).unwrap();

        let mut second = NewUser::from_google("sub-y", None);
        second.nickname = Some("RACER");
        assert!(matches!(repo.create(&second), Err(RepoError::Conflict(_))));
    }

    #[test]
    fn test_find_by_nickname_ignores_case() {
        let pool = testing::pool();
        let user = testing::user(&pool, "Listener");
        let repo = UserRepository::new(pool);
        let found = repo.find_by_nickname("listener").unwrap().unwrap();
        assert_eq!(found.id, user.id);
    }

    #[test]
    fn test_set_admin() {
        let pool = testing::pool();
        let user = testing::user(&pool, "boss");
        let repo = UserRepository::new(pool);
        assert!(!repo.has_admins().unwrap());
        assert!(repo.set_admin(user.id, true).unwrap().is_admin);
        assert!(repo.has_admins().unwrap());
        assert!(matches!(repo.set_admin(999, true), Err(RepoError::NotFound(_))));
    }

    #[test]
    fn test_profile_without_ratings() {
        let pool = testing::pool();
        testing::user(&pool, "quiet");
        let repo = UserRepository::new(pool);
        let profile = repo.profile("QUIET", false).unwrap().unwrap();
        assert_eq!(profile.rating_count, 0);
        assert_eq!(profile.comment_count, 0);
        assert_eq!(profile.average_score, None);
        assert!(repo.profile("nobody", false).unwrap().is_none());
    }

    #[test]
    fn test_profile_counts_ratings() {
        let pool = testing::pool();
        let user = testing::user(&pool, "critic");
        let ratings = RatingRepository::new(pool.clone());
        let first = testing::release(&pool, "Low", "Things We Lost in the Fire");
        let second = testing::release(&pool, "Low", "Double Negative");
        let hidden = testing::release(&pool, "Fixture", "Hidden");
        ratings
            .upsert(user.id, first.id, Score::new(9).unwrap(), Some("haunting".into()))
            .unwrap();
        ratings
            .upsert(user.id, second.id, Score::new(6).unwrap(), None)
            .unwrap();
        ratings
            .upsert(user.id, hidden.id, Score::new(1).unwrap(), Some("fixture".into()))
            .unwrap();
        {
            let mut conn = pool.get().unwrap();
            diesel::update(releases::table.filter(releases::id.eq(hidden.id)))
                .set(releases::is_test_data.eq(true))
                .execute(&mut conn)
                .unwrap();
        }
        let repo = UserRepository::new(pool);

        let public = repo.profile("critic", false).unwrap().unwrap();
        assert_eq!(public.rating_count, 2);
        assert_eq!(public.comment_count, 1);
        assert_eq!(public.average_score, Some(7.5));

        let admin_view = repo.profile("critic", true).unwrap().unwrap();
        assert_eq!(admin_view.rating_count, 3);
        assert_eq!(admin_view.comment_count, 2);
        assert_eq!(admin_view.average_score, Some(5.3));
    }
}
