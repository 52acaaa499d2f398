//! Ratings (with their comments) and comment reactions.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Bool, Integer, Nullable, Text, Timestamp};

use super::{RepoError, now, parse_column};
use crate::db::DbPool;
use crate::db::schema::{comment_reactions, ratings, releases, reports};
use crate::models::rating::{
    CommentSort, CommentView, RatingSaved, ReactionTally, UserRatingView, normalize_comment,
};
use crate::models::{Rating, ReactionKind, ReportStatus, Resolution, Score, ValidationError};

/// Database row representation for ratings.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = ratings)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct RatingRow {
    pub id: i32,
    pub user_id: i32,
    pub release_id: i32,
    pub score: i32,
    pub text: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<RatingRow> for Rating {
    fn from(row: RatingRow) -> Self {
        Rating {
            id: row.id,
            user_id: row.user_id,
            release_id: row.release_id,
            score: row.score,
            text: row.text,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = ratings)]
struct NewRating<'a> {
    user_id: i32,
    release_id: i32,
    score: i32,
    text: Option<&'a str>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = comment_reactions)]
struct NewReaction {
    rating_id: i32,
    user_id: i32,
    kind: &'static str,
    created_at: NaiveDateTime,
}

#[derive(QueryableByName)]
struct CommentRow {
    #[diesel(sql_type = Integer)]
    id: i32,
    #[diesel(sql_type = Integer)]
    release_id: i32,
    #[diesel(sql_type = Integer)]
    author_id: i32,
    #[diesel(sql_type = Nullable<Text>)]
    author_nickname: Option<String>,
    #[diesel(sql_type = Integer)]
    score: i32,
    #[diesel(sql_type = Text)]
    text: String,
    #[diesel(sql_type = Timestamp)]
    created_at: NaiveDateTime,
    #[diesel(sql_type = Timestamp)]
    updated_at: NaiveDateTime,
    #[diesel(sql_type = BigInt)]
    likes: i64,
    #[diesel(sql_type = BigInt)]
    dislikes: i64,
    #[diesel(sql_type = Nullable<Text>)]
    my_reaction: Option<String>,
}

impl TryFrom<CommentRow> for CommentView {
    type Error = RepoError;

    fn try_from(row: CommentRow) -> Result<Self, Self::Error> {
        let my_reaction = row
            .my_reaction
            .as_deref()
            .map(|kind| parse_column::<ReactionKind>("kind", kind))
            .transpose()?;
        Ok(CommentView {
            id: row.id,
            release_id: row.release_id,
            author_id: row.author_id,
            author_nickname: row.author_nickname,
            score: row.score,
            text: row.text,
            created_at: row.created_at,
            updated_at: row.updated_at,
            reactions: ReactionTally {
                likes: row.likes,
                dislikes: row.dislikes,
                my_reaction,
            },
        })
    }
}

#[derive(QueryableByName)]
struct UserRatingRow {
    #[diesel(sql_type = Integer)]
    id: i32,
    #[diesel(sql_type = Integer)]
    release_id: i32,
    #[diesel(sql_type = Text)]
    release_title: String,
    #[diesel(sql_type = Text)]
    artist_name: String,
    #[diesel(sql_type = Nullable<Text>)]
    cover_url: Option<String>,
    #[diesel(sql_type = Integer)]
    score: i32,
    #[diesel(sql_type = Nullable<Text>)]
    text: Option<String>,
    #[diesel(sql_type = Timestamp)]
    created_at: NaiveDateTime,
    #[diesel(sql_type = Timestamp)]
    updated_at: NaiveDateTime,
}

impl From<UserRatingRow> for UserRatingView {
    fn from(row: UserRatingRow) -> Self {
        UserRatingView {
            id: row.id,
            release_id: row.release_id,
            release_title: row.release_title,
            artist_name: row.artist_name,
            cover_url: row.cover_url,
            score: row.score,
            text: row.text,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub(super) fn load_rating(
    conn: &mut SqliteConnection,
    rating_id: i32,
) -> Result<Rating, RepoError> {
    ratings::table
        .filter(ratings::id.eq(rating_id))
        .select(RatingRow::as_select())
        .first(conn)
        .optional()?
        .map(Rating::from)
        .ok_or_else(|| RepoError::NotFound(format!("Comment {rating_id}")))
}

/// Strip a comment down to its score.
///
/// Reactions on the text are deleted and every pending report on it is
/// closed with `resolution`. Returns the number of reports closed.
pub(super) fn clear_comment(
    conn: &mut SqliteConnection,
    rating_id: i32,
    resolution: Resolution,
    moderator_id: Option<i32>,
) -> Result<usize, RepoError> {
    let now = now();
    diesel::update(ratings::table.filter(ratings::id.eq(rating_id)))
        .set((ratings::text.eq(None::<String>), ratings::updated_at.eq(now)))
        .execute(conn)?;

    diesel::delete(comment_reactions::table.filter(comment_reactions::rating_id.eq(rating_id)))
        .execute(conn)?;

    let closed = diesel::update(
        reports::table
            .filter(reports::rating_id.eq(rating_id))
            .filter(reports::status.eq(ReportStatus::Pending.as_str())),
    )
    .set((
        reports::status.eq(ReportStatus::Resolved.as_str()),
        reports::resolution.eq(resolution.as_str()),
        reports::resolved_by.eq(moderator_id),
        reports::resolved_at.eq(now),
    ))
    .execute(conn)?;

    Ok(closed)
}

fn tally(
    conn: &mut SqliteConnection,
    rating_id: i32,
    viewer_id: Option<i32>,
) -> Result<ReactionTally, RepoError> {
    let count_kind = |conn: &mut SqliteConnection, kind: ReactionKind| -> QueryResult<i64> {
        comment_reactions::table
            .filter(comment_reactions::rating_id.eq(rating_id))
            .filter(comment_reactions::kind.eq(kind.as_str()))
            .count()
            .get_result(conn)
    };
    let likes = count_kind(conn, ReactionKind::Like)?;
    let dislikes = count_kind(conn, ReactionKind::Dislike)?;

    let my_reaction = match viewer_id {
        Some(user_id) => comment_reactions::table
            .filter(comment_reactions::rating_id.eq(rating_id))
            .filter(comment_reactions::user_id.eq(user_id))
            .select(comment_reactions::kind)
            .first::<String>(conn)
            .optional()?
            .map(|kind| parse_column::<ReactionKind>("kind", &kind))
            .transpose()?,
        None => None,
    };

    Ok(ReactionTally {
        likes,
        dislikes,
        my_reaction,
    })
}

/// Repository for rating and comment operations.
#[derive(Clone)]
pub struct RatingRepository {
    pool: DbPool,
}

impl RatingRepository {
    /// Create a new rating repository.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Find a rating by ID.
    pub fn find_by_id(&self, rating_id: i32) -> Result<Option<Rating>, RepoError> {
        let mut conn = self.pool.get()?;

        let result = ratings::table
            .filter(ratings::id.eq(rating_id))
            .select(RatingRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(result.map(Rating::from))
    }

    /// The user's rating of a release, if any.
    pub fn find_for(&self, user_id: i32, release_id: i32) -> Result<Option<Rating>, RepoError> {
        let mut conn = self.pool.get()?;

        let result = ratings::table
            .filter(ratings::user_id.eq(user_id))
            .filter(ratings::release_id.eq(release_id))
            .select(RatingRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(result.map(Rating::from))
    }

    /// Create or replace the user's rating of a release.
    ///
    /// A second submission for the same release updates the existing row;
    /// the `(user_id, release_id)` unique key makes this hold under
    /// concurrent submissions too. Clearing the text of an existing comment
    /// drops its reactions and withdraws pending reports against it.
    pub fn upsert(
        &self,
        user_id: i32,
        release_id: i32,
        score: Score,
        text: Option<String>,
    ) -> Result<RatingSaved, RepoError> {
        let text = normalize_comment(text)?;
        let mut conn = self.pool.get()?;

        conn.transaction(|conn| {
            let release_exists: i64 = releases::table
                .filter(releases::id.eq(release_id))
                .count()
                .get_result(conn)?;
            if release_exists == 0 {
                return Err(RepoError::NotFound(format!("Release {release_id}")));
            }

            let previous = ratings::table
                .filter(ratings::user_id.eq(user_id))
                .filter(ratings::release_id.eq(release_id))
                .select(RatingRow::as_select())
                .first(conn)
                .optional()?
                .map(Rating::from);

            let now = now();
            let row = diesel::insert_into(ratings::table)
                .values(&NewRating {
                    user_id,
                    release_id,
                    score: score.value(),
                    text: text.as_deref(),
                    created_at: now,
                    updated_at: now,
                })
                .on_conflict((ratings::user_id, ratings::release_id))
                .do_update()
                .set((
                    ratings::score.eq(score.value()),
                    ratings::text.eq(text.as_deref()),
                    ratings::updated_at.eq(now),
                ))
                .returning(RatingRow::as_returning())
                .get_result(conn)?;
            let rating = Rating::from(row);

            if let Some(previous) = &previous {
                if previous.is_comment() && !rating.is_comment() {
                    let withdrawn = clear_comment(conn, rating.id, Resolution::Withdrawn, None)?;
                    tracing::debug!(rating_id = rating.id, withdrawn, "Comment text cleared by author");
                }
            }

            Ok(RatingSaved {
                rating,
                created: previous.is_none(),
            })
        })
    }

    /// Delete a rating together with its reactions and reports.
    pub fn delete(&self, rating_id: i32) -> Result<bool, RepoError> {
        let mut conn = self.pool.get()?;

        let deleted = diesel::delete(ratings::table.filter(ratings::id.eq(rating_id)))
            .execute(&mut conn)?;

        Ok(deleted > 0)
    }

    /// Comments under a release with reaction tallies for `viewer_id`.
    pub fn comments_for_release(
        &self,
        release_id: i32,
        viewer_id: Option<i32>,
        sort: CommentSort,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<CommentView>, RepoError> {
        let mut conn = self.pool.get()?;

        let order = match sort {
            CommentSort::Newest => "rt.created_at DESC, rt.id DESC",
            CommentSort::Top => "(likes - dislikes) DESC, likes DESC, rt.created_at DESC, rt.id DESC",
        };
        let sql = format!(
            r#"
            SELECT rt.id AS id,
                   rt.release_id AS release_id,
                   rt.user_id AS author_id,
                   u.nickname AS author_nickname,
                   rt.score AS score,
                   rt.text AS text,
                   rt.created_at AS created_at,
                   rt.updated_at AS updated_at,
                   COALESCE(SUM(CASE WHEN cr.kind = 'like' THEN 1 ELSE 0 END), 0) AS likes,
                   COALESCE(SUM(CASE WHEN cr.kind = 'dislike' THEN 1 ELSE 0 END), 0) AS dislikes,
                   MAX(CASE WHEN cr.user_id = ? THEN cr.kind END) AS my_reaction
            FROM ratings rt
            JOIN users u ON u.id = rt.user_id
            LEFT JOIN comment_reactions cr ON cr.rating_id = rt.id
            WHERE rt.release_id = ? AND rt.text IS NOT NULL AND rt.text <> ''
            GROUP BY rt.id
            ORDER BY {order}
            LIMIT ? OFFSET ?
            "#
        );

        let rows = diesel::sql_query(sql)
            .bind::<Nullable<Integer>, _>(viewer_id)
            .bind::<Integer, _>(release_id)
            .bind::<BigInt, _>(limit)
            .bind::<BigInt, _>(offset)
            .load::<CommentRow>(&mut conn)?;

        rows.into_iter().map(CommentView::try_from).collect()
    }

    /// A user's ratings, most recently changed first.
    pub fn by_user(
        &self,
        user_id: i32,
        include_test_data: bool,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<UserRatingView>, RepoError> {
        let mut conn = self.pool.get()?;

        let rows = diesel::sql_query(
            r#"
            SELECT rt.id AS id,
                   rt.release_id AS release_id,
                   r.title AS release_title,
                   a.name AS artist_name,
                   r.cover_url AS cover_url,
                   rt.score AS score,
                   rt.text AS text,
                   rt.created_at AS created_at,
                   rt.updated_at AS updated_at
            FROM ratings rt
            JOIN releases r ON r.id = rt.release_id
            JOIN artists a ON a.id = r.artist_id
            WHERE rt.user_id = ? AND (? OR r.is_test_data = 0)
            ORDER BY rt.updated_at DESC, rt.id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind::<Integer, _>(user_id)
        .bind::<Bool, _>(include_test_data)
        .bind::<BigInt, _>(limit)
        .bind::<BigInt, _>(offset)
        .load::<UserRatingRow>(&mut conn)?;

        Ok(rows.into_iter().map(UserRatingView::from).collect())
    }
}

/// Repository for like/dislike reactions on comments.
#[derive(Clone)]
pub struct ReactionRepository {
    pool: DbPool,
}

impl ReactionRepository {
    /// Create a new reaction repository.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Set the user's reaction on a comment, replacing any previous one.
    pub fn set(
        &self,
        user_id: i32,
        rating_id: i32,
        kind: ReactionKind,
    ) -> Result<ReactionTally, RepoError> {
        let mut conn = self.pool.get()?;

        conn.transaction(|conn| {
            let rating = load_rating(conn, rating_id)?;
            if !rating.is_comment() {
                return Err(ValidationError::new("comment", "only comments with text can be reacted to").into());
            }
            if rating.user_id == user_id {
                return Err(ValidationError::new("comment", "you cannot react to your own comment").into());
            }

            diesel::insert_into(comment_reactions::table)
                .values(&NewReaction {
                    rating_id,
                    user_id,
                    kind: kind.as_str(),
                    created_at: now(),
                })
                .on_conflict((comment_reactions::rating_id, comment_reactions::user_id))
                .do_update()
                .set(comment_reactions::kind.eq(kind.as_str()))
                .execute(conn)?;

            tally(conn, rating_id, Some(user_id))
        })
    }

    /// Remove the user's reaction on a comment, if any.
    pub fn remove(&self, user_id: i32, rating_id: i32) -> Result<ReactionTally, RepoError> {
        let mut conn = self.pool.get()?;

        conn.transaction(|conn| {
            load_rating(conn, rating_id)?;
            diesel::delete(
                comment_reactions::table
                    .filter(comment_reactions::rating_id.eq(rating_id))
                    .filter(comment_reactions::user_id.eq(user_id)),
            )
            .execute(conn)?;

            tally(conn, rating_id, Some(user_id))
        })
    }

    /// Current tallies on a comment.
    pub fn tally(&self, rating_id: i32, viewer_id: Option<i32>) -> Result<ReactionTally, RepoError> {
        let mut conn = self.pool.get()?;
        tally(&mut conn, rating_id, viewer_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::{ReportRepository, testing};
    use crate::models::report::ReportReason;

    fn score(value: i32) -> Score {
        Score::new(value).unwrap()
    }

    #[test]
    fn test_second_rating_updates_instead_of_duplicating() {
        let pool = testing::pool();
        let release = testing::release(&pool, "Radiohead", "In Rainbows");
        let user = testing::user(&pool, "repeat");
        let repo = RatingRepository::new(pool.clone());

        let first = repo.upsert(user.id, release.id, score(6), None).unwrap();
        assert!(first.created);
        let second = repo
            .upsert(user.id, release.id, score(9), Some("grew on me".into()))
            .unwrap();
        assert!(!second.created);
        assert_eq!(second.rating.id, first.rating.id);
        assert_eq!(second.rating.score, 9);

        let mut conn = pool.get().unwrap();
        let count: i64 = ratings::table
            .filter(ratings::release_id.eq(release.id))
            .count()
            .get_result(&mut conn)
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_rating_unknown_release() {
        let pool = testing::pool();
        let user = testing::user(&pool, "lost");
        let repo = RatingRepository::new(pool);
        assert!(matches!(
            repo.upsert(user.id, 404, score(5), None),
            Err(RepoError::NotFound(_))
        ));
    }

    #[test]
    fn test_rating_text_too_long() {
        let pool = testing::pool();
        let release = testing::release(&pool, "A", "B");
        let user = testing::user(&pool, "verbose");
        let repo = RatingRepository::new(pool);
        let text = "a".repeat(crate::models::rating::MAX_COMMENT_LEN + 1);
        assert!(matches!(
            repo.upsert(user.id, release.id, score(5), Some(text)),
            Err(RepoError::Validation(_))
        ));
    }

    #[test]
    fn test_reactions_one_per_user() {
        let pool = testing::pool();
        let release = testing::release(&pool, "Aphex Twin", "Drukqs");
        let author = testing::user(&pool, "author");
        let fan = testing::user(&pool, "fan");
        let ratings = RatingRepository::new(pool.clone());
        let comment = ratings
            .upsert(author.id, release.id, score(8), Some("weird and great".into()))
            .unwrap()
            .rating;

        let reactions = ReactionRepository::new(pool);
        let tally = reactions.set(fan.id, comment.id, ReactionKind::Like).unwrap();
        assert_eq!((tally.likes, tally.dislikes), (1, 0));
        let tally = reactions.set(fan.id, comment.id, ReactionKind::Dislike).unwrap();
        assert_eq!((tally.likes, tally.dislikes), (0, 1));
        assert_eq!(tally.my_reaction, Some(ReactionKind::Dislike));

        let tally = reactions.remove(fan.id, comment.id).unwrap();
        assert_eq!((tally.likes, tally.dislikes, tally.my_reaction), (0, 0, None));
    }

    #[test]
    fn test_cannot_react_to_own_or_textless() {
        let pool = testing::pool();
        let release = testing::release(&pool, "X", "Y");
        let author = testing::user(&pool, "selfie");
        let other = testing::user(&pool, "other");
        let ratings = RatingRepository::new(pool.clone());
        let reactions = ReactionRepository::new(pool);

        let comment = ratings
            .upsert(author.id, release.id, score(7), Some("mine".into()))
            .unwrap()
            .rating;
        assert!(matches!(
            reactions.set(author.id, comment.id, ReactionKind::Like),
            Err(RepoError::Validation(_))
        ));

        let bare = ratings.upsert(other.id, release.id, score(3), None).unwrap().rating;
        assert!(matches!(
            reactions.set(author.id, bare.id, ReactionKind::Like),
            Err(RepoError::Validation(_))
        ));
    }

    #[test]
    fn test_comments_listing_with_tallies() {
        let pool = testing::pool();
        let release = testing::release(&pool, "Massive Attack", "Mezzanine");
        let a = testing::user(&pool, "first");
        let b = testing::user(&pool, "second");
        let c = testing::user(&pool, "silent");
        let ratings = RatingRepository::new(pool.clone());
        let ca = ratings.upsert(a.id, release.id, score(9), Some("dark".into())).unwrap().rating;
        let cb = ratings.upsert(b.id, release.id, score(6), Some("meh".into())).unwrap().rating;
        ratings.upsert(c.id, release.id, score(5), None).unwrap();

        let reactions = ReactionRepository::new(pool);
        reactions.set(b.id, ca.id, ReactionKind::Like).unwrap();
        reactions.set(c.id, ca.id, ReactionKind::Like).unwrap();
        reactions.set(a.id, cb.id, ReactionKind::Dislike).unwrap();

        let top = ratings
            .comments_for_release(release.id, Some(c.id), CommentSort::Top, 0, 10)
            .unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].id, ca.id);
        assert_eq!(top[0].reactions.likes, 2);
        assert_eq!(top[0].reactions.my_reaction, Some(ReactionKind::Like));
        assert_eq!(top[1].reactions.dislikes, 1);
        assert_eq!(top[1].reactions.my_reaction, None);
        assert_eq!(top[0].author_nickname.as_deref(), Some("first"));

        let anonymous = ratings
            .comments_for_release(release.id, None, CommentSort::Newest, 0, 10)
            .unwrap();
        assert!(anonymous.iter().all(|c| c.reactions.my_reaction.is_none()));
    }

    #[test]
    fn test_comments_newest_first() {
        let pool = testing::pool();
        let release = testing::release(&pool, "Cocteau Twins", "Heaven or Las Vegas");
        let early = testing::user(&pool, "early");
        let late = testing::user(&pool, "late");
        let paged = testing::user(&pool, "paged");
        let ratings = RatingRepository::new(pool.clone());
        // Inserted out of chronological order so ids disagree with timestamps.
        let newest = ratings.upsert(late.id, release.id, score(8), Some("new".into())).unwrap().rating;
        let oldest = ratings.upsert(early.id, release.id, score(7), Some("old".into())).unwrap().rating;
        let middle = ratings.upsert(paged.id, release.id, score(6), Some("mid".into())).unwrap().rating;
        {
            let mut conn = pool.get().unwrap();
            for (id, year) in [(oldest.id, 2019), (middle.id, 2021), (newest.id, 2024)] {
                let at = chrono::NaiveDate::from_ymd_opt(year, 1, 1)
                    .unwrap()
                    .and_hms_opt(12, 0, 0)
                    .unwrap();
                diesel::update(ratings::table.filter(ratings::id.eq(id)))
                    .set(ratings::created_at.eq(at))
                    .execute(&mut conn)
                    .unwrap();
            }
        }

        let listed: Vec<i32> = ratings
            .comments_for_release(release.id, None, CommentSort::Newest, 0, 10)
            .unwrap()
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(listed, vec![newest.id, middle.id, oldest.id]);

        let second_page = ratings
            .comments_for_release(release.id, None, CommentSort::Newest, 1, 1)
            .unwrap();
        assert_eq!(second_page.len(), 1);
        assert_eq!(second_page[0].id, middle.id);
    }

    #[test]
    fn test_delete_comment_cascades_reactions_and_reports() {
        let pool = testing::pool();
        let release = testing::release(&pool, "Tool", "Lateralus");
        let author = testing::user(&pool, "poster");
        let reader = testing::user(&pool, "reader");
        let ratings = RatingRepository::new(pool.clone());
        let comment = ratings
            .upsert(author.id, release.id, score(2), Some("overrated".into()))
            .unwrap()
            .rating;
        ReactionRepository::new(pool.clone())
            .set(reader.id, comment.id, ReactionKind::Dislike)
            .unwrap();
        ReportRepository::new(pool.clone())
            .create(reader.id, comment.id, &ReportReason::parse("trolling").unwrap())
            .unwrap();

        assert!(ratings.delete(comment.id).unwrap());

        let mut conn = pool.get().unwrap();
        let reactions: i64 = comment_reactions::table.count().get_result(&mut conn).unwrap();
        let report_rows: i64 = reports::table.count().get_result(&mut conn).unwrap();
        assert_eq!(reactions, 0);
        assert_eq!(report_rows, 0);
    }

    #[test]
    fn test_clearing_text_withdraws_reports_and_reactions() {
        let pool = testing::pool();
        let release = testing::release(&pool, "Nirvana", "Nevermind");
        let author = testing::user(&pool, "editor");
        let reader = testing::user(&pool, "watcher");
        let ratings = RatingRepository::new(pool.clone());
        let comment = ratings
            .upsert(author.id, release.id, score(4), Some("hot take".into()))
            .unwrap()
            .rating;
        ReactionRepository::new(pool.clone())
            .set(reader.id, comment.id, ReactionKind::Like)
            .unwrap();
        let reports = ReportRepository::new(pool.clone());
        let report = reports
            .create(reader.id, comment.id, &ReportReason::parse("offensive").unwrap())
            .unwrap();

        let saved = ratings.upsert(author.id, release.id, score(4), Some("  ".into())).unwrap();
        assert_eq!(saved.rating.text, None);

        let report = reports.find_by_id(report.id).unwrap().unwrap();
        assert_eq!(report.status, ReportStatus::Resolved);
        assert_eq!(report.resolution, Some(Resolution::Withdrawn));
        let tally = ReactionRepository::new(pool).tally(comment.id, None).unwrap();
        assert_eq!(tally.likes, 0);
    }

    #[test]
    fn test_by_user_lists_release_context() {
        let pool = testing::pool();
        let release = testing::release(&pool, "Daft Punk", "Discovery");
        let user = testing::user(&pool, "robot");
        let ratings = RatingRepository::new(pool);
        ratings.upsert(user.id, release.id, score(10), None).unwrap();

        let history = ratings.by_user(user.id, false, 0, 10).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].release_title, "Discovery");
        assert_eq!(history[0].artist_name, "Daft Punk");
    }
}
