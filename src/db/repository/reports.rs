//! Database repository for comment reports and their moderation.

use chrono::{Duration, NaiveDateTime};
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Integer, Nullable, Text};

use super::ratings::{clear_comment, load_rating};
use super::{RepoError, now, parse_column};
use crate::db::DbPool;
use crate::db::schema::{ratings, reports};
use crate::models::report::{ReportReason, ReportView, REPORTS_PER_HOUR};
use crate::models::{
    ModerationAction, ModerationOutcome, Report, ReportStatus, Resolution, ValidationError,
};

/// Database row representation for reports.
#[derive(Debug, Clone, Queryable, QueryableByName, Selectable)]
#[diesel(table_name = reports)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ReportRow {
    pub id: i32,
    pub rating_id: i32,
    pub reporter_id: i32,
    pub reason: String,
    pub status: String,
    pub resolution: Option<String>,
    pub resolved_by: Option<i32>,
    pub created_at: NaiveDateTime,
    pub resolved_at: Option<NaiveDateTime>,
}

impl TryFrom<ReportRow> for Report {
    type Error = RepoError;

    fn try_from(row: ReportRow) -> Result<Self, Self::Error> {
        Ok(Report {
            id: row.id,
            rating_id: row.rating_id,
            reporter_id: row.reporter_id,
            reason: row.reason,
            status: parse_column("status", &row.status)?,
            resolution: row
                .resolution
                .as_deref()
                .map(|value| parse_column("resolution", value))
                .transpose()?,
            resolved_by: row.resolved_by,
            created_at: row.created_at,
            resolved_at: row.resolved_at,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = reports)]
struct NewReport<'a> {
    rating_id: i32,
    reporter_id: i32,
    reason: &'a str,
    status: &'static str,
    created_at: NaiveDateTime,
}

#[derive(QueryableByName)]
struct ReportViewRow {
    #[diesel(embed)]
    report: ReportRow,
    #[diesel(sql_type = Nullable<Text>)]
    reporter_nickname: Option<String>,
    #[diesel(sql_type = Integer)]
    release_id: i32,
    #[diesel(sql_type = Integer)]
    author_id: i32,
    #[diesel(sql_type = Nullable<Text>)]
    author_nickname: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    comment_text: Option<String>,
    #[diesel(sql_type = Integer)]
    comment_score: i32,
}

impl TryFrom<ReportViewRow> for ReportView {
    type Error = RepoError;

    fn try_from(row: ReportViewRow) -> Result<Self, Self::Error> {
        Ok(ReportView {
            report: Report::try_from(row.report)?,
            reporter_nickname: row.reporter_nickname,
            release_id: row.release_id,
            author_id: row.author_id,
            author_nickname: row.author_nickname,
            comment_text: row.comment_text,
            comment_score: row.comment_score,
        })
    }
}

/// Repository for report database operations.
#[derive(Clone)]
pub struct ReportRepository {
    pool: DbPool,
}

impl ReportRepository {
    /// Create a new report repository.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Find a report by ID.
    pub fn find_by_id(&self, report_id: i32) -> Result<Option<Report>, RepoError> {
        let mut conn = self.pool.get()?;

        let result = reports::table
            .filter(reports::id.eq(report_id))
            .select(ReportRow::as_select())
            .first(&mut conn)
            .optional()?;

        result.map(Report::try_from).transpose()
    }

    /// File a report against a comment.
    ///
    /// A user may hold one pending report per comment, may not report their
    /// own comment, and is limited to `REPORTS_PER_HOUR` reports in any
    /// rolling hour.
    pub fn create(
        &self,
        reporter_id: i32,
        rating_id: i32,
        reason: &ReportReason,
    ) -> Result<Report, RepoError> {
        let mut conn = self.pool.get()?;

        conn.transaction(|conn| {
            let rating = load_rating(conn, rating_id)?;
            if !rating.is_comment() {
                return Err(RepoError::NotFound(format!("Comment {rating_id}")));
            }
            if rating.user_id == reporter_id {
                return Err(ValidationError::new("comment", "you cannot report your own comment").into());
            }

            let pending: i64 = reports::table
                .filter(reports::rating_id.eq(rating_id))
                .filter(reports::reporter_id.eq(reporter_id))
                .filter(reports::status.eq(ReportStatus::Pending.as_str()))
                .count()
                .get_result(conn)?;
            if pending > 0 {
                return Err(RepoError::Conflict(
                    "You have already reported this comment".into(),
                ));
            }

            let now = now();
            let recent: i64 = reports::table
                .filter(reports::reporter_id.eq(reporter_id))
                .filter(reports::created_at.gt(now - Duration::hours(1)))
                .count()
                .get_result(conn)?;
            if recent >= REPORTS_PER_HOUR {
                return Err(RepoError::RateLimited(format!(
                    "At most {REPORTS_PER_HOUR} reports per hour"
                )));
            }

            let row = diesel::insert_into(reports::table)
                .values(&NewReport {
                    rating_id,
                    reporter_id,
                    reason: reason.as_str(),
                    status: ReportStatus::Pending.as_str(),
                    created_at: now,
                })
                .returning(ReportRow::as_returning())
                .get_result(conn)?;

            tracing::info!(report_id = row.id, rating_id, reporter_id, "Comment reported");
            Report::try_from(row)
        })
    }

    /// The moderation queue, oldest first.
    pub fn list(
        &self,
        status: Option<ReportStatus>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<ReportView>, RepoError> {
        let mut conn = self.pool.get()?;

        let rows = diesel::sql_query(
            r#"
            SELECT rp.id AS id,
                   rp.rating_id AS rating_id,
                   rp.reporter_id AS reporter_id,
                   rp.reason AS reason,
                   rp.status AS status,
                   rp.resolution AS resolution,
                   rp.resolved_by AS resolved_by,
                   rp.created_at AS created_at,
                   rp.resolved_at AS resolved_at,
                   reporter.nickname AS reporter_nickname,
                   rt.release_id AS release_id,
                   rt.user_id AS author_id,
                   author.nickname AS author_nickname,
                   rt.text AS comment_text,
                   rt.score AS comment_score
            FROM reports rp
            JOIN ratings rt ON rt.id = rp.rating_id
            JOIN users reporter ON reporter.id = rp.reporter_id
            JOIN users author ON author.id = rt.user_id
            WHERE (? IS NULL OR rp.status = ?)
            ORDER BY rp.created_at ASC, rp.id ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind::<Nullable<Text>, _>(status.map(|s| s.as_str()))
        .bind::<Nullable<Text>, _>(status.map(|s| s.as_str()))
        .bind::<BigInt, _>(limit)
        .bind::<BigInt, _>(offset)
        .load::<ReportViewRow>(&mut conn)?;

        rows.into_iter().map(ReportView::try_from).collect()
    }

    /// Number of reports awaiting a moderator.
    pub fn pending_count(&self) -> Result<i64, RepoError> {
        let mut conn = self.pool.get()?;

        let count = reports::table
            .filter(reports::status.eq(ReportStatus::Pending.as_str()))
            .count()
            .get_result(&mut conn)?;

        Ok(count)
    }

    /// Act on a pending report.
    ///
    /// `remove_text` and `delete_comment` settle every other pending report
    /// on the same comment as well.
    pub fn resolve(
        &self,
        report_id: i32,
        moderator_id: i32,
        action: ModerationAction,
    ) -> Result<ModerationOutcome, RepoError> {
        let mut conn = self.pool.get()?;

        let outcome = conn.transaction(|conn| {
            let report: Report = reports::table
                .filter(reports::id.eq(report_id))
                .select(ReportRow::as_select())
                .first(conn)
                .optional()?
                .ok_or_else(|| RepoError::NotFound(format!("Report {report_id}")))?
                .try_into()?;
            if report.status != ReportStatus::Pending {
                return Err(RepoError::Conflict(format!(
                    "Report {report_id} is already resolved"
                )));
            }

            let resolution = action.resolution();
            let reports_closed = match action {
                ModerationAction::Dismiss => diesel::update(
                    reports::table.filter(reports::id.eq(report_id)),
                )
                .set((
                    reports::status.eq(ReportStatus::Resolved.as_str()),
                    reports::resolution.eq(Resolution::Dismissed.as_str()),
                    reports::resolved_by.eq(moderator_id),
                    reports::resolved_at.eq(now()),
                ))
                .execute(conn)?,
                ModerationAction::RemoveText => {
                    clear_comment(conn, report.rating_id, resolution, Some(moderator_id))?
                }
                ModerationAction::DeleteComment => {
                    let pending: i64 = reports::table
                        .filter(reports::rating_id.eq(report.rating_id))
                        .filter(reports::status.eq(ReportStatus::Pending.as_str()))
                        .count()
                        .get_result(conn)?;
                    diesel::delete(ratings::table.filter(ratings::id.eq(report.rating_id)))
                        .execute(conn)?;
                    usize::try_from(pending).unwrap_or_default()
                }
            };

            Ok(ModerationOutcome {
                report_id,
                rating_id: report.rating_id,
                resolution,
                reports_closed,
            })
        })?;

        tracing::info!(
            report_id,
            moderator_id,
            rating_id = outcome.rating_id,
            resolution = %outcome.resolution,
            reports_closed = outcome.reports_closed,
            "Report resolved"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::{RatingRepository, testing};
    use crate::models::Score;

    struct Fixture {
        pool: DbPool,
        author: i32,
        reporter: i32,
        rating_id: i32,
    }

    fn fixture() -> Fixture {
        let pool = testing::pool();
        let release = testing::release(&pool, "Linkin Park", "Meteora");
        let author = testing::user(&pool, "writer").id;
        let reporter = testing::user(&pool, "snitch").id;
        let rating_id = RatingRepository::new(pool.clone())
            .upsert(author, release.id, Score::new(1).unwrap(), Some("rubbish".into()))
            .unwrap()
            .rating
            .id;
        Fixture {
            pool,
            author,
            reporter,
            rating_id,
        }
    }

    fn reason() -> ReportReason {
        ReportReason::parse("insulting").unwrap()
    }

    #[test]
    fn test_report_rules() {
        let f = fixture();
        let repo = ReportRepository::new(f.pool.clone());

        assert!(matches!(
            repo.create(f.author, f.rating_id, &reason()),
            Err(RepoError::Validation(_))
        ));
        assert!(matches!(
            repo.create(f.reporter, 999, &reason()),
            Err(RepoError::NotFound(_))
        ));

        let report = repo.create(f.reporter, f.rating_id, &reason()).unwrap();
        assert_eq!(report.status, ReportStatus::Pending);
        assert!(matches!(
            repo.create(f.reporter, f.rating_id, &reason()),
            Err(RepoError::Conflict(_))
        ));
        assert_eq!(repo.pending_count().unwrap(), 1);
    }

    #[test]
    fn test_hourly_rate_limit() {
        let f = fixture();
        let repo = ReportRepository::new(f.pool.clone());
        let mut conn = f.pool.get().unwrap();
        for _ in 0..REPORTS_PER_HOUR {
            diesel::insert_into(reports::table)
                .values(&NewReport {
                    rating_id: f.rating_id,
                    reporter_id: f.reporter,
                    reason: "old",
                    status: ReportStatus::Resolved.as_str(),
                    created_at: now(),
                })
                .execute(&mut conn)
                .unwrap();
        }
        drop(conn);

        assert!(matches!(
            repo.create(f.reporter, f.rating_id, &reason()),
            Err(RepoError::RateLimited(_))
        ));
    }

    #[test]
    fn test_dismiss_keeps_comment() {
        let f = fixture();
        let repo = ReportRepository::new(f.pool.clone());
        let moderator = testing::user(&f.pool, "mod").id;
        let report = repo.create(f.reporter, f.rating_id, &reason()).unwrap();

        let outcome = repo
            .resolve(report.id, moderator, ModerationAction::Dismiss)
            .unwrap();
        assert_eq!(outcome.resolution, Resolution::Dismissed);
        assert_eq!(outcome.reports_closed, 1);

        let report = repo.find_by_id(report.id).unwrap().unwrap();
        assert_eq!(report.resolved_by, Some(moderator));
        let rating = RatingRepository::new(f.pool).find_by_id(f.rating_id).unwrap().unwrap();
        assert!(rating.is_comment());

        assert!(matches!(
            repo.resolve(report.id, moderator, ModerationAction::Dismiss),
            Err(RepoError::Conflict(_))
        ));
    }

    #[test]
    fn test_remove_text_closes_all_pending() {
        let f = fixture();
        let repo = ReportRepository::new(f.pool.clone());
        let second = testing::user(&f.pool, "another").id;
        let first = repo.create(f.reporter, f.rating_id, &reason()).unwrap();
        let other = repo.create(second, f.rating_id, &reason()).unwrap();

        let outcome = repo
            .resolve(first.id, second, ModerationAction::RemoveText)
            .unwrap();
        assert_eq!(outcome.reports_closed, 2);

        let other = repo.find_by_id(other.id).unwrap().unwrap();
        assert_eq!(other.resolution, Some(Resolution::TextRemoved));
        let rating = RatingRepository::new(f.pool).find_by_id(f.rating_id).unwrap().unwrap();
        assert_eq!(rating.text, None);
        assert_eq!(rating.score, 1);
    }

    #[test]
    fn test_delete_comment_removes_rating() {
        let f = fixture();
        let repo = ReportRepository::new(f.pool.clone());
        let report = repo.create(f.reporter, f.rating_id, &reason()).unwrap();

        let outcome = repo
            .resolve(report.id, f.reporter, ModerationAction::DeleteComment)
            .unwrap();
        assert_eq!(outcome.resolution, Resolution::CommentDeleted);
        assert!(repo.find_by_id(report.id).unwrap().is_none());
        assert!(
            RatingRepository::new(f.pool)
                .find_by_id(f.rating_id)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_queue_filters_by_status() {
        let f = fixture();
        let repo = ReportRepository::new(f.pool.clone());
        let report = repo.create(f.reporter, f.rating_id, &reason()).unwrap();

        let pending = repo.list(Some(ReportStatus::Pending), 0, 10).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].reporter_nickname.as_deref(), Some("snitch"));
        assert_eq!(pending[0].author_nickname.as_deref(), Some("writer"));
        assert_eq!(pending[0].comment_text.as_deref(), Some("rubbish"));

        repo.resolve(report.id, f.reporter, ModerationAction::Dismiss).unwrap();
        assert!(repo.list(Some(ReportStatus::Pending), 0, 10).unwrap().is_empty());
        assert_eq!(repo.list(None, 0, 10).unwrap().len(), 1);
    }
}
