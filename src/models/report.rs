//! Comment reports and moderation outcomes.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::validation::{ValidationError, required_text};

pub const MIN_REASON_LEN: usize = 3;
pub const MAX_REASON_LEN: usize = 500;

/// How many reports one user may file per rolling hour.
pub const REPORTS_PER_HOUR: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Pending,
    Resolved,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Resolved => "resolved",
        }
    }
}

impl FromStr for ReportStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReportStatus::Pending),
            "resolved" => Ok(ReportStatus::Resolved),
            other => Err(ValidationError::new(
                "status",
                format!("unknown report status '{other}'"),
            )),
        }
    }
}

/// Why a report left the pending state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// A moderator found nothing wrong.
    Dismissed,
    /// The comment text was removed; the score stays.
    TextRemoved,
    /// The whole rating was deleted. Only visible in logs, since the
    /// report row is removed with the rating.
    CommentDeleted,
    /// The author cleared the text before anyone acted on the report.
    Withdrawn,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Dismissed => "dismissed",
            Resolution::TextRemoved => "text_removed",
            Resolution::CommentDeleted => "comment_deleted",
            Resolution::Withdrawn => "withdrawn",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dismissed" => Ok(Resolution::Dismissed),
            "text_removed" => Ok(Resolution::TextRemoved),
            "comment_deleted" => Ok(Resolution::CommentDeleted),
            "withdrawn" => Ok(Resolution::Withdrawn),
            other => Err(ValidationError::new(
                "resolution",
                format!("unknown resolution '{other}'"),
            )),
        }
    }
}

/// What a moderator does with a pending report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationAction {
    Dismiss,
    RemoveText,
    DeleteComment,
}

impl ModerationAction {
    pub fn resolution(self) -> Resolution {
        match self {
            ModerationAction::Dismiss => Resolution::Dismissed,
            ModerationAction::RemoveText => Resolution::TextRemoved,
            ModerationAction::DeleteComment => Resolution::CommentDeleted,
        }
    }
}

/// A validated report reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportReason(String);

impl ReportReason {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        required_text("reason", raw, MIN_REASON_LEN, MAX_REASON_LEN).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Request body for reporting a comment.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportPayload {
    pub reason: String,
}

/// Request body for resolving a report.
#[derive(Debug, Clone, Deserialize)]
pub struct ResolvePayload {
    pub action: ModerationAction,
}

/// A report row.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: i32,
    pub rating_id: i32,
    pub reporter_id: i32,
    pub reason: String,
    pub status: ReportStatus,
    pub resolution: Option<Resolution>,
    pub resolved_by: Option<i32>,
    pub created_at: NaiveDateTime,
    pub resolved_at: Option<NaiveDateTime>,
}

/// A report with the reported comment, for the moderation queue.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportView {
    #[serde(flatten)]
    pub report: Report,
    pub reporter_nickname: Option<String>,
    pub release_id: i32,
    pub author_id: i32,
    pub author_nickname: Option<String>,
    pub comment_text: Option<String>,
    pub comment_score: i32,
}

/// What happened when a report was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationOutcome {
    pub report_id: i32,
    pub rating_id: i32,
    pub resolution: Resolution,
    /// Number of reports closed by this action, including the one acted on.
    pub reports_closed: usize,
}
