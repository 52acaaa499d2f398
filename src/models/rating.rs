//! Ratings, comments and reactions.
//!
//! A rating and its comment share one row: the comment is simply the
//! optional text attached to a score. Each user has at most one rating per
//! release.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::validation::{ValidationError, optional_text};

/// Longest review a user may attach to a rating.
pub const MAX_COMMENT_LEN: usize = 5000;

/// A score between 1 and 10 inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Score(i32);

impl Score {
    pub const MIN: i32 = 1;
    pub const MAX: i32 = 10;

    pub fn new(value: i32) -> Result<Self, ValidationError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ValidationError::new(
                "score",
                format!("must be between {} and {}", Self::MIN, Self::MAX),
            ))
        }
    }

    pub fn value(self) -> i32 {
        self.0
    }
}

/// Trimmed comment text; blank text means "no comment".
pub fn normalize_comment(text: Option<String>) -> Result<Option<String>, ValidationError> {
    optional_text("text", text, MAX_COMMENT_LEN)
}

/// A user's rating of a release.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub id: i32,
    pub user_id: i32,
    pub release_id: i32,
    pub score: i32,
    pub text: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Rating {
    /// Ratings with text are shown as comments.
    pub fn is_comment(&self) -> bool {
        self.text.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// Request body for submitting a rating.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingPayload {
    pub score: i32,
    #[serde(default)]
    pub text: Option<String>,
}

/// Result of an upsert: the stored row and whether it is new.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSaved {
    pub rating: Rating,
    pub created: bool,
}

/// Like or dislike on a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Like,
    Dislike,
}

impl ReactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionKind::Like => "like",
            ReactionKind::Dislike => "dislike",
        }
    }
}

impl fmt::Display for ReactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReactionKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(ReactionKind::Like),
            "dislike" => Ok(ReactionKind::Dislike),
            other => Err(ValidationError::new(
                "kind",
                format!("unknown reaction '{other}'"),
            )),
        }
    }
}

/// Request body for reacting to a comment.
#[derive(Debug, Clone, Deserialize)]
pub struct ReactionPayload {
    pub kind: ReactionKind,
}

/// Reaction counts on one comment, from the viewer's point of view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionTally {
    pub likes: i64,
    pub dislikes: i64,
    pub my_reaction: Option<ReactionKind>,
}

/// Sort order for comment listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentSort {
    #[default]
    Newest,
    /// Likes minus dislikes, highest first.
    Top,
}

/// A comment as shown under a release.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: i32,
    pub release_id: i32,
    pub author_id: i32,
    pub author_nickname: Option<String>,
    pub score: i32,
    pub text: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    #[serde(flatten)]
    pub reactions: ReactionTally,
}

/// A rating in a user's public history.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRatingView {
    pub id: i32,
    pub release_id: i32,
    pub release_title: String,
    pub artist_name: String,
    pub cover_url: Option<String>,
    pub score: i32,
    pub text: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_bounds() {
        assert!(Score::new(0).is_err());
        assert_eq!(Score::new(1).unwrap().value(), 1);
        assert_eq!(Score::new(10).unwrap().value(), 10);
        assert!(Score::new(11).is_err());
        assert!(Score::new(-3).is_err());
    }

    #[test]
    fn test_comment_normalization() {
        assert_eq!(normalize_comment(Some("   ".into())).unwrap(), None);
        assert_eq!(
            normalize_comment(Some(" great record ".into())).unwrap(),
            Some("great record".into())
        );
        assert!(normalize_comment(Some("x".repeat(MAX_COMMENT_LEN + 1))).is_err());
    }

    #[test]
    fn test_reaction_kind_parsing() {
        assert_eq!("like".parse::<ReactionKind>().unwrap(), ReactionKind::Like);
        assert!("love".parse::<ReactionKind>().is_err());
        let payload: ReactionPayload = serde_json::from_str(r#"{"kind":"dislike"}"#).unwrap();
        assert_eq!(payload.kind, ReactionKind::Dislike);
    }

    #[test]
    fn test_is_comment() {
        let mut rating = Rating {
            id: 1,
            user_id: 1,
            release_id: 1,
            score: 8,
            text: None,
            created_at: NaiveDateTime::default(),
            updated_at: NaiveDateTime::default(),
        };
        assert!(!rating.is_comment());
        rating.text = Some("solid".into());
        assert!(rating.is_comment());
    }
}
