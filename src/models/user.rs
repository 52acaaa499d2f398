//! User model and related types.

use chrono::NaiveDateTime;
use serde::Serialize;

use super::validation::ValidationError;

/// A user in the system (domain model).
#[derive(Debug, Clone)]
pub struct User {
    pub id: i32,
    /// Google OAuth subject identifier.
    pub google_id: String,
    pub email: Option<String>,
    /// Chosen after the first sign-in; `None` until then.
    pub nickname: Option<String>,
    pub is_admin: bool,
    pub created_at: NaiveDateTime,
}

impl User {
    /// Check if user is an admin.
    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    /// Users must pick a nickname before they can post anything.
    pub fn has_nickname(&self) -> bool {
        self.nickname.is_some()
    }
}

/// A validated nickname.
///
/// 3 to 20 characters of ASCII letters, digits, `_` or `.`, not starting or
/// ending with a dot. Uniqueness is case-insensitive and enforced by the
/// database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nickname(String);

impl Nickname {
    pub const MIN_LEN: usize = 3;
    pub const MAX_LEN: usize = 20;

    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let nickname = raw.trim();
        if nickname.len() < Self::MIN_LEN || nickname.len() > Self::MAX_LEN {
            return Err(ValidationError::new(
                "nickname",
                format!(
                    "must be between {} and {} characters",
                    Self::MIN_LEN,
                    Self::MAX_LEN
                ),
            ));
        }
        if !nickname
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        {
            return Err(ValidationError::new(
                "nickname",
                "may only contain letters, digits, '_' and '.'",
            ));
        }
        if nickname.starts_with('.') || nickname.ends_with('.') {
            return Err(ValidationError::new(
                "nickname",
                "must not start or end with '.'",
            ));
        }
        Ok(Self(nickname.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The signed-in user as returned by `/api/auth/me`.
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUserResponse {
    pub id: i32,
    pub nickname: Option<String>,
    pub email: Option<String>,
    pub is_admin: bool,
    pub needs_nickname: bool,
}

impl From<&User> for CurrentUserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            nickname: user.nickname.clone(),
            email: user.email.clone(),
            is_admin: user.is_admin,
            needs_nickname: !user.has_nickname(),
        }
    }
}

/// Admin view of a user account.
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserResponse {
    pub id: i32,
    pub nickname: Option<String>,
    pub email: Option<String>,
    pub is_admin: bool,
    pub created_at: NaiveDateTime,
}

impl From<&User> for AdminUserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            nickname: user.nickname.clone(),
            email: user.email.clone(),
            is_admin: user.is_admin,
            created_at: user.created_at,
        }
    }
}

/// Public profile with rating activity.
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub nickname: String,
    pub joined_at: NaiveDateTime,
    pub rating_count: i64,
    pub comment_count: i64,
    pub average_score: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nickname_accepts_valid() {
        assert_eq!(Nickname::parse("meloman_42").unwrap().as_str(), "meloman_42");
        assert_eq!(Nickname::parse("  dj.shadow ").unwrap().as_str(), "dj.shadow");
    }

    #[test]
    fn test_nickname_length_bounds() {
        assert!(Nickname::parse("ab").is_err());
        assert!(Nickname::parse("abc").is_ok());
        assert!(Nickname::parse(&"a".repeat(20)).is_ok());
        assert!(Nickname::parse(&"a".repeat(21)).is_err());
    }

    #[test]
    fn test_nickname_rejects_bad_characters() {
        assert!(Nickname::parse("with space").is_err());
        assert!(Nickname::parse("кириллица").is_err());
        assert!(Nickname::parse("semi;colon").is_err());
        assert!(Nickname::parse(".dotted").is_err());
        assert!(Nickname::parse("dotted.").is_err());
    }

    #[test]
    fn test_current_user_needs_nickname() {
        let user = User {
            id: 1,
            google_id: "sub".into(),
            email: None,
            nickname: None,
            is_admin: false,
            created_at: NaiveDateTime::default(),
        };
        let response = CurrentUserResponse::from(&user);
        assert!(response.needs_nickname);
    }
}
