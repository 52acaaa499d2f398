//! Curated collections of releases.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::catalog::ReleaseSummary;
use super::validation::{ValidationError, optional_text, required_text};

/// A collection needs at least this many releases to be shown publicly.
pub const MIN_ACTIVE_RELEASES: usize = 5;

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_DESCRIPTION_LEN: usize = 2000;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub is_active: bool,
    /// Display order among collections, ascending.
    pub position: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSummary {
    #[serde(flatten)]
    pub collection: Collection,
    pub release_count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionDetail {
    #[serde(flatten)]
    pub collection: Collection,
    pub releases: Vec<ReleaseSummary>,
}

/// Request body for creating or updating a collection.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CollectionPayload {
    pub title: String,
    pub description: Option<String>,
    pub position: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionData {
    pub title: String,
    pub description: Option<String>,
    pub position: i32,
}

impl CollectionPayload {
    pub fn validate(self) -> Result<CollectionData, ValidationError> {
        Ok(CollectionData {
            title: required_text("title", &self.title, 1, MAX_TITLE_LEN)?,
            description: optional_text("description", self.description, MAX_DESCRIPTION_LEN)?,
            position: self.position,
        })
    }
}

/// Request body for replacing a collection's releases, in display order.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionReleasesPayload {
    pub release_ids: Vec<i32>,
}

impl CollectionReleasesPayload {
    /// Reject duplicate ids; order is preserved.
    pub fn validate(self) -> Result<Vec<i32>, ValidationError> {
        let mut seen = std::collections::HashSet::with_capacity(self.release_ids.len());
        for id in &self.release_ids {
            if !seen.insert(*id) {
                return Err(ValidationError::new(
                    "releaseIds",
                    format!("release {id} is listed more than once"),
                ));
            }
        }
        Ok(self.release_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_release_ids_rejected() {
        let payload = CollectionReleasesPayload {
            release_ids: vec![1, 2, 1],
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn test_release_order_preserved() {
        let payload = CollectionReleasesPayload {
            release_ids: vec![5, 3, 9],
        };
        assert_eq!(payload.validate().unwrap(), vec![5, 3, 9]);
    }

    #[test]
    fn test_collection_payload_validation() {
        let data = CollectionPayload {
            title: " Best of 2024 ".into(),
            description: Some("".into()),
            position: 2,
        }
        .validate()
        .unwrap();
        assert_eq!(data.title, "Best of 2024");
        assert_eq!(data.description, None);
        assert!(CollectionPayload::default().validate().is_err());
    }
}
