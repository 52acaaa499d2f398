//! Artist and release models.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::validation::{ValidationError, optional_text, optional_url, required_text};

pub const MAX_NAME_LEN: usize = 200;
pub const MAX_EXTERNAL_ID_LEN: usize = 64;

/// An artist in the catalog.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Artist {
    pub id: i32,
    pub name: String,
    pub deezer_id: Option<String>,
    pub itunes_id: Option<String>,
    pub yandex_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Album or single.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseType {
    #[default]
    Album,
    Single,
}

impl ReleaseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseType::Album => "album",
            ReleaseType::Single => "single",
        }
    }
}

impl fmt::Display for ReleaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReleaseType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "album" => Ok(ReleaseType::Album),
            "single" => Ok(ReleaseType::Single),
            other => Err(ValidationError::new(
                "release_type",
                format!("unknown release type '{other}'"),
            )),
        }
    }
}

/// Links to the release on streaming services.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StreamingLinks {
    pub yandex_music: Option<String>,
    pub apple_music: Option<String>,
    pub spotify: Option<String>,
    pub deezer: Option<String>,
}

impl StreamingLinks {
    fn validated(self) -> Result<Self, ValidationError> {
        Ok(Self {
            yandex_music: optional_url("links.yandexMusic", self.yandex_music)?,
            apple_music: optional_url("links.appleMusic", self.apple_music)?,
            spotify: optional_url("links.spotify", self.spotify)?,
            deezer: optional_url("links.deezer", self.deezer)?,
        })
    }
}

/// A release (album or single) in the catalog.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    pub id: i32,
    pub title: String,
    pub artist_id: i32,
    pub release_date: Option<NaiveDate>,
    pub release_type: ReleaseType,
    pub cover_url: Option<String>,
    pub links: StreamingLinks,
    pub is_test_data: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Aggregated rating figures for one release.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseStats {
    /// `None` while nobody has rated the release.
    pub average_score: Option<f64>,
    pub rating_count: i64,
    pub comment_count: i64,
}

impl ReleaseStats {
    /// Average rounded to one decimal place for display.
    pub fn rounded(mut self) -> Self {
        self.average_score = self.average_score.map(|avg| (avg * 10.0).round() / 10.0);
        self
    }
}

/// A release with its artist name and rating aggregates.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseSummary {
    #[serde(flatten)]
    pub release: Release,
    pub artist_name: String,
    #[serde(flatten)]
    pub stats: ReleaseStats,
}

/// An artist together with their releases.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistDetail {
    #[serde(flatten)]
    pub artist: Artist,
    pub releases: Vec<ReleaseSummary>,
}

/// Sort order for release listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseSort {
    /// Release date, newest first.
    #[default]
    Newest,
    /// Average score, then number of ratings.
    Top,
    /// Number of ratings.
    Popular,
}

/// Filters for listing releases.
#[derive(Debug, Clone, Default)]
pub struct ReleaseFilter {
    pub release_type: Option<ReleaseType>,
    pub artist_id: Option<i32>,
    pub search: Option<String>,
    pub include_test_data: bool,
    pub sort: ReleaseSort,
}

// ============================================================================
// Admin input
// ============================================================================

/// Request body for creating or updating an artist.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArtistPayload {
    pub name: String,
    pub deezer_id: Option<String>,
    pub itunes_id: Option<String>,
    pub yandex_id: Option<String>,
}

/// Validated artist fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtistData {
    pub name: String,
    pub deezer_id: Option<String>,
    pub itunes_id: Option<String>,
    pub yandex_id: Option<String>,
}

impl ArtistPayload {
    pub fn validate(self) -> Result<ArtistData, ValidationError> {
        Ok(ArtistData {
            name: required_text("name", &self.name, 1, MAX_NAME_LEN)?,
            deezer_id: optional_text("deezerId", self.deezer_id, MAX_EXTERNAL_ID_LEN)?,
            itunes_id: optional_text("itunesId", self.itunes_id, MAX_EXTERNAL_ID_LEN)?,
            yandex_id: optional_text("yandexId", self.yandex_id, MAX_EXTERNAL_ID_LEN)?,
        })
    }
}

/// Request body for creating or updating a release.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReleasePayload {
    pub title: String,
    pub artist_id: i32,
    pub release_date: Option<NaiveDate>,
    pub release_type: ReleaseType,
    pub cover_url: Option<String>,
    pub links: StreamingLinks,
    pub is_test_data: bool,
}

/// Validated release fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseData {
    pub title: String,
    pub artist_id: i32,
    pub release_date: Option<NaiveDate>,
    pub release_type: ReleaseType,
    pub cover_url: Option<String>,
    pub links: StreamingLinks,
    pub is_test_data: bool,
}

impl ReleasePayload {
    pub fn validate(self) -> Result<ReleaseData, ValidationError> {
        if self.artist_id <= 0 {
            return Err(ValidationError::new("artistId", "is required"));
        }
        Ok(ReleaseData {
            title: required_text("title", &self.title, 1, MAX_NAME_LEN)?,
            artist_id: self.artist_id,
            release_date: self.release_date,
            release_type: self.release_type,
            cover_url: optional_url("coverUrl", self.cover_url)?,
            links: self.links.validated()?,
            is_test_data: self.is_test_data,
        })
    }
}

/// One entry of a bulk metadata import.
///
/// Artists are matched by exact name and created on demand.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportItem {
    pub artist_name: String,
    pub deezer_id: Option<String>,
    pub itunes_id: Option<String>,
    pub yandex_id: Option<String>,
    pub title: String,
    pub release_type: ReleaseType,
    pub release_date: Option<NaiveDate>,
    pub cover_url: Option<String>,
    pub links: StreamingLinks,
    pub is_test_data: bool,
}

/// A validated import entry, split into its artist and release parts.
///
/// `release.artist_id` is filled in once the artist is resolved.
#[derive(Debug, Clone)]
pub struct ImportEntry {
    pub artist: ArtistData,
    pub release: ReleaseData,
}

impl ImportItem {
    pub fn validate(self) -> Result<ImportEntry, ValidationError> {
        let artist = ArtistPayload {
            name: self.artist_name,
            deezer_id: self.deezer_id,
            itunes_id: self.itunes_id,
            yandex_id: self.yandex_id,
        }
        .validate()?;
        let release = ReleaseData {
            title: required_text("title", &self.title, 1, MAX_NAME_LEN)?,
            artist_id: 0,
            release_date: self.release_date,
            release_type: self.release_type,
            cover_url: optional_url("coverUrl", self.cover_url)?,
            links: self.links.validated()?,
            is_test_data: self.is_test_data,
        };
        Ok(ImportEntry { artist, release })
    }
}

/// Outcome of a bulk import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub artists_created: usize,
    pub releases_created: usize,
    pub releases_skipped: usize,
}
