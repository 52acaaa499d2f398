//! Artist browsing and admin management.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;

use crate::api::auth::{AdminUser, MaybeUser};
use crate::api::error::ApiError;
use crate::api::extract::{ApiJson, ApiPath, ApiQuery, Page};
use crate::api::state::AppState;
use crate::models::Artist;
use crate::models::catalog::{ArtistDetail, ArtistPayload, ReleaseFilter};

#[derive(Debug, Default, Deserialize)]
pub struct ArtistQuery {
    pub q: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/artists
pub async fn list_artists(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ArtistQuery>,
) -> Result<Json<Vec<Artist>>, ApiError> {
    let page = Page::new(query.offset, query.limit);
    let artists = state
        .artists
        .search(query.q.as_deref().unwrap_or_default(), page.offset, page.limit)?;
    Ok(Json(artists))
}

#[derive(Debug, Default, Deserialize)]
pub struct DiscographyQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/artists/{id}
///
/// The artist with one page of their releases, newest first.
pub async fn get_artist(
    State(state): State<AppState>,
    viewer: MaybeUser,
    ApiPath(artist_id): ApiPath<i32>,
    ApiQuery(query): ApiQuery<DiscographyQuery>,
) -> Result<Json<ArtistDetail>, ApiError> {
    let artist = state
        .artists
        .find_by_id(artist_id)?
        .ok_or_else(|| ApiError::not_found(format!("Artist {artist_id}")))?;

    let filter = ReleaseFilter {
        artist_id: Some(artist_id),
        include_test_data: viewer.is_admin(),
        ..Default::default()
    };
    let page = Page::new(query.offset, query.limit);
    let releases = state.releases.list(&filter, page.offset, page.limit)?;

    Ok(Json(ArtistDetail { artist, releases }))
}

/// POST /api/admin/artists
pub async fn create_artist(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiJson(payload): ApiJson<ArtistPayload>,
) -> Result<(StatusCode, Json<Artist>), ApiError> {
    let artist = state.artists.create(&payload.validate()?)?;
    tracing::info!(admin_id = admin.id, artist_id = artist.id, "Artist created");
    Ok((StatusCode::CREATED, Json(artist)))
}

/// PUT /api/admin/artists/{id}
pub async fn update_artist(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ApiPath(artist_id): ApiPath<i32>,
    ApiJson(payload): ApiJson<ArtistPayload>,
) -> Result<Json<Artist>, ApiError> {
    let artist = state.artists.update(artist_id, &payload.validate()?)?;
    Ok(Json(artist))
}

/// DELETE /api/admin/artists/{id}
///
/// Removes the artist's releases too.
pub async fn delete_artist(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiPath(artist_id): ApiPath<i32>,
) -> Result<StatusCode, ApiError> {
    if !state.artists.delete(artist_id)? {
        return Err(ApiError::not_found(format!("Artist {artist_id}")));
    }
    tracing::info!(admin_id = admin.id, artist_id, "Artist deleted");
    Ok(StatusCode::NO_CONTENT)
}
