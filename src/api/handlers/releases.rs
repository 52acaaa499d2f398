//! Release browsing, comments and admin catalog management.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use crate::api::auth::{AdminUser, MaybeUser};
use crate::api::error::ApiError;
use crate::api::extract::{ApiJson, ApiPath, ApiQuery, Page};
use crate::api::state::AppState;
use crate::models::catalog::{
    ImportItem, ImportReport, ReleaseFilter, ReleasePayload, ReleaseSort, ReleaseType,
};
use crate::models::rating::{CommentSort, CommentView};
use crate::models::{Release, ReleaseSummary};

/// Most entries accepted by one import request.
pub const MAX_IMPORT_BATCH: usize = 1000;

/// Load a release the viewer may see. Test data is only shown to admins.
pub(crate) fn visible_release(
    state: &AppState,
    release_id: i32,
    viewer: &MaybeUser,
) -> Result<Release, ApiError> {
    state
        .releases
        .find_by_id(release_id)?
        .filter(|release| !release.is_test_data || viewer.is_admin())
        .ok_or_else(|| ApiError::not_found(format!("Release {release_id}")))
}

#[derive(Debug, Default, Deserialize)]
pub struct ReleaseQuery {
    #[serde(rename = "type")]
    pub release_type: Option<ReleaseType>,
    pub artist_id: Option<i32>,
    pub q: Option<String>,
    #[serde(default)]
    pub sort: ReleaseSort,
    #[serde(default)]
    pub include_test: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/releases
pub async fn list_releases(
    State(state): State<AppState>,
    viewer: MaybeUser,
    ApiQuery(query): ApiQuery<ReleaseQuery>,
) -> Result<Json<Vec<ReleaseSummary>>, ApiError> {
    let page = Page::new(query.offset, query.limit);
    let filter = ReleaseFilter {
        release_type: query.release_type,
        artist_id: query.artist_id,
        search: query.q,
        include_test_data: query.include_test && viewer.is_admin(),
        sort: query.sort,
    };

    Ok(Json(state.releases.list(&filter, page.offset, page.limit)?))
}

/// GET /api/releases/{id}
pub async fn get_release(
    State(state): State<AppState>,
    viewer: MaybeUser,
    ApiPath(release_id): ApiPath<i32>,
) -> Result<Json<ReleaseSummary>, ApiError> {
    let summary = state
        .releases
        .find_summary(release_id)?
        .filter(|summary| !summary.release.is_test_data || viewer.is_admin())
        .ok_or_else(|| ApiError::not_found(format!("Release {release_id}")))?;
    Ok(Json(summary))
}

#[derive(Debug, Default, Deserialize)]
pub struct CommentQuery {
    #[serde(default)]
    pub sort: CommentSort,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/releases/{id}/comments
pub async fn list_comments(
    State(state): State<AppState>,
    viewer: MaybeUser,
    ApiPath(release_id): ApiPath<i32>,
    ApiQuery(query): ApiQuery<CommentQuery>,
) -> Result<Json<Vec<CommentView>>, ApiError> {
    visible_release(&state, release_id, &viewer)?;

    let page = Page::new(query.offset, query.limit);
    let comments = state.ratings.comments_for_release(
        release_id,
        viewer.id(),
        query.sort,
        page.offset,
        page.limit,
    )?;
    Ok(Json(comments))
}

/// POST /api/admin/releases
pub async fn create_release(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiJson(payload): ApiJson<ReleasePayload>,
) -> Result<(StatusCode, Json<Release>), ApiError> {
    let release = state.releases.create(&payload.validate()?)?;
    tracing::info!(admin_id = admin.id, release_id = release.id, "Release created");
    Ok((StatusCode::CREATED, Json(release)))
}

/// PUT /api/admin/releases/{id}
pub async fn update_release(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ApiPath(release_id): ApiPath<i32>,
    ApiJson(payload): ApiJson<ReleasePayload>,
) -> Result<Json<Release>, ApiError> {
    let release = state.releases.update(release_id, &payload.validate()?)?;
    Ok(Json(release))
}

/// DELETE /api/admin/releases/{id}
pub async fn delete_release(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiPath(release_id): ApiPath<i32>,
) -> Result<StatusCode, ApiError> {
    if !state.releases.delete(release_id)? {
        return Err(ApiError::not_found(format!("Release {release_id}")));
    }
    tracing::info!(admin_id = admin.id, release_id, "Release deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/admin/releases/import
///
/// Every entry is validated before anything is written.
pub async fn import_releases(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiJson(items): ApiJson<Vec<ImportItem>>,
) -> Result<Json<ImportReport>, ApiError> {
    if items.len() > MAX_IMPORT_BATCH {
        return Err(ApiError::Validation(format!(
            "at most {MAX_IMPORT_BATCH} releases per import"
        )));
    }
    let entries = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            item.validate()
                .map_err(|e| ApiError::Validation(format!("entry {index}: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let report = state.releases.import(&entries)?;
    tracing::info!(
        admin_id = admin.id,
        artists_created = report.artists_created,
        releases_created = report.releases_created,
        releases_skipped = report.releases_skipped,
        "Release import finished"
    );
    Ok(Json(report))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurgeResponse {
    pub releases_deleted: usize,
}

/// DELETE /api/admin/test-data
pub async fn purge_test_data(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> Result<Json<PurgeResponse>, ApiError> {
    let releases_deleted = state.releases.purge_test_data()?;
    tracing::info!(admin_id = admin.id, releases_deleted, "Test data purged");
    Ok(Json(PurgeResponse { releases_deleted }))
}
