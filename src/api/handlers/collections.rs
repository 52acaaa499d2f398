//! Curated collections: public listing and admin curation.

use axum::{Json, extract::State, http::StatusCode};

use crate::api::auth::{AdminUser, MaybeUser};
use crate::api::error::ApiError;
use crate::api::extract::{ApiJson, ApiPath};
use crate::api::state::AppState;
use crate::models::Collection;
use crate::models::collection::{
    CollectionDetail, CollectionPayload, CollectionReleasesPayload, CollectionSummary,
};

/// GET /api/collections
///
/// Active collections in display order.
pub async fn list_collections(
    State(state): State<AppState>,
) -> Result<Json<Vec<CollectionSummary>>, ApiError> {
    Ok(Json(state.collections.list(false, false)?))
}

/// GET /api/collections/{id}
///
/// Inactive collections are only visible to admins.
pub async fn get_collection(
    State(state): State<AppState>,
    viewer: MaybeUser,
    ApiPath(collection_id): ApiPath<i32>,
) -> Result<Json<CollectionDetail>, ApiError> {
    let admin = viewer.is_admin();
    let mut detail = state
        .collections
        .detail(collection_id)?
        .filter(|detail| detail.collection.is_active || admin)
        .ok_or_else(|| ApiError::not_found(format!("Collection {collection_id}")))?;

    if !admin {
        detail.releases.retain(|summary| !summary.release.is_test_data);
    }
    Ok(Json(detail))
}

/// GET /api/admin/collections
pub async fn admin_list_collections(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
) -> Result<Json<Vec<CollectionSummary>>, ApiError> {
    Ok(Json(state.collections.list(true, true)?))
}

/// POST /api/admin/collections
///
/// New collections start inactive.
pub async fn create_collection(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiJson(payload): ApiJson<CollectionPayload>,
) -> Result<(StatusCode, Json<Collection>), ApiError> {
    let collection = state.collections.create(&payload.validate()?)?;
    tracing::info!(admin_id = admin.id, collection_id = collection.id, "Collection created");
    Ok((StatusCode::CREATED, Json(collection)))
}

/// PUT /api/admin/collections/{id}
pub async fn update_collection(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ApiPath(collection_id): ApiPath<i32>,
    ApiJson(payload): ApiJson<CollectionPayload>,
) -> Result<Json<Collection>, ApiError> {
    let collection = state
        .collections
        .update(collection_id, &payload.validate()?)?;
    Ok(Json(collection))
}

/// DELETE /api/admin/collections/{id}
pub async fn delete_collection(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ApiPath(collection_id): ApiPath<i32>,
) -> Result<StatusCode, ApiError> {
    if !state.collections.delete(collection_id)? {
        return Err(ApiError::not_found(format!("Collection {collection_id}")));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/admin/collections/{id}/releases
///
/// Replaces the membership, in the given order.
pub async fn set_collection_releases(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ApiPath(collection_id): ApiPath<i32>,
    ApiJson(payload): ApiJson<CollectionReleasesPayload>,
) -> Result<Json<Collection>, ApiError> {
    let release_ids = payload.validate()?;
    let collection = state
        .collections
        .set_releases(collection_id, &release_ids)?;
    Ok(Json(collection))
}

/// POST /api/admin/collections/{id}/activate
pub async fn activate_collection(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiPath(collection_id): ApiPath<i32>,
) -> Result<Json<Collection>, ApiError> {
    let collection = state.collections.set_active(collection_id, true)?;
    tracing::info!(admin_id = admin.id, collection_id, "Collection activated");
    Ok(Json(collection))
}

/// POST /api/admin/collections/{id}/deactivate
pub async fn deactivate_collection(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiPath(collection_id): ApiPath<i32>,
) -> Result<Json<Collection>, ApiError> {
    let collection = state.collections.set_active(collection_id, false)?;
    tracing::info!(admin_id = admin.id, collection_id, "Collection deactivated");
    Ok(Json(collection))
}
