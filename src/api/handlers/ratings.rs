//! Submitting, reading and deleting ratings.

use axum::{Json, extract::State, http::StatusCode};

use crate::api::auth::{CurrentUser, MaybeUser, Poster};
use crate::api::error::ApiError;
use crate::api::extract::{ApiJson, ApiPath};
use crate::api::handlers::releases::visible_release;
use crate::api::state::AppState;
use crate::models::rating::{RatingPayload, RatingSaved};
use crate::models::{Rating, Score};

/// GET /api/releases/{id}/rating
///
/// The caller's own rating, or `null`.
pub async fn get_my_rating(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(release_id): ApiPath<i32>,
) -> Result<Json<Option<Rating>>, ApiError> {
    visible_release(&state, release_id, &MaybeUser(Some(user.clone())))?;
    Ok(Json(state.ratings.find_for(user.id, release_id)?))
}

/// PUT /api/releases/{id}/rating
///
/// Creates the rating (201) or replaces the caller's existing one (200).
pub async fn put_rating(
    State(state): State<AppState>,
    Poster(user): Poster,
    ApiPath(release_id): ApiPath<i32>,
    ApiJson(payload): ApiJson<RatingPayload>,
) -> Result<(StatusCode, Json<RatingSaved>), ApiError> {
    visible_release(&state, release_id, &MaybeUser(Some(user.clone())))?;
    let score = Score::new(payload.score)?;

    let saved = state
        .ratings
        .upsert(user.id, release_id, score, payload.text)?;
    tracing::debug!(
        user_id = user.id,
        release_id,
        score = score.value(),
        created = saved.created,
        "Rating saved"
    );

    let status = if saved.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(saved)))
}

/// DELETE /api/ratings/{id}
///
/// Allowed for the author and for admins.
pub async fn delete_rating(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(rating_id): ApiPath<i32>,
) -> Result<StatusCode, ApiError> {
    let rating = state
        .ratings
        .find_by_id(rating_id)?
        .ok_or_else(|| ApiError::not_found(format!("Rating {rating_id}")))?;
    if rating.user_id != user.id && !user.is_admin() {
        return Err(ApiError::Forbidden("Not your rating".into()));
    }

    state.ratings.delete(rating_id)?;
    tracing::info!(user_id = user.id, rating_id, "Rating deleted");
    Ok(StatusCode::NO_CONTENT)
}
