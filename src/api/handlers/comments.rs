//! Reactions and reports on comments.

use axum::{Json, extract::State, http::StatusCode};

use crate::api::auth::{CurrentUser, MaybeUser, Poster};
use crate::api::error::ApiError;
use crate::api::extract::{ApiJson, ApiPath};
use crate::api::handlers::releases::visible_release;
use crate::api::state::AppState;
use crate::models::{Report, User};
use crate::models::rating::{ReactionPayload, ReactionTally};
use crate::models::report::{ReportPayload, ReportReason};

/// Check that the comment exists on a release the user may see.
fn check_visible(state: &AppState, rating_id: i32, user: &User) -> Result<(), ApiError> {
    let hidden = || ApiError::not_found(format!("Comment {rating_id}"));
    let rating = state.ratings.find_by_id(rating_id)?.ok_or_else(hidden)?;

    match visible_release(state, rating.release_id, &MaybeUser(Some(user.clone()))) {
        Ok(_) => Ok(()),
        Err(ApiError::NotFound(_)) => Err(hidden()),
        Err(other) => Err(other),
    }
}

/// PUT /api/comments/{id}/reaction
pub async fn set_reaction(
    State(state): State<AppState>,
    Poster(user): Poster,
    ApiPath(rating_id): ApiPath<i32>,
    ApiJson(payload): ApiJson<ReactionPayload>,
) -> Result<Json<ReactionTally>, ApiError> {
    check_visible(&state, rating_id, &user)?;
    let tally = state.reactions.set(user.id, rating_id, payload.kind)?;
    Ok(Json(tally))
}

/// DELETE /api/comments/{id}/reaction
pub async fn remove_reaction(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(rating_id): ApiPath<i32>,
) -> Result<Json<ReactionTally>, ApiError> {
    check_visible(&state, rating_id, &user)?;
    let tally = state.reactions.remove(user.id, rating_id)?;
    Ok(Json(tally))
}

/// POST /api/comments/{id}/reports
pub async fn report_comment(
    State(state): State<AppState>,
    Poster(user): Poster,
    ApiPath(rating_id): ApiPath<i32>,
    ApiJson(payload): ApiJson<ReportPayload>,
) -> Result<(StatusCode, Json<Report>), ApiError> {
    check_visible(&state, rating_id, &user)?;
    let reason = ReportReason::parse(&payload.reason)?;
    let report = state.reports.create(user.id, rating_id, &reason)?;
    Ok((StatusCode::CREATED, Json(report)))
}
