//! Public user profiles.

use axum::{Json, extract::State};
use serde::Deserialize;

use crate::api::auth::MaybeUser;
use crate::api::error::ApiError;
use crate::api::extract::{ApiPath, ApiQuery, Page};
use crate::api::state::AppState;
use crate::models::rating::UserRatingView;
use crate::models::user::UserProfile;

/// GET /api/users/{nickname}
pub async fn get_profile(
    State(state): State<AppState>,
    viewer: MaybeUser,
    ApiPath(nickname): ApiPath<String>,
) -> Result<Json<UserProfile>, ApiError> {
    state
        .users
        .profile(&nickname, viewer.is_admin())?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("User '{nickname}'")))
}

#[derive(Debug, Default, Deserialize)]
pub struct RatingsQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/users/{nickname}/ratings
///
/// Most recently changed first.
pub async fn get_user_ratings(
    State(state): State<AppState>,
    viewer: MaybeUser,
    ApiPath(nickname): ApiPath<String>,
    ApiQuery(query): ApiQuery<RatingsQuery>,
) -> Result<Json<Vec<UserRatingView>>, ApiError> {
    let user = state
        .users
        .find_by_nickname(&nickname)?
        .ok_or_else(|| ApiError::not_found(format!("User '{nickname}'")))?;

    let page = Page::new(query.offset, query.limit);
    let ratings = state
        .ratings
        .by_user(user.id, viewer.is_admin(), page.offset, page.limit)?;
    Ok(Json(ratings))
}
