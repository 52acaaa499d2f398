//! Google sign-in, the current user and logout.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{AppendHeaders, IntoResponse, Redirect},
};
use serde::Deserialize;

use crate::api::auth::{
    AuthSession, CurrentUser, OAUTH_STATE_COOKIE, SESSION_COOKIE, read_cookie,
};
use crate::api::error::ApiError;
use crate::api::extract::{ApiJson, ApiQuery};
use crate::api::state::AppState;
use crate::crypto::{generate_token, tokens_match};
use crate::models::Nickname;
use crate::models::user::CurrentUserResponse;
use crate::oauth::IdentityProvider;

fn provider(state: &AppState) -> Result<&dyn IdentityProvider, ApiError> {
    state
        .identity
        .as_deref()
        .ok_or_else(|| ApiError::not_found("Google sign-in"))
}

/// GET /api/auth/google
///
/// Starts the OAuth flow: remembers a random `state` in a short-lived cookie
/// and sends the browser to Google.
pub async fn google_login(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let provider = provider(&state)?;
    let oauth_state = generate_token();

    Ok((
        AppendHeaders([(header::SET_COOKIE, state.cookies.oauth_state(&oauth_state))]),
        Redirect::to(&provider.authorize_url(&oauth_state)),
    ))
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// GET /api/auth/google/callback
pub async fn google_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiQuery(params): ApiQuery<CallbackParams>,
) -> Result<impl IntoResponse, ApiError> {
    let provider = provider(&state)?;

    if let Some(error) = params.error {
        tracing::info!(error = %error, "Google sign-in cancelled");
        return Err(ApiError::Unauthorized(format!("Sign-in failed: {error}")));
    }

    let expected = read_cookie(&headers, OAUTH_STATE_COOKIE).unwrap_or_default();
    let returned = params.state.as_deref().unwrap_or_default();
    if expected.is_empty() || !tokens_match(expected, returned) {
        tracing::warn!("OAuth state mismatch");
        return Err(ApiError::Unauthorized("Sign-in state mismatch, please retry".into()));
    }
    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::Validation("code: is required".into()))?;

    let identity = provider.resolve(&code).await?;
    let (user, created) = state
        .users
        .find_or_create_by_google(&identity.subject, identity.email.as_deref())?;
    let token = state.sessions.create(user.id)?;

    tracing::info!(user_id = user.id, created, "User signed in");
    Ok((
        AppendHeaders([
            (header::SET_COOKIE, state.cookies.session(&token)),
            (header::SET_COOKIE, state.cookies.expired(OAUTH_STATE_COOKIE)),
        ]),
        Redirect::to("/"),
    ))
}

/// GET /api/auth/me
pub async fn me(CurrentUser(user): CurrentUser) -> Json<CurrentUserResponse> {
    Json(CurrentUserResponse::from(&user))
}

/// POST /api/auth/logout
///
/// Always clears the cookie, even when the session is already gone.
pub async fn logout(
    State(state): State<AppState>,
    auth: Option<AuthSession>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(auth) = auth {
        state.sessions.delete(&auth.token)?;
        tracing::debug!(user_id = auth.session.user.id, "User signed out");
    }

    Ok((
        StatusCode::NO_CONTENT,
        AppendHeaders([(header::SET_COOKIE, state.cookies.expired(SESSION_COOKIE))]),
    ))
}

#[derive(Debug, Deserialize)]
pub struct NicknamePayload {
    pub nickname: String,
}

/// PUT /api/auth/nickname
pub async fn set_nickname(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(payload): ApiJson<NicknamePayload>,
) -> Result<Json<CurrentUserResponse>, ApiError> {
    let nickname = Nickname::parse(&payload.nickname)?;
    let user = state.users.set_nickname(user.id, &nickname)?;

    tracing::info!(user_id = user.id, nickname = nickname.as_str(), "Nickname set");
    Ok(Json(CurrentUserResponse::from(&user)))
}
