//! Cookie sessions, CSRF protection and authentication extractors.
//!
//! The session middleware runs in front of every route. It resolves the
//! `sid` cookie to a [`Session`] and stores it in the request extensions,
//! where the extractors below pick it up:
//!
//! - [`CurrentUser`]: any signed-in user, otherwise 401
//! - [`Poster`]: a signed-in user who has chosen a nickname, otherwise 403
//! - [`AdminUser`]: a signed-in admin, otherwise 401/403
//! - [`MaybeUser`]: never rejects
//!
//! Requests that change state (anything but GET, HEAD and OPTIONS) and carry
//! a valid session must echo the session's CSRF token in `X-CSRF-Token`.

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts, Request, State},
    http::{HeaderMap, Method, header, request::Parts},
    middleware::Next,
    response::Response,
};

use super::error::ApiError;
use super::state::AppState;
use crate::crypto::tokens_match;
use crate::db::Session;
use crate::models::User;

pub const SESSION_COOKIE: &str = "sid";
pub const OAUTH_STATE_COOKIE: &str = "oauth_state";
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Lifetime of the `oauth_state` cookie in seconds.
pub const OAUTH_STATE_MAX_AGE: i64 = 600;

/// Find a cookie value in the request headers.
pub fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

/// Attributes applied to every cookie the server sets.
#[derive(Debug, Clone, Copy)]
pub struct CookieSettings {
    pub secure: bool,
    pub session_max_age: i64,
}

impl CookieSettings {
    fn build(&self, name: &str, value: &str, max_age: i64) -> String {
        let mut cookie =
            format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}");
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    pub fn session(&self, token: &str) -> String {
        self.build(SESSION_COOKIE, token, self.session_max_age)
    }

    pub fn oauth_state(&self, state: &str) -> String {
        self.build(OAUTH_STATE_COOKIE, state, OAUTH_STATE_MAX_AGE)
    }

    /// A cookie that makes the browser drop `name`.
    pub fn expired(&self, name: &str) -> String {
        self.build(name, "", 0)
    }
}

/// The session behind the current request, with its raw cookie token.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub session: Session,
}

fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Resolve the session cookie and enforce the CSRF header.
pub async fn session_layer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = read_cookie(request.headers(), SESSION_COOKIE).map(str::to_owned);

    if let Some(token) = token.filter(|t| !t.is_empty()) {
        if let Some(session) = state.sessions.find_active(&token)? {
            if !is_safe_method(request.method()) {
                let provided = request
                    .headers()
                    .get(CSRF_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or_default();
                if !tokens_match(&session.csrf_token, provided) {
                    tracing::warn!(
                        user_id = session.user.id,
                        method = %request.method(),
                        path = %request.uri().path(),
                        "Rejected request with missing or invalid CSRF token"
                    );
                    return Err(ApiError::Forbidden("Missing or invalid CSRF token".into()));
                }
            }
            request
                .extensions_mut()
                .insert(AuthSession { token, session });
        }
    }

    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for AuthSession
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthSession>()
            .cloned()
            .ok_or_else(ApiError::unauthorized)
    }
}

impl<S> OptionalFromRequestParts<S> for AuthSession
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<AuthSession>().cloned())
    }
}

/// Any signed-in user.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = <AuthSession as FromRequestParts<S>>::from_request_parts(parts, state).await?;
        Ok(CurrentUser(auth.session.user))
    }
}

/// The signed-in user, if any.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

impl MaybeUser {
    pub fn id(&self) -> Option<i32> {
        self.0.as_ref().map(|user| user.id)
    }

    pub fn is_admin(&self) -> bool {
        self.0.as_ref().is_some_and(User::is_admin)
    }
}

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(
            parts
                .extensions
                .get::<AuthSession>()
                .map(|auth| auth.session.user.clone()),
        ))
    }
}

/// A signed-in user with a public nickname, required to rate, react or
/// report.
#[derive(Debug, Clone)]
pub struct Poster(pub User);

impl<S> FromRequestParts<S> for Poster
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.has_nickname() {
            return Err(ApiError::Forbidden("Choose a nickname first".into()));
        }
        Ok(Poster(user))
    }
}

/// A signed-in admin.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(ApiError::Forbidden("Admin access required".into()));
        }
        Ok(AdminUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_read_cookie() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark; sid=abc123"));
        headers.append(header::COOKIE, HeaderValue::from_static("oauth_state=xyz"));

        assert_eq!(read_cookie(&headers, "sid"), Some("abc123"));
        assert_eq!(read_cookie(&headers, "oauth_state"), Some("xyz"));
        assert_eq!(read_cookie(&headers, "missing"), None);
    }

    #[test]
    fn test_cookie_attributes() {
        let plain = CookieSettings {
            secure: false,
            session_max_age: 60,
        };
        assert_eq!(
            plain.session("tok"),
            "sid=tok; Path=/; HttpOnly; SameSite=Lax; Max-Age=60"
        );

        let secure = CookieSettings {
            secure: true,
            ..plain
        };
        assert!(secure.expired(SESSION_COOKIE).ends_with("Max-Age=0; Secure"));
    }

    #[test]
    fn test_safe_methods() {
        assert!(is_safe_method(&Method::GET));
        assert!(is_safe_method(&Method::OPTIONS));
        assert!(!is_safe_method(&Method::PUT));
        assert!(!is_safe_method(&Method::DELETE));
    }
}
