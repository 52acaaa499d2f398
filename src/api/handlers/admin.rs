//! Moderation queue and user administration.

use axum::{Json, extract::State};
use serde::Deserialize;

use crate::api::auth::AdminUser;
use crate::api::error::ApiError;
use crate::api::extract::{ApiJson, ApiPath, ApiQuery, Page};
use crate::api::state::AppState;
use crate::models::ReportStatus;
use crate::models::report::{ModerationOutcome, ReportView, ResolvePayload};
use crate::models::user::AdminUserResponse;

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    /// Defaults to the pending queue; `all` lists every report.
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/admin/reports
pub async fn list_reports(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ApiQuery(query): ApiQuery<ReportQuery>,
) -> Result<Json<Vec<ReportView>>, ApiError> {
    let status = match query.status.as_deref() {
        None => Some(ReportStatus::Pending),
        Some("all") => None,
        Some(other) => Some(other.parse::<ReportStatus>()?),
    };
    let page = Page::new(query.offset, query.limit);

    Ok(Json(state.reports.list(status, page.offset, page.limit)?))
}

/// POST /api/admin/reports/{id}/resolve
pub async fn resolve_report(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiPath(report_id): ApiPath<i32>,
    ApiJson(payload): ApiJson<ResolvePayload>,
) -> Result<Json<ModerationOutcome>, ApiError> {
    let outcome = state.reports.resolve(report_id, admin.id, payload.action)?;
    Ok(Json(outcome))
}

#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/admin/users
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ApiQuery(query): ApiQuery<UserQuery>,
) -> Result<Json<Vec<AdminUserResponse>>, ApiError> {
    let page = Page::new(query.offset, query.limit);
    let users = state.users.list(page.offset, page.limit)?;
    Ok(Json(users.iter().map(AdminUserResponse::from).collect()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetAdminPayload {
    pub is_admin: bool,
}

/// PUT /api/admin/users/{id}/admin
///
/// Admins cannot revoke their own rights, so there is always one left.
pub async fn set_admin(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiPath(user_id): ApiPath<i32>,
    ApiJson(payload): ApiJson<SetAdminPayload>,
) -> Result<Json<AdminUserResponse>, ApiError> {
    if user_id == admin.id && !payload.is_admin {
        return Err(ApiError::Validation(
            "isAdmin: you cannot revoke your own admin rights".into(),
        ));
    }

    let user = state.users.set_admin(user_id, payload.is_admin)?;
    tracing::info!(
        admin_id = admin.id,
        user_id,
        is_admin = payload.is_admin,
        "Admin rights changed"
    );
    Ok(Json(AdminUserResponse::from(&user)))
}
