//! Route table for the JSON API.

use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::auth::session_layer;
use super::handlers::{
    admin, artists, auth, collections, comments, ratings, releases, system, users,
};
use super::state::AppState;

/// Build the application router with every `/api` route.
pub fn create_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(system::health))
        .route("/csrf-token", get(system::csrf_token))
        .route("/auth/google", get(auth::google_login))
        .route("/auth/google/callback", get(auth::google_callback))
        .route("/auth/me", get(auth::me))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/nickname", put(auth::set_nickname))
        .route("/users/{nickname}", get(users::get_profile))
        .route("/users/{nickname}/ratings", get(users::get_user_ratings))
        .route("/artists", get(artists::list_artists))
        .route("/artists/{id}", get(artists::get_artist))
        .route("/releases", get(releases::list_releases))
        .route("/releases/{id}", get(releases::get_release))
        .route("/releases/{id}/comments", get(releases::list_comments))
        .route(
            "/releases/{id}/rating",
            get(ratings::get_my_rating).put(ratings::put_rating),
        )
        .route("/ratings/{id}", delete(ratings::delete_rating))
        .route(
            "/comments/{id}/reaction",
            put(comments::set_reaction).delete(comments::remove_reaction),
        )
        .route("/comments/{id}/reports", post(comments::report_comment))
        .route("/collections", get(collections::list_collections))
        .route("/collections/{id}", get(collections::get_collection));

    let admin_routes = Router::new()
        .route("/artists", post(artists::create_artist))
        .route(
            "/artists/{id}",
            put(artists::update_artist).delete(artists::delete_artist),
        )
        .route("/releases", post(releases::create_release))
        .route("/releases/import", post(releases::import_releases))
        .route(
            "/releases/{id}",
            put(releases::update_release).delete(releases::delete_release),
        )
        .route("/test-data", delete(releases::purge_test_data))
        .route(
            "/collections",
            get(collections::admin_list_collections).post(collections::create_collection),
        )
        .route(
            "/collections/{id}",
            put(collections::update_collection).delete(collections::delete_collection),
        )
        .route(
            "/collections/{id}/releases",
            put(collections::set_collection_releases),
        )
        .route(
            "/collections/{id}/activate",
            post(collections::activate_collection),
        )
        .route(
            "/collections/{id}/deactivate",
            post(collections::deactivate_collection),
        )
        .route("/reports", get(admin::list_reports))
        .route("/reports/{id}/resolve", post(admin::resolve_report))
        .route("/users", get(admin::list_users))
        .route("/users/{id}/admin", put(admin::set_admin));

    Router::new()
        .nest("/api", public_routes.nest("/admin", admin_routes))
        .layer(middleware::from_fn_with_state(state.clone(), session_layer))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
