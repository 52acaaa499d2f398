//! JSON API over HTTP.

pub mod auth;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod router;
pub mod state;

pub use auth::{AdminUser, AuthSession, CurrentUser, MaybeUser, Poster};
pub use error::ApiError;
pub use router::create_router;
pub use state::AppState;
