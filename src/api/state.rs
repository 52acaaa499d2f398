//! Shared application state handed to every handler.

use std::sync::Arc;

use chrono::Duration;

use super::auth::CookieSettings;
use crate::db::{
    ArtistRepository, CollectionRepository, DbPool, RatingRepository, ReactionRepository,
    ReleaseRepository, ReportRepository, SessionRepository, UserRepository,
};
use crate::oauth::IdentityProvider;

/// Repositories and settings used by the HTTP layer.
///
/// Repositories are cheap to clone; each holds a handle to the same pool.
#[derive(Clone)]
pub struct AppState {
    pub users: UserRepository,
    pub sessions: SessionRepository,
    pub artists: ArtistRepository,
    pub releases: ReleaseRepository,
    pub ratings: RatingRepository,
    pub reactions: ReactionRepository,
    pub reports: ReportRepository,
    pub collections: CollectionRepository,
    /// `None` when Google sign-in is not configured.
    pub identity: Option<Arc<dyn IdentityProvider>>,
    pub cookies: CookieSettings,
}

impl AppState {
    pub fn new(
        pool: DbPool,
        session_secret: &str,
        session_ttl: Duration,
        secure_cookies: bool,
        identity: Option<Arc<dyn IdentityProvider>>,
    ) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            sessions: SessionRepository::new(pool.clone(), session_secret, session_ttl),
            artists: ArtistRepository::new(pool.clone()),
            releases: ReleaseRepository::new(pool.clone()),
            ratings: RatingRepository::new(pool.clone()),
            reactions: ReactionRepository::new(pool.clone()),
            reports: ReportRepository::new(pool.clone()),
            collections: CollectionRepository::new(pool),
            identity,
            cookies: CookieSettings {
                secure: secure_cookies,
                session_max_age: session_ttl.num_seconds(),
            },
        }
    }
}
