//! Database module for SQLite persistence.

pub mod connection;
pub mod repository;
pub mod schema;

pub use connection::{DbConfig, DbConn, DbPool, in_memory_pool, run_migrations};
pub use repository::{
    ArtistRepository, CollectionRepository, NewUser, RatingRepository, ReactionRepository,
    ReleaseRepository, RepoError, ReportRepository, Session, SessionRepository, UserRepository,
};
