//! Domain models for the rating service.

pub mod catalog;
pub mod collection;
pub mod rating;
pub mod report;
pub mod user;
pub mod validation;

pub use catalog::{Artist, Release, ReleaseStats, ReleaseSummary, ReleaseType};
pub use collection::{Collection, MIN_ACTIVE_RELEASES};
pub use rating::{Rating, ReactionKind, Score};
pub use report::{ModerationAction, ModerationOutcome, Report, ReportStatus, Resolution};
pub use user::{Nickname, User};
pub use validation::ValidationError;
