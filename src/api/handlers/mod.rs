//! HTTP handlers, grouped by resource.

pub mod admin;
pub mod artists;
pub mod auth;
pub mod collections;
pub mod comments;
pub mod ratings;
pub mod releases;
pub mod system;
pub mod users;
