//! Music release rating service library.

pub mod api;
pub mod config;
pub mod crypto;
pub mod db;
pub mod models;
pub mod oauth;
