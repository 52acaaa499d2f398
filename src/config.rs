//! Command line and environment configuration.
//!
//! Every flag falls back to an environment variable, and `.env` is loaded
//! before parsing, so a deployment can be configured entirely through the
//! environment.

use chrono::Duration;
use clap::{Args, Parser, Subcommand};
use thiserror::Error;

/// Music release rating service.
#[derive(Debug, Parser)]
#[command(name = "music-rating", version)]
#[command(about = "Rate music releases, leave reviews and curate collections")]
pub struct Cli {
    /// SQLite database file
    #[arg(long, env = "DATABASE_URL", default_value = "music-rating.db", global = true)]
    pub database_url: String,

    #[command(flatten)]
    pub serve: ServeArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the HTTP server (default)
    Serve,

    /// Create a user without going through Google sign-in
    CreateUser {
        /// Google account subject the user will sign in with
        #[arg(long)]
        google_id: String,

        /// Email address
        #[arg(long)]
        email: Option<String>,

        /// Public nickname
        #[arg(short, long)]
        nickname: Option<String>,

        /// Create as admin user
        #[arg(short, long)]
        admin: bool,
    },

    /// Grant or revoke admin rights
    SetAdmin {
        /// Nickname of the user
        #[arg(short, long)]
        nickname: String,

        /// Revoke instead of grant
        #[arg(long)]
        revoke: bool,
    },

    /// List all users
    ListUsers,

    /// Delete expired sessions
    PurgeSessions,
}

/// Settings used by the HTTP server.
#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    /// Server port
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Externally visible base URL, used for the OAuth redirect
    #[arg(long, env = "PUBLIC_URL", default_value = "http://localhost:3000")]
    pub public_url: String,

    /// Secret mixed into stored session ids
    #[arg(long, env = "SESSION_SECRET", hide_env_values = true)]
    pub session_secret: Option<String>,

    /// Session lifetime in days
    #[arg(long, env = "SESSION_TTL_DAYS", default_value_t = 30)]
    pub session_ttl_days: i64,

    /// Mark cookies `Secure` (set when served over HTTPS)
    #[arg(long, env = "SECURE_COOKIES")]
    pub secure_cookies: bool,

    /// Google OAuth client id
    #[arg(long, env = "GOOGLE_CLIENT_ID")]
    pub google_client_id: Option<String>,

    /// Google OAuth client secret
    #[arg(long, env = "GOOGLE_CLIENT_SECRET", hide_env_values = true)]
    pub google_client_secret: Option<String>,
}

/// Minimum length accepted for `SESSION_SECRET`.
pub const MIN_SECRET_LEN: usize = 16;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("SESSION_SECRET must be set")]
    MissingSessionSecret,

    #[error("SESSION_SECRET must be at least {MIN_SECRET_LEN} characters")]
    WeakSessionSecret,

    #[error("SESSION_TTL_DAYS must be positive, got {0}")]
    InvalidSessionTtl(i64),

    #[error("PUBLIC_URL must start with http:// or https://, got '{0}'")]
    InvalidPublicUrl(String),

    #[error("GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET must be set together")]
    PartialGoogleConfig,
}

/// Google OAuth client credentials.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
}

/// Validated server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub public_url: String,
    pub session_secret: String,
    pub session_ttl: Duration,
    pub secure_cookies: bool,
    pub google: Option<GoogleConfig>,
}

impl ServeArgs {
    pub fn into_config(self) -> Result<ServerConfig, ConfigError> {
        let session_secret = self
            .session_secret
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingSessionSecret)?;
        if session_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::WeakSessionSecret);
        }
        if self.session_ttl_days <= 0 {
            return Err(ConfigError::InvalidSessionTtl(self.session_ttl_days));
        }

        let public_url = self.public_url.trim_end_matches('/').to_string();
        if !(public_url.starts_with("http://") || public_url.starts_with("https://")) {
            return Err(ConfigError::InvalidPublicUrl(public_url));
        }

        let google = match (self.google_client_id, self.google_client_secret) {
            (Some(client_id), Some(client_secret)) => Some(GoogleConfig {
                client_id,
                client_secret,
                redirect_url: format!("{public_url}/api/auth/google/callback"),
            }),
            (None, None) => None,
            _ => return Err(ConfigError::PartialGoogleConfig),
        };

        Ok(ServerConfig {
            port: self.port,
            public_url,
            session_secret,
            session_ttl: Duration::days(self.session_ttl_days),
            secure_cookies: self.secure_cookies,
            google,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["music-rating"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_serve_is_default() {
        let cli = parse(&["--session-secret", "0123456789abcdef"]);
        assert!(cli.command.is_none());
        let config = cli.serve.into_config().unwrap();
        assert_eq!(config.session_ttl, Duration::days(30));
        assert!(config.google.is_none());
    }

    #[test]
    fn test_secret_required() {
        let args = ServeArgs {
            port: 3000,
            public_url: "http://localhost:3000".into(),
            session_secret: None,
            session_ttl_days: 30,
            secure_cookies: false,
            google_client_id: None,
            google_client_secret: None,
        };
        assert_eq!(
            args.clone().into_config().unwrap_err(),
            ConfigError::MissingSessionSecret
        );

        let short = ServeArgs {
            session_secret: Some("short".into()),
            ..args
        };
        assert_eq!(short.into_config().unwrap_err(), ConfigError::WeakSessionSecret);
    }

    #[test]
    fn test_google_redirect_uses_public_url() {
        let cli = parse(&[
            "--session-secret",
            "0123456789abcdef",
            "--public-url",
            "https://rate.example.org/",
            "--google-client-id",
            "id",
            "--google-client-secret",
            "secret",
        ]);
        let config = cli.serve.into_config().unwrap();
        assert_eq!(config.public_url, "https://rate.example.org");
        assert_eq!(
            config.google.unwrap().redirect_url,
            "https://rate.example.org/api/auth/google/callback"
        );
    }

    #[test]
    fn test_partial_google_config_rejected() {
        let cli = parse(&[
            "--session-secret",
            "0123456789abcdef",
            "--google-client-id",
            "id",
        ]);
        assert_eq!(
            cli.serve.into_config().unwrap_err(),
            ConfigError::PartialGoogleConfig
        );
    }

    #[test]
    fn test_subcommands_parse() {
        let cli = parse(&["set-admin", "--nickname", "root", "--revoke"]);
        assert!(matches!(
            cli.command,
            Some(Command::SetAdmin { ref nickname, revoke: true }) if nickname == "root"
        ));
    }
}
