//! Google sign-in over the OAuth 2.0 authorization code flow.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::GoogleConfig;

const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";
const SCOPES: &str = "openid email";

/// Errors from the identity provider.
#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Provider rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Unexpected provider response: {0}")]
    InvalidResponse(String),
}

/// The account a sign-in resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Identity {
    /// Stable account id (`sub`).
    #[serde(rename = "sub")]
    pub subject: String,
    pub email: Option<String>,
}

/// An external identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Where to send the browser to start signing in.
    fn authorize_url(&self, state: &str) -> String;

    /// Exchange an authorization code for the signed-in identity.
    async fn resolve(&self, code: &str) -> Result<Identity, OAuthError>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Google as an [`IdentityProvider`].
pub struct GoogleOAuth {
    http: Client,
    config: GoogleConfig,
}

impl GoogleOAuth {
    pub fn new(config: GoogleConfig) -> Result<Self, OAuthError> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;
        Ok(Self { http, config })
    }

    async fn exchange_code(&self, code: &str) -> Result<String, OAuthError> {
        let response = self
            .http
            .post(TOKEN_URL)
            .form(&[
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.redirect_url.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = %status, "Token exchange rejected");
            return Err(OAuthError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| OAuthError::InvalidResponse(format!("token response: {e}")))?;
        Ok(token.access_token)
    }
}

#[async_trait]
impl IdentityProvider for GoogleOAuth {
    fn authorize_url(&self, state: &str) -> String {
        format!(
            "{AUTHORIZE_URL}?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}&prompt=select_account",
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.redirect_url),
            urlencoding::encode(SCOPES),
            urlencoding::encode(state),
        )
    }

    async fn resolve(&self, code: &str) -> Result<Identity, OAuthError> {
        let access_token = self.exchange_code(code).await?;

        let response = self
            .http
            .get(USERINFO_URL)
            .bearer_auth(&access_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(OAuthError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let identity: Identity = response
            .json()
            .await
            .map_err(|e| OAuthError::InvalidResponse(format!("userinfo: {e}")))?;
        if identity.subject.is_empty() {
            return Err(OAuthError::InvalidResponse("empty subject".into()));
        }

        debug!(subject = %identity.subject, "Google identity resolved");
        Ok(identity)
    }
}
