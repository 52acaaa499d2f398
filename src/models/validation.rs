//! Field validation shared by the domain models.

use thiserror::Error;
use url::Url;

/// A request field failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Trim a required text field and check its length in characters.
pub fn required_text(
    field: &'static str,
    raw: &str,
    min: usize,
    max: usize,
) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    let len = trimmed.chars().count();
    if len < min {
        return Err(if min <= 1 {
            ValidationError::new(field, "must not be empty")
        } else {
            ValidationError::new(field, format!("must be at least {min} characters"))
        });
    }
    if len > max {
        return Err(ValidationError::new(
            field,
            format!("must be at most {max} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

/// Trim an optional text field; blank values become `None`.
pub fn optional_text(
    field: &'static str,
    raw: Option<String>,
    max: usize,
) -> Result<Option<String>, ValidationError> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) if text.chars().count() > max => Err(ValidationError::new(
            field,
            format!("must be at most {max} characters"),
        )),
        Some(text) => Ok(Some(text.to_string())),
    }
}

/// Optional link that must be an absolute http(s) URL with a host.
///
/// Stored in the normalized form produced by the parser.
pub fn optional_url(
    field: &'static str,
    raw: Option<String>,
) -> Result<Option<String>, ValidationError> {
    let Some(raw) = optional_text(field, raw, 2048)? else {
        return Ok(None);
    };
    let invalid = || ValidationError::new(field, "must be an http(s) URL");

    let url = Url::parse(&raw).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none_or(str::is_empty) {
        return Err(invalid());
    }
    Ok(Some(url.into()))
}
