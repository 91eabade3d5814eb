use axum::http::{header, HeaderMap};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use validator::Validate;

use crate::error::ProxyError;

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("identifier pattern is valid")
});

/// Body of a rating submission
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RatingSubmission {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: u8,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 2000, message = "Review is too long"))]
    pub review: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 100, message = "Guest name must be 1-100 characters"))]
    pub guest_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(email(message = "Guest email is invalid"))]
    pub guest_email: Option<String>,
}

impl RatingSubmission {
    /// Both guest fields present and non-blank
    pub fn has_guest_identity(&self) -> bool {
        let filled = |field: &Option<String>| {
            field
                .as_deref()
                .map(|value| !value.trim().is_empty())
                .unwrap_or(false)
        };
        filled(&self.guest_name) && filled(&self.guest_email)
    }
}

/// Request validation utilities
pub struct RequestValidator;

impl RequestValidator {
    /// Path identifiers are interpolated into upstream URLs, so only a safe
    /// alphabet is accepted.
    pub fn validate_identifier(name: &str, value: &str) -> Result<(), ProxyError> {
        if IDENTIFIER.is_match(value) {
            Ok(())
        } else {
            Err(ProxyError::Validation(format!("Invalid {}", name)))
        }
    }

    /// Bearer token from the `Authorization` header, if any
    pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
        headers
            .get(header::AUTHORIZATION)?
            .to_str()
            .ok()?
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }

    pub fn require_bearer(headers: &HeaderMap) -> Result<&str, ProxyError> {
        Self::bearer_token(headers).ok_or(ProxyError::Unauthorized)
    }

    /// A rating needs either a bearer token or a full guest identity.
    pub fn validate_rating_submission(
        submission: &RatingSubmission,
        authenticated: bool,
    ) -> Result<(), ProxyError> {
        if !authenticated && !submission.has_guest_identity() {
            return Err(ProxyError::Unauthorized);
        }

        submission.validate().map_err(|errors| {
            let messages: Vec<String> = errors
                .field_errors()
                .values()
                .flat_map(|errs| errs.iter())
                .map(|err| {
                    err.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| err.code.to_string())
                })
                .collect();
            ProxyError::Validation(messages.join(", "))
        })
    }
}
