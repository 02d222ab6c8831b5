//! Bearer token extraction.
//!
//! Reads `Authorization: Bearer <token>` and returns the trimmed token. An
//! empty token is still a token; deciding whether it is valid is the
//! provider's job.

use super::AuthError;
use http::HeaderMap;

const BEARER_PREFIX: &str = "Bearer ";

/// Pull the Bearer token out of the request headers.
///
/// A missing header, or one without the exact `Bearer ` prefix, is
/// [`AuthError::MissingToken`]. A bare `Bearer` counts as an empty token,
/// since HTTP parsers strip the trailing space of `Bearer `. A header value
/// that is not visible ASCII cannot be read and is
/// [`AuthError::UnexpectedFault`].
pub fn extract_token(headers: &HeaderMap) -> Result<String, AuthError> {
    let Some(value) = headers.get(http::header::AUTHORIZATION) else {
        return Err(AuthError::MissingToken);
    };
    let value = value.to_str().map_err(|_| AuthError::UnexpectedFault)?;
    if value.trim_end() == BEARER_PREFIX.trim_end() {
        return Ok(String::new());
    }
    value
        .strip_prefix(BEARER_PREFIX)
        .map(|token| token.trim().to_string())
        .ok_or(AuthError::MissingToken)
}
