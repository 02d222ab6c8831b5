//! Authentication failures and the 401 responses they turn into.

use axum::{Json, response::IntoResponse};
use http::{HeaderValue, StatusCode};
use thiserror::Error;

/// Why a request was refused.
///
/// The `Display` text is the exact message sent to the client in the
/// `{"error": "..."}` body.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// The `Authorization` header is absent or does not start with `Bearer `.
    #[error("Missing Bearer token")]
    MissingToken,

    /// The token validator could not be initialized at startup.
    #[error("Authentication service unavailable")]
    ServiceUnavailable,

    /// The provider rejected the token, or failed while checking it.
    #[error("Invalid token")]
    InvalidToken,

    /// Any other fault raised while deciding.
    #[error("Authentication failed")]
    UnexpectedFault,
}

impl AuthError {
    /// Build the `401 Unauthorized` response for this error.
    ///
    /// The body is `application/json` and `challenge` goes into the
    /// `WWW-Authenticate` header.
    pub fn into_response_with(self, challenge: HeaderValue) -> axum::response::Response {
        (
            StatusCode::UNAUTHORIZED,
            [(http::header::WWW_AUTHENTICATE, challenge)],
            Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::AuthError;
    use http::{HeaderValue, StatusCode};

    #[test]
    fn messages_are_fixed() {
        assert_eq!(AuthError::MissingToken.to_string(), "Missing Bearer token");
        assert_eq!(
            AuthError::ServiceUnavailable.to_string(),
            "Authentication service unavailable"
        );
        assert_eq!(AuthError::InvalidToken.to_string(), "Invalid token");
        assert_eq!(AuthError::UnexpectedFault.to_string(), "Authentication failed");
    }

    #[tokio::test]
    async fn response_is_json_401_with_challenge() {
        let challenge = HeaderValue::from_static("Bearer realm=\"OAuth\"");
        let resp = AuthError::InvalidToken.into_response_with(challenge);

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            resp.headers()[http::header::CONTENT_TYPE],
            "application/json"
        );
        assert_eq!(
            resp.headers()[http::header::WWW_AUTHENTICATE],
            "Bearer realm=\"OAuth\""
        );

        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, serde_json::json!({ "error": "Invalid token" }));
    }
}
