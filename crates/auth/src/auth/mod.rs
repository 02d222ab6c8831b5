//! Authentication middleware for MCP servers.
//!
//! [`AuthLayer`] wraps the whole router. For each request it makes exactly
//! one [`AuthDecision`]:
//!
//! 1. Paths equal to `/health` or containing `.well-known` bypass auth.
//! 2. The Bearer token is taken from the `Authorization` header.
//! 3. The token is checked by the [`ValidatorAdapter`].
//! 4. Valid requests are forwarded unchanged, everything else gets a 401
//!    with a JSON body and a `WWW-Authenticate` challenge.
//!
//! A panic anywhere in steps 1-3 is caught and becomes a 401 as well, so a
//! hostile request can never turn into a 500 or slip through unchecked.
//!
//! # Example
//!
//! ```rust,ignore
//! use mcpgate_auth::auth::{AuthLayer, ValidatorAdapter};
//! use mcpgate_auth::auth::jwt::JwksProvider;
//! use mcpgate_auth::auth::oauth::ChallengeBuilder;
//!
//! let adapter = ValidatorAdapter::initialize(&settings, JwksProvider::connect);
//!
//! let app = axum::Router::new()
//!     .route("/health", get(health))
//!     .route_service("/", mcp_service)
//!     .layer(AuthLayer::new(adapter, ChallengeBuilder::new("localhost:10000")));
//! ```

mod bearer;
mod error;
mod validator;

pub mod oauth;

#[cfg(feature = "jwt")]
pub mod jwt;

pub use bearer::extract_token;
pub use error::AuthError;
pub use validator::{
    ProviderSettings, TokenProvider, TokenValidator, ValidationOptions, ValidatorAdapter,
};

use futures::{FutureExt, future::BoxFuture};
use http::{HeaderValue, Request, Response};
use oauth::ChallengeBuilder;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::task::{Context, Poll};

/// Health check path, reachable without a token.
pub const HEALTH_PATH: &str = "/health";

/// Any path containing this segment is a public discovery endpoint.
const WELL_KNOWN_MARKER: &str = ".well-known";

/// Whether `path` is served without authentication.
pub fn is_public_path(path: &str) -> bool {
    path.contains(WELL_KNOWN_MARKER) || path == HEALTH_PATH
}

/// Outcome of authenticating one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthDecision {
    /// Public path, no credentials looked at.
    Bypass,
    /// The token was accepted.
    Forward(String),
    /// Refused, with the challenge computed for this request.
    Reject {
        reason: AuthError,
        challenge: HeaderValue,
    },
}

/// Reads the credential out of the request headers.
pub type TokenExtractor = fn(&http::HeaderMap) -> Result<String, AuthError>;

/// Makes [`AuthDecision`]s. Shared read-only by every request.
pub struct Authorizer<P> {
    validator: ValidatorAdapter<P>,
    challenges: ChallengeBuilder,
    extract: TokenExtractor,
}

impl<P: TokenProvider> Authorizer<P> {
    pub fn new(validator: ValidatorAdapter<P>, challenges: ChallengeBuilder) -> Self {
        Self {
            validator,
            challenges,
            extract: extract_token,
        }
    }

    /// Replace [`extract_token`], e.g. to accept tokens from another header.
    pub fn with_token_extractor(mut self, extract: TokenExtractor) -> Self {
        self.extract = extract;
        self
    }

    pub fn validator(&self) -> &ValidatorAdapter<P> {
        &self.validator
    }

    pub fn challenges(&self) -> &ChallengeBuilder {
        &self.challenges
    }

    /// Decide what to do with a request.
    pub async fn decide(&self, parts: &http::request::Parts) -> AuthDecision {
        let outcome = AssertUnwindSafe(self.evaluate(parts)).catch_unwind().await;
        let reason = match outcome {
            Ok(Ok(None)) => return AuthDecision::Bypass,
            Ok(Ok(Some(token))) => return AuthDecision::Forward(token),
            Ok(Err(reason)) => reason,
            Err(_) => {
                tracing::error!(
                    method = %parts.method,
                    path = %parts.uri.path(),
                    "authentication panicked"
                );
                AuthError::UnexpectedFault
            }
        };
        AuthDecision::Reject {
            reason,
            challenge: self.challenges.header_value(&parts.headers),
        }
    }

    /// `Ok(None)` bypasses, `Ok(Some(token))` forwards.
    async fn evaluate(&self, parts: &http::request::Parts) -> Result<Option<String>, AuthError> {
        let method = &parts.method;
        let path = parts.uri.path();

        log_headers(parts);

        if is_public_path(path) {
            return Ok(None);
        }

        tracing::debug!(%method, path, "authenticating request");
        let token = (self.extract)(&parts.headers).inspect_err(|err| {
            tracing::warn!(%method, path, "{err}");
        })?;
        tracing::debug!(len = token.len(), "token extracted");

        let ValidatorAdapter::Available(validator) = &self.validator else {
            tracing::error!("token validator not available");
            return Err(AuthError::ServiceUnavailable);
        };

        let valid = validator.validate(&token).await;
        tracing::info!(valid, "token validation result");
        if !valid {
            tracing::warn!(
                %method,
                path,
                "token validation failed; check that the issuer and expected audience match the token"
            );
            return Err(AuthError::InvalidToken);
        }

        tracing::info!(%method, path, "authentication successful");
        Ok(Some(token))
    }
}

fn log_headers(parts: &http::request::Parts) {
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return;
    }
    tracing::debug!(method = %parts.method, path = %parts.uri.path(), "request headers");
    for (name, value) in &parts.headers {
        if name == http::header::AUTHORIZATION {
            tracing::debug!(header = %name, value = "[redacted]");
        } else {
            tracing::debug!(header = %name, value = ?value);
        }
    }
}

/// Tower [`Layer`](tower::Layer) that applies [`AuthService`].
pub struct AuthLayer<P> {
    authorizer: Arc<Authorizer<P>>,
}

impl<P: TokenProvider> AuthLayer<P> {
    pub fn new(validator: ValidatorAdapter<P>, challenges: ChallengeBuilder) -> Self {
        Self::from_shared(Arc::new(Authorizer::new(validator, challenges)))
    }

    /// Build from an authorizer that is also used elsewhere.
    pub fn from_shared(authorizer: Arc<Authorizer<P>>) -> Self {
        Self { authorizer }
    }
}

impl<P> Clone for AuthLayer<P> {
    fn clone(&self) -> Self {
        Self {
            authorizer: self.authorizer.clone(),
        }
    }
}

impl<P, S> tower::Layer<S> for AuthLayer<P> {
    type Service = AuthService<P, S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthService {
            authorizer: self.authorizer.clone(),
            inner,
        }
    }
}

/// Tower service that authenticates requests before forwarding them.
pub struct AuthService<P, S> {
    authorizer: Arc<Authorizer<P>>,
    inner: S,
}

impl<P, S: Clone> Clone for AuthService<P, S> {
    fn clone(&self) -> Self {
        Self {
            authorizer: self.authorizer.clone(),
            inner: self.inner.clone(),
        }
    }
}

impl<P, S, B> tower::Service<Request<B>> for AuthService<P, S>
where
    P: TokenProvider,
    S: tower::Service<Request<B>, Response = Response<axum::body::Body>> + Clone + Send + 'static,
    S::Future: Send,
    S::Error: Send,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let authorizer = self.authorizer.clone();
        let mut inner = self.inner.clone();
        // swap to ensure poll_ready state is preserved
        std::mem::swap(&mut self.inner, &mut inner);

        Box::pin(async move {
            let (parts, body) = req.into_parts();

            match authorizer.decide(&parts).await {
                AuthDecision::Bypass | AuthDecision::Forward(_) => {
                    inner.call(Request::from_parts(parts, body)).await
                }
                AuthDecision::Reject { reason, challenge } => {
                    Ok(reason.into_response_with(challenge))
                }
            }
        })
    }
}
