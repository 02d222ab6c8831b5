//! JWT access-token validation against the identity provider's JWKS.
//!
//! Implements [`TokenProvider`](super::TokenProvider). Signatures are
//! verified with keys from the issuer's JWKS endpoint, which is fetched on
//! first use and refetched when a token names an unknown `kid` (key
//! rotation), at most once per [`DEFAULT_MIN_REFRESH_INTERVAL`]. When a key
//! carries an `alg`, tokens must be signed with exactly that algorithm.
//! Validation results are never cached.
//!
//! Requires the `jwt` feature.
//!
//! ```rust,ignore
//! use mcpgate_auth::auth::{ProviderSettings, ValidatorAdapter, jwt::JwksProvider};
//!
//! let settings = ProviderSettings {
//!     issuer: Some("https://auth.example.com".into()),
//!     client_id: Some("skc_123".into()),
//!     client_secret: Some("secret".into()),
//!     ..Default::default()
//! };
//! let adapter = ValidatorAdapter::initialize(&settings, JwksProvider::connect);
//! ```

use crate::auth::oauth::jwks_uri;
use crate::auth::{ProviderSettings, TokenProvider, ValidationOptions};
use anyhow::{Context, Result, anyhow, bail};
use jsonwebtoken::jwk::{JwkSet, KeyAlgorithm};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Shortest time between two JWKS fetches triggered by unknown `kid`s.
pub const DEFAULT_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Default)]
struct JwksCache {
    keys: Option<JwkSet>,
    fetched_at: Option<Instant>,
}

impl JwksCache {
    fn key(&self, kid: &str) -> Result<Option<VerifyingKey>> {
        let Some(jwk) = self.keys.as_ref().and_then(|set| set.find(kid)) else {
            return Ok(None);
        };
        Ok(Some(VerifyingKey {
            key: DecodingKey::from_jwk(jwk).context("invalid JWK")?,
            algorithm: jwk.common.key_algorithm,
        }))
    }
}

/// A JWKS entry ready for signature checks.
struct VerifyingKey {
    key: DecodingKey,
    /// Algorithm the JWKS pins for this key, if any.
    algorithm: Option<KeyAlgorithm>,
}

impl VerifyingKey {
    /// The algorithm to verify with, or `None` if the token's `alg` is not
    /// allowed for this key.
    fn algorithm_for(&self, token_alg: Algorithm) -> Option<Algorithm> {
        match self.algorithm {
            None => Some(token_alg),
            Some(pinned) => signing_algorithm(pinned).filter(|alg| *alg == token_alg),
        }
    }
}

/// Signature algorithm named by a JWK `alg`; `None` for encryption-only keys.
fn signing_algorithm(alg: KeyAlgorithm) -> Option<Algorithm> {
    Some(match alg {
        KeyAlgorithm::HS256 => Algorithm::HS256,
        KeyAlgorithm::HS384 => Algorithm::HS384,
        KeyAlgorithm::HS512 => Algorithm::HS512,
        KeyAlgorithm::ES256 => Algorithm::ES256,
        KeyAlgorithm::ES384 => Algorithm::ES384,
        KeyAlgorithm::RS256 => Algorithm::RS256,
        KeyAlgorithm::RS384 => Algorithm::RS384,
        KeyAlgorithm::RS512 => Algorithm::RS512,
        KeyAlgorithm::PS256 => Algorithm::PS256,
        KeyAlgorithm::PS384 => Algorithm::PS384,
        KeyAlgorithm::PS512 => Algorithm::PS512,
        KeyAlgorithm::EdDSA => Algorithm::EdDSA,
        _ => return None,
    })
}

struct JwksProviderInner {
    http: reqwest::Client,
    client_id: String,
    jwks_url: String,
    jwks: RwLock<JwksCache>,
}

/// Identity provider client that validates JWT access tokens locally.
#[derive(Clone)]
pub struct JwksProvider {
    inner: Arc<JwksProviderInner>,
    min_refresh_interval: Duration,
}

fn required<'a>(value: &'a Option<String>, what: &str) -> Result<&'a str> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| anyhow!("{what} is not configured"))
}

impl JwksProvider {
    /// Build a client bound to the configured issuer and credentials.
    ///
    /// Fails if the issuer is not an absolute http(s) URL or the client id
    /// or secret is missing. No network I/O happens here.
    pub fn connect(settings: &ProviderSettings) -> Result<Self> {
        let issuer = required(&settings.issuer, "issuer URL")?;
        let url = reqwest::Url::parse(issuer)
            .with_context(|| format!("invalid issuer URL: {issuer}"))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("issuer URL must use http or https: {issuer}");
        }
        let client_id = required(&settings.client_id, "client id")?;
        required(&settings.client_secret, "client secret")?;

        let jwks_url = match settings.jwks_url.as_deref().filter(|v| !v.is_empty()) {
            Some(url) => url.to_string(),
            None => jwks_uri(issuer),
        };
        reqwest::Url::parse(&jwks_url).with_context(|| format!("invalid JWKS URL: {jwks_url}"))?;

        let http = reqwest::Client::builder()
            .user_agent(concat!("mcpgate-auth/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            inner: Arc::new(JwksProviderInner {
                http,
                client_id: client_id.to_string(),
                jwks_url,
                jwks: RwLock::new(JwksCache::default()),
            }),
            min_refresh_interval: DEFAULT_MIN_REFRESH_INTERVAL,
        })
    }

    /// Limit how often unknown `kid`s may trigger a JWKS fetch.
    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    pub fn client_id(&self) -> &str {
        &self.inner.client_id
    }

    pub fn jwks_url(&self) -> &str {
        &self.inner.jwks_url
    }

    /// Refresh the JWKS from the configured endpoint.
    pub async fn refresh_jwks(&self) -> Result<()> {
        let mut cache = self.inner.jwks.write().await;
        self.refresh_locked(&mut cache).await
    }

    async fn refresh_locked(&self, cache: &mut JwksCache) -> Result<()> {
        let keys = fetch_jwks(&self.inner.http, &self.inner.jwks_url).await?;
        cache.keys = Some(keys);
        cache.fetched_at = Some(Instant::now());
        Ok(())
    }

    async fn verifying_key(&self, kid: &str) -> Result<Option<VerifyingKey>> {
        if let Some(key) = self.inner.jwks.read().await.key(kid)? {
            return Ok(Some(key));
        }
        // Not loaded yet, or the key was rotated in after the last fetch.
        // Refreshes are serialized by the write lock.
        let mut cache = self.inner.jwks.write().await;
        if let Some(key) = cache.key(kid)? {
            return Ok(Some(key));
        }
        let recent = cache
            .fetched_at
            .is_some_and(|at| at.elapsed() < self.min_refresh_interval);
        if recent {
            tracing::debug!(kid, "JWKS fetched recently, not refetching");
            return Ok(None);
        }
        self.refresh_locked(&mut cache)
            .await
            .context("JWKS refresh failed")?;
        cache.key(kid)
    }
}

impl TokenProvider for JwksProvider {
    async fn validate_access_token(
        &self,
        token: &str,
        options: &ValidationOptions,
    ) -> Result<bool> {
        let header = match decode_header(token) {
            Ok(header) => header,
            Err(e) => {
                tracing::debug!("malformed JWT: {e}");
                return Ok(false);
            }
        };
        let Some(kid) = header.kid.as_deref() else {
            tracing::debug!("JWT missing kid header");
            return Ok(false);
        };
        let Some(key) = self.verifying_key(kid).await? else {
            tracing::debug!(kid, "no matching key in JWKS");
            return Ok(false);
        };
        let Some(algorithm) = key.algorithm_for(header.alg) else {
            tracing::debug!(kid, alg = ?header.alg, "JWT algorithm not allowed for key");
            return Ok(false);
        };

        let mut validation = Validation::new(algorithm);
        validation.set_issuer(&[&options.issuer]);
        match &options.audience {
            Some(audience) => validation.set_audience(audience.as_slice()),
            None => validation.validate_aud = false,
        }

        match decode::<serde_json::Value>(token, &key.key, &validation) {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::debug!(kid, "JWT rejected: {e}");
                Ok(false)
            }
        }
    }
}

async fn fetch_jwks(http: &reqwest::Client, url: &str) -> Result<JwkSet> {
    let resp = http
        .get(url)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .context("failed to fetch JWKS")?;
    let jwks = resp
        .json::<JwkSet>()
        .await
        .context("failed to parse JWKS")?;
    tracing::debug!(url, keys = jwks.keys.len(), "fetched JWKS");
    Ok(jwks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{Algorithm, EncodingKey, Header, encode, get_current_timestamp};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const SECRET: &[u8] = b"mcpgate-test-signing-secret-01234567";
    const SECRET_B64: &str = "bWNwZ2F0ZS10ZXN0LXNpZ25pbmctc2VjcmV0LTAxMjM0NTY3";

    fn settings(issuer: &str) -> ProviderSettings {
        ProviderSettings {
            issuer: Some(issuer.into()),
            client_id: Some("skc_test".into()),
            client_secret: Some("test-secret".into()),
            expected_audience: None,
            jwks_url: None,
        }
    }

    /// Serve a JWKS holding one HMAC key with id `k1`.
    async fn serve_jwks() -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let body = serde_json::json!({
            "keys": [{ "kty": "oct", "kid": "k1", "alg": "HS256", "k": SECRET_B64 }]
        });
        let app = axum::Router::new().route(
            "/.well-known/jwks.json",
            axum::routing::get(move || {
                let counter = counter.clone();
                let body = body.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    axum::Json(body)
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), hits)
    }

    fn token(kid: &str, claims: serde_json::Value) -> String {
        token_with(Algorithm::HS256, kid, claims)
    }

    fn token_with(alg: Algorithm, kid: &str, claims: serde_json::Value) -> String {
        let mut header = Header::new(alg);
        header.kid = Some(kid.into());
        encode(&header, &claims, &EncodingKey::from_secret(SECRET)).unwrap()
    }

    fn claims(issuer: &str, audience: &str) -> serde_json::Value {
        serde_json::json!({
            "sub": "user-1",
            "iss": issuer,
            "aud": audience,
            "exp": get_current_timestamp() + 3600,
        })
    }

    fn options(issuer: &str, audience: Option<&str>) -> ValidationOptions {
        ValidationOptions {
            issuer: issuer.into(),
            audience: audience.map(|a| vec![a.to_string()]),
        }
    }

    #[test]
    fn connect_derives_jwks_url() {
        let provider = JwksProvider::connect(&settings("https://auth.example.com/")).unwrap();
        assert_eq!(
            provider.jwks_url(),
            "https://auth.example.com/.well-known/jwks.json"
        );
        assert_eq!(provider.client_id(), "skc_test");
        assert_eq!(provider.min_refresh_interval, DEFAULT_MIN_REFRESH_INTERVAL);
    }

    #[test]
    fn connect_honours_jwks_override() {
        let settings = ProviderSettings {
            jwks_url: Some("https://auth.example.com/keys".into()),
            ..settings("https://auth.example.com")
        };
        let provider = JwksProvider::connect(&settings).unwrap();
        assert_eq!(provider.jwks_url(), "https://auth.example.com/keys");
    }

    #[test]
    fn connect_rejects_bad_settings() {
        let cases = [
            ProviderSettings {
                issuer: None,
                ..settings("https://auth.example.com")
            },
            settings("not a url"),
            settings("ftp://auth.example.com"),
            ProviderSettings {
                client_id: Some(String::new()),
                ..settings("https://auth.example.com")
            },
            ProviderSettings {
                client_secret: None,
                ..settings("https://auth.example.com")
            },
        ];
        for case in cases {
            assert!(JwksProvider::connect(&case).is_err(), "{case:?}");
        }
    }

    #[tokio::test]
    async fn accepts_signed_token_and_fetches_once() {
        let (issuer, hits) = serve_jwks().await;
        let provider = JwksProvider::connect(&settings(&issuer)).unwrap();
        let opts = options(&issuer, Some("mcp-server"));
        let jwt = token("k1", claims(&issuer, "mcp-server"));

        assert!(provider.validate_access_token(&jwt, &opts).await.unwrap());
        assert!(provider.validate_access_token(&jwt, &opts).await.unwrap());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn wrong_issuer_or_audience_is_false() {
        let (issuer, _) = serve_jwks().await;
        let provider = JwksProvider::connect(&settings(&issuer)).unwrap();

        let foreign = token("k1", claims("https://evil.example.com", "mcp-server"));
        assert!(
            !provider
                .validate_access_token(&foreign, &options(&issuer, None))
                .await
                .unwrap()
        );

        let other_aud = token("k1", claims(&issuer, "another-api"));
        assert!(
            !provider
                .validate_access_token(&other_aud, &options(&issuer, Some("mcp-server")))
                .await
                .unwrap()
        );
        // Without an expected audience the aud claim is not checked.
        assert!(
            provider
                .validate_access_token(&other_aud, &options(&issuer, None))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn expired_token_is_false() {
        let (issuer, _) = serve_jwks().await;
        let provider = JwksProvider::connect(&settings(&issuer)).unwrap();
        let jwt = token(
            "k1",
            serde_json::json!({ "sub": "u", "iss": issuer, "exp": get_current_timestamp() - 3600 }),
        );
        assert!(
            !provider
                .validate_access_token(&jwt, &options(&issuer, None))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn unknown_kid_refetches_then_fails() {
        let (issuer, hits) = serve_jwks().await;
        let provider = JwksProvider::connect(&settings(&issuer))
            .unwrap()
            .with_min_refresh_interval(Duration::ZERO);
        let opts = options(&issuer, None);

        let good = token("k1", claims(&issuer, "x"));
        assert!(provider.validate_access_token(&good, &opts).await.unwrap());

        let rotated = token("k2", claims(&issuer, "x"));
        assert!(!provider.validate_access_token(&rotated, &opts).await.unwrap());
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unknown_kids_cannot_force_repeated_fetches() {
        let (issuer, hits) = serve_jwks().await;
        let provider = JwksProvider::connect(&settings(&issuer)).unwrap();
        let opts = options(&issuer, None);

        for kid in ["k2", "k3", "k4", "k5"] {
            let forged = token(kid, claims(&issuer, "x"));
            assert!(!provider.validate_access_token(&forged, &opts).await.unwrap());
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let good = token("k1", claims(&issuer, "x"));
        assert!(provider.validate_access_token(&good, &opts).await.unwrap());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn algorithm_is_pinned_by_the_key() {
        let (issuer, _) = serve_jwks().await;
        let provider = JwksProvider::connect(&settings(&issuer)).unwrap();
        let opts = options(&issuer, None);

        // Same secret, but the JWKS says k1 is HS256 only.
        let hs384 = token_with(Algorithm::HS384, "k1", claims(&issuer, "x"));
        assert!(!provider.validate_access_token(&hs384, &opts).await.unwrap());

        let hs256 = token_with(Algorithm::HS256, "k1", claims(&issuer, "x"));
        assert!(provider.validate_access_token(&hs256, &opts).await.unwrap());
    }

    #[test]
    fn encryption_keys_cannot_verify() {
        assert_eq!(signing_algorithm(KeyAlgorithm::RSA_OAEP), None);
        assert_eq!(signing_algorithm(KeyAlgorithm::RS256), Some(Algorithm::RS256));
    }

    #[tokio::test]
    async fn garbage_is_false_without_network() {
        let (issuer, hits) = serve_jwks().await;
        let provider = JwksProvider::connect(&settings(&issuer)).unwrap();
        let opts = options(&issuer, None);
        for junk in ["", "not-a-jwt", "a.b.c"] {
            assert!(!provider.validate_access_token(junk, &opts).await.unwrap());
        }
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unreachable_jwks_is_an_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let issuer = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let provider = JwksProvider::connect(&settings(&issuer)).unwrap();
        let jwt = token("k1", claims(&issuer, "x"));
        assert!(
            provider
                .validate_access_token(&jwt, &options(&issuer, None))
                .await
                .is_err()
        );
    }
}
