//! Adapter around the external identity provider.
//!
//! The provider client is constructed once at startup. If that fails the
//! adapter stays [`ValidatorAdapter::Unavailable`] for the lifetime of the
//! process; nothing retries construction on demand.

use futures::FutureExt;
use std::fmt;
use std::panic::AssertUnwindSafe;

/// Checks an access token against the identity provider.
///
/// Return `Ok(false)` when the provider rejects the token and `Err` when it
/// could not decide; [`TokenValidator`] treats both as an invalid token.
pub trait TokenProvider: Send + Sync + 'static {
    fn validate_access_token(
        &self,
        token: &str,
        options: &ValidationOptions,
    ) -> impl Future<Output = anyhow::Result<bool>> + Send;
}

/// What a token must satisfy, rebuilt from the settings for every request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Required `iss` claim.
    pub issuer: String,
    /// Accepted `aud` values; `None` skips the audience check.
    pub audience: Option<Vec<String>>,
}

/// Settings used to build the provider client.
#[derive(Clone, Default)]
pub struct ProviderSettings {
    /// Issuer / environment URL of the identity provider.
    pub issuer: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Audience tokens must be minted for.
    pub expected_audience: Option<String>,
    /// JWKS endpoint override; derived from the issuer when unset.
    pub jwks_url: Option<String>,
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("issuer", &self.issuer)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "[redacted]"))
            .field("expected_audience", &self.expected_audience)
            .field("jwks_url", &self.jwks_url)
            .finish()
    }
}

/// A provider client bound to the configured issuer and audience.
pub struct TokenValidator<P> {
    provider: P,
    issuer: String,
    audience: Option<String>,
}

impl<P: TokenProvider> TokenValidator<P> {
    pub fn new(provider: P, issuer: impl Into<String>, audience: Option<String>) -> Self {
        Self {
            provider,
            issuer: issuer.into(),
            audience,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn options(&self) -> ValidationOptions {
        ValidationOptions {
            issuer: self.issuer.clone(),
            audience: self.audience.clone().map(|aud| vec![aud]),
        }
    }

    /// Validate `token`. Provider errors and panics become `false`.
    pub async fn validate(&self, token: &str) -> bool {
        let options = self.options();
        tracing::debug!(issuer = %options.issuer, audience = ?options.audience, "validating token");

        let call = self.provider.validate_access_token(token, &options);
        match AssertUnwindSafe(call).catch_unwind().await {
            Ok(Ok(valid)) => valid,
            Ok(Err(err)) => {
                tracing::error!("token validation error: {err:#}");
                false
            }
            Err(_) => {
                tracing::error!("token validation panicked");
                false
            }
        }
    }
}

/// The token validator as seen by the middleware.
pub enum ValidatorAdapter<P> {
    Available(TokenValidator<P>),
    Unavailable,
}

impl<P: TokenProvider> ValidatorAdapter<P> {
    /// Build the provider with `connect`. Any error, or a missing issuer,
    /// leaves the adapter permanently unavailable.
    pub fn initialize<F>(settings: &ProviderSettings, connect: F) -> Self
    where
        F: FnOnce(&ProviderSettings) -> anyhow::Result<P>,
    {
        let Some(issuer) = settings.issuer.clone() else {
            tracing::warn!("identity provider not configured: no issuer URL");
            return Self::Unavailable;
        };
        match connect(settings) {
            Ok(provider) => {
                tracing::info!(%issuer, "identity provider client initialized");
                Self::Available(TokenValidator::new(
                    provider,
                    issuer,
                    settings.expected_audience.clone(),
                ))
            }
            Err(err) => {
                tracing::warn!("identity provider client not available: {err:#}");
                Self::Unavailable
            }
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(String, ValidationOptions)>>,
    }

    impl TokenProvider for Recorder {
        async fn validate_access_token(
            &self,
            token: &str,
            options: &ValidationOptions,
        ) -> anyhow::Result<bool> {
            self.seen
                .lock()
                .unwrap()
                .push((token.to_string(), options.clone()));
            Ok(token == "good")
        }
    }

    struct Failing;

    impl TokenProvider for Failing {
        async fn validate_access_token(
            &self,
            _: &str,
            _: &ValidationOptions,
        ) -> anyhow::Result<bool> {
            Err(anyhow!("introspection endpoint unreachable"))
        }
    }

    struct Panicking;

    impl TokenProvider for Panicking {
        async fn validate_access_token(
            &self,
            _: &str,
            _: &ValidationOptions,
        ) -> anyhow::Result<bool> {
            panic!("provider bug")
        }
    }

    fn settings() -> ProviderSettings {
        ProviderSettings {
            issuer: Some("https://auth.example.com".into()),
            client_id: Some("client".into()),
            client_secret: Some("secret".into()),
            expected_audience: None,
            jwks_url: None,
        }
    }

    #[tokio::test]
    async fn options_carry_issuer_and_audience() {
        let validator = TokenValidator::new(
            Recorder::default(),
            "https://auth.example.com",
            Some("mcp".into()),
        );
        assert!(validator.validate("good").await);
        assert!(!validator.validate("bad").await);

        let seen = validator.provider.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].0, "good");
        assert_eq!(
            seen[0].1,
            ValidationOptions {
                issuer: "https://auth.example.com".into(),
                audience: Some(vec!["mcp".into()]),
            }
        );
    }

    #[test]
    fn no_audience_means_no_audience_check() {
        let validator = TokenValidator::new(Recorder::default(), "https://auth.example.com", None);
        assert_eq!(validator.options().audience, None);
    }

    #[tokio::test]
    async fn provider_error_is_invalid() {
        let validator = TokenValidator::new(Failing, "https://auth.example.com", None);
        assert!(!validator.validate("anything").await);
    }

    #[tokio::test]
    async fn provider_panic_is_invalid() {
        let validator = TokenValidator::new(Panicking, "https://auth.example.com", None);
        assert!(!validator.validate("anything").await);
    }

    #[test]
    fn initialize_available() {
        let adapter = ValidatorAdapter::initialize(&settings(), |_| Ok(Recorder::default()));
        assert!(adapter.is_available());
    }

    #[test]
    fn initialize_failure_is_unavailable() {
        let adapter: ValidatorAdapter<Recorder> =
            ValidatorAdapter::initialize(&settings(), |_| Err(anyhow!("bad credentials")));
        assert!(!adapter.is_available());
    }

    #[test]
    fn missing_issuer_skips_construction() {
        let settings = ProviderSettings {
            issuer: None,
            ..settings()
        };
        let adapter: ValidatorAdapter<Recorder> = ValidatorAdapter::initialize(&settings, |_| {
            panic!("connect must not be called without an issuer")
        });
        assert!(!adapter.is_available());
    }

    #[test]
    fn debug_redacts_secret() {
        let text = format!("{:?}", settings());
        assert!(text.contains("[redacted]"));
        assert!(!text.contains("\"secret\""));
    }
}
