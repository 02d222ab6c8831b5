//! Process configuration, read once at startup from flags or the
//! environment (a `.env` file is loaded first by the binary).

use clap::Parser;
use mcpgate_auth::auth::ProviderSettings;

/// OAuth-protected MCP gateway.
#[derive(Parser, Clone)]
#[command(name = "mcpgate", version, about)]
pub struct Config {
    /// Name reported by the health check and the MCP handshake.
    #[arg(long, env = "SERVER_NAME", default_value = "mcpgate")]
    pub server_name: String,

    /// Version reported by the health check and the MCP handshake.
    #[arg(long, env = "SERVER_VERSION", default_value = env!("CARGO_PKG_VERSION"))]
    pub server_version: String,

    /// Interface to listen on.
    #[arg(long, env = "BIND_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on; also the port in the fallback challenge host.
    #[arg(long, env = "PORT", default_value_t = 10000)]
    pub port: u16,

    /// Identity provider environment URL; also the expected token issuer.
    #[arg(long = "env-url", env = "SK_ENV_URL")]
    pub issuer: Option<String>,

    #[arg(long, env = "SK_CLIENT_ID")]
    pub client_id: Option<String>,

    #[arg(long, env = "SK_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Audience access tokens must be issued for. Unset disables the check.
    #[arg(long, env = "EXPECTED_AUDIENCE")]
    pub expected_audience: Option<String>,

    /// JWKS endpoint, defaults to `<env-url>/.well-known/jwks.json`.
    #[arg(long, env = "SK_JWKS_URL")]
    pub jwks_url: Option<String>,

    /// Log level or filter directive; `RUST_LOG` takes precedence.
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty()).map(String::from)
}

impl Config {
    /// The configured issuer, if any.
    pub fn issuer(&self) -> Option<String> {
        non_empty(&self.issuer)
    }

    pub fn provider_settings(&self) -> ProviderSettings {
        ProviderSettings {
            issuer: self.issuer(),
            client_id: non_empty(&self.client_id),
            client_secret: non_empty(&self.client_secret),
            expected_audience: non_empty(&self.expected_audience),
            jwks_url: non_empty(&self.jwks_url),
        }
    }

    /// Host used in challenges when a request names none.
    pub fn default_host(&self) -> String {
        format!("localhost:{}", self.port)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// `tracing` filter directive for `LOG_LEVEL`.
    ///
    /// Case-insensitive; the `WARNING`, `CRITICAL` and `FATAL` spellings map
    /// to `warn` and `error`. Anything else is passed through as a directive.
    pub fn log_directive(&self) -> String {
        let level = self.log_level.trim().to_lowercase();
        match level.as_str() {
            "warning" => "warn".into(),
            "critical" | "fatal" => "error".into(),
            _ => level,
        }
    }
}
