//! OAuth discovery documents.
//!
//! - Protected Resource Metadata ([RFC 9728](https://datatracker.ietf.org/doc/html/rfc9728)),
//!   served by the MCP server itself.
//! - Authorization Server Metadata ([RFC 8414](https://datatracker.ietf.org/doc/html/rfc8414))
//!   and OpenID Connect Discovery, describing the external identity provider
//!   whose endpoints live under the issuer URL.

use serde::{Deserialize, Serialize};

const SCOPES: [&str; 3] = ["openid", "profile", "email"];
const CLIENT_AUTH_METHODS: [&str; 2] = ["client_secret_basic", "client_secret_post"];

fn strings<const N: usize>(values: [&str; N]) -> Vec<String> {
    values.into_iter().map(String::from).collect()
}

fn endpoint(issuer: &str, path: &str) -> String {
    format!("{}{path}", issuer.trim_end_matches('/'))
}

/// JWKS location advertised for an issuer.
pub fn jwks_uri(issuer: &str) -> String {
    endpoint(issuer, "/.well-known/jwks.json")
}

/// OAuth 2.0 Protected Resource Metadata ([RFC 9728](https://datatracker.ietf.org/doc/html/rfc9728)).
///
/// MCP servers MUST include the `authorization_servers` field containing at
/// least one authorization server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProtectedResourceMetadata {
    /// The resource identifier, i.e. the canonical URI of this MCP server.
    pub resource: String,

    /// Authorization server(s) that can issue tokens for this resource.
    pub authorization_servers: Vec<String>,

    /// Scopes supported by this resource.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scopes_supported: Option<Vec<String>>,

    /// Bearer token methods supported (e.g., `["header"]`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bearer_methods_supported: Option<Vec<String>>,

    /// URL of the resource documentation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_documentation: Option<String>,
}

impl ProtectedResourceMetadata {
    /// Metadata for `resource`, protected by tokens from `issuer` presented
    /// in the `Authorization` header.
    pub fn new(resource: impl Into<String>, issuer: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            authorization_servers: vec![issuer.into()],
            scopes_supported: None,
            bearer_methods_supported: Some(vec!["header".into()]),
            resource_documentation: None,
        }
    }
}

/// OAuth 2.0 Authorization Server Metadata ([RFC 8414](https://datatracker.ietf.org/doc/html/rfc8414)).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthorizationServerMetadata {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub jwks_uri: String,
    pub response_types_supported: Vec<String>,
    pub grant_types_supported: Vec<String>,
    pub token_endpoint_auth_methods_supported: Vec<String>,
    pub scopes_supported: Vec<String>,
}

impl AuthorizationServerMetadata {
    pub fn from_issuer(issuer: &str) -> Self {
        Self {
            issuer: issuer.to_string(),
            authorization_endpoint: endpoint(issuer, "/oauth/authorize"),
            token_endpoint: endpoint(issuer, "/oauth/token"),
            jwks_uri: jwks_uri(issuer),
            response_types_supported: strings(["code", "token"]),
            grant_types_supported: strings([
                "authorization_code",
                "client_credentials",
                "refresh_token",
            ]),
            token_endpoint_auth_methods_supported: strings(CLIENT_AUTH_METHODS),
            scopes_supported: strings(SCOPES),
        }
    }
}

/// OpenID Connect Discovery 1.0 provider configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OpenIdConfiguration {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub userinfo_endpoint: String,
    pub jwks_uri: String,
    pub response_types_supported: Vec<String>,
    pub subject_types_supported: Vec<String>,
    pub id_token_signing_alg_values_supported: Vec<String>,
    pub scopes_supported: Vec<String>,
    pub token_endpoint_auth_methods_supported: Vec<String>,
    pub claims_supported: Vec<String>,
}

impl OpenIdConfiguration {
    pub fn from_issuer(issuer: &str) -> Self {
        Self {
            issuer: issuer.to_string(),
            authorization_endpoint: endpoint(issuer, "/oauth/authorize"),
            token_endpoint: endpoint(issuer, "/oauth/token"),
            userinfo_endpoint: endpoint(issuer, "/oauth/userinfo"),
            jwks_uri: jwks_uri(issuer),
            response_types_supported: strings([
                "code",
                "id_token",
                "token",
                "id_token token",
                "code id_token",
                "code token",
                "code id_token token",
            ]),
            subject_types_supported: strings(["public"]),
            id_token_signing_alg_values_supported: strings(["RS256"]),
            scopes_supported: strings(SCOPES),
            token_endpoint_auth_methods_supported: strings(CLIENT_AUTH_METHODS),
            claims_supported: strings([
                "sub",
                "iss",
                "aud",
                "exp",
                "iat",
                "auth_time",
                "nonce",
                "email",
                "email_verified",
                "name",
                "picture",
            ]),
        }
    }
}
