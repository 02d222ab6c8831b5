//! HTTP surface of the gateway.
//!
//! Discovery documents and the health check are public. The MCP Streamable
//! HTTP service is mounted at `/` only and needs a valid Bearer token; any
//! other path is a 404.

use crate::config::Config;
use crate::greet::GreetServer;
use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use mcpgate_auth::auth::oauth::{
    AuthorizationServerMetadata, ChallengeBuilder, OpenIdConfiguration, PROTECTED_RESOURCE_PATH,
    ProtectedResourceMetadata,
};
use mcpgate_auth::auth::{AuthLayer, HEALTH_PATH, TokenProvider, ValidatorAdapter};
use rmcp::transport::streamable_http_server::{
    StreamableHttpServerConfig, StreamableHttpService, session::local::LocalSessionManager,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub const AUTHORIZATION_SERVER_PATH: &str = "/.well-known/oauth-authorization-server";
pub const OPENID_CONFIGURATION_PATH: &str = "/.well-known/openid-configuration";

/// Read-only data the public handlers need.
struct RouteState {
    server_name: String,
    server_version: String,
    issuer: Option<String>,
    challenges: ChallengeBuilder,
}

type SharedState = Arc<RouteState>;

#[derive(Serialize)]
struct Health<'a> {
    status: &'static str,
    server: &'a str,
    version: &'a str,
}

/// Build the full application: routes, MCP service, auth, CORS and tracing.
pub fn router<P: TokenProvider>(config: &Config, validator: ValidatorAdapter<P>) -> Router {
    let challenges = ChallengeBuilder::new(config.default_host());
    let state = Arc::new(RouteState {
        server_name: config.server_name.clone(),
        server_version: config.server_version.clone(),
        issuer: config.issuer(),
        challenges: challenges.clone(),
    });

    Router::new()
        .route(PROTECTED_RESOURCE_PATH, get(protected_resource))
        .route(AUTHORIZATION_SERVER_PATH, get(authorization_server))
        .route(OPENID_CONFIGURATION_PATH, get(openid_configuration))
        .route(HEALTH_PATH, get(health))
        .route_service("/", mcp_service(config))
        .with_state(state)
        .layer(AuthLayer::new(validator, challenges))
        .layer(cors())
        .layer(TraceLayer::new_for_http())
}

fn mcp_service(config: &Config) -> StreamableHttpService<GreetServer, LocalSessionManager> {
    let name = config.server_name.clone();
    let version = config.server_version.clone();
    StreamableHttpService::new(
        move || Ok(GreetServer::new(name.clone(), version.clone())),
        LocalSessionManager::default().into(),
        StreamableHttpServerConfig {
            stateful_mode: false,
            ..Default::default()
        },
    )
}

/// Any origin, with credentials, so browser-based MCP clients can read the
/// challenge header.
fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_credentials(true)
        .expose_headers([header::WWW_AUTHENTICATE])
        .max_age(Duration::from_secs(86400))
}

fn not_configured(document: &str) -> Response {
    tracing::warn!("identity provider URL not configured for {document}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": "Authorization server not configured" })),
    )
        .into_response()
}

async fn protected_resource(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    let Some(issuer) = state.issuer.as_deref() else {
        return not_configured("protected resource metadata");
    };
    let resource = state.challenges.base_url(&headers);
    tracing::info!(%resource, "protected resource metadata requested");
    Json(ProtectedResourceMetadata::new(resource, issuer)).into_response()
}

async fn authorization_server(State(state): State<SharedState>) -> Response {
    let Some(issuer) = state.issuer.as_deref() else {
        return not_configured("authorization server metadata");
    };
    tracing::info!(issuer, "authorization server metadata requested");
    Json(AuthorizationServerMetadata::from_issuer(issuer)).into_response()
}

async fn openid_configuration(State(state): State<SharedState>) -> Response {
    let Some(issuer) = state.issuer.as_deref() else {
        return not_configured("OpenID configuration");
    };
    tracing::info!(issuer, "OpenID configuration requested");
    Json(OpenIdConfiguration::from_issuer(issuer)).into_response()
}

async fn health(State(state): State<SharedState>) -> Response {
    Json(Health {
        status: "healthy",
        server: &state.server_name,
        version: &state.server_version,
    })
    .into_response()
}
