//! # mcpgate-auth
//!
//! Bearer-token authentication for MCP servers built with
//! [rmcp](https://docs.rs/rmcp) and [axum](https://docs.rs/axum).
//!
//! ## Auth Middleware
//!
//! [`AuthLayer`](auth::AuthLayer) guards every route except the public
//! discovery and health paths. Token validation is delegated to an external
//! identity provider through the [`TokenProvider`](auth::TokenProvider)
//! trait, wrapped in a [`ValidatorAdapter`](auth::ValidatorAdapter) that is
//! initialized once at startup.
//!
//! ```rust,ignore
//! use mcpgate_auth::auth::{AuthLayer, ProviderSettings, ValidatorAdapter};
//! use mcpgate_auth::auth::jwt::JwksProvider;
//! use mcpgate_auth::auth::oauth::ChallengeBuilder;
//!
//! let adapter = ValidatorAdapter::initialize(&settings, JwksProvider::connect);
//! let app = axum::Router::new()
//!     .route_service("/", mcp_service)
//!     .layer(AuthLayer::new(adapter, ChallengeBuilder::new("localhost:10000")));
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:10000").await?;
//! axum::serve(listener, app).await?;
//! ```

pub use axum;

pub mod auth;
