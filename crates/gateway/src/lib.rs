//! OAuth-protected MCP gateway.
//!
//! Serves an MCP tool server over Streamable HTTP at `/`, alongside OAuth
//! discovery documents under `/.well-known/` and a `/health` check. Every
//! other request must carry a Bearer token accepted by the identity
//! provider, see [`mcpgate_auth::auth`].

pub mod config;
pub mod greet;
pub mod routes;

pub use config::Config;
pub use greet::GreetServer;
pub use routes::router;
