//! OAuth 2.1 resource server support for MCP servers.
//!
//! Implements the server-side (resource server) requirements of the
//! [MCP Authorization specification](https://modelcontextprotocol.io/specification/draft/basic/authorization):
//!
//! - **Challenges**: 401 responses carry a `WWW-Authenticate` header whose
//!   `resource_metadata` parameter is resolved from the request's proxy
//!   headers.
//!
//! - **Discovery documents**: Protected Resource Metadata
//!   ([RFC 9728](https://datatracker.ietf.org/doc/html/rfc9728)) plus the
//!   authorization server and OpenID Connect documents for the issuer.
//!
//! # Example
//!
//! ```rust,ignore
//! use mcpgate_auth::auth::oauth::{ChallengeBuilder, ProtectedResourceMetadata};
//!
//! let challenges = ChallengeBuilder::new("localhost:10000");
//! let metadata = ProtectedResourceMetadata::new(
//!     challenges.base_url(request.headers()),
//!     "https://auth.example.com",
//! );
//! ```

mod challenge;
mod metadata;

pub use challenge::{ChallengeBuilder, PROTECTED_RESOURCE_PATH};
pub use metadata::{
    AuthorizationServerMetadata, OpenIdConfiguration, ProtectedResourceMetadata, jwks_uri,
};
