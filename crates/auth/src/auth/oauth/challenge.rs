//! `WWW-Authenticate` challenges for MCP resource servers.
//!
//! The challenge points clients at the Protected Resource Metadata document
//! ([RFC 9728 §5.1](https://datatracker.ietf.org/doc/html/rfc9728#name-www-authenticate-response)).
//! Its URL is derived per request from the proxy headers, so the same
//! server can sit behind several reverse proxies and still advertise the
//! address each client actually used.

use http::{HeaderMap, HeaderValue};

/// Path of the Protected Resource Metadata document.
pub const PROTECTED_RESOURCE_PATH: &str = "/.well-known/oauth-protected-resource";

const FORWARDED_HOST: &str = "x-forwarded-host";
const FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Builds the externally visible base URL and the 401 challenge for a
/// request.
#[derive(Clone, Debug)]
pub struct ChallengeBuilder {
    default_host: String,
}

impl ChallengeBuilder {
    /// `default_host` is used when a request carries neither
    /// `x-forwarded-host` nor `host`, usually `localhost:<port>`.
    pub fn new(default_host: impl Into<String>) -> Self {
        Self {
            default_host: default_host.into(),
        }
    }

    /// Resolve `<proto>://<host>` for the request.
    ///
    /// Host precedence is `x-forwarded-host`, then `host`, then the default.
    /// The protocol is `x-forwarded-proto`, or `http` when absent. Header
    /// values that are not visible ASCII count as absent.
    pub fn base_url(&self, headers: &HeaderMap) -> String {
        let host = header_str(headers, FORWARDED_HOST)
            .or_else(|| header_str(headers, http::header::HOST.as_str()))
            .unwrap_or(&self.default_host);
        let proto = header_str(headers, FORWARDED_PROTO).unwrap_or("http");
        format!("{proto}://{host}")
    }

    /// URL of the Protected Resource Metadata document for the request.
    pub fn resource_metadata_url(&self, headers: &HeaderMap) -> String {
        format!("{}{PROTECTED_RESOURCE_PATH}", self.base_url(headers))
    }

    /// Format the challenge string.
    ///
    /// `Bearer realm="OAuth", resource_metadata="<base_url>/.well-known/oauth-protected-resource"`
    pub fn build(&self, headers: &HeaderMap) -> String {
        format!(
            "Bearer realm=\"OAuth\", resource_metadata=\"{}\"",
            self.resource_metadata_url(headers)
        )
    }

    /// [`build`](Self::build) as a header value.
    ///
    /// Never fails: if the default host was configured with characters a
    /// header cannot carry, the bare `Bearer realm="OAuth"` challenge is
    /// returned instead.
    pub fn header_value(&self, headers: &HeaderMap) -> HeaderValue {
        HeaderValue::from_str(&self.build(headers))
            .unwrap_or_else(|_| HeaderValue::from_static("Bearer realm=\"OAuth\""))
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::ChallengeBuilder;
    use http::{HeaderMap, HeaderValue};

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(*k, HeaderValue::from_static(v));
        }
        map
    }

    #[test]
    fn falls_back_to_default_host() {
        let builder = ChallengeBuilder::new("localhost:10000");
        assert_eq!(
            builder.build(&HeaderMap::new()),
            "Bearer realm=\"OAuth\", resource_metadata=\"http://localhost:10000/.well-known/oauth-protected-resource\""
        );
    }

    #[test]
    fn host_header_beats_default() {
        let builder = ChallengeBuilder::new("localhost:10000");
        let h = headers(&[("host", "internal:8080")]);
        assert_eq!(builder.base_url(&h), "http://internal:8080");
    }

    #[test]
    fn forwarded_headers_win() {
        let builder = ChallengeBuilder::new("localhost:10000");
        let h = headers(&[
            ("host", "internal:8080"),
            ("x-forwarded-host", "api.example.com"),
            ("x-forwarded-proto", "https"),
        ]);
        assert!(builder.build(&h).contains(
            "resource_metadata=\"https://api.example.com/.well-known/oauth-protected-resource\""
        ));
    }

    #[test]
    fn proto_without_forwarded_host() {
        let builder = ChallengeBuilder::new("localhost:10000");
        let h = headers(&[("host", "svc.local"), ("x-forwarded-proto", "https")]);
        assert_eq!(builder.base_url(&h), "https://svc.local");
    }

    #[test]
    fn opaque_forwarded_host_is_skipped() {
        let builder = ChallengeBuilder::new("localhost:10000");
        let mut h = headers(&[("host", "svc.local")]);
        h.insert(
            "x-forwarded-host",
            HeaderValue::from_bytes(b"caf\xe9.example").unwrap(),
        );
        assert_eq!(builder.base_url(&h), "http://svc.local");
    }

    #[test]
    fn header_value_never_fails() {
        let builder = ChallengeBuilder::new("bad\nhost");
        assert_eq!(
            builder.header_value(&HeaderMap::new()),
            "Bearer realm=\"OAuth\""
        );
    }
}
