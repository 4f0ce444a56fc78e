//! Header manipulation for forwarded traffic.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers in both directions
//! - Add X-Forwarded-For, X-Forwarded-Proto, X-Forwarded-Host
//! - Detect protocol upgrade requests
//!
//! # Design Decisions
//! - End-to-end headers are forwarded unchanged, including Host
//! - Client IP is appended to an existing X-Forwarded-For chain
//! - Existing X-Forwarded-Proto/Host from an outer proxy are kept

use std::net::SocketAddr;

use axum::http::header::{CONNECTION, HOST, UPGRADE};
use axum::http::{HeaderMap, HeaderName, HeaderValue};

/// Hop-by-hop headers (RFC 9110 §7.6.1), never forwarded.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");
pub const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");

fn connection_tokens(headers: &HeaderMap) -> impl Iterator<Item = String> + '_ {
    headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|token| token.trim().to_ascii_lowercase())
        .filter(|token| !token.is_empty())
}

/// The requested protocol if this is an upgrade request
/// (`Connection: upgrade` plus an `Upgrade` header).
pub fn upgrade_protocol(headers: &HeaderMap) -> Option<HeaderValue> {
    let wants_upgrade = connection_tokens(headers).any(|token| token == "upgrade");
    if wants_upgrade {
        headers.get(UPGRADE).cloned()
    } else {
        None
    }
}

/// Remove hop-by-hop headers, including any named in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<String> = connection_tokens(headers).collect();
    for name in listed {
        headers.remove(name.as_str());
    }
    for name in HOP_BY_HOP {
        headers.remove(*name);
    }
}

/// Restore the headers needed to negotiate `protocol` with the upstream.
pub fn set_upgrade(headers: &mut HeaderMap, protocol: HeaderValue) {
    headers.insert(CONNECTION, HeaderValue::from_static("upgrade"));
    headers.insert(UPGRADE, protocol);
}

/// Add the X-Forwarded-* headers describing the client hop.
pub fn append_forwarded(headers: &mut HeaderMap, client: SocketAddr) {
    let ip = client.ip().to_string();
    let chain = match headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(existing) if !existing.trim().is_empty() => format!("{existing}, {ip}"),
        _ => ip,
    };
    if let Ok(value) = HeaderValue::from_str(&chain) {
        headers.insert(X_FORWARDED_FOR, value);
    }

    if !headers.contains_key(X_FORWARDED_PROTO) {
        headers.insert(X_FORWARDED_PROTO, HeaderValue::from_static("http"));
    }
    if !headers.contains_key(X_FORWARDED_HOST) {
        if let Some(host) = headers.get(HOST).cloned() {
            headers.insert(X_FORWARDED_HOST, host);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.append(*k, HeaderValue::from_static(v));
        }
        map
    }

    #[test]
    fn strips_hop_by_hop_and_connection_listed() {
        let mut map = headers(&[
            ("connection", "keep-alive, x-private"),
            ("keep-alive", "timeout=5"),
            ("x-private", "secret"),
            ("transfer-encoding", "chunked"),
            ("content-type", "application/json"),
            ("authorization", "Bearer abc"),
        ]);
        strip_hop_by_hop(&mut map);

        assert_eq!(map.len(), 2);
        assert!(map.contains_key("content-type"));
        assert!(map.contains_key("authorization"));
    }

    #[test]
    fn detects_upgrade_requests() {
        let ws = headers(&[("connection", "keep-alive, Upgrade"), ("upgrade", "websocket")]);
        assert_eq!(upgrade_protocol(&ws).unwrap(), "websocket");

        let no_connection = headers(&[("upgrade", "websocket")]);
        assert!(upgrade_protocol(&no_connection).is_none());

        let plain = headers(&[("connection", "close")]);
        assert!(upgrade_protocol(&plain).is_none());
    }

    #[test]
    fn appends_forwarded_chain() {
        let mut map = headers(&[("host", "example.com"), ("x-forwarded-for", "203.0.113.7")]);
        append_forwarded(&mut map, "10.0.0.2:51000".parse().unwrap());

        assert_eq!(map[X_FORWARDED_FOR], "203.0.113.7, 10.0.0.2");
        assert_eq!(map[X_FORWARDED_PROTO], "http");
        assert_eq!(map[X_FORWARDED_HOST], "example.com");
    }

    #[test]
    fn keeps_outer_proxy_proto() {
        let mut map = headers(&[("x-forwarded-proto", "https")]);
        append_forwarded(&mut map, "127.0.0.1:1".parse().unwrap());
        assert_eq!(map[X_FORWARDED_PROTO], "https");
        assert_eq!(map[X_FORWARDED_FOR], "127.0.0.1");
    }
}
