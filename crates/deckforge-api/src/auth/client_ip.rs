//! Client address used to key authentication failures
//!
//! Behind `TRUSTED_PROXY_COUNT` proxies the client is the entry just before
//! the trusted tail of `X-Forwarded-For`. Without trusted proxies the header
//! can be spoofed, so only its last hop is considered.

use std::net::{IpAddr, SocketAddr};

use axum::http::HeaderMap;

pub fn extract_client_ip(
    headers: &HeaderMap,
    socket_addr: Option<&SocketAddr>,
    trusted_proxy_count: usize,
) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| from_forwarded_for(v, trusted_proxy_count))
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<IpAddr>().ok())
        })
        .or_else(|| socket_addr.map(|addr| addr.ip()))
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn from_forwarded_for(value: &str, trusted_proxy_count: usize) -> Option<IpAddr> {
    let hops: Vec<&str> = value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    let position = hops
        .len()
        .checked_sub(trusted_proxy_count + 1)
        .unwrap_or(hops.len().saturating_sub(1));
    hops.get(position)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn forwarded(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_untrusted_chain_uses_last_hop() {
        let ip = extract_client_ip(&forwarded("203.0.113.7, 10.0.0.1"), None, 0);
        assert_eq!(ip, "10.0.0.1");
    }

    #[test]
    fn test_trusted_proxies_are_skipped() {
        let headers = forwarded("203.0.113.7, 10.0.0.1, 10.0.0.2");
        assert_eq!(extract_client_ip(&headers, None, 2), "203.0.113.7");
        // Fewer hops than trusted proxies falls back to the last one
        assert_eq!(extract_client_ip(&headers, None, 5), "10.0.0.2");
    }

    #[test]
    fn test_falls_back_to_socket_then_unknown() {
        let socket = SocketAddr::from(([127, 0, 0, 1], 8000));
        assert_eq!(extract_client_ip(&HeaderMap::new(), Some(&socket), 0), "127.0.0.1");
        assert_eq!(extract_client_ip(&forwarded("not-an-ip"), None, 0), "unknown");
    }
}
