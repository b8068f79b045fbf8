//! Source URL guard
//!
//! Source URLs come from request bodies, so before anything is fetched they are
//! checked against:
//! - non-http(s) schemes
//! - private/internal IP literals
//! - localhost and internal hostnames
//! - hostnames that resolve to private addresses

use std::net::{IpAddr, Ipv6Addr};
use tokio::net::lookup_host;

/// Validate a URL before fetching it.
///
/// When `allow_private_ips` is true only the scheme and host presence are checked.
pub async fn validate_source_url(url: &str, allow_private_ips: bool) -> Result<(), String> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err("URL must start with http:// or https://".to_string());
    }

    let parsed_url = reqwest::Url::parse(url).map_err(|e| format!("Invalid URL format: {}", e))?;

    let host = parsed_url
        .host_str()
        .ok_or_else(|| "URL must have a host".to_string())?;

    if allow_private_ips {
        return Ok(());
    }

    // IPv6 literals come back bracketed
    let host = host.trim_start_matches('[').trim_end_matches(']');

    if let Ok(ip) = host.parse::<IpAddr>() {
        if is_private_ip(&ip) {
            return Err("Private/internal IP addresses are not allowed".to_string());
        }
    }

    let host_lower = host.to_lowercase();
    if host_lower == "localhost"
        || host_lower.ends_with(".localhost")
        || host_lower.ends_with(".local")
        || host_lower.contains(".internal")
        || host_lower.contains(".corp")
    {
        return Err("Localhost and internal hostnames are not allowed".to_string());
    }

    let port = parsed_url.port_or_known_default().unwrap_or(80);
    match lookup_host((host, port)).await {
        Ok(addrs) => {
            for addr in addrs {
                if is_private_ip(&addr.ip()) {
                    return Err(format!(
                        "Hostname resolves to private/internal IP address: {}",
                        addr.ip()
                    ));
                }
            }
        }
        Err(e) => {
            // The fetch itself reports unreachable hosts
            tracing::warn!(host = %host, error = %e, "Failed to resolve source hostname");
        }
    }

    Ok(())
}

/// True for loopback, private, link-local, multicast, and reserved ranges.
pub(crate) fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => {
            let octets = ipv4.octets();
            octets[0] == 10
                || (octets[0] == 172 && (16..=31).contains(&octets[1]))
                || (octets[0] == 192 && octets[1] == 168)
                || octets[0] == 127
                || (octets[0] == 169 && octets[1] == 254)
                || (224..=239).contains(&octets[0])
                || octets[0] == 0
        }
        IpAddr::V6(ipv6) => {
            if let Some(mapped) = ipv6.to_ipv4_mapped() {
                return is_private_ip(&IpAddr::V4(mapped));
            }
            ipv6.is_loopback()
                || ipv6.is_unspecified()
                || ipv6.is_multicast()
                || is_ipv6_link_local(ipv6)
                || is_ipv6_unique_local(ipv6)
        }
    }
}

fn is_ipv6_link_local(ip: &Ipv6Addr) -> bool {
    ip.segments()[0] & 0xffc0 == 0xfe80
}

fn is_ipv6_unique_local(ip: &Ipv6Addr) -> bool {
    ip.segments()[0] & 0xfe00 == 0xfc00
}
