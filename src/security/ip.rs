//! Client address and transport extraction.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use axum::extract::ConnectInfo;
use axum::http::HeaderMap;

use crate::security::https::Transport;

/// Extract client IP from request headers or connection info.
///
/// When `trust_proxy` is true, checks X-Forwarded-For and X-Real-IP headers.
/// Only the rightmost X-Forwarded-For entry is used: it is the one appended
/// by the trusted proxy, everything left of it is client-supplied.
/// Falls back to direct connection IP, or 127.0.0.1 if unavailable.
pub fn extract_client_ip(
    headers: &HeaderMap,
    connect_info: Option<&ConnectInfo<SocketAddr>>,
    trust_proxy: bool,
) -> IpAddr {
    if trust_proxy {
        if let Some(ip) = headers
            .get("X-Forwarded-For")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.rsplit(',').next())
            .and_then(|last| last.trim().parse().ok())
        {
            return ip;
        }
        if let Some(ip) = headers
            .get("X-Real-IP")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse().ok())
        {
            return ip;
        }
    }
    connect_info
        .map(|c| c.0.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

/// Resolve the transport, honouring `X-Forwarded-Proto` behind a trusted proxy.
pub fn effective_transport(
    headers: &HeaderMap,
    listener_transport: Transport,
    trust_proxy: bool,
) -> Transport {
    if listener_transport.is_secure() {
        return Transport::Secure;
    }
    let forwarded_https = trust_proxy
        && headers
            .get("X-Forwarded-Proto")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .is_some_and(|proto| proto.trim().eq_ignore_ascii_case("https"));

    if forwarded_https {
        Transport::Secure
    } else {
        Transport::Plain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> ConnectInfo<SocketAddr> {
        ConnectInfo(SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 12345))
    }

    #[test]
    fn test_extract_client_ip_no_proxy() {
        let headers = HeaderMap::new();
        let ip = extract_client_ip(&headers, Some(&peer()), false);
        assert_eq!(ip, IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)));
    }

    #[test]
    fn test_forwarded_for_only_when_trusted() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Forwarded-For", "203.0.113.50, 70.41.3.18".parse().unwrap());

        let ip = extract_client_ip(&headers, Some(&peer()), true);
        assert_eq!(ip, IpAddr::V4(Ipv4Addr::new(70, 41, 3, 18)));

        let ip = extract_client_ip(&headers, Some(&peer()), false);
        assert_eq!(ip, IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)));
    }

    #[test]
    fn test_spoofed_forwarded_prefix_is_ignored() {
        for i in 0..5 {
            let mut headers = HeaderMap::new();
            let value = format!("198.51.100.{i}, 10.0.0.5");
            headers.insert("X-Forwarded-For", value.parse().unwrap());

            let ip = extract_client_ip(&headers, Some(&peer()), true);
            assert_eq!(ip, IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5)));
        }
    }

    #[test]
    fn test_real_ip_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Forwarded-For", "not-an-ip".parse().unwrap());
        headers.insert("X-Real-IP", "198.51.100.25".parse().unwrap());

        let ip = extract_client_ip(&headers, Some(&peer()), true);
        assert_eq!(ip, IpAddr::V4(Ipv4Addr::new(198, 51, 100, 25)));
    }

    #[test]
    fn test_fallback_to_localhost() {
        let ip = extract_client_ip(&HeaderMap::new(), None, false);
        assert_eq!(ip, IpAddr::V4(Ipv4Addr::LOCALHOST));
    }

    #[test]
    fn test_forwarded_proto() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Forwarded-Proto", "HTTPS".parse().unwrap());

        assert_eq!(effective_transport(&headers, Transport::Plain, true), Transport::Secure);
        assert_eq!(effective_transport(&headers, Transport::Plain, false), Transport::Plain);
        assert_eq!(
            effective_transport(&HeaderMap::new(), Transport::Secure, false),
            Transport::Secure
        );
    }
}
