use std::{net::IpAddr, str::FromStr};

use actix_web::{http::header::HeaderMap, HttpRequest};
use log::{debug, trace};
use regex::Regex;

/// Get the remote IP address from the request. It uses 3 sources to determine the IP address, in decreasing order
/// of preference:
/// 1. The `X-Forwarded-For` header, iif `use_x_forwarded_for` is set to true in the configuration.
/// 2. The `Forwarded` header, iif `use_forwarded` is set to true in the configuration.
/// 3. The peer address from the connection info.
pub fn get_remote_ip(req: &HttpRequest, use_x_forwarded_for: bool, use_forwarded: bool) -> Option<IpAddr> {
    let peer_addr = req.connection_info().peer_addr().map(|a| a.to_string());
    remote_ip_from_parts(req.headers(), peer_addr.as_deref(), use_x_forwarded_for, use_forwarded)
}

/// The same as [`get_remote_ip`], for callers (such as middleware) that don't hold an `HttpRequest`.
pub fn remote_ip_from_parts(
    headers: &HeaderMap,
    peer_addr: Option<&str>,
    use_x_forwarded_for: bool,
    use_forwarded: bool,
) -> Option<IpAddr> {
    let mut result = None;
    if use_x_forwarded_for {
        trace!("Checking X-Forwarded-For header");
        // The left-most entry is the original client
        result = headers
            .get("X-Forwarded-For")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| IpAddr::from_str(s.trim()).ok());
        if let Some(ip) = result {
            debug!("Using X-Forwarded-For header for remote address: {ip}");
        }
    }
    if use_forwarded && result.is_none() {
        trace!("Checking Forwarded header");
        result = headers.get("Forwarded").and_then(|v| v.to_str().ok()).and_then(parse_forwarded_for);
        if let Some(ip) = result {
            debug!("Using Forwarded header for remote address: {ip}");
        }
    }
    result.or_else(|| {
        trace!("Using Peer address for remote address: {:?}", peer_addr);
        peer_addr.and_then(parse_peer_addr)
    })
}

/// Extracts the `for=` address from a `Forwarded` header value, e.g. `for=192.0.2.60;proto=http` or
/// `for="[2001:db8::17]:4711"`.
pub fn parse_forwarded_for(value: &str) -> Option<IpAddr> {
    let re = Regex::new(r#"(?i)for="?\[?(?P<ip>[0-9a-fA-F:.]+?)\]?(:\d+)?"?(;|,|$)"#).ok()?;
    re.captures(value).and_then(|caps| caps.name("ip")).and_then(|m| IpAddr::from_str(m.as_str()).ok())
}

fn parse_peer_addr(s: &str) -> Option<IpAddr> {
    IpAddr::from_str(s).ok().or_else(|| s.parse::<std::net::SocketAddr>().ok().map(|a| a.ip()))
}
