//! Client address discovery for the `/4` and `/6` endpoints
//!
//! Behind a reverse proxy the socket peer is the proxy, so the first usable
//! entry of `X-Forwarded-For` wins over the peer address.

use axum::http::HeaderMap;
use ipdns_core::AddressFamily;
use std::net::{IpAddr, SocketAddr};

/// Header set by reverse proxies
pub const FORWARDED_FOR: &str = "x-forwarded-for";

/// Address the client connected from
///
/// First parseable `X-Forwarded-For` entry, else the socket peer.
pub fn client_address(headers: &HeaderMap, peer: IpAddr) -> IpAddr {
    forwarded_address(headers).unwrap_or_else(|| peer.to_canonical())
}

/// Client address, if it belongs to `family`
pub fn client_address_of(headers: &HeaderMap, peer: IpAddr, family: AddressFamily) -> Option<IpAddr> {
    let address = client_address(headers, peer);
    (AddressFamily::of(&address) == family).then_some(address)
}

/// First parseable entry across all `X-Forwarded-For` headers
fn forwarded_address(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get_all(FORWARDED_FOR)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .find_map(parse_entry)
}

/// Parse `1.2.3.4`, `1.2.3.4:5678`, `2001:db8::1`, `[2001:db8::1]` or `[2001:db8::1]:5678`
fn parse_entry(entry: &str) -> Option<IpAddr> {
    if let Ok(ip) = entry.parse::<IpAddr>() {
        return Some(ip.to_canonical());
    }
    if let Ok(socket) = entry.parse::<SocketAddr>() {
        return Some(socket.ip().to_canonical());
    }
    entry
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .and_then(|inner| inner.parse::<IpAddr>().ok())
}
