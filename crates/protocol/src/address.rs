//! Launch URL contract and share-address construction.
//!
//! The receiver publishes `<base>?mode=upload&peer=<identifier>` behind a
//! scannable code; the sender detects those query parameters on launch to
//! select its role. There is no server-side mediation.

use std::net::IpAddr;

use url::{Host, Url};

use crate::{PeerId, ProtocolError};

/// Query parameter selecting the sender role.
pub const MODE_PARAM: &str = "mode";
/// Query parameter carrying the receiver's peer identifier.
pub const PEER_PARAM: &str = "peer";
/// The only recognized mode value.
pub const MODE_UPLOAD: &str = "upload";

/// Role selected by the launch URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchMode {
    /// No upload parameters present: act as the receiving PC.
    Receive,
    /// `mode=upload&peer=<id>` present: act as the sending phone.
    Send {
        peer: PeerId,
        host: String,
        port: u16,
    },
}

impl LaunchMode {
    /// Determines the role from a launch URL.
    ///
    /// `mode=upload` with a missing or empty `peer` parameter is the
    /// identifier-missing error, fatal to the sender session.
    pub fn from_url(raw: &str) -> Result<Self, ProtocolError> {
        let url = Url::parse(raw).map_err(|e| ProtocolError::InvalidUrl(e.to_string()))?;

        let mut mode = None;
        let mut peer = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                MODE_PARAM => mode = Some(value.into_owned()),
                PEER_PARAM => peer = Some(value.into_owned()),
                _ => {}
            }
        }

        if mode.as_deref() != Some(MODE_UPLOAD) {
            return Ok(Self::Receive);
        }

        let peer = match peer {
            Some(p) if !p.is_empty() => PeerId::parse(p)?,
            _ => return Err(ProtocolError::MissingPeer),
        };

        let host = url
            .host_str()
            .ok_or_else(|| ProtocolError::InvalidUrl("launch URL has no host".into()))?
            .to_string();
        let port = url
            .port_or_known_default()
            .ok_or_else(|| ProtocolError::InvalidUrl("launch URL has no port".into()))?;

        Ok(Self::Send { peer, host, port })
    }
}

/// Builds the shareable address the phone scans.
///
/// Preserves the base URL's scheme and port. If the base host resolves to
/// a loopback name, the externally reachable host (resolved once at
/// configuration time and passed in explicitly) is substituted so a second
/// physical device can route to it; otherwise the base host is used
/// verbatim.
pub fn share_url(
    base: &Url,
    peer: &PeerId,
    external_host: Option<&str>,
) -> Result<Url, ProtocolError> {
    let mut url = base.clone();

    if is_loopback_host(base) {
        let external =
            external_host.ok_or(ProtocolError::NoReachableAddress)?;
        url.set_host(Some(external))
            .map_err(|e| ProtocolError::InvalidUrl(e.to_string()))?;
    }

    url.query_pairs_mut()
        .clear()
        .append_pair(MODE_PARAM, MODE_UPLOAD)
        .append_pair(PEER_PARAM, peer.as_str());

    Ok(url)
}

fn is_loopback_host(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(d)) => d.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}

/// Resolves an externally reachable local IP address.
///
/// Skips loopback and link-local (APIPA) interfaces. IPv4 addresses are
/// preferred; an IPv6 address is returned only when no IPv4 candidate
/// exists.
pub fn local_reachable_ip() -> Option<IpAddr> {
    let interfaces = if_addrs::get_if_addrs().ok()?;

    let mut v6_fallback = None;
    for iface in interfaces {
        if iface.is_loopback() {
            continue;
        }
        match iface.ip() {
            IpAddr::V4(ip) => {
                if ip.is_link_local() {
                    continue;
                }
                return Some(IpAddr::V4(ip));
            }
            IpAddr::V6(ip) => {
                if v6_fallback.is_none() && !ip.is_unicast_link_local() {
                    v6_fallback = Some(IpAddr::V6(ip));
                }
            }
        }
    }
    v6_fallback
}
