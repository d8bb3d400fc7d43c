//! Connection and identity context (spec §2.1, §6).
//!
//! The Identity & Context Provider is an external collaborator — this
//! module only types the data it yields, matching spec §4.7's
//! supplemental note. The peer-name string prefixes (`IP=`, `PATH=`)
//! are byte-exact wire conventions per spec §6 ("on-wire compatibility
//! surface"), so they're parsed here rather than left as opaque
//! strings the caller must interpret.

use std::net::IpAddr;

/// A parsed peer address, from the `peer_name` connection attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerAddress {
    Ip { addr: IpAddr, port: Option<u16> },
    Path(String),
}

/// Parse a `peer_name` string of the form `IP=a.b.c.d:port`,
/// `IP=a.b.c.d` (no port), or `PATH=/unix/socket/path`.
///
/// Returns `None` for any string missing a recognized prefix — spec
/// §8: "Peer name with missing IP=/PATH= prefix: IP/PATH styles never
/// match."
pub fn parse_peer_name(raw: &str) -> Option<PeerAddress> {
    if let Some(rest) = raw.strip_prefix("IP=") {
        let (host, port) = match rest.rsplit_once(':') {
            Some((h, p)) => (h, p.parse::<u16>().ok()),
            None => (rest, None),
        };
        let addr = host.parse::<IpAddr>().ok()?;
        Some(PeerAddress::Ip { addr, port })
    } else if let Some(rest) = raw.strip_prefix("PATH=") {
        Some(PeerAddress::Path(rest.to_string()))
    } else {
        None
    }
}

/// Security strength factors (spec §3, §4.3), one quadruple per
/// connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecurityFactors {
    pub overall: u32,
    pub transport: u32,
    pub tls: u32,
    pub sasl: u32,
}

impl SecurityFactors {
    /// Does this connection meet or exceed every configured floor?
    pub fn meets(&self, floor: &SecurityFactors) -> bool {
        self.overall >= floor.overall
            && self.transport >= floor.transport
            && self.tls >= floor.tls
            && self.sasl >= floor.sasl
    }
}

/// Everything spec §4.3's who-clause dimensions read about the
/// requester and their connection. Field names mirror the original
/// `slapd` `Operation`/`Connection` members this was distilled from
/// (`o_ndn`, `c_ndn`, `c_peer_name`, `c_listener->sl_url`,
/// `c_peer_domain`, `ssf`/`ssf_simple`/`tls_ssf`/`sasl_ssf`).
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Operation-level (possibly proxy-assumed) bound DN, normalized.
    pub op_ndn: String,
    /// The connection's original bound DN, normalized — used by the
    /// "Real DN" dimension, never by plain DN-pattern dimensions.
    pub real_ndn: String,
    /// Short-circuits every rule when true (spec §2, §7).
    pub is_root: bool,
    pub peer: Option<PeerAddress>,
    pub peer_domain: Option<String>,
    pub listener_url: Option<String>,
    pub socket_name: Option<String>,
    pub ssf: SecurityFactors,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self {
            op_ndn: String::new(),
            real_ndn: String::new(),
            is_root: false,
            peer: None,
            peer_domain: None,
            listener_url: None,
            socket_name: None,
            ssf: SecurityFactors::default(),
        }
    }
}
