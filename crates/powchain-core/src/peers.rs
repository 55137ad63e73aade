use std::collections::HashSet;
use tracing::debug;
use url::Url;

use crate::error::{LedgerError, Result};

const HTTP_PORT: u16 = 80;

/// Known peers, stored as `host[:port]`.
#[derive(Clone, Debug, Default)]
pub struct PeerRegistry {
    peers: HashSet<String>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the network location of `address` and returns it.
    /// Registering a known peer again is a no-op.
    pub fn register(&mut self, address: &str) -> Result<String> {
        let location = network_location(address)?;
        if self.peers.insert(location.clone()) {
            debug!(peer = %location, "registered peer");
        }
        Ok(location)
    }

    /// Sorted for stable output.
    pub fn list(&self) -> Vec<String> {
        let mut peers: Vec<String> = self.peers.iter().cloned().collect();
        peers.sort();
        peers
    }

    pub fn contains(&self, location: &str) -> bool {
        self.peers.contains(location)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

/// Host plus optional port of `address`, with scheme, credentials, path and query dropped.
/// Bare `host:port` addresses are read as `http://host:port`. Peers are fetched over
/// plain HTTP, so any port other than 80 is kept, including a scheme's implied default.
pub fn network_location(address: &str) -> Result<String> {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::Validation("empty peer address".into()));
    }
    let parsed = if trimmed.contains("://") {
        Url::parse(trimmed)
    } else {
        Url::parse(&format!("http://{trimmed}"))
    }
    .map_err(|e| LedgerError::Validation(format!("invalid peer address {trimmed:?}: {e}")))?;

    let host = parsed
        .host_str()
        .filter(|host| !host.is_empty())
        .ok_or_else(|| LedgerError::Validation(format!("peer address {trimmed:?} has no host")))?;
    Ok(match parsed.port_or_known_default() {
        Some(port) if port != HTTP_PORT => format!("{host}:{port}"),
        _ => host.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_scheme_and_path() {
        assert_eq!(
            network_location("http://192.168.0.5:5000/fullchain?x=1").unwrap(),
            "192.168.0.5:5000"
        );
        assert_eq!(
            network_location("https://node.example.org/").unwrap(),
            "node.example.org:443"
        );
    }

    #[test]
    fn keeps_ports_other_than_plain_http() {
        assert_eq!(
            network_location("https://node.example.org:443/").unwrap(),
            "node.example.org:443"
        );
        assert_eq!(network_location("http://10.0.0.2:80").unwrap(), "10.0.0.2");
        assert_eq!(network_location("http://10.0.0.2").unwrap(), "10.0.0.2");
        assert_eq!(network_location("10.0.0.2:443").unwrap(), "10.0.0.2:443");
    }

    #[test]
    fn bare_host_port_is_accepted() {
        assert_eq!(network_location("127.0.0.1:5001").unwrap(), "127.0.0.1:5001");
        assert_eq!(network_location(" localhost:5002 ").unwrap(), "localhost:5002");
    }

    #[test]
    fn ipv6_hosts_keep_brackets() {
        assert_eq!(network_location("http://[::1]:5000").unwrap(), "[::1]:5000");
    }

    #[test]
    fn rejects_addresses_without_host() {
        for bad in ["", "   ", "http://", "file:///tmp/chain", "http://:5000"] {
            assert!(
                matches!(network_location(bad), Err(LedgerError::Validation(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn register_deduplicates() {
        let mut registry = PeerRegistry::new();
        registry.register("http://127.0.0.1:5001").unwrap();
        registry.register("127.0.0.1:5001").unwrap();
        registry.register("http://127.0.0.1:5001/fullchain").unwrap();
        registry.register("http://127.0.0.1:5002").unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.list(), vec!["127.0.0.1:5001", "127.0.0.1:5002"]);
        assert!(registry.contains("127.0.0.1:5002"));
    }

    #[test]
    fn failed_registration_leaves_set_untouched() {
        let mut registry = PeerRegistry::new();
        assert!(registry.register("http://").is_err());
        assert!(registry.is_empty());
    }
}
