//! Remote endpoint identity

use serde::{Deserialize, Serialize};

/// Opaque capability used to open the service channel on a peer.
///
/// For a radio module this is the service-record UUID the module answers
/// on. The link never interprets it; the transport compares or sends it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceToken(String);

impl ServiceToken {
    /// Serial port profile service UUID, what HC-0x modules answer on.
    pub const SERIAL_PORT_PROFILE: &'static str = "00001101-0000-1000-8000-00805F9B34FB";

    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ServiceToken {
    fn default() -> Self {
        Self::new(Self::SERIAL_PORT_PROFILE)
    }
}

impl std::fmt::Display for ServiceToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A bonded remote endpoint. Immutable once selected.
///
/// `address` is where the transport finds the peer (a radio address, a
/// bridge socket). `token` selects the service channel on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Peer {
    name: String,
    address: String,
    token: ServiceToken,
}

impl Peer {
    /// A peer at `address` answering on the default service token.
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self { name: name.into(), address: address.into(), token: ServiceToken::default() }
    }

    /// The same peer, opened with `token` instead.
    pub fn with_token(self, token: ServiceToken) -> Self {
        Self { token, ..self }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn token(&self) -> &ServiceToken {
        &self.token
    }
}

impl std::fmt::Display for Peer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Select the peer whose name equals `name` exactly.
///
/// Matching is case-sensitive and does not trim, so `"hc-06"` and
/// `"HC-06 "` do not match `"HC-06"`.
pub fn find_peer<'a, I>(peers: I, name: &str) -> Option<Peer>
where
    I: IntoIterator<Item = &'a Peer>,
{
    peers.into_iter().find(|peer| peer.name == name).cloned()
}
