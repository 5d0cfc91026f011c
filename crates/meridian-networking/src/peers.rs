// Path: crates/meridian-networking/src/peers.rs
//! The pluggable peer-set interface.
//!
//! This crate ships no concrete transport. A node binds a concrete `Peers`
//! implementation (UDP/TCP, an in-memory harness for tests, or anything else)
//! at the application layer; everything above this trait only depends on it.

use meridian_types::primitives::{Account, Height};

use crate::message::{Header, QueryPayload};

/// Errors a [`Peers`] implementation may surface to its caller.
#[derive(Debug, thiserror::Error)]
pub enum PeersError {
    /// No peer was available to satisfy the request.
    #[error("no peer available")]
    NoPeerAvailable,
    /// The underlying transport failed.
    #[error("transport error: {0}")]
    Transport(String),
}

/// A fully formed outbound gossip message: header plus encoded payload.
#[derive(Clone, Debug)]
pub struct OutboundMessage {
    /// The message header, already carrying the correct type tag.
    pub header: Header,
    /// The type-specific payload, already wire-encoded.
    pub payload: Vec<u8>,
}

/// Identifies a peer by its advertised account (its node identity), not its
/// transport address; a `Peers` implementation resolves accounts to addresses
/// internally.
pub type PeerId = Account;

/// The peer-set surface consumed by the election, syncer, and rewarder
/// subsystems. A concrete implementation owns the actual sockets and routing
/// table; this crate only describes the shape callers depend on.
pub trait Peers: Send + Sync {
    /// Returns an arbitrary known peer, if any are known.
    fn random_peer(&self) -> Option<PeerId>;

    /// Returns an arbitrary known peer that has identified itself as a full
    /// node (one that serves bootstrap and query traffic), if any are known.
    fn random_full_node_peer(&self) -> Option<PeerId>;

    /// Returns the peers believed best positioned to route traffic for each of
    /// `accounts`, one candidate list per account in the same order.
    fn routes(&self, accounts: &[Account]) -> Vec<Vec<PeerId>>;

    /// Broadcasts `message` to the node's peer set.
    fn broadcast(&self, message: OutboundMessage) -> Result<(), PeersError>;

    /// Sends `message` to a single peer, used for directed queries.
    fn send_to(&self, peer: PeerId, message: OutboundMessage) -> Result<(), PeersError>;

    /// Records that `account` announced itself alive at `timestamp` running
    /// protocol `version`, as observed in a keep-alive message.
    fn contact(&self, account: Account, timestamp: i64, version: u8);

    /// Records a representative weight observation from the validator feed,
    /// used to keep the route table biased toward high-weight peers.
    fn observe_weight(&self, representative: Account, weight: u64);
}

/// Builds the [`QueryPayload`] for requesting the successor of `height` on
/// `account`'s chain, the shape the syncer issues while walking a lagging
/// chain forward.
pub fn query_next_height(sequence: u64, account: Account, height: Height) -> QueryPayload {
    use meridian_types::primitives::Hash;

    use crate::message::QueryBy;

    QueryPayload {
        sequence,
        by: QueryBy::Height,
        account,
        height,
        hash: Hash::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_next_height_targets_the_requested_height() {
        let account = Account([7u8; 32]);
        let payload = query_next_height(1, account, 42);
        assert_eq!(payload.account, account);
        assert_eq!(payload.height, 42);
    }
}
