// Path: crates/meridian-networking/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! Wire message format and peer-set interface for the meridian account-chain
//! gossip protocol.
//!
//! This crate is transport-agnostic: it defines the header/message taxonomy
//! exchanged between nodes and the [`Peers`] trait other subsystems (elections,
//! syncer, rewarder) depend on to reach the network. A concrete transport is
//! bound at the application layer.

pub mod message;
pub mod peers;

pub use message::{Header, HeaderError, MessageType, PeerEndpoint, QueryBy, QueryPayload};
pub use peers::{OutboundMessage, PeerId, Peers, PeersError};
