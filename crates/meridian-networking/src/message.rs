// Path: crates/meridian-networking/src/message.rs
//! The gossip wire message header and the taxonomy of message types.
//!
//! This mirrors the block wire codec's big-endian, fixed-layout style
//! (`meridian_types::wire`) but covers the envelope every message carries,
//! not the block payload itself.

use meridian_types::primitives::{Account, Hash, Height};

/// Two-byte network identifier placed at the start of every message.
pub const MAGIC_MAIN: [u8; 2] = [b'R', b'A'];
/// Two-byte network identifier for the beta network.
pub const MAGIC_BETA: [u8; 2] = [b'R', b'B'];
/// Two-byte network identifier for the test network.
pub const MAGIC_TEST: [u8; 2] = [b'R', b'T'];

/// Set on [`Header::flags`] when a 6-byte `peer_endpoint` trailer follows the header.
pub const FLAG_PROXY: u8 = 0b0000_0001;

/// The message-type tag carried in every header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    /// Initial peer greeting, exchanging protocol versions.
    Handshake = 0,
    /// Periodic liveness ping.
    KeepAlive = 1,
    /// Broadcasts a newly appended block.
    Publish = 2,
    /// Carries a representative's vote for an election.
    Confirm = 3,
    /// Requests a block by account/height/hash.
    Query = 4,
    /// Announces a detected fork.
    Fork = 5,
    /// Announces a conflicting vote from a representative.
    Conflict = 6,
    /// Requests a range of blocks to bootstrap a new or lagging node.
    Bootstrap = 7,
    /// Broadcasts a representative weight snapshot.
    Weight = 8,
    /// Carries a cross-chain bridge message.
    CrossChain = 9,
}

impl MessageType {
    /// Decodes a message type from its wire tag, if it names a known type.
    pub fn from_u8(tag: u8) -> Option<Self> {
        Some(match tag {
            0 => Self::Handshake,
            1 => Self::KeepAlive,
            2 => Self::Publish,
            3 => Self::Confirm,
            4 => Self::Query,
            5 => Self::Fork,
            6 => Self::Conflict,
            7 => Self::Bootstrap,
            8 => Self::Weight,
            9 => Self::CrossChain,
            _ => return None,
        })
    }
}

/// A 6-byte peer endpoint (4-byte IPv4 address plus 2-byte port), carried after the
/// header only when [`FLAG_PROXY`] is set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PeerEndpoint {
    /// IPv4 address, big-endian octets.
    pub address: [u8; 4],
    /// Port, host byte order on the struct, big-endian on the wire.
    pub port: u16,
}

/// The 7 or 13-byte header prefixing every gossip message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    /// Network identifier; messages with an unrecognized magic are dropped unread.
    pub magic: [u8; 2],
    /// Protocol version this node is speaking.
    pub version_using: u8,
    /// Minimum protocol version this node will still accept.
    pub version_min: u8,
    /// The message's type tag.
    pub message_type: MessageType,
    /// Bitset of header flags, see [`FLAG_PROXY`].
    pub flags: u8,
    /// Type-dependent: some message types reinterpret this as a payload length.
    pub extension: u16,
    /// Present only when [`FLAG_PROXY`] is set in `flags`.
    pub peer_endpoint: Option<PeerEndpoint>,
}

/// Errors decoding a [`Header`] from its wire bytes.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HeaderError {
    /// Fewer bytes were available than the fixed header requires.
    #[error("truncated header")]
    Truncated,
    /// The magic bytes did not match any known network.
    #[error("unrecognized network magic")]
    UnrecognizedMagic,
    /// The type tag did not match any [`MessageType`] variant.
    #[error("unknown message type tag {0}")]
    UnknownMessageType(u8),
}

impl Header {
    /// Fixed size of the header without a trailing `peer_endpoint`.
    pub const BASE_LEN: usize = 7;
    /// Fixed size of the `peer_endpoint` trailer.
    pub const PEER_ENDPOINT_LEN: usize = 6;

    /// Encodes this header to its wire representation.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::BASE_LEN + Self::PEER_ENDPOINT_LEN);
        out.extend_from_slice(&self.magic);
        out.push(self.version_using);
        out.push(self.version_min);
        out.push(self.message_type as u8);
        out.push(self.flags);
        out.extend_from_slice(&self.extension.to_be_bytes());
        if let Some(endpoint) = self.peer_endpoint {
            out.extend_from_slice(&endpoint.address);
            out.extend_from_slice(&endpoint.port.to_be_bytes());
        }
        out
    }

    /// Decodes a header from `bytes`, validating the magic and message type tag.
    pub fn decode(bytes: &[u8]) -> Result<Self, HeaderError> {
        if bytes.len() < Self::BASE_LEN {
            return Err(HeaderError::Truncated);
        }
        let magic = [bytes[0], bytes[1]];
        if magic != MAGIC_MAIN && magic != MAGIC_BETA && magic != MAGIC_TEST {
            return Err(HeaderError::UnrecognizedMagic);
        }
        let version_using = bytes[2];
        let version_min = bytes[3];
        let type_tag = bytes[4];
        let message_type =
            MessageType::from_u8(type_tag).ok_or(HeaderError::UnknownMessageType(type_tag))?;
        let flags = bytes[5];
        let extension = u16::from_be_bytes([bytes[6], bytes[7]]);

        let peer_endpoint = if flags & FLAG_PROXY != 0 {
            let start = Self::BASE_LEN + 1;
            let end = start + Self::PEER_ENDPOINT_LEN;
            let tail = bytes.get(start..end).ok_or(HeaderError::Truncated)?;
            Some(PeerEndpoint {
                address: [tail[0], tail[1], tail[2], tail[3]],
                port: u16::from_be_bytes([tail[4], tail[5]]),
            })
        } else {
            None
        };

        Ok(Header {
            magic,
            version_using,
            version_min,
            message_type,
            flags,
            extension,
            peer_endpoint,
        })
    }
}

/// The payload of a `QUERY` message: request a block by account/height/hash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryPayload {
    /// Request sequence number, echoed back in the response.
    pub sequence: u64,
    /// Which field(s) identify the requested block.
    pub by: QueryBy,
    /// The account whose chain is being queried.
    pub account: Account,
    /// The height being queried, meaningful when `by` includes height.
    pub height: Height,
    /// The hash being queried, meaningful when `by` includes hash.
    pub hash: Hash,
}

/// Which fields of a [`QueryPayload`] identify the requested block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum QueryBy {
    /// Identify the block by its own hash.
    Hash = 0,
    /// Identify the block by `(account, height)`.
    Height = 1,
    /// Identify the block whose `previous` field equals `hash`.
    Previous = 2,
}
