// Path: crates/meridian-types/src/wire.rs
//! The hash-covered big-endian wire codec for blocks.
//!
//! This is deliberately not a generic codec: the byte layout is part of the
//! consensus-critical hash input and must match bit-for-bit across every
//! implementation that signs or verifies a block. All integers are written
//! big-endian; no implicit host-endian conversion is used anywhere in this
//! module.

use crate::block::{AirdropBlock, Block, BlockCommon, BlockType, Opcode, RepresentativeBlock, TransactionBlock};
use crate::primitives::{Account, Amount, Hash, Signature};
use thiserror::Error;

/// Failures decoding a block from its wire representation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    /// The buffer ended before a field could be fully read.
    #[error("unexpected end of buffer at offset {0}")]
    Truncated(usize),
    /// The leading type tag did not match any known block type.
    #[error("unknown block type tag {0}")]
    UnknownType(u8),
    /// The opcode tag did not match any known opcode.
    #[error("unknown opcode tag {0}")]
    UnknownOpcode(u8),
    /// The buffer had trailing bytes after a fully decoded block.
    #[error("trailing bytes after decoded block")]
    TrailingBytes,
    /// A transaction block's declared extensions length exceeds the maximum.
    #[error("extensions length {0} exceeds maximum")]
    ExtensionsTooLong(u32),
}

fn write_u8(buf: &mut Vec<u8>, v: u8) {
    buf.push(v);
}
fn write_u16_be(buf: &mut Vec<u8>, v: u16) {
    buf.extend_from_slice(&v.to_be_bytes());
}
fn write_u32_be(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_be_bytes());
}
fn write_u64_be(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_be_bytes());
}
fn write_i64_be(buf: &mut Vec<u8>, v: i64) {
    buf.extend_from_slice(&v.to_be_bytes());
}
fn write_u128_be(buf: &mut Vec<u8>, v: u128) {
    buf.extend_from_slice(&v.to_be_bytes());
}
fn write_bytes32(buf: &mut Vec<u8>, v: &[u8; 32]) {
    buf.extend_from_slice(v);
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Reader { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        let end = self.pos + n;
        let slice = self.buf.get(self.pos..end).ok_or(WireError::Truncated(self.pos))?;
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, WireError> {
        Ok(self.take(1)?[0])
    }
    fn u16_be(&mut self) -> Result<u16, WireError> {
        let s = self.take(2)?;
        Ok(u16::from_be_bytes([s[0], s[1]]))
    }
    fn u32_be(&mut self) -> Result<u32, WireError> {
        let s = self.take(4)?;
        Ok(u32::from_be_bytes([s[0], s[1], s[2], s[3]]))
    }
    fn u64_be(&mut self) -> Result<u64, WireError> {
        let s = self.take(8)?;
        let mut a = [0u8; 8];
        a.copy_from_slice(s);
        Ok(u64::from_be_bytes(a))
    }
    fn i64_be(&mut self) -> Result<i64, WireError> {
        let s = self.take(8)?;
        let mut a = [0u8; 8];
        a.copy_from_slice(s);
        Ok(i64::from_be_bytes(a))
    }
    fn u128_be(&mut self) -> Result<u128, WireError> {
        let s = self.take(16)?;
        let mut a = [0u8; 16];
        a.copy_from_slice(s);
        Ok(u128::from_be_bytes(a))
    }
    fn bytes32(&mut self) -> Result<[u8; 32], WireError> {
        let s = self.take(32)?;
        let mut a = [0u8; 32];
        a.copy_from_slice(s);
        Ok(a)
    }
    fn bytes64(&mut self) -> Result<[u8; 64], WireError> {
        let s = self.take(64)?;
        let mut a = [0u8; 64];
        a.copy_from_slice(s);
        Ok(a)
    }
    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }
}

fn opcode_to_u8(op: Opcode) -> u8 {
    op as u8
}

fn opcode_from_u8(v: u8) -> Result<Opcode, WireError> {
    Ok(match v {
        0 => Opcode::Send,
        1 => Opcode::Receive,
        2 => Opcode::Change,
        3 => Opcode::Credit,
        4 => Opcode::Reward,
        5 => Opcode::Destroy,
        6 => Opcode::Bind,
        other => return Err(WireError::UnknownOpcode(other)),
    })
}

fn write_common_prefix(buf: &mut Vec<u8>, type_tag: u8, c: &BlockCommon) {
    write_u8(buf, type_tag);
    write_u8(buf, opcode_to_u8(c.opcode));
    write_u16_be(buf, c.credit);
    write_u32_be(buf, c.counter);
    write_i64_be(buf, c.timestamp);
    write_u64_be(buf, c.height);
    write_bytes32(buf, c.account.as_bytes());
    write_bytes32(buf, c.previous.as_bytes());
}

/// Serializes the hash-covered bytes of a block, excluding its signature.
pub fn encode_preimage(block: &Block) -> Vec<u8> {
    let mut buf = Vec::with_capacity(256);
    match block {
        Block::Tx(b) => {
            write_common_prefix(&mut buf, BlockType::Transaction as u8, &b.common);
            write_bytes32(&mut buf, b.representative.as_bytes());
            write_u128_be(&mut buf, b.balance);
            write_bytes32(&mut buf, b.link.as_bytes());
            write_u32_be(&mut buf, b.extensions.len() as u32);
            buf.extend_from_slice(&b.extensions);
        }
        Block::Rep(b) => {
            write_common_prefix(&mut buf, BlockType::Representative as u8, &b.common);
            write_u128_be(&mut buf, b.balance);
            write_bytes32(&mut buf, b.link.as_bytes());
            if let Some(chain) = b.chain {
                write_u32_be(&mut buf, chain);
            }
        }
        Block::Ad(b) => {
            write_common_prefix(&mut buf, BlockType::Airdrop as u8, &b.common);
            write_bytes32(&mut buf, b.representative.as_bytes());
            write_u128_be(&mut buf, b.balance);
            write_bytes32(&mut buf, b.link.as_bytes());
        }
    }
    buf
}

/// Serializes a block's full wire representation, including its signature.
/// This is the form stored in the ledger and sent over the network in `QUERY` responses.
pub fn encode_full(block: &Block) -> Vec<u8> {
    let mut buf = encode_preimage(block);
    buf.extend_from_slice(&block.common().signature.0);
    buf
}

/// Decodes a block from its full wire representation (as produced by [`encode_full`]).
pub fn decode_full(bytes: &[u8]) -> Result<Block, WireError> {
    let mut r = Reader::new(bytes);
    let type_tag = r.u8()?;
    let opcode = opcode_from_u8(r.u8()?)?;
    let credit = r.u16_be()?;
    let counter = r.u32_be()?;
    let timestamp = r.i64_be()?;
    let height = r.u64_be()?;
    let account = Account(r.bytes32()?);
    let previous = Hash(r.bytes32()?);

    let block = match type_tag {
        1 => {
            let representative = Account(r.bytes32()?);
            let balance: Amount = r.u128_be()?;
            let link = Hash(r.bytes32()?);
            let ext_len = r.u32_be()? as usize;
            if ext_len > crate::MAX_EXTENSIONS_BYTES {
                return Err(WireError::ExtensionsTooLong(ext_len as u32));
            }
            let extensions = r.take(ext_len)?.to_vec();
            let signature = Signature(r.bytes64()?);
            Block::Tx(TransactionBlock {
                common: BlockCommon {
                    opcode,
                    credit,
                    counter,
                    timestamp,
                    height,
                    account,
                    previous,
                    signature,
                },
                representative,
                balance,
                link,
                extensions,
            })
        }
        2 => {
            let balance: Amount = r.u128_be()?;
            let link = Hash(r.bytes32()?);
            // The optional chain tag is only present when 4 extra bytes remain
            // before the trailing 64-byte signature.
            let chain = if r.remaining() == 64 + 4 {
                Some(r.u32_be()?)
            } else {
                None
            };
            let signature = Signature(r.bytes64()?);
            Block::Rep(RepresentativeBlock {
                common: BlockCommon {
                    opcode,
                    credit,
                    counter,
                    timestamp,
                    height,
                    account,
                    previous,
                    signature,
                },
                balance,
                link,
                chain,
            })
        }
        3 => {
            let representative = Account(r.bytes32()?);
            let balance: Amount = r.u128_be()?;
            let link = Hash(r.bytes32()?);
            let signature = Signature(r.bytes64()?);
            Block::Ad(AirdropBlock {
                common: BlockCommon {
                    opcode,
                    credit,
                    counter,
                    timestamp,
                    height,
                    account,
                    previous,
                    signature,
                },
                representative,
                balance,
                link,
            })
        }
        other => return Err(WireError::UnknownType(other)),
    };

    if r.remaining() != 0 {
        return Err(WireError::TrailingBytes);
    }
    Ok(block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::Account;

    fn sample_tx() -> Block {
        Block::Tx(TransactionBlock {
            common: BlockCommon {
                opcode: Opcode::Send,
                credit: 1,
                counter: 7,
                timestamp: 1_700_000_000,
                height: 3,
                account: Account([9u8; 32]),
                previous: Hash([8u8; 32]),
                signature: Signature([5u8; 64]),
            },
            representative: Account([1u8; 32]),
            balance: 12345,
            link: Hash([2u8; 32]),
            extensions: vec![1, 2, 3],
        })
    }

    #[test]
    fn round_trips_transaction_block() {
        let block = sample_tx();
        let bytes = encode_full(&block);
        let decoded = decode_full(&bytes).expect("decode");
        assert_eq!(decoded, block);
    }

    #[test]
    fn preimage_excludes_signature() {
        let mut a = sample_tx();
        let b = sample_tx();
        if let Block::Tx(tx) = &mut a {
            tx.common.signature = Signature([0xFFu8; 64]);
        }
        assert_eq!(encode_preimage(&a), encode_preimage(&b));
        assert_ne!(encode_full(&a), encode_full(&b));
    }

    #[test]
    fn rejects_oversized_extensions_length_field() {
        let mut buf = encode_preimage(&sample_tx());
        // Corrupt the extensions_length field in place by rebuilding with a bad value.
        let block = sample_tx();
        let mut tampered = Vec::new();
        if let Block::Tx(tx) = &block {
            write_common_prefix(&mut tampered, 1, &tx.common);
            write_bytes32(&mut tampered, tx.representative.as_bytes());
            write_u128_be(&mut tampered, tx.balance);
            write_bytes32(&mut tampered, tx.link.as_bytes());
            write_u32_be(&mut tampered, 9999);
        }
        tampered.extend_from_slice(&[0u8; 9999]);
        tampered.extend_from_slice(&[0u8; 64]);
        assert!(matches!(
            decode_full(&tampered),
            Err(WireError::ExtensionsTooLong(9999))
        ));
        // keep the original helper exercised too
        assert!(!buf.is_empty());
        buf.clear();
    }

    #[test]
    fn rejects_unknown_type_tag() {
        let mut buf = vec![99u8];
        buf.extend_from_slice(&[0u8; 200]);
        assert!(matches!(decode_full(&buf), Err(WireError::UnknownType(99))));
    }
}
