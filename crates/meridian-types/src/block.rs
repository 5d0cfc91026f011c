// Path: crates/meridian-types/src/block.rs
//! The `Block` data model.
//!
//! A block is an immutable record on one account's chain. Three concrete
//! variants share a common field prefix; opcode is constrained to a set of
//! type-specific combinations enforced by [`Opcode::valid_for`].

use crate::primitives::{Account, Amount, Hash, Height, Signature};
use serde::{Deserialize, Serialize};

/// The three block variants, tagged by `type` on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum BlockType {
    /// A transaction block: send, receive, change, credit, reward, destroy.
    Transaction = 1,
    /// A representative block: change of representative/balance with an optional chain tag.
    Representative = 2,
    /// An airdrop block.
    Airdrop = 3,
}

/// The operation a block performs against its account's state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    /// Decreases balance, creates a receivable for `link`.
    Send = 0,
    /// Increases balance, consumes a receivable created by a matching send.
    Receive = 1,
    /// Changes representative; balance unchanged.
    Change = 2,
    /// Decreases balance by the era credit price; increases the credit counter.
    Credit = 3,
    /// Consumes a rewardable entry; increases balance.
    Reward = 4,
    /// Zeroes balance; ends the account.
    Destroy = 5,
    /// Records an external-chain signer address for the account.
    Bind = 6,
}

impl Opcode {
    /// Whether this opcode is a permitted operation for the given block type.
    ///
    /// Permitted combinations, per the specification's data model:
    /// Transaction: send, receive, change, credit, reward, destroy, bind.
    /// Representative: change, bind.
    /// Airdrop: receive.
    pub fn valid_for(self, block_type: BlockType) -> bool {
        use BlockType::*;
        use Opcode::*;
        matches!(
            (block_type, self),
            (Transaction, Send)
                | (Transaction, Receive)
                | (Transaction, Change)
                | (Transaction, Credit)
                | (Transaction, Reward)
                | (Transaction, Destroy)
                | (Transaction, Bind)
                | (Representative, Change)
                | (Representative, Bind)
                | (Airdrop, Receive)
        )
    }
}

/// Fields common to every block variant, in hash-covered order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockCommon {
    /// The operation this block performs.
    pub opcode: Opcode,
    /// Number of credits consumed to publish this block (era-rate-limiting unit).
    pub credit: u16,
    /// Monotonically increasing per-account nonce-like counter.
    pub counter: u32,
    /// Unix timestamp in seconds at which the block was signed.
    pub timestamp: i64,
    /// This block's position on its account's chain. `0` is the first block.
    pub height: Height,
    /// The account whose chain this block belongs to.
    pub account: Account,
    /// The hash of the block at `height - 1` on this chain, or [`Hash::ZERO`] at height 0.
    pub previous: Hash,
    /// The Ed25519 signature over the hash-covered serialization (excludes itself).
    pub signature: Signature,
}

/// A `Transaction`-type block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionBlock {
    /// Common hash-covered fields.
    pub common: BlockCommon,
    /// The representative this account delegates weight to as of this block.
    pub representative: Account,
    /// The account balance after this block is applied.
    pub balance: Amount,
    /// Opcode-dependent linkage: destination account for `send`, source block hash
    /// (as an account-shaped value) for `receive`/`reward`, unused otherwise.
    pub link: Hash,
    /// Optional application-defined payload, capped at [`crate::MAX_EXTENSIONS_BYTES`].
    pub extensions: Vec<u8>,
}

/// A `Representative`-type block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepresentativeBlock {
    /// Common hash-covered fields.
    pub common: BlockCommon,
    /// The account balance after this block is applied (unchanged by `change`).
    pub balance: Amount,
    /// Opcode-dependent linkage.
    pub link: Hash,
    /// Optional external chain tag bound by a `bind` opcode.
    pub chain: Option<u32>,
}

/// An `Airdrop`-type block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirdropBlock {
    /// Common hash-covered fields.
    pub common: BlockCommon,
    /// The representative this account delegates weight to as of this block.
    pub representative: Account,
    /// The account balance after this block is applied.
    pub balance: Amount,
    /// Opcode-dependent linkage.
    pub link: Hash,
}

/// The tagged union of all block variants.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Block {
    /// A transaction block.
    Tx(TransactionBlock),
    /// A representative block.
    Rep(RepresentativeBlock),
    /// An airdrop block.
    Ad(AirdropBlock),
}

impl Block {
    /// The wire/data-model type tag for this block.
    pub fn block_type(&self) -> BlockType {
        match self {
            Block::Tx(_) => BlockType::Transaction,
            Block::Rep(_) => BlockType::Representative,
            Block::Ad(_) => BlockType::Airdrop,
        }
    }

    /// Common fields, regardless of variant.
    pub fn common(&self) -> &BlockCommon {
        match self {
            Block::Tx(b) => &b.common,
            Block::Rep(b) => &b.common,
            Block::Ad(b) => &b.common,
        }
    }

    /// The opcode this block performs.
    pub fn opcode(&self) -> Opcode {
        self.common().opcode
    }

    /// The account whose chain this block belongs to.
    pub fn account(&self) -> Account {
        self.common().account
    }

    /// This block's height on its account chain.
    pub fn height(&self) -> Height {
        self.common().height
    }

    /// The hash of the preceding block on this chain.
    pub fn previous(&self) -> Hash {
        self.common().previous
    }

    /// The block's signed timestamp.
    pub fn timestamp(&self) -> i64 {
        self.common().timestamp
    }

    /// The account balance after this block is applied, when the variant carries one.
    pub fn balance(&self) -> Amount {
        match self {
            Block::Tx(b) => b.balance,
            Block::Rep(b) => b.balance,
            Block::Ad(b) => b.balance,
        }
    }

    /// The opcode-dependent link field, when the variant carries one.
    pub fn link(&self) -> Hash {
        match self {
            Block::Tx(b) => b.link,
            Block::Rep(b) => b.link,
            Block::Ad(b) => b.link,
        }
    }

    /// The delegated representative, for variants that carry one.
    pub fn representative(&self) -> Option<Account> {
        match self {
            Block::Tx(b) => Some(b.representative),
            Block::Rep(_) => None,
            Block::Ad(b) => Some(b.representative),
        }
    }

    /// Structural shape checks independent of chain context: opcode/type combination,
    /// extensions length, and height-zero implies a zero `previous`.
    pub fn check_structure(&self) -> Result<(), StructureError> {
        if !self.opcode().valid_for(self.block_type()) {
            return Err(StructureError::OpcodeTypeMismatch);
        }
        if self.height() == 0 && !self.previous().is_zero() {
            return Err(StructureError::NonZeroPreviousAtGenesis);
        }
        if let Block::Tx(b) = self {
            if b.extensions.len() > crate::MAX_EXTENSIONS_BYTES {
                return Err(StructureError::ExtensionsTooLong);
            }
        }
        if self.opcode() == Opcode::Credit {
            let credit_ok = self.common().credit > 0;
            if !credit_ok {
                return Err(StructureError::ZeroCredit);
            }
        }
        Ok(())
    }
}

/// Structural validation failures independent of chain/ledger context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StructureError {
    /// The opcode is not a permitted operation for this block's type.
    #[error("opcode is not valid for this block type")]
    OpcodeTypeMismatch,
    /// Height-0 block must have a zero `previous` pointer.
    #[error("height-zero block must have a zero previous pointer")]
    NonZeroPreviousAtGenesis,
    /// The `extensions` payload exceeds the maximum permitted length.
    #[error("extensions payload exceeds maximum length")]
    ExtensionsTooLong,
    /// A `credit` opcode block declared zero credits.
    #[error("credit block declares zero credit")]
    ZeroCredit,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn common(opcode: Opcode, height: Height, previous: Hash) -> BlockCommon {
        BlockCommon {
            opcode,
            credit: 1,
            counter: 0,
            timestamp: 0,
            height,
            account: Account::ZERO,
            previous,
            signature: Signature::default(),
        }
    }

    #[test]
    fn rejects_mismatched_opcode_and_type() {
        let block = Block::Rep(RepresentativeBlock {
            common: common(Opcode::Send, 0, Hash::ZERO),
            balance: 0,
            link: Hash::ZERO,
            chain: None,
        });
        assert_eq!(
            block.check_structure(),
            Err(StructureError::OpcodeTypeMismatch)
        );
    }

    #[test]
    fn rejects_nonzero_previous_at_genesis() {
        let block = Block::Tx(TransactionBlock {
            common: common(Opcode::Send, 0, Hash([1u8; 32])),
            representative: Account::ZERO,
            balance: 0,
            link: Hash::ZERO,
            extensions: vec![],
        });
        assert_eq!(
            block.check_structure(),
            Err(StructureError::NonZeroPreviousAtGenesis)
        );
    }

    #[test]
    fn rejects_oversized_extensions() {
        let block = Block::Tx(TransactionBlock {
            common: common(Opcode::Send, 1, Hash([1u8; 32])),
            representative: Account::ZERO,
            balance: 0,
            link: Hash::ZERO,
            extensions: vec![0u8; crate::MAX_EXTENSIONS_BYTES + 1],
        });
        assert_eq!(
            block.check_structure(),
            Err(StructureError::ExtensionsTooLong)
        );
    }

    #[test]
    fn rejects_zero_credit_block() {
        let mut c = common(Opcode::Credit, 1, Hash([1u8; 32]));
        c.credit = 0;
        let block = Block::Tx(TransactionBlock {
            common: c,
            representative: Account::ZERO,
            balance: 0,
            link: Hash::ZERO,
            extensions: vec![],
        });
        assert_eq!(block.check_structure(), Err(StructureError::ZeroCredit));
    }

    #[test]
    fn accepts_well_formed_send() {
        let block = Block::Tx(TransactionBlock {
            common: common(Opcode::Send, 1, Hash([1u8; 32])),
            representative: Account::ZERO,
            balance: 0,
            link: Hash::ZERO,
            extensions: vec![],
        });
        assert!(block.check_structure().is_ok());
    }
}
