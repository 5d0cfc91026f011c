//! Test fixtures for reproducible tests.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use meridian_crypto::hash::block_hash;
use meridian_crypto::sign::sign_hash;
use meridian_types::block::{BlockCommon, Opcode, TransactionBlock};
use meridian_types::primitives::{Account, Amount, Hash};
use meridian_types::{Block, KeyPair};

/// Test fixture manager for reading/writing fixture files on disk.
pub struct Fixtures {
    /// Base directory for fixtures
    base_dir: PathBuf,
}

impl Fixtures {
    /// Create a new fixtures manager with the specified base directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> io::Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    /// Get a fixture file path
    pub fn path<P: AsRef<Path>>(&self, relative_path: P) -> PathBuf {
        self.base_dir.join(relative_path)
    }

    /// Read a fixture file
    pub fn read<P: AsRef<Path>>(&self, relative_path: P) -> io::Result<Vec<u8>> {
        let path = self.path(relative_path);
        fs::read(path)
    }

    /// Write data to a fixture file
    pub fn write<P: AsRef<Path>, C: AsRef<[u8]>>(&self, relative_path: P, contents: C) -> io::Result<()> {
        let path = self.path(relative_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)
    }

    /// Check if a fixture file exists
    pub fn exists<P: AsRef<Path>>(&self, relative_path: P) -> bool {
        self.path(relative_path).exists()
    }
}

/// The test-network's fixed genesis: a keypair and its signed opening block,
/// deterministic across test runs via a fixed seed rather than a hardcoded
/// historical test vector (this crate has no consensus-network identity to
/// match byte-for-byte).
pub struct TestNetworkGenesis {
    /// The genesis account's keypair.
    pub keypair: KeyPair,
    /// The signed genesis block.
    pub block: Block,
    /// The genesis block's hash.
    pub hash: Hash,
}

/// The opening balance credited to the test-network genesis account.
pub const GENESIS_BALANCE: Amount = 10_000_000;

/// Builds the test-network genesis fixture: a freshly generated keypair and
/// its signed `height=0` block opening with [`GENESIS_BALANCE`].
pub fn test_network_genesis() -> TestNetworkGenesis {
    let keypair = crate::randomness::deterministic_keypair(0);
    let mut block = Block::Tx(TransactionBlock {
        common: BlockCommon {
            opcode: Opcode::Change,
            credit: 1,
            counter: 0,
            timestamp: 0,
            height: 0,
            account: keypair.account,
            previous: Hash::ZERO,
            signature: Default::default(),
        },
        representative: keypair.account,
        balance: GENESIS_BALANCE,
        link: Hash::ZERO,
        extensions: Vec::new(),
    });
    let hash = block_hash(&block);
    let signature = sign_hash(&keypair, &hash).expect("signing a freshly built genesis block cannot fail");
    if let Block::Tx(tx) = &mut block {
        tx.common.signature = signature;
    }
    TestNetworkGenesis { keypair, block, hash }
}

/// Builds a signed `Change` block extending `previous` at `height`, useful as
/// filler when a scenario only cares about chain shape, not block semantics.
pub fn filler_block(keypair: &KeyPair, height: u64, previous: Hash, counter: u32, balance: Amount) -> Block {
    let mut block = Block::Tx(TransactionBlock {
        common: BlockCommon {
            opcode: Opcode::Change,
            credit: 1,
            counter,
            timestamp: 0,
            height,
            account: keypair.account,
            previous,
            signature: Default::default(),
        },
        representative: keypair.account,
        balance,
        link: Hash::ZERO,
        extensions: Vec::new(),
    });
    sign_in_place(&mut block, keypair);
    block
}

/// Signs `block` with `keypair`, overwriting its signature field in place.
pub fn sign_in_place(block: &mut Block, keypair: &KeyPair) {
    let hash = block_hash(block);
    let signature = sign_hash(keypair, &hash).expect("signing a freshly built test block cannot fail");
    match block {
        Block::Tx(tx) => tx.common.signature = signature,
        Block::Rep(rep) => rep.common.signature = signature,
        Block::Ad(ad) => ad.common.signature = signature,
    }
}

/// A second account's keypair, deterministic for a given `index`, for tests
/// needing more than the genesis identity (send/receive pairs, forks, ...).
pub fn test_account(index: u64) -> KeyPair {
    crate::randomness::deterministic_keypair(index)
}
