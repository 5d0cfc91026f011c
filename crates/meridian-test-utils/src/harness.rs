//! A minimal end-to-end wiring of a [`Ledger`] and a [`BlockProcessor`]
//! (plus, where a scenario needs it, an election [`Scheduler`]) with no
//! networking, for scenario and property tests to drive directly.

use tempfile::TempDir;

use meridian_elections::{Scheduler, StaticWeightTable, WeightSource};
use meridian_ledger::Ledger;
use meridian_node::{BlockProcessor, Event, Priority};
use meridian_types::Block;

/// Owns a temporary `redb` file and the [`BlockProcessor`] writing to it.
/// The temp directory is removed when the harness is dropped.
pub struct TestHarness {
    _dir: TempDir,
    /// The shared ledger handle (cheap to clone; all writes still serialize
    /// through `processor`).
    pub ledger: Ledger,
    /// The single-writer block processor under test.
    pub processor: BlockProcessor,
    /// The per-account election scheduler, ticked manually by scenario tests
    /// that exercise confirmation rather than just raw append.
    pub elections: Scheduler,
    /// A flat weight table scenario tests can populate before ticking elections.
    pub weights: StaticWeightTable,
}

impl TestHarness {
    /// Opens a fresh ledger backed by a new temporary directory.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir for test ledger");
        let ledger = Ledger::open(dir.path().join("ledger.redb")).expect("open test ledger");
        let processor = BlockProcessor::new(ledger.clone());
        TestHarness {
            _dir: dir,
            ledger,
            processor,
            elections: Scheduler::new(),
            weights: StaticWeightTable::default(),
        }
    }

    /// Submits `block` at `priority` and drains exactly one resulting event,
    /// panicking if the queue produced none (a caller bug, not a test failure
    /// mode worth a `Result`).
    pub fn submit(&mut self, block: Block, priority: Priority) -> Event {
        self.processor.add(block, priority);
        self.processor
            .drain_one()
            .expect("submitting a block must produce exactly one event")
    }

    /// Drains every currently queued event, in order.
    pub fn drain_all(&mut self) -> Vec<Event> {
        std::iter::from_fn(|| self.processor.drain_one()).collect()
    }

    /// Advances the election scheduler once using this harness's weight table.
    pub fn tick_elections(&mut self, now: std::time::Instant) -> Option<(meridian_types::primitives::Account, meridian_types::primitives::Height, meridian_elections::RoundOutcome)> {
        self.elections.tick_next_due(&self.weights as &dyn WeightSource, now)
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
