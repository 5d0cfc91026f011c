// Path: crates/meridian-node/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::todo,
        clippy::unimplemented,
        clippy::indexing_slicing
    )
)]
//! Wires the single-writer block processor, the per-account election
//! scheduler, the outbound query tracker, the bootstrap syncer, and the
//! node's own reward-sweep chain into one cooperatively-ticked [`Node`].
//!
//! There is no background thread spawned here: each subsystem is driven by
//! an explicit call into [`Node::tick`], mirroring the cooperative
//! `wait_until`-style scheduling the election engine already uses for its
//! own loop. The daemon entrypoint (`src/bin/meridian-node.rs`) is what
//! turns this into a real process with worker threads and timers.

use std::time::{Duration, Instant};

use meridian_elections::{Scheduler, WeightSource};
use meridian_ledger::Ledger;
use meridian_types::config::LogConfig;
use meridian_types::primitives::Account;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

/// Gap-cache entries older than this are resubmitted on every tick, in case
/// their dependency landed through a path other than [`Node::route_event`]'s
/// resolve-on-append hook (e.g. it arrived via a ledger restore).
const GAP_SWEEP_HORIZON: Duration = Duration::from_secs(30);

/// Outbound queries still unanswered at `due()` time are treated as timed
/// out and fed back into [`BlockQueries::record_response`] so their
/// backoff/miss bookkeeping advances even without a live transport. The
/// transport itself (owned by whatever embeds a real [`meridian_networking`]
/// `Peers`) is responsible for actually resending the query to a peer.
const QUERY_TIMEOUT_RETRIES: usize = 3;

/// Installs the global `tracing` subscriber, honoring `RUST_LOG` if set and
/// falling back to `config.directive` otherwise. Call exactly once, before
/// any subsystem thread spawns.
pub fn init_tracing(config: &LogConfig) {
    let fmt_layer = fmt::layer().with_writer(std::io::stderr).with_target(true);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.directive.clone()));
    let subscriber = Registry::default().with(filter).with(fmt_layer);
    let _ = tracing::subscriber::set_global_default(subscriber);
}

pub mod gap_cache;
pub mod metrics;
pub mod processor;
pub mod queries;
pub mod rewarder;
pub mod syncer;

pub use gap_cache::GapCache;
pub use processor::{BlockProcessor, Event, Outcome, Priority};
pub use queries::{AckDecision, BlockQueries, QueryStatus};
pub use rewarder::Rewarder;
pub use syncer::{Action as SyncAction, Syncer};

/// Everything a running node needs to process, confirm, sync, and reward
/// blocks, minus the network transport and the app-framework collaborators
/// (registered separately via [`BlockProcessor::subscribe_app`]).
pub struct Node {
    /// The single-writer block processing engine.
    pub processor: BlockProcessor,
    /// The per-account election scheduler.
    pub elections: Scheduler,
    /// The outbound block-request tracker.
    pub queries: BlockQueries,
    /// The per-account bootstrap syncer.
    pub syncer: Syncer,
    /// The node's own reward-sweep automation, if this node has a signing key.
    pub rewarder: Option<Rewarder>,
}

/// What happened during one [`Node::tick`].
#[derive(Default)]
pub struct TickSummary {
    /// The processor event produced this tick, if any operation was queued.
    pub processor_event: Option<ProcessorEventSummary>,
    /// Whether an election advanced this tick.
    pub election_ticked: bool,
    /// Reward/receive blocks the rewarder queued for submission this tick
    /// (first sends plus this tick's republishes).
    pub rewards_emitted: usize,
    /// Outstanding queries that were past their backoff deadline this tick
    /// and have been marked as timed out in [`BlockQueries`]'s bookkeeping.
    pub queries_timed_out: usize,
    /// Account syncs [`Syncer`] dropped this tick because the block the
    /// processor reported was a fork.
    pub syncs_dropped: usize,
}

/// A simplified view of a [`processor::Event`] for callers outside this crate.
pub struct ProcessorEventSummary {
    /// The account the event concerns.
    pub account: Account,
    /// Whether the operation produced an error instead of completing cleanly.
    pub failed: bool,
}

impl Node {
    /// Builds a node around an already-open `ledger`. Pass `reward_identity`
    /// to enable the reward-sweep automation for this node's own account.
    pub fn new(ledger: Ledger, reward_identity: Option<RewardIdentity>) -> Self {
        let rewarder = reward_identity.map(|id| {
            Rewarder::new(
                id.account,
                id.secret,
                id.fan_width,
                id.forward_reward_to,
                id.daily_forward_times,
            )
        });
        Node {
            processor: BlockProcessor::new(ledger),
            elections: Scheduler::new(),
            queries: BlockQueries::new(),
            syncer: Syncer::new(),
            rewarder,
        }
    }

    /// Drains one queued processor operation, ticks the election scheduler
    /// once, and (if a rewarder is configured) scans for matured rewards.
    /// Returns a summary of what happened; callers loop this until it
    /// reports nothing left to do.
    pub fn tick(&mut self, ledger: &Ledger, weight_source: &dyn WeightSource, now: Instant, utc_day: u64) -> TickSummary {
        let mut summary = TickSummary::default();

        self.processor.sweep_gap_cache(GAP_SWEEP_HORIZON);

        for (sequence, ..) in self.queries.due(now) {
            let decision = self.queries.record_response(sequence, QueryStatus::Timeout, now, |acks| {
                if acks.len() >= QUERY_TIMEOUT_RETRIES {
                    AckDecision::Finish
                } else {
                    AckDecision::Continue
                }
            });
            if decision.is_some() {
                summary.queries_timed_out += 1;
            }
        }

        if let Some(event) = self.processor.drain_one() {
            self.route_event(ledger, &event, &mut summary);
            summary.processor_event = Some(ProcessorEventSummary {
                account: event_account(&event.outcome),
                failed: event.error.is_some(),
            });
        }

        if let Some((account, height, outcome)) = self.elections.tick_next_due(weight_source, now) {
            summary.election_ticked = true;
            if matches!(outcome, meridian_elections::RoundOutcome::Confirmed { .. }) {
                self.processor.add_forced_confirm(account, height);
            }
        }

        if let Some(rewarder) = self.rewarder.as_mut() {
            let now_unix = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0);
            if let Ok(blocks) = rewarder.scan_and_emit(ledger, now_unix, utc_day) {
                summary.rewards_emitted += blocks.len();
                for block in blocks {
                    self.processor.add(block, Priority::Forced);
                }
            }
            let republish = rewarder.due_for_republish(now);
            summary.rewards_emitted += republish.len();
            for block in republish {
                self.processor.add(block, Priority::Retry);
            }
        }

        summary
    }

    /// Reacts to a just-fired processor event: feeds the rewarder its own
    /// confirmations, resolves anything in the gap cache waiting on a block
    /// that just landed, and drops an in-flight sync whose submitted block
    /// turned out to be a fork.
    fn route_event(&mut self, ledger: &Ledger, event: &Event, summary: &mut TickSummary) {
        match &event.outcome {
            Outcome::Appended { hash, .. } | Outcome::Prepended { hash, .. } => {
                self.processor.resolve_gap(hash);
            }
            Outcome::Fork { account, .. } => {
                if self.syncer.is_syncing(account) {
                    self.syncer.fork_or_genesis_exhausted(account);
                    summary.syncs_dropped += 1;
                }
            }
            Outcome::Confirmed { account, height } => {
                let Some(rewarder) = self.rewarder.as_mut() else {
                    return;
                };
                if let Ok(txn) = ledger.begin_read() {
                    if let Ok(Some(hash)) = txn.block_index_get(account, *height) {
                        rewarder.confirmed(&hash);
                    }
                }
            }
            Outcome::AlreadyExists { .. } | Outcome::Gap { .. } => {}
        }
    }
}

/// Signing identity and reward policy for a node's own account.
pub struct RewardIdentity {
    /// The node's own account.
    pub account: Account,
    /// The raw secret key, split across [`Self::fan_width`] pads immediately.
    pub secret: [u8; 32],
    /// How many pads to split the secret across.
    pub fan_width: usize,
    /// The account swept rewards are forwarded to, if configured.
    pub forward_reward_to: Option<Account>,
    /// Maximum reward/receive sends per UTC day.
    pub daily_forward_times: u32,
}

fn event_account(outcome: &Outcome) -> Account {
    match outcome {
        Outcome::Appended { account, .. }
        | Outcome::Prepended { account, .. }
        | Outcome::AlreadyExists { account, .. }
        | Outcome::Fork { account, .. }
        | Outcome::Gap { account, .. }
        | Outcome::Confirmed { account, .. } => *account,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_elections::StaticWeightTable;

    fn open_ledger() -> (Ledger, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let ledger = Ledger::open(&dir.path().join("ledger.redb")).expect("open ledger");
        (ledger, dir)
    }

    #[test]
    fn tick_with_nothing_queued_reports_no_activity() {
        let (ledger, _dir) = open_ledger();
        let mut node = Node::new(ledger.clone(), None);
        let weights = StaticWeightTable::default();
        let summary = node.tick(&ledger, &weights, Instant::now(), 0);
        assert!(summary.processor_event.is_none());
        assert_eq!(summary.rewards_emitted, 0);
    }
}
