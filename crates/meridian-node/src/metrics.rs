// Path: crates/meridian-node/src/metrics.rs
//! Accessors onto the process-wide metrics sink, for the subsystems wired
//! together in this crate (block processor, syncer, rewarder).
//!
//! The sink itself is configured once by the daemon entrypoint via
//! `meridian_telemetry::sinks::SINK`; every subsystem here just reads through
//! it, falling back to a no-op when telemetry hasn't been wired up (tests).

use meridian_telemetry::sinks::{ElectionMetricsSink, LedgerMetricsSink, NetworkMetricsSink, NopSink};

static NOP_SINK: NopSink = NopSink;

/// Election-shaped counters (confirms, forks) driven by the block processor.
pub fn elections() -> &'static dyn ElectionMetricsSink {
    meridian_telemetry::sinks::SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Ledger-shaped counters (appends, rollbacks) driven by the block processor.
pub fn ledger() -> &'static dyn LedgerMetricsSink {
    meridian_telemetry::sinks::SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Peer/sync-shaped gauges driven by the syncer and peer set.
pub fn network() -> &'static dyn NetworkMetricsSink {
    meridian_telemetry::sinks::SINK.get().copied().unwrap_or(&NOP_SINK)
}
