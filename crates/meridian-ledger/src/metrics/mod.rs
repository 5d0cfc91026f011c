// Path: crates/meridian-ledger/src/metrics/mod.rs
use meridian_telemetry::sinks::{LedgerMetricsSink, NopSink};
use once_cell::sync::OnceCell;

static NOP_SINK: NopSink = NopSink;
pub static SINK: OnceCell<&'static dyn LedgerMetricsSink> = OnceCell::new();

pub fn metrics() -> &'static dyn LedgerMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

pub(crate) fn record_open() {
    metrics().inc_opens();
}

pub(crate) fn record_blocks_appended(count: u64) {
    metrics().inc_blocks_appended(count);
}

pub(crate) fn record_blocks_rolled_back(count: u64) {
    metrics().inc_blocks_rolled_back(count);
}
