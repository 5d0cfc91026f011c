// Path: crates/meridian-elections/src/metrics.rs
use meridian_telemetry::sinks::{ElectionMetricsSink, NopSink};
use once_cell::sync::OnceCell;

static NOP_SINK: NopSink = NopSink;
pub static SINK: OnceCell<&'static dyn ElectionMetricsSink> = OnceCell::new();

pub fn metrics() -> &'static dyn ElectionMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}
