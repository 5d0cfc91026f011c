// Path: crates/telemetry/src/sinks.rs
//! Defines abstract traits for metrics reporting, decoupling core logic from the backend.

use once_cell::sync::OnceCell;

// --- Static Sink Access ---

/// A no-op sink for use in tests or when telemetry is disabled.
#[derive(Debug, Clone, Copy)]
pub struct NopSink;

/// A lazily-initialized static reference to the global `MetricsSink` implementation.
pub static SINK: OnceCell<&'static dyn MetricsSink> = OnceCell::new();
static NOP_SINK: NopSink = NopSink;

/// Returns a static reference to the configured error metrics sink.
/// If no sink has been initialized, it returns a no-op sink.
pub fn error_metrics() -> &'static dyn ErrorMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns a static reference to the configured service metrics sink.
/// If no sink has been initialized, it returns a no-op sink.
pub fn service_metrics() -> &'static dyn ServiceMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

// --- Trait Definitions ---

/// A sink for metrics related to the account-chain ledger store.
pub trait LedgerMetricsSink: Send + Sync + std::fmt::Debug {
    /// Counts calls to `Ledger::open`, including reopens.
    fn inc_opens(&self);
    /// Increments the total number of blocks appended across all accounts.
    fn inc_blocks_appended(&self, count: u64);
    /// Increments the total number of blocks rolled back during fork resolution.
    fn inc_blocks_rolled_back(&self, count: u64);
    /// Sets the gauge for the current number of outstanding receivables.
    fn set_receivables_outstanding(&self, count: u64);
    /// Sets the gauge for the current number of outstanding rewardables.
    fn set_rewardables_outstanding(&self, count: u64);
}
impl LedgerMetricsSink for NopSink {
    fn inc_opens(&self) {}
    fn inc_blocks_appended(&self, _count: u64) {}
    fn inc_blocks_rolled_back(&self, _count: u64) {}
    fn set_receivables_outstanding(&self, _count: u64) {}
    fn set_rewardables_outstanding(&self, _count: u64) {}
}

/// A sink for metrics related to the networking layer (libp2p).
pub trait NetworkMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments a counter for gossip messages received, labeled by topic.
    fn inc_gossip_messages_received(&self, topic: &str);
    /// Increments a counter for RPC requests received, labeled by method. (Deprecated)
    fn inc_rpc_requests_received(&self, method: &str);
    /// Increments the gauge for the current number of connected peers.
    fn inc_connected_peers(&self);
    /// Decrements the gauge for the current number of connected peers.
    fn dec_connected_peers(&self);
    /// Sets a gauge vector to indicate the current synchronization state of the node.
    fn set_node_state(&self, state_name: &str);
}
impl NetworkMetricsSink for NopSink {
    fn inc_gossip_messages_received(&self, _topic: &str) {}
    fn inc_rpc_requests_received(&self, _method: &str) {}
    fn inc_connected_peers(&self) {}
    fn dec_connected_peers(&self) {}
    fn set_node_state(&self, _state_name: &str) {}
}

/// A sink for metrics related to the per-account election engine.
pub trait ElectionMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments the counter for elections confirmed.
    fn inc_confirms(&self);
    /// Increments the counter for elections that detected a fork.
    fn inc_forks_detected(&self);
    /// Sets the gauge for the number of elections currently in flight.
    fn set_active_elections(&self, count: u64);
    /// Observes the duration of a single scheduler tick.
    fn observe_tick_duration(&self, duration_secs: f64);
}
impl ElectionMetricsSink for NopSink {
    fn inc_confirms(&self) {}
    fn inc_forks_detected(&self) {}
    fn set_active_elections(&self, _count: u64) {}
    fn observe_tick_duration(&self, _duration_secs: f64) {}
}

/// A sink for metrics related to the public RPC server.
pub trait RpcMetricsSink: Send + Sync + std::fmt::Debug {
    /// Observes the latency of an RPC request, labeled by route.
    fn observe_request_duration(&self, route: &str, duration_secs: f64);
    /// Increments a counter for total RPC requests, labeled by route and status code.
    fn inc_requests_total(&self, route: &str, status_code: u16);
    /// Increments a counter for transactions added to the mempool via RPC.
    fn inc_mempool_transactions_added(&self);
    /// Sets the gauge for the current number of transactions in the mempool.
    fn set_mempool_size(&self, size: f64);
}
impl RpcMetricsSink for NopSink {
    fn observe_request_duration(&self, _route: &str, _duration_secs: f64) {}
    fn inc_requests_total(&self, _route: &str, _status_code: u16) {}
    fn inc_mempool_transactions_added(&self) {}
    fn set_mempool_size(&self, _size: f64) {}
}

/// A sink for recording structured error metrics.
pub trait ErrorMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments a counter for a specific error, categorized by its kind and variant.
    fn inc_error(&self, kind: &'static str, variant: &'static str);
}
impl ErrorMetricsSink for NopSink {
    fn inc_error(&self, _kind: &'static str, _variant: &'static str) {}
}

/// A sink for service-level metrics related to the generic dispatch mechanism.
pub trait ServiceMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments a counter when a required service capability cannot be found. (Deprecated)
    fn inc_capability_resolve_fail(&self, capability: &str);
    /// Observes the latency of a dispatched `handle_service_call`, labeled by service and method.
    fn observe_service_dispatch_latency(&self, service_id: &str, method: &str, duration_secs: f64);
    /// Increments a counter for errors returned from `handle_service_call`, labeled by reason.
    fn inc_dispatch_error(&self, service_id: &str, method: &str, reason: &'static str);
}
impl ServiceMetricsSink for NopSink {
    fn inc_capability_resolve_fail(&self, _capability: &str) {}
    fn observe_service_dispatch_latency(
        &self,
        _service_id: &str,
        _method: &str,
        _duration_secs: f64,
    ) {
    }
    fn inc_dispatch_error(&self, _service_id: &str, _method: &str, _reason: &'static str) {}
}

/// A unified sink that implements all domain-specific traits, providing a single
/// point of implementation for metrics backends like Prometheus.
pub trait MetricsSink:
    LedgerMetricsSink
    + NetworkMetricsSink
    + ElectionMetricsSink
    + RpcMetricsSink
    + ErrorMetricsSink
    + ServiceMetricsSink
{
}

// Blanket implementation to allow any type that implements all sub-traits
// to be used as a `MetricsSink`.
impl<T> MetricsSink for T where
    T: LedgerMetricsSink
        + NetworkMetricsSink
        + ElectionMetricsSink
        + RpcMetricsSink
        + ErrorMetricsSink
        + ServiceMetricsSink
{
}
