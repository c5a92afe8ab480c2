use std::sync::OnceLock;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus exporter and register all ledger metrics.
/// Returns a `PrometheusHandle` whose `render()` method produces the
/// text/plain Prometheus scrape payload.
///
/// Only one recorder can exist per process; later calls return the same handle.
pub fn init_metrics() -> PrometheusHandle {
    HANDLE
        .get_or_init(|| {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder");

            // Pre-register counters so they appear even before the first increment.
            counter!("transactions_recorded_total").absolute(0);
            counter!("transactions_confirmed_total").absolute(0);
            counter!("transactions_failed_total").absolute(0);
            counter!("duplicate_hashes_total").absolute(0);
            counter!("allocations_created_total").absolute(0);
            counter!("allocations_rejected_total").absolute(0);
            counter!("withdrawals_total").absolute(0);

            // Pre-register gauges at zero.
            gauge!("split_total_percentage").set(0.0);
            gauge!("split_recipients").set(0.0);
            gauge!("pending_allocations").set(0.0);

            // Histogram is lazily created on first record; force creation.
            histogram!("allocation_latency_seconds").record(0.0);

            handle
        })
        .clone()
}
