//! Prometheus metrics for the coordinator.
//!
//! [`CoordinatorMetrics`] owns its own [`Registry`] so several coordinators
//! (e.g. in tests) never collide on metric names.

use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Encoder, Histogram, HistogramOpts, IntCounter, IntGauge,
    Opts, Registry, TextEncoder,
};

pub struct CoordinatorMetrics {
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    pub registrations: IntCounter,
    /// Updates validated, recorded and buffered.
    pub updates_accepted: IntCounter,
    /// Updates refused by validation, layout checks or a closed round.
    pub updates_rejected: IntCounter,
    /// Payloads that could not be decoded with the coordinator's key.
    pub decryption_failures: IntCounter,
    pub rounds_aggregated: IntCounter,
    pub rewards_issued: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    pub registered_hospitals: IntGauge,
    pub current_round: IntGauge,
    pub chain_length: IntGauge,

    // ── Histograms ──────────────────────────────────────────────────────
    /// Wall time from quorum to recorded rewards, in milliseconds.
    pub aggregation_time_ms: Histogram,
}

fn counter(registry: &Registry, name: &str, help: &str) -> IntCounter {
    register_int_counter_with_registry!(Opts::new(name, help), registry)
        .unwrap_or_else(|e| panic!("failed to register {name}: {e}"))
}

fn gauge(registry: &Registry, name: &str, help: &str) -> IntGauge {
    register_int_gauge_with_registry!(Opts::new(name, help), registry)
        .unwrap_or_else(|e| panic!("failed to register {name}: {e}"))
}

impl CoordinatorMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let registrations = counter(
            &registry,
            "corechain_registrations_total",
            "Hospital registrations processed",
        );
        let updates_accepted = counter(
            &registry,
            "corechain_updates_accepted_total",
            "Model updates accepted into a round",
        );
        let updates_rejected = counter(
            &registry,
            "corechain_updates_rejected_total",
            "Model updates rejected",
        );
        let decryption_failures = counter(
            &registry,
            "corechain_decryption_failures_total",
            "Submissions whose weights could not be decrypted",
        );
        let rounds_aggregated = counter(
            &registry,
            "corechain_rounds_aggregated_total",
            "Training rounds aggregated",
        );
        let rewards_issued = counter(
            &registry,
            "corechain_rewards_issued_total",
            "Reward distributions recorded",
        );

        let registered_hospitals = gauge(
            &registry,
            "corechain_registered_hospitals",
            "Hospitals known to the coordinator",
        );
        let current_round = gauge(
            &registry,
            "corechain_current_round",
            "Highest aggregated round",
        );
        let chain_length = gauge(&registry, "corechain_chain_length", "Sealed blocks in the ledger");

        // 1 ms to ~16 s
        let aggregation_time_ms = register_histogram_with_registry!(
            HistogramOpts::new(
                "corechain_aggregation_time_ms",
                "Round aggregation time in milliseconds"
            )
            .buckets(prometheus::exponential_buckets(1.0, 2.0, 15).expect("static bucket layout")),
            registry
        )
        .expect("failed to register aggregation_time_ms histogram");

        Self {
            registry,
            registrations,
            updates_accepted,
            updates_rejected,
            decryption_failures,
            rounds_aggregated,
            rewards_issued,
            registered_hospitals,
            current_round,
            chain_length,
            aggregation_time_ms,
        }
    }

    /// Every metric in the Prometheus text exposition format.
    pub fn encode_text(&self) -> String {
        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buf)
            .expect("text encoding into a Vec cannot fail");
        String::from_utf8(buf).expect("prometheus text format is UTF-8")
    }
}

impl Default for CoordinatorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn independent_registries_do_not_collide() {
        let a = CoordinatorMetrics::new();
        let b = CoordinatorMetrics::new();
        a.updates_accepted.inc();
        assert_eq!(a.updates_accepted.get(), 1);
        assert_eq!(b.updates_accepted.get(), 0);
    }

    #[test]
    fn text_exposition_names_metrics() {
        let m = CoordinatorMetrics::new();
        m.rounds_aggregated.inc();
        m.current_round.set(3);
        m.aggregation_time_ms.observe(12.0);
        let text = m.encode_text();
        assert!(text.contains("corechain_rounds_aggregated_total 1"));
        assert!(text.contains("corechain_current_round 3"));
        assert!(text.contains("corechain_aggregation_time_ms_count 1"));
    }
}
