//! ---
//! fdbr_section: "07-resilience-fault-tolerance"
//! fdbr_subsection: "module"
//! fdbr_type: "source"
//! fdbr_scope: "code"
//! fdbr_description: "Automatic failure replacement decisions."
//! fdbr_version: "v0.0.0-prealpha"
//! fdbr_owner: "tbd"
//! ---
use anyhow::Result;
use fdb_replacer_metrics::SharedRegistry;
use prometheus::{IntCounterVec, IntGaugeVec, Opts};

use crate::engine::DecisionOutcome;

/// Metrics published by the replacement engine.
#[derive(Clone)]
pub struct ReplacementMetrics {
    registry: SharedRegistry,
    decisions_total: IntCounterVec,
    passes_total: IntCounterVec,
    remaining_budget: IntGaugeVec,
    in_flight_removals: IntGaugeVec,
}

impl ReplacementMetrics {
    /// Register the replacement metric family against the provided registry.
    pub fn new(registry: SharedRegistry) -> Result<Self> {
        let decisions_total = IntCounterVec::new(
            Opts::new(
                "fdb_replacer_decisions_total",
                "Per process group decisions taken by the replacement engine",
            ),
            &["cluster", "outcome"],
        )?;
        registry.register(Box::new(decisions_total.clone()))?;

        let passes_total = IntCounterVec::new(
            Opts::new(
                "fdb_replacer_passes_total",
                "Replacement passes executed, split by whether any replacement was decided",
            ),
            &["cluster", "changed"],
        )?;
        registry.register(Box::new(passes_total.clone()))?;

        let remaining_budget = IntGaugeVec::new(
            Opts::new(
                "fdb_replacer_remaining_budget",
                "Replacements still allowed at the end of the last pass",
            ),
            &["cluster"],
        )?;
        registry.register(Box::new(remaining_budget.clone()))?;

        let in_flight_removals = IntGaugeVec::new(
            Opts::new(
                "fdb_replacer_in_flight_removals",
                "Removals requested but not yet excluded when the last pass started",
            ),
            &["cluster"],
        )?;
        registry.register(Box::new(in_flight_removals.clone()))?;

        Ok(Self {
            registry,
            decisions_total,
            passes_total,
            remaining_budget,
            in_flight_removals,
        })
    }

    /// Expose the underlying shared registry for convenience.
    pub fn registry(&self) -> SharedRegistry {
        self.registry.clone()
    }

    /// Count a single per process group decision.
    pub fn record_decision(&self, cluster: &str, outcome: DecisionOutcome) {
        self.decisions_total
            .with_label_values(&[cluster, outcome.as_str()])
            .inc();
    }

    /// Record the end of a pass.
    pub fn record_pass(&self, cluster: &str, changed: bool, in_flight: usize, remaining: i64) {
        let changed = if changed { "true" } else { "false" };
        self.passes_total
            .with_label_values(&[cluster, changed])
            .inc();
        self.in_flight_removals
            .with_label_values(&[cluster])
            .set(i64::try_from(in_flight).unwrap_or(i64::MAX));
        self.remaining_budget
            .with_label_values(&[cluster])
            .set(remaining);
    }
}

impl std::fmt::Debug for ReplacementMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplacementMetrics").finish_non_exhaustive()
    }
}
