//! ---
//! fdbr_section: "07-resilience-fault-tolerance"
//! fdbr_subsection: "module"
//! fdbr_type: "source"
//! fdbr_scope: "code"
//! fdbr_description: "Automatic failure replacement decisions."
//! fdbr_version: "v0.0.0-prealpha"
//! fdbr_owner: "tbd"
//! ---
//! Per-pass replacement decisions.
//!
//! # Missing addresses
//!
//! A failing process group without any address is assumed to have never been
//! scheduled and therefore to hold no data. When the cluster has its desired
//! fault tolerance such a process group is replaced with exclusion skipped.
//! If an address record could be lost while the process still holds data,
//! this assumption would skip a required exclusion; callers that cannot rule
//! this out should report `has_desired_fault_tolerance = false` for the pass.

use chrono::{DateTime, Utc};
use fdb_replacer_common::config::{ReplacementPriority, ReplacerConfig};
use fdb_replacer_common::time::{elapsed_since, format_failure_time};
use fdb_replacer_logging::{replacer_debug, replacer_info, LogContext};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::budget::ReplacementBudget;
use crate::detector::{FailureDetection, FailureDetector};
use crate::maintenance::is_under_maintenance;
use crate::metrics::ReplacementMetrics;
use crate::model::{
    ClusterObservedStatus, ClusterPolicy, FaultDomain, ProcessGroupConditionType,
    ProcessGroupId, ProcessGroupStatus,
};

/// Per-pass inputs supplied by collaborators outside the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplacementInputs {
    /// Reference time for failure classification.
    pub now: DateTime<Utc>,
    /// Whether the cluster currently has its desired fault tolerance.
    pub has_desired_fault_tolerance: bool,
}

impl ReplacementInputs {
    /// Inputs evaluated at an explicit point in time.
    pub fn at(now: DateTime<Utc>, has_desired_fault_tolerance: bool) -> Self {
        Self {
            now,
            has_desired_fault_tolerance,
        }
    }

    /// Inputs evaluated at the current wall-clock time.
    pub fn current(has_desired_fault_tolerance: bool) -> Self {
        Self::at(Utc::now(), has_desired_fault_tolerance)
    }
}

/// What happened to a process group during a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionOutcome {
    /// Marked for removal; data will be excluded first.
    Replaced,
    /// Marked for removal without exclusion because it never had an address.
    ReplacedWithoutExclusion,
    /// Failing without an address while fault tolerance is degraded.
    DeferredMissingAddress,
    /// Failing but the replacement budget is exhausted.
    Throttled,
    /// Placed in the maintenance zone.
    SkippedMaintenance,
    /// Covered by a crash-loop directive.
    SkippedCrashLoop,
}

impl DecisionOutcome {
    /// Static label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionOutcome::Replaced => "replaced",
            DecisionOutcome::ReplacedWithoutExclusion => "replaced_without_exclusion",
            DecisionOutcome::DeferredMissingAddress => "deferred_missing_address",
            DecisionOutcome::Throttled => "throttled",
            DecisionOutcome::SkippedMaintenance => "skipped_maintenance",
            DecisionOutcome::SkippedCrashLoop => "skipped_crash_loop",
        }
    }

    /// Whether the outcome marks the process group for removal.
    pub fn is_replacement(&self) -> bool {
        matches!(
            self,
            DecisionOutcome::Replaced | DecisionOutcome::ReplacedWithoutExclusion
        )
    }
}

/// Operator-facing record of a single decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionEvent {
    /// Process group the decision refers to.
    pub process_group_id: ProcessGroupId,
    /// Fault domain of the process group.
    pub fault_domain: FaultDomain,
    /// Decision taken.
    pub outcome: DecisionOutcome,
    /// Failure condition, when one was detected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<ProcessGroupConditionType>,
    /// Failure start, when one was detected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_start: Option<DateTime<Utc>>,
}

/// Field changes the caller must apply to one process group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacementMutation {
    /// Process group to update.
    pub process_group_id: ProcessGroupId,
    /// New value of `marked_for_removal`.
    pub marked_for_removal: bool,
    /// New value of `exclusion_skipped`.
    pub exclusion_skipped: bool,
}

/// Result of a replacement pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacementDecision {
    /// Whether any new replacement was decided.
    pub any_changed: bool,
    /// Budget left after the pass; only meaningful when replacements are enabled.
    pub remaining_budget: i64,
    /// Delta to apply to the observed status, in decision order.
    pub mutations: Vec<ReplacementMutation>,
    /// Every decision taken during the pass.
    pub events: Vec<DecisionEvent>,
}

impl ReplacementDecision {
    /// Ids of the process groups newly marked for removal.
    pub fn replaced(&self) -> impl Iterator<Item = &ProcessGroupId> {
        self.mutations
            .iter()
            .filter(|mutation| mutation.marked_for_removal)
            .map(|mutation| &mutation.process_group_id)
    }

    /// Events with the given outcome.
    pub fn events_with(&self, outcome: DecisionOutcome) -> impl Iterator<Item = &DecisionEvent> {
        self.events
            .iter()
            .filter(move |event| event.outcome == outcome)
    }

    /// Apply the delta to `status`; returns the number of process groups updated.
    ///
    /// Mutations for ids no longer present are ignored.
    pub fn apply(&self, status: &mut ClusterObservedStatus) -> usize {
        let mut applied = 0;
        for mutation in &self.mutations {
            if let Some(group) = status.process_group_mut(mutation.process_group_id.as_str()) {
                if mutation.marked_for_removal {
                    group.mark_for_removal(mutation.exclusion_skipped);
                }
                applied += 1;
            }
        }
        applied
    }

    fn record(
        &mut self,
        group: &ProcessGroupStatus,
        outcome: DecisionOutcome,
        detection: Option<&FailureDetection>,
    ) {
        self.events.push(DecisionEvent {
            process_group_id: group.id.clone(),
            fault_domain: group.fault_domain.clone(),
            outcome,
            condition: detection.map(|d| d.condition),
            failure_start: detection.map(|d| d.failure_start),
        });
    }
}

/// Decides which failed process groups are marked for removal.
///
/// The engine holds no state across passes; it may be shared between
/// clusters and re-run on an unchanged snapshot without effect.
#[derive(Debug, Clone)]
pub struct ReplacementEngine {
    cluster: String,
    priority: ReplacementPriority,
    metrics: Option<ReplacementMetrics>,
}

impl ReplacementEngine {
    /// Create an engine for the named cluster using input order as priority.
    pub fn new(cluster: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
            priority: ReplacementPriority::default(),
            metrics: None,
        }
    }

    /// Create an engine from loaded configuration.
    pub fn from_config(config: &ReplacerConfig, metrics: Option<ReplacementMetrics>) -> Self {
        let mut engine = Self::new(config.cluster_name()).with_priority(config.engine.priority);
        engine.metrics = metrics;
        engine
    }

    /// Choose how qualifying failures are ordered against the budget.
    pub fn with_priority(mut self, priority: ReplacementPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Attach a metrics handle.
    pub fn with_metrics(mut self, metrics: ReplacementMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Cluster label used in logs and metrics.
    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    /// Ordering policy in effect.
    pub fn priority(&self) -> ReplacementPriority {
        self.priority
    }

    /// Run one pass over `status` and return the resulting decision.
    ///
    /// `status` is not modified; see [`ReplacementDecision::apply`].
    pub fn decide(
        &self,
        policy: &ClusterPolicy,
        status: &ClusterObservedStatus,
        inputs: &ReplacementInputs,
    ) -> ReplacementDecision {
        let mut decision = ReplacementDecision::default();
        if !policy.automatic_replacements_enabled {
            debug!(cluster = %self.cluster, "automatic replacements are disabled");
            return decision;
        }

        let mut budget = ReplacementBudget::remaining_for(
            policy.max_concurrent_replacements,
            &status.process_groups,
        );
        let detector = FailureDetector::from_policy(policy);
        let maintenance_zone = status.active_maintenance_zone();

        let mut candidates: Vec<(&ProcessGroupStatus, FailureDetection)> = Vec::new();
        for group in &status.process_groups {
            if group.marked_for_removal {
                continue;
            }

            let ctx = LogContext::new()
                .with_cluster(&self.cluster)
                .with_process_group(group.id.as_str())
                .with_fault_domain(group.fault_domain.as_str());

            if is_under_maintenance(group, maintenance_zone) {
                replacer_info!(context = ctx, "Skip process group that is in maintenance zone");
                decision.record(group, DecisionOutcome::SkippedMaintenance, None);
                continue;
            }

            if let Some(directive) = policy.crash_loop.matching(&group.id) {
                replacer_debug!(
                    context = ctx,
                    "Skip process group that is allowed to crash-loop container {}",
                    directive.target
                );
                decision.record(group, DecisionOutcome::SkippedCrashLoop, None);
                continue;
            }

            if let Some(detection) = detector.needs_replacement(group, inputs.now) {
                candidates.push((group, detection));
            }
        }

        if self.priority == ReplacementPriority::LongestFailingFirst {
            candidates.sort_by_key(|(_, detection)| detection.failure_start);
        }

        for (group, detection) in candidates {
            let failure_time = format_failure_time(detection.failure_start);
            let ctx = LogContext::new()
                .with_cluster(&self.cluster)
                .with_process_group(group.id.as_str())
                .with_fault_domain(group.fault_domain.as_str())
                .with_condition(detection.condition.as_str())
                .with_failure_time(&failure_time);

            let mut skip_exclusion = false;
            if !group.has_addresses() {
                if !inputs.has_desired_fault_tolerance {
                    replacer_info!(context = ctx, "Skip process group with missing address");
                    decision.record(group, DecisionOutcome::DeferredMissingAddress, Some(&detection));
                    continue;
                }
                skip_exclusion = true;
                replacer_info!(context = ctx, "Replace process group with missing address");
            }

            if !budget.try_consume() {
                replacer_info!(
                    context = ctx,
                    "Detected replace process group but cannot replace it because we hit the replacement limit; automatic replacement detected failure time: {}",
                    failure_time
                );
                decision.record(group, DecisionOutcome::Throttled, Some(&detection));
                continue;
            }

            replacer_info!(
                context = ctx,
                "Replace process group; automatic replacement detected failure time: {} (failing for {}s)",
                failure_time,
                elapsed_since(inputs.now, detection.failure_start).as_secs()
            );
            decision.mutations.push(ReplacementMutation {
                process_group_id: group.id.clone(),
                marked_for_removal: true,
                exclusion_skipped: skip_exclusion,
            });
            let outcome = if skip_exclusion {
                DecisionOutcome::ReplacedWithoutExclusion
            } else {
                DecisionOutcome::Replaced
            };
            decision.record(group, outcome, Some(&detection));
        }

        decision.any_changed = !decision.mutations.is_empty();
        decision.remaining_budget = budget.remaining();

        info!(
            target: "fdb_replacer::replacements",
            cluster = %self.cluster,
            replaced = decision.mutations.len(),
            throttled = decision.events_with(DecisionOutcome::Throttled).count(),
            deferred = decision.events_with(DecisionOutcome::DeferredMissingAddress).count(),
            in_flight = budget.in_flight(),
            remaining_budget = budget.remaining(),
            "replacement pass completed"
        );

        if let Some(metrics) = &self.metrics {
            for event in &decision.events {
                metrics.record_decision(&self.cluster, event.outcome);
            }
            metrics.record_pass(
                &self.cluster,
                decision.any_changed,
                budget.in_flight(),
                budget.remaining(),
            );
        }

        decision
    }

    /// Run one pass and apply the result to `status`; returns whether anything changed.
    pub fn decide_in_place(
        &self,
        policy: &ClusterPolicy,
        status: &mut ClusterObservedStatus,
        inputs: &ReplacementInputs,
    ) -> bool {
        let decision = self.decide(policy, status, inputs);
        decision.apply(status);
        decision.any_changed
    }
}

impl Default for ReplacementEngine {
    fn default() -> Self {
        Self::new("default")
    }
}
