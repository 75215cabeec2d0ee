//! ---
//! fdbr_section: "07-resilience-fault-tolerance"
//! fdbr_subsection: "module"
//! fdbr_type: "source"
//! fdbr_scope: "code"
//! fdbr_description: "Automatic failure replacement decisions."
//! fdbr_version: "v0.0.0-prealpha"
//! fdbr_owner: "tbd"
//! ---
//! Observed cluster state and the policy a replacement pass runs under.

use std::borrow::Borrow;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use fdb_replacer_common::config::ReplacerConfig;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::crash_loop::CrashLoopDirectives;

/// Stable identifier of a process group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessGroupId(String);

impl ProcessGroupId {
    /// Wrap a raw identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProcessGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ProcessGroupId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ProcessGroupId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ProcessGroupId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Failure-correlated unit (host, rack, zone) a process group is placed in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct FaultDomain(String);

impl FaultDomain {
    /// Wrap a raw fault domain name.
    pub fn new(domain: impl Into<String>) -> Self {
        Self(domain.into())
    }

    /// Borrow the raw fault domain name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// An empty fault domain carries no placement information.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FaultDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FaultDomain {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Health conditions reported for a process group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessGroupConditionType {
    /// The process group has no running fdbserver processes.
    MissingProcesses,
    /// The pod backing the process group is failing.
    PodFailing,
    /// The pod backing the process group does not exist.
    MissingPod,
    /// The persistent volume claim is missing.
    #[serde(rename = "MissingPVC")]
    MissingPvc,
    /// The per-process-group service is missing.
    MissingService,
    /// The pod has not been scheduled.
    PodPending,
    /// The host is tainted and scheduled for eviction.
    NodeTaintReplacing,
    /// The processes were excluded without the process group being removed.
    ProcessIsMarkedAsExcluded,
    /// The pod spec differs from the desired spec.
    IncorrectPodSpec,
    /// The config map is out of date.
    IncorrectConfigMap,
    /// The command line differs from the desired one.
    IncorrectCommandLine,
    /// The sidecar cannot be reached.
    SidecarUnreachable,
    /// A taint was seen on the host but has not reached the replacement grace period.
    NodeTaintDetected,
    /// Resources of the process group are being torn down.
    ResourcesTerminating,
}

impl ProcessGroupConditionType {
    /// Whether a long-lived condition of this kind warrants a replacement.
    pub fn needs_replacement(&self) -> bool {
        matches!(
            self,
            Self::MissingProcesses
                | Self::PodFailing
                | Self::MissingPod
                | Self::MissingPvc
                | Self::MissingService
                | Self::PodPending
                | Self::NodeTaintReplacing
                | Self::ProcessIsMarkedAsExcluded
        )
    }

    /// Infrastructure-level conditions measured against the taint threshold.
    pub fn is_taint(&self) -> bool {
        matches!(self, Self::NodeTaintReplacing)
    }

    /// Static label used in logs, metrics and decision payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingProcesses => "MissingProcesses",
            Self::PodFailing => "PodFailing",
            Self::MissingPod => "MissingPod",
            Self::MissingPvc => "MissingPVC",
            Self::MissingService => "MissingService",
            Self::PodPending => "PodPending",
            Self::NodeTaintReplacing => "NodeTaintReplacing",
            Self::ProcessIsMarkedAsExcluded => "ProcessIsMarkedAsExcluded",
            Self::IncorrectPodSpec => "IncorrectPodSpec",
            Self::IncorrectConfigMap => "IncorrectConfigMap",
            Self::IncorrectCommandLine => "IncorrectCommandLine",
            Self::SidecarUnreachable => "SidecarUnreachable",
            Self::NodeTaintDetected => "NodeTaintDetected",
            Self::ResourcesTerminating => "ResourcesTerminating",
        }
    }
}

impl fmt::Display for ProcessGroupConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A condition together with the time it was first observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessGroupCondition {
    /// Condition kind.
    #[serde(rename = "type")]
    pub kind: ProcessGroupConditionType,
    /// First time the condition was observed.
    pub timestamp: DateTime<Utc>,
}

/// Observed state of a single process group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessGroupStatus {
    /// Stable identifier.
    pub id: ProcessGroupId,
    /// Process class (`storage`, `log`, `stateless`, ...).
    #[serde(default)]
    pub process_class: Option<String>,
    /// Fault domain the process group is placed in.
    #[serde(default)]
    pub fault_domain: FaultDomain,
    /// Addresses currently assigned; empty when the process group was never scheduled.
    #[serde(default)]
    pub addresses: IndexSet<String>,
    /// Set once a removal decision was made; the process group is then in flight.
    #[serde(default)]
    pub marked_for_removal: bool,
    /// Set by the exclusion pipeline once data has been evacuated.
    #[serde(default)]
    pub excluded: bool,
    /// Set together with `marked_for_removal` when no exclusion is needed.
    #[serde(default)]
    pub exclusion_skipped: bool,
    /// Current health conditions.
    #[serde(default)]
    pub conditions: Vec<ProcessGroupCondition>,
}

impl ProcessGroupStatus {
    /// Create a healthy, unscheduled process group.
    pub fn new(id: impl Into<ProcessGroupId>, fault_domain: impl Into<FaultDomain>) -> Self {
        Self {
            id: id.into(),
            process_class: None,
            fault_domain: fault_domain.into(),
            addresses: IndexSet::new(),
            marked_for_removal: false,
            excluded: false,
            exclusion_skipped: false,
            conditions: Vec::new(),
        }
    }

    /// Attach a process class.
    pub fn with_process_class(mut self, process_class: impl Into<String>) -> Self {
        self.process_class = Some(process_class.into());
        self
    }

    /// Attach an address.
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.addresses.insert(address.into());
        self
    }

    /// Attach a condition first observed at `timestamp`.
    pub fn with_condition(
        mut self,
        kind: ProcessGroupConditionType,
        timestamp: DateTime<Utc>,
    ) -> Self {
        self.conditions.push(ProcessGroupCondition { kind, timestamp });
        self
    }

    /// Whether any address was ever assigned.
    pub fn has_addresses(&self) -> bool {
        !self.addresses.is_empty()
    }

    /// Removal requested but data not yet evacuated.
    pub fn is_in_flight(&self) -> bool {
        self.marked_for_removal && !self.excluded
    }

    /// Flag the process group for removal.
    pub fn mark_for_removal(&mut self, exclusion_skipped: bool) {
        self.marked_for_removal = true;
        self.exclusion_skipped = exclusion_skipped;
    }
}

/// Snapshot of the cluster as seen by one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterObservedStatus {
    /// Fault domain currently under operator-declared maintenance.
    #[serde(default)]
    pub maintenance_zone: Option<FaultDomain>,
    /// Process groups in priority order.
    #[serde(default)]
    pub process_groups: Vec<ProcessGroupStatus>,
}

impl ClusterObservedStatus {
    /// Create a snapshot from its process groups.
    pub fn new(process_groups: Vec<ProcessGroupStatus>) -> Self {
        Self {
            maintenance_zone: None,
            process_groups,
        }
    }

    /// Declare a maintenance zone.
    pub fn with_maintenance_zone(mut self, zone: impl Into<FaultDomain>) -> Self {
        self.maintenance_zone = Some(zone.into());
        self
    }

    /// Maintenance zone, treating an empty zone as absent.
    pub fn active_maintenance_zone(&self) -> Option<&FaultDomain> {
        self.maintenance_zone.as_ref().filter(|zone| !zone.is_empty())
    }

    /// Number of removals requested but not yet excluded.
    pub fn in_flight_removals(&self) -> usize {
        self.process_groups
            .iter()
            .filter(|group| group.is_in_flight())
            .count()
    }

    /// Look up a process group by id.
    pub fn process_group(&self, id: &str) -> Option<&ProcessGroupStatus> {
        self.process_groups
            .iter()
            .find(|group| group.id.as_str() == id)
    }

    /// Look up a process group by id for mutation.
    pub fn process_group_mut(&mut self, id: &str) -> Option<&mut ProcessGroupStatus> {
        self.process_groups
            .iter_mut()
            .find(|group| group.id.as_str() == id)
    }
}

/// Replacement policy fixed for the duration of a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterPolicy {
    /// Global kill switch for automatic replacements.
    pub automatic_replacements_enabled: bool,
    /// Upper bound on in-flight replacements; negative values behave like zero.
    pub max_concurrent_replacements: i64,
    /// How long an ordinary failure must last before replacement.
    pub failure_detection_threshold: Duration,
    /// How long a host taint must last before replacement.
    pub taint_replacement_threshold: Duration,
    /// Operator crash-loop overrides.
    pub crash_loop: CrashLoopDirectives,
}

impl ClusterPolicy {
    /// Build the policy described by a loaded configuration.
    pub fn from_config(config: &ReplacerConfig) -> Self {
        Self {
            automatic_replacements_enabled: config.policy.enabled,
            max_concurrent_replacements: config.policy.max_concurrent_replacements,
            failure_detection_threshold: config.policy.failure_detection_time,
            taint_replacement_threshold: config.policy.taint_replacement_time,
            crash_loop: CrashLoopDirectives::from_config(&config.crash_loop),
        }
    }

    /// Replace the crash-loop directives.
    pub fn with_crash_loop(mut self, crash_loop: CrashLoopDirectives) -> Self {
        self.crash_loop = crash_loop;
        self
    }
}

impl Default for ClusterPolicy {
    fn default() -> Self {
        Self::from_config(&ReplacerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn in_flight_requires_marked_and_not_excluded() {
        let mut group = ProcessGroupStatus::new("storage-1", "zone-a");
        assert!(!group.is_in_flight());
        group.mark_for_removal(false);
        assert!(group.is_in_flight());
        group.excluded = true;
        assert!(!group.is_in_flight());
    }

    #[test]
    fn empty_maintenance_zone_is_inactive() {
        let status = ClusterObservedStatus::default().with_maintenance_zone("");
        assert!(status.active_maintenance_zone().is_none());
        let status = ClusterObservedStatus::default().with_maintenance_zone("zone-a");
        assert_eq!(status.active_maintenance_zone().unwrap().as_str(), "zone-a");
    }

    #[test]
    fn condition_labels_match_serialized_names() {
        let ts = Utc.timestamp_opt(0, 0).unwrap();
        let group = ProcessGroupStatus::new("log-1", "zone-b")
            .with_condition(ProcessGroupConditionType::MissingPvc, ts);
        let json = serde_json::to_value(&group).unwrap();
        assert_eq!(json["conditions"][0]["type"], "MissingPVC");
        assert_eq!(
            ProcessGroupConditionType::MissingPvc.as_str(),
            json["conditions"][0]["type"].as_str().unwrap()
        );
    }

    #[test]
    fn snapshot_deserializes_with_defaults() {
        let status: ClusterObservedStatus = serde_json::from_str(
            r#"{
                "maintenance_zone": "zone-c",
                "process_groups": [
                    {"id": "storage-1", "fault_domain": "zone-a", "addresses": ["10.0.0.1:4501"]},
                    {"id": "storage-2"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(status.process_groups.len(), 2);
        assert!(status.process_groups[0].has_addresses());
        assert!(!status.process_groups[1].has_addresses());
        assert!(status.process_groups[1].fault_domain.is_empty());
        assert!(status.process_group("storage-2").is_some());
    }

    #[test]
    fn policy_follows_configuration() {
        let config: ReplacerConfig = r#"
            [policy]
            enabled = false
            max_concurrent_replacements = 4
            failure_detection_time = 120
            taint_replacement_time = 10
        "#
        .parse()
        .unwrap();
        let policy = ClusterPolicy::from_config(&config);
        assert!(!policy.automatic_replacements_enabled);
        assert_eq!(policy.max_concurrent_replacements, 4);
        assert_eq!(policy.failure_detection_threshold, Duration::from_secs(120));
        assert_eq!(policy.taint_replacement_threshold, Duration::from_secs(10));
        assert!(policy.crash_loop.is_empty());
    }
}
