//! ---
//! fdbr_section: "07-resilience-fault-tolerance"
//! fdbr_subsection: "module"
//! fdbr_type: "source"
//! fdbr_scope: "code"
//! fdbr_description: "Automatic failure replacement decisions."
//! fdbr_version: "v0.0.0-prealpha"
//! fdbr_owner: "tbd"
//! ---
use chrono::{DateTime, Utc};
use fdb_replacer_common::config::ReplacerConfig;
use fdb_replacer_metrics::{encode_text, new_registry};
use fdb_replacements::{
    ClusterObservedStatus, ClusterPolicy, DecisionOutcome, ReplacementEngine, ReplacementInputs,
    ReplacementMetrics,
};

const SNAPSHOT: &str = r#"
maintenance_zone: rack-2
process_groups:
  - id: storage-1
    process_class: storage
    fault_domain: rack-1
    addresses: ["10.1.0.1:4501"]
    conditions:
      - type: MissingProcesses
        timestamp: "2024-05-01T11:00:00Z"
  - id: storage-2
    process_class: storage
    fault_domain: rack-2
    addresses: ["10.1.0.2:4501"]
    conditions:
      - type: PodFailing
        timestamp: "2024-05-01T10:00:00Z"
  - id: log-1
    process_class: log
    fault_domain: rack-3
    addresses: ["10.1.0.3:4501"]
    conditions:
      - type: NodeTaintReplacing
        timestamp: "2024-05-01T11:50:00Z"
  - id: log-2
    process_class: log
    fault_domain: rack-4
    conditions:
      - type: PodPending
        timestamp: "2024-05-01T09:00:00Z"
  - id: stateless-1
    process_class: stateless
    fault_domain: rack-5
    addresses: ["10.1.0.5:4501"]
    marked_for_removal: true
"#;

const CONFIG: &str = r#"
cluster = "integration"

[policy]
max_concurrent_replacements = 3
failure_detection_time = 1800
taint_replacement_time = 300

[[crash_loop]]
target_name = "foundationdb"
targets = ["log-1"]
"#;

fn now() -> DateTime<Utc> {
    "2024-05-01T12:00:00Z".parse().unwrap()
}

#[test]
fn yaml_snapshot_with_configured_policy() {
    let config: ReplacerConfig = CONFIG.parse().unwrap();
    let policy = ClusterPolicy::from_config(&config);
    let status: ClusterObservedStatus = serde_yaml::from_str(SNAPSHOT).unwrap();
    let engine = ReplacementEngine::from_config(&config, None);
    assert_eq!(engine.cluster(), "integration");

    let decision = engine.decide(&policy, &status, &ReplacementInputs::at(now(), true));

    let outcomes: Vec<(&str, DecisionOutcome)> = decision
        .events
        .iter()
        .map(|event| (event.process_group_id.as_str(), event.outcome))
        .collect();
    assert_eq!(
        outcomes,
        vec![
            ("storage-2", DecisionOutcome::SkippedMaintenance),
            ("log-1", DecisionOutcome::SkippedCrashLoop),
            ("storage-1", DecisionOutcome::Replaced),
            ("log-2", DecisionOutcome::ReplacedWithoutExclusion),
        ]
    );
    // One removal was already in flight, two new ones leave nothing.
    assert_eq!(decision.remaining_budget, 0);
}

#[test]
fn decision_serializes_as_operator_payload() {
    let config: ReplacerConfig = CONFIG.parse().unwrap();
    let policy = ClusterPolicy::from_config(&config);
    let status: ClusterObservedStatus = serde_yaml::from_str(SNAPSHOT).unwrap();
    let decision = ReplacementEngine::from_config(&config, None).decide(
        &policy,
        &status,
        &ReplacementInputs::at(now(), false),
    );

    let payload = serde_json::to_value(&decision).unwrap();
    assert_eq!(payload["any_changed"], true);
    assert_eq!(payload["mutations"][0]["process_group_id"], "storage-1");
    assert_eq!(payload["mutations"][0]["exclusion_skipped"], false);
    let deferred = payload["events"]
        .as_array()
        .unwrap()
        .iter()
        .find(|event| event["outcome"] == "deferred_missing_address")
        .unwrap();
    assert_eq!(deferred["process_group_id"], "log-2");
    assert_eq!(deferred["condition"], "PodPending");
}

#[test]
fn applied_decision_round_trips_through_snapshot() {
    let config: ReplacerConfig = CONFIG.parse().unwrap();
    let policy = ClusterPolicy::from_config(&config);
    let mut status: ClusterObservedStatus = serde_yaml::from_str(SNAPSHOT).unwrap();
    let engine = ReplacementEngine::from_config(&config, None);
    let inputs = ReplacementInputs::at(now(), true);

    assert!(engine.decide_in_place(&policy, &mut status, &inputs));
    let log_2 = status.process_group("log-2").unwrap();
    assert!(log_2.marked_for_removal);
    assert!(log_2.exclusion_skipped);

    let written = serde_yaml::to_string(&status).unwrap();
    let mut reread: ClusterObservedStatus = serde_yaml::from_str(&written).unwrap();
    assert_eq!(reread, status);
    assert!(!engine.decide_in_place(&policy, &mut reread, &inputs));
}

#[test]
fn metrics_follow_decisions() {
    let config: ReplacerConfig = CONFIG.parse().unwrap();
    let policy = ClusterPolicy::from_config(&config);
    let status: ClusterObservedStatus = serde_yaml::from_str(SNAPSHOT).unwrap();
    let registry = new_registry();
    let metrics = ReplacementMetrics::new(registry.clone()).unwrap();
    let engine = ReplacementEngine::from_config(&config, Some(metrics));

    engine.decide(&policy, &status, &ReplacementInputs::at(now(), true));

    let body = encode_text(&registry).unwrap();
    assert!(body
        .lines()
        .any(|line| line.starts_with("fdb_replacer_decisions_total")
            && line.contains(r#"outcome="skipped_maintenance""#)
            && line.ends_with(" 1")));
    assert!(body
        .lines()
        .any(|line| line.starts_with("fdb_replacer_passes_total")
            && line.contains(r#"changed="true""#)
            && line.ends_with(" 1")));
}
