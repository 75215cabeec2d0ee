//! ---
//! fdbr_section: "07-resilience-fault-tolerance"
//! fdbr_subsection: "module"
//! fdbr_type: "source"
//! fdbr_scope: "code"
//! fdbr_description: "Automatic failure replacement decisions."
//! fdbr_version: "v0.0.0-prealpha"
//! fdbr_owner: "tbd"
//! ---
use std::time::Duration;

use chrono::{DateTime, Utc};
use fdb_replacer_common::time::window_start;
use serde::Serialize;

use crate::model::{ClusterPolicy, ProcessGroupConditionType, ProcessGroupStatus};

/// A failure that has lasted long enough to warrant replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FailureDetection {
    /// Condition that crossed its threshold.
    pub condition: ProcessGroupConditionType,
    /// Earliest observation of that class of failure.
    pub failure_start: DateTime<Utc>,
}

/// Classifies process groups against the failure and taint thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureDetector {
    failure_threshold: Duration,
    taint_threshold: Duration,
}

impl FailureDetector {
    /// Create a detector with explicit thresholds.
    pub fn new(failure_threshold: Duration, taint_threshold: Duration) -> Self {
        Self {
            failure_threshold,
            taint_threshold,
        }
    }

    /// Create a detector using the thresholds of `policy`.
    pub fn from_policy(policy: &ClusterPolicy) -> Self {
        Self::new(
            policy.failure_detection_threshold,
            policy.taint_replacement_threshold,
        )
    }

    /// Return the qualifying failure of `group` as of `now`, if any.
    ///
    /// Ordinary failures and host taints are tracked separately; each class
    /// qualifies when its earliest condition is strictly older than its own
    /// threshold. Ordinary failures win when both qualify. Process groups
    /// already marked for removal never qualify.
    pub fn needs_replacement(
        &self,
        group: &ProcessGroupStatus,
        now: DateTime<Utc>,
    ) -> Option<FailureDetection> {
        if group.marked_for_removal {
            return None;
        }

        let mut earliest_failure: Option<FailureDetection> = None;
        let mut earliest_taint: Option<FailureDetection> = None;
        for condition in &group.conditions {
            if !condition.kind.needs_replacement() {
                continue;
            }
            let slot = if condition.kind.is_taint() {
                &mut earliest_taint
            } else {
                &mut earliest_failure
            };
            if slot.map_or(true, |current| condition.timestamp < current.failure_start) {
                *slot = Some(FailureDetection {
                    condition: condition.kind,
                    failure_start: condition.timestamp,
                });
            }
        }

        let qualifies = |detection: &FailureDetection, threshold: Duration| {
            window_start(now, threshold).is_some_and(|start| detection.failure_start < start)
        };

        earliest_failure
            .filter(|detection| qualifies(detection, self.failure_threshold))
            .or_else(|| earliest_taint.filter(|detection| qualifies(detection, self.taint_threshold)))
    }
}
