//! ---
//! fdbr_section: "07-resilience-fault-tolerance"
//! fdbr_subsection: "module"
//! fdbr_type: "source"
//! fdbr_scope: "code"
//! fdbr_description: "Automatic failure replacement decisions."
//! fdbr_version: "v0.0.0-prealpha"
//! fdbr_owner: "tbd"
//! ---
//! Automatic replacement of failed process groups.
//!
//! A reconciliation pass hands the engine a policy and an observed status
//! snapshot; the engine answers with the process groups that must be marked
//! for removal. The engine performs no I/O and never mutates its input: the
//! caller applies the returned [`ReplacementDecision`] to its own copy.
#![warn(missing_docs)]

pub mod budget;
pub mod crash_loop;
pub mod detector;
pub mod engine;
pub mod maintenance;
pub mod metrics;
pub mod model;

pub use budget::ReplacementBudget;
pub use crash_loop::{CrashLoopDirective, CrashLoopDirectives, CrashLoopScope};
pub use detector::{FailureDetection, FailureDetector};
pub use engine::{
    DecisionEvent, DecisionOutcome, ReplacementDecision, ReplacementEngine, ReplacementInputs,
    ReplacementMutation,
};
pub use fdb_replacer_common::config::ReplacementPriority;
pub use maintenance::is_under_maintenance;
pub use metrics::ReplacementMetrics;
pub use model::{
    ClusterObservedStatus, ClusterPolicy, FaultDomain, ProcessGroupCondition,
    ProcessGroupConditionType, ProcessGroupId, ProcessGroupStatus,
};

/// Crate prelude collecting the types needed to run a pass.
pub mod prelude {
    pub use super::crash_loop::{CrashLoopDirectives, CrashLoopScope};
    pub use super::engine::{ReplacementDecision, ReplacementEngine, ReplacementInputs};
    pub use super::model::{
        ClusterObservedStatus, ClusterPolicy, ProcessGroupConditionType, ProcessGroupStatus,
    };
    pub use fdb_replacer_common::config::ReplacementPriority;
}
