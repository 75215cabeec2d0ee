//! ---
//! fdbr_section: "07-resilience-fault-tolerance"
//! fdbr_subsection: "module"
//! fdbr_type: "source"
//! fdbr_scope: "code"
//! fdbr_description: "Automatic failure replacement decisions."
//! fdbr_version: "v0.0.0-prealpha"
//! fdbr_owner: "tbd"
//! ---
use crate::model::{FaultDomain, ProcessGroupStatus};

/// Whether `group` sits in the fault domain currently under maintenance.
///
/// An absent or empty maintenance zone never matches, and neither does a
/// process group without a fault domain.
pub fn is_under_maintenance(group: &ProcessGroupStatus, zone: Option<&FaultDomain>) -> bool {
    match zone {
        Some(zone) if !zone.is_empty() => group.fault_domain == *zone,
        _ => false,
    }
}
