//! ---
//! fdbr_section: "07-resilience-fault-tolerance"
//! fdbr_subsection: "module"
//! fdbr_type: "source"
//! fdbr_scope: "code"
//! fdbr_description: "Automatic failure replacement decisions."
//! fdbr_version: "v0.0.0-prealpha"
//! fdbr_owner: "tbd"
//! ---
use crate::model::ProcessGroupStatus;

/// Replacements still allowed in the current pass.
///
/// Computed once per pass as the configured limit minus removals already in
/// flight, then decremented for every new replacement. The counter may be
/// negative when more removals are in flight than the limit allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplacementBudget {
    limit: i64,
    in_flight: usize,
    remaining: i64,
}

impl ReplacementBudget {
    /// Derive the budget from the policy limit and the observed process groups.
    pub fn remaining_for(max_concurrent_replacements: i64, groups: &[ProcessGroupStatus]) -> Self {
        let in_flight = groups.iter().filter(|group| group.is_in_flight()).count();
        let in_flight_i64 = i64::try_from(in_flight).unwrap_or(i64::MAX);
        Self {
            limit: max_concurrent_replacements,
            in_flight,
            remaining: max_concurrent_replacements.saturating_sub(in_flight_i64),
        }
    }

    /// Configured limit.
    pub fn limit(&self) -> i64 {
        self.limit
    }

    /// Removals that were already in flight when the pass started.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Replacements still allowed.
    pub fn remaining(&self) -> i64 {
        self.remaining
    }

    /// No further replacement may be decided in this pass.
    pub fn is_exhausted(&self) -> bool {
        self.remaining <= 0
    }

    /// Consume one replacement; returns `false` without consuming when exhausted.
    pub fn try_consume(&mut self) -> bool {
        if self.is_exhausted() {
            return false;
        }
        self.remaining -= 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn in_flight(id: &str) -> ProcessGroupStatus {
        let mut group = ProcessGroupStatus::new(id, "zone-a");
        group.mark_for_removal(false);
        group
    }

    #[test]
    fn subtracts_in_flight_removals() {
        let mut excluded = in_flight("storage-3");
        excluded.excluded = true;
        let groups = vec![
            in_flight("storage-1"),
            in_flight("storage-2"),
            excluded,
            ProcessGroupStatus::new("storage-4", "zone-b"),
        ];
        let budget = ReplacementBudget::remaining_for(3, &groups);
        assert_eq!(budget.in_flight(), 2);
        assert_eq!(budget.remaining(), 1);
        assert!(!budget.is_exhausted());
    }

    #[test]
    fn consumption_stops_at_zero() {
        let mut budget = ReplacementBudget::remaining_for(2, &[]);
        assert!(budget.try_consume());
        assert!(budget.try_consume());
        assert!(!budget.try_consume());
        assert_eq!(budget.remaining(), 0);
        assert!(budget.is_exhausted());
    }

    #[test]
    fn negative_limit_means_no_budget() {
        let mut budget = ReplacementBudget::remaining_for(-1, &[]);
        assert_eq!(budget.limit(), -1);
        assert!(budget.is_exhausted());
        assert!(!budget.try_consume());
    }

    #[test]
    fn over_committed_budget_stays_negative() {
        let groups = vec![in_flight("a"), in_flight("b"), in_flight("c")];
        let budget = ReplacementBudget::remaining_for(1, &groups);
        assert_eq!(budget.remaining(), -2);
        assert!(budget.is_exhausted());
    }
}
