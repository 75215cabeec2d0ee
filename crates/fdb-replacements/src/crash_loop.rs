//! ---
//! fdbr_section: "07-resilience-fault-tolerance"
//! fdbr_subsection: "module"
//! fdbr_type: "source"
//! fdbr_scope: "code"
//! fdbr_description: "Automatic failure replacement decisions."
//! fdbr_version: "v0.0.0-prealpha"
//! fdbr_owner: "tbd"
//! ---
//! Operator overrides for process groups that are expected to crash-loop.

use std::collections::BTreeSet;

use fdb_replacer_common::config::{CrashLoopConfig, CRASH_LOOP_WILDCARD};

use crate::model::ProcessGroupId;

/// Set of process groups a directive applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrashLoopScope {
    /// Every process group.
    Wildcard,
    /// Only the listed process groups.
    Specific(BTreeSet<ProcessGroupId>),
}

impl CrashLoopScope {
    /// Build a scope from raw targets; any wildcard entry widens it to all process groups.
    pub fn from_targets<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ids = BTreeSet::new();
        for target in targets {
            let target = target.as_ref();
            if target == CRASH_LOOP_WILDCARD {
                return CrashLoopScope::Wildcard;
            }
            ids.insert(ProcessGroupId::new(target));
        }
        CrashLoopScope::Specific(ids)
    }

    /// Whether the scope covers `id`.
    pub fn contains(&self, id: &ProcessGroupId) -> bool {
        match self {
            CrashLoopScope::Wildcard => true,
            CrashLoopScope::Specific(ids) => ids.contains(id),
        }
    }
}

/// A crash-loop declaration for one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrashLoopDirective {
    /// Container the directive applies to.
    pub target: String,
    /// Process groups covered.
    pub scope: CrashLoopScope,
}

impl CrashLoopDirective {
    /// Construct a directive for `target`.
    pub fn new(target: impl Into<String>, scope: CrashLoopScope) -> Self {
        Self {
            target: target.into(),
            scope,
        }
    }
}

/// All crash-loop directives in effect for a pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrashLoopDirectives {
    directives: Vec<CrashLoopDirective>,
}

impl CrashLoopDirectives {
    /// Wrap a list of directives.
    pub fn new(directives: Vec<CrashLoopDirective>) -> Self {
        Self { directives }
    }

    /// Convert operator declarations from configuration.
    pub fn from_config(declarations: &[CrashLoopConfig]) -> Self {
        Self::new(
            declarations
                .iter()
                .map(|declaration| {
                    CrashLoopDirective::new(
                        declaration.target_name.clone(),
                        CrashLoopScope::from_targets(&declaration.targets),
                    )
                })
                .collect(),
        )
    }

    /// Whether no directive is declared.
    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    /// Iterate the declared directives.
    pub fn iter(&self) -> impl Iterator<Item = &CrashLoopDirective> {
        self.directives.iter()
    }

    /// Directive that exempts `id`, if any.
    pub fn matching(&self, id: &ProcessGroupId) -> Option<&CrashLoopDirective> {
        self.directives
            .iter()
            .find(|directive| directive.scope.contains(id))
    }

    /// Whether `id` must never be replaced automatically.
    pub fn is_ignored(&self, id: &ProcessGroupId) -> bool {
        self.matching(id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: &str) -> ProcessGroupId {
        ProcessGroupId::new(raw)
    }

    #[test]
    fn specific_scope_only_matches_listed_ids() {
        let directives = CrashLoopDirectives::new(vec![CrashLoopDirective::new(
            "foundationdb",
            CrashLoopScope::from_targets(["storage-1", "log-2"]),
        )]);
        assert!(directives.is_ignored(&id("storage-1")));
        assert!(directives.is_ignored(&id("log-2")));
        assert!(!directives.is_ignored(&id("storage-2")));
    }

    #[test]
    fn wildcard_entry_widens_scope() {
        let scope = CrashLoopScope::from_targets(["storage-1", "*"]);
        assert_eq!(scope, CrashLoopScope::Wildcard);

        let directives =
            CrashLoopDirectives::new(vec![CrashLoopDirective::new("foundationdb", scope)]);
        assert!(directives.is_ignored(&id("anything")));
    }

    #[test]
    fn any_directive_may_match() {
        let directives = CrashLoopDirectives::new(vec![
            CrashLoopDirective::new("foundationdb", CrashLoopScope::from_targets(["storage-1"])),
            CrashLoopDirective::new(
                "foundationdb-kubernetes-sidecar",
                CrashLoopScope::from_targets(["log-1"]),
            ),
        ]);
        let matched = directives.matching(&id("log-1")).unwrap();
        assert_eq!(matched.target, "foundationdb-kubernetes-sidecar");
    }

    #[test]
    fn empty_directives_ignore_nothing() {
        let directives = CrashLoopDirectives::default();
        assert!(directives.is_empty());
        assert!(!directives.is_ignored(&id("storage-1")));
    }

    #[test]
    fn converts_configuration_declarations() {
        let declarations = vec![
            CrashLoopConfig {
                target_name: "foundationdb".into(),
                targets: vec!["storage-3".into()],
            },
            CrashLoopConfig {
                target_name: "foundationdb-kubernetes-sidecar".into(),
                targets: vec!["*".into()],
            },
        ];
        let directives = CrashLoopDirectives::from_config(&declarations);
        let scopes: Vec<_> = directives.iter().map(|d| d.scope.clone()).collect();
        assert!(matches!(scopes[0], CrashLoopScope::Specific(ref ids) if ids.len() == 1));
        assert_eq!(scopes[1], CrashLoopScope::Wildcard);
    }
}
