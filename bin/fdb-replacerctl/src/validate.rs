//! ---
//! fdbr_section: "05-networking-external-interfaces"
//! fdbr_subsection: "binary"
//! fdbr_type: "source"
//! fdbr_scope: "code"
//! fdbr_description: "Control CLI for operators running replacement passes."
//! fdbr_version: "v0.0.0-prealpha"
//! fdbr_owner: "tbd"
//! ---
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use fdb_replacements::{ClusterPolicy, CrashLoopScope};
use fdb_replacer_logging::{log_system_event, SystemEventOutcome};

use crate::load_config;

#[derive(Debug, Args)]
pub struct ValidateCommand {
    /// Configuration file (defaults to FDB_REPLACER_CONFIG or the standard locations).
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

impl ValidateCommand {
    pub fn execute(self) -> Result<()> {
        let loaded = match load_config(self.config.as_deref()) {
            Ok(loaded) => loaded,
            Err(err) => {
                log_system_event(
                    None,
                    "config.validate",
                    &format!("{:#}", err),
                    SystemEventOutcome::Fault,
                );
                return Err(err);
            }
        };

        let policy = ClusterPolicy::from_config(&loaded.config);
        println!("configuration: {}", loaded.source.display());
        println!("cluster: {}", loaded.config.cluster_name());
        println!(
            "automatic replacements: {}",
            if policy.automatic_replacements_enabled {
                "enabled"
            } else {
                "disabled"
            }
        );
        println!(
            "max concurrent replacements: {}",
            policy.max_concurrent_replacements
        );
        println!(
            "failure detection time: {}s",
            policy.failure_detection_threshold.as_secs()
        );
        println!(
            "taint replacement time: {}s",
            policy.taint_replacement_threshold.as_secs()
        );
        for directive in policy.crash_loop.iter() {
            let scope = match &directive.scope {
                CrashLoopScope::Wildcard => "all process groups".to_owned(),
                CrashLoopScope::Specific(ids) => ids
                    .iter()
                    .map(|id| id.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            };
            println!("crash-loop {}: {}", directive.target, scope);
        }

        log_system_event(
            None,
            "config.validate",
            "configuration accepted",
            SystemEventOutcome::Success,
        );
        Ok(())
    }
}
