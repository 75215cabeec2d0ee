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
use chrono::{DateTime, Utc};
use clap::{ArgAction, Args};
use fdb_replacements::{ClusterPolicy, ReplacementEngine, ReplacementInputs};
use fdb_replacer_logging::{log_system_event, LogContext, SystemEventOutcome};

use crate::{load_config, snapshot};

#[derive(Debug, Args)]
pub struct DecideCommand {
    /// Configuration file (defaults to FDB_REPLACER_CONFIG or the standard locations).
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Observed status snapshot (JSON, or YAML for .yaml/.yml files).
    #[arg(long, value_name = "FILE")]
    snapshot: PathBuf,

    /// Whether the cluster currently has its desired fault tolerance.
    #[arg(
        long = "fault-tolerance",
        value_name = "BOOL",
        default_value_t = true,
        action = ArgAction::Set
    )]
    fault_tolerance: bool,

    /// Evaluate failures as of this RFC 3339 timestamp instead of the current time.
    #[arg(long, value_name = "RFC3339")]
    now: Option<DateTime<Utc>>,

    /// Write the snapshot with the decision applied to this path.
    #[arg(long, value_name = "FILE")]
    write: Option<PathBuf>,

    /// Pretty-print the decision document.
    #[arg(long, action = ArgAction::SetTrue)]
    pretty: bool,
}

impl DecideCommand {
    pub fn execute(self) -> Result<()> {
        let loaded = load_config(self.config.as_deref())?;
        let config = loaded.config;
        let policy = ClusterPolicy::from_config(&config);
        let engine = ReplacementEngine::from_config(&config, None);

        let mut status = snapshot::load(&self.snapshot)?;
        let inputs = match self.now {
            Some(now) => ReplacementInputs::at(now, self.fault_tolerance),
            None => ReplacementInputs::current(self.fault_tolerance),
        };
        let decision = engine.decide(&policy, &status, &inputs);

        let rendered = if self.pretty {
            serde_json::to_string_pretty(&decision)?
        } else {
            serde_json::to_string(&decision)?
        };
        println!("{}", rendered);

        if let Some(target) = &self.write {
            decision.apply(&mut status);
            snapshot::write(target, &status)?;
        }

        let ctx = LogContext::new().with_cluster(engine.cluster());
        log_system_event(
            Some(&ctx),
            "replacements.decide",
            &format!(
                "pass over {} process groups decided {} replacements (config {})",
                status.process_groups.len(),
                decision.mutations.len(),
                loaded.source.display()
            ),
            SystemEventOutcome::Success,
        );
        Ok(())
    }
}
