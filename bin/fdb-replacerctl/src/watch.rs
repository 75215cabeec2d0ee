//! ---
//! fdbr_section: "05-networking-external-interfaces"
//! fdbr_subsection: "binary"
//! fdbr_type: "source"
//! fdbr_scope: "code"
//! fdbr_description: "Control CLI for operators running replacement passes."
//! fdbr_version: "v0.0.0-prealpha"
//! fdbr_owner: "tbd"
//! ---
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use clap::{ArgAction, Args};
use fdb_replacer_common::config::ReplacerConfig;
use fdb_replacer_common::logging::init_tracing;
use fdb_replacer_metrics::{new_registry, spawn_http_server};
use fdb_replacements::{ClusterPolicy, ReplacementEngine, ReplacementInputs, ReplacementMetrics};
use tracing::{info, warn};

use crate::{load_config, snapshot};

#[derive(Debug, Args)]
pub struct WatchCommand {
    /// Configuration file (defaults to FDB_REPLACER_CONFIG or the standard locations).
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Snapshot re-read before every pass and rewritten when a pass marks process groups.
    #[arg(long, value_name = "FILE")]
    snapshot: PathBuf,

    /// Seconds between passes.
    #[arg(long, value_name = "SECONDS", default_value_t = 30)]
    interval: u64,

    /// Whether the cluster currently has its desired fault tolerance.
    #[arg(
        long = "fault-tolerance",
        value_name = "BOOL",
        default_value_t = true,
        action = ArgAction::Set
    )]
    fault_tolerance: bool,

    /// Stop after this many passes instead of running until interrupted.
    #[arg(long, value_name = "COUNT")]
    passes: Option<u64>,
}

impl WatchCommand {
    pub fn execute(self) -> Result<()> {
        let loaded = load_config(self.config.as_deref())?;
        init_tracing("fdb-replacerctl", &loaded.config.logging)?;
        info!(config = %loaded.source.display(), snapshot = %self.snapshot.display(), "starting replacement loop");

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        runtime.block_on(self.run(loaded.config))
    }

    async fn run(self, config: ReplacerConfig) -> Result<()> {
        let registry = new_registry();
        let metrics = ReplacementMetrics::new(registry.clone())?;
        let server = if config.metrics.enabled {
            Some(spawn_http_server(registry, config.metrics.listen)?)
        } else {
            None
        };

        let engine = ReplacementEngine::from_config(&config, Some(metrics));
        let policy = ClusterPolicy::from_config(&config);
        let mut ticker = tokio::time::interval(Duration::from_secs(self.interval.max(1)));
        let mut completed: u64 = 0;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match run_pass(&engine, &policy, &self.snapshot, self.fault_tolerance) {
                        Ok(changed) => info!(cluster = engine.cluster(), pass = completed, changed, "replacement pass finished"),
                        Err(err) => warn!(cluster = engine.cluster(), pass = completed, error = %format!("{:#}", err), "replacement pass failed; retrying on next interval"),
                    }
                    completed += 1;
                    if self.passes.is_some_and(|limit| completed >= limit) {
                        break;
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!(cluster = engine.cluster(), "interrupt received; stopping replacement loop");
                    break;
                }
            }
        }

        if let Some(server) = server {
            server.shutdown().await?;
        }
        Ok(())
    }
}

/// One reconciliation pass over a fresh read of the snapshot.
fn run_pass(
    engine: &ReplacementEngine,
    policy: &ClusterPolicy,
    path: &Path,
    fault_tolerance: bool,
) -> Result<bool> {
    let mut status = snapshot::load(path)?;
    let inputs = ReplacementInputs::current(fault_tolerance);
    let changed = engine.decide_in_place(policy, &mut status, &inputs);
    if changed {
        snapshot::write(path, &status)?;
    }
    Ok(changed)
}
