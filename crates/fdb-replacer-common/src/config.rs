//! ---
//! fdbr_section: "01-core-functionality"
//! fdbr_subsection: "module"
//! fdbr_type: "source"
//! fdbr_scope: "code"
//! fdbr_description: "Shared primitives and utilities for the replacement runtime."
//! fdbr_version: "v0.0.0-prealpha"
//! fdbr_owner: "tbd"
//! ---
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use thiserror::Error;
use tracing::{debug, warn};

use crate::logging::LogFormat;

/// Identifier that ignores every process group when used as a crash-loop target.
pub const CRASH_LOOP_WILDCARD: &str = "*";

fn default_enabled() -> bool {
    true
}

fn default_max_concurrent_replacements() -> i64 {
    1
}

fn default_failure_detection_time() -> Duration {
    Duration::from_secs(7200)
}

fn default_taint_replacement_time() -> Duration {
    Duration::from_secs(1800)
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_metrics_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 9898))
}

/// Validation failures raised while loading replacement configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("crash-loop directive #{index} has an empty target_name")]
    EmptyCrashLoopTarget { index: usize },
    #[error("crash-loop directive '{target}' does not list any process groups")]
    EmptyCrashLoopTargets { target: String },
    #[error("crash-loop directive '{target}' contains a blank process group id")]
    BlankProcessGroupId { target: String },
    #[error("failure detection time must be non-zero when automatic replacements are enabled")]
    ZeroFailureDetectionTime,
}

/// Primary configuration object for the replacement runtime.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplacerConfig {
    #[serde(default)]
    pub cluster: Option<String>,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub crash_loop: Vec<CrashLoopConfig>,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Metadata describing where a [`ReplacerConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedReplacerConfig {
    pub config: ReplacerConfig,
    pub source: PathBuf,
}

impl ReplacerConfig {
    pub const ENV_CONFIG_PATH: &'static str = "FDB_REPLACER_CONFIG";

    /// Load configuration from disk, respecting the `FDB_REPLACER_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedReplacerConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedReplacerConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(&path)?;
                return Ok(LoadedReplacerConfig {
                    config,
                    source: path,
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    /// Read and validate a single configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        contents
            .parse::<ReplacerConfig>()
            .with_context(|| format!("failed to load config file {}", path.display()))
    }

    /// Label used for logs and metrics when the file does not name the cluster.
    pub fn cluster_name(&self) -> &str {
        self.cluster.as_deref().unwrap_or("default")
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<(), PolicyError> {
        self.policy.validate()?;
        for (index, directive) in self.crash_loop.iter().enumerate() {
            directive.validate(index)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for ReplacerConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: ReplacerConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Declarative replacement policy for a single cluster.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Negative values are tolerated and behave like zero.
    #[serde(default = "default_max_concurrent_replacements")]
    pub max_concurrent_replacements: i64,
    #[serde(default = "default_failure_detection_time")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub failure_detection_time: Duration,
    #[serde(default = "default_taint_replacement_time")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub taint_replacement_time: Duration,
}

impl PolicyConfig {
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.enabled && self.failure_detection_time.is_zero() {
            return Err(PolicyError::ZeroFailureDetectionTime);
        }
        if self.max_concurrent_replacements < 0 {
            warn!(
                max_concurrent_replacements = self.max_concurrent_replacements,
                "negative replacement limit configured; no replacements will be made"
            );
        }
        Ok(())
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            max_concurrent_replacements: default_max_concurrent_replacements(),
            failure_detection_time: default_failure_detection_time(),
            taint_replacement_time: default_taint_replacement_time(),
        }
    }
}

/// Operator declaration that a set of process groups may crash-loop a container.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CrashLoopConfig {
    /// Container the directive applies to (e.g. `foundationdb`).
    pub target_name: String,
    /// Process group ids, or [`CRASH_LOOP_WILDCARD`] for all of them.
    #[serde(default)]
    pub targets: Vec<String>,
}

impl CrashLoopConfig {
    pub fn validate(&self, index: usize) -> Result<(), PolicyError> {
        if self.target_name.trim().is_empty() {
            return Err(PolicyError::EmptyCrashLoopTarget { index });
        }
        if self.targets.is_empty() {
            return Err(PolicyError::EmptyCrashLoopTargets {
                target: self.target_name.clone(),
            });
        }
        if self.targets.iter().any(|target| target.trim().is_empty()) {
            return Err(PolicyError::BlankProcessGroupId {
                target: self.target_name.clone(),
            });
        }
        Ok(())
    }

    pub fn is_wildcard(&self) -> bool {
        self.targets.iter().any(|target| target == CRASH_LOOP_WILDCARD)
    }
}

/// Order in which qualifying failures consume the replacement budget.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ReplacementPriority {
    /// Keep the order of the observed process group list.
    #[default]
    InputOrder,
    /// Replace the process groups that have been failing the longest first.
    LongestFailingFirst,
}

impl std::str::FromStr for ReplacementPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "input-order" => Ok(ReplacementPriority::InputOrder),
            "longest-failing-first" => Ok(ReplacementPriority::LongestFailingFirst),
            other => Err(format!("unknown replacement priority: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub priority: ReplacementPriority,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
    #[serde(default = "default_metrics_listen")]
    pub listen: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            listen: default_metrics_listen(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config: ReplacerConfig = "".parse().unwrap();
        assert!(config.policy.enabled);
        assert_eq!(config.policy.max_concurrent_replacements, 1);
        assert_eq!(config.policy.failure_detection_time, Duration::from_secs(7200));
        assert_eq!(config.policy.taint_replacement_time, Duration::from_secs(1800));
        assert_eq!(config.engine.priority, ReplacementPriority::InputOrder);
        assert_eq!(config.cluster_name(), "default");
    }

    #[test]
    fn parses_policy_and_crash_loop_directives() {
        let config: ReplacerConfig = r#"
            cluster = "prod-a"

            [policy]
            enabled = true
            max_concurrent_replacements = 3
            failure_detection_time = 60
            taint_replacement_time = 30

            [[crash_loop]]
            target_name = "foundationdb"
            targets = ["storage-1", "storage-2"]

            [[crash_loop]]
            target_name = "foundationdb-kubernetes-sidecar"
            targets = ["*"]

            [engine]
            priority = "longest-failing-first"
        "#
        .parse()
        .unwrap();

        assert_eq!(config.cluster_name(), "prod-a");
        assert_eq!(config.policy.max_concurrent_replacements, 3);
        assert_eq!(config.policy.failure_detection_time, Duration::from_secs(60));
        assert_eq!(config.crash_loop.len(), 2);
        assert!(!config.crash_loop[0].is_wildcard());
        assert!(config.crash_loop[1].is_wildcard());
        assert_eq!(
            config.engine.priority,
            ReplacementPriority::LongestFailingFirst
        );
    }

    #[test]
    fn rejects_crash_loop_directive_without_targets() {
        let err = r#"
            [[crash_loop]]
            target_name = "foundationdb"
            targets = []
        "#
        .parse::<ReplacerConfig>()
        .unwrap_err();
        let policy_err = err.downcast_ref::<PolicyError>().unwrap();
        assert_eq!(
            policy_err,
            &PolicyError::EmptyCrashLoopTargets {
                target: "foundationdb".into()
            }
        );
    }

    #[test]
    fn rejects_zero_failure_detection_time_when_enabled() {
        let err = "[policy]\nfailure_detection_time = 0\n"
            .parse::<ReplacerConfig>()
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PolicyError>(),
            Some(PolicyError::ZeroFailureDetectionTime)
        ));

        let disabled: ReplacerConfig = "[policy]\nenabled = false\nfailure_detection_time = 0\n"
            .parse()
            .unwrap();
        assert!(!disabled.policy.enabled);
    }

    #[test]
    fn negative_replacement_limit_is_accepted() {
        let config: ReplacerConfig = "[policy]\nmax_concurrent_replacements = -2\n"
            .parse()
            .unwrap();
        assert_eq!(config.policy.max_concurrent_replacements, -2);
    }

    #[test]
    fn priority_from_str() {
        assert_eq!(
            "Longest-Failing-First".parse::<ReplacementPriority>(),
            Ok(ReplacementPriority::LongestFailingFirst)
        );
        assert!("random".parse::<ReplacementPriority>().is_err());
    }
}
