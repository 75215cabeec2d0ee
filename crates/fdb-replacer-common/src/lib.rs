//! ---
//! fdbr_section: "01-core-functionality"
//! fdbr_subsection: "module"
//! fdbr_type: "source"
//! fdbr_scope: "code"
//! fdbr_description: "Shared primitives and utilities for the replacement runtime."
//! fdbr_version: "v0.0.0-prealpha"
//! fdbr_owner: "tbd"
//! ---
//! Core shared primitives for the fdb-replacer workspace.
//! This crate exposes configuration loading, logging initialisation, and
//! the time helpers used when classifying failure windows.

pub mod config;
pub mod logging;
pub mod time;

pub use config::{
    CrashLoopConfig, EngineConfig, LoadedReplacerConfig, LoggingConfig, MetricsConfig,
    PolicyConfig, PolicyError, ReplacementPriority, ReplacerConfig,
};
pub use logging::{init_tracing, LogFormat};
