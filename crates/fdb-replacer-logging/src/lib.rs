//! ---
//! fdbr_section: "03-persistence-logging"
//! fdbr_subsection: "module"
//! fdbr_type: "source"
//! fdbr_scope: "code"
//! fdbr_description: "Structured decision logging adapters."
//! fdbr_version: "v0.0.0-prealpha"
//! fdbr_owner: "tbd"
//! ---
#![warn(missing_docs)]

use tracing::Level;
use tracing_subscriber::{fmt as subscriber_fmt, prelude::*, EnvFilter, Registry};

pub mod macros;

#[doc(hidden)]
pub use tracing as __tracing;

/// Initialize a baseline tracing subscriber for command-line use.
///
/// Events go to stderr so that stdout stays reserved for command output.
pub fn init() {
    let _ = Registry::default()
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(subscriber_fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Structured context attached to every replacement decision event.
#[derive(Debug, Default, Clone)]
pub struct LogContext<'a> {
    /// Cluster the decision pass runs for.
    pub cluster: Option<&'a str>,
    /// Process group the event refers to.
    pub process_group: Option<&'a str>,
    /// Fault domain of the process group.
    pub fault_domain: Option<&'a str>,
    /// Failure condition that triggered the evaluation.
    pub condition: Option<&'a str>,
    /// Failure start time, already rendered for display.
    pub failure_time: Option<&'a str>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a cluster name.
    pub fn with_cluster(mut self, cluster: &'a str) -> Self {
        self.cluster = Some(cluster);
        self
    }

    /// Attach a process group identifier.
    pub fn with_process_group(mut self, process_group: &'a str) -> Self {
        self.process_group = Some(process_group);
        self
    }

    /// Attach a fault domain.
    pub fn with_fault_domain(mut self, fault_domain: &'a str) -> Self {
        self.fault_domain = Some(fault_domain);
        self
    }

    /// Attach the failure condition label.
    pub fn with_condition(mut self, condition: &'a str) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Attach the rendered failure start time.
    pub fn with_failure_time(mut self, failure_time: &'a str) -> Self {
        self.failure_time = Some(failure_time);
        self
    }
}

/// High-level outcome used when emitting lifecycle log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemEventOutcome {
    /// The operation completed successfully.
    Success,
    /// The operation failed or was aborted.
    Fault,
}

impl SystemEventOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            SystemEventOutcome::Success => "success",
            SystemEventOutcome::Fault => "fault",
        }
    }
}

/// Emit a standardized system event with a success/fault outcome.
pub fn log_system_event(
    context: Option<&LogContext>,
    event: &str,
    message: &str,
    outcome: SystemEventOutcome,
) {
    let ctx = context.cloned().unwrap_or_default();
    match outcome {
        SystemEventOutcome::Success => tracing::info!(
            event,
            outcome = outcome.as_str(),
            cluster = ctx.cluster.unwrap_or(""),
            process_group_id = ctx.process_group.unwrap_or(""),
            message = %message
        ),
        SystemEventOutcome::Fault => tracing::error!(
            event,
            outcome = outcome.as_str(),
            cluster = ctx.cluster.unwrap_or(""),
            process_group_id = ctx.process_group.unwrap_or(""),
            message = %message
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macros_emit_without_panic() {
        init();
        let ctx = LogContext::new()
            .with_cluster("cluster-a")
            .with_process_group("storage-1")
            .with_fault_domain("zone-a");
        replacer_info!(context = ctx.clone(), "Replace process group");
        replacer_debug!("debug message");
        replacer_warn!(context = ctx, "throttled replacements: {}", 2);
    }

    #[test]
    fn init_does_not_panic() {
        init();
        init();
    }

    #[test]
    fn system_event_helper_emits() {
        init();
        let ctx = LogContext::new().with_cluster("cluster-a");
        log_system_event(
            Some(&ctx),
            "config.validate",
            "configuration accepted",
            SystemEventOutcome::Success,
        );
        log_system_event(
            None,
            "config.validate",
            "configuration rejected",
            SystemEventOutcome::Fault,
        );
    }
}
