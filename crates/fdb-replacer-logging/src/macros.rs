//! ---
//! fdbr_section: "03-persistence-logging"
//! fdbr_subsection: "module"
//! fdbr_type: "source"
//! fdbr_scope: "code"
//! fdbr_description: "Structured decision logging adapters."
//! fdbr_version: "v0.0.0-prealpha"
//! fdbr_owner: "tbd"
//! ---
//! Context-enriched logging macros.

#[doc(hidden)]
#[macro_export]
macro_rules! __replacer_event {
    ($level:expr, $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        $crate::__tracing::event!(
            $level,
            cluster = ctx.cluster.unwrap_or(""),
            process_group_id = ctx.process_group.unwrap_or(""),
            fault_domain = ctx.fault_domain.unwrap_or(""),
            condition = ctx.condition.unwrap_or(""),
            failure_time = ctx.failure_time.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit an informational decision event enriched with process group context.
#[macro_export]
macro_rules! replacer_info {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__replacer_event!($crate::__tracing::Level::INFO, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__replacer_event!($crate::__tracing::Level::INFO, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a debug decision event enriched with process group context.
#[macro_export]
macro_rules! replacer_debug {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__replacer_event!($crate::__tracing::Level::DEBUG, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__replacer_event!($crate::__tracing::Level::DEBUG, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a warning decision event enriched with process group context.
#[macro_export]
macro_rules! replacer_warn {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__replacer_event!($crate::__tracing::Level::WARN, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__replacer_event!($crate::__tracing::Level::WARN, $crate::LogContext::default(), $($arg)+)
    };
}
