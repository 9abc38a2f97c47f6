use std::time::{Duration, Instant};
use tracing::{error, trace, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Registry};

/// Initialize logging for the planner.
///
/// `RUST_LOG` wins over `level` when set. Calling this more than once is harmless; only
/// the first subscriber is installed.
pub fn init_logging(level: Level, json_output: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("lightning_planner={},warn", level)));

    let installed = if json_output {
        // compilation runs outside any span, so only the event itself is emitted
        let fmt_layer = fmt::layer()
            .json()
            .with_current_span(false)
            .with_span_list(false)
            .with_file(true)
            .with_line_number(true)
            .with_thread_ids(true);
        Registry::default().with(env_filter).with(fmt_layer).try_init()
    } else {
        let fmt_layer = fmt::layer().compact().with_thread_names(true);
        Registry::default().with(env_filter).with(fmt_layer).try_init()
    };

    if installed.is_err() {
        trace!("Global subscriber already installed");
    }
}

/// Structured event for one lowered plan node
#[macro_export]
macro_rules! log_lowering {
    ($node:expr) => {
        tracing::debug!(
            node_id = $node.id(),
            node_type = %$node.node_type(),
            schema_width = $node.schema().width(),
            inline_nodes = $node.inline_nodes().len(),
            "Lowered plan node"
        )
    };
}

#[macro_export]
macro_rules! log_fallback {
    ($operator:expr, $reason:expr) => {
        tracing::warn!(
            operator = $operator,
            reason = %$reason,
            "Falling back to alternate plan strategy"
        )
    };
}

/// Times one compilation and logs the outcome
pub struct CompileTimer {
    start: Instant,
    operator: &'static str,
}

impl CompileTimer {
    pub fn new(operator: &'static str) -> Self {
        Self {
            start: Instant::now(),
            operator,
        }
    }

    pub fn complete<T>(self, result: &crate::Result<T>) {
        let duration = self.start.elapsed();

        match result {
            Ok(_) => {
                if duration > Duration::from_millis(50) {
                    warn!(
                        operator = self.operator,
                        duration_ms = duration.as_millis() as u64,
                        "Slow plan compilation"
                    );
                } else {
                    trace!(
                        operator = self.operator,
                        duration_us = duration.as_micros() as u64,
                        "Plan compiled"
                    );
                }
            }
            Err(e) if e.is_recoverable() => {
                trace!(
                    operator = self.operator,
                    duration_us = duration.as_micros() as u64,
                    error = %e,
                    "Plan compilation needs fallback"
                );
            }
            Err(e) => {
                error!(
                    operator = self.operator,
                    duration_us = duration.as_micros() as u64,
                    error = %e,
                    code = e.error_code(),
                    "Plan compilation failed"
                );
            }
        }
    }
}
