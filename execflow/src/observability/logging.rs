use tracing::Span;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogSettings;
use crate::context::ExecutionContext;

/// Installs the global subscriber.
///
/// `RUST_LOG` wins over `settings.level` when set. Returns `false` if a
/// subscriber was already installed, in which case nothing changes.
pub fn init_logging(settings: &LogSettings) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.level.as_str()));

    if settings.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_current_span(true))
            .try_init()
            .is_ok()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false))
            .try_init()
            .is_ok()
    }
}

/// Span for one executor invocation.
#[must_use]
pub fn execution_span(context: &ExecutionContext) -> Span {
    tracing::info_span!(
        "execution",
        executor = %context.executor_name,
        operation = %context.operation,
        run_id = %context.run_id,
        organization_id = %context.organization_id,
        request_id = context.request_id.as_deref().unwrap_or(""),
    )
}

/// Span for one file moving through its stages.
#[must_use]
pub fn file_span(execution_id: &str, file_execution_id: &str) -> Span {
    tracing::info_span!("file_execution", execution_id, file_execution_id)
}
