//! # Logging Module
//!
//! Environment-aware console logging using the tracing ecosystem. Output goes
//! to stdout: human-readable with ANSI colors on a TTY, JSON lines in
//! production so log shippers can index the structured fields.
//!
//! Every reconciliation cycle carries a `cycle_id` (UUID v4) field so that the
//! per-item warnings swallowed inside a cycle can be tied back to its summary.

use std::io::IsTerminal;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::constants::system;

static TRACING_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize console logging once per process
///
/// Safe to call repeatedly; if another global subscriber is already installed
/// (for example by an embedding host) that subscriber is kept.
pub fn init_structured_logging() {
    TRACING_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let log_level = get_log_level(&environment);
        let use_ansi = IsTerminal::is_terminal(&std::io::stdout());

        let console_layer = if environment == "production" {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .json()
                .with_filter(EnvFilter::new(&log_level))
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(use_ansi)
                .with_filter(EnvFilter::new(&log_level))
                .boxed()
        };

        let subscriber = tracing_subscriber::registry().with(console_layer);

        if subscriber.try_init().is_err() {
            tracing::debug!(
                "Global tracing subscriber already initialized, keeping the existing one"
            );
        } else {
            tracing::info!(
                environment = %environment,
                log_level = %log_level,
                "Structured logging initialized"
            );
        }
    });
}

fn get_environment() -> String {
    std::env::var(system::ENVIRONMENT_VAR).unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment variables or environment defaults
fn get_log_level(environment: &str) -> String {
    if let Ok(level) = std::env::var("RUST_LOG") {
        return level.to_lowercase();
    }

    match environment {
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

/// Log a reconciliation cycle event with a consistent field layout
///
/// ```
/// use fleet_reconciler::log_cycle;
///
/// let cycle_id = uuid::Uuid::new_v4();
/// log_cycle!(info, "cache_refresh", cycle_id, sites: 3, clients: 1);
/// log_cycle!(debug, "maintenance", cycle_id);
/// ```
#[macro_export]
macro_rules! log_cycle {
    ($level:ident, $service:expr, $cycle_id:expr $(,)?) => {
        tracing::$level!(
            service = %$service,
            cycle_id = %$cycle_id,
            "CYCLE {}", $service
        );
    };
    ($level:ident, $service:expr, $cycle_id:expr, $($key:ident: $value:expr),+ $(,)?) => {
        tracing::$level!(
            service = %$service,
            cycle_id = %$cycle_id,
            $($key = ?$value,)+
            "CYCLE {}", $service
        );
    };
}
