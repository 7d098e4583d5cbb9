//! Process-wide tracing setup: coloured stderr plus a JSON rolling log file.

use std::ffi::OsStr;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::cache::PersistentCell;

static LOG_GUARD: PersistentCell<Option<WorkerGuard>> = PersistentCell::new();

/// Installs the global subscriber on the first call; later calls do nothing.
///
/// Returns `true` only for the call that performed the setup.
pub fn init(log_file_path: &Path) -> bool {
    let mut first = false;
    LOG_GUARD.get_or_init(|| {
        first = true;
        install(log_file_path)
    });
    first
}

fn install(log_file_path: &Path) -> Option<WorkerGuard> {
    let log_dir = log_file_path.parent().unwrap_or(Path::new("logs"));
    let log_file_name = log_file_path
        .file_name()
        .unwrap_or(OsStr::new("cattracks.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(env_filter("RUST_LOG", "info"));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(env_filter("RUST_LOG_JSON", "debug"));

    // Another subscriber may already be installed (e.g. by a test harness).
    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .try_init()
        .ok()
        .map(|_| guard)
}

fn env_filter(var: &str, default: &str) -> EnvFilter {
    EnvFilter::try_from_env(var).unwrap_or_else(|_| EnvFilter::new(default))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_runs_once() {
        let path = std::env::temp_dir().join("cattracks_test_logs/test.log");
        let first = init(&path);
        let second = init(&path);
        let third = init(&path);

        assert!(first);
        assert!(!second);
        assert!(!third);
        assert!(LOG_GUARD.is_initialized());
    }
}
