//! Logging and observability helpers.

pub mod sensitive;

pub use sensitive::Sensitive;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

pub const LOG_FILE_PREFIX: &str = "mysql-studio.log";
pub const LOG_RETENTION_DAYS: u64 = 14;
const DEFAULT_FILTER: &str = "mysql_studio=info,mysql_studio_lib=info,studio_ddl=info";

#[derive(Debug, Clone, Default)]
pub struct LogSettings {
    /// Daily rolling JSON files are written here when set; stdout otherwise.
    pub log_dir: Option<PathBuf>,
}

/// Installs the global subscriber and the panic hook.
///
/// The returned guard flushes the file writer on drop and must be held for
/// the lifetime of the process.
pub fn init_tracing(settings: &LogSettings) -> Option<WorkerGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let guard = match &settings.log_dir {
        Some(log_dir) => {
            if let Err(e) = fs::create_dir_all(log_dir) {
                eprintln!("Failed to create log directory {}: {}", log_dir.display(), e);
            }
            match cleanup_old_logs(log_dir, LOG_RETENTION_DAYS) {
                Ok(removed) if removed > 0 => eprintln!("Removed {removed} old log file(s)"),
                Ok(_) => {}
                Err(e) => eprintln!("Failed to clean up old logs: {}", e),
            }

            let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(file_appender);
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(writer)
                .json()
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_current_span(true)
                .with_span_list(true)
                .with_ansi(false)
                .with_span_events(FmtSpan::CLOSE)
                .try_init();
            Some(guard)
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(true)
                .try_init();
            None
        }
    };

    install_panic_hook();

    match &settings.log_dir {
        Some(dir) => tracing::info!("Tracing initialized. Logs directory: {:?}", dir),
        None => tracing::info!("Tracing initialized on stdout"),
    }
    guard
}

fn install_panic_hook() {
    let previous_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown".to_string());

        let payload = panic_info.payload();
        let msg = if let Some(s) = payload.downcast_ref::<&str>() {
            format!("PANIC: {}", s)
        } else if let Some(s) = payload.downcast_ref::<String>() {
            format!("PANIC: {}", s)
        } else {
            "PANIC: unknown cause".to_string()
        };

        tracing::error!(target: "panic", location = %location, message = %msg, "Server panicked");
        previous_hook(panic_info);
    }));
}

/// Deletes rolled log files older than `retention_days`. Returns how many
/// files were removed.
pub fn cleanup_old_logs(log_dir: &Path, retention_days: u64) -> std::io::Result<usize> {
    let retention = Duration::from_secs(retention_days * 24 * 60 * 60);
    cleanup_logs_older_than(log_dir, retention, SystemTime::now())
}

fn cleanup_logs_older_than(
    log_dir: &Path,
    retention: Duration,
    now: SystemTime,
) -> std::io::Result<usize> {
    let mut removed = 0;
    for entry in fs::read_dir(log_dir)? {
        let path = entry?.path();
        if !is_log_file(&path) {
            continue;
        }

        let Ok(modified) = fs::metadata(&path).and_then(|m| m.modified()) else {
            continue;
        };
        let Ok(age) = now.duration_since(modified) else {
            continue;
        };
        if age > retention {
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => eprintln!("Failed to remove old log file {:?}: {}", path, e),
            }
        }
    }
    Ok(removed)
}

// Daily files are named `mysql-studio.log.YYYY-MM-DD`.
fn is_log_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(LOG_FILE_PREFIX))
}
