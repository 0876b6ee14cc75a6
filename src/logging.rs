use std::{
    fs,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use anyhow::{Context, Result, bail};
use tracing::Level;
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, Layer,
    filter::{LevelFilter, Targets},
    fmt::{self, time::UtcTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use uuid::Uuid;

use crate::config::{LoggingConfig, LoggingRotation};

const LOG_FILE_PREFIX: &str = "rainledger.log";
const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Targets whose INFO events make up the human-readable progress log on stdout.
const STEP_LOG_TARGETS: &[&str] = &["main", "oracle", "server"];

pub struct LoggingGuard {
    _worker_guard: WorkerGuard,
    run_id: String,
}

impl LoggingGuard {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }
}

/// Which terminal sinks are installed next to the JSON file log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TerminalSinks {
    step_log: bool,
    warnings: bool,
}

impl TerminalSinks {
    fn from_config(config: &LoggingConfig) -> Self {
        Self {
            step_log: config.stdout_enabled,
            warnings: config.stderr_warn_enabled,
        }
    }
}

pub fn init_tracing(config: &LoggingConfig) -> Result<LoggingGuard> {
    let file_filter = build_env_filter(&config.filter)?;
    let log_dir = resolve_log_dir(&config.dir)?;
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create logging directory {}", log_dir.display()))?;

    let purge_warnings = purge_expired_logs(&log_dir, config.retention_days, SystemTime::now());
    let appender = match config.rotation {
        LoggingRotation::Daily => rolling::daily(&log_dir, LOG_FILE_PREFIX),
        LoggingRotation::Hourly => rolling::hourly(&log_dir, LOG_FILE_PREFIX),
    };
    let (file_writer, worker_guard) = tracing_appender::non_blocking(appender);
    let sinks = TerminalSinks::from_config(config);

    let file_layer = fmt::layer()
        .json()
        .with_timer(UtcTime::rfc_3339())
        .with_ansi(false)
        .with_writer(file_writer)
        .with_filter(file_filter);

    let step_log_layer = sinks.step_log.then(|| {
        fmt::layer()
            .compact()
            .with_timer(UtcTime::rfc_3339())
            .with_target(false)
            .with_writer(std::io::stdout)
            .with_filter(step_log_filter())
    });

    let warning_layer = sinks.warnings.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_filter(LevelFilter::WARN)
    });

    tracing_subscriber::registry()
        .with(ErrorLayer::default())
        .with(file_layer)
        .with(step_log_layer)
        .with(warning_layer)
        .try_init()
        .context("failed to initialize tracing subscriber")?;

    let run_id = Uuid::now_v7().to_string();
    tracing::info!(
        target: "logging",
        run_id = %run_id,
        dir = %log_dir.display(),
        filter = %config.filter,
        rotation = ?config.rotation,
        step_log = sinks.step_log,
        stderr_warnings = sinks.warnings,
        "logging_initialized"
    );
    for warning in purge_warnings {
        tracing::warn!(target: "logging", warning = %warning, "log_purge_failed");
    }

    Ok(LoggingGuard {
        _worker_guard: worker_guard,
        run_id,
    })
}

fn build_env_filter(filter: &str) -> Result<EnvFilter> {
    if filter.trim().is_empty() {
        bail!("logging.filter cannot be empty");
    }
    EnvFilter::try_new(filter).with_context(|| format!("failed to parse logging.filter '{filter}'"))
}

fn step_log_filter() -> Targets {
    Targets::new().with_targets(STEP_LOG_TARGETS.iter().map(|target| (*target, Level::INFO)))
}

fn resolve_log_dir(dir: &Path) -> Result<PathBuf> {
    if dir.as_os_str().is_empty() {
        bail!("logging.dir cannot be empty");
    }
    if dir.is_absolute() {
        return Ok(dir.to_path_buf());
    }
    Ok(std::env::current_dir()
        .context("failed to read current working directory for logging.dir")?
        .join(dir))
}

/// Removes rotated `rainledger.log*` files older than `retention_days`. Failures are
/// returned as warnings so a read-only log directory never blocks startup.
fn purge_expired_logs(log_dir: &Path, retention_days: usize, now: SystemTime) -> Vec<String> {
    let max_age = Duration::from_secs(retention_days as u64 * SECONDS_PER_DAY);
    let entries = match fs::read_dir(log_dir) {
        Ok(entries) => entries,
        Err(err) => return vec![format!("cannot scan {}: {err}", log_dir.display())],
    };

    let mut warnings = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !is_rotated_log(&path) {
            continue;
        }

        let expired = entry
            .metadata()
            .and_then(|metadata| metadata.modified())
            .map(|modified| {
                now.duration_since(modified)
                    .is_ok_and(|age| age >= max_age)
            });
        match expired {
            Ok(true) => {
                if let Err(err) = fs::remove_file(&path) {
                    warnings.push(format!("cannot remove {}: {err}", path.display()));
                }
            }
            Ok(false) => {}
            Err(err) => warnings.push(format!("cannot read mtime of {}: {err}", path.display())),
        }
    }
    warnings
}

fn is_rotated_log(path: &Path) -> bool {
    path.is_file()
        && path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(LOG_FILE_PREFIX))
}
