//! Core logging bootstrap.
//!
//! # Responsibility
//! - Initialize `flexi_logger` exactly once per process, writing rolling
//!   files into an absolute directory or to stderr.
//! - Emit stable, metadata-only diagnostic events from core.
//!
//! # Invariants
//! - Logging init is idempotent for the same configuration.
//! - Logging initialization must not panic.
//! - Re-initialization with a different level or target is rejected.

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{error, info};
use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

const LOG_FILE_BASENAME: &str = "persons";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const MAX_LOG_FILES: usize = 5;
const MAX_PANIC_PAYLOAD_CHARS: usize = 160;

static LOGGING_STATE: OnceCell<LoggingState> = OnceCell::new();
static PANIC_HOOK_INSTALLED: OnceCell<()> = OnceCell::new();

/// Logging section of the core configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// One of `trace|debug|info|warn|error`.
    pub level: String,
    /// Absolute directory for rolling log files; `None` logs to stderr.
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level().to_string(),
            dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoggingError {
    #[error("unsupported log level `{0}`; expected trace|debug|info|warn|error")]
    UnsupportedLevel(String),
    #[error("invalid log directory: {0}")]
    InvalidDir(String),
    #[error("logging already initialized with {active}; refusing to switch to {requested}")]
    Conflict { active: String, requested: String },
    #[error("failed to start logger: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum LogTarget {
    Stderr,
    Dir(PathBuf),
}

impl LogTarget {
    fn describe(&self) -> String {
        match self {
            Self::Stderr => "stderr".to_string(),
            Self::Dir(dir) => format!("`{}`", dir.display()),
        }
    }
}

struct LoggingState {
    level: &'static str,
    target: LogTarget,
    _logger: LoggerHandle,
}

/// Initializes core logging from `config`.
///
/// # Errors
/// - Returns an error when the level is unsupported.
/// - Returns an error when the directory is empty, non-absolute, or cannot
///   be created.
/// - Returns an error when logging is already active with a different level
///   or target.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let level = normalize_level(&config.level)?;
    let target = match config.dir.as_deref() {
        Some(dir) => LogTarget::Dir(normalize_log_dir(dir)?),
        None => LogTarget::Stderr,
    };

    if let Some(state) = LOGGING_STATE.get() {
        return check_active(state, level, &target);
    }

    let state = LOGGING_STATE.get_or_try_init(|| start_logger(level, &target))?;
    check_active(state, level, &target)
}

fn check_active(state: &LoggingState, level: &'static str, target: &LogTarget) -> Result<(), LoggingError> {
    if &state.target != target {
        return Err(LoggingError::Conflict {
            active: state.target.describe(),
            requested: target.describe(),
        });
    }
    if state.level != level {
        return Err(LoggingError::Conflict {
            active: format!("level `{}`", state.level),
            requested: format!("level `{level}`"),
        });
    }
    Ok(())
}

fn start_logger(level: &'static str, target: &LogTarget) -> Result<LoggingState, LoggingError> {
    let logger = Logger::try_with_str(level).map_err(|err| LoggingError::Backend(err.to_string()))?;
    let logger = match target {
        LogTarget::Stderr => logger.log_to_stderr().format(flexi_logger::detailed_format),
        LogTarget::Dir(dir) => {
            std::fs::create_dir_all(dir).map_err(|err| {
                LoggingError::InvalidDir(format!("failed to create `{}`: {err}", dir.display()))
            })?;
            logger
                .log_to_file(
                    FileSpec::default()
                        .directory(dir.as_path())
                        .basename(LOG_FILE_BASENAME),
                )
                .rotate(
                    Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
                    Naming::Numbers,
                    Cleanup::KeepLogFiles(MAX_LOG_FILES),
                )
                .write_mode(WriteMode::BufferAndFlush)
                .append()
                .format_for_files(flexi_logger::detailed_format)
        }
    };
    let handle = logger
        .start()
        .map_err(|err| LoggingError::Backend(err.to_string()))?;

    install_panic_hook_once();

    info!(
        "event=app_start module=core status=ok platform={} build_mode={} version={}",
        std::env::consts::OS,
        build_mode(),
        env!("CARGO_PKG_VERSION")
    );
    info!(
        "event=logging_init module=core status=ok level={level} target={}",
        target.describe()
    );

    Ok(LoggingState {
        level,
        target: target.clone(),
        _logger: handle,
    })
}

/// Returns `(level, log_dir)` when logging is active; `log_dir` is `None`
/// for stderr logging.
pub fn logging_status() -> Option<(&'static str, Option<PathBuf>)> {
    LOGGING_STATE.get().map(|state| {
        let dir = match &state.target {
            LogTarget::Stderr => None,
            LogTarget::Dir(dir) => Some(dir.clone()),
        };
        (state.level, dir)
    })
}

/// Returns the default log level for current build mode.
///
/// - `debug` builds -> `debug`
/// - `release` builds -> `info`
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn normalize_level(level: &str) -> Result<&'static str, LoggingError> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => Err(LoggingError::UnsupportedLevel(other.to_string())),
    }
}

fn normalize_log_dir(log_dir: &Path) -> Result<PathBuf, LoggingError> {
    if log_dir.as_os_str().is_empty() {
        return Err(LoggingError::InvalidDir("log dir cannot be empty".to_string()));
    }
    if !log_dir.is_absolute() {
        return Err(LoggingError::InvalidDir(format!(
            "log dir must be an absolute path, got `{}`",
            log_dir.display()
        )));
    }
    Ok(log_dir.to_path_buf())
}

fn build_mode() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "release"
    }
}

fn install_panic_hook_once() {
    if PANIC_HOOK_INSTALLED.get().is_some() {
        return;
    }

    let previous_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        // Payload may carry personal data; log a capped single-line summary.
        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let payload = panic_payload_summary(panic_info);
        error!(
            "event=panic_captured module=core status=error location={} payload={}",
            location, payload
        );
        previous_hook(panic_info);
    }));

    let _ = PANIC_HOOK_INSTALLED.set(());
}

fn panic_payload_summary(info: &std::panic::PanicHookInfo<'_>) -> String {
    let payload = if let Some(message) = info.payload().downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = info.payload().downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    };

    sanitize_message(&payload, MAX_PANIC_PAYLOAD_CHARS)
}

fn sanitize_message(value: &str, max_chars: usize) -> String {
    let normalized = value.replace(['\n', '\r'], " ");
    let mut truncated = normalized.chars().take(max_chars).collect::<String>();
    if normalized.chars().count() > max_chars {
        truncated.push_str("...");
    }
    truncated
}

#[cfg(test)]
mod tests {
    use super::{
        init_logging, logging_status, normalize_level, normalize_log_dir, sanitize_message,
        LoggingConfig, LoggingError,
    };
    use std::path::Path;

    #[test]
    fn normalize_level_accepts_known_values() {
        assert_eq!(normalize_level("INFO").unwrap(), "info");
        assert_eq!(normalize_level(" warning ").unwrap(), "warn");
        assert!(matches!(
            normalize_level("loud"),
            Err(LoggingError::UnsupportedLevel(_))
        ));
    }

    #[test]
    fn normalize_log_dir_rejects_relative_path() {
        let error = normalize_log_dir(Path::new("logs/dev")).unwrap_err();
        assert!(error.to_string().contains("absolute"));
    }

    #[test]
    fn sanitize_message_removes_newlines_and_truncates() {
        let sanitized = sanitize_message("line1\nline2\rline3", 8);
        assert!(!sanitized.contains('\n'));
        assert!(!sanitized.contains('\r'));
        assert!(sanitized.ends_with("..."));
    }

    #[test]
    fn init_logging_is_idempotent_for_same_config_and_rejects_conflicts() {
        let first_dir = tempfile::tempdir().unwrap();
        let second_dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            level: "info".to_string(),
            dir: Some(first_dir.path().to_path_buf()),
        };

        init_logging(&config).unwrap();
        init_logging(&config).unwrap();

        let level_error = init_logging(&LoggingConfig {
            level: "debug".to_string(),
            ..config.clone()
        })
        .unwrap_err();
        assert!(level_error.to_string().contains("refusing to switch"));

        let dir_error = init_logging(&LoggingConfig {
            dir: Some(second_dir.path().to_path_buf()),
            ..config.clone()
        })
        .unwrap_err();
        assert!(dir_error.to_string().contains("refusing to switch"));

        let stderr_error = init_logging(&LoggingConfig {
            dir: None,
            ..config
        })
        .unwrap_err();
        assert!(matches!(stderr_error, LoggingError::Conflict { .. }));

        let (active_level, active_dir) = logging_status().unwrap();
        assert_eq!(active_level, "info");
        assert_eq!(active_dir.as_deref(), Some(first_dir.path()));
    }
}
