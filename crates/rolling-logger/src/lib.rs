//! Rolling Logger
//!
//! File logger for the form builder host. Lines go to `<dir>/<app>.log`, or
//! to `<app>.<period>.log` files when a rotation period is set, with only the
//! newest files kept. The most recent lines are also kept in a circular buffer
//! so the host can show them without reading the file back.
//!
//! Records emitted through the `log` facade are bridged into `tracing`.

use std::collections::VecDeque;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;

pub use tracing_appender::rolling::Rotation;

pub const DEFAULT_KEEP_FILES: usize = 4;
pub const DEFAULT_BUFFER_LINES: usize = 500;

/// Tunables for [`init_logger_with`]
#[derive(Debug, Clone)]
pub struct LoggerOptions {
    pub rotation: Rotation,
    /// Log files kept on disk, the current one included
    pub keep_files: usize,
    /// Lines kept in memory for [`recent_lines`]
    pub buffer_lines: usize,
    pub level: LevelFilter,
    /// Mirror output to stderr
    pub stderr: bool,
}

impl Default for LoggerOptions {
    fn default() -> Self {
        Self {
            rotation: Rotation::DAILY,
            keep_files: DEFAULT_KEEP_FILES,
            buffer_lines: DEFAULT_BUFFER_LINES,
            level: LevelFilter::INFO,
            stderr: true,
        }
    }
}

static RECENT: OnceLock<RecentLines> = OnceLock::new();
static LOG_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Local wall-clock timestamps for every line
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

/// Keeps the background file writer alive; dropping it flushes pending lines
pub struct LoggerGuard {
    _worker: WorkerGuard,
}

/// Open the rotating file sink for `app_name` inside `dir`
pub fn file_appender(
    dir: impl AsRef<Path>,
    app_name: &str,
    options: &LoggerOptions,
) -> Result<RollingFileAppender, String> {
    RollingFileAppender::builder()
        .rotation(options.rotation.clone())
        .filename_prefix(app_name)
        .filename_suffix("log")
        .max_log_files(options.keep_files.max(1))
        .build(dir)
        .map_err(|e| format!("Failed to open log file: {}", e))
}

struct RecentState {
    lines: VecDeque<String>,
    capacity: usize,
    partial: String,
}

impl RecentState {
    fn remember(&mut self, buf: &[u8]) {
        self.partial.push_str(&String::from_utf8_lossy(buf));

        while let Some(pos) = self.partial.find('\n') {
            let line: String = self.partial.drain(..=pos).collect();
            if self.capacity == 0 {
                continue;
            }
            if self.lines.len() == self.capacity {
                self.lines.pop_front();
            }
            self.lines
                .push_back(line.trim_end_matches(|c| c == '\n' || c == '\r').to_string());
        }
    }
}

/// Circular buffer of the latest complete log lines
#[derive(Clone)]
pub struct RecentLines {
    inner: Arc<Mutex<RecentState>>,
}

impl RecentLines {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RecentState {
                lines: VecDeque::with_capacity(capacity),
                capacity,
                partial: String::new(),
            })),
        }
    }

    /// Oldest first
    pub fn lines(&self) -> Vec<String> {
        lock_state(&self.inner)
            .map(|state| state.lines.iter().cloned().collect())
            .unwrap_or_default()
    }
}

fn lock_state(inner: &Mutex<RecentState>) -> io::Result<MutexGuard<'_, RecentState>> {
    inner
        .lock()
        .map_err(|_| io::Error::new(io::ErrorKind::Other, "log buffer lock poisoned"))
}

/// Writer handed out per event by the buffer layer
pub struct RecentWriter {
    inner: Arc<Mutex<RecentState>>,
}

impl Write for RecentWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        lock_state(&self.inner)?.remember(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for RecentLines {
    type Writer = RecentWriter;

    fn make_writer(&'a self) -> Self::Writer {
        RecentWriter {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Install the global logger with default options
pub fn init_logger(log_dir: PathBuf, app_name: &str) -> Result<LoggerGuard, String> {
    init_logger_with(log_dir, app_name, LoggerOptions::default())
}

pub fn init_logger_with(
    log_dir: impl AsRef<Path>,
    app_name: &str,
    options: LoggerOptions,
) -> Result<LoggerGuard, String> {
    let log_dir = log_dir.as_ref();
    let appender = file_appender(log_dir, app_name, &options)?;
    let (file_writer, worker) = tracing_appender::non_blocking(appender);
    let recent = RecentLines::new(options.buffer_lines);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_timer(LocalTimer)
        .with_writer(file_writer);
    let recent_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_timer(LocalTimer)
        .with_writer(recent.clone());
    let stderr_layer = options.stderr.then(|| {
        tracing_subscriber::fmt::layer()
            .with_timer(LocalTimer)
            .with_writer(io::stderr)
    });

    tracing_subscriber::registry()
        .with(options.level)
        .with(file_layer)
        .with(recent_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| format!("Failed to install logger: {}", e))?;

    log::set_max_level(to_log_filter(options.level));
    let _ = RECENT.set(recent);
    let _ = LOG_DIR.set(log_dir.to_path_buf());
    Ok(LoggerGuard { _worker: worker })
}

fn to_log_filter(level: LevelFilter) -> log::LevelFilter {
    match level.into_level() {
        None => log::LevelFilter::Off,
        Some(tracing::Level::ERROR) => log::LevelFilter::Error,
        Some(tracing::Level::WARN) => log::LevelFilter::Warn,
        Some(tracing::Level::INFO) => log::LevelFilter::Info,
        Some(tracing::Level::DEBUG) => log::LevelFilter::Debug,
        Some(tracing::Level::TRACE) => log::LevelFilter::Trace,
    }
}

pub fn info(msg: &str) -> Result<(), String> {
    tracing::info!("{}", msg);
    Ok(())
}

pub fn warn(msg: &str) -> Result<(), String> {
    tracing::warn!("{}", msg);
    Ok(())
}

pub fn error(msg: &str) -> Result<(), String> {
    tracing::error!("{}", msg);
    Ok(())
}

/// Recent lines of the global logger (empty before [`init_logger`])
pub fn recent_lines() -> Vec<String> {
    RECENT.get().map(RecentLines::lines).unwrap_or_default()
}

/// Directory the global logger writes to
pub fn log_dir() -> Option<PathBuf> {
    LOG_DIR.get().cloned()
}
