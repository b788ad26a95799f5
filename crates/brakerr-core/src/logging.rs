//! Logging init: console on stderr plus a file under the XDG state dir, each
//! with its own level. Falls back to console-only when the file is unusable.

use anyhow::Result;
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Writer that is either a file or stderr (used when file clone fails).
enum FileOrStderr {
    File(std::fs::File),
    Stderr,
}

impl io::Write for FileOrStderr {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            FileOrStderr::File(f) => f.write(buf),
            FileOrStderr::Stderr => io::stderr().lock().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            FileOrStderr::File(f) => f.flush(),
            FileOrStderr::Stderr => io::stderr().lock().flush(),
        }
    }
}

struct FileMakeWriter(std::fs::File);

impl<'a> MakeWriter<'a> for FileMakeWriter {
    type Writer = FileOrStderr;

    fn make_writer(&'a self) -> Self::Writer {
        self.0
            .try_clone()
            .map(FileOrStderr::File)
            .unwrap_or(FileOrStderr::Stderr)
    }
}

/// Maps a level name or a numeric level (10 debug, 20 info, 30 warning,
/// 40 error, 50 critical) to a filter directive.
pub fn level_directive(level: &str) -> String {
    match level.trim() {
        "10" => "debug".to_string(),
        "20" => "info".to_string(),
        "30" => "warn".to_string(),
        "40" | "50" => "error".to_string(),
        "warning" | "WARNING" => "warn".to_string(),
        "critical" | "CRITICAL" => "error".to_string(),
        other => other.to_ascii_lowercase(),
    }
}

/// `RUST_LOG` wins when set; otherwise the given level, defaulting to `fallback`
/// if it does not parse.
fn filter_for(level: &str, fallback: &str) -> EnvFilter {
    if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return filter;
        }
    }
    EnvFilter::try_new(level_directive(level)).unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// Initialize logging to stderr at `console_level` and to
/// `~/.local/state/brakerr/brakerr.log` at `file_level`.
/// On failure (e.g. log dir unwritable), returns Err so the caller can fall back to stderr.
pub fn init_logging(console_level: &str, file_level: &str) -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("brakerr")?;
    let log_dir = xdg_dirs.get_state_home();

    fs::create_dir_all(&log_dir)?;
    let log_file_path: PathBuf = log_dir.join("brakerr.log");

    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file_path)?;
    let writer: BoxMakeWriter = BoxMakeWriter::new(FileMakeWriter(file));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_filter(filter_for(console_level, "info")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(filter_for(file_level, "warn")),
        )
        .try_init()?;

    tracing::debug!("brakerr logging initialized at {}", log_file_path.display());

    Ok(log_file_path)
}

/// Initialize logging to stderr only (no file). Use when init_logging() fails so the daemon doesn't crash.
pub fn init_logging_stderr(console_level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter_for(console_level, "info"))
        .with_writer(io::stderr)
        .try_init();
}
