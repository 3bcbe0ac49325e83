//! Optional rolling-file sink for the crate's `log` events.
//!
//! Sessions and the facade only emit through the `log` facade. Hosts that
//! already install a logger never call [`init_logging`]; the others get a
//! size-rotated file under a directory of their choosing.
//!
//! # Invariants
//! - At most one sink per process. Re-initialization with the same level and
//!   directory is a no-op, anything else is rejected.
//! - Free text that may echo record data (error renderings, panic payloads)
//!   is written only through [`loggable`].

use flexi_logger::{
    Cleanup, Criterion, FileSpec, FlexiLoggerError, LogSpecification, Logger, LoggerHandle,
    Naming, WriteMode,
};
use log::{error, info, LevelFilter};
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const LOG_FILE_BASENAME: &str = "trystore";
const ROTATE_AT_BYTES: u64 = 10 * 1024 * 1024;
const KEEP_ROTATED_FILES: usize = 5;

/// Character cap for free text written to the log.
pub(crate) const MAX_LOGGED_CHARS: usize = 240;

static SINK: OnceCell<Sink> = OnceCell::new();
static PANIC_HOOK: OnceCell<()> = OnceCell::new();

struct Sink {
    level: LevelFilter,
    dir: PathBuf,
    _handle: LoggerHandle,
}

#[derive(Debug)]
pub enum LoggingError {
    UnknownLevel(String),
    RelativeDirectory(PathBuf),
    CreateDirectory {
        dir: PathBuf,
        source: std::io::Error,
    },
    Backend(FlexiLoggerError),
    /// A sink with a different level or directory is already running.
    AlreadyActive { level: LevelFilter, dir: PathBuf },
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownLevel(level) => write!(
                f,
                "unsupported log level `{level}`; expected off|error|warn|info|debug|trace"
            ),
            Self::RelativeDirectory(dir) => {
                write!(f, "log directory must be absolute, got `{}`", dir.display())
            }
            Self::CreateDirectory { dir, source } => {
                write!(f, "failed to create log directory `{}`: {source}", dir.display())
            }
            Self::Backend(err) => write!(f, "failed to start logger: {err}"),
            Self::AlreadyActive { level, dir } => write!(
                f,
                "logging already active at `{}` with level `{level}`",
                dir.display()
            ),
        }
    }
}

impl Error for LoggingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CreateDirectory { source, .. } => Some(source),
            Self::Backend(err) => Some(err),
            Self::UnknownLevel(_) | Self::RelativeDirectory(_) | Self::AlreadyActive { .. } => None,
        }
    }
}

/// Starts the file sink, or confirms the one already running.
///
/// # Errors
/// - `UnknownLevel` / `RelativeDirectory` for unusable arguments.
/// - `AlreadyActive` when a sink with other settings is running.
/// - `CreateDirectory` / `Backend` when the sink cannot start.
pub fn init_logging(level: &str, log_dir: impl AsRef<Path>) -> Result<(), LoggingError> {
    let level = parse_level(level)?;
    let dir = log_dir.as_ref();
    if !dir.is_absolute() {
        return Err(LoggingError::RelativeDirectory(dir.to_path_buf()));
    }

    let sink = SINK.get_or_try_init(|| start_sink(level, dir))?;
    if sink.level != level || sink.dir != dir {
        return Err(LoggingError::AlreadyActive {
            level: sink.level,
            dir: sink.dir.clone(),
        });
    }
    Ok(())
}

/// Level and directory of the running sink, if any.
pub fn logging_status() -> Option<(LevelFilter, PathBuf)> {
    SINK.get().map(|sink| (sink.level, sink.dir.clone()))
}

/// Single-line, length-capped rendering of `text` for log lines.
pub(crate) fn loggable(text: &str) -> String {
    let flat = text.replace(['\n', '\r'], " ");
    if flat.chars().count() <= MAX_LOGGED_CHARS {
        return flat;
    }
    let mut capped = flat.chars().take(MAX_LOGGED_CHARS).collect::<String>();
    capped.push_str("...");
    capped
}

fn parse_level(level: &str) -> Result<LevelFilter, LoggingError> {
    let trimmed = level.trim();
    if trimmed.eq_ignore_ascii_case("warning") {
        return Ok(LevelFilter::Warn);
    }
    trimmed
        .parse::<LevelFilter>()
        .map_err(|_| LoggingError::UnknownLevel(trimmed.to_string()))
}

fn start_sink(level: LevelFilter, dir: &Path) -> Result<Sink, LoggingError> {
    std::fs::create_dir_all(dir).map_err(|source| LoggingError::CreateDirectory {
        dir: dir.to_path_buf(),
        source,
    })?;

    let handle = Logger::with(LogSpecification::builder().default(level).build())
        .log_to_file(FileSpec::default().directory(dir).basename(LOG_FILE_BASENAME))
        .rotate(
            Criterion::Size(ROTATE_AT_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(KEEP_ROTATED_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(LoggingError::Backend)?;

    PANIC_HOOK.get_or_init(install_panic_hook);
    info!(
        "event=logging_init module=logging status=ok level={} log_dir={}",
        level,
        dir.display()
    );

    Ok(Sink {
        level,
        dir: dir.to_path_buf(),
        _handle: handle,
    })
}

fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map_or_else(|| "unknown".to_string(), |loc| format!("{}:{}", loc.file(), loc.line()));
        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .map(|message| (*message).to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        error!(
            "event=panic module=logging status=error location={} payload={}",
            location,
            loggable(&payload)
        );
        previous(info);
    }));
}
