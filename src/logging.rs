use crate::prefs::app_dir;
use anyhow::Context;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Keeps the background log writer alive; flushes on drop.
pub struct LogGuard {
    _guard: WorkerGuard,
    pub path: PathBuf,
}

pub fn default_log_path() -> Option<PathBuf> {
    app_dir("XDG_STATE_HOME", ".local/state").map(|dir| dir.join("moodviz.log"))
}

/// Installs a file-backed subscriber. The terminal is owned by the visualizer, so
/// nothing is ever written to stdout/stderr. `RUST_LOG` overrides `level`.
pub fn init(path: Option<&Path>, level: &str) -> anyhow::Result<Option<LogGuard>> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match default_log_path() {
            Some(p) => p,
            None => return Ok(None),
        },
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create log directory {}", parent.display()))?;
    }

    let level: LevelFilter = level
        .parse()
        .with_context(|| format!("invalid log level '{level}'"))?;
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let file = File::create(&path).with_context(|| format!("create log file {}", path.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .try_init()
        .context("install tracing subscriber")?;

    tracing::info!(path = %path.display(), "logging initialized");
    Ok(Some(LogGuard {
        _guard: guard,
        path,
    }))
}
