//! Log routing for the CLI.
//!
//! Diagnostics go to stderr unless a log file or directory is configured, in
//! which case they are written as JSON lines. stdout is never touched: it
//! carries the version output CI scripts capture.

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use gitver::ColorChoice;
use gitver_core::Config;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const ENV_LOG_PATH: &str = "GITVER_LOG_PATH";
const ENV_LOG_DIR: &str = "GITVER_LOG_DIR";
const FILE_PREFIX: &str = "gitver";
const FILE_SUFFIX: &str = "jsonl";

/// Where log events end up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSink {
    /// Compact human-readable lines on stderr.
    Stderr {
        /// Emit ANSI styling.
        ansi: bool,
    },
    /// JSON lines appended to one file.
    File(Utf8PathBuf),
    /// JSON lines in daily `gitver.<date>.jsonl` files.
    Directory(Utf8PathBuf),
}

/// Filter and destination for this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// `EnvFilter` directive.
    pub filter: String,
    /// Destination.
    pub sink: LogSink,
}

impl LogSettings {
    /// Combine CLI flags, the environment and configuration.
    pub fn resolve(config: &Config, quiet: bool, verbose: u8, color: ColorChoice) -> Self {
        Self {
            filter: filter_directive(
                quiet,
                verbose,
                std::env::var("RUST_LOG").ok(),
                config.log_level.as_str(),
            ),
            sink: choose_sink(
                std::env::var(ENV_LOG_PATH).ok().map(Utf8PathBuf::from),
                std::env::var(ENV_LOG_DIR).ok().map(Utf8PathBuf::from),
                config.log_dir.clone(),
                color.stderr_ansi(),
            ),
        }
    }
}

/// Holds the background writer of a file sink; flushes on drop.
pub struct LogGuard {
    _worker: Option<WorkerGuard>,
}

/// Install the global subscriber described by `settings`.
///
/// A file sink that cannot be opened degrades to stderr with a warning
/// rather than failing the run.
pub fn init(settings: &LogSettings) -> anyhow::Result<LogGuard> {
    let filter = EnvFilter::try_new(&settings.filter)
        .with_context(|| format!("invalid log filter '{}'", settings.filter))?;

    let appender = match settings.sink {
        LogSink::Stderr { ansi } => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .compact()
                        .with_target(false)
                        .with_ansi(ansi)
                        .with_writer(std::io::stderr),
                )
                .try_init()?;
            return Ok(LogGuard { _worker: None });
        }
        ref sink => open_appender(sink),
    };

    let (writer, worker) = match appender {
        Ok(appender) => tracing_appender::non_blocking(appender),
        Err(err) => {
            eprintln!("warning: {err:#}; logging to stderr");
            tracing_appender::non_blocking(std::io::stderr())
        }
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .with_span_list(false)
                .with_writer(writer),
        )
        .try_init()?;
    Ok(LogGuard {
        _worker: Some(worker),
    })
}

/// `--quiet` beats `-v`, which beats `RUST_LOG`, which beats `log_level`.
fn filter_directive(quiet: bool, verbose: u8, rust_log: Option<String>, configured: &str) -> String {
    if quiet {
        return "error".to_string();
    }
    match verbose {
        0 => rust_log
            .filter(|directive| !directive.trim().is_empty())
            .unwrap_or_else(|| configured.to_string()),
        1 => "warn,gitver=debug,gitver_core=debug".to_string(),
        _ => "trace".to_string(),
    }
}

fn choose_sink(
    env_path: Option<Utf8PathBuf>,
    env_dir: Option<Utf8PathBuf>,
    configured_dir: Option<Utf8PathBuf>,
    ansi: bool,
) -> LogSink {
    if let Some(path) = env_path.filter(|p| p.file_name().is_some()) {
        return LogSink::File(path);
    }
    match env_dir.or(configured_dir) {
        Some(dir) => LogSink::Directory(dir),
        None => LogSink::Stderr { ansi },
    }
}

fn open_appender(sink: &LogSink) -> anyhow::Result<RollingFileAppender> {
    let builder = RollingFileAppender::builder();
    let (builder, dir) = match sink {
        LogSink::File(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_str().is_empty())
                .unwrap_or_else(|| Utf8Path::new("."));
            let name = path.file_name().unwrap_or(FILE_PREFIX);
            (builder.rotation(Rotation::NEVER).filename_prefix(name), dir)
        }
        LogSink::Directory(dir) => (
            builder
                .rotation(Rotation::DAILY)
                .filename_prefix(FILE_PREFIX)
                .filename_suffix(FILE_SUFFIX),
            dir.as_path(),
        ),
        LogSink::Stderr { .. } => anyhow::bail!("stderr has no log file"),
    };
    builder
        .build(dir)
        .with_context(|| format!("cannot open log file in {dir}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn quiet_wins_over_everything() {
        assert_eq!(filter_directive(true, 2, Some("trace".into()), "debug"), "error");
    }

    #[test]
    fn verbosity_targets_gitver_crates() {
        assert_eq!(
            filter_directive(false, 1, Some("off".into()), "info"),
            "warn,gitver=debug,gitver_core=debug"
        );
        assert_eq!(filter_directive(false, 3, None, "info"), "trace");
    }

    #[test]
    fn rust_log_beats_configured_level() {
        assert_eq!(filter_directive(false, 0, Some("gitver_core=trace".into()), "warn"), "gitver_core=trace");
        assert_eq!(filter_directive(false, 0, Some("  ".into()), "warn"), "warn");
        assert_eq!(filter_directive(false, 0, None, "error"), "error");
    }

    #[test]
    fn default_sink_is_stderr() {
        assert_eq!(choose_sink(None, None, None, false), LogSink::Stderr { ansi: false });
    }

    #[test]
    fn log_path_beats_directories() {
        let sink = choose_sink(
            Some("/tmp/ci/gitver.log".into()),
            Some("/tmp/env".into()),
            Some("/tmp/config".into()),
            true,
        );
        assert_eq!(sink, LogSink::File("/tmp/ci/gitver.log".into()));
    }

    #[test]
    fn env_dir_beats_configured_dir() {
        let sink = choose_sink(None, Some("/tmp/env".into()), Some("/tmp/config".into()), true);
        assert_eq!(sink, LogSink::Directory("/tmp/env".into()));

        let sink = choose_sink(None, None, Some("/tmp/config".into()), true);
        assert_eq!(sink, LogSink::Directory("/tmp/config".into()));
    }

    #[test]
    fn log_path_without_file_name_is_ignored() {
        assert_eq!(choose_sink(Some("/".into()), None, None, false), LogSink::Stderr { ansi: false });
    }

    #[test]
    fn file_sink_appends_to_exact_path() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        let path = dir.join("logs").join("run.jsonl");

        let mut appender = open_appender(&LogSink::File(path.clone())).unwrap();
        writeln!(appender, "{{\"message\":\"hello\"}}").unwrap();
        appender.flush().unwrap();
        drop(appender);

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("hello"));
    }

    #[test]
    fn stderr_sink_has_no_appender() {
        assert!(open_appender(&LogSink::Stderr { ansi: false }).is_err());
    }

    #[test]
    fn resolve_honors_quiet_flag() {
        let config = Config::default();
        let settings = LogSettings::resolve(&config, true, 0, ColorChoice::Never);
        assert_eq!(settings.filter, "error");
    }
}
