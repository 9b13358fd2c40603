//! Logging
//!
//! Builds a subscriber that writes every event twice, to stdout and to
//! `<log_dir>/<app>_<timestamp>.log`, as `~|~`-delimited lines:
//!
//! ```text
//! 2024-05-01 10:12:03,481~|~asset-graph~|~INFO~|~load{run_id=..}: Creating vertices...
//! ```
//!
//! The caller decides how to install it (normally a scoped default).

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::fmt;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, FormattedFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

pub const FIELD_SEPARATOR: &str = "~|~";

/// Event formatter producing `time~|~app~|~LEVEL~|~message`.
pub struct PipeDelimited {
    app_name: String,
}

impl PipeDelimited {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
        }
    }
}

impl<S, N> FormatEvent<S, N> for PipeDelimited
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(&self, ctx: &FmtContext<'_, S, N>, mut writer: Writer<'_>, event: &Event<'_>) -> fmt::Result {
        write!(
            writer,
            "{}{sep}{}{sep}{}{sep}",
            Local::now().format("%Y-%m-%d %H:%M:%S,%3f"),
            self.app_name,
            event.metadata().level(),
            sep = FIELD_SEPARATOR,
        )?;

        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                write!(writer, "{}", span.name())?;
                let ext = span.extensions();
                if let Some(fields) = ext.get::<FormattedFields<N>>() {
                    if !fields.is_empty() {
                        write!(writer, "{{{}}}", fields)?;
                    }
                }
                write!(writer, ": ")?;
            }
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// `<dir>/<app>_<YYYY-mm-dd-HH-MM-SS-ffffff>.log`
pub fn log_file_path(dir: &Path, app_name: &str, at: DateTime<Local>) -> PathBuf {
    dir.join(format!("{}_{}.log", app_name, at.format("%Y-%m-%d-%H-%M-%S-%6f")))
}

/// Build the stdout + file subscriber. `RUST_LOG` overrides the default
/// `info` filter. Returns the subscriber and the log file it appends to.
pub fn build_subscriber(app_name: &str, log_dir: &Path) -> Result<(impl Subscriber + Send + Sync + 'static, PathBuf)> {
    let path = log_file_path(log_dir, app_name, Local::now());
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .event_format(PipeDelimited::new(app_name))
                .with_ansi(false)
                .with_writer(std::io::stdout),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .event_format(PipeDelimited::new(app_name))
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        );

    Ok((subscriber, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tracing::{info, info_span};

    #[test]
    fn test_log_file_name() {
        let at = Local.with_ymd_and_hms(2024, 5, 1, 10, 12, 3).unwrap();
        let path = log_file_path(Path::new("/tmp"), "asset-graph", at);

        assert_eq!(path, PathBuf::from("/tmp/asset-graph_2024-05-01-10-12-03-000000.log"));
    }

    #[test]
    fn test_events_are_written_pipe_delimited() {
        let dir = tempfile::tempdir().unwrap();
        let (subscriber, path) = build_subscriber("loader-test", dir.path()).unwrap();

        tracing::subscriber::with_default(subscriber, || {
            let span = info_span!("load", run_id = "abc");
            let _entered = span.enter();
            info!("Creating vertices...");
        });

        let contents = std::fs::read_to_string(&path).unwrap();
        let line = contents.lines().last().expect("one log line");
        let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();

        assert_eq!(fields.len(), 4, "line was {:?}", line);
        assert_eq!(fields[1], "loader-test");
        assert_eq!(fields[2], "INFO");
        assert!(fields[3].starts_with("load{run_id=\"abc\"}: "), "message was {:?}", fields[3]);
        assert!(fields[3].ends_with("Creating vertices..."));
    }
}
