//! Tracing setup.
//!
//! Two layers share one registry:
//! - console output filtered by `RUST_LOG` or `--log-level`, text or JSON,
//!   with the SQL audit target excluded;
//! - the SQL audit file, rotated daily by `tracing-appender`, which admits only
//!   the audit target.

use crate::config::Config;
use crate::db::audit::AUDIT_TARGET;
use crate::error::{DbError, DbResult};
use std::fmt;
use tracing::level_filters::LevelFilter;
use tracing::{Event, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::Targets;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::{ChronoLocal, FormatTime};
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, MakeWriter};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, prelude::*};

const AUDIT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// `2024-05-01 12:00:00 [INFO] message`
struct AuditFormat {
    timer: ChronoLocal,
}

impl AuditFormat {
    fn new() -> Self {
        Self {
            timer: ChronoLocal::new(AUDIT_TIME_FORMAT.to_string()),
        }
    }
}

impl<S, N> FormatEvent<S, N> for AuditFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        self.timer.format_time(&mut writer)?;
        write!(writer, " [{}] ", event.metadata().level())?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Layer writing audit events, and nothing else, to `writer`.
fn audit_layer<S, W>(writer: W) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(writer)
        .event_format(AuditFormat::new())
        .with_filter(Targets::new().with_target(AUDIT_TARGET, LevelFilter::TRACE))
}

/// Filter for console output; the audit target never reaches the console.
fn console_filter(config: &Config) -> DbResult<EnvFilter> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let directive = format!("{}=off", AUDIT_TARGET)
        .parse()
        .map_err(|e| DbError::internal(format!("Invalid log directive: {e}")))?;
    Ok(filter.add_directive(directive))
}

/// Install the global subscriber.
///
/// The returned guard flushes the audit file when dropped; hold it for the
/// life of the process.
pub fn init_tracing(config: &Config) -> DbResult<WorkerGuard> {
    std::fs::create_dir_all(&config.audit_log_dir).map_err(|e| {
        DbError::internal(format!(
            "Failed to create audit log directory '{}': {e}",
            config.audit_log_dir
        ))
    })?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(&config.audit_log_prefix)
        .max_log_files(config.audit_log_retention.max(1))
        .build(&config.audit_log_dir)
        .map_err(|e| DbError::internal(format!("Failed to open audit log: {e}")))?;
    let (audit_writer, guard) = tracing_appender::non_blocking(appender);

    let filter = console_filter(config)?;
    let console = if config.json_logs {
        tracing_subscriber::fmt::layer()
            .json()
            .with_filter(filter)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_filter(filter)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(console)
        .with(audit_layer(audit_writer))
        .try_init()
        .map_err(|e| DbError::internal(format!("Failed to install tracing subscriber: {e}")))?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl io::Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn test_audit_layer_format_and_filter() {
        let buf = SharedBuf::default();
        let writer = buf.clone();
        let subscriber =
            tracing_subscriber::registry().with(audit_layer(move || writer.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: AUDIT_TARGET, "Execution succeeded: SELECT 1");
            tracing::error!(target: AUDIT_TARGET, "Execution failed: SELECT x");
            tracing::info!(target: "db_facade::other", "not audited");
        });

        let out = buf.contents();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2, "{out}");
        assert!(lines[0].ends_with(" [INFO] Execution succeeded: SELECT 1"));
        assert!(lines[1].ends_with(" [ERROR] Execution failed: SELECT x"));
        // YYYY-mm-dd HH:MM:SS
        assert_eq!(lines[0].find(" [INFO]"), Some(19));
    }

    #[test]
    fn test_console_filter_excludes_audit_target() {
        let filter = console_filter(&Config::default()).unwrap();
        assert!(filter.to_string().contains("sql_audit=off"));
    }
}
