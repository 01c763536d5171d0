//! SQL audit trail.
//!
//! Every execution attempt produces one [`AuditEntry`] per parameter set. The
//! rendered statement carries literal values and is for reading only.
//! Recording is best-effort: sinks never fail the operation they describe.

use crate::db::statement::Template;
use crate::models::{DatabaseType, Params, format_params};
use std::sync::{Arc, Mutex};

/// Tracing target that the logging setup routes to the audit file.
pub const AUDIT_TARGET: &str = "sql_audit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditOutcome {
    Success,
    Failure,
}

/// One recorded execution attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub outcome: AuditOutcome,
    /// Facade operation name, e.g. `execute`.
    pub operation: &'static str,
    /// Statement as the caller wrote it.
    pub statement: String,
    pub params: Params,
    /// Statement with literal values substituted.
    pub rendered: String,
    pub error: Option<String>,
}

impl AuditEntry {
    pub fn is_success(&self) -> bool {
        self.outcome == AuditOutcome::Success
    }

    /// The audit line, without timestamp or level.
    pub fn message(&self) -> String {
        let verb = match self.outcome {
            AuditOutcome::Success => "Execution succeeded",
            AuditOutcome::Failure => "Execution failed",
        };
        format!(
            "{}: {} | params: {} | rendered: {}",
            verb,
            self.statement,
            format_params(&self.params),
            self.rendered
        )
    }
}

/// Destination for audit entries.
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: &AuditEntry);
}

/// Emits entries as tracing events on [`AUDIT_TARGET`].
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn record(&self, entry: &AuditEntry) {
        match entry.outcome {
            AuditOutcome::Success => tracing::info!(target: AUDIT_TARGET, "{}", entry.message()),
            AuditOutcome::Failure => {
                tracing::error!(target: AUDIT_TARGET, "{}", entry.message());
                if let Some(error) = &entry.error {
                    tracing::error!(target: AUDIT_TARGET, "Error in {}: {}", entry.operation, error);
                }
            }
        }
    }
}

/// Keeps entries in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}

impl AuditSink for MemorySink {
    fn record(&self, entry: &AuditEntry) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(entry.clone());
    }
}

/// Renders statements and hands entries to a sink.
#[derive(Clone)]
pub struct AuditLogger {
    sink: Arc<dyn AuditSink>,
}

impl AuditLogger {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    /// Logger writing through [`TracingSink`].
    pub fn tracing() -> Self {
        Self::new(Arc::new(TracingSink))
    }

    pub fn success(
        &self,
        operation: &'static str,
        template: &Template,
        params: &Params,
        db_type: DatabaseType,
    ) {
        self.record(operation, template, params, db_type, None);
    }

    pub fn failure(
        &self,
        operation: &'static str,
        template: &Template,
        params: &Params,
        db_type: DatabaseType,
        error: &dyn std::fmt::Display,
    ) {
        self.record(operation, template, params, db_type, Some(error.to_string()));
    }

    fn record(
        &self,
        operation: &'static str,
        template: &Template,
        params: &Params,
        db_type: DatabaseType,
        error: Option<String>,
    ) {
        let entry = AuditEntry {
            outcome: if error.is_none() {
                AuditOutcome::Success
            } else {
                AuditOutcome::Failure
            },
            operation,
            statement: template.source().to_string(),
            params: params.clone(),
            rendered: template.render_literal(params, db_type),
            error,
        };
        self.sink.record(&entry);
    }
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::tracing()
    }
}

impl std::fmt::Debug for AuditLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLogger").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params;

    #[test]
    fn test_success_entry() {
        let sink = Arc::new(MemorySink::new());
        let logger = AuditLogger::new(sink.clone());
        let template = Template::parse("SELECT * FROM users WHERE id = :id", DatabaseType::MySQL);

        logger.success("query", &template, &params! { "id" => 98 }, DatabaseType::MySQL);

        let entries = sink.entries();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].is_success());
        assert_eq!(
            entries[0].message(),
            "Execution succeeded: SELECT * FROM users WHERE id = :id | params: {'id': 98} | rendered: SELECT * FROM users WHERE id = 98"
        );
    }

    #[test]
    fn test_failure_entry_keeps_error() {
        let sink = Arc::new(MemorySink::new());
        let logger = AuditLogger::new(sink.clone());
        let template = Template::parse("UPDATE users SET name = :name", DatabaseType::SQLite);

        logger.failure(
            "execute",
            &template,
            &params! { "name" => "x" },
            DatabaseType::SQLite,
            &"no such table: users",
        );

        let entries = sink.entries();
        assert_eq!(entries[0].outcome, AuditOutcome::Failure);
        assert_eq!(entries[0].operation, "execute");
        assert_eq!(entries[0].error.as_deref(), Some("no such table: users"));
        assert!(entries[0].message().starts_with("Execution failed: UPDATE users"));
        assert!(entries[0].rendered.ends_with("name = 'x'"));

        sink.clear();
        assert!(sink.entries().is_empty());
    }
}
