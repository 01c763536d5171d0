//! Database access layer.
//!
//! - Named-placeholder templates and literal rendering (`statement`)
//! - Connection pools and per-call transactional sessions (`pool`)
//! - Statement execution with audit logging (`executor`, `audit`)
//! - The async and blocking facades over the executor (`facade`)
//! - Row decoding into JSON values (`types`)
//! - Per-driver dispatch macros (`macros`)

pub mod audit;
pub mod classify;
pub mod executor;
pub mod facade;
#[macro_use]
pub mod macros;
pub mod params;
pub mod pool;
pub mod statement;
pub mod types;

pub use audit::{AUDIT_TARGET, AuditEntry, AuditLogger, AuditOutcome, AuditSink, MemorySink, TracingSink};
pub use classify::{StatementKind, classify};
pub use executor::StatementExecutor;
pub use facade::{AsyncFacade, Blocking, BlockingFacade, ExecutionMode, Facade, Suspending};
pub use pool::{ConnectionProvider, DbPool, PoolStatus, Session};
pub use statement::{CompiledStatement, Template};
