//! The public data-access facade.
//!
//! One implementation, two calling conventions. [`Facade`] is generic over an
//! [`ExecutionMode`] that turns the async core future into what the caller
//! expects:
//!
//! - [`Suspending`] returns boxed futures for async callers ([`AsyncFacade`]).
//! - [`Blocking`] drives a private Tokio runtime and returns plain results
//!   ([`BlockingFacade`]).

use crate::db::audit::AuditLogger;
use crate::db::executor::StatementExecutor;
use crate::db::pool::PoolStatus;
use crate::error::{DbError, DbResult};
use crate::models::{ConnectionConfig, DatabaseType, PageSpec, Params, QueryParam, Row};
use futures_util::future::BoxFuture;
use serde_json::Value as JsonValue;
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::{Handle, Runtime};
use tracing::debug;

/// Turns a core future into the caller's calling convention.
pub trait ExecutionMode: Send + Sync {
    type Output<'a, T: Send + 'a>
    where
        Self: 'a;

    fn run<'a, T, F>(&'a self, fut: F) -> Self::Output<'a, T>
    where
        T: Send + 'a,
        F: Future<Output = DbResult<T>> + Send + 'a;
}

/// Async calling convention.
#[derive(Debug, Default, Clone, Copy)]
pub struct Suspending;

impl ExecutionMode for Suspending {
    type Output<'a, T: Send + 'a> = BoxFuture<'a, DbResult<T>>;

    fn run<'a, T, F>(&'a self, fut: F) -> Self::Output<'a, T>
    where
        T: Send + 'a,
        F: Future<Output = DbResult<T>> + Send + 'a,
    {
        Box::pin(fut)
    }
}

/// Blocking calling convention backed by a dedicated runtime.
///
/// The pool is created on this runtime, so every call must run here too.
/// Calls made from inside another runtime are moved to a scoped thread so
/// that runtime is never blocked on re-entry.
#[derive(Debug)]
pub struct Blocking {
    runtime: Option<Runtime>,
}

impl Blocking {
    pub fn new() -> DbResult<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("db-facade-blocking")
            .build()
            .map_err(|e| DbError::internal(format!("Failed to create runtime: {e}")))?;
        Ok(Self {
            runtime: Some(runtime),
        })
    }
}

impl ExecutionMode for Blocking {
    type Output<'a, T: Send + 'a> = DbResult<T>;

    fn run<'a, T, F>(&'a self, fut: F) -> Self::Output<'a, T>
    where
        T: Send + 'a,
        F: Future<Output = DbResult<T>> + Send + 'a,
    {
        let runtime = self
            .runtime
            .as_ref()
            .ok_or_else(|| DbError::internal("Blocking runtime has been shut down"))?;

        if Handle::try_current().is_ok() {
            std::thread::scope(|s| match s.spawn(|| runtime.block_on(fut)).join() {
                Ok(result) => result,
                Err(_) => Err(DbError::internal("Blocking call panicked")),
            })
        } else {
            runtime.block_on(fut)
        }
    }
}

impl Drop for Blocking {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

/// Data-access facade over one pool.
pub struct Facade<M: ExecutionMode> {
    executor: Arc<StatementExecutor>,
    mode: M,
}

pub type AsyncFacade = Facade<Suspending>;
pub type BlockingFacade = Facade<Blocking>;

impl Facade<Suspending> {
    /// Connect a pool on the current runtime.
    pub async fn connect(config: &ConnectionConfig, audit: AuditLogger) -> DbResult<Self> {
        let executor = StatementExecutor::connect(config, audit).await?;
        Ok(Self::new(Arc::new(executor)))
    }

    pub fn new(executor: Arc<StatementExecutor>) -> Self {
        Self {
            executor,
            mode: Suspending,
        }
    }
}

impl Facade<Blocking> {
    /// Start a private runtime and connect a pool on it.
    pub fn connect(config: &ConnectionConfig, audit: AuditLogger) -> DbResult<Self> {
        let mode = Blocking::new()?;
        let executor = mode.run(StatementExecutor::connect(config, audit))?;
        debug!("Blocking facade ready");
        Ok(Self {
            executor: Arc::new(executor),
            mode,
        })
    }
}

impl<M: ExecutionMode> Facade<M> {
    /// All rows of a read.
    pub fn query<'a>(&'a self, sql: &'a str, params: &'a Params) -> M::Output<'a, Vec<Row>> {
        self.mode.run(self.executor.query(sql, params))
    }

    /// First row, or `None`.
    pub fn get_row<'a>(
        &'a self,
        sql: &'a str,
        params: &'a Params,
    ) -> M::Output<'a, Option<Row>> {
        self.mode.run(self.executor.get_row(sql, params))
    }

    /// First column of the first row; `None` when there is no row.
    pub fn get_var<'a>(
        &'a self,
        sql: &'a str,
        params: &'a Params,
    ) -> M::Output<'a, Option<JsonValue>> {
        self.mode.run(self.executor.get_var(sql, params))
    }

    /// Affected-row count of a committed write.
    pub fn execute<'a>(&'a self, sql: &'a str, params: &'a Params) -> M::Output<'a, u64> {
        self.mode.run(self.executor.execute(sql, params))
    }

    /// Summed affected-row count of a batch committed as one transaction.
    pub fn executemany<'a>(
        &'a self,
        sql: &'a str,
        param_sets: &'a [Params],
    ) -> M::Output<'a, u64> {
        self.mode.run(self.executor.executemany(sql, param_sets))
    }

    /// Generated id of a committed INSERT.
    pub fn insert_id<'a>(&'a self, sql: &'a str, params: &'a Params) -> M::Output<'a, i64> {
        self.mode.run(self.executor.insert_id(sql, params))
    }

    /// Rows where `param_name` is in `values`.
    pub fn query_in<'a>(
        &'a self,
        sql: &'a str,
        param_name: &'a str,
        values: Vec<QueryParam>,
        other_conditions: Option<Params>,
    ) -> M::Output<'a, Vec<Row>> {
        self.mode.run(
            self.executor
                .query_in(sql, param_name, values, other_conditions),
        )
    }

    /// Limit and offset for a 1-based page.
    pub fn page_and_size(&self, page: i64, page_size: i64) -> DbResult<PageSpec> {
        PageSpec::new(page, page_size)
    }

    /// Close the pool.
    pub fn close(&self) -> M::Output<'_, ()> {
        self.mode.run(async move {
            self.executor.close().await;
            Ok(())
        })
    }

    pub fn db_type(&self) -> DatabaseType {
        self.executor.db_type()
    }

    pub fn pool_status(&self) -> PoolStatus {
        self.executor.pool_status()
    }

    pub fn executor(&self) -> &Arc<StatementExecutor> {
        &self.executor
    }
}

impl<M: ExecutionMode> std::fmt::Debug for Facade<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Facade")
            .field("db_type", &self.db_type())
            .field("pool", &self.pool_status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_suspending_passes_result_through() {
        let mode = Suspending;
        assert_eq!(mode.run(async { Ok(5) }).await.unwrap(), 5);
        let err = mode
            .run(async { Err::<(), _>(DbError::validation("bad")) })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Validation { .. }));
    }

    #[test]
    fn test_blocking_outside_runtime() {
        let mode = Blocking::new().unwrap();
        let value = mode
            .run(async {
                tokio::time::sleep(std::time::Duration::from_millis(1)).await;
                Ok("done")
            })
            .unwrap();
        assert_eq!(value, "done");
    }

    #[tokio::test]
    async fn test_blocking_inside_runtime_does_not_reenter() {
        let mode = Blocking::new().unwrap();
        let value = mode.run(async { Ok(42) }).unwrap();
        assert_eq!(value, 42);
    }
}
