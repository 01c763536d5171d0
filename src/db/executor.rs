//! Statement execution engine.
//!
//! Every operation compiles its template, acquires one [`Session`], binds all
//! values as driver parameters and shapes the result. Writes commit before
//! returning; reads roll back. Each attempt is written to the audit log.
//!
//! # Architecture
//!
//! The executor uses database-specific implementations organized in submodules:
//! - `mysql`: MySQL-specific execution
//! - `postgres`: PostgreSQL-specific execution
//! - `sqlite`: SQLite-specific execution
//!
//! Each submodule provides identical functionality adapted to the database's type system.

use crate::db::audit::AuditLogger;
use crate::db::classify::{StatementKind, classify};
use crate::db::pool::{ConnectionProvider, PoolStatus, Session};
use crate::db::statement::{CompiledStatement, Template};
use crate::db::types::RowToJson;
use crate::error::{DbError, DbResult};
use crate::impl_db_dispatch;
use crate::models::{ConnectionConfig, DatabaseType, Params, QueryParam, Row};
use serde_json::Value as JsonValue;
use std::time::Instant;
use tracing::{debug, error};

/// How a statement's result is shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    AllRows,
    FirstRow,
    FirstValue,
    RowCount,
    InsertId,
}

impl Shape {
    fn is_write(self) -> bool {
        matches!(self, Shape::RowCount | Shape::InsertId)
    }
}

enum Outcome {
    Rows(Vec<Row>),
    Row(Option<Row>),
    Value(Option<JsonValue>),
    Count(u64),
    Id(i64),
}

fn shape_mismatch() -> DbError {
    DbError::internal("statement result did not match the requested shape")
}

impl Outcome {
    fn into_rows(self) -> DbResult<Vec<Row>> {
        match self {
            Outcome::Rows(rows) => Ok(rows),
            _ => Err(shape_mismatch()),
        }
    }

    fn into_row(self) -> DbResult<Option<Row>> {
        match self {
            Outcome::Row(row) => Ok(row),
            _ => Err(shape_mismatch()),
        }
    }

    fn into_value(self) -> DbResult<Option<JsonValue>> {
        match self {
            Outcome::Value(value) => Ok(value),
            _ => Err(shape_mismatch()),
        }
    }

    fn into_count(self) -> DbResult<u64> {
        match self {
            Outcome::Count(count) => Ok(count),
            _ => Err(shape_mismatch()),
        }
    }

    fn into_id(self) -> DbResult<i64> {
        match self {
            Outcome::Id(id) => Ok(id),
            _ => Err(shape_mismatch()),
        }
    }
}

/// Executes named-parameter statements against one connection pool.
#[derive(Debug)]
pub struct StatementExecutor {
    provider: ConnectionProvider,
    audit: AuditLogger,
}

impl StatementExecutor {
    pub fn new(provider: ConnectionProvider, audit: AuditLogger) -> Self {
        Self { provider, audit }
    }

    /// Connect a pool and wrap it.
    pub async fn connect(config: &ConnectionConfig, audit: AuditLogger) -> DbResult<Self> {
        let provider = ConnectionProvider::connect(config).await?;
        Ok(Self::new(provider, audit))
    }

    pub fn db_type(&self) -> DatabaseType {
        self.provider.db_type()
    }

    pub fn pool_status(&self) -> PoolStatus {
        self.provider.status()
    }

    pub fn provider(&self) -> &ConnectionProvider {
        &self.provider
    }

    pub async fn close(&self) {
        self.provider.close().await;
    }

    /// All rows, in driver order.
    pub async fn query(&self, sql: &str, params: &Params) -> DbResult<Vec<Row>> {
        self.run("query", sql, params, Shape::AllRows)
            .await?
            .into_rows()
    }

    /// First row, or `None` when the statement returns no rows.
    pub async fn get_row(&self, sql: &str, params: &Params) -> DbResult<Option<Row>> {
        self.run("get_row", sql, params, Shape::FirstRow)
            .await?
            .into_row()
    }

    /// First column of the first row.
    ///
    /// `None` means no row; `Some(JsonValue::Null)` means the value was SQL NULL.
    pub async fn get_var(&self, sql: &str, params: &Params) -> DbResult<Option<JsonValue>> {
        self.run("get_var", sql, params, Shape::FirstValue)
            .await?
            .into_value()
    }

    /// Run a write and commit. Returns the affected-row count.
    pub async fn execute(&self, sql: &str, params: &Params) -> DbResult<u64> {
        self.run("execute", sql, params, Shape::RowCount)
            .await?
            .into_count()
    }

    /// Run an INSERT and commit. Returns the generated id.
    ///
    /// PostgreSQL statements must end in `RETURNING <id column>`.
    pub async fn insert_id(&self, sql: &str, params: &Params) -> DbResult<i64> {
        self.run("insert_id", sql, params, Shape::InsertId)
            .await?
            .into_id()
    }

    /// Run one statement per parameter set in a single transaction.
    ///
    /// Returns the summed affected-row count. Any failure rolls back the whole
    /// batch. An empty batch returns 0 without touching the pool.
    pub async fn executemany(&self, sql: &str, param_sets: &[Params]) -> DbResult<u64> {
        if param_sets.is_empty() {
            return Ok(0);
        }
        let db_type = self.db_type();
        let template = Template::parse(sql, db_type);
        let start = Instant::now();

        debug!(sql = %sql, batch = param_sets.len(), "Executing executemany");
        let result = self.run_batch(&template, param_sets, db_type).await;

        match &result {
            Ok(count) => {
                debug!(
                    rows_affected = count,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "executemany committed"
                );
                for params in param_sets {
                    self.audit.success("executemany", &template, params, db_type);
                }
            }
            Err(e) => {
                for params in param_sets {
                    self.audit.failure("executemany", &template, params, db_type, e);
                }
                error!(operation = "executemany", error = %e, "Statement failed");
            }
        }
        result
    }

    /// Rows matching an IN-list.
    ///
    /// `values` is bound under `param_name`, which the statement uses as
    /// `IN :param_name`. `other_conditions` supplies the remaining placeholders
    /// and must not contain `param_name`.
    pub async fn query_in(
        &self,
        sql: &str,
        param_name: &str,
        values: Vec<QueryParam>,
        other_conditions: Option<Params>,
    ) -> DbResult<Vec<Row>> {
        let mut params = other_conditions.unwrap_or_default();
        if params.contains_key(param_name) {
            let e = DbError::validation(format!(
                "parameter '{}' is given both as the IN list and in other_conditions",
                param_name
            ));
            let db_type = self.db_type();
            self.audit
                .failure("query_in", &Template::parse(sql, db_type), &params, db_type, &e);
            error!(operation = "query_in", error = %e, "Statement failed");
            return Err(e);
        }
        params.insert(param_name.to_string(), QueryParam::List(values));

        self.run("query_in", sql, &params, Shape::AllRows)
            .await?
            .into_rows()
    }

    async fn run(
        &self,
        operation: &'static str,
        sql: &str,
        params: &Params,
        shape: Shape,
    ) -> DbResult<Outcome> {
        let db_type = self.db_type();
        let template = Template::parse(sql, db_type);
        let start = Instant::now();

        debug!(sql = %sql, params = params.len(), "Executing {}", operation);
        let result = self.run_once(&template, params, db_type, shape).await;

        match &result {
            Ok(_) => {
                debug!(
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "{} completed", operation
                );
                self.audit.success(operation, &template, params, db_type);
            }
            Err(e) => {
                self.audit.failure(operation, &template, params, db_type, e);
                error!(operation = operation, error = %e, "Statement failed");
            }
        }
        result
    }

    async fn run_once(
        &self,
        template: &Template,
        params: &Params,
        db_type: DatabaseType,
        shape: Shape,
    ) -> DbResult<Outcome> {
        let stmt = template.compile(params, db_type)?;
        if shape == Shape::InsertId {
            check_insert(&stmt, db_type)?;
        }

        // On error the session is dropped, which rolls it back.
        let mut session = self.provider.acquire().await?;
        let outcome = run_statement(&mut session, &stmt, shape).await?;
        if shape.is_write() {
            session.commit().await?;
        } else {
            session.close().await;
        }
        Ok(outcome)
    }

    async fn run_batch(
        &self,
        template: &Template,
        param_sets: &[Params],
        db_type: DatabaseType,
    ) -> DbResult<u64> {
        let statements = param_sets
            .iter()
            .map(|params| template.compile(params, db_type))
            .collect::<DbResult<Vec<_>>>()?;

        let mut session = self.provider.acquire().await?;
        let mut total = 0;
        for stmt in &statements {
            total += run_statement(&mut session, stmt, Shape::RowCount)
                .await?
                .into_count()?;
        }
        session.commit().await?;
        Ok(total)
    }
}

fn check_insert(stmt: &CompiledStatement, db_type: DatabaseType) -> DbResult<()> {
    match classify(&stmt.sql, db_type) {
        StatementKind::Other => Err(DbError::validation(
            "insert_id requires an INSERT or REPLACE statement",
        )),
        StatementKind::Insert { returning: false } if db_type == DatabaseType::PostgreSQL => {
            Err(DbError::validation(
                "PostgreSQL has no last-insert-id; add RETURNING <id column> to the INSERT",
            ))
        }
        StatementKind::Insert { .. } => Ok(()),
    }
}

async fn run_statement(
    session: &mut Session,
    stmt: &CompiledStatement,
    shape: Shape,
) -> DbResult<Outcome> {
    impl_db_dispatch!(Session, session, {
        MySql(tx) => mysql::run(&mut **tx, stmt, shape).await,
        Postgres(tx) => postgres::run(&mut **tx, stmt, shape).await,
        SQLite(tx) => sqlite::run(&mut **tx, stmt, shape).await,
    })
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================
//
// Each module below provides the same interface adapted to its database type.
// The code structure is intentionally parallel to make differences obvious.

mod mysql {
    use super::*;
    use crate::db::params::bind_mysql;
    use sqlx::MySqlConnection;

    pub async fn run(
        conn: &mut MySqlConnection,
        stmt: &CompiledStatement,
        shape: Shape,
    ) -> DbResult<Outcome> {
        let query = bind_mysql(&stmt.sql, &stmt.binds)?;
        Ok(match shape {
            Shape::AllRows => {
                let rows = query.fetch_all(conn).await?;
                Outcome::Rows(rows.iter().map(RowToJson::to_json_map).collect())
            }
            Shape::FirstRow => {
                Outcome::Row(query.fetch_optional(conn).await?.map(|r| r.to_json_map()))
            }
            Shape::FirstValue => {
                Outcome::Value(query.fetch_optional(conn).await?.map(|r| r.value_at(0)))
            }
            Shape::RowCount => Outcome::Count(query.execute(conn).await?.rows_affected()),
            Shape::InsertId => {
                let id = query.execute(conn).await?.last_insert_id();
                Outcome::Id(i64::try_from(id).map_err(|_| {
                    DbError::statement(
                        format!("Inserted id {} does not fit in i64", id),
                        None,
                        "Read the id with a query instead",
                    )
                })?)
            }
        })
    }
}

mod postgres {
    use super::*;
    use crate::db::params::bind_postgres;
    use sqlx::{PgConnection, Row as _};

    pub async fn run(
        conn: &mut PgConnection,
        stmt: &CompiledStatement,
        shape: Shape,
    ) -> DbResult<Outcome> {
        let query = bind_postgres(&stmt.sql, &stmt.binds)?;
        Ok(match shape {
            Shape::AllRows => {
                let rows = query.fetch_all(conn).await?;
                Outcome::Rows(rows.iter().map(RowToJson::to_json_map).collect())
            }
            Shape::FirstRow => {
                Outcome::Row(query.fetch_optional(conn).await?.map(|r| r.to_json_map()))
            }
            Shape::FirstValue => {
                Outcome::Value(query.fetch_optional(conn).await?.map(|r| r.value_at(0)))
            }
            Shape::RowCount => Outcome::Count(query.execute(conn).await?.rows_affected()),
            Shape::InsertId => {
                // RETURNING is enforced before the session is acquired.
                let row = query.fetch_one(conn).await?;
                let id = row
                    .try_get::<i64, _>(0)
                    .or_else(|_| row.try_get::<i32, _>(0).map(i64::from))?;
                Outcome::Id(id)
            }
        })
    }
}

mod sqlite {
    use super::*;
    use crate::db::params::bind_sqlite;
    use sqlx::SqliteConnection;

    pub async fn run(
        conn: &mut SqliteConnection,
        stmt: &CompiledStatement,
        shape: Shape,
    ) -> DbResult<Outcome> {
        let query = bind_sqlite(&stmt.sql, &stmt.binds)?;
        Ok(match shape {
            Shape::AllRows => {
                let rows = query.fetch_all(conn).await?;
                Outcome::Rows(rows.iter().map(RowToJson::to_json_map).collect())
            }
            Shape::FirstRow => {
                Outcome::Row(query.fetch_optional(conn).await?.map(|r| r.to_json_map()))
            }
            Shape::FirstValue => {
                Outcome::Value(query.fetch_optional(conn).await?.map(|r| r.value_at(0)))
            }
            Shape::RowCount => Outcome::Count(query.execute(conn).await?.rows_affected()),
            Shape::InsertId => Outcome::Id(query.execute(conn).await?.last_insert_rowid()),
        })
    }
}
