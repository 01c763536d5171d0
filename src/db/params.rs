//! Parameter binding utilities for database queries.
//!
//! This module binds compiled `QueryParam` values to database-specific query
//! objects. Values always travel as driver parameters. List values are expanded
//! by [`Template::compile`](crate::db::statement::Template::compile) and must
//! not reach this point.

use crate::error::{DbError, DbResult};
use crate::models::QueryParam;
use sqlx::mysql::MySqlArguments;
use sqlx::postgres::PgArguments;
use sqlx::sqlite::SqliteArguments;
use sqlx::{MySql, Postgres, Sqlite};

type MySqlQuery<'q> = sqlx::query::Query<'q, MySql, MySqlArguments>;
type PgQuery<'q> = sqlx::query::Query<'q, Postgres, PgArguments>;
type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

fn unexpanded_list() -> DbError {
    DbError::internal("list parameter reached the driver without expansion")
}

/// Bind a parameter to a MySQL query.
pub(crate) fn bind_mysql_param<'q>(
    query: MySqlQuery<'q>,
    param: &'q QueryParam,
) -> DbResult<MySqlQuery<'q>> {
    Ok(match param {
        QueryParam::Null => query.bind(None::<String>),
        QueryParam::Bool(v) => query.bind(*v),
        QueryParam::Int(v) => query.bind(*v),
        QueryParam::Float(v) => query.bind(*v),
        QueryParam::String(v) => query.bind(v.as_str()),
        QueryParam::Bytes(v) => query.bind(v.as_slice()),
        QueryParam::List(_) => return Err(unexpanded_list()),
    })
}

/// Bind a parameter to a PostgreSQL query.
pub(crate) fn bind_postgres_param<'q>(
    query: PgQuery<'q>,
    param: &'q QueryParam,
) -> DbResult<PgQuery<'q>> {
    Ok(match param {
        QueryParam::Null => query.bind(None::<String>),
        QueryParam::Bool(v) => query.bind(*v),
        QueryParam::Int(v) => query.bind(*v),
        QueryParam::Float(v) => query.bind(*v),
        QueryParam::String(v) => query.bind(v.as_str()),
        QueryParam::Bytes(v) => query.bind(v.as_slice()),
        QueryParam::List(_) => return Err(unexpanded_list()),
    })
}

/// Bind a parameter to a SQLite query.
pub(crate) fn bind_sqlite_param<'q>(
    query: SqliteQuery<'q>,
    param: &'q QueryParam,
) -> DbResult<SqliteQuery<'q>> {
    Ok(match param {
        QueryParam::Null => query.bind(None::<String>),
        QueryParam::Bool(v) => query.bind(*v),
        QueryParam::Int(v) => query.bind(*v),
        QueryParam::Float(v) => query.bind(*v),
        QueryParam::String(v) => query.bind(v.as_str()),
        QueryParam::Bytes(v) => query.bind(v.as_slice()),
        QueryParam::List(_) => return Err(unexpanded_list()),
    })
}

pub(crate) fn bind_mysql<'q>(sql: &'q str, binds: &'q [QueryParam]) -> DbResult<MySqlQuery<'q>> {
    binds
        .iter()
        .try_fold(sqlx::query::<MySql>(sql), bind_mysql_param)
}

pub(crate) fn bind_postgres<'q>(sql: &'q str, binds: &'q [QueryParam]) -> DbResult<PgQuery<'q>> {
    binds
        .iter()
        .try_fold(sqlx::query::<Postgres>(sql), bind_postgres_param)
}

pub(crate) fn bind_sqlite<'q>(sql: &'q str, binds: &'q [QueryParam]) -> DbResult<SqliteQuery<'q>> {
    binds
        .iter()
        .try_fold(sqlx::query::<Sqlite>(sql), bind_sqlite_param)
}
