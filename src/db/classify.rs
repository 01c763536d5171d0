//! Statement classification for `insert_id`.
//!
//! Uses [sqlparser](https://docs.rs/sqlparser/) to decide whether a compiled
//! statement is an INSERT (or REPLACE) and whether it carries a RETURNING
//! clause. Statements the parser cannot handle fall back to a keyword check.

use crate::models::DatabaseType;
use sqlparser::ast::Statement;
use sqlparser::dialect::{Dialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect};
use sqlparser::parser::Parser;

/// Coarse statement kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// INSERT or REPLACE
    Insert { returning: bool },
    Other,
}

impl StatementKind {
    pub fn is_insert(&self) -> bool {
        matches!(self, Self::Insert { .. })
    }
}

/// Get the appropriate SQL dialect for the given database type.
fn get_dialect(db_type: DatabaseType) -> Box<dyn Dialect> {
    match db_type {
        DatabaseType::PostgreSQL => Box::new(PostgreSqlDialect {}),
        DatabaseType::MySQL => Box::new(MySqlDialect {}),
        DatabaseType::SQLite => Box::new(SQLiteDialect {}),
    }
}

/// Classify a single compiled statement.
pub fn classify(sql: &str, db_type: DatabaseType) -> StatementKind {
    let dialect = get_dialect(db_type);
    match Parser::parse_sql(dialect.as_ref(), sql) {
        Ok(statements) if statements.len() == 1 => match &statements[0] {
            Statement::Insert(insert) => StatementKind::Insert {
                returning: insert.returning.is_some(),
            },
            _ => StatementKind::Other,
        },
        Ok(_) => StatementKind::Other,
        Err(e) => {
            tracing::debug!(error = %e, "statement not parsed, classifying by keyword");
            classify_by_keyword(sql)
        }
    }
}

fn classify_by_keyword(sql: &str) -> StatementKind {
    let upper = sql.to_uppercase();
    let mut words = upper
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty());
    match words.next() {
        Some("INSERT") | Some("REPLACE") => StatementKind::Insert {
            returning: words.any(|w| w == "RETURNING"),
        },
        _ => StatementKind::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_mysql() {
        assert_eq!(
            classify(
                "INSERT INTO users (name, age) VALUES (?, ?)",
                DatabaseType::MySQL
            ),
            StatementKind::Insert { returning: false }
        );
    }

    #[test]
    fn test_replace_is_insert() {
        assert!(classify("REPLACE INTO users (id, name) VALUES (?, ?)", DatabaseType::MySQL).is_insert());
    }

    #[test]
    fn test_insert_returning_postgres() {
        assert_eq!(
            classify(
                "INSERT INTO users (name) VALUES ($1) RETURNING id",
                DatabaseType::PostgreSQL
            ),
            StatementKind::Insert { returning: true }
        );
    }

    #[test]
    fn test_non_insert() {
        assert_eq!(
            classify("UPDATE users SET name = ? WHERE id = ?", DatabaseType::MySQL),
            StatementKind::Other
        );
        assert_eq!(
            classify("SELECT * FROM users", DatabaseType::SQLite),
            StatementKind::Other
        );
    }

    #[test]
    fn test_insert_select_is_insert() {
        assert!(classify(
            "INSERT INTO archive SELECT * FROM users WHERE id = ?",
            DatabaseType::SQLite
        )
        .is_insert());
    }

    #[test]
    fn test_keyword_fallback() {
        assert_eq!(
            classify_by_keyword("  insert into t values (1) returning id"),
            StatementKind::Insert { returning: true }
        );
        assert_eq!(classify_by_keyword("DELETE FROM t"), StatementKind::Other);
        assert_eq!(classify_by_keyword(""), StatementKind::Other);
    }
}
