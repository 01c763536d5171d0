//! Named-placeholder statement templates.
//!
//! SQL text is written with `:name` placeholders. A [`Template`] scans the text
//! once, then either compiles it into driver placeholders plus an ordered bind
//! list for execution, or renders it with literal values for the audit log.
//! Literal rendering is never sent to the database.

use crate::error::{DbError, DbResult};
use crate::models::{DatabaseType, Params, QueryParam};

/// A parsed statement with `:name` placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Text(String),
    Param(String),
}

/// Statement text with driver placeholders and the values to bind, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledStatement {
    pub sql: String,
    pub binds: Vec<QueryParam>,
}

impl Template {
    /// Scan `sql` for placeholders.
    ///
    /// A placeholder is `:` followed by `[A-Za-z_][A-Za-z0-9_]*`. It is not
    /// recognized inside quoted strings or identifiers, comments or dollar-quoted
    /// bodies, after a word character, `:` or `\`, nor as part of a `::` cast.
    /// `\:` produces a literal colon.
    ///
    /// MySQL also treats `#` as a line comment and `\` as an escape inside
    /// quoted strings.
    pub fn parse(sql: &str, db_type: DatabaseType) -> Self {
        let mysql = db_type == DatabaseType::MySQL;
        let bytes = sql.as_bytes();
        let mut segments = Vec::new();
        let mut text = String::new();
        let mut text_start = 0;
        let mut state = State::Normal;
        let mut idx = 0;

        while idx < bytes.len() {
            let b = bytes[idx];
            match state {
                State::Normal => match b {
                    b'\'' => state = State::Quoted(b'\''),
                    b'"' => state = State::Quoted(b'"'),
                    b'`' => state = State::Quoted(b'`'),
                    b'#' if mysql => state = State::LineComment,
                    b'-' if bytes.get(idx + 1) == Some(&b'-') => {
                        state = State::LineComment;
                        idx += 1;
                    }
                    b'/' if bytes.get(idx + 1) == Some(&b'*') => {
                        state = State::BlockComment(1);
                        idx += 1;
                    }
                    b'$' => {
                        if let Some((tag, advance)) = try_start_dollar_quote(bytes, idx) {
                            state = State::DollarQuoted(tag);
                            idx = advance;
                        }
                    }
                    b'\\' if bytes.get(idx + 1) == Some(&b':') => {
                        text.push_str(&sql[text_start..idx]);
                        // keep the colon, drop the backslash
                        text_start = idx + 1;
                        idx += 1;
                    }
                    b':' if bytes.get(idx + 1) == Some(&b':') => {
                        idx += 1;
                    }
                    b':' if !follows_word(bytes, idx) => {
                        if let Some(end) = scan_name(bytes, idx + 1) {
                            text.push_str(&sql[text_start..idx]);
                            if !text.is_empty() {
                                segments.push(Segment::Text(std::mem::take(&mut text)));
                            }
                            segments.push(Segment::Param(sql[idx + 1..end].to_string()));
                            text_start = end;
                            idx = end;
                            continue;
                        }
                    }
                    _ => {}
                },
                State::Quoted(quote) => {
                    if mysql && quote != b'`' && b == b'\\' {
                        idx += 1; // escaped byte
                    } else if b == quote {
                        if bytes.get(idx + 1) == Some(&quote) {
                            idx += 1; // doubled quote
                        } else {
                            state = State::Normal;
                        }
                    }
                }
                State::LineComment => {
                    if b == b'\n' {
                        state = State::Normal;
                    }
                }
                State::BlockComment(depth) => {
                    if b == b'/' && bytes.get(idx + 1) == Some(&b'*') {
                        state = State::BlockComment(depth + 1);
                        idx += 1;
                    } else if b == b'*' && bytes.get(idx + 1) == Some(&b'/') {
                        state = if depth == 1 {
                            State::Normal
                        } else {
                            State::BlockComment(depth - 1)
                        };
                        idx += 1;
                    }
                }
                State::DollarQuoted(ref tag) => {
                    if b == b'$' && matches_tag(bytes, idx, tag) {
                        idx += tag.len() + 1;
                        state = State::Normal;
                    }
                }
            }
            idx += 1;
        }

        text.push_str(&sql[text_start.min(sql.len())..]);
        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }

        Self {
            source: sql.to_string(),
            segments,
        }
    }

    /// The statement as written.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Placeholder names in order of appearance (repeats included).
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Text(_) => None,
        })
    }

    /// Produce driver SQL and the ordered bind list.
    ///
    /// Every placeholder needs an entry in `params`; extra entries are ignored.
    /// A `List` value expands to `(?, ?, ...)`, or `(NULL)` when empty.
    pub fn compile(&self, params: &Params, db_type: DatabaseType) -> DbResult<CompiledStatement> {
        let numbered = db_type.numbered_placeholders();
        let mut sql = String::with_capacity(self.source.len());
        let mut binds = Vec::new();

        let mut push_bind = |sql: &mut String, value: &QueryParam| {
            binds.push(value.clone());
            if numbered {
                sql.push('$');
                sql.push_str(&binds.len().to_string());
            } else {
                sql.push('?');
            }
        };

        for segment in &self.segments {
            match segment {
                Segment::Text(text) => sql.push_str(text),
                Segment::Param(name) => {
                    let value = params.get(name).ok_or_else(|| DbError::missing_param(name))?;
                    match value {
                        QueryParam::List(items) if items.is_empty() => sql.push_str("(NULL)"),
                        QueryParam::List(items) => {
                            sql.push('(');
                            for (i, item) in items.iter().enumerate() {
                                if matches!(item, QueryParam::List(_)) {
                                    return Err(DbError::validation(format!(
                                        "parameter '{}' contains a nested list",
                                        name
                                    )));
                                }
                                if i > 0 {
                                    sql.push_str(", ");
                                }
                                push_bind(&mut sql, item);
                            }
                            sql.push(')');
                        }
                        other => push_bind(&mut sql, other),
                    }
                }
            }
        }

        Ok(CompiledStatement { sql, binds })
    }

    /// Render the statement with literal values, for display only.
    ///
    /// Placeholders without a value are left as `:name`.
    pub fn render_literal(&self, params: &Params, db_type: DatabaseType) -> String {
        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Param(name) => match params.get(name) {
                    Some(value) => out.push_str(&render_value(value, db_type)),
                    None => {
                        out.push(':');
                        out.push_str(name);
                    }
                },
            }
        }
        out
    }
}

/// Literal SQL text for one value.
pub fn render_value(value: &QueryParam, db_type: DatabaseType) -> String {
    match value {
        QueryParam::Null => "NULL".to_string(),
        QueryParam::Bool(v) => match (db_type, v) {
            (DatabaseType::PostgreSQL, true) => "TRUE".to_string(),
            (DatabaseType::PostgreSQL, false) => "FALSE".to_string(),
            (_, true) => "1".to_string(),
            (_, false) => "0".to_string(),
        },
        QueryParam::Int(v) => v.to_string(),
        QueryParam::Float(v) if v.is_finite() => v.to_string(),
        QueryParam::Float(v) => format!("'{}'", v),
        QueryParam::String(v) if db_type == DatabaseType::MySQL => {
            format!("'{}'", v.replace('\\', "\\\\").replace('\'', "''"))
        }
        QueryParam::String(v) => format!("'{}'", v.replace('\'', "''")),
        QueryParam::Bytes(v) => {
            let hex: String = v.iter().map(|b| format!("{:02X}", b)).collect();
            format!("X'{}'", hex)
        }
        QueryParam::List(items) if items.is_empty() => "(NULL)".to_string(),
        QueryParam::List(items) => {
            let inner = items
                .iter()
                .map(|item| render_value(item, db_type))
                .collect::<Vec<_>>()
                .join(", ");
            format!("({})", inner)
        }
    }
}

#[derive(Clone)]
enum State {
    Normal,
    Quoted(u8),
    LineComment,
    BlockComment(u32),
    DollarQuoted(String),
}

fn is_word(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn follows_word(bytes: &[u8], idx: usize) -> bool {
    idx > 0 && {
        let prev = bytes[idx - 1];
        is_word(prev) || prev == b':' || prev == b'\\'
    }
}

/// End index of a placeholder name starting at `start`.
fn scan_name(bytes: &[u8], start: usize) -> Option<usize> {
    match bytes.get(start) {
        Some(b) if b.is_ascii_alphabetic() || *b == b'_' => {}
        _ => return None,
    }
    let mut idx = start + 1;
    while idx < bytes.len() && is_word(bytes[idx]) {
        idx += 1;
    }
    Some(idx)
}

fn try_start_dollar_quote(bytes: &[u8], start: usize) -> Option<(String, usize)> {
    let mut idx = start + 1;
    while idx < bytes.len() && bytes[idx] != b'$' {
        let b = bytes[idx];
        if !is_word(b) || (idx == start + 1 && b.is_ascii_digit()) {
            return None;
        }
        idx += 1;
    }
    if idx >= bytes.len() {
        return None;
    }
    let tag = std::str::from_utf8(&bytes[start + 1..idx]).ok()?.to_string();
    Some((tag, idx))
}

fn matches_tag(bytes: &[u8], idx: usize, tag: &str) -> bool {
    let tag_bytes = tag.as_bytes();
    let end = idx + 1 + tag_bytes.len();
    bytes.get(idx + 1..end) == Some(tag_bytes)
        && bytes.get(end) == Some(&b'$')
}
