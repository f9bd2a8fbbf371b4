// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Column encoding helpers shared by the stores

use rusqlite::types::{ToSql, Type};
use rusqlite::{ErrorCode, Row};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::str::FromStr;

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Read a TEXT column holding an enum's wire name
pub(crate) fn text_enum<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Read a TEXT column holding JSON
pub(crate) fn json<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn to_json<T: Serialize + ?Sized>(value: &T) -> crate::Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// Turn a UNIQUE violation into [`crate::Error::Conflict`]
pub(crate) fn conflict_on_unique(
    err: rusqlite::Error,
    message: impl FnOnce() -> String,
) -> crate::Error {
    match &err {
        rusqlite::Error::SqliteFailure(code, _) if code.code == ErrorCode::ConstraintViolation => {
            crate::Error::Conflict(message())
        }
        _ => crate::Error::Sqlite(err),
    }
}

/// `%term%` for case-insensitive `LIKE` searches; wildcards in the term are escaped
pub(crate) fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Accumulates `AND` clauses and their bound values for list queries
#[derive(Default)]
pub(crate) struct Filter {
    clauses: Vec<String>,
    values: Vec<Box<dyn ToSql>>,
}

impl Filter {
    pub(crate) fn push(&mut self, clause: &str, value: impl ToSql + 'static) {
        self.values.push(Box::new(value));
        self.clauses.push(clause.replace('?', &format!("?{}", self.values.len())));
    }

    /// Push a clause that binds the same value more than once via `?N`-free `{}` slots
    pub(crate) fn push_repeated(&mut self, clause: &str, value: impl ToSql + 'static) {
        self.values.push(Box::new(value));
        self.clauses.push(clause.replace("{}", &format!("?{}", self.values.len())));
    }

    pub(crate) fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    /// Append a LIMIT bound after the filter values
    pub(crate) fn limit_sql(&mut self, limit: Option<u32>) -> String {
        match limit {
            Some(limit) => {
                self.values.push(Box::new(limit));
                format!(" LIMIT ?{}", self.values.len())
            }
            None => String::new(),
        }
    }

    pub(crate) fn params(&self) -> impl rusqlite::Params + '_ {
        rusqlite::params_from_iter(self.values.iter().map(|v| v.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn filter_numbers_placeholders() {
        let mut filter = Filter::default();
        filter.push("status = ?", "draft".to_string());
        filter.push_repeated("(title LIKE {} OR content LIKE {})", "%x%".to_string());
        assert_eq!(
            filter.where_sql(),
            " WHERE status = ?1 AND (title LIKE ?2 OR content LIKE ?2)"
        );
        assert_eq!(filter.limit_sql(Some(5)), " LIMIT ?3");
    }
}
