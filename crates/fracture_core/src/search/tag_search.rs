//! Combined locator/tag search.
//!
//! # Responsibility
//! - Return elements whose identifier matches every locator pattern, or
//!   whose matching tag count equals `compare_count`.
//!
//! # Invariants
//! - The tag branch compares counts with equality, not "at least".
//! - An empty pattern list disables its branch; it never matches everything.
//! - Result ordering is `identifier ASC`, applied before the limit.

use crate::db::DbError;
use crate::model::element::{normalize_tag, Element};
use crate::repo::element_repo::{limit_to_sql, parse_element_row};
use log::debug;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type for search APIs.
pub type SearchResult<T> = Result<T, SearchError>;

/// Search-layer error.
#[derive(Debug)]
pub enum SearchError {
    Db(DbError),
}

impl Display for SearchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SearchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
        }
    }
}

impl From<DbError> for SearchError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for SearchError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Search options for [`search_elements`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    /// SQL `LIKE` patterns; an element must match all of them.
    pub locator_patterns: Vec<String>,
    /// Exact tag values; any of them counts towards `compare_count`.
    pub tag_values: Vec<String>,
    /// Required number of matching tags per element (exact).
    pub compare_count: u32,
    /// Maximum rows to return. `None` means unbounded.
    pub limit: Option<u32>,
}

impl SearchQuery {
    /// Builds the project-level lookup for free-form search terms.
    ///
    /// Each term becomes a `%term%` locator pattern and a lowercase tag
    /// value; `compare_count` is the number of distinct tag values, so the
    /// tag branch only matches elements carrying every term as a tag. Blank
    /// terms are ignored and case variants of one tag count once.
    pub fn from_terms<S: AsRef<str>>(terms: &[S], limit: Option<u32>) -> Self {
        let mut query = Self {
            limit,
            ..Self::default()
        };

        for term in terms {
            let Some(tag) = normalize_tag(term.as_ref()) else {
                continue;
            };
            query.locator_patterns.push(format!("%{}%", term.as_ref().trim()));
            if !query.tag_values.contains(&tag) {
                query.tag_values.push(tag);
            }
        }
        query.compare_count = u32::try_from(query.tag_values.len()).unwrap_or(u32::MAX);
        query
    }
}

/// Searches elements by locator patterns and exact tag-count matches.
///
/// Returns an empty list when `limit` is `Some(0)` or both branches are empty.
pub fn search_elements(conn: &Connection, query: &SearchQuery) -> SearchResult<Vec<Element>> {
    if query.limit == Some(0) {
        return Ok(Vec::new());
    }
    if query.locator_patterns.is_empty() && query.tag_values.is_empty() {
        return Ok(Vec::new());
    }

    let mut bind_values: Vec<Value> = Vec::new();

    let locator_compare = if query.locator_patterns.is_empty() {
        String::from("0")
    } else {
        bind_values.extend(query.locator_patterns.iter().cloned().map(Value::Text));
        vec!["identifier LIKE ?"; query.locator_patterns.len()].join(" AND ")
    };

    let tag_compare = if query.tag_values.is_empty() {
        String::from("0")
    } else {
        bind_values.extend(query.tag_values.iter().cloned().map(Value::Text));
        vec!["tag = ?"; query.tag_values.len()].join(" OR ")
    };

    bind_values.push(Value::Integer(i64::from(query.compare_count)));
    bind_values.push(Value::Integer(limit_to_sql(query.limit)));

    let sql = format!(
        "SELECT id, identifier
         FROM elements
         WHERE id IN (
            SELECT id FROM elements WHERE {locator_compare}
         )
            OR id IN (
            SELECT element_id
            FROM map_tags
            WHERE tag_id IN (
                SELECT id FROM tags WHERE {tag_compare}
            )
            GROUP BY element_id
            HAVING COUNT(tag_id) = ?
         )
         ORDER BY identifier ASC
         LIMIT ?;"
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(bind_values), parse_element_row)?;
    let mut elements = Vec::new();
    for row in rows {
        elements.push(row?);
    }

    debug!(
        "event=element_search module=search status=ok locators={} tags={} compare_count={} hits={}",
        query.locator_patterns.len(),
        query.tag_values.len(),
        query.compare_count,
        elements.len()
    );
    Ok(elements)
}
