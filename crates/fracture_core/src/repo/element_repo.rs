//! Element/tag repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Resolve elements and tags by their natural keys.
//! - Own the tag association statements (guarded and unguarded variants).
//! - Remove an element together with every row that references it.
//!
//! # Invariants
//! - `connect_tag` never checks for an existing pair; a duplicate surfaces
//!   the engine's constraint violation.
//! - `add_tag` is idempotent: repeated calls create no duplicate rows.
//!   `add_tags` applies it to a whole list in one transaction.
//! - `remove_element` runs its three deletes in one transaction, association
//!   rows first.

use crate::db::DbError;
use crate::model::element::Element;
use crate::repo::ensure_tables;
use crate::search::tag_search::{search_elements, SearchError, SearchQuery};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

const ELEMENT_SELECT_SQL: &str = "SELECT
    id,
    identifier
FROM elements";

const REQUIRED_TABLES: [&str; 4] = ["elements", "tags", "map_tags", "map_dependencies"];

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for element, tag and settings persistence.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    InvalidData(String),
    MissingRequiredTable(&'static str),
}

impl RepoError {
    /// Returns `true` when the underlying failure is a constraint violation.
    pub fn is_constraint_violation(&self) -> bool {
        match self {
            Self::Db(err) => err.is_constraint_violation(),
            _ => false,
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "project database is missing table `{table}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
            Self::MissingRequiredTable(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<SearchError> for RepoError {
    fn from(value: SearchError) -> Self {
        match value {
            SearchError::Db(err) => Self::Db(err),
        }
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for elements and their tag/dependency links.
pub trait ElementRepository {
    /// Inserts the element unless it already exists and returns the stored row.
    fn add_element(&self, identifier: &str) -> RepoResult<Element>;
    /// Inserts many elements in one transaction; returns newly created rows.
    fn add_elements(&mut self, identifiers: &[String]) -> RepoResult<usize>;
    /// Gets one element by identifier.
    fn get_element(&self, identifier: &str) -> RepoResult<Option<Element>>;
    /// Lists elements sorted by identifier. `None` means unbounded.
    fn list_elements(&self, limit: Option<u32>) -> RepoResult<Vec<Element>>;
    /// Removes the element and every association/dependency row referencing it.
    ///
    /// Returns the number of removed `elements` rows (0 or 1).
    fn remove_element(&mut self, identifier: &str) -> RepoResult<usize>;
    /// Returns tags assigned to the element, sorted. Unknown element -> empty.
    fn tags_for_element(&self, identifier: &str) -> RepoResult<Vec<String>>;
    /// Links an existing tag without checking for an existing pair.
    ///
    /// Returns `false` when either side does not resolve.
    fn connect_tag(&self, identifier: &str, tag: &str) -> RepoResult<bool>;
    /// Ensures the tag exists, then links it unless already linked.
    ///
    /// Returns `true` when a new association row was written.
    fn add_tag(&mut self, identifier: &str, tag: &str) -> RepoResult<bool>;
    /// `add_tag` for several tags inside one transaction; all or nothing.
    ///
    /// Returns the number of new association rows.
    fn add_tags(&mut self, identifier: &str, tags: &[String]) -> RepoResult<usize>;
    /// Creates the tag unless it already exists.
    fn insert_tag(&self, tag: &str) -> RepoResult<()>;
    /// Unlinks one tag from the element. The tag row itself is kept.
    fn remove_tag(&self, identifier: &str, tag: &str) -> RepoResult<bool>;
    /// Returns every known tag sorted by name.
    fn list_tags(&self) -> RepoResult<Vec<String>>;
    /// Records that `identifier` requires `requirement`.
    fn add_dependency(&self, identifier: &str, requirement: &str) -> RepoResult<bool>;
    /// Returns identifiers required by the element, sorted.
    fn dependencies(&self, identifier: &str) -> RepoResult<Vec<String>>;
    /// Runs the combined locator/tag search.
    fn search(&self, query: &SearchQuery) -> RepoResult<Vec<Element>>;
}

/// SQLite-backed element repository.
pub struct SqliteElementRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteElementRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_tables(conn, &REQUIRED_TABLES)?;
        Ok(Self { conn })
    }
}

impl ElementRepository for SqliteElementRepository<'_> {
    fn add_element(&self, identifier: &str) -> RepoResult<Element> {
        self.conn.execute(
            "INSERT OR IGNORE INTO elements (identifier) VALUES (?1);",
            [identifier],
        )?;

        self.get_element(identifier)?.ok_or_else(|| {
            RepoError::InvalidData(format!("element `{identifier}` missing after insert"))
        })
    }

    fn add_elements(&mut self, identifiers: &[String]) -> RepoResult<usize> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut created = 0;
        {
            let mut stmt =
                tx.prepare("INSERT OR IGNORE INTO elements (identifier) VALUES (?1);")?;
            for identifier in identifiers {
                created += stmt.execute([identifier.as_str()])?;
            }
        }
        tx.commit()?;
        Ok(created)
    }

    fn get_element(&self, identifier: &str) -> RepoResult<Option<Element>> {
        let element = self
            .conn
            .query_row(
                &format!("{ELEMENT_SELECT_SQL} WHERE identifier = ?1;"),
                [identifier],
                parse_element_row,
            )
            .optional()?;
        Ok(element)
    }

    fn list_elements(&self, limit: Option<u32>) -> RepoResult<Vec<Element>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ELEMENT_SELECT_SQL} ORDER BY identifier ASC LIMIT ?1;"
        ))?;
        let rows = stmt.query_map([limit_to_sql(limit)], parse_element_row)?;
        let mut elements = Vec::new();
        for row in rows {
            elements.push(row?);
        }
        Ok(elements)
    }

    fn remove_element(&mut self, identifier: &str) -> RepoResult<usize> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let unlinked_tags = tx.execute(
            "DELETE FROM map_tags
             WHERE element_id IN (
                SELECT id FROM elements WHERE identifier = ?1
             );",
            [identifier],
        )?;
        let unlinked_dependencies = tx.execute(
            "DELETE FROM map_dependencies
             WHERE element_id IN (
                SELECT id FROM elements WHERE identifier = ?1
             )
                OR requirement_id IN (
                SELECT id FROM elements WHERE identifier = ?1
             );",
            [identifier],
        )?;
        let removed = tx.execute("DELETE FROM elements WHERE identifier = ?1;", [identifier])?;

        tx.commit()?;
        debug!(
            "event=element_remove module=repo status=ok removed={} map_tags={} map_dependencies={}",
            removed, unlinked_tags, unlinked_dependencies
        );
        Ok(removed)
    }

    fn tags_for_element(&self, identifier: &str) -> RepoResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT t.tag
             FROM map_tags m
             INNER JOIN tags t ON t.id = m.tag_id
             WHERE m.element_id = (
                SELECT id FROM elements WHERE identifier = ?1
             )
             ORDER BY t.tag ASC;",
        )?;
        let rows = stmt.query_map([identifier], |row| row.get::<_, String>(0))?;
        let mut tags = Vec::new();
        for row in rows {
            tags.push(row?);
        }
        Ok(tags)
    }

    fn connect_tag(&self, identifier: &str, tag: &str) -> RepoResult<bool> {
        let inserted = self.conn.execute(
            "INSERT INTO map_tags (element_id, tag_id)
             SELECT e.id, t.id
             FROM elements e, tags t
             WHERE e.identifier = ?1
               AND t.tag = ?2;",
            params![identifier, tag],
        )?;
        Ok(inserted > 0)
    }

    fn add_tag(&mut self, identifier: &str, tag: &str) -> RepoResult<bool> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let inserted = add_tag_with(&tx, identifier, tag)?;
        tx.commit()?;
        Ok(inserted)
    }

    fn add_tags(&mut self, identifier: &str, tags: &[String]) -> RepoResult<usize> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut linked = 0usize;
        for tag in tags {
            if add_tag_with(&tx, identifier, tag)? {
                linked += 1;
            }
        }
        tx.commit()?;
        Ok(linked)
    }

    fn insert_tag(&self, tag: &str) -> RepoResult<()> {
        self.conn
            .execute("INSERT OR IGNORE INTO tags (tag) VALUES (?1);", [tag])?;
        Ok(())
    }

    fn remove_tag(&self, identifier: &str, tag: &str) -> RepoResult<bool> {
        let removed = self.conn.execute(
            "DELETE FROM map_tags
             WHERE element_id = (SELECT id FROM elements WHERE identifier = ?1)
               AND tag_id = (SELECT id FROM tags WHERE tag = ?2);",
            params![identifier, tag],
        )?;
        Ok(removed > 0)
    }

    fn list_tags(&self) -> RepoResult<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT tag FROM tags ORDER BY tag ASC;")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut tags = Vec::new();
        for row in rows {
            tags.push(row?);
        }
        Ok(tags)
    }

    fn add_dependency(&self, identifier: &str, requirement: &str) -> RepoResult<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO map_dependencies (element_id, requirement_id)
             SELECT e.id, r.id
             FROM elements e, elements r
             WHERE e.identifier = ?1
               AND r.identifier = ?2;",
            params![identifier, requirement],
        )?;
        Ok(inserted > 0)
    }

    fn dependencies(&self, identifier: &str) -> RepoResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT r.identifier
             FROM map_dependencies d
             INNER JOIN elements r ON r.id = d.requirement_id
             WHERE d.element_id = (
                SELECT id FROM elements WHERE identifier = ?1
             )
             ORDER BY r.identifier ASC;",
        )?;
        let rows = stmt.query_map([identifier], |row| row.get::<_, String>(0))?;
        let mut requirements = Vec::new();
        for row in rows {
            requirements.push(row?);
        }
        Ok(requirements)
    }

    fn search(&self, query: &SearchQuery) -> RepoResult<Vec<Element>> {
        Ok(search_elements(self.conn, query)?)
    }
}

/// Creates `tag` if needed and links it unless the pair already exists.
fn add_tag_with(conn: &Connection, identifier: &str, tag: &str) -> RepoResult<bool> {
    conn.execute("INSERT OR IGNORE INTO tags (tag) VALUES (?1);", [tag])?;
    let inserted = conn.execute(
        "INSERT INTO map_tags (element_id, tag_id)
         SELECT e.id, t.id
         FROM elements e, tags t
         WHERE e.identifier = ?1
           AND t.tag = ?2
           AND NOT EXISTS (
                SELECT 1
                FROM map_tags m
                WHERE m.element_id = e.id
                  AND m.tag_id = t.id
           );",
        params![identifier, tag],
    )?;
    Ok(inserted > 0)
}

pub(crate) fn parse_element_row(row: &Row<'_>) -> rusqlite::Result<Element> {
    Ok(Element {
        id: row.get("id")?,
        identifier: row.get("identifier")?,
    })
}

/// Maps an optional row cap to SQLite's `LIMIT` value (`-1` is unbounded).
pub(crate) fn limit_to_sql(limit: Option<u32>) -> i64 {
    limit.map_or(-1, i64::from)
}
