//! Tagging use-case service.
//!
//! # Responsibility
//! - Provide project-level add/tag/untag/find/remove entry points.
//! - Normalize tag input before it reaches persistence.
//!
//! # Invariants
//! - Tags are trimmed, lowercased and deduplicated before writes.
//! - Tagging goes through the idempotent association path, so retries are safe.
//! - Blank tags or identifiers are rejected before any row is written.

use crate::model::element::{normalize_tag, Element};
use crate::repo::element_repo::{ElementRepository, RepoError};
use crate::search::tag_search::SearchQuery;
use log::info;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for tagging use-cases.
#[derive(Debug)]
pub enum TagServiceError {
    /// Identifier input is blank.
    InvalidIdentifier(String),
    /// Tag input contains blank values.
    InvalidTag(String),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for TagServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidIdentifier(value) => write!(f, "invalid identifier: `{value}`"),
            Self::InvalidTag(value) => write!(f, "invalid tag: `{value}`"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TagServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for TagServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

pub type TagServiceResult<T> = Result<T, TagServiceError>;

/// Tagging facade over element repository implementations.
pub struct TagService<R: ElementRepository> {
    repo: R,
}

impl<R: ElementRepository> TagService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Registers one element, returning the stored row.
    pub fn add(&self, identifier: &str) -> TagServiceResult<Element> {
        let identifier = validate_identifier(identifier)?;
        Ok(self.repo.add_element(identifier)?)
    }

    /// Assigns tags to an element and returns its full tag set afterwards.
    ///
    /// All tags are written in one transaction. Unknown elements are not
    /// created; their tags are still registered.
    pub fn tag<S: AsRef<str>>(
        &mut self,
        identifier: &str,
        tags: &[S],
    ) -> TagServiceResult<Vec<String>> {
        let tags: Vec<String> = normalize_tag_input(tags)?.into_iter().collect();
        let linked = self.repo.add_tags(identifier, &tags)?;

        info!(
            "event=element_tag module=service status=ok requested={} linked={}",
            tags.len(),
            linked
        );
        Ok(self.repo.tags_for_element(identifier)?)
    }

    /// Unassigns tags from an element and returns how many links were removed.
    pub fn untag<S: AsRef<str>>(&self, identifier: &str, tags: &[S]) -> TagServiceResult<usize> {
        let tags = normalize_tag_input(tags)?;
        let mut removed = 0usize;
        for tag in &tags {
            if self.repo.remove_tag(identifier, tag)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Returns tags assigned to an element; unknown elements have none.
    pub fn tags(&self, identifier: &str) -> TagServiceResult<Vec<String>> {
        Ok(self.repo.tags_for_element(identifier)?)
    }

    /// Finds elements by free-form terms.
    ///
    /// No terms (or only blank ones) lists every element; otherwise each
    /// non-blank term is matched as an identifier substring and as an exact tag.
    pub fn find<S: AsRef<str>>(
        &self,
        terms: &[S],
        limit: Option<u32>,
    ) -> TagServiceResult<Vec<Element>> {
        if terms.iter().all(|term| term.as_ref().trim().is_empty()) {
            return Ok(self.repo.list_elements(limit)?);
        }
        let query = SearchQuery::from_terms(terms, limit);
        Ok(self.repo.search(&query)?)
    }

    /// Removes an element with all its links. Returns `false` when unknown.
    pub fn remove(&mut self, identifier: &str) -> TagServiceResult<bool> {
        let removed = self.repo.remove_element(identifier)? > 0;
        info!("event=element_remove module=service status=ok removed={removed}");
        Ok(removed)
    }

    /// Records that `identifier` requires `requirement`.
    pub fn require(&self, identifier: &str, requirement: &str) -> TagServiceResult<bool> {
        Ok(self.repo.add_dependency(identifier, requirement)?)
    }

    /// Returns identifiers the element requires.
    pub fn requirements(&self, identifier: &str) -> TagServiceResult<Vec<String>> {
        Ok(self.repo.dependencies(identifier)?)
    }

    /// Returns every known tag.
    pub fn all_tags(&self) -> TagServiceResult<Vec<String>> {
        Ok(self.repo.list_tags()?)
    }
}

fn validate_identifier(identifier: &str) -> TagServiceResult<&str> {
    if identifier.trim().is_empty() {
        return Err(TagServiceError::InvalidIdentifier(identifier.to_string()));
    }
    Ok(identifier)
}

fn normalize_tag_input<S: AsRef<str>>(tags: &[S]) -> TagServiceResult<BTreeSet<String>> {
    let mut unique = BTreeSet::new();
    for tag in tags {
        let raw = tag.as_ref();
        match normalize_tag(raw) {
            Some(value) => {
                unique.insert(value);
            }
            None => return Err(TagServiceError::InvalidTag(raw.to_string())),
        }
    }
    Ok(unique)
}
