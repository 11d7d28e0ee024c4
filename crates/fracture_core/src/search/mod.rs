//! Element search entry points.
//!
//! # Responsibility
//! - Provide the combined locator/tag search used by project lookups.
//!
//! # See also
//! - `repo::element_repo` for single-element tag reads.

pub mod tag_search;
