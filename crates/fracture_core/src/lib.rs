//! Core storage and query logic for fracture projects.
//! A project tracks elements by identifier, tags them, and finds them again.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod scan;
pub mod search;
pub mod service;

pub use logging::{default_log_level, init_logging, init_stderr_logging, logging_status, LogSink};
pub use model::element::{Element, ElementId};
pub use repo::element_repo::{ElementRepository, RepoError, RepoResult, SqliteElementRepository};
pub use repo::settings_repo::{Settings, SettingsRepository, SqliteSettingsRepository};
pub use scan::{
    compile_skip_patterns, ElementDescription, ElementPlugin, ElementPlugins, FileElement,
    FileScanner, ScanCheck, ScanError, ScanOptions, ScanProcess, ScanReport, Scanner,
};
pub use search::tag_search::{search_elements, SearchError, SearchQuery, SearchResult};
pub use service::settings_service::{SettingsError, SettingsService};
pub use service::tag_service::{TagService, TagServiceError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
