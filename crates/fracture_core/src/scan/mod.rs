//! Location scanning and element discovery.
//!
//! # Responsibility
//! - Define the scan-process contract used to discover element identifiers.
//! - Register discovered identifiers and drop elements that no longer exist.
//! - Attach the mandatory tags element plugins declare for scanned elements.
//!
//! # Invariants
//! - Every identifier discovered by one run is written in one transaction.
//! - Cleanup only removes elements some scan process reports as `NotValid`;
//!   `Unknown` never removes anything.
//! - A mandatory tag that is already linked is skipped, never an error.

mod element_plugin;
mod file_scanner;

pub use element_plugin::{ElementDescription, ElementPlugin, ElementPlugins, FileElement};
pub use file_scanner::FileScanner;

use crate::repo::element_repo::{ElementRepository, RepoError, SqliteElementRepository};
use crate::repo::settings_repo::SqliteSettingsRepository;
use crate::service::settings_service::{SettingsError, SettingsService};
use log::{debug, info};
use regex::Regex;
use rusqlite::Connection;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Validity of an already stored identifier, as judged by a scan process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanCheck {
    /// The identifier still refers to live data.
    Valid,
    /// The identifier should be dropped from the project.
    NotValid,
    /// The scan process cannot judge this identifier.
    Unknown,
}

/// A source of element identifiers, e.g. a file system or a remote API.
pub trait ScanProcess {
    /// Stable name of this scan process.
    fn scan_type(&self) -> &str;
    /// Returns `true` when this process knows how to scan `location`.
    fn can_represent(&self, location: &str) -> bool;
    /// Lists identifiers found at `location`, skipping those matching `skip`.
    fn identifiers(&self, location: &str, skip: Option<&Regex>, recursive: bool) -> Vec<String>;
    /// Locations above `location`, nearest first.
    fn above(&self, location: &str) -> Vec<String>;
    /// Locations immediately below `location`.
    fn below(&self, location: &str) -> Vec<String>;
    /// Checks whether a stored identifier is still valid.
    fn check(&self, identifier: &str) -> ScanCheck;
}

/// Scan-layer error.
#[derive(Debug)]
pub enum ScanError {
    /// Stored skip patterns do not compile as one expression.
    InvalidSkipPattern(regex::Error),
    Settings(SettingsError),
    Repo(RepoError),
}

impl Display for ScanError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidSkipPattern(err) => write!(f, "invalid skip pattern: {err}"),
            Self::Settings(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ScanError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidSkipPattern(err) => Some(err),
            Self::Settings(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<SettingsError> for ScanError {
    fn from(value: SettingsError) -> Self {
        Self::Settings(value)
    }
}

impl From<RepoError> for ScanError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

pub type ScanResult<T> = Result<T, ScanError>;

/// Options for [`Scanner::run`].
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Locations to scan. Empty means the project's stored scan locations.
    pub locations: Vec<String>,
    pub recursive: bool,
    /// Link the mandatory tags of element plugins to scanned elements.
    pub mandatory_tags: bool,
    /// Remove stored elements a scan process reports as `NotValid`.
    pub cleanup: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            locations: Vec::new(),
            recursive: true,
            mandatory_tags: true,
            cleanup: true,
        }
    }
}

/// Outcome of one scan run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Identifiers discovered, in discovery order.
    pub scanned: Vec<String>,
    /// Mandatory tag links written.
    pub tagged: usize,
    /// Identifiers removed by cleanup.
    pub removed: Vec<String>,
}

/// Joins skip patterns into one alternation, `(p1)|(p2)|...`.
///
/// Returns `None` for an empty list.
pub fn compile_skip_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Option<Regex>, regex::Error> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let joined = patterns
        .iter()
        .map(|pattern| format!("({})", pattern.as_ref()))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&joined).map(Some)
}

/// Runs registered scan processes against a project database.
pub struct Scanner {
    processes: Vec<Box<dyn ScanProcess>>,
    elements: ElementPlugins,
}

impl Default for Scanner {
    /// Scanner with the built-in [`FileScanner`] and [`FileElement`] registered.
    fn default() -> Self {
        let mut scanner = Self::new(vec![Box::new(FileScanner)]);
        scanner.register_element(Box::new(FileElement));
        scanner
    }
}

impl Scanner {
    /// Scanner with the given processes and no element plugins.
    pub fn new(processes: Vec<Box<dyn ScanProcess>>) -> Self {
        Self {
            processes,
            elements: ElementPlugins::default(),
        }
    }

    /// Adds one more scan process.
    pub fn register(&mut self, process: Box<dyn ScanProcess>) {
        self.processes.push(process);
    }

    /// Adds an element plugin; see [`ElementPlugins::register`].
    pub fn register_element(&mut self, plugin: Box<dyn ElementPlugin>) {
        self.elements.register(plugin);
    }

    /// Composite element view for `identifier`, if any plugin represents it.
    pub fn describe(&self, identifier: &str) -> Option<ElementDescription> {
        self.elements.describe(identifier)
    }

    /// Scans locations, stores discovered identifiers, links mandatory tags
    /// and optionally cleans up.
    ///
    /// `on_scanned` is called once per discovered identifier.
    pub fn run<F>(
        &self,
        conn: &mut Connection,
        options: &ScanOptions,
        mut on_scanned: F,
    ) -> ScanResult<ScanReport>
    where
        F: FnMut(&str),
    {
        let started_at = Instant::now();
        let (locations, skip) = {
            let settings = SettingsService::new(SqliteSettingsRepository::try_new(conn)?);
            let locations = if options.locations.is_empty() {
                settings.scan_locations()?
            } else {
                options.locations.clone()
            };
            let skip = compile_skip_patterns(&settings.skip_regexes()?)
                .map_err(ScanError::InvalidSkipPattern)?;
            (locations, skip)
        };
        info!(
            "event=scan module=scan status=start locations={} recursive={} mandatory_tags={} cleanup={}",
            locations.len(),
            options.recursive,
            options.mandatory_tags,
            options.cleanup
        );

        let mut report = ScanReport::default();
        for location in &locations {
            for process in &self.processes {
                if !process.can_represent(location) {
                    continue;
                }
                for identifier in process.identifiers(location, skip.as_ref(), options.recursive) {
                    on_scanned(&identifier);
                    report.scanned.push(identifier);
                }
            }
        }

        let mut repo = SqliteElementRepository::try_new(conn)?;
        let created = repo.add_elements(&report.scanned)?;

        if options.mandatory_tags && !self.elements.is_empty() {
            report.tagged = self.link_mandatory_tags(&repo, &report.scanned)?;
        }

        if options.cleanup {
            for element in repo.list_elements(None)? {
                let invalid = self
                    .processes
                    .iter()
                    .any(|process| process.check(&element.identifier) == ScanCheck::NotValid);
                if invalid {
                    repo.remove_element(&element.identifier)?;
                    report.removed.push(element.identifier);
                }
            }
        }

        info!(
            "event=scan module=scan status=ok scanned={} created={} tagged={} removed={} duration_ms={}",
            report.scanned.len(),
            created,
            report.tagged,
            report.removed.len(),
            started_at.elapsed().as_millis()
        );
        Ok(report)
    }

    /// Inserts every mandatory tag once, then links each to its identifier.
    ///
    /// Returns the number of new links. Duplicate links are skipped.
    fn link_mandatory_tags<R: ElementRepository>(
        &self,
        repo: &R,
        identifiers: &[String],
    ) -> ScanResult<usize> {
        let mut all_tags = BTreeSet::new();
        let mut mapped = Vec::new();
        for identifier in identifiers {
            let Some(description) = self.elements.describe(identifier) else {
                continue;
            };
            if description.mandatory_tags.is_empty() {
                continue;
            }
            all_tags.extend(description.mandatory_tags.iter().cloned());
            mapped.push((identifier.as_str(), description.mandatory_tags));
        }

        for tag in &all_tags {
            repo.insert_tag(tag)?;
        }

        let mut linked = 0usize;
        for (identifier, tags) in &mapped {
            for tag in tags {
                match repo.connect_tag(identifier, tag) {
                    Ok(true) => linked += 1,
                    Ok(false) => {}
                    Err(err) if err.is_constraint_violation() => {
                        debug!(
                            "event=scan_tag module=scan status=skipped reason=already_linked tag={tag}"
                        );
                    }
                    Err(err) => return Err(err.into()),
                }
            }
        }
        Ok(linked)
    }

    /// Returns `(above, below)` locations from the first process that can
    /// represent `location`, or two empty lists.
    pub fn explore(&self, location: &str) -> (Vec<String>, Vec<String>) {
        self.processes
            .iter()
            .find(|process| process.can_represent(location))
            .map(|process| (process.above(location), process.below(location)))
            .unwrap_or_default()
    }
}
