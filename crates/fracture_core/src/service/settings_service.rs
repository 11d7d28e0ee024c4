//! Typed access to well-known project settings.
//!
//! # Responsibility
//! - Expose scan locations and skip patterns as string lists.
//! - Persist every change immediately through the settings repository.
//!
//! # Invariants
//! - Stored locations always use forward slashes; skip patterns are verbatim.
//! - List values never contain duplicates.
//! - Skip patterns are only stored when they compile.

use crate::model::element::conform_path;
use crate::repo::element_repo::RepoError;
use crate::repo::settings_repo::{Settings, SettingsRepository};
use regex::Regex;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const SCAN_LOCATIONS_KEY: &str = "scan_locations";
pub const SKIP_REGEX_KEY: &str = "skip_regex";

/// Service error for settings use-cases.
#[derive(Debug)]
pub enum SettingsError {
    /// A skip pattern does not compile.
    InvalidPattern { pattern: String, message: String },
    /// A well-known key holds something other than a list of strings.
    InvalidValue(&'static str),
    Repo(RepoError),
}

impl Display for SettingsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPattern { pattern, message } => {
                write!(f, "invalid skip pattern `{pattern}`: {message}")
            }
            Self::InvalidValue(key) => write!(f, "settings key `{key}` is not a list of strings"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SettingsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for SettingsError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

pub type SettingsResult<T> = Result<T, SettingsError>;

/// Settings facade over repository implementations.
pub struct SettingsService<R: SettingsRepository> {
    repo: R,
}

impl<R: SettingsRepository> SettingsService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Loads the raw settings object.
    pub fn load(&self) -> SettingsResult<Settings> {
        Ok(self.repo.load()?)
    }

    /// Replaces the raw settings object.
    pub fn save(&self, settings: &Settings) -> SettingsResult<()> {
        Ok(self.repo.save(settings)?)
    }

    pub fn scan_locations(&self) -> SettingsResult<Vec<String>> {
        self.list(SCAN_LOCATIONS_KEY)
    }

    pub fn add_scan_location(&self, location: &str) -> SettingsResult<Vec<String>> {
        self.push(SCAN_LOCATIONS_KEY, conform_path(location))
    }

    pub fn remove_scan_location(&self, location: &str) -> SettingsResult<Vec<String>> {
        self.pull(SCAN_LOCATIONS_KEY, &conform_path(location))
    }

    pub fn skip_regexes(&self) -> SettingsResult<Vec<String>> {
        self.list(SKIP_REGEX_KEY)
    }

    /// Stores a skip pattern after checking that it compiles.
    ///
    /// Patterns are stored verbatim; backslashes are regex escapes here.
    pub fn add_skip_regex(&self, pattern: &str) -> SettingsResult<Vec<String>> {
        Regex::new(pattern).map_err(|err| SettingsError::InvalidPattern {
            pattern: pattern.to_string(),
            message: err.to_string(),
        })?;
        self.push(SKIP_REGEX_KEY, pattern.to_string())
    }

    pub fn remove_skip_regex(&self, pattern: &str) -> SettingsResult<Vec<String>> {
        self.pull(SKIP_REGEX_KEY, pattern)
    }

    fn list(&self, key: &'static str) -> SettingsResult<Vec<String>> {
        let settings = self.repo.load()?;
        read_string_list(&settings, key)
    }

    fn push(&self, key: &'static str, value: String) -> SettingsResult<Vec<String>> {
        let mut settings = self.repo.load()?;
        let mut values = read_string_list(&settings, key)?;
        if !values.contains(&value) {
            values.push(value);
            write_string_list(&mut settings, key, &values);
            self.repo.save(&settings)?;
        }
        Ok(values)
    }

    fn pull(&self, key: &'static str, value: &str) -> SettingsResult<Vec<String>> {
        let mut settings = self.repo.load()?;
        let mut values = read_string_list(&settings, key)?;
        let before = values.len();
        values.retain(|current| current != value);
        if values.len() != before {
            write_string_list(&mut settings, key, &values);
            self.repo.save(&settings)?;
        }
        Ok(values)
    }
}

fn read_string_list(settings: &Settings, key: &'static str) -> SettingsResult<Vec<String>> {
    let Some(value) = settings.get(key) else {
        return Ok(Vec::new());
    };
    let Value::Array(items) = value else {
        return Err(SettingsError::InvalidValue(key));
    };

    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or(SettingsError::InvalidValue(key))
        })
        .collect()
}

fn write_string_list(settings: &mut Settings, key: &str, values: &[String]) {
    let items = values.iter().cloned().map(Value::String).collect();
    settings.insert(key.to_string(), Value::Array(items));
}
