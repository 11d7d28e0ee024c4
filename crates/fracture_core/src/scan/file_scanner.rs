//! Built-in file system scan process.

use super::{ScanCheck, ScanProcess};
use crate::model::element::conform_path;
use regex::Regex;
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

/// Discovers files below local directories. Identifiers are forward-slash paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileScanner;

impl ScanProcess for FileScanner {
    fn scan_type(&self) -> &str {
        "file_scanner"
    }

    fn can_represent(&self, location: &str) -> bool {
        Path::new(location).exists()
    }

    fn identifiers(&self, location: &str, skip: Option<&Regex>, recursive: bool) -> Vec<String> {
        // Recursive scans yield files only, including symlinks to files; a
        // flat scan yields every entry.
        let walker = if recursive {
            WalkDir::new(location).min_depth(1)
        } else {
            WalkDir::new(location).min_depth(1).max_depth(1)
        };

        walker
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| !recursive || entry.path().is_file())
            .map(|entry| entry_identifier(&entry))
            .filter(|identifier| skip.map_or(true, |regex| !regex.is_match(identifier)))
            .collect()
    }

    fn above(&self, location: &str) -> Vec<String> {
        let conformed = conform_path(location);
        let parts = conformed.split('/').collect::<Vec<_>>();

        (1..parts.len())
            .map(|trim| parts[..parts.len() - trim].join("/"))
            .filter(|folder| !folder.is_empty() && !folder.ends_with(':'))
            .collect()
    }

    fn below(&self, location: &str) -> Vec<String> {
        WalkDir::new(location)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_dir())
            .map(|entry| entry_identifier(&entry))
            .collect()
    }

    fn check(&self, identifier: &str) -> ScanCheck {
        let path = Path::new(identifier);
        if !path.is_absolute() {
            return ScanCheck::Unknown;
        }
        if path.exists() {
            ScanCheck::Valid
        } else {
            ScanCheck::NotValid
        }
    }
}

fn entry_identifier(entry: &DirEntry) -> String {
    conform_path(&entry.path().to_string_lossy())
}
