//! Removal of augmented copies (`*_aug_*`) left behind by a previous
//! augmentation pass, so a corpus can be re-augmented from clean originals.

use crate::config::validate_folder;
use crate::error::{DedupeError, FileError, Result};
use crate::resolve::Outcome;
use crate::scanner::scan_matching;
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Substring that marks a file name as an augmented copy. Matched case-sensitively.
pub const AUGMENTED_MARKER: &str = "_aug_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgedFile {
    pub path: PathBuf,
    #[serde(flatten)]
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurgeReport {
    pub folder: PathBuf,
    pub dry_run: bool,
    pub files: Vec<PurgedFile>,
    pub errors: Vec<FileError>,
}

impl PurgeReport {
    /// Entries whose name carries the marker, files or not.
    pub fn matched(&self) -> usize {
        self.files.len()
    }

    pub fn deleted(&self) -> usize {
        self.files
            .iter()
            .filter(|f| f.outcome == Outcome::Deleted)
            .count()
    }
}

pub fn is_augmented(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.to_string_lossy().contains(AUGMENTED_MARKER))
}

/// Delete every augmented file under `folder`. Matching entries that are not
/// regular files, and files that cannot be removed, are recorded as errors.
pub fn purge_augmented(folder: &Path, dry_run: bool, progress: &ProgressBar) -> Result<PurgeReport> {
    validate_folder(folder)?;

    let matched = scan_matching(folder, progress, is_augmented);
    log::info!(
        "Found {} entries containing '{}' under {}",
        matched.len(),
        AUGMENTED_MARKER,
        folder.display()
    );

    let mut report = PurgeReport {
        folder: folder.to_path_buf(),
        dry_run,
        files: Vec::with_capacity(matched.len()),
        errors: Vec::new(),
    };

    for path in matched {
        let outcome = match remove_augmented(&path, dry_run) {
            Ok(outcome) => outcome,
            Err(e) => {
                log::warn!("{}", e);
                if let Some(kind) = e.file_error_kind() {
                    report.errors.push(FileError::new(&path, kind, &e));
                }
                Outcome::Failed
            }
        };
        report.files.push(PurgedFile { path, outcome });
    }

    Ok(report)
}

fn remove_augmented(path: &Path, dry_run: bool) -> Result<Outcome> {
    if !path.is_file() {
        return Err(DedupeError::NotAFile(path.to_path_buf()));
    }
    if dry_run {
        return Ok(Outcome::WouldDelete);
    }
    fs::remove_file(path).map_err(|source| DedupeError::Delete {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!("Deleted {}", path.display());
    Ok(Outcome::Deleted)
}
