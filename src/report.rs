use crate::config::DuplicateAction;
use crate::error::{FileError, FileErrorKind};
use crate::grouping::DuplicateGroup;
use crate::resolve::{Outcome, ResolvedFile};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Everything a run did, in a form that can be printed or serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupeReport {
    pub generated_at: DateTime<Utc>,
    pub folder: PathBuf,
    pub action: DuplicateAction,
    pub dry_run: bool,
    pub scanned_files: usize,
    pub unique_fingerprints: usize,
    pub groups: Vec<DuplicateGroup>,
    pub duplicate_files: usize,
    pub resolved: Vec<ResolvedFile>,
    pub errors: Vec<FileError>,
}

impl DedupeReport {
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Duplicates deleted or moved without error.
    pub fn handled(&self) -> usize {
        self.resolved
            .iter()
            .filter(|f| f.outcome != Outcome::Failed)
            .count()
    }

    pub fn errors_of(&self, kind: FileErrorKind) -> impl Iterator<Item = &FileError> {
        self.errors.iter().filter(move |e| e.kind == kind)
    }

    pub fn decode_errors(&self) -> usize {
        self.errors_of(FileErrorKind::Decode).count()
    }

    pub fn resolved_for<'a>(
        &'a self,
        group: &'a DuplicateGroup,
    ) -> impl Iterator<Item = &'a ResolvedFile> + 'a {
        self.resolved
            .iter()
            .filter(move |f| f.original.as_path() == group.original())
    }
}
