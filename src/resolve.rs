use crate::config::DuplicateAction;
use crate::error::{DedupeError, FileError, Result};
use crate::grouping::DuplicateGroup;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// What happened to one duplicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum Outcome {
    Deleted,
    Moved { to: PathBuf },
    WouldDelete,
    WouldMove { to: PathBuf },
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedFile {
    pub original: PathBuf,
    pub path: PathBuf,
    #[serde(flatten)]
    pub outcome: Outcome,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Resolution {
    pub files: Vec<ResolvedFile>,
    pub errors: Vec<FileError>,
}

impl Resolution {
    /// Duplicates that were deleted or moved (or would be, on a dry run).
    pub fn handled(&self) -> usize {
        self.files
            .iter()
            .filter(|f| f.outcome != Outcome::Failed)
            .count()
    }
}

/// Keep the first file of every group and delete or move the rest.
/// A failure on one file is recorded and the remaining files are still processed.
pub fn resolve_groups(groups: &[DuplicateGroup], action: &DuplicateAction, dry_run: bool) -> Resolution {
    let mut resolution = Resolution::default();
    // Destinations handed out during this run; a dry run never creates them on disk.
    let mut reserved: HashSet<PathBuf> = HashSet::new();

    for group in groups {
        let original = group.original();
        log::info!("Keeping {}", original.display());

        for dup in group.duplicates() {
            let result = if dry_run {
                plan(dup, action, &reserved)
            } else {
                apply(dup, action, &reserved)
            };

            let outcome = match result {
                Ok(outcome) => {
                    if let Outcome::Moved { to } | Outcome::WouldMove { to } = &outcome {
                        reserved.insert(to.clone());
                    }
                    outcome
                }
                Err(e) => {
                    log::warn!("{}", e);
                    if let Some(kind) = e.file_error_kind() {
                        resolution.errors.push(FileError::new(dup, kind, &e));
                    }
                    Outcome::Failed
                }
            };
            resolution.files.push(ResolvedFile {
                original: original.to_path_buf(),
                path: dup.clone(),
                outcome,
            });
        }
    }

    resolution
}

fn apply(dup: &Path, action: &DuplicateAction, reserved: &HashSet<PathBuf>) -> Result<Outcome> {
    match action {
        DuplicateAction::Delete => {
            fs::remove_file(dup).map_err(|source| DedupeError::Delete {
                path: dup.to_path_buf(),
                source,
            })?;
            log::debug!("Deleted {}", dup.display());
            Ok(Outcome::Deleted)
        }
        DuplicateAction::Move(dir) => {
            let dest = free_destination(dir, dup, reserved)?;
            move_file(dup, &dest).map_err(|source| DedupeError::Move {
                from: dup.to_path_buf(),
                to: dest.clone(),
                source,
            })?;
            log::debug!("Moved {} → {}", dup.display(), dest.display());
            Ok(Outcome::Moved { to: dest })
        }
    }
}

fn plan(dup: &Path, action: &DuplicateAction, reserved: &HashSet<PathBuf>) -> Result<Outcome> {
    match action {
        DuplicateAction::Delete => Ok(Outcome::WouldDelete),
        DuplicateAction::Move(dir) => Ok(Outcome::WouldMove {
            to: free_destination(dir, dup, reserved)?,
        }),
    }
}

/// `dir/<name>`, or `dir/<stem>_<n><.ext>` with the smallest `n >= 1` that is not taken.
/// A name is taken when a file exists there or it is in `reserved`.
pub fn free_destination(dir: &Path, file: &Path, reserved: &HashSet<PathBuf>) -> Result<PathBuf> {
    let taken = |candidate: &Path| candidate.exists() || reserved.contains(candidate);

    let file_name = file
        .file_name()
        .ok_or_else(|| DedupeError::NoFileName(file.to_path_buf()))?;

    let candidate = dir.join(file_name);
    if !taken(&candidate) {
        return Ok(candidate);
    }

    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = file
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut counter = 1u32;
    loop {
        let candidate = dir.join(format!("{stem}_{counter}{ext}"));
        if !taken(&candidate) {
            return Ok(candidate);
        }
        counter += 1;
    }
}

/// Rename, falling back to copy + remove when source and destination are on different devices.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
        Err(e) => Err(e),
    }
}
