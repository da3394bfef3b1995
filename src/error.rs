use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DedupeError {
    #[error("Folder '{}' does not exist", .0.display())]
    FolderNotFound(PathBuf),

    #[error("'{}' is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("Invalid hash size {0}: must be between 2 and 64")]
    InvalidHashSize(u32),

    #[error("Failed to create destination folder {}: {source}", .path.display())]
    CreateDestination {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to delete {}: {source}", .path.display())]
    Delete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to move {} → {}: {source}", .from.display(), .to.display())]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Duplicate {} has no file name", .0.display())]
    NoFileName(PathBuf),

    #[error("Not a file: {}", .0.display())]
    NotAFile(PathBuf),
}

impl DedupeError {
    /// Configuration errors abort a run before any file is touched.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            DedupeError::FolderNotFound(_)
                | DedupeError::NotADirectory(_)
                | DedupeError::InvalidHashSize(_)
                | DedupeError::CreateDestination { .. }
        )
    }

    /// Per-file classification, `None` for configuration errors.
    pub fn file_error_kind(&self) -> Option<FileErrorKind> {
        match self {
            DedupeError::Open { .. } | DedupeError::Decode { .. } => Some(FileErrorKind::Decode),
            DedupeError::Delete { .. } | DedupeError::NotAFile(_) => Some(FileErrorKind::Delete),
            DedupeError::Move { .. } | DedupeError::NoFileName(_) => Some(FileErrorKind::Move),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, DedupeError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileErrorKind {
    Decode,
    Delete,
    Move,
}

/// A failure tied to a single file. Recorded in the report, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileError {
    pub path: PathBuf,
    pub kind: FileErrorKind,
    pub message: String,
}

impl FileError {
    pub fn new(path: &Path, kind: FileErrorKind, error: &DedupeError) -> Self {
        Self {
            path: path.to_path_buf(),
            kind,
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_errors_are_fatal() {
        assert!(DedupeError::FolderNotFound(PathBuf::from("missing")).is_configuration());
        assert!(DedupeError::InvalidHashSize(0).is_configuration());

        let delete = DedupeError::Delete {
            path: PathBuf::from("a.png"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert!(!delete.is_configuration());
        assert_eq!(delete.file_error_kind(), Some(FileErrorKind::Delete));
    }

    #[test]
    fn test_file_error_serializes_kind_lowercase() {
        let err = DedupeError::NoFileName(PathBuf::from("/"));
        let file_error = FileError::new(Path::new("/"), FileErrorKind::Move, &err);
        let json = serde_json::to_string(&file_error).unwrap();
        assert!(json.contains("\"kind\":\"move\""));
        assert!(json.contains("has no file name"));
    }
}
