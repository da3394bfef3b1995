use crate::error::{DedupeError, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_HASH_SIZE: u32 = 8;
pub const DEFAULT_MAX_DISTANCE: u32 = 5;
pub const MIN_HASH_SIZE: u32 = 2;
pub const MAX_HASH_SIZE: u32 = 64;

/// Extensions considered images, compared case-insensitively.
pub const DEFAULT_EXTENSIONS: [&str; 7] = ["jpg", "jpeg", "png", "gif", "bmp", "tiff", "webp"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// DCT-based perceptual hash
    #[default]
    Phash,
    /// Mean (average) hash
    Ahash,
    /// Gradient (difference) hash
    Dhash,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum GroupingStrategy {
    /// Pair each fingerprint with the first later fingerprint in range, at most once
    #[default]
    FirstMatch,
    /// Cluster every fingerprint reachable through in-range neighbours
    Transitive,
}

/// What happens to the duplicates of each group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "mode", content = "destination")]
pub enum DuplicateAction {
    Delete,
    Move(PathBuf),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupeConfig {
    pub folder: PathBuf,
    pub hash_size: u32,
    pub max_distance: u32,
    pub algorithm: HashAlgorithm,
    pub strategy: GroupingStrategy,
    pub move_to: Option<PathBuf>,
    pub extensions: Vec<String>,
    pub dry_run: bool,
}

impl DedupeConfig {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
            hash_size: DEFAULT_HASH_SIZE,
            max_distance: DEFAULT_MAX_DISTANCE,
            algorithm: HashAlgorithm::default(),
            strategy: GroupingStrategy::default(),
            move_to: None,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            dry_run: false,
        }
    }

    pub fn action(&self) -> DuplicateAction {
        match &self.move_to {
            Some(dir) => DuplicateAction::Move(dir.clone()),
            None => DuplicateAction::Delete,
        }
    }

    /// Check everything that must hold before a run starts touching files.
    /// Creates the move destination when it is missing (skipped on dry runs).
    pub fn validate(&self) -> Result<()> {
        validate_folder(&self.folder)?;
        validate_hash_size(self.hash_size)?;

        if let Some(dest) = &self.move_to {
            if !self.dry_run && !dest.exists() {
                fs::create_dir_all(dest).map_err(|source| DedupeError::CreateDestination {
                    path: dest.clone(),
                    source,
                })?;
            }
        }
        Ok(())
    }
}

/// Settings for the read-only cross-split overlap check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlapConfig {
    pub folders: Vec<PathBuf>,
    pub hash_size: u32,
    pub algorithm: HashAlgorithm,
    pub extensions: Vec<String>,
}

impl OverlapConfig {
    pub fn new(folders: Vec<PathBuf>) -> Self {
        Self {
            folders,
            hash_size: DEFAULT_HASH_SIZE,
            algorithm: HashAlgorithm::Ahash,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        for folder in &self.folders {
            validate_folder(folder)?;
        }
        validate_hash_size(self.hash_size)
    }
}

pub(crate) fn validate_folder(folder: &Path) -> Result<()> {
    if !folder.exists() {
        return Err(DedupeError::FolderNotFound(folder.to_path_buf()));
    }
    if !folder.is_dir() {
        return Err(DedupeError::NotADirectory(folder.to_path_buf()));
    }
    Ok(())
}

fn validate_hash_size(hash_size: u32) -> Result<()> {
    if !(MIN_HASH_SIZE..=MAX_HASH_SIZE).contains(&hash_size) {
        return Err(DedupeError::InvalidHashSize(hash_size));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = DedupeConfig::new("corpus");
        assert_eq!(config.hash_size, 8);
        assert_eq!(config.max_distance, 5);
        assert_eq!(config.algorithm, HashAlgorithm::Phash);
        assert_eq!(config.strategy, GroupingStrategy::FirstMatch);
        assert_eq!(config.action(), DuplicateAction::Delete);
        assert_eq!(config.extensions.len(), 7);
    }

    #[test]
    fn test_missing_folder_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let config = DedupeConfig::new(temp_dir.path().join("nope"));

        let err = config.validate().unwrap_err();
        assert!(matches!(err, DedupeError::FolderNotFound(_)));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_file_instead_of_folder_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("image.png");
        fs::write(&file, b"not a folder").unwrap();

        let err = DedupeConfig::new(&file).validate().unwrap_err();
        assert!(matches!(err, DedupeError::NotADirectory(_)));
    }

    #[test]
    fn test_hash_size_bounds() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = DedupeConfig::new(temp_dir.path());

        config.hash_size = 1;
        assert!(matches!(config.validate(), Err(DedupeError::InvalidHashSize(1))));

        config.hash_size = 16;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_move_destination_is_created() {
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("dups").join("nested");
        let mut config = DedupeConfig::new(temp_dir.path());
        config.move_to = Some(dest.clone());

        config.validate().unwrap();
        assert!(dest.is_dir());
        assert_eq!(config.action(), DuplicateAction::Move(dest));
    }

    #[test]
    fn test_dry_run_does_not_create_destination() {
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("dups");
        let mut config = DedupeConfig::new(temp_dir.path());
        config.move_to = Some(dest.clone());
        config.dry_run = true;

        config.validate().unwrap();
        assert!(!dest.exists());
    }
}
