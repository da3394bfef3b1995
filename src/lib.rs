//! Near-duplicate image detection for cleaning training corpora.
//!
//! A run walks a folder, fingerprints every image with a perceptual hash,
//! groups fingerprints that are within a Hamming distance of each other,
//! keeps the first file of each group and deletes or moves the rest.

pub mod config;
pub mod error;
pub mod fingerprint;
pub mod grouping;
pub mod overlap;
pub mod purge;
pub mod report;
pub mod resolve;
pub mod scanner;

pub use config::{DedupeConfig, DuplicateAction, GroupingStrategy, HashAlgorithm, OverlapConfig};
pub use error::{DedupeError, FileError, FileErrorKind, Result};
pub use fingerprint::{Fingerprint, FingerprintHasher, FingerprintIndex, ImageRecord};
pub use grouping::{DuplicateGroup, group_duplicates};
pub use report::DedupeReport;

use chrono::Utc;
use indicatif::ProgressBar;

/// Fingerprints and groups of one folder, before any file is touched.
#[derive(Debug)]
pub struct Analysis {
    pub scanned_files: usize,
    pub unique_fingerprints: usize,
    pub groups: Vec<DuplicateGroup>,
    pub errors: Vec<FileError>,
}

impl Analysis {
    pub fn duplicate_files(&self) -> usize {
        grouping::duplicate_file_count(&self.groups)
    }

    /// Delete or move the duplicates according to `config` and build the report.
    pub fn resolve(self, config: &DedupeConfig) -> DedupeReport {
        let action = config.action();
        let resolution = resolve::resolve_groups(&self.groups, &action, config.dry_run);
        let duplicate_files = self.duplicate_files();

        let mut errors = self.errors;
        errors.extend(resolution.errors);

        DedupeReport {
            generated_at: Utc::now(),
            folder: config.folder.clone(),
            action,
            dry_run: config.dry_run,
            scanned_files: self.scanned_files,
            unique_fingerprints: self.unique_fingerprints,
            groups: self.groups,
            duplicate_files,
            resolved: resolution.files,
            errors,
        }
    }
}

/// Validate `config`, then scan, fingerprint and group `config.folder`.
///
/// Only configuration problems are returned as `Err`; files that cannot be
/// decoded are recorded in [`Analysis::errors`].
pub fn analyze(config: &DedupeConfig, progress: &ProgressBar) -> Result<Analysis> {
    config.validate()?;

    log::info!("Scanning {} for duplicate images", config.folder.display());
    progress.set_message("Scanning for images…");
    let paths = scanner::scan_images(&config.folder, &config.extensions, progress);

    progress.set_message("Hashing images…");
    progress.set_length(paths.len() as u64);
    progress.set_position(0);
    let hasher = FingerprintHasher::new(config.algorithm, config.hash_size);
    log::info!(
        "Hashing {} images with {:?} (hash size {})",
        paths.len(),
        hasher.algorithm(),
        hasher.hash_size()
    );
    let batch = fingerprint::fingerprint_files(&paths, &hasher, progress);
    progress.finish_and_clear();

    let index = FingerprintIndex::from_records(batch.records);
    log::info!("Found {} unique images", index.len());

    let groups = group_duplicates(&index, config.max_distance, config.strategy);
    log::info!(
        "Found {} duplicate images in {} groups",
        grouping::duplicate_file_count(&groups),
        groups.len()
    );

    Ok(Analysis {
        scanned_files: paths.len(),
        unique_fingerprints: index.len(),
        groups,
        errors: batch.errors,
    })
}

/// Run the whole pipeline over `config.folder`. Per-file failures end up in
/// [`DedupeReport::errors`]; the run never stops early because of one file.
pub fn run(config: &DedupeConfig, progress: &ProgressBar) -> Result<DedupeReport> {
    Ok(analyze(config, progress)?.resolve(config))
}
