//! Leakage check between dataset splits: images whose fingerprints appear in
//! more than one folder (for example the same picture in train and test).

use crate::config::OverlapConfig;
use crate::error::{FileError, Result};
use crate::fingerprint::{Fingerprint, FingerprintHasher, FingerprintIndex, fingerprint_files};
use crate::scanner::scan_images;
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overlap {
    pub fingerprint: Fingerprint,
    pub left: Vec<PathBuf>,
    pub right: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitOverlap {
    pub left: PathBuf,
    pub right: PathBuf,
    pub overlaps: Vec<Overlap>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OverlapReport {
    pub pairs: Vec<SplitOverlap>,
    pub errors: Vec<FileError>,
}

/// Fingerprints present in both indexes, in `left`'s discovery order.
pub fn find_overlaps(left: &FingerprintIndex, right: &FingerprintIndex) -> Vec<Overlap> {
    left.iter()
        .filter_map(|(fingerprint, left_paths)| {
            right.paths(fingerprint).map(|right_paths| Overlap {
                fingerprint: fingerprint.clone(),
                left: left_paths.to_vec(),
                right: right_paths.to_vec(),
            })
        })
        .collect()
}

/// Fingerprint every folder once, then compare each pair of folders.
pub fn check_splits(config: &OverlapConfig, progress: &ProgressBar) -> Result<OverlapReport> {
    config.validate()?;
    let hasher = FingerprintHasher::new(config.algorithm, config.hash_size);

    let mut report = OverlapReport::default();
    let mut indexes = Vec::with_capacity(config.folders.len());
    for folder in &config.folders {
        log::info!("Hashing {}", folder.display());
        let paths = scan_images(folder, &config.extensions, progress);
        let batch = fingerprint_files(&paths, &hasher, progress);
        report.errors.extend(batch.errors);
        indexes.push(FingerprintIndex::from_records(batch.records));
    }

    for i in 0..indexes.len() {
        for j in i + 1..indexes.len() {
            report.pairs.push(SplitOverlap {
                left: config.folders[i].clone(),
                right: config.folders[j].clone(),
                overlaps: find_overlaps(&indexes[i], &indexes[j]),
            });
        }
    }
    Ok(report)
}
