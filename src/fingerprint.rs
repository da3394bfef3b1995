use crate::config::HashAlgorithm;
use crate::error::{DedupeError, FileError, Result};
use image::{DynamicImage, ImageReader};
use image_hasher::{HashAlg, Hasher, HasherConfig};
use indicatif::ProgressBar;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Perceptual fingerprint rendered as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into().to_lowercase())
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(bytes.iter().map(|b| format!("{:02x}", b)).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of positions at which the two renderings differ.
    /// Fingerprints of different lengths are not comparable.
    pub fn distance(&self, other: &Fingerprint) -> Option<u32> {
        if self.0.len() != other.0.len() {
            return None;
        }
        let differing = self
            .0
            .bytes()
            .zip(other.0.bytes())
            .filter(|(a, b)| a != b)
            .count();
        Some(differing as u32)
    }

    pub fn within(&self, other: &Fingerprint, max_distance: u32) -> bool {
        self.distance(other).is_some_and(|d| d <= max_distance)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub path: PathBuf,
    pub fingerprint: Fingerprint,
}

pub struct FingerprintHasher {
    hasher: Hasher,
    algorithm: HashAlgorithm,
    hash_size: u32,
}

impl FingerprintHasher {
    pub fn new(algorithm: HashAlgorithm, hash_size: u32) -> Self {
        let config = HasherConfig::new().hash_size(hash_size, hash_size);
        let config = match algorithm {
            HashAlgorithm::Phash => config.hash_alg(HashAlg::Median).preproc_dct(),
            HashAlgorithm::Ahash => config.hash_alg(HashAlg::Mean),
            HashAlgorithm::Dhash => config.hash_alg(HashAlg::Gradient),
        };

        Self {
            hasher: config.to_hasher(),
            algorithm,
            hash_size,
        }
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    pub fn hash_size(&self) -> u32 {
        self.hash_size
    }

    pub fn fingerprint_image(&self, img: &DynamicImage) -> Fingerprint {
        Fingerprint::from_bytes(self.hasher.hash_image(img).as_bytes())
    }

    pub fn fingerprint_file(&self, path: &Path) -> Result<Fingerprint> {
        let img = ImageReader::open(path)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(|source| DedupeError::Open {
                path: path.to_path_buf(),
                source,
            })?
            .decode()
            .map_err(|source| DedupeError::Decode {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(self.fingerprint_image(&normalize_color(img)))
    }
}

impl Default for FingerprintHasher {
    fn default() -> Self {
        Self::new(HashAlgorithm::default(), crate::config::DEFAULT_HASH_SIZE)
    }
}

/// Anything other than 8-bit RGB or 8-bit grayscale is converted to 8-bit RGB.
fn normalize_color(img: DynamicImage) -> DynamicImage {
    match img {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageLuma8(_) => img,
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    }
}

/// Result of hashing a list of files.
#[derive(Debug, Default)]
pub struct FingerprintBatch {
    /// One record per decoded file, in input order.
    pub records: Vec<ImageRecord>,
    pub errors: Vec<FileError>,
}

/// Hash every path in parallel. Output order matches `paths`; files that
/// cannot be opened or decoded are logged and collected as errors.
pub fn fingerprint_files(
    paths: &[PathBuf],
    hasher: &FingerprintHasher,
    progress: &ProgressBar,
) -> FingerprintBatch {
    let results: Vec<(PathBuf, Result<Fingerprint>)> = paths
        .par_iter()
        .map(|path| {
            let result = hasher.fingerprint_file(path);
            progress.inc(1);
            (path.clone(), result)
        })
        .collect();

    let mut batch = FingerprintBatch::default();
    for (path, result) in results {
        match result {
            Ok(fingerprint) => batch.records.push(ImageRecord { path, fingerprint }),
            Err(e) => {
                log::warn!("Error processing {}: {}", path.display(), e);
                if let Some(kind) = e.file_error_kind() {
                    batch.errors.push(FileError::new(&path, kind, &e));
                }
            }
        }
    }
    batch
}

/// Fingerprint → paths, ordered by first discovery of each fingerprint.
#[derive(Debug, Default, Clone)]
pub struct FingerprintIndex {
    entries: Vec<(Fingerprint, Vec<PathBuf>)>,
    positions: HashMap<Fingerprint, usize>,
}

impl FingerprintIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = ImageRecord>) -> Self {
        let mut index = Self::new();
        for record in records {
            index.insert(record.fingerprint, record.path);
        }
        index
    }

    pub fn insert(&mut self, fingerprint: Fingerprint, path: PathBuf) {
        match self.positions.get(&fingerprint) {
            Some(&pos) => self.entries[pos].1.push(path),
            None => {
                self.positions.insert(fingerprint.clone(), self.entries.len());
                self.entries.push((fingerprint, vec![path]));
            }
        }
    }

    /// Number of unique fingerprints.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn paths(&self, fingerprint: &Fingerprint) -> Option<&[PathBuf]> {
        self.positions
            .get(fingerprint)
            .map(|&pos| self.entries[pos].1.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Fingerprint, &[PathBuf])> {
        self.entries.iter().map(|(f, p)| (f, p.as_slice()))
    }

    pub fn fingerprints(&self) -> impl Iterator<Item = &Fingerprint> {
        self.entries.iter().map(|(f, _)| f)
    }
}
