use indicatif::ProgressBar;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Recursively walk `dir`, returning image files in discovery order.
///
/// Entries are visited sorted by file name so that repeated runs over the
/// same tree see the same order. Unreadable entries are logged and skipped.
pub fn scan_images(dir: &Path, extensions: &[String], progress: &ProgressBar) -> Vec<PathBuf> {
    let images = scan_matching(dir, progress, |path| {
        path.is_file() && has_allowed_extension(path, extensions)
    });
    log::info!("Found {} candidate images under {}", images.len(), dir.display());
    images
}

/// Every entry under `dir` (the root excluded) for which `keep` holds, in the
/// same sorted discovery order as [`scan_images`]. Directories are offered too.
pub fn scan_matching(
    dir: &Path,
    progress: &ProgressBar,
    keep: impl Fn(&Path) -> bool,
) -> Vec<PathBuf> {
    let mut found = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Skipping unreadable entry under {}: {}", dir.display(), e);
                continue;
            }
        };
        progress.tick();

        if keep(entry.path()) {
            found.push(entry.into_path());
        }
    }
    found
}

fn has_allowed_extension(path: &Path, allowed: &[String]) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| allowed.iter().any(|a| a.eq_ignore_ascii_case(ext)))
}
