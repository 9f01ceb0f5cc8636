//! Locating the finished file in a job's working directory.

use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};

use crate::command::BEST_QUALITY;

use super::error::JobError;

const TEMP_MARKERS: &[&str] = &[".part", ".temp", ".ytdl"];
const THUMBNAIL_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

/// Whether a file name is a leftover rather than the result.
pub fn is_excluded(file_name: &str) -> bool {
    let name = file_name.to_ascii_lowercase();

    if TEMP_MARKERS.iter().any(|marker| name.contains(marker)) {
        return true;
    }

    if has_fragment_marker(&name) {
        return true;
    }

    Path::new(&name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| THUMBNAIL_EXTENSIONS.contains(&ext))
}

/// `.f137` style per-format intermediate files.
fn has_fragment_marker(name: &str) -> bool {
    name.match_indices(".f").any(|(i, _)| {
        name[i + 2..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit())
    })
}

/// Finds the result file in `dir`. With several candidates the most
/// recently modified one wins, ties broken by name.
pub async fn locate_result(dir: &Path) -> Result<PathBuf, JobError> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(JobError::ResultNotFound {
                dir: dir.to_path_buf(),
            })
        }
        Err(e) => return Err(JobError::Io(e)),
    };

    let mut best: Option<(SystemTime, PathBuf)> = None;

    while let Some(entry) = entries.next_entry().await? {
        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy().to_string();
        if is_excluded(&file_name) {
            debug!(file = %file_name, "Skipping leftover file");
            continue;
        }

        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        let path = entry.path();
        let newer = match &best {
            None => true,
            Some((best_time, best_path)) => {
                modified > *best_time || (modified == *best_time && path < *best_path)
            }
        };
        if newer {
            best = Some((modified, path));
        }
    }

    best.map(|(_, path)| path).ok_or_else(|| JobError::ResultNotFound {
        dir: dir.to_path_buf(),
    })
}

/// `name [quality].ext` for an explicit quality not already in the name.
pub fn name_with_quality(path: &Path, quality: Option<&str>) -> Option<PathBuf> {
    let quality = quality.map(str::trim).filter(|q| !q.is_empty() && *q != BEST_QUALITY)?;

    let stem = path.file_stem()?.to_string_lossy();
    if stem.contains(quality) {
        return None;
    }

    let file_name = match path.extension() {
        Some(ext) => format!("{} [{}].{}", stem, quality, ext.to_string_lossy()),
        None => format!("{} [{}]", stem, quality),
    };
    Some(path.with_file_name(file_name))
}

/// Renames the result to carry its quality. A failed rename keeps the
/// original path.
pub async fn apply_quality_suffix(path: PathBuf, quality: Option<&str>) -> PathBuf {
    let Some(renamed) = name_with_quality(&path, quality) else {
        return path;
    };

    match tokio::fs::rename(&path, &renamed).await {
        Ok(()) => renamed,
        Err(e) => {
            warn!(
                from = %path.display(),
                to = %renamed.display(),
                error = %e,
                "Failed to rename file with resolution"
            );
            path
        }
    }
}
