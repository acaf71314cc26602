//! Project tree walker.
//!
//! Produces the files eligible for indexing: depth-first with stable name
//! order per directory, excluded and hidden directories pruned without
//! descent, files filtered to the configured extension set. Unreadable
//! entries become [`ScanWarning`]s instead of aborting the walk.

use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::config::Config;
use crate::error::ScanWarning;

/// A file selected for chunking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Absolute path on the local filesystem.
    pub absolute: PathBuf,
    /// Path relative to the project root, forward slashes.
    pub relative: String,
}

/// Walk `root` lazily, yielding indexable files and non-fatal warnings.
pub fn scan<'a>(
    root: &'a Path,
    config: &'a Config,
) -> impl Iterator<Item = Result<FileEntry, ScanWarning>> + 'a {
    WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(move |entry| keep_entry(entry, config))
        .filter_map(move |entry| match entry {
            Ok(entry) => {
                if !entry.file_type().is_file() {
                    return None;
                }
                if !has_indexable_extension(entry.path(), config) {
                    return None;
                }
                Some(Ok(FileEntry {
                    relative: relative_name(root, entry.path()),
                    absolute: entry.into_path(),
                }))
            }
            Err(err) => Some(Err(ScanWarning {
                path: err.path().map(Path::to_path_buf),
                message: err.to_string(),
            })),
        })
}

/// Directory pruning rule. The root itself always passes; files are decided
/// later by extension.
fn keep_entry(entry: &DirEntry, config: &Config) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return true;
    }
    let name = entry.file_name().to_string_lossy();
    if config.is_excluded_dir(&name) {
        return false;
    }
    if name.starts_with('.') && !config.is_hidden_whitelisted(&name) {
        return false;
    }
    true
}

fn has_indexable_extension(path: &Path, config: &Config) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            config
                .text_extensions
                .contains(&format!(".{}", ext.to_ascii_lowercase()))
        })
        .unwrap_or(false)
}

fn relative_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative.to_string_lossy().replace('\\', "/")
}
