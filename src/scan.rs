// File enumeration: lists regular files under a root, flat or recursive,
// optionally keeping only some extensions.

use crate::error::{Error, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Normalized set of extensions: lowercase, each with a leading dot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionFilter(HashSet<String>);

impl ExtensionFilter {
    /// Build a filter from raw entries like `jpg`, `.PNG` or ` pdf `.
    /// Blank entries are dropped.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set = entries
            .into_iter()
            .filter_map(|e| normalize_extension(e.as_ref()))
            .collect();
        Self(set)
    }

    /// Parse a comma-separated list such as `jpg,png,pdf`.
    pub fn parse(list: &str) -> Self {
        Self::new(list.split(','))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Case-insensitive suffix match against the last extension of `path`.
    pub fn matches(&self, path: &Path) -> bool {
        match path.extension() {
            Some(ext) => {
                let ext = format!(".{}", ext.to_string_lossy().to_lowercase());
                self.0.contains(&ext)
            }
            None => false,
        }
    }
}

fn normalize_extension(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "." {
        return None;
    }
    let lower = raw.to_lowercase();
    if lower.starts_with('.') {
        Some(lower)
    } else {
        Some(format!(".{}", lower))
    }
}

/// List files under `root`.
///
/// Without `recursive` only the direct children that are regular files are
/// returned. With a filter, a file is kept iff its extension is in the set,
/// so an empty filter keeps nothing; `None` keeps everything. Order follows
/// directory iteration and is not stable. A root whose listing can't be read
/// is an error; unreadable entries below it are skipped.
pub fn enumerate(
    root: &Path,
    filter: Option<&ExtensionFilter>,
    recursive: bool,
) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(Error::DirectoryNotFound(root.to_path_buf()));
    }

    let mut walker = WalkDir::new(root).min_depth(1);
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => {
                return Err(Error::UnreadableDirectory {
                    path: root.to_path_buf(),
                    source: err,
                });
            }
            Err(err) => {
                tracing::warn!("skipping unreadable entry: {}", err);
                continue;
            }
        };
        // Follows symlinks, so a link to a regular file counts as a file.
        if !entry.path().is_file() {
            continue;
        }
        if filter.map_or(true, |f| f.matches(entry.path())) {
            files.push(entry.into_path());
        }
    }

    tracing::debug!("scanned {}: {} matching files", root.display(), files.len());
    Ok(files)
}
