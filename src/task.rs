// Data model shared by the scanner, the uploader and the dispatcher.
// A task is created once by the scanner and moved through the worker
// queue; every task comes back exactly once wrapped in an UploadResult.

use serde::Serialize;
use std::path::{Path, PathBuf};

/// One file slated for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTask {
    pub path: PathBuf,
    /// File name used for display and as the multipart filename.
    pub display_name: String,
    /// Size observed at scan time. Informational only.
    pub size: Option<u64>,
}

impl UploadTask {
    /// Build a task from a path, reading the size from metadata if possible.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let size = std::fs::metadata(&path).ok().map(|m| m.len());
        Self {
            display_name: display_name(&path),
            path,
            size,
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// What happened to a single upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The endpoint answered 200 or 201.
    Success { status: u16, body: String },
    /// Anything else, with a human readable diagnostic.
    Failure(String),
}

impl UploadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, UploadOutcome::Success { .. })
    }
}

#[derive(Debug, Clone)]
pub struct UploadResult {
    pub task: UploadTask,
    pub outcome: UploadOutcome,
}

/// Aggregate counts for a full run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub success: usize,
    pub failure: usize,
}

impl RunSummary {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub fn record_success(&mut self) {
        self.success += 1;
    }

    pub fn record_failure(&mut self) {
        self.failure += 1;
    }

    /// True once every task has been accounted for.
    pub fn is_complete(&self) -> bool {
        self.success + self.failure == self.total
    }
}
