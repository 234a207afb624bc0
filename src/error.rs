// Fatal configuration errors. Anything in here aborts the run before the
// first upload is attempted; per-file failures never surface as `Error`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The source directory is missing or is not a directory.
    #[error("Directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    /// The source directory exists but its listing can't be read.
    #[error("cannot read directory {}", .path.display())]
    UnreadableDirectory {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("invalid endpoint URL {url:?}: {source}")]
    InvalidEndpoint {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("unsupported endpoint scheme {scheme:?} in {url:?} (expected http or https)")]
    UnsupportedScheme { url: String, scheme: String },

    #[error("invalid header {header:?}: {reason}")]
    InvalidHeader { header: String, reason: String },

    #[error("concurrency must be at least 1")]
    InvalidConcurrency,

    #[error("timeout must be at least 1 second")]
    InvalidTimeout,

    #[error("failed to build HTTP client")]
    HttpClient(#[from] reqwest::Error),

    #[error("failed to start the I/O runtime")]
    Runtime(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
