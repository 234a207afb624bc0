// Library root
// ------------
// The binary (`main.rs`) is a thin wrapper over `cli::Cli`; everything it
// does is reachable from here so it can be driven from tests.
//
// Module responsibilities:
// - `scan`: find the files to upload (flat or recursive, extension filter).
// - `api`: the `Uploader` seam and the blocking multipart `ApiClient`.
// - `dispatch`: bounded worker pool that runs uploads and folds results
//   into a `RunSummary`, reporting each one to an `UploadObserver`.
// - `ui`: default observer (progress bar + per-file log lines).
// - `config`, `cli`, `logging`, `error`: the ambient plumbing.
pub mod api;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod scan;
pub mod task;
pub mod ui;

pub use error::{Error, Result};
