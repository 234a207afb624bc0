// Command-line surface and the top-level run: validate the directory and
// endpoint, scan, dispatch, then report. Only configuration problems
// return Err; failed uploads are counted in the summary and logged.

use crate::api::ApiClient;
use crate::config::{UploadConfig, DEFAULT_CONCURRENCY, DEFAULT_TIMEOUT_SECS};
use crate::dispatch::Dispatcher;
use crate::error::Error;
use crate::logging::DEFAULT_LOG_FILE;
use crate::scan::{self, ExtensionFilter};
use crate::task::{RunSummary, UploadTask};
use crate::ui::ProgressObserver;
use anyhow::{Context, Result};
use clap::builder::RangedU64ValueParser;
use clap::Parser;
use std::path::PathBuf;

/// Upload files from a directory to an API endpoint.
#[derive(Debug, Parser)]
#[command(name = "file-uploader", version)]
#[command(about = "Upload files from a directory to an API endpoint", long_about = None)]
pub struct Cli {
    /// Directory containing files to upload.
    #[arg(short, long)]
    pub directory: PathBuf,

    /// API endpoint URL.
    #[arg(short, long, visible_alias = "endpoint", env = "UPLOAD_ENDPOINT")]
    pub url: String,

    /// Comma-separated list of file extensions to include (e.g. jpg,png,pdf).
    #[arg(short, long)]
    pub extensions: Option<String>,

    /// Scan subdirectories recursively.
    #[arg(short, long)]
    pub recursive: bool,

    /// Number of concurrent upload threads.
    #[arg(
        short,
        long,
        visible_alias = "concurrency",
        default_value_t = DEFAULT_CONCURRENCY,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub threads: usize,

    /// Request timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// Additional headers in key:value format.
    #[arg(long, num_args = 0..)]
    pub headers: Vec<String>,

    /// File that receives a copy of every log line.
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,

    /// Don't draw the progress bar.
    #[arg(long)]
    pub no_progress: bool,

    /// Print the final summary as JSON on stdout. Log lines go to stderr,
    /// so stdout carries only the JSON.
    #[arg(long)]
    pub summary_json: bool,

    /// Log per-request details.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Run and, if asked, print the summary as JSON.
    pub fn execute(&self) -> Result<()> {
        let summary = self.run()?;
        if self.summary_json {
            let json = serde_json::to_string(&summary).context("serializing summary")?;
            println!("{}", json);
        }
        Ok(())
    }

    pub fn run(&self) -> Result<RunSummary> {
        if !self.directory.is_dir() {
            return Err(Error::DirectoryNotFound(self.directory.clone()).into());
        }

        let config = UploadConfig::new(&self.url, &self.headers, self.timeout, self.threads)?;

        // Only an absent or empty value means "no filter"; a list that
        // normalises to nothing (e.g. ",") keeps no files.
        let filter = self
            .extensions
            .as_deref()
            .filter(|list| !list.is_empty())
            .map(ExtensionFilter::parse);
        if filter.as_ref().map_or(false, ExtensionFilter::is_empty) {
            tracing::warn!("Extension list names no extensions; no file will match");
        }

        let files = scan::enumerate(&self.directory, filter.as_ref(), self.recursive)?;
        if files.is_empty() {
            tracing::warn!("No files found in {}", self.directory.display());
            return Ok(RunSummary::default());
        }
        tracing::info!("Found {} files to upload", files.len());

        let tasks: Vec<UploadTask> = files.into_iter().map(UploadTask::from_path).collect();
        let client = ApiClient::new(&config)?;
        tracing::debug!(
            "posting to {} with {} workers, timeout {}s",
            client.endpoint(),
            config.concurrency,
            self.timeout
        );

        let mut observer = ProgressObserver::new(tasks.len(), !self.no_progress)?;
        let summary = Dispatcher::new(&client, config.concurrency).run(tasks, &mut observer);
        observer.finish();

        tracing::info!(
            "Upload complete: {} successful, {} failed",
            summary.success,
            summary.failure
        );
        if summary.failure > 0 {
            tracing::info!(
                "Check {} for details on failed uploads",
                self.log_file.display()
            );
        }

        Ok(summary)
    }
}
