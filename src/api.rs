// API client module: POSTs one file at a time to the configured endpoint as
// multipart/form-data. Every fault on the way (file open, connect, stall,
// non-2xx) comes back as an `UploadOutcome::Failure` rather than an error.
//
// Callers are plain worker threads; each upload is driven to completion on
// a shared runtime with `block_on`, so from the worker's side it is one
// blocking call. The timeout bounds connecting and any stretch with no
// bytes moving, not the length of the whole transfer.

use crate::config::UploadConfig;
use crate::error::{Error, Result};
use crate::task::{UploadOutcome, UploadTask};
use futures::TryStreamExt;
use reqwest::header::HeaderMap;
use reqwest::{multipart, Body, Client};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::runtime::Runtime;
use tokio_util::io::ReaderStream;
use url::Url;

/// Multipart field name carrying the file.
pub const FILE_FIELD: &str = "file";
/// Content type sent for every file part.
pub const FILE_MIME: &str = "application/octet-stream";

/// Anything that can push a single task somewhere and report how it went.
/// Implementations must not panic on I/O or network faults.
pub trait Uploader: Sync {
    fn upload(&self, task: &UploadTask) -> UploadOutcome;
}

/// Why a single transfer failed. Only its `Display` leaves this module.
#[derive(Debug, Error)]
enum TransferError {
    #[error("cannot open {}: {source}", .path.display())]
    Open { path: PathBuf, source: io::Error },

    #[error("request timed out after {}s: {}", .timeout.as_secs(), error_chain(.source))]
    Timeout {
        timeout: Duration,
        source: reqwest::Error,
    },

    #[error("request timed out after {}s with no data moving", .timeout.as_secs())]
    Stalled { timeout: Duration },

    #[error("{}", error_chain(.0))]
    Request(reqwest::Error),

    #[error("HTTP {code}: {body}")]
    Status { code: u16, body: String },
}

/// Flatten an error and its sources into one line. reqwest tends to hide
/// the useful part (refused, reset, dns) a level or two down.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut msg = err.to_string();
    let mut current = err.source();
    while let Some(cause) = current {
        let text = cause.to_string();
        if !msg.contains(&text) {
            msg.push_str(": ");
            msg.push_str(&text);
        }
        current = cause.source();
    }
    msg
}

/// When bytes last moved in either direction, relative to request start.
struct Activity {
    origin: Instant,
    last_ms: AtomicU64,
}

impl Activity {
    fn new() -> Self {
        Self {
            origin: Instant::now(),
            last_ms: AtomicU64::new(0),
        }
    }

    fn touch(&self) {
        let now = self.origin.elapsed().as_millis() as u64;
        self.last_ms.fetch_max(now, Ordering::Relaxed);
    }

    fn idle(&self) -> Duration {
        let last = Duration::from_millis(self.last_ms.load(Ordering::Relaxed));
        self.origin.elapsed().saturating_sub(last)
    }
}

/// Resolves once nothing has moved for `limit`.
async fn stalled(activity: &Activity, limit: Duration) {
    loop {
        let idle = activity.idle();
        if idle >= limit {
            return;
        }
        tokio::time::sleep(limit - idle).await;
    }
}

/// Uploader shared by all workers. Idle connections are not kept so each
/// connection lives for exactly one request.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    runtime: Arc<Runtime>,
    endpoint: Url,
    headers: HeaderMap,
    timeout: Duration,
}

impl ApiClient {
    pub fn new(config: &UploadConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("upload-io")
            .build()
            .map_err(Error::Runtime)?;
        let client = Client::builder()
            .connect_timeout(config.timeout)
            .pool_max_idle_per_host(0)
            .build()?;
        Ok(ApiClient {
            client,
            runtime: Arc::new(runtime),
            endpoint: config.endpoint.clone(),
            headers: config.headers.clone(),
            timeout: config.timeout,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn classify(&self, err: reqwest::Error) -> TransferError {
        if err.is_timeout() {
            TransferError::Timeout {
                timeout: self.timeout,
                source: err,
            }
        } else {
            TransferError::Request(err)
        }
    }

    /// Send one file. The handle is owned by the body stream and dropped
    /// with the request, whatever the result.
    async fn send_file(&self, task: &UploadTask) -> std::result::Result<(u16, String), TransferError> {
        let open_err = |source: io::Error| TransferError::Open {
            path: task.path.clone(),
            source,
        };
        let file = File::open(&task.path).map_err(open_err)?;
        let len = file.metadata().map_err(open_err)?.len();

        tracing::debug!("Uploading {} ({} bytes)", task.display_name, len);

        let activity = Arc::new(Activity::new());
        let stream = {
            let activity = Arc::clone(&activity);
            ReaderStream::new(tokio::fs::File::from_std(file)).inspect_ok(move |_| activity.touch())
        };
        let part = multipart::Part::stream_with_length(Body::wrap_stream(stream), len)
            .file_name(task.display_name.clone())
            .mime_str(FILE_MIME)
            .map_err(TransferError::Request)?;
        let form = multipart::Form::new().part(FILE_FIELD, part);

        let exchange = async {
            // Caller headers go on last so they replace anything set by the form.
            let mut res = self
                .client
                .post(self.endpoint.clone())
                .multipart(form)
                .headers(self.headers.clone())
                .send()
                .await
                .map_err(|e| self.classify(e))?;
            activity.touch();

            let status = res.status().as_u16();
            let mut body = Vec::new();
            while let Ok(Some(chunk)) = res.chunk().await {
                activity.touch();
                body.extend_from_slice(&chunk);
            }
            Ok::<_, TransferError>((status, String::from_utf8_lossy(&body).into_owned()))
        };

        let (status, body) = tokio::select! {
            res = exchange => res?,
            _ = stalled(&activity, self.timeout) => {
                return Err(TransferError::Stalled { timeout: self.timeout });
            }
        };
        match status {
            200 | 201 => Ok((status, body)),
            code => Err(TransferError::Status { code, body }),
        }
    }
}

impl Uploader for ApiClient {
    fn upload(&self, task: &UploadTask) -> UploadOutcome {
        match self.runtime.block_on(self.send_file(task)) {
            Ok((status, body)) => UploadOutcome::Success { status, body },
            Err(err) => UploadOutcome::Failure(err.to_string()),
        }
    }
}
