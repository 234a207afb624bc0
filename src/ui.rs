// UI layer: the default observer. It logs one line per finished upload and
// advances an `indicatif` progress bar. Log lines are emitted with the bar
// suspended so the two don't interleave on the terminal.

use crate::dispatch::UploadObserver;
use crate::task::{UploadOutcome, UploadResult};
use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};

pub struct ProgressObserver {
    bar: ProgressBar,
}

impl ProgressObserver {
    /// Create an observer for `total` uploads. With `visible == false` the bar
    /// is hidden but log lines are still written.
    pub fn new(total: usize, visible: bool) -> Result<Self> {
        let bar = if visible {
            ProgressBar::new(total as u64)
        } else {
            ProgressBar::hidden()
        };
        bar.set_style(ProgressStyle::with_template(
            "{msg}: {percent:>3}%|{wide_bar}| {pos}/{len} [{elapsed_precise}<{eta_precise}]",
        )?);
        bar.set_message("Uploading files");
        Ok(Self { bar })
    }

    pub fn finish(&self) {
        self.bar.finish();
    }
}

impl UploadObserver for ProgressObserver {
    fn on_result(&mut self, result: &UploadResult) -> Result<()> {
        let name = &result.task.display_name;
        self.bar.suspend(|| match &result.outcome {
            UploadOutcome::Success { status, .. } => {
                tracing::info!("Successfully uploaded {}", name);
                tracing::debug!("{} answered HTTP {}", name, status);
            }
            UploadOutcome::Failure(msg) => {
                tracing::error!("Failed to upload {}: {}", name, msg);
            }
        });
        self.bar.inc(1);
        Ok(())
    }
}

impl Drop for ProgressObserver {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.abandon();
        }
    }
}
