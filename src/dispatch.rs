// Run uploads concurrently with a fixed number of workers.
//
// All tasks are queued up front on a channel; `concurrency` worker threads
// pull from it and send results back as they complete. The calling thread is
// the single owner of the summary: it hands each result to the observer and
// folds it into the counts, and only returns once every task is accounted
// for.

use crate::api::Uploader;
use crate::task::{RunSummary, UploadOutcome, UploadResult, UploadTask};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread;

/// Called once per finished task, in completion order, on the dispatching
/// thread. An error here marks the task as failed but does not stop the run.
pub trait UploadObserver {
    fn on_result(&mut self, result: &UploadResult) -> anyhow::Result<()>;
}

impl<F> UploadObserver for F
where
    F: FnMut(&UploadResult) -> anyhow::Result<()>,
{
    fn on_result(&mut self, result: &UploadResult) -> anyhow::Result<()> {
        self(result)
    }
}

pub struct Dispatcher<'a, U: Uploader + ?Sized> {
    uploader: &'a U,
    concurrency: usize,
}

impl<'a, U: Uploader + ?Sized> Dispatcher<'a, U> {
    pub fn new(uploader: &'a U, concurrency: usize) -> Self {
        Self {
            uploader,
            concurrency: concurrency.max(1),
        }
    }

    pub fn run(&self, tasks: Vec<UploadTask>, observer: &mut dyn UploadObserver) -> RunSummary {
        let total = tasks.len();
        let mut summary = RunSummary::new(total);
        if total == 0 {
            return summary;
        }

        let workers = self.concurrency.min(total);
        tracing::debug!("dispatching {} tasks across {} workers", total, workers);

        let (task_tx, task_rx) = bounded::<UploadTask>(total);
        for task in tasks {
            // Capacity is `total` and the receiver is alive, so this cannot block or fail.
            let _ = task_tx.send(task);
        }
        drop(task_tx);

        let (result_tx, result_rx) = unbounded::<UploadResult>();
        let uploader = self.uploader;

        thread::scope(|scope| {
            for id in 0..workers {
                let task_rx = task_rx.clone();
                let result_tx = result_tx.clone();
                scope.spawn(move || worker_loop(id, uploader, task_rx, result_tx));
            }
            drop(result_tx);

            for result in result_rx.iter() {
                if observe(observer, &result) {
                    summary.record_success();
                } else {
                    summary.record_failure();
                }
            }
        });

        if !summary.is_complete() {
            let missing = total - summary.success - summary.failure;
            tracing::error!("{} uploads produced no result; counting them as failed", missing);
            for _ in 0..missing {
                summary.record_failure();
            }
        }

        summary
    }
}

fn worker_loop<U: Uploader + ?Sized>(
    id: usize,
    uploader: &U,
    tasks: Receiver<UploadTask>,
    results: Sender<UploadResult>,
) {
    while let Ok(task) = tasks.recv() {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| uploader.upload(&task)))
            .unwrap_or_else(|payload| {
                UploadOutcome::Failure(format!("upload panicked: {}", panic_message(&*payload)))
            });
        if results.send(UploadResult { task, outcome }).is_err() {
            break;
        }
    }
    tracing::trace!("worker {} drained the queue", id);
}

/// Hand a result to the observer; returns whether it counts as a success.
fn observe(observer: &mut dyn UploadObserver, result: &UploadResult) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(|| observer.on_result(result))) {
        Ok(Ok(())) => result.outcome.is_success(),
        Ok(Err(err)) => {
            tracing::error!("Error processing {}: {:#}", result.task.display_name, err);
            false
        }
        Err(payload) => {
            tracing::error!(
                "Error processing {}: observer panicked: {}",
                result.task.display_name,
                panic_message(&*payload)
            );
            false
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
