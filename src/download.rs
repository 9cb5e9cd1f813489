use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::thread;

use crate::arguments;
use crate::dependencies::ToolPaths;
use crate::error::{QueueError, RunError};
use crate::models::{DownloadConfiguration, DownloadJob};
use crate::runner::{self, CancelToken};

/// Messages from a worker thread back to the UI thread.
#[derive(Debug)]
pub enum QueueEvent {
    JobStarted(DownloadJob),
    Output(String),
    JobFinished { index: usize },
    Failed(QueueError),
    Cancelled,
    Finished,
}

/// Runs `jobs` one after another on a background thread. The last event
/// sent is always one of `Finished`, `Failed` or `Cancelled`.
pub fn start_download(
    jobs: Vec<DownloadJob>,
    config: DownloadConfiguration,
    tools: ToolPaths,
    cancel: CancelToken,
    tx: Sender<QueueEvent>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let last = run_jobs(&jobs, &config, &tools, &cancel, &tx);
        let _ = tx.send(last);
    })
}

fn run_jobs(
    jobs: &[DownloadJob],
    config: &DownloadConfiguration,
    tools: &ToolPaths,
    cancel: &CancelToken,
    tx: &Sender<QueueEvent>,
) -> QueueEvent {
    for job in jobs {
        if cancel.is_cancelled() {
            return QueueEvent::Cancelled;
        }
        let _ = tx.send(QueueEvent::JobStarted(job.clone()));

        let args = match arguments::build(config, job, tools) {
            Ok(args) => args,
            Err(e) => return QueueEvent::Failed(e.into()),
        };
        debug!("{} {}", tools.downloader.display(), args.join(" "));

        let result = runner::run(
            &tools.downloader,
            &args,
            |line| {
                debug!("[{}/{}] {}", job.index, job.total, line);
                let _ = tx.send(QueueEvent::Output(line.to_string()));
            },
            cancel,
        );

        match result {
            Ok(_) => {
                info!("finished item {}/{}: {}", job.index, job.total, job.url);
                let _ = tx.send(QueueEvent::JobFinished { index: job.index });
            }
            Err(RunError::Cancelled) => return QueueEvent::Cancelled,
            Err(source) => {
                warn!("item {}/{} failed: {}", job.index, job.total, source);
                return QueueEvent::Failed(QueueError::Job {
                    url: job.url.clone(),
                    source,
                });
            }
        }
    }
    QueueEvent::Finished
}

/// Runs the downloader's self-update (`-U`), streaming its output.
pub fn update_ytdlp(
    downloader: PathBuf,
    cancel: CancelToken,
    tx: Sender<QueueEvent>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let result = runner::run(
            &downloader,
            &["-U".to_string()],
            |line| {
                let _ = tx.send(QueueEvent::Output(line.to_string()));
            },
            &cancel,
        );

        let last = match result {
            Ok(_) => QueueEvent::Finished,
            Err(RunError::Cancelled) => QueueEvent::Cancelled,
            Err(e) => QueueEvent::Failed(e.into()),
        };
        let _ = tx.send(last);
    })
}
