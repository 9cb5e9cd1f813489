//! Queue controller: the single owner of download state.
//!
//! The UI thread calls [`QueueController::poll`] every frame. Worker threads
//! never touch [`QueueState`]; they only send [`QueueEvent`]s, which `poll`
//! applies in order.

use log::{error, info, warn};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::dependencies::{Locator, ToolPaths};
use crate::download::{self, QueueEvent};
use crate::error::{DependencyError, QueueError, RunError, ValidationError};
use crate::log_buffer::{LogBuffer, DEFAULT_CAPACITY};
use crate::models::{DownloadConfiguration, DownloadJob};
use crate::progress;
use crate::runner::CancelToken;

/// Log lines attached to a failed job's error message.
const ERROR_CONTEXT_LINES: usize = 3;
/// How long [`QueueController::shutdown`] waits for workers to kill their
/// child process.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyStatus {
    Checking,
    Ready(ToolPaths),
    Failed(DependencyError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorSlot {
    pub message: Option<String>,
    pub show_alert: bool,
}

#[derive(Debug, Clone)]
pub struct QueueState {
    pub is_running: bool,
    /// 1-based index of the item being downloaded, 0 before the first.
    pub current_index: usize,
    pub total_items: usize,
    /// 0.0 - 1.0 for the current item.
    pub current_item_progress: f32,
    pub download_speed: String,
    pub eta: String,
    pub log: LogBuffer,
    pub error: ErrorSlot,
}

impl QueueState {
    fn with_log_capacity(capacity: usize) -> Self {
        Self {
            is_running: false,
            current_index: 0,
            total_items: 0,
            current_item_progress: 0.0,
            download_speed: String::new(),
            eta: String::new(),
            log: LogBuffer::with_capacity(capacity),
            error: ErrorSlot::default(),
        }
    }

    fn reset_progress(&mut self) {
        self.current_item_progress = 0.0;
        self.current_index = 0;
        self.total_items = 0;
        self.download_speed.clear();
        self.eta.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunKind {
    Queue,
    Update,
}

struct ActiveRun {
    kind: RunKind,
    cancel: CancelToken,
    events: Receiver<QueueEvent>,
    open_when_done: Option<PathBuf>,
    worker: JoinHandle<()>,
}

type FolderOpener = Box<dyn FnMut(&Path) -> io::Result<()> + Send>;

pub struct QueueController {
    state: QueueState,
    dependencies: DependencyStatus,
    dependency_rx: Option<Receiver<Result<ToolPaths, DependencyError>>>,
    active: Option<ActiveRun>,
    /// Cancelled workers that may still be killing their child.
    stopping: Vec<JoinHandle<()>>,
    open_folder: FolderOpener,
}

impl Default for QueueController {
    fn default() -> Self {
        Self::new()
    }
}

impl QueueController {
    pub fn new() -> Self {
        Self {
            state: QueueState::with_log_capacity(DEFAULT_CAPACITY),
            dependencies: DependencyStatus::Checking,
            dependency_rx: None,
            active: None,
            stopping: Vec::new(),
            open_folder: Box::new(open_in_file_manager),
        }
    }

    pub fn with_tools(mut self, tools: ToolPaths) -> Self {
        self.dependencies = DependencyStatus::Ready(tools);
        self
    }

    pub fn with_log_capacity(mut self, capacity: usize) -> Self {
        self.state.log = LogBuffer::with_capacity(capacity);
        self
    }

    pub fn with_folder_opener(
        mut self,
        opener: impl FnMut(&Path) -> io::Result<()> + Send + 'static,
    ) -> Self {
        self.open_folder = Box::new(opener);
        self
    }

    pub fn state(&self) -> &QueueState {
        &self.state
    }

    pub fn dependencies(&self) -> &DependencyStatus {
        &self.dependencies
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running
    }

    /// Locates (and if needed installs) the external tools on a background
    /// thread. The outcome is picked up by [`poll`](Self::poll).
    pub fn check_dependencies(&mut self, locator: Locator) {
        let (tx, rx) = mpsc::channel();
        self.dependencies = DependencyStatus::Checking;
        self.dependency_rx = Some(rx);
        self.state.log.push("Checking dependencies...");

        thread::spawn(move || {
            let _ = tx.send(locator.locate());
        });
    }

    /// Validates the request and starts downloading `urls` in order. On
    /// failure the error is also placed in the error slot and the queue
    /// stays idle.
    pub fn start(
        &mut self,
        urls: &[String],
        config: DownloadConfiguration,
    ) -> Result<(), QueueError> {
        if self.active.is_some() {
            warn!("ignoring start request while a run is active");
            return Err(ValidationError::AlreadyRunning.into());
        }
        self.try_start(urls, config).map_err(|err| {
            self.report_error(&err);
            err
        })
    }

    fn try_start(
        &mut self,
        urls: &[String],
        config: DownloadConfiguration,
    ) -> Result<(), QueueError> {
        let tools = self.ready_tools()?;
        let output_dir = config
            .output_directory
            .clone()
            .ok_or(ValidationError::MissingOutputDirectory)?;

        let urls: Vec<String> = urls
            .iter()
            .map(|url| url.trim())
            .filter(|url| !url.is_empty())
            .map(str::to_string)
            .collect();
        if urls.is_empty() {
            return Err(ValidationError::NoUrls.into());
        }

        let jobs = DownloadJob::from_urls(&urls);
        self.state.reset_progress();
        self.state.total_items = jobs.len();
        self.state.error = ErrorSlot::default();
        self.state.log.clear();
        self.state.log.push("Starting download...");
        self.state.is_running = true;
        info!(
            "starting queue of {} item(s) into {}",
            jobs.len(),
            output_dir.display()
        );

        let (tx, rx) = mpsc::channel();
        let cancel = CancelToken::new();
        let open_when_done = config.auto_open_folder.then_some(output_dir);
        let worker = download::start_download(jobs, config, tools, cancel.clone(), tx);

        self.active = Some(ActiveRun {
            kind: RunKind::Queue,
            cancel,
            events: rx,
            open_when_done,
            worker,
        });
        Ok(())
    }

    /// Runs the downloader's self-update with its output going to the log.
    pub fn update_downloader(&mut self) -> Result<(), QueueError> {
        if self.active.is_some() {
            warn!("ignoring update request while a run is active");
            return Err(ValidationError::AlreadyRunning.into());
        }
        let tools = self.ready_tools().map_err(|err| {
            self.report_error(&err);
            err
        })?;

        self.state.reset_progress();
        self.state.error = ErrorSlot::default();
        self.state.log.push("Updating yt-dlp...");
        self.state.is_running = true;

        let (tx, rx) = mpsc::channel();
        let cancel = CancelToken::new();
        let worker = download::update_ytdlp(tools.downloader, cancel.clone(), tx);
        self.active = Some(ActiveRun {
            kind: RunKind::Update,
            cancel,
            events: rx,
            open_when_done: None,
            worker,
        });
        Ok(())
    }

    fn ready_tools(&self) -> Result<ToolPaths, QueueError> {
        match &self.dependencies {
            DependencyStatus::Ready(tools) => Ok(tools.clone()),
            DependencyStatus::Failed(err) => Err(err.clone().into()),
            DependencyStatus::Checking => Err(QueueError::DependenciesPending),
        }
    }

    /// Stops the queue. The live process is killed by its worker; events it
    /// sends afterwards are discarded. Does nothing when idle.
    pub fn cancel(&mut self) {
        let Some(run) = self.active.take() else {
            return;
        };
        self.retire(run);
        self.state.is_running = false;
        self.state.reset_progress();
        self.state.log.push("Download canceled by user");
        info!("queue cancelled by user");
    }

    /// Applies everything the workers have sent since the last call.
    /// Returns true if anything changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = self.poll_dependencies();

        loop {
            let received = match &self.active {
                Some(run) => run.events.try_recv(),
                None => break,
            };
            match received {
                Ok(event) => {
                    changed = true;
                    self.apply(event);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    changed = true;
                    let err = QueueError::Run(RunError::Wait(io::Error::new(
                        io::ErrorKind::BrokenPipe,
                        "worker stopped unexpectedly",
                    )));
                    self.report_error(&err);
                    break;
                }
            }
        }
        changed
    }

    fn poll_dependencies(&mut self) -> bool {
        let Some(rx) = &self.dependency_rx else {
            return false;
        };
        let result = match rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return false,
            Err(TryRecvError::Disconnected) => Err(DependencyError::CheckAborted),
        };
        self.dependency_rx = None;

        match result {
            Ok(tools) => {
                self.state.log.push(format!(
                    "Using {} (post-processor in {})",
                    tools.downloader.display(),
                    tools.post_processor_dir.display()
                ));
                self.dependencies = DependencyStatus::Ready(tools);
            }
            Err(err) => {
                self.dependencies = DependencyStatus::Failed(err.clone());
                self.report_error(&QueueError::from(err));
            }
        }
        true
    }

    fn apply(&mut self, event: QueueEvent) {
        match event {
            QueueEvent::JobStarted(job) => {
                self.state.current_index = job.index.min(self.state.total_items);
                self.state.current_item_progress = 0.0;
                self.state.download_speed.clear();
                self.state.eta.clear();
                self.state
                    .log
                    .push(format!("Downloading item {}/{}", job.index, job.total));
                self.state.log.push(format!("URL: {}", job.url));
            }
            QueueEvent::Output(line) => {
                if let Some(progress) = progress::parse_details(&line) {
                    self.state.current_item_progress = progress.fraction;
                    if let Some(speed) = progress.speed {
                        self.state.download_speed = speed;
                    }
                    if let Some(eta) = progress.eta {
                        self.state.eta = eta;
                    }
                }
                self.state.log.push(line);
            }
            QueueEvent::JobFinished { .. } => {
                self.state.current_item_progress = 1.0;
            }
            QueueEvent::Failed(err) => self.report_error(&err),
            QueueEvent::Cancelled => {
                self.finish_run();
                self.state.reset_progress();
                self.state.log.push("Download canceled");
            }
            QueueEvent::Finished => {
                let run = self.finish_run();
                match run.map(|run| (run.kind, run.open_when_done)) {
                    Some((RunKind::Update, _)) => {
                        self.state.log.push("yt-dlp update finished");
                    }
                    Some((RunKind::Queue, open_when_done)) => {
                        self.state.log.push("Download completed");
                        info!("queue finished");
                        if let Some(dir) = open_when_done {
                            self.open_output_folder(&dir);
                        }
                    }
                    None => {}
                }
            }
        }
    }

    /// Stops `run`'s worker without waiting for it.
    fn retire(&mut self, run: ActiveRun) {
        run.cancel.cancel();
        self.stopping.retain(|worker| !worker.is_finished());
        self.stopping.push(run.worker);
    }

    /// Cancels any active run and waits, up to a short grace period, for
    /// every worker to kill its child process. Returns false if a worker was
    /// still running when the grace period ran out.
    pub fn shutdown(&mut self) -> bool {
        self.cancel();
        let deadline = Instant::now() + SHUTDOWN_GRACE;
        while self.stopping.iter().any(|worker| !worker.is_finished()) {
            if Instant::now() >= deadline {
                warn!("worker still running after {:?}", SHUTDOWN_GRACE);
                return false;
            }
            thread::sleep(Duration::from_millis(10));
        }
        for worker in self.stopping.drain(..) {
            let _ = worker.join();
        }
        true
    }

    fn finish_run(&mut self) -> Option<ActiveRun> {
        self.state.is_running = false;
        self.active.take()
    }

    pub fn open_output_folder(&mut self, dir: &Path) {
        if let Err(e) = (self.open_folder)(dir) {
            warn!("could not open {}: {}", dir.display(), e);
            self.state.error = ErrorSlot {
                message: Some(format!("Could not open {}: {}", dir.display(), e)),
                show_alert: true,
            };
            self.state.log.push(format!("ERROR: could not open folder: {e}"));
        }
    }

    pub fn dismiss_error(&mut self) {
        self.state.error.show_alert = false;
    }

    /// Publishes a form validation failure that happened before
    /// [`start`](Self::start) could be called. Ignored while a run is active.
    pub fn reject(&mut self, err: ValidationError) {
        if self.active.is_some() {
            return;
        }
        self.report_error(&QueueError::from(err));
    }

    /// Ends any active run and publishes `err` to the error slot and log.
    /// Cancellation is only logged.
    fn report_error(&mut self, err: &QueueError) {
        if let Some(run) = self.finish_run() {
            self.retire(run);
        }

        if err.is_cancellation() {
            self.state.log.push("Download canceled");
            return;
        }

        let mut message = err.to_string();
        if matches!(
            err,
            QueueError::Job {
                source: RunError::NonZeroExit { .. },
                ..
            }
        ) {
            for line in self.state.log.tail(ERROR_CONTEXT_LINES) {
                message.push('\n');
                message.push_str(line);
            }
        }

        error!("{}", err);
        self.state.log.push(format!("ERROR: {err}"));
        self.state.error = ErrorSlot {
            message: Some(message),
            show_alert: true,
        };
    }
}

impl Drop for QueueController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Opens `path` in the platform file browser.
pub fn open_in_file_manager(path: &Path) -> io::Result<()> {
    let program = if cfg!(target_os = "windows") {
        "explorer"
    } else if cfg!(target_os = "macos") {
        "open"
    } else {
        "xdg-open"
    };
    Command::new(program).arg(path).spawn().map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    fn wait_until_idle(queue: &mut QueueController) {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            queue.poll();
            if !queue.is_running() {
                return;
            }
            assert!(Instant::now() < deadline, "queue did not finish in time");
            thread::sleep(Duration::from_millis(10));
        }
    }

    fn log_lines(queue: &QueueController) -> Vec<String> {
        queue.state().log.iter().map(str::to_string).collect()
    }

    fn urls(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn dummy_tools() -> ToolPaths {
        ToolPaths {
            downloader: PathBuf::from("/nonexistent/yt-dlp"),
            post_processor_dir: PathBuf::from("/nonexistent"),
        }
    }

    fn config(dir: &Path) -> DownloadConfiguration {
        DownloadConfiguration {
            output_directory: Some(dir.to_path_buf()),
            ..Default::default()
        }
    }

    #[test]
    fn blank_urls_fail_validation() {
        let dir = tempfile::tempdir().unwrap();
        let mut queue = QueueController::new().with_tools(dummy_tools());

        let err = queue
            .start(&urls(&["", "   ", "\t"]), config(dir.path()))
            .unwrap_err();

        assert!(matches!(err, QueueError::Validation(ValidationError::NoUrls)));
        assert!(!queue.is_running());
        assert!(queue.state().error.show_alert);
        assert_eq!(
            queue.state().error.message.as_deref(),
            Some("No URLs found in batch input")
        );
    }

    #[test]
    fn rejected_form_shows_alert() {
        let mut queue = QueueController::new();
        queue.reject(ValidationError::BlankUrl);

        assert!(!queue.is_running());
        assert!(queue.state().error.show_alert);
        assert_eq!(
            queue.state().error.message.as_deref(),
            Some("Please enter a valid URL")
        );
        assert_eq!(
            log_lines(&queue).last().map(String::as_str),
            Some("ERROR: Please enter a valid URL")
        );
    }

    #[test]
    fn next_job_starts_from_zero_progress() {
        let mut queue = QueueController::new();
        queue.state.total_items = 2;
        let job = |index| DownloadJob {
            url: format!("https://v/{index}"),
            index,
            total: 2,
        };

        queue.apply(QueueEvent::JobStarted(job(1)));
        queue.apply(QueueEvent::Output(
            "[download]  50.0% of 1.00MiB at 1.00MiB/s ETA 00:01".to_string(),
        ));
        assert_eq!(queue.state().current_item_progress, 0.5);
        assert_eq!(queue.state().download_speed, "1.00MiB/s");

        queue.apply(QueueEvent::JobFinished { index: 1 });
        queue.apply(QueueEvent::JobStarted(job(2)));

        let state = queue.state();
        assert_eq!(state.current_item_progress, 0.0);
        assert_eq!(state.current_index, 2);
        assert!(state.current_index <= state.total_items);
        assert!(state.download_speed.is_empty());
        assert!(state.eta.is_empty());
    }

    #[test]
    fn missing_output_directory_fails_validation() {
        let mut queue = QueueController::new().with_tools(dummy_tools());
        let config = DownloadConfiguration {
            output_directory: None,
            ..Default::default()
        };
        let err = queue.start(&urls(&["https://a"]), config).unwrap_err();
        assert!(matches!(
            err,
            QueueError::Validation(ValidationError::MissingOutputDirectory)
        ));
        assert!(!queue.is_running());
    }

    #[test]
    fn refuses_to_start_without_dependencies() {
        let dir = tempfile::tempdir().unwrap();
        let mut queue = QueueController::new();
        let err = queue
            .start(&urls(&["https://a"]), config(dir.path()))
            .unwrap_err();
        assert!(matches!(err, QueueError::DependenciesPending));

        let mut queue = QueueController::new();
        queue.dependencies = DependencyStatus::Failed(DependencyError::NoSupportDir);
        let err = queue
            .start(&urls(&["https://a"]), config(dir.path()))
            .unwrap_err();
        assert!(matches!(err, QueueError::Dependency(_)));
        assert!(!queue.is_running());
    }

    #[test]
    fn cancel_when_idle_is_harmless() {
        let mut queue = QueueController::new();
        queue.cancel();
        assert!(!queue.is_running());
        assert!(queue.state().log.is_empty());
    }

    #[test]
    fn dismissing_keeps_the_message() {
        let mut queue = QueueController::new().with_tools(dummy_tools());
        let _ = queue.start(&[], DownloadConfiguration::default());
        queue.dismiss_error();
        assert!(!queue.state().error.show_alert);
        assert!(queue.state().error.message.is_some());
    }

    #[cfg(unix)]
    mod with_fake_downloader {
        use super::*;
        use crate::dependencies::Locator;
        use std::fs;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        const SCRIPT: &str = r#"#!/bin/sh
for last; do :; done
case "$last" in
  *fail*)
    echo "ERROR: Unsupported URL: $last" >&2
    exit 1
    ;;
  *slow*)
    echo "[download]  10.0% of 1.00MiB at 100.00KiB/s ETA 00:09"
    sleep 30
    ;;
  *pidfile*)
    echo $$ > "$(dirname "$0")/child.pid"
    exec sleep 30
    ;;
  *chatty*)
    i=0
    while [ $i -lt 50 ]; do echo "line $i"; i=$((i+1)); done
    ;;
esac
echo "[download] Destination: $last"
echo "[download]  50.0% of 1.00MiB at 1.00MiB/s ETA 00:01"
echo "[download] 100% of 1.00MiB in 00:00:01"
"#;

        struct Fixture {
            _tools: TempDir,
            out: TempDir,
            tools: ToolPaths,
        }

        fn fixture() -> Fixture {
            let tools_dir = tempfile::tempdir().unwrap();
            let downloader = tools_dir.path().join("yt-dlp");
            fs::write(&downloader, SCRIPT).unwrap();
            fs::set_permissions(&downloader, fs::Permissions::from_mode(0o755)).unwrap();
            let tools = ToolPaths {
                downloader,
                post_processor_dir: tools_dir.path().to_path_buf(),
            };
            Fixture {
                _tools: tools_dir,
                out: tempfile::tempdir().unwrap(),
                tools,
            }
        }

        #[test]
        fn runs_every_item_in_order() {
            let fx = fixture();
            let mut queue = QueueController::new().with_tools(fx.tools.clone());

            queue
                .start(&urls(&["https://v/1", "  ", "https://v/2"]), config(fx.out.path()))
                .unwrap();
            assert!(queue.is_running());
            assert_eq!(queue.state().total_items, 2);
            wait_until_idle(&mut queue);

            let lines = log_lines(&queue);
            let first = lines.iter().position(|l| l == "Downloading item 1/2").unwrap();
            let second = lines.iter().position(|l| l == "Downloading item 2/2").unwrap();
            assert!(first < second);
            assert!(lines.contains(&"URL: https://v/2".to_string()));
            assert_eq!(lines.last().map(String::as_str), Some("Download completed"));

            let state = queue.state();
            assert_eq!(state.current_index, 2);
            assert_eq!(state.current_item_progress, 1.0);
            assert_eq!(state.error, ErrorSlot::default());
        }

        #[test]
        fn failure_stops_the_remaining_items() {
            let fx = fixture();
            let mut queue = QueueController::new().with_tools(fx.tools.clone());

            queue
                .start(
                    &urls(&["https://v/1", "https://v/fail", "https://v/3"]),
                    config(fx.out.path()),
                )
                .unwrap();
            wait_until_idle(&mut queue);

            let state = queue.state();
            assert!(!state.is_running);
            assert_eq!(state.current_index, 2);
            assert!(state.error.show_alert);
            let message = state.error.message.as_deref().unwrap();
            assert!(message.contains("https://v/fail"));
            assert!(message.contains("code 1"));
            assert!(message.contains("Unsupported URL"));

            let lines = log_lines(&queue);
            assert!(!lines.iter().any(|l| l == "Downloading item 3/3"));
            assert!(lines.iter().any(|l| l.starts_with("ERROR: ")));
        }

        #[test]
        fn cancelling_mid_job_stops_the_queue() {
            let fx = fixture();
            let mut queue = QueueController::new().with_tools(fx.tools.clone());
            queue
                .start(&urls(&["https://v/slow", "https://v/2"]), config(fx.out.path()))
                .unwrap();

            let deadline = Instant::now() + Duration::from_secs(10);
            while queue.state().current_item_progress == 0.0 {
                assert!(Instant::now() < deadline, "no progress reported");
                queue.poll();
                thread::sleep(Duration::from_millis(10));
            }
            assert_eq!(queue.state().download_speed, "100.00KiB/s");

            queue.cancel();
            assert!(!queue.is_running());
            assert_eq!(queue.state().current_item_progress, 0.0);
            assert_eq!(queue.state().current_index, 0);

            thread::sleep(Duration::from_millis(300));
            assert!(!queue.poll());
            let lines = log_lines(&queue);
            assert_eq!(
                lines.last().map(String::as_str),
                Some("Download canceled by user")
            );
            assert!(!lines.iter().any(|l| l == "Downloading item 2/2"));
            assert_eq!(queue.state().error.message, None);
        }

        fn is_alive(pid: &str) -> bool {
            Command::new("kill")
                .args(["-0", pid])
                .stderr(std::process::Stdio::null())
                .status()
                .map(|status| status.success())
                .unwrap_or(false)
        }

        /// Starts a job whose child sleeps, and returns its pid once known.
        fn start_sleeping_child(queue: &mut QueueController, fx: &Fixture) -> String {
            queue
                .start(&urls(&["https://v/pidfile"]), config(fx.out.path()))
                .unwrap();
            let pid_file = fx.tools.post_processor_dir.join("child.pid");
            let deadline = Instant::now() + Duration::from_secs(10);
            loop {
                if let Ok(raw) = fs::read_to_string(&pid_file) {
                    let pid = raw.trim().to_string();
                    if !pid.is_empty() && is_alive(&pid) {
                        return pid;
                    }
                }
                assert!(Instant::now() < deadline, "child never started");
                thread::sleep(Duration::from_millis(10));
            }
        }

        #[test]
        fn shutdown_kills_the_live_process() {
            let fx = fixture();
            let mut queue = QueueController::new().with_tools(fx.tools.clone());
            let pid = start_sleeping_child(&mut queue, &fx);

            assert!(queue.shutdown());
            assert!(!queue.is_running());
            assert!(!is_alive(&pid));
        }

        #[test]
        fn dropping_the_controller_kills_the_live_process() {
            let fx = fixture();
            let mut queue = QueueController::new().with_tools(fx.tools.clone());
            let pid = start_sleeping_child(&mut queue, &fx);

            drop(queue);
            assert!(!is_alive(&pid));
        }

        #[test]
        fn start_while_running_is_rejected() {
            let fx = fixture();
            let mut queue = QueueController::new().with_tools(fx.tools.clone());
            queue
                .start(&urls(&["https://v/slow"]), config(fx.out.path()))
                .unwrap();

            let err = queue
                .start(&urls(&["https://v/2"]), config(fx.out.path()))
                .unwrap_err();
            assert!(matches!(
                err,
                QueueError::Validation(ValidationError::AlreadyRunning)
            ));
            queue.cancel();
        }

        #[test]
        fn log_stays_within_capacity() {
            let fx = fixture();
            let mut queue = QueueController::new()
                .with_tools(fx.tools.clone())
                .with_log_capacity(10);
            queue
                .start(&urls(&["https://v/chatty"]), config(fx.out.path()))
                .unwrap();
            wait_until_idle(&mut queue);

            let lines = log_lines(&queue);
            assert_eq!(lines.len(), 10);
            assert_eq!(lines.last().map(String::as_str), Some("Download completed"));
            assert_eq!(lines[lines.len() - 2], "[download] 100% of 1.00MiB in 00:00:01");
        }

        #[test]
        fn opens_folder_after_successful_run() {
            let fx = fixture();
            let opened = Arc::new(Mutex::new(Vec::new()));
            let record = Arc::clone(&opened);
            let mut queue = QueueController::new()
                .with_tools(fx.tools.clone())
                .with_folder_opener(move |path| {
                    record.lock().unwrap().push(path.to_path_buf());
                    Ok(())
                });

            let config = DownloadConfiguration {
                auto_open_folder: true,
                ..config(fx.out.path())
            };
            queue.start(&urls(&["https://v/1"]), config).unwrap();
            wait_until_idle(&mut queue);

            assert_eq!(*opened.lock().unwrap(), vec![fx.out.path().to_path_buf()]);
        }

        #[test]
        fn dependency_check_runs_in_background() {
            let fx = fixture();
            fs::write(fx.tools.post_processor_dir.join("ffmpeg"), "").unwrap();
            let locator = Locator::new()
                .with_bundled_dir(None)
                .with_support_dir(Some(fx.tools.post_processor_dir.clone()))
                .search_path(false)
                .provision(false);

            let mut queue = QueueController::new();
            queue.check_dependencies(locator);
            let deadline = Instant::now() + Duration::from_secs(10);
            while *queue.dependencies() == DependencyStatus::Checking {
                assert!(Instant::now() < deadline);
                queue.poll();
                thread::sleep(Duration::from_millis(10));
            }
            assert_eq!(*queue.dependencies(), DependencyStatus::Ready(fx.tools.clone()));
        }

        #[test]
        fn update_streams_output_into_the_log() {
            let fx = fixture();
            let mut queue = QueueController::new().with_tools(fx.tools.clone());
            queue.update_downloader().unwrap();
            wait_until_idle(&mut queue);

            let lines = log_lines(&queue);
            assert!(lines.contains(&"[download] Destination: -U".to_string()));
            assert_eq!(lines.last().map(String::as_str), Some("yt-dlp update finished"));
        }
    }
}
