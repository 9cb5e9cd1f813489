use log::{debug, warn};
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::error::RunError;

const POLL_INTERVAL: Duration = Duration::from_millis(50);
// How long to keep reading after exit when a grandchild still holds the pipes.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Shared cancellation flag. Cloning hands out another view of the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runs `program` to completion, handing every stdout/stderr line to
/// `on_line` as it arrives. Returns the exit code on success.
///
/// The cancel token is checked on every poll tick; once set, the child is
/// killed and `RunError::Cancelled` is returned without waiting for the
/// output streams to close.
pub fn run<F>(
    program: &Path,
    args: &[String],
    mut on_line: F,
    cancel: &CancelToken,
) -> Result<i32, RunError>
where
    F: FnMut(&str),
{
    if cancel.is_cancelled() {
        return Err(RunError::Cancelled);
    }

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| RunError::Spawn {
            program: program.to_path_buf(),
            source,
        })?;
    debug!("spawned {} (pid {})", program.display(), child.id());

    let (tx, rx) = mpsc::channel();
    if let Some(stdout) = child.stdout.take() {
        spawn_reader(stdout, tx.clone());
    }
    if let Some(stderr) = child.stderr.take() {
        spawn_reader(stderr, tx.clone());
    }
    drop(tx);

    let mut streams_open = true;
    let mut exited: Option<(Instant, ExitStatus)> = None;

    let status = loop {
        if cancel.is_cancelled() {
            terminate(&mut child);
            return Err(RunError::Cancelled);
        }

        if streams_open {
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok(line) => on_line(&line),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => streams_open = false,
            }
        } else {
            thread::sleep(POLL_INTERVAL);
        }

        if exited.is_none() {
            if let Some(status) = child.try_wait().map_err(RunError::Wait)? {
                exited = Some((Instant::now(), status));
            }
        }

        match exited {
            Some((_, status)) if !streams_open => break status,
            Some((at, status)) if at.elapsed() >= DRAIN_GRACE => {
                warn!(
                    "{} exited but its output is still open; not waiting further",
                    program.display()
                );
                break status;
            }
            _ => {}
        }
    };

    if status.success() {
        Ok(0)
    } else if cancel.is_cancelled() {
        Err(RunError::Cancelled)
    } else {
        Err(RunError::NonZeroExit {
            code: status.code(),
        })
    }
}

fn terminate(child: &mut Child) {
    if let Err(e) = child.kill() {
        // Already gone is fine.
        debug!("kill failed: {}", e);
    }
    let _ = child.wait();
}

/// Reads `stream` on its own thread, splitting on `\n` or `\r` so carriage
/// return progress updates come through as separate lines.
fn spawn_reader<R>(mut stream: R, tx: Sender<String>)
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut pending = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = match stream.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    debug!("output stream closed: {}", e);
                    break;
                }
            };
            for &byte in &chunk[..n] {
                if byte == b'\n' || byte == b'\r' {
                    if !flush_line(&mut pending, &tx) {
                        return;
                    }
                } else {
                    pending.push(byte);
                }
            }
        }
        flush_line(&mut pending, &tx);
    });
}

/// Sends the buffered line, if any. Returns false once the receiver is gone.
fn flush_line(pending: &mut Vec<u8>, tx: &Sender<String>) -> bool {
    if pending.is_empty() {
        return true;
    }
    let line = String::from_utf8_lossy(pending).into_owned();
    pending.clear();
    tx.send(line).is_ok()
}
