//! Background execution of one tool run.
//!
//! # Invariants
//! - Exactly one worker thread per run; events arrive in emission order.
//! - `Started` precedes any `Output`; every run ends with exactly one of
//!   `Completed`, `Cancelled` or `Failed`.
//! - The cancel flag is checked before each relayed line.

use super::ToolInvocation;
use log::{error, info, warn};
use serde::Serialize;
use std::io::{self, BufRead, BufReader};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Upper bound `shutdown` waits for the worker.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

const JOIN_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Progress of a tool run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ToolEvent {
    Started { command: String },
    Output(String),
    /// `exit_code` is `None` when the process was ended by a signal.
    Completed { exit_code: Option<i32> },
    Cancelled,
    Failed(String),
}

impl ToolEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed { .. } | Self::Cancelled | Self::Failed(_)
        )
    }
}

/// Caller side of a running tool.
pub struct ToolRunHandle {
    run_id: Uuid,
    events: Receiver<ToolEvent>,
    cancel: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl ToolRunHandle {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Event stream; iteration ends once the worker has exited.
    pub fn events(&self) -> &Receiver<ToolEvent> {
        &self.events
    }

    /// Requests cancellation; the worker stops at the next output line.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    pub fn is_finished(&self) -> bool {
        self.worker
            .as_ref()
            .map_or(true, JoinHandle::is_finished)
    }

    /// Drains events until a terminal one arrives or the worker exits.
    pub fn wait(&self) -> Vec<ToolEvent> {
        let mut collected = Vec::new();
        for event in self.events.iter() {
            let terminal = event.is_terminal();
            collected.push(event);
            if terminal {
                break;
            }
        }
        collected
    }

    /// Cancels the run and waits up to [`SHUTDOWN_TIMEOUT`] for the worker.
    ///
    /// Returns `false` when the worker was still running at the deadline; it
    /// is left detached.
    pub fn shutdown(&mut self) -> bool {
        self.cancel();
        let Some(worker) = self.worker.take() else {
            return true;
        };

        let deadline = Instant::now() + SHUTDOWN_TIMEOUT;
        while !worker.is_finished() {
            if Instant::now() >= deadline {
                warn!(
                    "event=tool_shutdown module=tools status=timeout run_id={} timeout_ms={}",
                    self.run_id,
                    SHUTDOWN_TIMEOUT.as_millis()
                );
                return false;
            }
            thread::sleep(JOIN_POLL_INTERVAL);
        }
        if worker.join().is_err() {
            error!(
                "event=tool_shutdown module=tools status=error run_id={} error_code=worker_panicked",
                self.run_id
            );
        }
        true
    }
}

impl Drop for ToolRunHandle {
    fn drop(&mut self) {
        if !self.is_finished() {
            self.cancel();
        }
    }
}

/// Starts `invocation` on a new worker thread.
pub fn spawn_tool(invocation: ToolInvocation) -> ToolRunHandle {
    let run_id = Uuid::new_v4();
    let (tx, rx) = mpsc::channel();
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);

    let failure_tx = tx.clone();
    let worker = thread::Builder::new()
        .name(format!("tool-{}", invocation.tool))
        .spawn(move || run_worker(run_id, invocation, flag, tx));

    attach_worker(run_id, rx, cancel, &failure_tx, worker)
}

/// Builds the handle; a worker that never started still ends the stream
/// with `Failed`.
fn attach_worker(
    run_id: Uuid,
    events: Receiver<ToolEvent>,
    cancel: Arc<AtomicBool>,
    failure_tx: &Sender<ToolEvent>,
    worker: io::Result<JoinHandle<()>>,
) -> ToolRunHandle {
    let worker = match worker {
        Ok(handle) => Some(handle),
        Err(err) => {
            error!(
                "event=tool_run module=tools status=error run_id={} error_code=thread_spawn_failed error={}",
                run_id, err
            );
            let _ = failure_tx.send(ToolEvent::Failed(format!(
                "failed to start worker thread: {err}"
            )));
            None
        }
    };

    ToolRunHandle {
        run_id,
        events,
        cancel,
        worker,
    }
}

fn run_worker(
    run_id: Uuid,
    invocation: ToolInvocation,
    cancel: Arc<AtomicBool>,
    tx: Sender<ToolEvent>,
) {
    let started_at = Instant::now();
    let spawned = Command::new(&invocation.program)
        .args(&invocation.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn();

    let mut child = match spawned {
        Ok(child) => child,
        Err(err) => {
            error!(
                "event=tool_run module=tools status=error run_id={} tool={} error_code=spawn_failed error={}",
                run_id, invocation.tool, err
            );
            let _ = tx.send(ToolEvent::Failed(format!(
                "failed to start {}: {err}",
                invocation.program.display()
            )));
            return;
        }
    };

    info!(
        "event=tool_run module=tools status=started run_id={} tool={} pid={}",
        run_id,
        invocation.tool,
        child.id()
    );
    if tx
        .send(ToolEvent::Started {
            command: invocation.display_command(),
        })
        .is_err()
    {
        terminate(&mut child);
        return;
    }

    let mut lines = 0usize;
    if let Some(stdout) = child.stdout.take() {
        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();
        loop {
            if cancel.load(Ordering::SeqCst) {
                break;
            }
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {}
                Err(err) => {
                    error!(
                        "event=tool_run module=tools status=error run_id={} error_code=read_failed error={}",
                        run_id, err
                    );
                    terminate(&mut child);
                    let _ = tx.send(ToolEvent::Failed(format!(
                        "failed to read output of {}: {err}",
                        invocation.tool
                    )));
                    return;
                }
            }
            lines += 1;
            // Undecodable bytes become U+FFFD so later lines still arrive.
            let line = String::from_utf8_lossy(&buf);
            if tx.send(ToolEvent::Output(line.trim().to_string())).is_err() {
                // Receiver gone: nobody is listening, stop the process.
                cancel.store(true, Ordering::SeqCst);
                break;
            }
        }
    }

    if cancel.load(Ordering::SeqCst) {
        terminate(&mut child);
        info!(
            "event=tool_run module=tools status=cancelled run_id={} lines={} duration_ms={}",
            run_id,
            lines,
            started_at.elapsed().as_millis()
        );
        let _ = tx.send(ToolEvent::Cancelled);
        return;
    }

    match child.wait() {
        Ok(status) => {
            info!(
                "event=tool_run module=tools status=ok run_id={} exit_code={:?} lines={} duration_ms={}",
                run_id,
                status.code(),
                lines,
                started_at.elapsed().as_millis()
            );
            let _ = tx.send(ToolEvent::Completed {
                exit_code: status.code(),
            });
        }
        Err(err) => {
            error!(
                "event=tool_run module=tools status=error run_id={} error_code=wait_failed error={}",
                run_id, err
            );
            let _ = tx.send(ToolEvent::Failed(err.to_string()));
        }
    }
}

fn terminate(child: &mut Child) {
    if let Err(err) = child.kill() {
        warn!("event=tool_kill module=tools status=error error={}", err);
    }
    let _ = child.wait();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_thread_failure_ends_stream_with_failed() {
        let (tx, rx) = mpsc::channel();
        let handle = attach_worker(
            Uuid::new_v4(),
            rx,
            Arc::new(AtomicBool::new(false)),
            &tx,
            Err(io::Error::new(io::ErrorKind::Other, "thread limit")),
        );
        drop(tx);

        assert!(handle.is_finished());
        let events = handle.wait();
        assert_eq!(events.len(), 1);
        match &events[0] {
            ToolEvent::Failed(message) => assert!(message.contains("thread limit")),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
