// SPDX-License-Identifier: GPL-3.0-only
//! Streaming thread lifecycle
//!
//! Each open device stream is pumped by one dedicated, named thread. The
//! controller here owns that thread: it starts it, reports whether device
//! setup succeeded, and stops it exactly once.
//!
//! Stopping never waits longer than [`STREAM_STOP_TIMEOUT`]. A loop stuck in
//! a blocking driver call is detached and exits on its own once the call
//! returns; the device is released when its state drops on that thread.

use super::types::{BackendError, BackendResult, DeviceStream};
use crate::constants::capture::STREAM_STOP_TIMEOUT;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// What the loop body wants after one iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    Continue,
    Stop,
}

/// Owner of a streaming thread
pub struct CaptureLoopController {
    thread_handle: Option<JoinHandle<()>>,
    stop_signal: Arc<AtomicBool>,
    // Disconnects when the thread body returns or unwinds
    exited: mpsc::Receiver<()>,
    name: String,
}

impl CaptureLoopController {
    /// Run `loop_fn` on a new thread until it returns [`LoopAction::Stop`]
    /// or the controller is stopped
    pub fn start<F>(name: &str, mut loop_fn: F) -> BackendResult<Self>
    where
        F: FnMut() -> LoopAction + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop_signal);
        let thread_name = name.to_string();
        let (exit_notice, exited) = mpsc::channel::<()>();

        info!(name = %name, "Starting stream loop");

        let thread_handle = spawn_named(name, move || {
            let _exit_notice = exit_notice;
            while !thread_stop.load(Ordering::SeqCst) {
                if loop_fn() == LoopAction::Stop {
                    debug!(name = %thread_name, "Loop requested stop");
                    break;
                }
            }
            info!(name = %thread_name, "Stream loop exiting");
        })?;

        Ok(Self {
            thread_handle: Some(thread_handle),
            stop_signal,
            exited,
            name: name.to_string(),
        })
    }

    /// Start a loop whose state is built on the streaming thread
    ///
    /// Device handles such as mmap streams borrow the device and cannot move
    /// between threads, so `init_fn` runs on the new thread. This call blocks
    /// until it finishes and returns its error if it failed; the thread has
    /// exited by then.
    pub fn start_with_init<S, I, F>(name: &str, init_fn: I, mut loop_fn: F) -> BackendResult<Self>
    where
        S: 'static,
        I: FnOnce() -> BackendResult<S> + Send + 'static,
        F: FnMut(&mut S) -> LoopAction + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop_signal);
        let thread_name = name.to_string();
        let (init_tx, init_rx) = mpsc::channel::<BackendResult<()>>();
        let (exit_notice, exited) = mpsc::channel::<()>();

        info!(name = %name, "Starting stream loop with device setup");

        let thread_handle = spawn_named(name, move || {
            let _exit_notice = exit_notice;
            let mut state = match init_fn() {
                Ok(state) => {
                    let _ = init_tx.send(Ok(()));
                    state
                }
                Err(e) => {
                    warn!(name = %thread_name, error = %e, "Device setup failed");
                    let _ = init_tx.send(Err(e));
                    return;
                }
            };

            while !thread_stop.load(Ordering::SeqCst) {
                if loop_fn(&mut state) == LoopAction::Stop {
                    debug!(name = %thread_name, "Loop requested stop");
                    break;
                }
            }

            info!(name = %thread_name, "Stream loop exiting");
        })?;

        let mut controller = Self {
            thread_handle: Some(thread_handle),
            stop_signal,
            exited,
            name: name.to_string(),
        };

        match init_rx.recv() {
            Ok(Ok(())) => Ok(controller),
            Ok(Err(e)) => {
                controller.join();
                Err(e)
            }
            Err(_) => {
                controller.join();
                Err(BackendError::Crashed(format!(
                    "{} thread exited during setup",
                    controller.name
                )))
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Signal the loop to stop without waiting
    pub fn request_stop(&self) {
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Stop the loop, waiting at most [`STREAM_STOP_TIMEOUT`] for the thread
    pub fn stop(&mut self) {
        self.request_stop();
        self.join_within(STREAM_STOP_TIMEOUT);
    }

    fn join_within(&mut self, timeout: Duration) {
        let Some(handle) = self.thread_handle.take() else {
            return;
        };
        match self.exited.recv_timeout(timeout) {
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    name = %self.name,
                    timeout_ms = timeout.as_millis() as u64,
                    "Stream loop still blocked, detaching"
                );
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                debug!(name = %self.name, "Joining stream loop");
                if let Err(e) = handle.join() {
                    warn!(name = %self.name, "Stream loop panicked: {:?}", e);
                }
            }
        }
    }

    fn join(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            debug!(name = %self.name, "Joining stream loop");
            if let Err(e) = handle.join() {
                warn!(name = %self.name, "Stream loop panicked: {:?}", e);
            }
        }
    }
}

fn spawn_named<F>(name: &str, body: F) -> BackendResult<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn(body)
        .map_err(|e| BackendError::from_io(&e, &format!("spawn {} thread", name)))
}

impl DeviceStream for CaptureLoopController {
    fn stop(&mut self) {
        CaptureLoopController::stop(self);
    }
}

impl Drop for CaptureLoopController {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            debug!(name = %self.name, "Stream loop dropped, stopping");
            self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicU32;
    use std::time::Instant;

    #[test]
    fn test_loop_stops_itself() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let mut controller = CaptureLoopController::start("test-loop", move || {
            if counter_clone.fetch_add(1, Ordering::SeqCst) >= 10 {
                LoopAction::Stop
            } else {
                LoopAction::Continue
            }
        })
        .unwrap();

        controller.join();
        assert_eq!(counter.load(Ordering::SeqCst), 11);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut controller = CaptureLoopController::start("test-stop", || {
            thread::sleep(Duration::from_millis(5));
            LoopAction::Continue
        })
        .unwrap();

        assert!(controller.is_running());
        controller.stop();
        controller.stop();
        assert!(!controller.is_running());
    }

    #[test]
    fn test_stop_detaches_blocked_loop() {
        // Stands in for a driver call that never returns
        let mut controller = CaptureLoopController::start("test-blocked", || {
            thread::sleep(Duration::from_secs(5));
            LoopAction::Continue
        })
        .unwrap();

        let started = Instant::now();
        controller.stop();
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(!controller.is_running());
    }

    #[test]
    fn test_thread_carries_loop_name() {
        let seen = Arc::new(Mutex::new(None));
        let seen_clone = Arc::clone(&seen);

        let mut controller = CaptureLoopController::start("test-named", move || {
            *seen_clone.lock().unwrap() = thread::current().name().map(str::to_string);
            LoopAction::Stop
        })
        .unwrap();

        controller.join();
        assert_eq!(seen.lock().unwrap().as_deref(), Some("test-named"));
    }

    #[test]
    fn test_init_state_reaches_loop() {
        let seen = Arc::new(AtomicU32::new(0));
        let seen_clone = Arc::clone(&seen);

        let mut controller = CaptureLoopController::start_with_init(
            "test-init",
            || Ok(42u32),
            move |state| {
                seen_clone.store(*state, Ordering::SeqCst);
                LoopAction::Stop
            },
        )
        .expect("init succeeds");

        controller.join();
        assert_eq!(seen.load(Ordering::SeqCst), 42);
    }

    #[test]
    fn test_init_failure_is_returned() {
        let ran = Arc::new(AtomicBool::new(false));
        let ran_clone = Arc::clone(&ran);

        let result = CaptureLoopController::start_with_init(
            "test-fail-init",
            || Err::<(), _>(BackendError::DeviceBusy("/dev/video0".into())),
            move |_: &mut ()| {
                ran_clone.store(true, Ordering::SeqCst);
                LoopAction::Stop
            },
        );

        assert!(matches!(result, Err(BackendError::DeviceBusy(_))));
        assert!(!ran.load(Ordering::SeqCst));
    }
}
