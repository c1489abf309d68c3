// SPDX-License-Identifier: GPL-3.0-only

//! Stream readiness
//!
//! A stream becomes ready when its first decodable frame arrives, or when
//! the fallback timeout expires first. Both run as one race on a task; the
//! winner fires the latch and the loser is ignored.

use super::CaptureEvent;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

/// What made a stream ready
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadySource {
    /// The device delivered a decodable frame
    FrameAvailable,
    /// No frame arrived in time; readiness is assumed
    Timeout,
}

#[derive(Debug, Default)]
struct LatchState {
    ready: Option<ReadySource>,
    closed: bool,
}

/// One-shot readiness latch for a single capture session
///
/// Fires at most once. Once closed it never fires, so no `Ready` event can
/// follow the session's release.
#[derive(Debug, Default)]
pub struct ReadinessLatch {
    state: Mutex<LatchState>,
}

impl ReadinessLatch {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LatchState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_ready(&self) -> bool {
        self.lock().ready.is_some()
    }

    pub fn source(&self) -> Option<ReadySource> {
        self.lock().ready
    }

    /// Fire the latch; `notify` runs under the latch only for the first call
    pub fn fire<F: FnOnce(ReadySource)>(&self, source: ReadySource, notify: F) -> bool {
        let mut state = self.lock();
        if state.closed || state.ready.is_some() {
            return false;
        }
        state.ready = Some(source);
        notify(source);
        true
    }

    /// Disarm the latch for good
    pub fn close(&self) {
        self.lock().closed = true;
    }
}

/// Race the first-frame signal against `timeout`
///
/// A dropped first-frame sender (stream ended before any frame) leaves only
/// the timer in the race.
pub fn spawn_readiness_race(
    first_frame: oneshot::Receiver<()>,
    timeout: Duration,
    latch: Arc<ReadinessLatch>,
    events: mpsc::UnboundedSender<CaptureEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let source = tokio::select! {
            Ok(()) = first_frame => ReadySource::FrameAvailable,
            _ = tokio::time::sleep(timeout) => ReadySource::Timeout,
        };

        let fired = latch.fire(source, |source| {
            let _ = events.send(CaptureEvent::Ready(source));
        });
        debug!(?source, fired, "Readiness race finished");
    })
}
