// crates/coordinator/src/poller.rs
//! Status poller: periodic readiness checks against the backend.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::backend::{IngestStatus, StatusProbe};
use crate::coordinator::TimerEvent;
use crate::phase::JobKey;

/// Repeating timer task probing the backend for job readiness.
///
/// The first probe fires one full interval after spawn. Each attempt either
/// reports `Ready` (at which point the poller stops itself, guaranteeing no
/// further requests), reports a transient failure on the event channel, or
/// simply waits for the next attempt. A failed attempt never stops polling
/// and never changes the cadence; there is no attempt cap.
pub(crate) struct StatusPoller {
    task: JoinHandle<()>,
}

impl StatusPoller {
    pub(crate) fn spawn<P: StatusProbe>(
        probe: Arc<P>,
        key: JobKey,
        period: Duration,
        epoch: u64,
        tx: mpsc::UnboundedSender<TimerEvent>,
    ) -> Self {
        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            let mut attempt: u64 = 0;
            loop {
                ticker.tick().await;
                attempt += 1;
                match probe.check(&key).await {
                    Ok(IngestStatus::Ready) => {
                        tracing::debug!(job = %key, attempt, "backend reports ready");
                        let _ = tx.send(TimerEvent::PollReady { epoch });
                        return;
                    }
                    Ok(status) => {
                        tracing::debug!(job = %key, attempt, ?status, "ingestion not ready yet");
                    }
                    Err(error) => {
                        tracing::warn!(job = %key, attempt, %error, "status probe failed (non-fatal)");
                        if tx
                            .send(TimerEvent::PollFailed {
                                epoch,
                                attempt,
                                error,
                            })
                            .is_err()
                        {
                            return;
                        }
                    }
                }
            }
        });

        Self { task }
    }

    /// Idempotent.
    pub(crate) fn stop(&mut self) {
        self.task.abort();
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.task.abort();
    }
}
