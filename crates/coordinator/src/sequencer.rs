// crates/coordinator/src/sequencer.rs
//! Finish sequencer: fast deterministic climb to 100, settle, signal done.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};

use crate::config::CoordinatorConfig;
use crate::coordinator::TimerEvent;

/// Timer task that closes the gap to 100 once the backend is ready.
///
/// Emits `start + n * finish_step` clamped to 100 every `finish_interval`.
/// On emitting exactly 100 the repeating timer stops, the settle delay
/// elapses (one visible instant at "100%"), and `FinishDone` fires once.
pub(crate) struct FinishSequencer {
    task: JoinHandle<()>,
}

impl FinishSequencer {
    pub(crate) fn spawn(
        start: f64,
        cfg: &CoordinatorConfig,
        epoch: u64,
        tx: mpsc::UnboundedSender<TimerEvent>,
    ) -> Self {
        let step = cfg.finish_step;
        let period = cfg.finish_interval;
        let settle = cfg.settle_delay;

        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            let mut value = start;
            while value < 100.0 {
                ticker.tick().await;
                value = (value + step).min(100.0);
                if tx
                    .send(TimerEvent::FinishTick {
                        epoch,
                        proposed: value,
                    })
                    .is_err()
                {
                    return;
                }
            }
            sleep(settle).await;
            let _ = tx.send(TimerEvent::FinishDone { epoch });
        });

        Self { task }
    }

    /// Cancels both the repeating timer and any pending settle delay.
    /// Idempotent.
    pub(crate) fn stop(&mut self) {
        self.task.abort();
    }
}

impl Drop for FinishSequencer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
