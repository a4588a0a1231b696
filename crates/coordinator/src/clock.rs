// crates/coordinator/src/clock.rs
//! Simulated progress clock: a slowing climb toward (never past) the cap.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::config::CoordinatorConfig;
use crate::coordinator::TimerEvent;

/// Proposed next value for one clock tick.
///
/// The step shrinks from `slow_step` to `crawl_step` once `current` passes
/// `crawl_knee * cap`, producing the decelerating "it's still working" curve.
/// The result never exceeds `cap`.
pub(crate) fn next_step(current: f64, cap: f64, knee: f64, slow_step: f64, crawl_step: f64) -> f64 {
    let step = if current > knee * cap {
        crawl_step
    } else {
        slow_step
    };
    (current + step).min(cap)
}

/// Repeating timer task proposing progress values while the job runs.
///
/// Emits one proposed value per `tick_interval`, starting one interval after
/// spawn. The clock never reads coordinator state; it keeps a local value and
/// submits proposals, which the coordinator clamps and stores.
pub(crate) struct ProgressClock {
    task: JoinHandle<()>,
}

impl ProgressClock {
    pub(crate) fn spawn(
        start: f64,
        cfg: &CoordinatorConfig,
        epoch: u64,
        tx: mpsc::UnboundedSender<TimerEvent>,
    ) -> Self {
        let cap = cfg.progress_cap;
        let knee = cfg.crawl_knee;
        let slow = cfg.slow_step;
        let crawl = cfg.crawl_step;
        let period = cfg.tick_interval;

        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The zeroth tick completes immediately; consume it so emissions
            // start one interval in.
            ticker.tick().await;
            let mut value = start;
            loop {
                ticker.tick().await;
                value = next_step(value, cap, knee, slow, crawl);
                if tx
                    .send(TimerEvent::ClockTick {
                        epoch,
                        proposed: value,
                    })
                    .is_err()
                {
                    return;
                }
            }
        });

        Self { task }
    }

    /// Idempotent. Together with the coordinator's epoch filter this
    /// guarantees no tick is observed after stop returns.
    pub(crate) fn stop(&mut self) {
        self.task.abort();
    }
}

impl Drop for ProgressClock {
    fn drop(&mut self) {
        self.task.abort();
    }
}
