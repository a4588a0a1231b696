// crates/coordinator/src/coordinator.rs
//! The coordinator: one driver task owning Phase and Progress.
//!
//! Public operations go through [`CoordinatorHandle`] over a command channel;
//! the clock, poller, and sequencer are spawned timer tasks that send typed
//! events into one internal queue. The driver's `select!` loop is the single
//! serialized callback queue: no two events ever mutate Phase or Progress
//! concurrently, and no locks are needed.
//!
//! Every timer event carries the epoch it was started under. The driver bumps
//! the epoch on every transition that stops timers and drops events from
//! older epochs, so a tick already in flight when its timer was stopped can
//! never be observed afterwards.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot, watch};

use crate::backend::{JobInitiator, StatusProbe, Submission};
use crate::clock::ProgressClock;
use crate::config::CoordinatorConfig;
use crate::error::{CoordinatorError, ProbeError};
use crate::phase::{rfc3339_now, CoordinatorEvent, JobKey, Phase, ProgressSnapshot};
use crate::poller::StatusPoller;
use crate::sequencer::FinishSequencer;

/// Events from the three timer components into the driver.
#[derive(Debug)]
pub(crate) enum TimerEvent {
    ClockTick { epoch: u64, proposed: f64 },
    PollReady { epoch: u64 },
    PollFailed { epoch: u64, attempt: u64, error: ProbeError },
    FinishTick { epoch: u64, proposed: f64 },
    FinishDone { epoch: u64 },
}

impl TimerEvent {
    fn epoch(&self) -> u64 {
        match self {
            Self::ClockTick { epoch, .. }
            | Self::PollReady { epoch }
            | Self::PollFailed { epoch, .. }
            | Self::FinishTick { epoch, .. }
            | Self::FinishDone { epoch } => *epoch,
        }
    }
}

enum Command {
    Start {
        submission: Submission,
        reply: oneshot::Sender<Result<JobKey, CoordinatorError>>,
    },
    Cancel {
        reply: oneshot::Sender<()>,
    },
}

/// Spawns the driver task and hands out the public handle.
pub struct Coordinator;

impl Coordinator {
    pub fn spawn<I, P>(initiator: I, probe: P, cfg: CoordinatorConfig) -> CoordinatorHandle
    where
        I: JobInitiator,
        P: StatusProbe,
    {
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        let (watch_tx, watch_rx) = watch::channel(ProgressSnapshot::idle());
        let (events_tx, _) = broadcast::channel(cfg.event_capacity);

        let driver = Driver {
            cfg,
            initiator,
            probe: Arc::new(probe),
            cmd_rx,
            timer_tx,
            timer_rx,
            watch_tx,
            events_tx: events_tx.clone(),
            phase: Phase::Idle,
            percent: 0.0,
            job: None,
            epoch: 0,
            clock: None,
            poller: None,
            sequencer: None,
        };
        tokio::spawn(driver.run());

        CoordinatorHandle {
            cmd_tx,
            watch_rx,
            events_tx,
        }
    }
}

/// Cloneable handle to a running coordinator.
///
/// Dropping the last handle shuts the driver down: every live timer is
/// stopped and no further snapshot is published.
#[derive(Clone)]
pub struct CoordinatorHandle {
    cmd_tx: mpsc::Sender<Command>,
    watch_rx: watch::Receiver<ProgressSnapshot>,
    events_tx: broadcast::Sender<CoordinatorEvent>,
}

impl CoordinatorHandle {
    /// Initiate the backend job and start the progress simulation.
    ///
    /// Returns the polling key on success. Fails with `InvalidTransition` if
    /// a job is already in flight (the in-flight job is untouched) and with
    /// `Initiation` if the upload collaborator reports failure (the
    /// coordinator stays Idle; no timer was started).
    pub async fn start_job(&self, submission: Submission) -> Result<JobKey, CoordinatorError> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Start { submission, reply })
            .await
            .map_err(|_| CoordinatorError::Closed)?;
        rx.await.map_err(|_| CoordinatorError::Closed)?
    }

    /// Abort the in-flight job, stop every live timer, and reset to Idle with
    /// progress 0. Safe from any phase; a no-op on Idle or after shutdown.
    /// Returns once the reset has been applied.
    pub async fn cancel(&self) {
        let (reply, rx) = oneshot::channel();
        if self.cmd_tx.send(Command::Cancel { reply }).await.is_ok() {
            let _ = rx.await;
        }
    }

    /// Watch channel publishing a snapshot on every phase or progress change.
    pub fn watch(&self) -> watch::Receiver<ProgressSnapshot> {
        self.watch_rx.clone()
    }

    /// Current snapshot without subscribing.
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.watch_rx.borrow().clone()
    }

    /// Subscribe to completion and poll-diagnostic events.
    pub fn events(&self) -> broadcast::Receiver<CoordinatorEvent> {
        self.events_tx.subscribe()
    }
}

struct Driver<I, P> {
    cfg: CoordinatorConfig,
    initiator: I,
    probe: Arc<P>,
    cmd_rx: mpsc::Receiver<Command>,
    timer_tx: mpsc::UnboundedSender<TimerEvent>,
    timer_rx: mpsc::UnboundedReceiver<TimerEvent>,
    watch_tx: watch::Sender<ProgressSnapshot>,
    events_tx: broadcast::Sender<CoordinatorEvent>,

    phase: Phase,
    percent: f64,
    job: Option<JobKey>,
    epoch: u64,

    clock: Option<ProgressClock>,
    poller: Option<StatusPoller>,
    sequencer: Option<FinishSequencer>,
}

impl<I, P> Driver<I, P>
where
    I: JobInitiator,
    P: StatusProbe,
{
    async fn run(mut self) {
        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(Command::Start { submission, reply }) => {
                        let _ = reply.send(self.handle_start(submission).await);
                    }
                    Some(Command::Cancel { reply }) => {
                        self.reset_to_idle("cancelled");
                        let _ = reply.send(());
                    }
                    // All handles dropped: release every timer and exit.
                    None => {
                        self.stop_timers();
                        tracing::debug!("all coordinator handles dropped; driver exiting");
                        return;
                    }
                },
                Some(ev) = self.timer_rx.recv() => self.handle_timer(ev),
            }
        }
    }

    async fn handle_start(&mut self, submission: Submission) -> Result<JobKey, CoordinatorError> {
        if self.phase != Phase::Idle {
            tracing::warn!(phase = ?self.phase, "start_job rejected: job already in flight");
            return Err(CoordinatorError::InvalidTransition { phase: self.phase });
        }

        // No command interleaves with this await: the driver processes one
        // command at a time, so the Idle check above cannot go stale.
        let key = self
            .initiator
            .initiate(submission)
            .await
            .map_err(CoordinatorError::Initiation)?;

        self.epoch += 1;
        self.phase = Phase::Running;
        self.job = Some(key.clone());
        self.clock = Some(ProgressClock::spawn(
            self.percent,
            &self.cfg,
            self.epoch,
            self.timer_tx.clone(),
        ));
        self.poller = Some(StatusPoller::spawn(
            Arc::clone(&self.probe),
            key.clone(),
            self.cfg.poll_interval,
            self.epoch,
            self.timer_tx.clone(),
        ));
        self.publish();
        tracing::info!(job = %key, "ingestion started; simulating progress while polling for ready");
        Ok(key)
    }

    fn handle_timer(&mut self, ev: TimerEvent) {
        if ev.epoch() != self.epoch {
            tracing::trace!(event = ?ev, current_epoch = self.epoch, "dropping stale timer event");
            return;
        }
        match (self.phase, ev) {
            (Phase::Running, TimerEvent::ClockTick { proposed, .. }) => {
                self.store_progress(proposed);
            }
            (Phase::Running, TimerEvent::PollReady { .. }) => {
                self.enter_converging();
            }
            (Phase::Running, TimerEvent::PollFailed { attempt, error, .. }) => {
                if let Some(job) = &self.job {
                    let _ = self.events_tx.send(CoordinatorEvent::PollAttemptFailed {
                        job: job.clone(),
                        attempt,
                        error: error.to_string(),
                        timestamp: rfc3339_now(),
                    });
                }
            }
            (Phase::Converging, TimerEvent::FinishTick { proposed, .. }) => {
                self.store_progress(proposed);
            }
            (Phase::Converging, TimerEvent::FinishDone { .. }) => {
                self.complete();
            }
            (phase, ev) => {
                tracing::trace!(?phase, event = ?ev, "timer event does not apply to current phase");
            }
        }
    }

    /// Clamp and store a proposed progress value. Progress never decreases
    /// within a job and never exceeds 100.
    fn store_progress(&mut self, proposed: f64) {
        let next = self.percent.max(proposed.min(100.0));
        if next != self.percent {
            self.percent = next;
            self.publish();
        }
    }

    /// Running -> Converging. The epoch bump drops any clock tick already in
    /// flight, so the sequencer starts from a value that is no longer
    /// advancing.
    fn enter_converging(&mut self) {
        self.epoch += 1;
        if let Some(mut clock) = self.clock.take() {
            clock.stop();
        }
        if let Some(mut poller) = self.poller.take() {
            poller.stop();
        }
        self.phase = Phase::Converging;
        self.sequencer = Some(FinishSequencer::spawn(
            self.percent,
            &self.cfg,
            self.epoch,
            self.timer_tx.clone(),
        ));
        self.publish();
        if let Some(job) = &self.job {
            tracing::info!(job = %job, percent = self.percent, "backend ready; converging to 100");
        }
    }

    /// Converging -> Complete -> (auto) Idle. The completion event fires
    /// exactly once per job.
    fn complete(&mut self) {
        self.epoch += 1;
        if let Some(mut sequencer) = self.sequencer.take() {
            sequencer.stop();
        }
        self.phase = Phase::Complete;
        self.percent = 100.0;
        self.publish();

        if let Some(job) = self.job.take() {
            tracing::info!(job = %job, "ingestion complete");
            let _ = self.events_tx.send(CoordinatorEvent::Completed {
                job,
                timestamp: rfc3339_now(),
            });
        }

        self.phase = Phase::Idle;
        self.percent = 0.0;
        self.publish();
    }

    fn reset_to_idle(&mut self, reason: &str) {
        self.stop_timers();
        if self.phase != Phase::Idle {
            tracing::info!(reason, phase = ?self.phase, "job aborted; coordinator reset");
        }
        self.phase = Phase::Idle;
        self.percent = 0.0;
        self.job = None;
        self.publish();
    }

    fn stop_timers(&mut self) {
        self.epoch += 1;
        if let Some(mut clock) = self.clock.take() {
            clock.stop();
        }
        if let Some(mut poller) = self.poller.take() {
            poller.stop();
        }
        if let Some(mut sequencer) = self.sequencer.take() {
            sequencer.stop();
        }
    }

    fn publish(&self) {
        let snap = ProgressSnapshot {
            phase: self.phase,
            percent: self.percent,
            job: self.job.clone(),
        };
        self.watch_tx.send_if_modified(|cur| {
            if *cur == snap {
                false
            } else {
                *cur = snap;
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{IngestStatus, Submission};
    use crate::error::InitiateError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    struct OkInitiator;

    #[async_trait]
    impl JobInitiator for OkInitiator {
        async fn initiate(&self, submission: Submission) -> Result<JobKey, InitiateError> {
            Ok(JobKey::new(submission.company_hint))
        }
    }

    struct NeverReady {
        calls: Arc<AtomicU64>,
    }

    #[async_trait]
    impl StatusProbe for NeverReady {
        async fn check(&self, _key: &JobKey) -> Result<IngestStatus, ProbeError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            Ok(IngestStatus::Processing)
        }
    }

    fn submission() -> Submission {
        Submission {
            file_name: "annual-report.pdf".to_string(),
            bytes: b"%PDF-1.7".to_vec(),
            company_hint: "ACME".to_string(),
            period: "FY25".to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stale_epoch_events_are_dropped() {
        let calls = Arc::new(AtomicU64::new(0));
        let handle = Coordinator::spawn(
            OkInitiator,
            NeverReady { calls },
            CoordinatorConfig::default(),
        );
        handle.start_job(submission()).await.unwrap();

        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(handle.snapshot().percent, 1.5);

        handle.cancel().await;
        // A tick from the cancelled job's clock (epoch 1) arriving now must
        // not move progress: epoch is already past it.
        tokio::time::sleep(Duration::from_millis(2000)).await;
        let snap = handle.snapshot();
        assert_eq!(snap.phase, Phase::Idle);
        assert_eq!(snap.percent, 0.0);
        assert_eq!(snap.job, None);
    }

    #[tokio::test(start_paused = true)]
    async fn progress_is_monotone_and_capped_while_running() {
        let calls = Arc::new(AtomicU64::new(0));
        let handle = Coordinator::spawn(
            OkInitiator,
            NeverReady { calls },
            CoordinatorConfig::default(),
        );
        let mut rx = handle.watch();
        handle.start_job(submission()).await.unwrap();

        // Long enough to hit the cap and sit there: the clock needs 152
        // slow ticks to 76, then 95 crawl ticks to ~95.
        tokio::time::sleep(Duration::from_secs(60)).await;

        let mut last = 0.0;
        while rx.has_changed().unwrap() {
            let snap = rx.borrow_and_update().clone();
            assert!(snap.percent >= last);
            assert!(snap.percent <= 95.0);
            last = snap.percent;
        }
        assert!((handle.snapshot().percent - 95.0).abs() < 1e-6);
        assert_eq!(handle.snapshot().phase, Phase::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn driver_exits_when_all_handles_drop() {
        let calls = Arc::new(AtomicU64::new(0));
        let probe_calls = Arc::clone(&calls);
        let handle = Coordinator::spawn(
            OkInitiator,
            NeverReady { calls: probe_calls },
            CoordinatorConfig::default(),
        );
        let mut rx = handle.watch();
        handle.start_job(submission()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;
        let polls_before_drop = calls.load(Ordering::Relaxed);
        assert!(polls_before_drop >= 1);

        drop(handle);
        // Sender side closes once the driver exits.
        loop {
            if rx.changed().await.is_err() {
                break;
            }
        }
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(calls.load(Ordering::Relaxed), polls_before_drop);
    }
}
