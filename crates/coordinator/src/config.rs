// crates/coordinator/src/config.rs
//! Timing and shaping knobs for the progress coordinator.

use std::time::Duration;

/// Configuration for the coordinator and its three timer components.
///
/// The defaults reproduce the reference behavior: a simulated climb that
/// decelerates toward 95%, a 1s status poll, and a fast 50ms convergence once
/// the backend reports ready.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Cadence of the simulated progress clock while the job runs.
    pub tick_interval: Duration,
    /// Ceiling the simulated climb approaches but never passes on its own.
    pub progress_cap: f64,
    /// Increment per tick below the knee.
    pub slow_step: f64,
    /// Increment per tick once progress passes `crawl_knee * progress_cap`.
    pub crawl_step: f64,
    /// Fraction of the cap past which the clock switches to `crawl_step`.
    pub crawl_knee: f64,
    /// Cadence of status probes against the backend.
    ///
    /// There is no attempt cap and no backoff: the backend job is assumed to
    /// finish eventually, and transient probe failures must not abort the
    /// user's wait. Polling runs until ready, cancel, or handle drop.
    pub poll_interval: Duration,
    /// Cadence of the finish sequencer once the backend is ready.
    pub finish_interval: Duration,
    /// Increment per finish tick, clamped to 100.
    pub finish_step: f64,
    /// Pause after reaching 100% before completion is signaled, so the
    /// display gets one visible instant at "100%". A UX decision, kept
    /// separate from the completion signal itself.
    pub settle_delay: Duration,
    /// Capacity of the diagnostic/completion event channel.
    pub event_capacity: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(100),
            progress_cap: 95.0,
            slow_step: 0.5,
            crawl_step: 0.2,
            crawl_knee: 0.8,
            poll_interval: Duration::from_millis(1000),
            finish_interval: Duration::from_millis(50),
            finish_step: 5.0,
            settle_delay: Duration::from_millis(500),
            event_capacity: 64,
        }
    }
}
