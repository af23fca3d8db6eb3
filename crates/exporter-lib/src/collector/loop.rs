//! Periodic collection loop
//!
//! Runs a [`CollectionCycle`] every interval, with jitter, until a shutdown
//! signal arrives. A failed cycle is logged and the loop keeps going.

use super::{CollectionCycle, CycleReport};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::sleep;
use tracing::{debug, info};

/// Configuration for the collection loop
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Base collection interval (default: 60 seconds)
    pub interval: Duration,
    /// Maximum jitter to add to interval (default: 5 seconds)
    pub jitter: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            jitter: Duration::from_secs(5),
        }
    }
}

/// Collection loop that periodically runs a collection cycle
pub struct CollectionLoop {
    cycle: CollectionCycle,
    config: LoopConfig,
}

impl CollectionLoop {
    pub fn new(cycle: CollectionCycle, config: LoopConfig) -> Self {
        Self { cycle, config }
    }

    /// Run cycles until shutdown. The first cycle starts immediately.
    /// Returns the number of cycles that ran.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) -> u64 {
        info!(
            interval_secs = self.config.interval.as_secs(),
            "Starting metrics collection loop"
        );

        let mut cycles = 0u64;

        loop {
            self.run_cycle().await;
            cycles += 1;

            let delay = self.next_delay();
            debug!(delay_ms = delay.as_millis() as u64, "Waiting for next cycle");

            tokio::select! {
                _ = sleep(delay) => {}
                _ = shutdown.recv() => {
                    info!("Shutting down metrics collection loop");
                    break;
                }
            }
        }

        cycles
    }

    /// Run one cycle and log its summary; never fails
    pub async fn run_cycle(&self) -> Option<CycleReport> {
        match self.cycle.run_once().await {
            Ok(report) => {
                self.cycle.logger().log_cycle_complete(&report);
                Some(report)
            }
            Err(e) => {
                self.cycle.logger().log_cycle_failed(&format!("{:#}", e));
                None
            }
        }
    }

    /// Delay until the next cycle
    fn next_delay(&self) -> Duration {
        // Jitter spreads hosts sharing a schedule
        let jitter_ms = rand_jitter(self.config.jitter.as_millis() as u64);
        self.config.interval + Duration::from_millis(jitter_ms)
    }
}

/// Generate a random jitter value between 0 and max_ms
pub(crate) fn rand_jitter(max_ms: u64) -> u64 {
    if max_ms == 0 {
        return 0;
    }

    // Sub-second clock noise is enough spread for scheduling
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64;

    now % max_ms
}
