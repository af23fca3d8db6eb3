//! Structured logging for exporter events
//!
//! Every record carries an `event` tag and the host it was produced on so
//! JSON log pipelines can filter on them.

use crate::collector::CycleReport;
use tracing::{info, warn};

/// Structured logger for exporter events
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    host_name: String,
}

impl StructuredLogger {
    pub fn new(host_name: impl Into<String>) -> Self {
        Self {
            host_name: host_name.into(),
        }
    }

    /// Log exporter startup
    pub fn log_startup(&self, version: &str, namespace: &str, status_selector: &str) {
        info!(
            event = "exporter_started",
            host = %self.host_name,
            exporter_version = %version,
            namespace = %namespace,
            status_selector = %status_selector,
            "Stats exporter started"
        );
    }

    /// Log exporter shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "exporter_shutdown",
            host = %self.host_name,
            reason = %reason,
            "Stats exporter shutting down"
        );
    }

    /// A container's resource metrics were skipped for this cycle
    pub fn log_container_skipped(&self, container: &str, reason: &str) {
        info!(
            event = "container_skipped",
            host = %self.host_name,
            container = %container,
            reason = %reason,
            "Skipping container stats for this cycle"
        );
    }

    /// A metric could not be published
    pub fn log_metric_failed(&self, metric: &str, container: &str, error: &str, attempts: u32) {
        warn!(
            event = "metric_submit_failed",
            host = %self.host_name,
            metric = %metric,
            container = %container,
            attempts = attempts,
            error = %error,
            "Failed to publish metric"
        );
    }

    /// The container listing failed, nothing was collected
    pub fn log_cycle_failed(&self, error: &str) {
        warn!(
            event = "cycle_failed",
            host = %self.host_name,
            error = %error,
            "Collection cycle failed"
        );
    }

    /// Summary of a finished collection cycle
    pub fn log_cycle_complete(&self, report: &CycleReport) {
        info!(
            event = "cycle_complete",
            host = %self.host_name,
            containers = report.containers_seen,
            containers_skipped = report.containers_skipped(),
            samples_emitted = report.emit.succeeded,
            samples_failed = report.emit.failed(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Collection cycle complete"
        );
    }
}
