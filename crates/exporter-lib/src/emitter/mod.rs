//! Metric emission
//!
//! Submits derived samples to a [`MetricsSink`] one datum per call, with a
//! bounded timeout and retry budget per sample. A failing sample is logged
//! and recorded; it never stops the rest of the batch.

mod emf;

pub use emf::{EmfSink, EmfTransport};

use crate::collector::rand_jitter;
use crate::error::SinkError;
use crate::models::{DerivedMetricSample, MetricDatum, MetricKind, DEFAULT_NAMESPACE};
use crate::observability::StructuredLogger;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Destination for published metrics
#[async_trait]
pub trait MetricsSink: Send + Sync {
    /// Publish one datum under `namespace`
    async fn put_metric(&self, datum: &MetricDatum, namespace: &str) -> Result<(), SinkError>;
}

/// Configuration for the emission batcher
#[derive(Debug, Clone)]
pub struct EmitterConfig {
    /// Namespace every metric is published under
    pub namespace: String,
    /// Upper bound on a single sink call
    pub timeout: Duration,
    /// Extra attempts after a transient failure
    pub max_retries: u32,
    /// Base delay between attempts, grows linearly with the attempt number
    pub retry_backoff: Duration,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            timeout: Duration::from_secs(5),
            max_retries: 2,
            retry_backoff: Duration::from_millis(200),
        }
    }
}

/// A sample that could not be published
#[derive(Debug, Clone, PartialEq)]
pub struct SampleFailure {
    pub kind: MetricKind,
    pub container_name: String,
    pub error: String,
    pub attempts: u32,
}

/// Outcome of emitting a batch of samples
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmitResult {
    pub succeeded: usize,
    pub failures: Vec<SampleFailure>,
}

impl EmitResult {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn attempted(&self) -> usize {
        self.succeeded + self.failed()
    }

    /// Fold another result into this one
    pub fn merge(&mut self, other: EmitResult) {
        self.succeeded += other.succeeded;
        self.failures.extend(other.failures);
    }
}

/// Submits samples to a sink with per-sample failure isolation
pub struct EmissionBatcher {
    sink: Arc<dyn MetricsSink>,
    config: EmitterConfig,
    logger: StructuredLogger,
}

impl EmissionBatcher {
    pub fn new(
        sink: Arc<dyn MetricsSink>,
        config: EmitterConfig,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            sink,
            config,
            logger,
        }
    }

    pub fn config(&self) -> &EmitterConfig {
        &self.config
    }

    /// Emit every sample, continuing past failures
    pub async fn emit(&self, samples: &[DerivedMetricSample]) -> EmitResult {
        let mut result = EmitResult::default();

        for sample in samples {
            match self.emit_one(sample).await {
                Ok(()) => {
                    result.succeeded += 1;
                    debug!(
                        metric = %sample.kind,
                        container = %sample.container_name,
                        value = sample.value,
                        unit = %sample.unit(),
                        "Metric published"
                    );
                }
                Err((error, attempts)) => {
                    self.logger.log_metric_failed(
                        sample.kind.as_str(),
                        &sample.container_name,
                        &error.to_string(),
                        attempts,
                    );
                    result.failures.push(SampleFailure {
                        kind: sample.kind,
                        container_name: sample.container_name.clone(),
                        error: error.to_string(),
                        attempts,
                    });
                }
            }
        }

        result
    }

    /// Publish a single sample, retrying transient failures.
    /// On failure returns the last error and the number of attempts made.
    async fn emit_one(&self, sample: &DerivedMetricSample) -> Result<(), (SinkError, u32)> {
        let datum = sample.to_datum();

        if !datum.value.is_finite() {
            return Err((
                SinkError::InvalidValue {
                    metric: datum.name,
                    value: datum.value,
                },
                0,
            ));
        }

        let mut attempt = 0u32;
        loop {
            attempt += 1;

            let outcome = tokio::time::timeout(
                self.config.timeout,
                self.sink.put_metric(&datum, &self.config.namespace),
            )
            .await
            .unwrap_or(Err(SinkError::Timeout(self.config.timeout)));

            match outcome {
                Ok(()) => return Ok(()),
                Err(e) if e.is_transient() && attempt <= self.config.max_retries => {
                    let delay = self.retry_delay(attempt);
                    debug!(
                        metric = %datum.name,
                        attempt = attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying metric submission"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err((e, attempt)),
            }
        }
    }

    fn retry_delay(&self, attempt: u32) -> Duration {
        let base = self.config.retry_backoff * attempt;
        let jitter_ms = rand_jitter(self.config.retry_backoff.as_millis() as u64);
        base + Duration::from_millis(jitter_ms)
    }
}
