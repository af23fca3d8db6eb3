//! A single collection pass over every container

use super::derive::{derive, status_sample};
use super::sampler::{is_in_scope, normalize_name};
use super::ContainerRuntime;
use crate::emitter::{EmissionBatcher, EmitResult};
use crate::models::ContainerHandle;
use crate::observability::StructuredLogger;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Per-cycle settings
#[derive(Debug, Clone)]
pub struct CycleSettings {
    /// Host identity attached to every sample
    pub host_name: String,
    /// Substring selecting containers for liveness reporting
    pub status_selector: String,
    /// Containers processed at the same time
    pub concurrency: usize,
}

impl Default for CycleSettings {
    fn default() -> Self {
        Self {
            host_name: "unknown".to_string(),
            status_selector: "app".to_string(),
            concurrency: 4,
        }
    }
}

/// What happened to one container during a cycle
#[derive(Debug, Clone)]
pub struct ContainerOutcome {
    /// Normalized container name
    pub container: String,
    /// A status sample was produced
    pub status_reported: bool,
    /// Why resource metrics were skipped, if they were
    pub skipped: Option<String>,
    pub emit: EmitResult,
}

/// Results from a collection cycle
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub containers_seen: usize,
    pub outcomes: Vec<ContainerOutcome>,
    /// Aggregate over every container
    pub emit: EmitResult,
    pub elapsed: Duration,
}

impl CycleReport {
    pub fn containers_skipped(&self) -> usize {
        self.outcomes.iter().filter(|o| o.skipped.is_some()).count()
    }

    pub fn outcome(&self, container: &str) -> Option<&ContainerOutcome> {
        self.outcomes.iter().find(|o| o.container == container)
    }
}

/// Runs collection cycles against injected runtime and sink collaborators
pub struct CollectionCycle {
    runtime: Arc<dyn ContainerRuntime>,
    batcher: Arc<EmissionBatcher>,
    settings: Arc<CycleSettings>,
    logger: StructuredLogger,
}

impl CollectionCycle {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        batcher: Arc<EmissionBatcher>,
        settings: CycleSettings,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            runtime,
            batcher,
            settings: Arc::new(settings),
            logger,
        }
    }

    pub fn settings(&self) -> &CycleSettings {
        &self.settings
    }

    pub fn logger(&self) -> &StructuredLogger {
        &self.logger
    }

    /// Collect and publish metrics for every listed container.
    ///
    /// Only a failure to list containers is an error; per-container and
    /// per-sample failures are recorded in the report.
    pub async fn run_once(&self) -> Result<CycleReport> {
        let start = Instant::now();

        let containers = self
            .runtime
            .list_containers()
            .await
            .context("Failed to list containers")?;

        let mut report = CycleReport {
            containers_seen: containers.len(),
            ..Default::default()
        };

        let semaphore = Arc::new(Semaphore::new(self.settings.concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for container in containers {
            let permit = semaphore.clone().acquire_owned().await?;
            let runtime = self.runtime.clone();
            let batcher = self.batcher.clone();
            let settings = self.settings.clone();
            let logger = self.logger.clone();

            tasks.spawn(async move {
                let _permit = permit;
                collect_container(
                    runtime.as_ref(),
                    &batcher,
                    &settings,
                    &logger,
                    container,
                )
                .await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => {
                    report.emit.merge(outcome.emit.clone());
                    report.outcomes.push(outcome);
                }
                Err(e) => warn!(error = %e, "Container collection task failed"),
            }
        }

        report.elapsed = start.elapsed();
        Ok(report)
    }
}

async fn collect_container(
    runtime: &dyn ContainerRuntime,
    batcher: &EmissionBatcher,
    settings: &CycleSettings,
    logger: &StructuredLogger,
    container: ContainerHandle,
) -> ContainerOutcome {
    let name = normalize_name(&container.name).to_string();
    let mut samples = Vec::with_capacity(4);
    let mut status_reported = false;

    if is_in_scope(&container, &settings.status_selector) {
        match status_sample(&container, &settings.host_name) {
            Some(sample) => {
                samples.push(sample);
                status_reported = true;
            }
            None => debug!(
                container = %name,
                state = %container.status,
                "State not reported as status"
            ),
        }
    }

    let skipped = match runtime.stats(&container).await {
        Ok(raw) => {
            samples.extend(derive(&raw, &settings.host_name));
            None
        }
        Err(e) => {
            let reason = e.to_string();
            logger.log_container_skipped(&name, &reason);
            Some(reason)
        }
    };

    let emit = batcher.emit(&samples).await;

    ContainerOutcome {
        container: name,
        status_reported,
        skipped,
        emit,
    }
}

/// Builder for a [`CollectionCycle`]
pub struct CollectionCycleBuilder {
    runtime: Option<Arc<dyn ContainerRuntime>>,
    batcher: Option<Arc<EmissionBatcher>>,
    settings: CycleSettings,
}

impl CollectionCycleBuilder {
    pub fn new() -> Self {
        Self {
            runtime: None,
            batcher: None,
            settings: CycleSettings::default(),
        }
    }

    /// Set the container runtime client
    pub fn runtime(mut self, runtime: Arc<dyn ContainerRuntime>) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Set the emission batcher
    pub fn batcher(mut self, batcher: Arc<EmissionBatcher>) -> Self {
        self.batcher = Some(batcher);
        self
    }

    pub fn host_name(mut self, host_name: impl Into<String>) -> Self {
        self.settings.host_name = host_name.into();
        self
    }

    pub fn status_selector(mut self, selector: impl Into<String>) -> Self {
        self.settings.status_selector = selector.into();
        self
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.settings.concurrency = concurrency;
        self
    }

    /// Build the cycle
    pub fn build(self) -> Result<CollectionCycle> {
        let runtime = self
            .runtime
            .ok_or_else(|| anyhow::anyhow!("Runtime client is required"))?;
        let batcher = self
            .batcher
            .ok_or_else(|| anyhow::anyhow!("Emission batcher is required"))?;
        if self.settings.concurrency == 0 {
            anyhow::bail!("Concurrency must be at least 1");
        }

        let logger = StructuredLogger::new(self.settings.host_name.clone());
        Ok(CollectionCycle::new(runtime, batcher, self.settings, logger))
    }
}

impl Default for CollectionCycleBuilder {
    fn default() -> Self {
        Self::new()
    }
}
