//! Stats collection from the container runtime
//!
//! This module lists containers, selects the ones in scope for liveness
//! reporting, derives normalized metric values from raw runtime counters
//! and drives one collection cycle at a time.

mod cycle;
mod derive;
mod docker;
mod r#loop;
mod sampler;


pub use cycle::{
    CollectionCycle, CollectionCycleBuilder, ContainerOutcome, CycleReport, CycleSettings,
};
pub use derive::{bytes_to_gib, cpu_percent, derive, memory_percent, round2, status_sample};
pub use docker::DockerClient;
pub use r#loop::{CollectionLoop, LoopConfig};
pub(crate) use r#loop::rand_jitter;
pub use sampler::{classify_status, is_in_scope, normalize_name, select_in_scope, ContainerStatus};

use crate::error::StatsError;
use crate::models::{ContainerHandle, RawContainerStats};
use anyhow::Result;

pub use async_trait::async_trait;

/// Client for the container runtime
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Check the runtime is reachable
    async fn ping(&self) -> Result<()>;

    /// List containers currently known to the runtime
    async fn list_containers(&self) -> Result<Vec<ContainerHandle>>;

    /// Take one stats snapshot for a container
    async fn stats(&self, container: &ContainerHandle) -> Result<RawContainerStats, StatsError>;
}
