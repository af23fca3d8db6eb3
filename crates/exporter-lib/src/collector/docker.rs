//! Docker Engine API client
//!
//! Talks to the Engine's HTTP endpoint (`DOCKER_HOST=tcp://...` or a socket
//! proxy) and maps the JSON stats payload onto [`RawContainerStats`].

use super::ContainerRuntime;
use crate::error::StatsError;
use crate::models::{ContainerHandle, RawContainerStats};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Container runtime client backed by the Docker Engine API
pub struct DockerClient {
    client: Client,
    base_url: Url,
    include_stopped: bool,
}

impl DockerClient {
    /// Create a new client for the given Engine endpoint
    pub fn new(endpoint: &str, timeout: Duration, include_stopped: bool) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(endpoint)
            .with_context(|| format!("Invalid Docker endpoint: {}", endpoint))?;

        Ok(Self {
            client,
            base_url,
            include_stopped,
        })
    }

    fn url(&self, path: &str) -> Result<Url, StatsError> {
        self.base_url
            .join(path)
            .map_err(|e| StatsError::NoData(format!("invalid request path {}: {}", path, e)))
    }

    /// Convert an Engine stats payload into raw counters.
    ///
    /// Missing fields mean the runtime has nothing usable for this
    /// container yet, which is reported as [`StatsError::NoData`].
    pub fn parse_stats(
        payload: &serde_json::Value,
        fallback_name: &str,
    ) -> Result<RawContainerStats, StatsError> {
        let stats: EngineStats = serde_json::from_value(payload.clone())
            .map_err(|e| StatsError::NoData(format!("malformed stats payload: {}", e)))?;

        let memory = stats.memory_stats.unwrap_or_default();
        let cpu = stats
            .cpu_stats
            .ok_or_else(|| missing("cpu_stats"))?;
        let precpu = stats
            .precpu_stats
            .ok_or_else(|| missing("precpu_stats"))?;

        let cpu_usage = cpu.cpu_usage.ok_or_else(|| missing("cpu_stats.cpu_usage"))?;
        let precpu_usage = precpu
            .cpu_usage
            .ok_or_else(|| missing("precpu_stats.cpu_usage"))?;

        let online_cpu_count = cpu
            .online_cpus
            .or_else(|| {
                cpu_usage
                    .percpu_usage
                    .as_ref()
                    .map(|per_cpu| per_cpu.len() as u32)
            })
            .filter(|count| *count > 0)
            .ok_or_else(|| missing("cpu_stats.online_cpus"))?;

        let name = stats
            .name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| fallback_name.to_string());

        Ok(RawContainerStats {
            name,
            memory_usage_bytes: memory.usage.ok_or_else(|| missing("memory_stats.usage"))?,
            memory_limit_bytes: memory.limit.ok_or_else(|| missing("memory_stats.limit"))?,
            cpu_usage_nanos: cpu_usage
                .total_usage
                .ok_or_else(|| missing("cpu_stats.cpu_usage.total_usage"))?,
            previous_cpu_usage_nanos: precpu_usage
                .total_usage
                .ok_or_else(|| missing("precpu_stats.cpu_usage.total_usage"))?,
            system_cpu_usage_nanos: cpu
                .system_cpu_usage
                .ok_or_else(|| missing("cpu_stats.system_cpu_usage"))?,
            previous_system_cpu_usage_nanos: precpu
                .system_cpu_usage
                .ok_or_else(|| missing("precpu_stats.system_cpu_usage"))?,
            online_cpu_count,
        })
    }
}

fn missing(field: &str) -> StatsError {
    StatsError::NoData(format!("missing field {}", field))
}

async fn api_error(response: reqwest::Response) -> StatsError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    StatsError::Api { status, body }
}

#[async_trait]
impl ContainerRuntime for DockerClient {
    async fn ping(&self) -> Result<()> {
        let url = self.url("/_ping")?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to reach Docker Engine")?;

        if !response.status().is_success() {
            let status = response.status();
            anyhow::bail!("Docker Engine ping failed ({})", status);
        }

        Ok(())
    }

    async fn list_containers(&self) -> Result<Vec<ContainerHandle>> {
        let mut url = self.url("/containers/json")?;
        url.query_pairs_mut()
            .append_pair("all", if self.include_stopped { "true" } else { "false" });

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to list containers")?;

        if !response.status().is_success() {
            return Err(api_error(response).await.into());
        }

        let summaries: Vec<ContainerSummary> = response
            .json()
            .await
            .context("Failed to parse container list")?;

        Ok(summaries
            .into_iter()
            .map(|s| ContainerHandle {
                name: s.names.into_iter().next().unwrap_or_else(|| s.id.clone()),
                id: s.id,
                status: s.state,
            })
            .collect())
    }

    async fn stats(&self, container: &ContainerHandle) -> Result<RawContainerStats, StatsError> {
        let mut url = self.url(&format!("/containers/{}/stats", container.id))?;
        url.query_pairs_mut().append_pair("stream", "false");

        let response = self.client.get(url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(StatsError::NoData(format!(
                "container {} no longer exists",
                container.id
            )));
        }
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| StatsError::NoData(format!("unreadable stats body: {}", e)))?;

        debug!(container_id = %container.id, "Fetched container stats");
        Self::parse_stats(&payload, &container.name)
    }
}

/// Entry of `GET /containers/json`
#[derive(Debug, Deserialize)]
struct ContainerSummary {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "Names", default)]
    names: Vec<String>,
    #[serde(rename = "State", default)]
    state: String,
}

#[derive(Debug, Deserialize)]
struct EngineStats {
    name: Option<String>,
    memory_stats: Option<MemoryStats>,
    cpu_stats: Option<CpuStats>,
    precpu_stats: Option<CpuStats>,
}

#[derive(Debug, Default, Deserialize)]
struct MemoryStats {
    usage: Option<u64>,
    limit: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct CpuStats {
    cpu_usage: Option<CpuUsage>,
    system_cpu_usage: Option<u64>,
    online_cpus: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct CpuUsage {
    total_usage: Option<u64>,
    percpu_usage: Option<Vec<u64>>,
}
