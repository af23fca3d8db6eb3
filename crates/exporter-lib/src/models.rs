//! Core data models for the stats exporter

use serde::{Deserialize, Serialize};
use std::fmt;

/// Dimension key carrying the normalized container name
pub const SERVICE_NAME_DIMENSION: &str = "ServiceName";

/// Dimension key carrying the host identity
pub const HOST_NAME_DIMENSION: &str = "HostName";

/// Default namespace all metrics are published under
pub const DEFAULT_NAMESPACE: &str = "Docker/Stats";

/// A container as reported by the runtime's listing call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerHandle {
    pub id: String,
    /// Raw runtime name, possibly prefixed with `/`
    pub name: String,
    /// Raw runtime state literal (`running`, `exited`, `paused`, ...)
    pub status: String,
}

/// Point-in-time counters for one container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawContainerStats {
    pub name: String,
    pub memory_usage_bytes: u64,
    pub memory_limit_bytes: u64,
    pub cpu_usage_nanos: u64,
    pub previous_cpu_usage_nanos: u64,
    pub system_cpu_usage_nanos: u64,
    pub previous_system_cpu_usage_nanos: u64,
    pub online_cpu_count: u32,
}

/// Metric kinds produced by the derivation engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    CpuPercent,
    MemCurrentGb,
    MemPercent,
    Status,
}

impl MetricKind {
    /// Metric name as published to the sink
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::CpuPercent => "cpu_percent",
            MetricKind::MemCurrentGb => "mem_current_gb",
            MetricKind::MemPercent => "mem_percent",
            MetricKind::Status => "status",
        }
    }

    /// Measurement unit for this kind.
    ///
    /// Exhaustive on purpose: a new kind must pick its unit here.
    pub fn unit(&self) -> Unit {
        match self {
            MetricKind::CpuPercent | MetricKind::MemPercent => Unit::Percent,
            MetricKind::MemCurrentGb => Unit::Gigabytes,
            MetricKind::Status => Unit::None,
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Measurement unit understood by the monitoring backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    Percent,
    Gigabytes,
    None,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Percent => "Percent",
            Unit::Gigabytes => "Gigabytes",
            Unit::None => "None",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One derived value for one container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetricSample {
    pub kind: MetricKind,
    pub value: f64,
    pub container_name: String,
    pub host_name: String,
}

impl DerivedMetricSample {
    pub fn new(
        kind: MetricKind,
        value: f64,
        container_name: impl Into<String>,
        host_name: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            value,
            container_name: container_name.into(),
            host_name: host_name.into(),
        }
    }

    /// Unit is a pure function of the kind
    pub fn unit(&self) -> Unit {
        self.kind.unit()
    }

    /// Build the sink-facing datum with the standard dimension set
    pub fn to_datum(&self) -> MetricDatum {
        MetricDatum {
            name: self.kind.as_str().to_string(),
            dimensions: vec![
                (
                    SERVICE_NAME_DIMENSION.to_string(),
                    self.container_name.clone(),
                ),
                (HOST_NAME_DIMENSION.to_string(), self.host_name.clone()),
            ],
            unit: self.unit(),
            value: self.value,
        }
    }
}

/// A single metric publish request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDatum {
    pub name: String,
    /// Ordered (name, value) dimension pairs
    pub dimensions: Vec<(String, String)>,
    pub unit: Unit,
    pub value: f64,
}
