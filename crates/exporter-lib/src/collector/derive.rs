//! Derivation of normalized metric values from raw runtime counters

use super::sampler::{classify_status, normalize_name};
use crate::models::{ContainerHandle, DerivedMetricSample, MetricKind, RawContainerStats};

/// Bytes per binary gigabyte
const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Round to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Memory usage in binary gigabytes (unrounded)
pub fn bytes_to_gib(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_GIB
}

/// Memory usage as a percentage of the limit, `None` when the limit is zero
pub fn memory_percent(usage_bytes: u64, limit_bytes: u64) -> Option<f64> {
    let total_gb = bytes_to_gib(limit_bytes);
    if total_gb == 0.0 {
        return None;
    }
    Some(round2(bytes_to_gib(usage_bytes) / total_gb * 100.0))
}

/// CPU usage over the sampling window, scaled by online CPUs.
///
/// Returns exactly `0.0` when the host-wide counter did not advance.
pub fn cpu_percent(stats: &RawContainerStats) -> f64 {
    let cpu_delta = stats
        .cpu_usage_nanos
        .saturating_sub(stats.previous_cpu_usage_nanos) as f64;
    let system_delta =
        stats.system_cpu_usage_nanos as i128 - stats.previous_system_cpu_usage_nanos as i128;

    if system_delta <= 0 {
        return 0.0;
    }

    round2(cpu_delta / system_delta as f64 * 100.0 * f64::from(stats.online_cpu_count))
}

/// Derive resource samples for one container.
///
/// Yields `mem_current_gb`, `mem_percent` (only with a non-zero limit) and
/// `cpu_percent`, in that order.
pub fn derive(stats: &RawContainerStats, host_name: &str) -> Vec<DerivedMetricSample> {
    let name = normalize_name(&stats.name);
    let mut samples = Vec::with_capacity(3);

    samples.push(DerivedMetricSample::new(
        MetricKind::MemCurrentGb,
        round2(bytes_to_gib(stats.memory_usage_bytes)),
        name,
        host_name,
    ));

    if let Some(mem_percent) = memory_percent(stats.memory_usage_bytes, stats.memory_limit_bytes)
    {
        samples.push(DerivedMetricSample::new(
            MetricKind::MemPercent,
            mem_percent,
            name,
            host_name,
        ));
    }

    samples.push(DerivedMetricSample::new(
        MetricKind::CpuPercent,
        cpu_percent(stats),
        name,
        host_name,
    ));

    samples
}

/// Liveness sample for a container, `None` for unreported states
pub fn status_sample(container: &ContainerHandle, host_name: &str) -> Option<DerivedMetricSample> {
    let code = classify_status(container).code()?;
    Some(DerivedMetricSample::new(
        MetricKind::Status,
        code,
        normalize_name(&container.name),
        host_name,
    ))
}
