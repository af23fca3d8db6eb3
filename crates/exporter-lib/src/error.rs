//! Recoverable error types for the collection pipeline

use std::time::Duration;
use thiserror::Error;

/// Failure to obtain a stats snapshot for one container
#[derive(Debug, Error)]
pub enum StatsError {
    /// The runtime has no usable data for this container right now
    /// (just started, just stopped, or already removed).
    #[error("no stats data: {0}")]
    NoData(String),

    #[error("runtime request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("runtime returned status {status}: {body}")]
    Api { status: u16, body: String },
}

/// Failure to submit one metric to the sink
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("value {value} for metric {metric} is not representable")]
    InvalidValue { metric: String, value: f64 },

    #[error("sink transport failed: {0}")]
    Transport(#[from] std::io::Error),

    #[error("sink encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("sink call timed out after {0:?}")]
    Timeout(Duration),
}

impl SinkError {
    /// Whether retrying the same call could succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, SinkError::Transport(_) | SinkError::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_error_transient() {
        assert!(SinkError::Timeout(Duration::from_millis(10)).is_transient());
        assert!(SinkError::Transport(std::io::Error::other("reset")).is_transient());
        assert!(!SinkError::InvalidValue {
            metric: "cpu_percent".to_string(),
            value: f64::NAN,
        }
        .is_transient());
    }
}
