//! CloudWatch Embedded Metric Format sink
//!
//! Each datum becomes one newline-terminated EMF JSON document. Documents
//! go either to the CloudWatch agent's EMF listener over TCP or to stdout,
//! where a log shipper picks them up.

use super::MetricsSink;
use crate::error::SinkError;
use crate::models::MetricDatum;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Where EMF documents are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmfTransport {
    /// `host:port` of an EMF TCP listener
    Tcp(String),
    Stdout,
}

impl EmfTransport {
    /// Parse `tcp://host:port` or `stdout`
    pub fn parse(endpoint: &str) -> Result<Self> {
        if endpoint == "stdout" {
            return Ok(EmfTransport::Stdout);
        }

        let url = url::Url::parse(endpoint)
            .with_context(|| format!("Invalid sink endpoint: {}", endpoint))?;
        if url.scheme() != "tcp" {
            anyhow::bail!("Unsupported sink scheme: {}", url.scheme());
        }

        let host = url
            .host_str()
            .ok_or_else(|| anyhow::anyhow!("No host in sink endpoint {}", endpoint))?;
        let port = url
            .port()
            .ok_or_else(|| anyhow::anyhow!("No port in sink endpoint {}", endpoint))?;

        Ok(EmfTransport::Tcp(format!("{}:{}", host, port)))
    }
}

/// Metrics sink writing Embedded Metric Format documents
pub struct EmfSink {
    transport: EmfTransport,
    /// Reused TCP connection, dropped after a write error
    stream: Mutex<Option<TcpStream>>,
}

impl EmfSink {
    pub fn new(transport: EmfTransport) -> Self {
        info!(transport = ?transport, "Using EMF metrics sink");
        Self {
            transport,
            stream: Mutex::new(None),
        }
    }

    /// Build the EMF document for one datum
    pub fn encode(datum: &MetricDatum, namespace: &str, timestamp_ms: i64) -> Value {
        let dimension_keys: Vec<&str> = datum.dimensions.iter().map(|(k, _)| k.as_str()).collect();

        let mut document = Map::new();
        document.insert(
            "_aws".to_string(),
            json!({
                "Timestamp": timestamp_ms,
                "CloudWatchMetrics": [{
                    "Namespace": namespace,
                    "Dimensions": [dimension_keys],
                    "Metrics": [{ "Name": datum.name, "Unit": datum.unit.as_str() }]
                }]
            }),
        );
        for (key, value) in &datum.dimensions {
            document.insert(key.clone(), Value::String(value.clone()));
        }
        document.insert(datum.name.clone(), json!(datum.value));

        Value::Object(document)
    }

    async fn write_tcp(&self, addr: &str, line: &[u8]) -> Result<(), SinkError> {
        let mut guard = self.stream.lock().await;

        if guard.is_none() {
            debug!(addr = %addr, "Connecting to EMF listener");
            *guard = Some(TcpStream::connect(addr).await?);
        }

        if let Some(stream) = guard.as_mut() {
            if let Err(e) = stream.write_all(line).await {
                *guard = None;
                return Err(e.into());
            }
        }

        Ok(())
    }
}

#[async_trait]
impl MetricsSink for EmfSink {
    async fn put_metric(&self, datum: &MetricDatum, namespace: &str) -> Result<(), SinkError> {
        if !datum.value.is_finite() {
            return Err(SinkError::InvalidValue {
                metric: datum.name.clone(),
                value: datum.value,
            });
        }

        let document = Self::encode(datum, namespace, chrono::Utc::now().timestamp_millis());
        let mut line = serde_json::to_vec(&document)?;
        line.push(b'\n');

        match &self.transport {
            EmfTransport::Tcp(addr) => self.write_tcp(addr, &line).await,
            EmfTransport::Stdout => {
                let mut stdout = tokio::io::stdout();
                stdout.write_all(&line).await?;
                stdout.flush().await?;
                Ok(())
            }
        }
    }
}
