//! End-to-end tests: runtime snapshot to EMF documents on the wire

use exporter_lib::{
    collector::{async_trait, CollectionCycleBuilder, ContainerRuntime},
    emitter::{EmfSink, EmfTransport, EmissionBatcher, EmitterConfig},
    ContainerHandle, RawContainerStats, StatsError, StructuredLogger,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;

struct SnapshotRuntime {
    containers: Vec<ContainerHandle>,
}

#[async_trait]
impl ContainerRuntime for SnapshotRuntime {
    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn list_containers(&self) -> anyhow::Result<Vec<ContainerHandle>> {
        Ok(self.containers.clone())
    }

    async fn stats(&self, container: &ContainerHandle) -> Result<RawContainerStats, StatsError> {
        if container.status != "running" {
            return Err(StatsError::NoData("missing field memory_stats.usage".to_string()));
        }
        Ok(RawContainerStats {
            name: container.name.clone(),
            memory_usage_bytes: 1_073_741_824,
            memory_limit_bytes: 2_147_483_648,
            cpu_usage_nanos: 200,
            previous_cpu_usage_nanos: 100,
            system_cpu_usage_nanos: 1200,
            previous_system_cpu_usage_nanos: 1000,
            online_cpu_count: 2,
        })
    }
}

fn handle(id: &str, name: &str, status: &str) -> ContainerHandle {
    ContainerHandle {
        id: id.to_string(),
        name: name.to_string(),
        status: status.to_string(),
    }
}

/// Accept one connection and collect `expected` EMF lines
async fn listen(expected: usize) -> (String, tokio::task::JoinHandle<Vec<Value>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = format!("tcp://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let mut lines = BufReader::new(socket).lines();
        let mut documents = Vec::new();
        while documents.len() < expected {
            match lines.next_line().await.unwrap() {
                Some(line) => documents.push(serde_json::from_str(&line).unwrap()),
                None => break,
            }
        }
        documents
    });

    (addr, handle)
}

fn find<'a>(documents: &'a [Value], container: &str, metric: &str) -> Option<&'a Value> {
    documents
        .iter()
        .find(|d| d["ServiceName"] == container && d.get(metric).is_some())
}

#[tokio::test]
async fn test_cycle_publishes_emf_documents() {
    let runtime = SnapshotRuntime {
        containers: vec![
            handle("1", "/app1", "running"),
            handle("2", "/web", "running"),
            handle("3", "/app-old", "exited"),
        ],
    };

    // app1: status + 3 resource, web: 3 resource, app-old: status only
    let (endpoint, receiver) = listen(8).await;
    let sink = Arc::new(EmfSink::new(EmfTransport::parse(&endpoint).unwrap()));
    let batcher = EmissionBatcher::new(
        sink,
        EmitterConfig {
            timeout: Duration::from_secs(2),
            ..Default::default()
        },
        StructuredLogger::new("host-a"),
    );

    let cycle = CollectionCycleBuilder::new()
        .runtime(Arc::new(runtime))
        .batcher(Arc::new(batcher))
        .host_name("host-a")
        .status_selector("app")
        .concurrency(1)
        .build()
        .unwrap();

    let report = tokio_test::assert_ok!(cycle.run_once().await);
    assert_eq!(report.containers_seen, 3);
    assert_eq!(report.containers_skipped(), 1);
    assert_eq!(report.emit.succeeded, 8);

    let documents = receiver.await.unwrap();
    assert_eq!(documents.len(), 8);

    let cpu = find(&documents, "app1", "cpu_percent").unwrap();
    assert_eq!(cpu["cpu_percent"], 100.0);
    assert_eq!(cpu["HostName"], "host-a");
    assert_eq!(cpu["_aws"]["CloudWatchMetrics"][0]["Namespace"], "Docker/Stats");
    assert_eq!(
        cpu["_aws"]["CloudWatchMetrics"][0]["Metrics"][0]["Unit"],
        "Percent"
    );

    let mem = find(&documents, "web", "mem_current_gb").unwrap();
    assert_eq!(mem["mem_current_gb"], 1.0);
    assert_eq!(
        mem["_aws"]["CloudWatchMetrics"][0]["Metrics"][0]["Unit"],
        "Gigabytes"
    );

    assert!(find(&documents, "web", "status").is_none());
    assert_eq!(find(&documents, "app1", "status").unwrap()["status"], 1.0);
    assert_eq!(find(&documents, "app-old", "status").unwrap()["status"], 0.0);
    assert!(find(&documents, "app-old", "cpu_percent").is_none());
}

#[tokio::test]
async fn test_unreachable_sink_fails_samples_not_cycle() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("tcp://{}", listener.local_addr().unwrap());
    drop(listener);

    let batcher = EmissionBatcher::new(
        Arc::new(EmfSink::new(EmfTransport::parse(&endpoint).unwrap())),
        EmitterConfig {
            max_retries: 1,
            retry_backoff: Duration::from_millis(1),
            timeout: Duration::from_millis(500),
            ..Default::default()
        },
        StructuredLogger::new("host-a"),
    );

    let cycle = CollectionCycleBuilder::new()
        .runtime(Arc::new(SnapshotRuntime {
            containers: vec![handle("1", "/app1", "running")],
        }))
        .batcher(Arc::new(batcher))
        .host_name("host-a")
        .build()
        .unwrap();

    let report = tokio_test::assert_ok!(cycle.run_once().await);
    assert_eq!(report.emit.succeeded, 0);
    assert_eq!(report.emit.failed(), 4);
    assert!(report.emit.failures.iter().all(|f| f.attempts == 2));
}
