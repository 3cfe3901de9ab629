//! Prometheus container metrics: an instant-query multiplexer plus an
//! instrumentor that registers on `kubernetes.io/Pod#container`, so the
//! registry fans it out next to the Kubernetes container sensor.

pub mod models;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::generic::{SensorConstant, SystemAll};
use crate::instrument::{
    ApiError, Instrumentor, InstrumentorError, InstrumentorRegistry, Kind, Target,
};
use crate::k8s;
use crate::models::{Log, Scanner, Severity, State, Status};
use models::{InstantData, PromResponse};

// ─── API facade ───────────────────────────────────────────────────────────────

pub struct PrometheusApi {
    base_url: String,
    http: reqwest::Client,
}

impl PrometheusApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into(),
            http,
        }
    }

    /// Run an instant query.
    pub async fn query_instant(&self, query: &str) -> Result<PromResponse<InstantData>, ApiError> {
        let url = format!("{}/api/v1/query", self.base_url);
        debug!(%url, query, "instant query");
        let res = self.http.post(&url).form(&[("query", query)]).send().await?;
        if !res.status().is_success() {
            return Err(ApiError::Response(format!(
                "prometheus returned {} for {url}",
                res.status()
            )));
        }
        Ok(res.json().await?)
    }
}

// ─── Query multiplexer ────────────────────────────────────────────────────────

/// Splits one query result into per-keyset lookups. The query runs once per
/// scan; every `result` call afterwards reads the memoised map.
pub struct QueryMultiplexer {
    api: Arc<PrometheusApi>,
    query: String,
    group_by: Vec<String>,
    results: Mutex<Option<Arc<HashMap<Vec<String>, f64>>>>,
}

impl QueryMultiplexer {
    pub fn new(api: Arc<PrometheusApi>, query: impl Into<String>, group_by: &[&str]) -> Self {
        Self {
            api,
            query: query.into(),
            group_by: group_by.iter().map(ToString::to_string).collect(),
            results: Mutex::new(None),
        }
    }

    /// The sample whose `group_by` label values equal `keyset`, if any.
    pub async fn result(&self, keyset: &[&str]) -> Result<Option<f64>, ApiError> {
        let map = self.fetch().await?;
        let key: Vec<String> = keyset.iter().map(ToString::to_string).collect();
        Ok(map.get(&key).copied())
    }

    async fn fetch(&self) -> Result<Arc<HashMap<Vec<String>, f64>>, ApiError> {
        let mut cached = self.results.lock().await;
        if let Some(map) = cached.as_ref() {
            return Ok(map.clone());
        }

        let response = self.api.query_instant(&self.query).await?;
        let mut map = HashMap::new();
        for sample in response.data.result {
            let key: Vec<String> = self
                .group_by
                .iter()
                .map(|label| sample.metric.get(label).cloned().unwrap_or_default())
                .collect();
            match sample.value.1.parse::<f64>() {
                Ok(value) => {
                    map.insert(key, value);
                }
                Err(_) => warn!(value = %sample.value.1, "unparseable sample value"),
            }
        }
        let map = Arc::new(map);
        *cached = Some(map.clone());
        Ok(map)
    }
}

// ─── Container metrics instrumentor ───────────────────────────────────────────

const Q_CPU: &str = "(sum(rate(container_cpu_usage_seconds_total{}[5m])) by (container, pod, namespace) \
     / on (container, pod, namespace) ((kube_pod_container_resource_limits{resource=\"cpu\"} > 0) * 300))";
const Q_MEM: &str = "(sum(container_memory_working_set_bytes{}) by (container, pod, namespace) \
     / on (container, pod, namespace) (kube_pod_container_resource_limits{resource=\"memory\"} > 0))";
const Q_RESTARTS: &str =
    "sum(increase(kube_pod_container_status_restarts_total[1h]) > 0) by (container, pod, namespace)";

const UTILISATION_LIMIT: f64 = 0.98;

/// The metrics subtree for one container. Utilisation sensors only appear
/// when the query returned a sample for the container.
fn container_metrics_scanner(
    container: &str,
    cpu: Option<f64>,
    mem: Option<f64>,
    restarts: Option<f64>,
) -> Arc<dyn Scanner> {
    let mut sensors: Vec<Arc<dyn Scanner>> = Vec::new();

    if let Some(cpu) = cpu {
        sensors.push(Arc::new(SensorConstant::new(
            "CPU utilisation",
            Status::new(
                State::from(cpu <= UTILISATION_LIMIT),
                vec![Log::new(format!("ratio of request: {cpu:.2}"), Severity::Info)],
            ),
        )));
    }
    if let Some(mem) = mem {
        sensors.push(Arc::new(SensorConstant::new(
            "MEM utilisation",
            Status::new(
                State::from(mem <= UTILISATION_LIMIT),
                vec![Log::new(format!("ratio of request: {mem:.2}"), Severity::Info)],
            ),
        )));
    }
    let restarts = restarts.unwrap_or(0.0);
    sensors.push(Arc::new(SensorConstant::new(
        "Restarts",
        Status::new(
            State::from(restarts < 1.0),
            vec![Log::new(format!("restarts: {restarts:.2}"), Severity::Info)],
        ),
    )));

    Arc::new(SystemAll::new(format!("Metrics for {container}"), sensors))
}

/// Attaches CPU, memory, and restart sensors to every container the
/// Kubernetes pod instrumentor visits.
pub struct ContainerMetricsInstrumentor {
    cpu: QueryMultiplexer,
    mem: QueryMultiplexer,
    restarts: QueryMultiplexer,
}

impl ContainerMetricsInstrumentor {
    pub fn new(api: Arc<PrometheusApi>) -> Self {
        let group_by = ["container", "pod", "namespace"];
        Self {
            cpu: QueryMultiplexer::new(api.clone(), Q_CPU, &group_by),
            mem: QueryMultiplexer::new(api.clone(), Q_MEM, &group_by),
            restarts: QueryMultiplexer::new(api, Q_RESTARTS, &group_by),
        }
    }
}

#[async_trait]
impl Instrumentor for ContainerMetricsInstrumentor {
    fn kinds(&self) -> Vec<Kind> {
        vec![k8s::kind("Pod#container")]
    }

    async fn instrument(
        &self,
        _registry: &InstrumentorRegistry,
        this_kind: &Kind,
        target: &Target,
    ) -> Result<Vec<Arc<dyn Scanner>>, InstrumentorError> {
        let Target::Container {
            namespace,
            pod_name,
            container_status,
        } = target
        else {
            return Err(InstrumentorError::BadTarget {
                kind: this_kind.clone(),
                expected: "Container",
            });
        };
        let container = container_status.name.as_str();
        let keyset = [container, pod_name.as_str(), namespace.as_str()];

        let cpu = self.cpu.result(&keyset).await?;
        let mem = self.mem.result(&keyset).await?;
        let restarts = self.restarts.result(&keyset).await?;

        Ok(vec![container_metrics_scanner(container, cpu, mem, restarts)])
    }
}
