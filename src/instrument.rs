//! The instrumentor registry: kind-keyed dispatch from external objects to
//! scanner trees, with ordered fan-out when several instrumentors share a
//! kind and typed errors at every boundary.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{ContainerStatus, Pod, Volume};
use k8s_openapi::api::networking::v1::HTTPIngressPath;
use tracing::error;

use crate::generic::{SensorConstant, SystemAll};
use crate::grafana::models::{Alert, GroupRef, RuleRef};
use crate::k8s::objects::{K8sObject, NamespaceScope, ObjectRef};
use crate::models::{Log, Scanner, Severity, State, Status};

// ─── Kind ─────────────────────────────────────────────────────────────────────

/// Identifies a class of instrumentable resource, e.g.
/// `kubernetes.io/Pod` or `grafana.org/alerts/alertrule`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Kind {
    pub namespace: String,
    pub name: String,
}

impl Kind {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

// ─── Target ───────────────────────────────────────────────────────────────────

/// Typed payload for an instrument call. Each kind family recognises its own
/// variants and rejects the rest with [`InstrumentorError::BadTarget`].
#[derive(Debug, Clone)]
pub enum Target {
    /// A whole-cluster scan.
    Cluster {
        cluster: String,
        namespace: NamespaceScope,
    },
    /// A fetched object of the kind being instrumented.
    Resource(K8sObject),
    /// An existence-only probe; the instrumentor looks the object up itself.
    Ref(ObjectRef),
    /// One containerStatus entry of a pod.
    Container {
        namespace: String,
        pod_name: String,
        container_status: Box<ContainerStatus>,
    },
    /// One volume of a pod.
    Volume {
        pod: Box<Pod>,
        volume_name: String,
        volume: Box<Volume>,
    },
    /// One rule×path entry of an ingress, pre-named by the caller.
    IngressPath {
        namespace: String,
        name: String,
        path: Box<HTTPIngressPath>,
    },
    /// A whole-Grafana scan.
    GrafanaRoot { name: String },
    /// One Grafana alert folder, by name.
    GrafanaFolder { folder: String },
    /// One Grafana alert group, inline or by name.
    GrafanaGroup(GroupRef),
    /// One Grafana alert rule, inline or by (group, name).
    GrafanaRule(RuleRef),
    /// One Grafana alert instance.
    GrafanaAlert(Alert),
}

// ─── Errors ───────────────────────────────────────────────────────────────────

/// Raised by the client facades when the outside world misbehaves.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("kubernetes api error")]
    Kube(#[from] kube::Error),
    #[error("http error")]
    Http(#[from] reqwest::Error),
    #[error("{0}")]
    Response(String),
}

/// An error instrumenting an object.
#[derive(Debug, thiserror::Error)]
pub enum InstrumentorError {
    /// The registry has no instrumentor bound to the requested kind.
    #[error("no provider for kind {kind}")]
    NoProvider { kind: Kind },
    /// An instrumentor raised while constructing scanners; `source` carries
    /// the cause, possibly another wrap from a recursive instrument call.
    #[error("failed to instrument {kind}")]
    Instrument {
        kind: Kind,
        #[source]
        source: Box<InstrumentorError>,
    },
    /// The target variant does not match what the instrumentor accepts.
    #[error("wrong target for {kind}: expected {expected}")]
    BadTarget { kind: Kind, expected: &'static str },
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("{0}")]
    Other(String),
}

/// The full cause chain as one line, for logs that outlive the error value.
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

/// Containment for aggregators that elect to continue past a failed child:
/// an UNKNOWN sensor standing in for the object, carrying one ERROR log
/// naming the kind, the object, and the cause.
pub fn sensor_for_failure(kind: &Kind, name: &str, err: &InstrumentorError) -> Arc<dyn Scanner> {
    let message = format!("failed to instrument {kind} {name}: {}", error_chain(err));
    error!(%kind, name, "instrument failure contained");
    Arc::new(SensorConstant::new(
        name,
        Status::new(State::Unknown, vec![Log::new(message, Severity::Error)]),
    ))
}

// ─── Instrumentor ─────────────────────────────────────────────────────────────

/// Translates an external object into one or more scanners.
///
/// Instrumentors receive the registry and may call back into it for
/// sub-objects (a Deployment instrumentor asks for ReplicaSet scanners).
/// Recursion follows the ownership graph, which is a DAG in practice, so
/// there is no cycle protection.
#[async_trait]
pub trait Instrumentor: Send + Sync {
    /// The kinds this instrumentor should be registered under.
    fn kinds(&self) -> Vec<Kind>;

    async fn instrument(
        &self,
        registry: &InstrumentorRegistry,
        kind: &Kind,
        target: &Target,
    ) -> Result<Vec<Arc<dyn Scanner>>, InstrumentorError>;
}

// ─── Registry ─────────────────────────────────────────────────────────────────

/// Kind-keyed dispatch table. Each kind maps to an ordered list of
/// instrumentors; one entry dispatches directly, several fan out in
/// registration order under a single AllOf named after the kind. The list is
/// always flat — there are no nested composites.
#[derive(Default)]
pub struct InstrumentorRegistry {
    instrumentors: HashMap<Kind, Vec<Arc<dyn Instrumentor>>>,
}

impl InstrumentorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `instrumentor` to `kind`, appending when the kind is already
    /// bound. Registering the same instrumentor (by identity) twice for one
    /// kind is a no-op; distinct instrumentors accumulate in order.
    pub fn register(&mut self, kind: Kind, instrumentor: Arc<dyn Instrumentor>) {
        let slot = self.instrumentors.entry(kind).or_default();
        if slot.iter().any(|existing| Arc::ptr_eq(existing, &instrumentor)) {
            return;
        }
        slot.push(instrumentor);
    }

    pub fn register_many(
        &mut self,
        pairs: impl IntoIterator<Item = (Kind, Arc<dyn Instrumentor>)>,
    ) {
        for (kind, instrumentor) in pairs {
            self.register(kind, instrumentor);
        }
    }

    /// Register `instrumentor` under every kind it declares.
    pub fn register_all(&mut self, instrumentor: Arc<dyn Instrumentor>) {
        for kind in instrumentor.kinds() {
            self.register(kind, instrumentor.clone());
        }
    }

    /// Merge every registration from `other` into this registry, preserving
    /// `other`'s ordering and the composite rule.
    pub fn extend(&mut self, other: &InstrumentorRegistry) {
        for (kind, slot) in &other.instrumentors {
            for instrumentor in slot {
                self.register(kind.clone(), instrumentor.clone());
            }
        }
    }

    /// The ordered instrumentor list bound to `kind`, if any.
    pub fn instrumentors_for(&self, kind: &Kind) -> Option<&[Arc<dyn Instrumentor>]> {
        self.instrumentors.get(kind).map(Vec::as_slice)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &Kind> {
        self.instrumentors.keys()
    }

    /// Instrument an external entity by generating sensors, systems, or
    /// services. Errors from the bound instrumentors are wrapped with the
    /// kind and propagated — the registry never swallows.
    pub async fn instrument(
        &self,
        kind: &Kind,
        target: &Target,
    ) -> Result<Vec<Arc<dyn Scanner>>, InstrumentorError> {
        let slot = self
            .instrumentors
            .get(kind)
            .ok_or_else(|| InstrumentorError::NoProvider { kind: kind.clone() })?;

        let wrap = |source: InstrumentorError| InstrumentorError::Instrument {
            kind: kind.clone(),
            source: Box::new(source),
        };

        match slot.as_slice() {
            [] => Err(InstrumentorError::NoProvider { kind: kind.clone() }),
            [single] => single.instrument(self, kind, target).await.map_err(wrap),
            many => {
                let mut scanners = Vec::new();
                for instrumentor in many {
                    scanners.extend(
                        instrumentor
                            .instrument(self, kind, target)
                            .await
                            .map_err(wrap)?,
                    );
                }
                Ok(vec![Arc::new(SystemAll::new(kind.to_string(), scanners))])
            }
        }
    }
}
