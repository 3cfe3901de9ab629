//! Kubernetes instrumentation: the kind namespace, the client and cache
//! layers, and the per-kind instrumentor catalog.

pub mod cache;
pub mod client;
pub mod instrumentors;
pub mod objects;

use std::sync::Arc;

use crate::instrument::{InstrumentorRegistry, Kind};

pub use cache::K8s;
pub use client::{build_client, current_context, K8sApi, KubeApi};
pub use objects::{K8sObject, NamespaceScope, ObjectRef, OwnerRef, ResourceKind, ALL_KINDS};

/// The kind namespace all Kubernetes instrumentors register under.
pub const KIND_NAMESPACE: &str = "kubernetes.io";

/// A kind in the `kubernetes.io` namespace, e.g. `kind("Pod")` or the
/// sub-kinds `kind("Pod#container")` and `kind("Ingress#path")`.
pub fn kind(name: &str) -> Kind {
    Kind::new(KIND_NAMESPACE, name)
}

/// A registry with every Kubernetes instrumentor bound to its kinds, all
/// sharing one request-scoped facade.
pub fn registry(k8s: Arc<K8s>) -> InstrumentorRegistry {
    use instrumentors::{
        InstrumentorCluster, InstrumentorContainer, InstrumentorCronJob, InstrumentorDaemonSet,
        InstrumentorDeployment, InstrumentorExists, InstrumentorIngress, InstrumentorIngressPath,
        InstrumentorJob, InstrumentorNode, InstrumentorPod, InstrumentorPvc,
        InstrumentorReplicaSet, InstrumentorService, InstrumentorStatefulSet, InstrumentorVolume,
    };

    let mut registry = InstrumentorRegistry::new();
    registry.register_all(Arc::new(InstrumentorCluster::new(k8s.clone())));
    registry.register_all(Arc::new(InstrumentorNode));
    registry.register_all(Arc::new(InstrumentorExists::new(k8s.clone())));
    registry.register_all(Arc::new(InstrumentorPvc::new(k8s.clone())));
    registry.register_all(Arc::new(InstrumentorPod));
    registry.register_all(Arc::new(InstrumentorContainer));
    registry.register_all(Arc::new(InstrumentorVolume::new(k8s.clone())));
    registry.register_all(Arc::new(InstrumentorReplicaSet::new(k8s.clone())));
    registry.register_all(Arc::new(InstrumentorDeployment::new(k8s.clone())));
    registry.register_all(Arc::new(InstrumentorDaemonSet::new(k8s.clone())));
    registry.register_all(Arc::new(InstrumentorStatefulSet::new(k8s.clone())));
    registry.register_all(Arc::new(InstrumentorJob::new(k8s.clone())));
    registry.register_all(Arc::new(InstrumentorCronJob::new(k8s.clone())));
    registry.register_all(Arc::new(InstrumentorService::new(k8s.clone())));
    registry.register_all(Arc::new(InstrumentorIngress));
    registry.register_all(Arc::new(InstrumentorIngressPath::new(k8s)));
    registry
}
