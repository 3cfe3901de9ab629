//! Typed views over the Kubernetes objects the instrumentors understand:
//! the kind catalog, a tagged union of fetched objects, and small adapters
//! for namespaces, owner references, and status conditions.

use std::collections::BTreeMap;
use std::fmt;

use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::batch::v1::{CronJob, Job, JobCondition};
use k8s_openapi::api::core::v1::{
    ConfigMap, Node, NodeCondition, PersistentVolumeClaim, Pod, PodCondition, Secret, Service,
};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::api::storage::v1::StorageClass;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

// ─── ResourceKind ─────────────────────────────────────────────────────────────

/// Every resource kind the cluster instrumentor scans, in scan order.
pub const ALL_KINDS: &[ResourceKind] = &[
    ResourceKind::Node,
    ResourceKind::ConfigMap,
    ResourceKind::Secret,
    ResourceKind::StorageClass,
    ResourceKind::PersistentVolumeClaim,
    ResourceKind::Pod,
    ResourceKind::ReplicaSet,
    ResourceKind::Deployment,
    ResourceKind::DaemonSet,
    ResourceKind::StatefulSet,
    ResourceKind::Job,
    ResourceKind::CronJob,
    ResourceKind::Service,
    ResourceKind::Ingress,
];

/// A Kubernetes resource class this crate can instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Node,
    ConfigMap,
    Secret,
    StorageClass,
    PersistentVolumeClaim,
    Pod,
    ReplicaSet,
    Deployment,
    DaemonSet,
    StatefulSet,
    Job,
    CronJob,
    Service,
    Ingress,
}

impl ResourceKind {
    /// Canonical Kubernetes kind string, CamelCase.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Node => "Node",
            Self::ConfigMap => "ConfigMap",
            Self::Secret => "Secret",
            Self::StorageClass => "StorageClass",
            Self::PersistentVolumeClaim => "PersistentVolumeClaim",
            Self::Pod => "Pod",
            Self::ReplicaSet => "ReplicaSet",
            Self::Deployment => "Deployment",
            Self::DaemonSet => "DaemonSet",
            Self::StatefulSet => "StatefulSet",
            Self::Job => "Job",
            Self::CronJob => "CronJob",
            Self::Service => "Service",
            Self::Ingress => "Ingress",
        }
    }

    /// Lowercased kind, used in scanner names ("pod nginx-abc").
    pub fn lower(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::ConfigMap => "configmap",
            Self::Secret => "secret",
            Self::StorageClass => "storageclass",
            Self::PersistentVolumeClaim => "persistentvolumeclaim",
            Self::Pod => "pod",
            Self::ReplicaSet => "replicaset",
            Self::Deployment => "deployment",
            Self::DaemonSet => "daemonset",
            Self::StatefulSet => "statefulset",
            Self::Job => "job",
            Self::CronJob => "cronjob",
            Self::Service => "service",
            Self::Ingress => "ingress",
        }
    }

    /// apiVersion objects of this kind carry, for ownerReference matching.
    pub fn api_version(self) -> &'static str {
        match self {
            Self::ReplicaSet | Self::Deployment | Self::DaemonSet | Self::StatefulSet => "apps/v1",
            Self::Job | Self::CronJob => "batch/v1",
            Self::Ingress => "networking.k8s.io/v1",
            Self::StorageClass => "storage.k8s.io/v1",
            Self::Node
            | Self::ConfigMap
            | Self::Secret
            | Self::PersistentVolumeClaim
            | Self::Pod
            | Self::Service => "v1",
        }
    }

    /// True for kinds that live outside any namespace.
    pub fn cluster_scoped(self) -> bool {
        matches!(self, Self::Node | Self::StorageClass)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── K8sObject ────────────────────────────────────────────────────────────────

macro_rules! k8s_object {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        /// One object fetched from the cluster, tagged by kind.
        #[derive(Debug, Clone)]
        pub enum K8sObject {
            $($variant(Box<$ty>),)*
        }

        impl K8sObject {
            pub fn kind(&self) -> ResourceKind {
                match self {
                    $(Self::$variant(_) => ResourceKind::$variant,)*
                }
            }

            pub fn meta(&self) -> &ObjectMeta {
                match self {
                    $(Self::$variant(o) => &o.metadata,)*
                }
            }
        }

        $(
            impl From<$ty> for K8sObject {
                fn from(o: $ty) -> Self {
                    Self::$variant(Box::new(o))
                }
            }
        )*
    };
}

k8s_object! {
    Node(Node),
    ConfigMap(ConfigMap),
    Secret(Secret),
    StorageClass(StorageClass),
    PersistentVolumeClaim(PersistentVolumeClaim),
    Pod(Pod),
    ReplicaSet(ReplicaSet),
    Deployment(Deployment),
    DaemonSet(DaemonSet),
    StatefulSet(StatefulSet),
    Job(Job),
    CronJob(CronJob),
    Service(Service),
    Ingress(Ingress),
}

impl K8sObject {
    pub fn name(&self) -> &str {
        self.meta().name.as_deref().unwrap_or_default()
    }

    pub fn namespace(&self) -> &str {
        self.meta().namespace.as_deref().unwrap_or_default()
    }

    /// Scanner name for this object: lowercased kind plus object name.
    pub fn scanner_name(&self) -> String {
        format!("{} {}", self.kind().lower(), self.name())
    }

    /// True when every selector pair appears in this object's labels.
    pub fn matches_labels(&self, selector: &BTreeMap<String, String>) -> bool {
        let Some(labels) = self.meta().labels.as_ref() else {
            return selector.is_empty();
        };
        selector.iter().all(|(k, v)| labels.get(k) == Some(v))
    }

    /// True when this object's ownerReferences include `owner`.
    pub fn owned_by(&self, owner: &OwnerRef) -> bool {
        self.meta().owner_references.iter().flatten().any(|r| {
            r.api_version == owner.api_version && r.kind == owner.kind && r.name == owner.name
        })
    }
}

// ─── References & scopes ──────────────────────────────────────────────────────

/// Reference to an object, for existence probes without fetching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub kind: ResourceKind,
    pub namespace: String,
    pub name: String,
}

impl ObjectRef {
    pub fn new(kind: ResourceKind, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

/// Which namespaces a list call covers. `All` is the cluster-wide sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NamespaceScope {
    All,
    Named(String),
}

impl NamespaceScope {
    /// `"all"` means the cluster-wide sentinel; anything else is a namespace.
    pub fn parse(s: &str) -> Self {
        if s == "all" {
            Self::All
        } else {
            Self::Named(s.to_string())
        }
    }

    pub fn named(&self) -> Option<&str> {
        match self {
            Self::All => None,
            Self::Named(ns) => Some(ns),
        }
    }
}

/// The identity triple ownerReferences are matched on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerRef {
    pub api_version: String,
    pub kind: String,
    pub name: String,
}

impl OwnerRef {
    /// The owner identity `obj` presents to the objects it controls.
    pub fn of(obj: &K8sObject) -> Self {
        Self {
            api_version: obj.kind().api_version().to_string(),
            kind: obj.kind().as_str().to_string(),
            name: obj.name().to_string(),
        }
    }
}

// ─── Conditions ───────────────────────────────────────────────────────────────

/// Unified view of the `conditions[]` entries different resources expose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub type_: String,
    pub status: String,
    pub message: Option<String>,
    pub reason: Option<String>,
}

macro_rules! condition_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<&$ty> for Condition {
                fn from(c: &$ty) -> Self {
                    Self {
                        type_: c.type_.clone(),
                        status: c.status.clone(),
                        message: c.message.clone(),
                        reason: c.reason.clone(),
                    }
                }
            }
        )*
    };
}

condition_from! {
    NodeCondition,
    PodCondition,
    k8s_openapi::api::apps::v1::DeploymentCondition,
    JobCondition,
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;

    #[test]
    fn kind_strings_round_trip_the_catalog() {
        for kind in ALL_KINDS {
            assert_eq!(kind.lower(), kind.as_str().to_lowercase());
        }
    }

    #[test]
    fn cluster_scoped_kinds() {
        assert!(ResourceKind::Node.cluster_scoped());
        assert!(ResourceKind::StorageClass.cluster_scoped());
        assert!(!ResourceKind::Pod.cluster_scoped());
    }

    #[test]
    fn namespace_scope_parses_the_all_sentinel() {
        assert_eq!(NamespaceScope::parse("all"), NamespaceScope::All);
        assert_eq!(
            NamespaceScope::parse("default"),
            NamespaceScope::Named("default".to_string())
        );
    }

    #[test]
    fn label_matching_requires_every_selector_pair() {
        let pod = Pod {
            metadata: ObjectMeta {
                name: Some("p".to_string()),
                labels: Some(
                    [("app".to_string(), "web".to_string())]
                        .into_iter()
                        .collect(),
                ),
                ..Default::default()
            },
            ..Default::default()
        };
        let obj = K8sObject::from(pod);

        let matching: BTreeMap<_, _> = [("app".to_string(), "web".to_string())]
            .into_iter()
            .collect();
        assert!(obj.matches_labels(&matching));

        let wider: BTreeMap<_, _> = [
            ("app".to_string(), "web".to_string()),
            ("tier".to_string(), "front".to_string()),
        ]
        .into_iter()
        .collect();
        assert!(!obj.matches_labels(&wider));
    }

    #[test]
    fn owner_matching_uses_the_full_triple() {
        let job = Job {
            metadata: ObjectMeta {
                name: Some("hello-1".to_string()),
                owner_references: Some(vec![OwnerReference {
                    api_version: "batch/v1".to_string(),
                    kind: "CronJob".to_string(),
                    name: "hello".to_string(),
                    ..Default::default()
                }]),
                ..Default::default()
            },
            ..Default::default()
        };
        let obj = K8sObject::from(job);

        let owner = OwnerRef {
            api_version: "batch/v1".to_string(),
            kind: "CronJob".to_string(),
            name: "hello".to_string(),
        };
        assert!(obj.owned_by(&owner));

        let wrong_name = OwnerRef {
            name: "goodbye".to_string(),
            ..owner
        };
        assert!(!obj.owned_by(&wrong_name));
    }

    #[test]
    fn condition_adapter_copies_all_fields() {
        let node_condition = NodeCondition {
            type_: "Ready".to_string(),
            status: "True".to_string(),
            message: Some("kubelet is posting ready status".to_string()),
            reason: Some("KubeletReady".to_string()),
            ..Default::default()
        };
        let c = Condition::from(&node_condition);
        assert_eq!(c.type_, "Ready");
        assert_eq!(c.status, "True");
        assert_eq!(c.reason.as_deref(), Some("KubeletReady"));
    }
}
