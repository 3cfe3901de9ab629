//! The raw Kubernetes client layer: building a `kube::Client` and the
//! `K8sApi` trait the cache facade sits on. `KubeApi` is the live
//! implementation; the test suite substitutes an in-memory one.

use std::collections::BTreeMap;
use std::fmt::Debug;

use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{
    ConfigMap, Node, PersistentVolumeClaim, Pod, Secret, Service,
};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::api::storage::v1::StorageClass;
use k8s_openapi::{ClusterResourceScope, NamespaceResourceScope};
use kube::api::{Api, ListParams};
use kube::Client;
use serde::de::DeserializeOwned;

use super::objects::{K8sObject, NamespaceScope, ResourceKind};
use crate::instrument::ApiError;

/// Connect to whatever cluster the active kubeconfig selects
/// (`~/.kube/config` or `$KUBECONFIG`). Every Kubernetes scan starts here.
pub async fn build_client() -> Result<Client> {
    Client::try_default().await.context(
        "connecting to the Kubernetes API: no usable kubeconfig, or the cluster it \
         selects is unreachable",
    )
}

/// Return the current context name from kubeconfig (used to name the
/// cluster service when the caller does not pick one).
pub fn current_context() -> String {
    kube::config::Kubeconfig::read()
        .ok()
        .and_then(|cfg| cfg.current_context)
        .unwrap_or_else(|| "unknown".to_string())
}

/// Raw list operations underneath the cache facade.
#[async_trait]
pub trait K8sApi: Send + Sync {
    /// List all objects of `kind` within `scope`.
    async fn list(
        &self,
        kind: ResourceKind,
        scope: &NamespaceScope,
    ) -> Result<Vec<K8sObject>, ApiError>;

    /// List objects of `kind` in `namespace` matching the label selector.
    async fn list_labelled(
        &self,
        kind: ResourceKind,
        namespace: &str,
        selector: &BTreeMap<String, String>,
    ) -> Result<Vec<K8sObject>, ApiError>;
}

/// `K8sApi` backed by the live cluster, dispatching to a typed `Api<T>`
/// per kind.
pub struct KubeApi {
    client: Client,
}

impl KubeApi {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn list_params(
        &self,
        kind: ResourceKind,
        scope: &NamespaceScope,
        lp: ListParams,
    ) -> Result<Vec<K8sObject>, ApiError> {
        match kind {
            // Cluster-scoped kinds ignore the scope entirely.
            ResourceKind::Node => self.list_cluster::<Node>(lp).await,
            ResourceKind::StorageClass => self.list_cluster::<StorageClass>(lp).await,
            ResourceKind::ConfigMap => self.list_namespaced::<ConfigMap>(scope, lp).await,
            ResourceKind::Secret => self.list_namespaced::<Secret>(scope, lp).await,
            ResourceKind::PersistentVolumeClaim => {
                self.list_namespaced::<PersistentVolumeClaim>(scope, lp).await
            }
            ResourceKind::Pod => self.list_namespaced::<Pod>(scope, lp).await,
            ResourceKind::ReplicaSet => self.list_namespaced::<ReplicaSet>(scope, lp).await,
            ResourceKind::Deployment => self.list_namespaced::<Deployment>(scope, lp).await,
            ResourceKind::DaemonSet => self.list_namespaced::<DaemonSet>(scope, lp).await,
            ResourceKind::StatefulSet => self.list_namespaced::<StatefulSet>(scope, lp).await,
            ResourceKind::Job => self.list_namespaced::<Job>(scope, lp).await,
            ResourceKind::CronJob => self.list_namespaced::<CronJob>(scope, lp).await,
            ResourceKind::Service => self.list_namespaced::<Service>(scope, lp).await,
            ResourceKind::Ingress => self.list_namespaced::<Ingress>(scope, lp).await,
        }
    }

    async fn list_namespaced<T>(
        &self,
        scope: &NamespaceScope,
        lp: ListParams,
    ) -> Result<Vec<K8sObject>, ApiError>
    where
        T: kube::Resource<Scope = NamespaceResourceScope, DynamicType = ()>
            + DeserializeOwned
            + Clone
            + Debug
            + Send
            + 'static,
        K8sObject: From<T>,
    {
        let api: Api<T> = match scope {
            NamespaceScope::All => Api::all(self.client.clone()),
            NamespaceScope::Named(ns) => Api::namespaced(self.client.clone(), ns),
        };
        let list = api.list(&lp).await?;
        Ok(list.items.into_iter().map(K8sObject::from).collect())
    }

    async fn list_cluster<T>(&self, lp: ListParams) -> Result<Vec<K8sObject>, ApiError>
    where
        T: kube::Resource<Scope = ClusterResourceScope, DynamicType = ()>
            + DeserializeOwned
            + Clone
            + Debug
            + Send
            + 'static,
        K8sObject: From<T>,
    {
        let api: Api<T> = Api::all(self.client.clone());
        let list = api.list(&lp).await?;
        Ok(list.items.into_iter().map(K8sObject::from).collect())
    }
}

#[async_trait]
impl K8sApi for KubeApi {
    async fn list(
        &self,
        kind: ResourceKind,
        scope: &NamespaceScope,
    ) -> Result<Vec<K8sObject>, ApiError> {
        self.list_params(kind, scope, ListParams::default()).await
    }

    async fn list_labelled(
        &self,
        kind: ResourceKind,
        namespace: &str,
        selector: &BTreeMap<String, String>,
    ) -> Result<Vec<K8sObject>, ApiError> {
        let labels = selector
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",");
        let lp = ListParams::default().labels(&labels);
        self.list_params(kind, &NamespaceScope::Named(namespace.to_string()), lp)
            .await
    }
}
