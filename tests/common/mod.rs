//! Shared fixtures for the integration tests: an in-memory `K8sApi` with
//! call counters, a cluster-scan helper, and object builders.
#![allow(dead_code)] // each test binary uses its own slice of the fixtures

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta, OwnerReference};

use alpacalert::instrument::{ApiError, Target};
use alpacalert::k8s::{self, K8s, K8sApi, K8sObject, NamespaceScope, ResourceKind};
use alpacalert::models::Scanner;

// ─── FakeApi ──────────────────────────────────────────────────────────────────

/// In-memory `K8sApi`. Counts underlying calls so tests can assert the
/// cache laws.
#[derive(Default)]
pub struct FakeApi {
    objects: Vec<K8sObject>,
    pub list_calls: AtomicUsize,
    pub selector_calls: AtomicUsize,
}

impl FakeApi {
    pub fn new(objects: Vec<K8sObject>) -> Self {
        Self {
            objects,
            ..Default::default()
        }
    }

    pub fn list_count(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn selector_count(&self) -> usize {
        self.selector_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl K8sApi for FakeApi {
    async fn list(
        &self,
        kind: ResourceKind,
        scope: &NamespaceScope,
    ) -> Result<Vec<K8sObject>, ApiError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .objects
            .iter()
            .filter(|o| o.kind() == kind)
            .filter(|o| match scope {
                NamespaceScope::All => true,
                NamespaceScope::Named(ns) => kind.cluster_scoped() || o.namespace() == ns,
            })
            .cloned()
            .collect())
    }

    async fn list_labelled(
        &self,
        kind: ResourceKind,
        namespace: &str,
        selector: &BTreeMap<String, String>,
    ) -> Result<Vec<K8sObject>, ApiError> {
        self.selector_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .objects
            .iter()
            .filter(|o| {
                o.kind() == kind && o.namespace() == namespace && o.matches_labels(selector)
            })
            .cloned()
            .collect())
    }
}

// ─── Scan helpers ─────────────────────────────────────────────────────────────

/// Full cluster scan over the given objects; returns the scanner roots
/// (a single system named "cluster").
pub async fn scan(objects: Vec<K8sObject>) -> Vec<Arc<dyn Scanner>> {
    scan_with(&Arc::new(FakeApi::new(objects))).await
}

pub async fn scan_with(api: &Arc<FakeApi>) -> Vec<Arc<dyn Scanner>> {
    let facade = Arc::new(K8s::new(api.clone()));
    let registry = k8s::registry(facade);
    registry
        .instrument(
            &k8s::kind("Clusters"),
            &Target::Cluster {
                cluster: "kind-kind".to_string(),
                namespace: NamespaceScope::All,
            },
        )
        .await
        .expect("cluster scan should succeed")
}

/// Descend to the single leaf under `scanner`, asserting one child per
/// level.
pub fn sole_leaf(scanner: &Arc<dyn Scanner>) -> Arc<dyn Scanner> {
    let mut current = scanner.clone();
    loop {
        let children = current.children();
        if children.is_empty() {
            return current;
        }
        assert_eq!(children.len(), 1, "expected one child under {}", current.name());
        current = children[0].clone();
    }
}

// ─── Object builders ──────────────────────────────────────────────────────────

pub fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|&(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn meta(namespace: &str, name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(namespace.to_string()),
        ..Default::default()
    }
}

pub fn meta_labelled(namespace: &str, name: &str, lbls: &[(&str, &str)]) -> ObjectMeta {
    ObjectMeta {
        labels: Some(labels(lbls)),
        ..meta(namespace, name)
    }
}

pub fn selector(lbls: &[(&str, &str)]) -> LabelSelector {
    LabelSelector {
        match_labels: Some(labels(lbls)),
        ..Default::default()
    }
}

pub fn owner_ref(api_version: &str, kind: &str, name: &str) -> OwnerReference {
    OwnerReference {
        api_version: api_version.to_string(),
        kind: kind.to_string(),
        name: name.to_string(),
        ..Default::default()
    }
}
