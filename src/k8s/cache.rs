//! Request-scoped facade over the Kubernetes API.
//!
//! One `K8s` lives for exactly one scan. Full lists are cached per
//! `(kind, scope)` so each listing endpoint is hit at most once per scan;
//! entries never mutate after insertion. Label-selector queries bypass the
//! cache entirely — the selector is not part of the cache key.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use super::client::K8sApi;
use super::objects::{K8sObject, NamespaceScope, OwnerRef, ResourceKind};
use crate::instrument::ApiError;

type CacheKey = (ResourceKind, NamespaceScope);

pub struct K8s {
    api: Arc<dyn K8sApi>,
    cache: Mutex<HashMap<CacheKey, Arc<Vec<K8sObject>>>>,
}

impl K8s {
    pub fn new(api: Arc<dyn K8sApi>) -> Self {
        Self {
            api,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// All objects of `kind` within `scope`, cached for the rest of the
    /// scan. The lock is held across the fetch so concurrent callers cannot
    /// list the same `(kind, scope)` twice.
    pub async fn get_all(
        &self,
        kind: ResourceKind,
        scope: &NamespaceScope,
    ) -> Result<Arc<Vec<K8sObject>>, ApiError> {
        let key = (kind, scope.clone());
        let mut cache = self.cache.lock().await;
        if let Some(hit) = cache.get(&key) {
            return Ok(hit.clone());
        }
        debug!(kind = %kind, ?scope, "listing");
        let objects = Arc::new(self.api.list(kind, scope).await?);
        cache.insert(key, objects.clone());
        Ok(objects)
    }

    /// A single object, looked up in the cached listing for its namespace.
    /// A missing name is `None`, not an error.
    pub async fn get(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<Option<K8sObject>, ApiError> {
        let scope = if kind.cluster_scoped() {
            NamespaceScope::All
        } else {
            NamespaceScope::Named(namespace.to_string())
        };
        let all = self.get_all(kind, &scope).await?;
        Ok(all.iter().find(|o| o.name() == name).cloned())
    }

    /// True iff `get` would return an object.
    pub async fn exists(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<bool, ApiError> {
        Ok(self.get(kind, namespace, name).await?.is_some())
    }

    /// Objects of `kind` in `namespace` matching the label selector. Never
    /// cached; callers accept the extra round-trip.
    pub async fn children(
        &self,
        kind: ResourceKind,
        namespace: &str,
        selector: &BTreeMap<String, String>,
    ) -> Result<Vec<K8sObject>, ApiError> {
        self.api.list_labelled(kind, namespace, selector).await
    }

    /// Objects of `kind` in `namespace` whose ownerReferences include
    /// `owner`. Filters the cached full listing.
    pub async fn owned(
        &self,
        kind: ResourceKind,
        namespace: &str,
        owner: &OwnerRef,
    ) -> Result<Vec<K8sObject>, ApiError> {
        let all = self
            .get_all(kind, &NamespaceScope::Named(namespace.to_string()))
            .await?;
        Ok(all.iter().filter(|o| o.owned_by(owner)).cloned().collect())
    }
}
