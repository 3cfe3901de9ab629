//! Per-kind Kubernetes instrumentors: each translates one live object into a
//! scanner subtree, recursing through the registry for sub-objects and
//! reading the cluster only through the cache facade.
//!
//! Every instrumentor here is eager: `instrument` performs all lookups up
//! front and returns a materialised tree, so the later status walk is pure.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Volume, VolumeProjection};
use tracing::debug;

use super::cache::K8s;
use super::kind;
use super::objects::{
    Condition, K8sObject, NamespaceScope, ObjectRef, OwnerRef, ResourceKind, ALL_KINDS,
};
use crate::generic::{SensorConstant, SystemAll, SystemAny};
use crate::instrument::{
    sensor_for_failure, Instrumentor, InstrumentorError, InstrumentorRegistry, Kind, Target,
};
use crate::models::{Log, Scanner, Severity, State, Status};

// ─── Shared helpers ───────────────────────────────────────────────────────────

fn bad_target(kind: &Kind, expected: &'static str) -> InstrumentorError {
    InstrumentorError::BadTarget {
        kind: kind.clone(),
        expected,
    }
}

fn k8s_kind(rk: ResourceKind) -> Kind {
    kind(rk.as_str())
}

/// One constant sensor per recognised condition. Conditions in
/// `passing_if_true` pass when their status is "True", conditions in
/// `passing_if_false` pass when it is "False"; everything else is dropped.
pub(crate) fn condition_sensors(
    conditions: &[Condition],
    passing_if_true: &[&str],
    passing_if_false: &[&str],
) -> Vec<Arc<dyn Scanner>> {
    let mut sensors: Vec<Arc<dyn Scanner>> = Vec::new();
    for condition in conditions {
        let state = if passing_if_true.contains(&condition.type_.as_str()) {
            State::from(condition.status.eq_ignore_ascii_case("true"))
        } else if passing_if_false.contains(&condition.type_.as_str()) {
            State::from(condition.status.eq_ignore_ascii_case("false"))
        } else {
            continue;
        };
        let severity = if state == State::Passing {
            Severity::Info
        } else {
            Severity::Warn
        };
        let messages = condition
            .message
            .as_ref()
            .or(condition.reason.as_ref())
            .map(|m| vec![Log::new(m.clone(), severity)])
            .unwrap_or_default();
        sensors.push(Arc::new(SensorConstant::new(
            condition.type_.clone(),
            Status::new(state, messages),
        )));
    }
    sensors
}

/// One constant sensor per replica-count field, passing iff the reported
/// count equals `target`.
fn replica_sensors(target: i32, fields: &[(&str, Option<i32>)]) -> Vec<Arc<dyn Scanner>> {
    fields
        .iter()
        .map(|&(field, value)| {
            let actual = value.unwrap_or(0);
            let state = State::from(actual == target);
            let severity = if state == State::Passing {
                Severity::Info
            } else {
                Severity::Warn
            };
            Arc::new(SensorConstant::new(
                field,
                Status::new(state, vec![Log::new(format!("{actual}/{target}"), severity)]),
            )) as Arc<dyn Scanner>
        })
        .collect()
}

/// Instrument every object of `rk` in `namespace` matching the label
/// selector, via the registry.
async fn instrument_matching(
    k8s: &K8s,
    registry: &InstrumentorRegistry,
    rk: ResourceKind,
    namespace: &str,
    match_labels: &BTreeMap<String, String>,
) -> Result<Vec<Arc<dyn Scanner>>, InstrumentorError> {
    let objects = k8s.children(rk, namespace, match_labels).await?;
    let mut scanners = Vec::new();
    for obj in objects {
        scanners.extend(
            registry
                .instrument(&k8s_kind(rk), &Target::Resource(obj))
                .await?,
        );
    }
    Ok(scanners)
}

// ─── Cluster root ─────────────────────────────────────────────────────────────

/// Root of a Kubernetes scan: lists every instrumentable kind in the
/// configured scope and instruments each object. A failed object is replaced
/// by an UNKNOWN sensor so one bad apple never sinks the scan.
pub struct InstrumentorCluster {
    k8s: Arc<K8s>,
}

impl InstrumentorCluster {
    pub fn new(k8s: Arc<K8s>) -> Self {
        Self { k8s }
    }
}

#[async_trait]
impl Instrumentor for InstrumentorCluster {
    fn kinds(&self) -> Vec<Kind> {
        vec![kind("Clusters")]
    }

    async fn instrument(
        &self,
        registry: &InstrumentorRegistry,
        this_kind: &Kind,
        target: &Target,
    ) -> Result<Vec<Arc<dyn Scanner>>, InstrumentorError> {
        let Target::Cluster { cluster, namespace } = target else {
            return Err(bad_target(this_kind, "Cluster"));
        };
        debug!(%cluster, "scanning cluster");

        let mut scanners: Vec<Arc<dyn Scanner>> = Vec::new();
        for &rk in ALL_KINDS {
            let scope = if rk.cluster_scoped() {
                NamespaceScope::All
            } else {
                namespace.clone()
            };
            let objects = self.k8s.get_all(rk, &scope).await?;
            let object_kind = k8s_kind(rk);
            for obj in objects.iter() {
                let name = obj.scanner_name();
                match registry
                    .instrument(&object_kind, &Target::Resource(obj.clone()))
                    .await
                {
                    Ok(children) => scanners.extend(children),
                    Err(err) => scanners.push(sensor_for_failure(&object_kind, &name, &err)),
                }
            }
        }
        Ok(vec![Arc::new(SystemAll::new("cluster", scanners))])
    }
}

// ─── Node ─────────────────────────────────────────────────────────────────────

/// Nodes pass when Ready is True and none of the pressure conditions are.
pub struct InstrumentorNode;

#[async_trait]
impl Instrumentor for InstrumentorNode {
    fn kinds(&self) -> Vec<Kind> {
        vec![kind("Node")]
    }

    async fn instrument(
        &self,
        _registry: &InstrumentorRegistry,
        this_kind: &Kind,
        target: &Target,
    ) -> Result<Vec<Arc<dyn Scanner>>, InstrumentorError> {
        let Target::Resource(obj @ K8sObject::Node(node)) = target else {
            return Err(bad_target(this_kind, "Resource(Node)"));
        };
        let conditions: Vec<Condition> = node
            .status
            .iter()
            .flat_map(|s| s.conditions.iter().flatten())
            .map(Condition::from)
            .collect();
        let sensors = condition_sensors(
            &conditions,
            &["Ready"],
            &["MemoryPressure", "DiskPressure", "PIDPressure"],
        );
        Ok(vec![Arc::new(SystemAll::new(obj.scanner_name(), sensors))])
    }
}

// ─── ConfigMap / Secret / StorageClass ────────────────────────────────────────

/// Existence sensors: these kinds are healthy iff the object is present.
/// Accepts either a fetched object or a bare reference, so other
/// instrumentors can probe without fetching.
pub struct InstrumentorExists {
    k8s: Arc<K8s>,
}

impl InstrumentorExists {
    pub fn new(k8s: Arc<K8s>) -> Self {
        Self { k8s }
    }
}

#[async_trait]
impl Instrumentor for InstrumentorExists {
    fn kinds(&self) -> Vec<Kind> {
        vec![kind("ConfigMap"), kind("Secret"), kind("StorageClass")]
    }

    async fn instrument(
        &self,
        _registry: &InstrumentorRegistry,
        this_kind: &Kind,
        target: &Target,
    ) -> Result<Vec<Arc<dyn Scanner>>, InstrumentorError> {
        let (rk, namespace, name) = match target {
            Target::Ref(r) => (r.kind, r.namespace.clone(), r.name.clone()),
            Target::Resource(obj) => (
                obj.kind(),
                obj.namespace().to_string(),
                obj.name().to_string(),
            ),
            _ => return Err(bad_target(this_kind, "Resource or Ref")),
        };
        let exists = self.k8s.exists(rk, &namespace, &name).await?;
        Ok(vec![Arc::new(SensorConstant::new(
            format!("{} {} exists", rk.lower(), name),
            Status::from_state(State::from(exists)),
        ))])
    }
}

// ─── PersistentVolumeClaim ────────────────────────────────────────────────────

/// PVCs check their phase (only "Bound" passes) and the existence of their
/// storage class.
pub struct InstrumentorPvc {
    k8s: Arc<K8s>,
}

impl InstrumentorPvc {
    pub fn new(k8s: Arc<K8s>) -> Self {
        Self { k8s }
    }
}

#[async_trait]
impl Instrumentor for InstrumentorPvc {
    fn kinds(&self) -> Vec<Kind> {
        vec![kind("PersistentVolumeClaim")]
    }

    async fn instrument(
        &self,
        registry: &InstrumentorRegistry,
        this_kind: &Kind,
        target: &Target,
    ) -> Result<Vec<Arc<dyn Scanner>>, InstrumentorError> {
        let obj = match target {
            Target::Resource(obj @ K8sObject::PersistentVolumeClaim(_)) => obj.clone(),
            Target::Ref(r) => match self.k8s.get(r.kind, &r.namespace, &r.name).await? {
                Some(obj) => obj,
                None => {
                    return Ok(vec![Arc::new(SensorConstant::failing(
                        format!("persistentvolumeclaim {}", r.name),
                        vec![Log::new("not found", Severity::Error)],
                    ))]);
                }
            },
            _ => return Err(bad_target(this_kind, "Resource(PersistentVolumeClaim) or Ref")),
        };
        let K8sObject::PersistentVolumeClaim(pvc) = &obj else {
            return Err(bad_target(this_kind, "Resource(PersistentVolumeClaim)"));
        };

        let phase = pvc.status.as_ref().and_then(|s| s.phase.as_deref());
        // "Pending" is deliberately FAILING here, unlike the pod phase table.
        let state = match phase {
            Some("Bound") => State::Passing,
            _ => State::Failing,
        };
        let severity = if state == State::Passing {
            Severity::Info
        } else {
            Severity::Warn
        };
        let phase_sensor: Arc<dyn Scanner> = Arc::new(SensorConstant::new(
            "phase",
            Status::new(
                state,
                vec![Log::new(
                    format!("phase is {}", phase.unwrap_or("unknown")),
                    severity,
                )],
            ),
        ));

        let mut children = vec![phase_sensor];
        if let Some(sc_name) = pvc.spec.as_ref().and_then(|s| s.storage_class_name.as_deref()) {
            children.extend(
                registry
                    .instrument(
                        &kind("StorageClass"),
                        &Target::Ref(ObjectRef::new(
                            ResourceKind::StorageClass,
                            obj.namespace(),
                            sc_name,
                        )),
                    )
                    .await?,
            );
        }

        Ok(vec![Arc::new(SystemAll::new(obj.scanner_name(), children))])
    }
}

// ─── Pod ──────────────────────────────────────────────────────────────────────

/// Pods combine a phase sensor, phase-dependent condition sensors, and
/// subtrees for containers and volumes.
pub struct InstrumentorPod;

#[async_trait]
impl Instrumentor for InstrumentorPod {
    fn kinds(&self) -> Vec<Kind> {
        vec![kind("Pod")]
    }

    async fn instrument(
        &self,
        registry: &InstrumentorRegistry,
        this_kind: &Kind,
        target: &Target,
    ) -> Result<Vec<Arc<dyn Scanner>>, InstrumentorError> {
        let Target::Resource(obj @ K8sObject::Pod(pod)) = target else {
            return Err(bad_target(this_kind, "Resource(Pod)"));
        };
        let namespace = obj.namespace().to_string();
        let pod_name = obj.name().to_string();

        let conditions: Vec<Condition> = pod
            .status
            .iter()
            .flat_map(|s| s.conditions.iter().flatten())
            .map(Condition::from)
            .collect();
        let phase = pod.status.as_ref().and_then(|s| s.phase.as_deref());

        let (mut children, phase_state) = match phase {
            Some("Pending") => (
                condition_sensors(&conditions, &["PodScheduled"], &[]),
                State::Unknown,
            ),
            Some("Running") => (
                condition_sensors(
                    &conditions,
                    &["Initialized", "Ready", "ContainersReady", "PodScheduled"],
                    &[],
                ),
                State::Passing,
            ),
            Some("Succeeded") => (
                condition_sensors(
                    &conditions,
                    &["Initialized", "PodScheduled"],
                    &["Ready", "ContainersReady"],
                ),
                State::Passing,
            ),
            Some("Failed") => (
                condition_sensors(
                    &conditions,
                    &["Initialized", "Ready", "ContainersReady", "PodScheduled"],
                    &[],
                ),
                State::Failing,
            ),
            _ => (Vec::new(), State::Unknown),
        };

        let phase_severity = if phase_state == State::Passing {
            Severity::Info
        } else {
            Severity::Warn
        };
        children.insert(
            0,
            Arc::new(SensorConstant::new(
                "phase",
                Status::new(
                    phase_state,
                    vec![Log::new(
                        format!("phase is {}", phase.unwrap_or("unknown")),
                        phase_severity,
                    )],
                ),
            )),
        );

        let mut container_scanners = Vec::new();
        for cs in pod
            .status
            .iter()
            .flat_map(|s| s.container_statuses.iter().flatten())
        {
            container_scanners.extend(
                registry
                    .instrument(
                        &kind("Pod#container"),
                        &Target::Container {
                            namespace: namespace.clone(),
                            pod_name: pod_name.clone(),
                            container_status: Box::new(cs.clone()),
                        },
                    )
                    .await?,
            );
        }
        children.push(Arc::new(SystemAll::new("containers", container_scanners)));

        let mut volume_scanners = Vec::new();
        for volume in pod.spec.iter().flat_map(|s| s.volumes.iter().flatten()) {
            volume_scanners.extend(
                registry
                    .instrument(
                        &kind("Pod#volume"),
                        &Target::Volume {
                            pod: pod.clone(),
                            volume_name: volume.name.clone(),
                            volume: Box::new(volume.clone()),
                        },
                    )
                    .await?,
            );
        }
        children.push(Arc::new(SystemAll::new("volumes", volume_scanners)));

        Ok(vec![Arc::new(SystemAll::new(obj.scanner_name(), children))])
    }
}

// ─── Pod containers ───────────────────────────────────────────────────────────

/// One sensor per containerStatus, keyed off whichever of the three state
/// blocks Kubernetes filled in.
pub struct InstrumentorContainer;

#[async_trait]
impl Instrumentor for InstrumentorContainer {
    fn kinds(&self) -> Vec<Kind> {
        vec![kind("Pod#container")]
    }

    async fn instrument(
        &self,
        _registry: &InstrumentorRegistry,
        this_kind: &Kind,
        target: &Target,
    ) -> Result<Vec<Arc<dyn Scanner>>, InstrumentorError> {
        let Target::Container {
            container_status, ..
        } = target
        else {
            return Err(bad_target(this_kind, "Container"));
        };
        let cs = container_status;
        let started = cs.started.unwrap_or(false);

        let status = match cs.state.as_ref() {
            Some(state) if state.running.is_some() => Status::new(
                State::from(cs.ready && started),
                vec![Log::new("running", Severity::Info)],
            ),
            Some(state) if state.terminated.is_some() => {
                let completed = state
                    .terminated
                    .as_ref()
                    .and_then(|t| t.reason.as_deref())
                    == Some("Completed");
                Status::new(
                    State::from(!cs.ready && !started && completed),
                    vec![Log::new("terminated", Severity::Error)],
                )
            }
            Some(state) if state.waiting.is_some() => {
                let messages = match state.waiting.as_ref().and_then(|w| w.reason.as_deref()) {
                    Some(reason) => {
                        let severity = if reason == "ImagePullBackOff" {
                            Severity::Error
                        } else {
                            Severity::Info
                        };
                        vec![Log::new(reason, severity)]
                    }
                    None => vec![Log::new("waiting", Severity::Info)],
                };
                Status::new(State::Failing, messages)
            }
            _ => Status::new(
                State::Unknown,
                vec![Log::new("unknown state", Severity::Info)],
            ),
        };

        Ok(vec![Arc::new(SensorConstant::new(
            format!("container {}", cs.name),
            status,
        ))])
    }
}

// ─── Pod volumes ──────────────────────────────────────────────────────────────

/// One subtree per pod volume, shaped by its source type. Projected volumes
/// recurse: one index-named child per projection source.
pub struct InstrumentorVolume {
    k8s: Arc<K8s>,
}

impl InstrumentorVolume {
    pub fn new(k8s: Arc<K8s>) -> Self {
        Self { k8s }
    }

    async fn config_map_wrap(
        &self,
        registry: &InstrumentorRegistry,
        namespace: &str,
        name: &str,
    ) -> Result<Arc<dyn Scanner>, InstrumentorError> {
        let children = registry
            .instrument(
                &kind("ConfigMap"),
                &Target::Ref(ObjectRef::new(ResourceKind::ConfigMap, namespace, name)),
            )
            .await?;
        Ok(Arc::new(SystemAll::new("configMap", children)))
    }

    async fn secret_wrap(
        &self,
        registry: &InstrumentorRegistry,
        namespace: &str,
        name: &str,
    ) -> Result<Arc<dyn Scanner>, InstrumentorError> {
        let children = registry
            .instrument(
                &kind("Secret"),
                &Target::Ref(ObjectRef::new(ResourceKind::Secret, namespace, name)),
            )
            .await?;
        Ok(Arc::new(SystemAll::new("secret", children)))
    }

    async fn volume_children(
        &self,
        registry: &InstrumentorRegistry,
        namespace: &str,
        volume: &Volume,
    ) -> Result<Vec<Arc<dyn Scanner>>, InstrumentorError> {
        if let Some(cm) = &volume.config_map {
            return Ok(vec![
                self.config_map_wrap(registry, namespace, &cm.name).await?,
            ]);
        }
        if volume.host_path.is_some() {
            return Ok(vec![Arc::new(SensorConstant::passing("hostPath", vec![]))]);
        }
        if let Some(projected) = &volume.projected {
            let mut entries: Vec<Arc<dyn Scanner>> = Vec::new();
            for (index, source) in projected.sources.iter().flatten().enumerate() {
                let children = self.projection_children(registry, namespace, source).await?;
                entries.push(Arc::new(SystemAll::new(index.to_string(), children)));
            }
            return Ok(vec![Arc::new(SystemAll::new("projected volume", entries))]);
        }
        if volume.downward_api.is_some() {
            return Ok(vec![Arc::new(SensorConstant::passing(
                "downwardAPI",
                vec![],
            ))]);
        }
        if let Some(secret) = &volume.secret {
            let Some(secret_name) = secret.secret_name.as_deref() else {
                return Ok(vec![Arc::new(SensorConstant::passing(
                    "secret",
                    vec![Log::new("cannot be instrumented", Severity::Info)],
                ))]);
            };
            return Ok(vec![self.secret_wrap(registry, namespace, secret_name).await?]);
        }
        if let Some(pvc) = &volume.persistent_volume_claim {
            return registry
                .instrument(
                    &kind("PersistentVolumeClaim"),
                    &Target::Ref(ObjectRef::new(
                        ResourceKind::PersistentVolumeClaim,
                        namespace,
                        &pvc.claim_name,
                    )),
                )
                .await;
        }
        Ok(vec![Arc::new(SensorConstant::passing(
            volume.name.clone(),
            vec![Log::new("cannot be instrumented", Severity::Info)],
        ))])
    }

    async fn projection_children(
        &self,
        registry: &InstrumentorRegistry,
        namespace: &str,
        source: &VolumeProjection,
    ) -> Result<Vec<Arc<dyn Scanner>>, InstrumentorError> {
        if let Some(cm) = &source.config_map {
            return Ok(vec![
                self.config_map_wrap(registry, namespace, &cm.name).await?,
            ]);
        }
        if source.service_account_token.is_some() {
            return Ok(vec![Arc::new(SensorConstant::passing(
                "serviceAccountToken",
                vec![],
            ))]);
        }
        if source.downward_api.is_some() {
            return Ok(vec![Arc::new(SensorConstant::passing(
                "downwardAPI",
                vec![],
            ))]);
        }
        if let Some(secret) = &source.secret {
            return Ok(vec![self.secret_wrap(registry, namespace, &secret.name).await?]);
        }
        Ok(vec![Arc::new(SensorConstant::passing(
            "projection",
            vec![Log::new("cannot be instrumented", Severity::Info)],
        ))])
    }
}

#[async_trait]
impl Instrumentor for InstrumentorVolume {
    fn kinds(&self) -> Vec<Kind> {
        vec![kind("Pod#volume")]
    }

    async fn instrument(
        &self,
        registry: &InstrumentorRegistry,
        this_kind: &Kind,
        target: &Target,
    ) -> Result<Vec<Arc<dyn Scanner>>, InstrumentorError> {
        let Target::Volume {
            pod,
            volume_name,
            volume,
        } = target
        else {
            return Err(bad_target(this_kind, "Volume"));
        };
        let namespace = pod.metadata.namespace.as_deref().unwrap_or_default();
        let children = self.volume_children(registry, namespace, volume).await?;
        Ok(vec![Arc::new(SystemAll::new(
            format!("volume {volume_name}"),
            children,
        ))])
    }
}

// ─── ReplicaSet ───────────────────────────────────────────────────────────────

pub struct InstrumentorReplicaSet {
    k8s: Arc<K8s>,
}

impl InstrumentorReplicaSet {
    pub fn new(k8s: Arc<K8s>) -> Self {
        Self { k8s }
    }
}

#[async_trait]
impl Instrumentor for InstrumentorReplicaSet {
    fn kinds(&self) -> Vec<Kind> {
        vec![kind("ReplicaSet")]
    }

    async fn instrument(
        &self,
        registry: &InstrumentorRegistry,
        this_kind: &Kind,
        target: &Target,
    ) -> Result<Vec<Arc<dyn Scanner>>, InstrumentorError> {
        let Target::Resource(obj @ K8sObject::ReplicaSet(rs)) = target else {
            return Err(bad_target(this_kind, "Resource(ReplicaSet)"));
        };
        let namespace = obj.namespace().to_string();
        let desired = rs.spec.as_ref().and_then(|s| s.replicas).unwrap_or(0);
        let status = rs.status.clone().unwrap_or_default();

        // A scaled-to-zero ReplicaSet legitimately has no pods to check.
        let (counts, pods): (Arc<dyn Scanner>, Arc<dyn Scanner>) = if desired == 0 {
            (
                Arc::new(SystemAll::new(
                    "replicas",
                    replica_sensors(0, &[("replicas", Some(status.replicas))]),
                )),
                Arc::new(SensorConstant::passing(
                    "pods",
                    vec![Log::new("requests no pods", Severity::Info)],
                )),
            )
        } else {
            let sensors = replica_sensors(
                desired,
                &[
                    ("replicas", Some(status.replicas)),
                    ("availableReplicas", status.available_replicas),
                    ("readyReplicas", status.ready_replicas),
                ],
            );
            let match_labels = rs
                .spec
                .as_ref()
                .and_then(|s| s.selector.match_labels.clone())
                .unwrap_or_default();
            let pod_scanners = instrument_matching(
                &self.k8s,
                registry,
                ResourceKind::Pod,
                &namespace,
                &match_labels,
            )
            .await?;
            (
                Arc::new(SystemAll::new("replicas", sensors)),
                Arc::new(SystemAll::new("pods", pod_scanners)),
            )
        };

        Ok(vec![Arc::new(SystemAll::new(
            obj.scanner_name(),
            vec![counts, pods],
        ))])
    }
}

// ─── Deployment ───────────────────────────────────────────────────────────────

/// Deployments check replica counts, their Progressing/Available conditions,
/// and the ReplicaSets matching their selector (not pods directly).
pub struct InstrumentorDeployment {
    k8s: Arc<K8s>,
}

impl InstrumentorDeployment {
    pub fn new(k8s: Arc<K8s>) -> Self {
        Self { k8s }
    }
}

#[async_trait]
impl Instrumentor for InstrumentorDeployment {
    fn kinds(&self) -> Vec<Kind> {
        vec![kind("Deployment")]
    }

    async fn instrument(
        &self,
        registry: &InstrumentorRegistry,
        this_kind: &Kind,
        target: &Target,
    ) -> Result<Vec<Arc<dyn Scanner>>, InstrumentorError> {
        let Target::Resource(obj @ K8sObject::Deployment(deploy)) = target else {
            return Err(bad_target(this_kind, "Resource(Deployment)"));
        };
        let namespace = obj.namespace().to_string();
        let desired = deploy.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1);
        let status = deploy.status.clone().unwrap_or_default();

        let counts: Arc<dyn Scanner> = Arc::new(SystemAll::new(
            "replicas",
            replica_sensors(
                desired,
                &[
                    ("replicas", status.replicas),
                    ("availableReplicas", status.available_replicas),
                    ("readyReplicas", status.ready_replicas),
                    ("updatedReplicas", status.updated_replicas),
                ],
            ),
        ));

        let conditions: Vec<Condition> =
            status.conditions.iter().flatten().map(Condition::from).collect();
        let condition_children = condition_sensors(&conditions, &["Progressing", "Available"], &[]);

        let match_labels = deploy
            .spec
            .as_ref()
            .and_then(|s| s.selector.match_labels.clone())
            .unwrap_or_default();
        let replicasets: Arc<dyn Scanner> = Arc::new(SystemAll::new(
            "replicasets",
            instrument_matching(
                &self.k8s,
                registry,
                ResourceKind::ReplicaSet,
                &namespace,
                &match_labels,
            )
            .await?,
        ));

        let mut children = vec![counts];
        children.extend(condition_children);
        children.push(replicasets);

        Ok(vec![Arc::new(SystemAll::new(obj.scanner_name(), children))])
    }
}

// ─── DaemonSet ────────────────────────────────────────────────────────────────

pub struct InstrumentorDaemonSet {
    k8s: Arc<K8s>,
}

impl InstrumentorDaemonSet {
    pub fn new(k8s: Arc<K8s>) -> Self {
        Self { k8s }
    }
}

#[async_trait]
impl Instrumentor for InstrumentorDaemonSet {
    fn kinds(&self) -> Vec<Kind> {
        vec![kind("DaemonSet")]
    }

    async fn instrument(
        &self,
        registry: &InstrumentorRegistry,
        this_kind: &Kind,
        target: &Target,
    ) -> Result<Vec<Arc<dyn Scanner>>, InstrumentorError> {
        let Target::Resource(obj @ K8sObject::DaemonSet(ds)) = target else {
            return Err(bad_target(this_kind, "Resource(DaemonSet)"));
        };
        let namespace = obj.namespace().to_string();
        let status = ds.status.clone().unwrap_or_default();
        let desired = status.desired_number_scheduled;

        let counts: Arc<dyn Scanner> = Arc::new(SystemAll::new(
            "replicas",
            replica_sensors(
                desired,
                &[
                    ("currentNumberScheduled", Some(status.current_number_scheduled)),
                    ("numberAvailable", status.number_available),
                    ("numberReady", Some(status.number_ready)),
                    ("updatedNumberScheduled", status.updated_number_scheduled),
                ],
            ),
        ));

        let misscheduled_state = State::from(status.number_misscheduled == 0);
        let misscheduled: Arc<dyn Scanner> = Arc::new(SensorConstant::new(
            "numberMisscheduled",
            Status::new(
                misscheduled_state,
                vec![Log::new(
                    format!("{} misscheduled", status.number_misscheduled),
                    if misscheduled_state == State::Passing {
                        Severity::Info
                    } else {
                        Severity::Warn
                    },
                )],
            ),
        ));

        let match_labels = ds
            .spec
            .as_ref()
            .and_then(|s| s.selector.match_labels.clone())
            .unwrap_or_default();
        let pods: Arc<dyn Scanner> = Arc::new(SystemAll::new(
            "pods",
            instrument_matching(
                &self.k8s,
                registry,
                ResourceKind::Pod,
                &namespace,
                &match_labels,
            )
            .await?,
        ));

        Ok(vec![Arc::new(SystemAll::new(
            obj.scanner_name(),
            vec![counts, misscheduled, pods],
        ))])
    }
}

// ─── StatefulSet ──────────────────────────────────────────────────────────────

pub struct InstrumentorStatefulSet {
    k8s: Arc<K8s>,
}

impl InstrumentorStatefulSet {
    pub fn new(k8s: Arc<K8s>) -> Self {
        Self { k8s }
    }
}

#[async_trait]
impl Instrumentor for InstrumentorStatefulSet {
    fn kinds(&self) -> Vec<Kind> {
        vec![kind("StatefulSet")]
    }

    async fn instrument(
        &self,
        registry: &InstrumentorRegistry,
        this_kind: &Kind,
        target: &Target,
    ) -> Result<Vec<Arc<dyn Scanner>>, InstrumentorError> {
        let Target::Resource(obj @ K8sObject::StatefulSet(sts)) = target else {
            return Err(bad_target(this_kind, "Resource(StatefulSet)"));
        };
        let namespace = obj.namespace().to_string();
        let desired = sts.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1);
        let status = sts.status.clone().unwrap_or_default();

        let counts: Arc<dyn Scanner> = Arc::new(SystemAll::new(
            "replicas",
            replica_sensors(
                desired,
                &[
                    ("availableReplicas", status.available_replicas),
                    ("currentReplicas", status.current_replicas),
                    ("replicas", Some(status.replicas)),
                    ("updatedReplicas", status.updated_replicas),
                ],
            ),
        ));

        let collisions = status.collision_count.unwrap_or(0);
        let collision_state = State::from(collisions == 0);
        let collision_sensor: Arc<dyn Scanner> = Arc::new(SensorConstant::new(
            "collisionCount",
            Status::new(
                collision_state,
                vec![Log::new(
                    format!("{collisions} collisions"),
                    if collision_state == State::Passing {
                        Severity::Info
                    } else {
                        Severity::Warn
                    },
                )],
            ),
        ));

        let match_labels = sts
            .spec
            .as_ref()
            .and_then(|s| s.selector.match_labels.clone())
            .unwrap_or_default();
        let pods: Arc<dyn Scanner> = Arc::new(SystemAll::new(
            "pods",
            instrument_matching(
                &self.k8s,
                registry,
                ResourceKind::Pod,
                &namespace,
                &match_labels,
            )
            .await?,
        ));

        Ok(vec![Arc::new(SystemAll::new(
            obj.scanner_name(),
            vec![counts, collision_sensor, pods],
        ))])
    }
}

// ─── Job ──────────────────────────────────────────────────────────────────────

pub struct InstrumentorJob {
    k8s: Arc<K8s>,
}

impl InstrumentorJob {
    pub fn new(k8s: Arc<K8s>) -> Self {
        Self { k8s }
    }
}

#[async_trait]
impl Instrumentor for InstrumentorJob {
    fn kinds(&self) -> Vec<Kind> {
        vec![kind("Job")]
    }

    async fn instrument(
        &self,
        registry: &InstrumentorRegistry,
        this_kind: &Kind,
        target: &Target,
    ) -> Result<Vec<Arc<dyn Scanner>>, InstrumentorError> {
        let Target::Resource(obj @ K8sObject::Job(job)) = target else {
            return Err(bad_target(this_kind, "Resource(Job)"));
        };
        let namespace = obj.namespace().to_string();

        let conditions: Vec<Condition> = job
            .status
            .iter()
            .flat_map(|s| s.conditions.iter().flatten())
            .map(Condition::from)
            .collect();
        let mut children = condition_sensors(&conditions, &["Complete"], &[]);

        let match_labels = job
            .spec
            .as_ref()
            .and_then(|s| s.selector.as_ref())
            .and_then(|s| s.match_labels.clone());
        let pods: Arc<dyn Scanner> = match match_labels {
            Some(sel) => {
                let pod_scanners = instrument_matching(
                    &self.k8s,
                    registry,
                    ResourceKind::Pod,
                    &namespace,
                    &sel,
                )
                .await?;
                if pod_scanners.is_empty() {
                    Arc::new(SensorConstant::passing(
                        "pods",
                        vec![Log::new("No pods found", Severity::Info)],
                    ))
                } else {
                    Arc::new(SystemAll::new("pods", pod_scanners))
                }
            }
            None => Arc::new(SensorConstant::passing(
                "pods",
                vec![Log::new("No pods found", Severity::Info)],
            )),
        };
        children.push(pods);

        Ok(vec![Arc::new(SystemAll::new(obj.scanner_name(), children))])
    }
}

// ─── CronJob ──────────────────────────────────────────────────────────────────

/// CronJobs spawn Jobs without any selector labels, so discovery goes
/// through ownerReferences instead.
pub struct InstrumentorCronJob {
    k8s: Arc<K8s>,
}

impl InstrumentorCronJob {
    pub fn new(k8s: Arc<K8s>) -> Self {
        Self { k8s }
    }
}

#[async_trait]
impl Instrumentor for InstrumentorCronJob {
    fn kinds(&self) -> Vec<Kind> {
        vec![kind("CronJob")]
    }

    async fn instrument(
        &self,
        registry: &InstrumentorRegistry,
        this_kind: &Kind,
        target: &Target,
    ) -> Result<Vec<Arc<dyn Scanner>>, InstrumentorError> {
        let Target::Resource(obj @ K8sObject::CronJob(_)) = target else {
            return Err(bad_target(this_kind, "Resource(CronJob)"));
        };
        let namespace = obj.namespace().to_string();
        let owner = OwnerRef::of(obj);

        let jobs = self.k8s.owned(ResourceKind::Job, &namespace, &owner).await?;
        let mut job_scanners = Vec::new();
        for job in jobs {
            job_scanners.extend(
                registry
                    .instrument(&kind("Job"), &Target::Resource(job))
                    .await?,
            );
        }

        Ok(vec![Arc::new(SystemAll::new(
            obj.scanner_name(),
            vec![Arc::new(SystemAll::new("jobs", job_scanners)) as Arc<dyn Scanner>],
        ))])
    }
}

// ─── Service ──────────────────────────────────────────────────────────────────

/// A Service is healthy if at least one backing pod is healthy, hence the
/// AnyOf over its endpoints. Selectorless services have nothing to check.
pub struct InstrumentorService {
    k8s: Arc<K8s>,
}

impl InstrumentorService {
    pub fn new(k8s: Arc<K8s>) -> Self {
        Self { k8s }
    }
}

#[async_trait]
impl Instrumentor for InstrumentorService {
    fn kinds(&self) -> Vec<Kind> {
        vec![kind("Service")]
    }

    async fn instrument(
        &self,
        registry: &InstrumentorRegistry,
        this_kind: &Kind,
        target: &Target,
    ) -> Result<Vec<Arc<dyn Scanner>>, InstrumentorError> {
        let Target::Resource(obj @ K8sObject::Service(service)) = target else {
            return Err(bad_target(this_kind, "Resource(Service)"));
        };
        let namespace = obj.namespace().to_string();

        let selector = service
            .spec
            .as_ref()
            .and_then(|s| s.selector.clone())
            .filter(|s| !s.is_empty());

        let endpoints: Arc<dyn Scanner> = match selector {
            Some(sel) => Arc::new(SystemAny::new(
                "endpoints",
                instrument_matching(&self.k8s, registry, ResourceKind::Pod, &namespace, &sel)
                    .await?,
            )),
            None => Arc::new(SensorConstant::passing(
                "endpoints",
                vec![Log::new("Service does not use selectors", Severity::Info)],
            )),
        };

        Ok(vec![Arc::new(SystemAll::new(
            obj.scanner_name(),
            vec![endpoints],
        ))])
    }
}

// ─── Ingress ──────────────────────────────────────────────────────────────────

pub struct InstrumentorIngress;

#[async_trait]
impl Instrumentor for InstrumentorIngress {
    fn kinds(&self) -> Vec<Kind> {
        vec![kind("Ingress")]
    }

    async fn instrument(
        &self,
        registry: &InstrumentorRegistry,
        this_kind: &Kind,
        target: &Target,
    ) -> Result<Vec<Arc<dyn Scanner>>, InstrumentorError> {
        let Target::Resource(obj @ K8sObject::Ingress(ingress)) = target else {
            return Err(bad_target(this_kind, "Resource(Ingress)"));
        };
        let namespace = obj.namespace().to_string();

        let mut paths: Vec<Arc<dyn Scanner>> = Vec::new();
        for (rule_index, rule) in ingress
            .spec
            .iter()
            .flat_map(|s| s.rules.iter().flatten())
            .enumerate()
        {
            let Some(http) = &rule.http else { continue };
            for (path_index, path) in http.paths.iter().enumerate() {
                let display = format!(
                    "path {rule_index}:{path_index} {}",
                    path.path.as_deref().unwrap_or("/")
                );
                paths.extend(
                    registry
                        .instrument(
                            &kind("Ingress#path"),
                            &Target::IngressPath {
                                namespace: namespace.clone(),
                                name: display,
                                path: Box::new(path.clone()),
                            },
                        )
                        .await?,
                );
            }
        }

        Ok(vec![Arc::new(SystemAll::new(obj.scanner_name(), paths))])
    }
}

/// One scanner per ingress path, resolving service backends through the
/// Service instrumentor.
pub struct InstrumentorIngressPath {
    k8s: Arc<K8s>,
}

impl InstrumentorIngressPath {
    pub fn new(k8s: Arc<K8s>) -> Self {
        Self { k8s }
    }
}

#[async_trait]
impl Instrumentor for InstrumentorIngressPath {
    fn kinds(&self) -> Vec<Kind> {
        vec![kind("Ingress#path")]
    }

    async fn instrument(
        &self,
        registry: &InstrumentorRegistry,
        this_kind: &Kind,
        target: &Target,
    ) -> Result<Vec<Arc<dyn Scanner>>, InstrumentorError> {
        let Target::IngressPath {
            namespace,
            name,
            path,
        } = target
        else {
            return Err(bad_target(this_kind, "IngressPath"));
        };

        if let Some(backend) = &path.backend.service {
            return match self
                .k8s
                .get(ResourceKind::Service, namespace, &backend.name)
                .await?
            {
                None => Ok(vec![Arc::new(SensorConstant::failing(
                    name.clone(),
                    vec![Log::new(
                        format!("service {} exist", backend.name),
                        Severity::Error,
                    )],
                ))]),
                Some(service) => {
                    let scanners = registry
                        .instrument(&kind("Service"), &Target::Resource(service))
                        .await?;
                    Ok(vec![Arc::new(SystemAll::new(name.clone(), scanners))])
                }
            };
        }
        if path.backend.resource.is_some() {
            // Resource backends point outside the Service world; assume fine.
            return Ok(vec![Arc::new(SensorConstant::passing(
                name.clone(),
                vec![],
            ))]);
        }
        Ok(vec![Arc::new(SensorConstant::passing(
            name.clone(),
            vec![Log::new("cannot be instrumented", Severity::Info)],
        ))])
    }
}
