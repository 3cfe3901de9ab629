//! Grafana alert-tree instrumentation: one scanner hierarchy per Grafana
//! instance, folder, group, rule, and alert instance, fed by the
//! Prometheus-compatible rules endpoint.

pub mod models;

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::generic::{SensorConstant, SystemAll};
use crate::instrument::{
    ApiError, Instrumentor, InstrumentorError, InstrumentorRegistry, Kind, Target,
};
use crate::models::{Log, Scanner, Severity, State, Status};
use models::{Alert, Group, GroupRef, Rule, RuleRef, RuleState};

/// The kind namespace all Grafana instrumentors register under.
pub const KIND_NAMESPACE: &str = "grafana.org/alerts";

pub fn kind(name: &str) -> Kind {
    Kind::new(KIND_NAMESPACE, name)
}

// ─── API facade ───────────────────────────────────────────────────────────────

/// Request-scoped facade over one Grafana instance. The rules response is
/// fetched once per scan and served from memory afterwards.
pub struct GrafanaApi {
    base_url: String,
    http: reqwest::Client,
    groups: Mutex<Option<Arc<Vec<Group>>>>,
}

impl GrafanaApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into(),
            http,
            groups: Mutex::new(None),
        }
    }

    /// All alert groups, from the one fetch this scan performs.
    pub async fn alert_groups(&self) -> Result<Arc<Vec<Group>>, ApiError> {
        let mut cached = self.groups.lock().await;
        if let Some(groups) = cached.as_ref() {
            return Ok(groups.clone());
        }
        let url = format!("{}/api/prometheus/grafana/api/v1/rules", self.base_url);
        debug!(%url, "fetching alert rules");
        let res = self.http.get(&url).send().await?;
        if !res.status().is_success() {
            return Err(ApiError::Response(format!(
                "grafana returned {} for {url}",
                res.status()
            )));
        }
        let body: models::AlertsResponse = res.json().await?;
        let groups = Arc::new(body.data.groups);
        *cached = Some(groups.clone());
        Ok(groups)
    }

    /// Folder names, assembled from the `file` field of every group.
    pub async fn folders(&self) -> Result<BTreeSet<String>, ApiError> {
        let groups = self.alert_groups().await?;
        Ok(groups.iter().map(|g| g.file.clone()).collect())
    }

    /// The groups belonging to one folder.
    pub async fn folder_groups(&self, folder: &str) -> Result<Vec<Group>, ApiError> {
        let groups = self.alert_groups().await?;
        Ok(groups.iter().filter(|g| g.file == folder).cloned().collect())
    }

    pub async fn group(&self, name: &str) -> Result<Group, InstrumentorError> {
        let groups = self.alert_groups().await?;
        groups
            .iter()
            .find(|g| g.name == name)
            .cloned()
            .ok_or_else(|| InstrumentorError::Other(format!("alert group not found: {name}")))
    }

    pub async fn rule(&self, group: &str, name: &str) -> Result<Rule, InstrumentorError> {
        let group = self.group(group).await?;
        group
            .rules
            .iter()
            .find(|r| r.name == name)
            .cloned()
            .ok_or_else(|| InstrumentorError::Other(format!("rule not found: {name}")))
    }
}

// ─── State mapping ────────────────────────────────────────────────────────────

fn severity_for(state: State) -> Severity {
    match state {
        State::Passing => Severity::Info,
        State::Failing => Severity::Error,
        State::Unknown => Severity::Warn,
    }
}

fn alert_status(alert: &Alert, state_when_pending: State) -> Status {
    use models::AlertState;
    let state = match alert.state {
        AlertState::Normal | AlertState::Inactive => State::Passing,
        AlertState::Alerting
        | AlertState::AlertingNodata
        | AlertState::AlertingError
        | AlertState::Error
        | AlertState::NormalError => State::Failing,
        // A pending no-data alert is still pending; the qualifier does not
        // change which side of the fence it sits on.
        AlertState::Pending | AlertState::PendingNodata => state_when_pending,
        AlertState::Nodata => State::Unknown,
    };
    Status::new(
        state,
        vec![Log::new(alert.state.as_str(), severity_for(state))],
    )
}

fn rule_status(rule: &Rule, state_when_pending: State) -> Status {
    let state = match rule.state {
        RuleState::Inactive => State::Passing,
        RuleState::Firing => State::Failing,
        RuleState::Pending => state_when_pending,
    };
    Status::new(
        state,
        vec![Log::new(rule.state.as_str(), severity_for(state))],
    )
}

/// A rule's own state decides its status, but its alert instances remain
/// addressable as children.
#[derive(Debug)]
struct ScannerRule {
    name: String,
    val: Status,
    alerts: Vec<Arc<dyn Scanner>>,
}

impl Scanner for ScannerRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn status(&self) -> Status {
        self.val.clone()
    }

    fn children(&self) -> Vec<Arc<dyn Scanner>> {
        self.alerts.clone()
    }
}

// ─── Instrumentors ────────────────────────────────────────────────────────────

/// One sensor per alert instance.
pub struct InstrumentorAlert {
    state_when_pending: State,
}

#[async_trait]
impl Instrumentor for InstrumentorAlert {
    fn kinds(&self) -> Vec<Kind> {
        vec![kind("alert")]
    }

    async fn instrument(
        &self,
        _registry: &InstrumentorRegistry,
        this_kind: &Kind,
        target: &Target,
    ) -> Result<Vec<Arc<dyn Scanner>>, InstrumentorError> {
        let Target::GrafanaAlert(alert) = target else {
            return Err(InstrumentorError::BadTarget {
                kind: this_kind.clone(),
                expected: "GrafanaAlert",
            });
        };
        Ok(vec![Arc::new(SensorConstant::new(
            alert.name(),
            alert_status(alert, self.state_when_pending),
        ))])
    }
}

pub struct InstrumentorAlertRule {
    api: Arc<GrafanaApi>,
    state_when_pending: State,
}

#[async_trait]
impl Instrumentor for InstrumentorAlertRule {
    fn kinds(&self) -> Vec<Kind> {
        vec![kind("alertrule")]
    }

    async fn instrument(
        &self,
        registry: &InstrumentorRegistry,
        this_kind: &Kind,
        target: &Target,
    ) -> Result<Vec<Arc<dyn Scanner>>, InstrumentorError> {
        let Target::GrafanaRule(rule_ref) = target else {
            return Err(InstrumentorError::BadTarget {
                kind: this_kind.clone(),
                expected: "GrafanaRule",
            });
        };
        let rule = match rule_ref {
            RuleRef::Inline(rule) => rule.clone(),
            RuleRef::Name { group, name } => self.api.rule(group, name).await?,
        };

        let mut alerts = Vec::new();
        for alert in &rule.alerts {
            alerts.extend(
                registry
                    .instrument(&kind("alert"), &Target::GrafanaAlert(alert.clone()))
                    .await?,
            );
        }
        Ok(vec![Arc::new(ScannerRule {
            name: rule.name.clone(),
            val: rule_status(&rule, self.state_when_pending),
            alerts,
        })])
    }
}

pub struct InstrumentorAlertRuleGroup {
    api: Arc<GrafanaApi>,
}

#[async_trait]
impl Instrumentor for InstrumentorAlertRuleGroup {
    fn kinds(&self) -> Vec<Kind> {
        vec![kind("group")]
    }

    async fn instrument(
        &self,
        registry: &InstrumentorRegistry,
        this_kind: &Kind,
        target: &Target,
    ) -> Result<Vec<Arc<dyn Scanner>>, InstrumentorError> {
        let Target::GrafanaGroup(group_ref) = target else {
            return Err(InstrumentorError::BadTarget {
                kind: this_kind.clone(),
                expected: "GrafanaGroup",
            });
        };
        let group = match group_ref {
            GroupRef::Inline(group) => group.clone(),
            GroupRef::Name(name) => self.api.group(name).await?,
        };

        let mut rules = Vec::new();
        for rule in &group.rules {
            rules.extend(
                registry
                    .instrument(
                        &kind("alertrule"),
                        &Target::GrafanaRule(RuleRef::Inline(rule.clone())),
                    )
                    .await?,
            );
        }
        Ok(vec![Arc::new(SystemAll::new(group.name.clone(), rules))])
    }
}

/// Folders are reassembled from group labels; each folder aggregates its
/// groups.
pub struct InstrumentorAlertFolder {
    api: Arc<GrafanaApi>,
}

#[async_trait]
impl Instrumentor for InstrumentorAlertFolder {
    fn kinds(&self) -> Vec<Kind> {
        vec![kind("folder")]
    }

    async fn instrument(
        &self,
        registry: &InstrumentorRegistry,
        this_kind: &Kind,
        target: &Target,
    ) -> Result<Vec<Arc<dyn Scanner>>, InstrumentorError> {
        let Target::GrafanaFolder { folder } = target else {
            return Err(InstrumentorError::BadTarget {
                kind: this_kind.clone(),
                expected: "GrafanaFolder",
            });
        };

        let mut groups = Vec::new();
        for group in self.api.folder_groups(folder).await? {
            groups.extend(
                registry
                    .instrument(
                        &kind("group"),
                        &Target::GrafanaGroup(GroupRef::Inline(group)),
                    )
                    .await?,
            );
        }
        Ok(vec![Arc::new(SystemAll::new(folder.clone(), groups))])
    }
}

/// Root of a Grafana scan: one child per folder.
pub struct InstrumentorGrafana {
    api: Arc<GrafanaApi>,
}

#[async_trait]
impl Instrumentor for InstrumentorGrafana {
    fn kinds(&self) -> Vec<Kind> {
        vec![kind("grafana")]
    }

    async fn instrument(
        &self,
        registry: &InstrumentorRegistry,
        this_kind: &Kind,
        target: &Target,
    ) -> Result<Vec<Arc<dyn Scanner>>, InstrumentorError> {
        let Target::GrafanaRoot { name } = target else {
            return Err(InstrumentorError::BadTarget {
                kind: this_kind.clone(),
                expected: "GrafanaRoot",
            });
        };

        let mut folders = Vec::new();
        for folder in self.api.folders().await? {
            folders.extend(
                registry
                    .instrument(&kind("folder"), &Target::GrafanaFolder { folder })
                    .await?,
            );
        }
        Ok(vec![Arc::new(SystemAll::new(name.clone(), folders))])
    }
}

/// A registry with every Grafana instrumentor bound to its kinds. Merge it
/// into a Kubernetes registry with `extend` to scan both worlds in one tree.
pub fn registry(api: Arc<GrafanaApi>) -> InstrumentorRegistry {
    let mut registry = InstrumentorRegistry::new();
    // Pending alerts and rules count as healthy until they fire.
    let state_when_pending = State::Passing;
    registry.register_all(Arc::new(InstrumentorAlert { state_when_pending }));
    registry.register_all(Arc::new(InstrumentorAlertRule {
        api: api.clone(),
        state_when_pending,
    }));
    registry.register_all(Arc::new(InstrumentorAlertRuleGroup { api: api.clone() }));
    registry.register_all(Arc::new(InstrumentorAlertFolder { api: api.clone() }));
    registry.register_all(Arc::new(InstrumentorGrafana { api }));
    registry
}

#[cfg(test)]
mod tests {
    use super::models::AlertState;
    use super::*;

    fn alert(state: AlertState) -> Alert {
        Alert {
            labels: [("alertname".to_string(), "cpu hot".to_string())]
                .into_iter()
                .collect(),
            state,
        }
    }

    #[test]
    fn alert_state_mapping() {
        assert_eq!(
            alert_status(&alert(AlertState::Normal), State::Passing).state,
            State::Passing
        );
        assert_eq!(
            alert_status(&alert(AlertState::Inactive), State::Passing).state,
            State::Passing
        );
        for failing in [
            AlertState::Alerting,
            AlertState::AlertingNodata,
            AlertState::AlertingError,
            AlertState::Error,
            AlertState::NormalError,
        ] {
            assert_eq!(
                alert_status(&alert(failing), State::Passing).state,
                State::Failing,
                "{} should fail",
                failing.as_str()
            );
        }
        assert_eq!(
            alert_status(&alert(AlertState::Nodata), State::Passing).state,
            State::Unknown
        );
    }

    #[test]
    fn pending_alert_uses_the_configured_state() {
        for pending in [AlertState::Pending, AlertState::PendingNodata] {
            assert_eq!(
                alert_status(&alert(pending), State::Passing).state,
                State::Passing
            );
            assert_eq!(
                alert_status(&alert(pending), State::Failing).state,
                State::Failing
            );
        }
    }

    #[test]
    fn alert_message_carries_the_raw_state() {
        let status = alert_status(&alert(AlertState::Alerting), State::Passing);
        assert_eq!(status.messages.len(), 1);
        assert_eq!(status.messages[0].message, "Alerting");
        assert_eq!(status.messages[0].severity, Severity::Error);
    }

    #[test]
    fn rule_state_mapping() {
        let rule = |state| Rule {
            name: "r".to_string(),
            state,
            alerts: vec![],
        };
        assert_eq!(
            rule_status(&rule(RuleState::Inactive), State::Passing).state,
            State::Passing
        );
        assert_eq!(
            rule_status(&rule(RuleState::Firing), State::Passing).state,
            State::Failing
        );
        assert_eq!(
            rule_status(&rule(RuleState::Pending), State::Unknown).state,
            State::Unknown
        );
    }
}
