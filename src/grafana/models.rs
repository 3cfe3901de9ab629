//! Response shapes for Grafana's Prometheus-compatible alert-rules endpoint
//! (`/api/prometheus/grafana/api/v1/rules`). Only the fields the
//! instrumentors read are modelled.

use std::collections::HashMap;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AlertsResponse {
    pub status: String,
    pub data: AlertData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlertData {
    pub groups: Vec<Group>,
}

/// An alert rule group. `file` carries the folder the group lives in —
/// folders are not returned as a structure of their own and must be
/// reassembled from this field.
#[derive(Debug, Clone, Deserialize)]
pub struct Group {
    pub name: String,
    pub file: String,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Rule {
    pub name: String,
    pub state: RuleState,
    #[serde(default)]
    pub alerts: Vec<Alert>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleState {
    Inactive,
    Pending,
    Firing,
}

impl RuleState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::Pending => "pending",
            Self::Firing => "firing",
        }
    }
}

/// One alert instance under a rule.
#[derive(Debug, Clone, Deserialize)]
pub struct Alert {
    #[serde(default)]
    pub labels: HashMap<String, String>,
    pub state: AlertState,
}

impl Alert {
    /// The alertname label, which is how Grafana names instances.
    pub fn name(&self) -> &str {
        self.labels.get("alertname").map_or("alert", String::as_str)
    }
}

/// Alert instance states as Grafana spells them on the wire: title-case,
/// with the error/no-data flavour in parentheses ("inactive" being the one
/// lowercase straggler).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum AlertState {
    #[serde(rename = "Normal")]
    Normal,
    #[serde(rename = "Normal (Error)")]
    NormalError,
    #[serde(rename = "Alerting")]
    Alerting,
    #[serde(rename = "Alerting (NoData)")]
    AlertingNodata,
    #[serde(rename = "Alerting (Error)")]
    AlertingError,
    #[serde(rename = "Pending")]
    Pending,
    #[serde(rename = "Pending (NoData)")]
    PendingNodata,
    #[serde(rename = "NoData")]
    Nodata,
    #[serde(rename = "Error")]
    Error,
    #[serde(rename = "inactive")]
    Inactive,
}

impl AlertState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::NormalError => "Normal (Error)",
            Self::Alerting => "Alerting",
            Self::AlertingNodata => "Alerting (NoData)",
            Self::AlertingError => "Alerting (Error)",
            Self::Pending => "Pending",
            Self::PendingNodata => "Pending (NoData)",
            Self::Nodata => "NoData",
            Self::Error => "Error",
            Self::Inactive => "inactive",
        }
    }
}

/// A group passed to the instrumentors inline or by name.
#[derive(Debug, Clone)]
pub enum GroupRef {
    Name(String),
    Inline(Group),
}

/// A rule passed to the instrumentors inline or by (group, name).
#[derive(Debug, Clone)]
pub enum RuleRef {
    Name { group: String, name: String },
    Inline(Rule),
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "status": "success",
        "data": {
            "groups": [
                {
                    "name": "latency",
                    "file": "payments",
                    "rules": [
                        {
                            "name": "p99 too high",
                            "state": "firing",
                            "alerts": [
                                {
                                    "labels": {"alertname": "p99 too high", "pod": "api-0"},
                                    "state": "Alerting"
                                },
                                {
                                    "labels": {"alertname": "p99 too high", "pod": "api-1"},
                                    "state": "Normal"
                                }
                            ]
                        },
                        {"name": "error rate", "state": "inactive"}
                    ]
                }
            ]
        }
    }"#;

    #[test]
    fn parses_the_rules_response() {
        let parsed: AlertsResponse = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(parsed.status, "success");
        let group = &parsed.data.groups[0];
        assert_eq!(group.file, "payments");
        assert_eq!(group.rules.len(), 2);
        assert_eq!(group.rules[0].state, RuleState::Firing);
        assert_eq!(group.rules[0].alerts[0].state, AlertState::Alerting);
        assert_eq!(group.rules[0].alerts[1].state, AlertState::Normal);
        assert_eq!(group.rules[0].alerts[0].name(), "p99 too high");
        assert_eq!(group.rules[1].state, RuleState::Inactive);
        assert!(group.rules[1].alerts.is_empty());
    }

    #[test]
    fn parses_every_alert_state_spelling() {
        let cases = [
            ("Normal", AlertState::Normal),
            ("Normal (Error)", AlertState::NormalError),
            ("Alerting", AlertState::Alerting),
            ("Alerting (NoData)", AlertState::AlertingNodata),
            ("Alerting (Error)", AlertState::AlertingError),
            ("Pending", AlertState::Pending),
            ("Pending (NoData)", AlertState::PendingNodata),
            ("NoData", AlertState::Nodata),
            ("Error", AlertState::Error),
            ("inactive", AlertState::Inactive),
        ];
        for (wire, expected) in cases {
            let raw = format!(r#"{{"labels": {{}}, "state": "{wire}"}}"#);
            let alert: Alert = serde_json::from_str(&raw)
                .unwrap_or_else(|e| panic!("state {wire:?} should deserialize: {e}"));
            assert_eq!(alert.state, expected, "state {wire:?}");
            assert_eq!(alert.state.as_str(), wire);
        }
    }

    #[test]
    fn lowercase_alert_states_are_rejected() {
        // The wire format is title-case; "alerting" is not a real state.
        assert!(serde_json::from_str::<Alert>(r#"{"labels": {}, "state": "alerting"}"#).is_err());
    }

    #[test]
    fn alert_without_alertname_falls_back() {
        let alert: Alert = serde_json::from_str(r#"{"labels": {}, "state": "NoData"}"#).unwrap();
        assert_eq!(alert.name(), "alert");
        assert_eq!(alert.state, AlertState::Nodata);
    }
}
