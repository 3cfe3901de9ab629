//! Response shapes for Prometheus instant queries.

use std::collections::HashMap;

use serde::Deserialize;

/// Envelope every Prometheus API response arrives in.
#[derive(Debug, Clone, Deserialize)]
pub struct PromResponse<T> {
    pub status: String,
    pub data: T,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstantData {
    #[serde(rename = "resultType")]
    pub result_type: String,
    pub result: Vec<InstantSample>,
}

/// One instant-vector sample: a label set and a `[timestamp, "value"]` pair.
#[derive(Debug, Clone, Deserialize)]
pub struct InstantSample {
    pub metric: HashMap<String, String>,
    pub value: (f64, String),
}
