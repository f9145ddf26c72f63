use serde::Serialize;
use std::collections::BTreeMap;

/// A persisted usage event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageRecord {
    pub id: i64,
    /// RFC 3339, UTC, assigned by the store
    pub timestamp: String,
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub input_cost: f64,
    pub output_cost: f64,
    pub total_cost: f64,
    pub endpoint: Option<String>,
}

/// Aggregate view over every stored record
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UsageSummary {
    pub total_cost: f64,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_requests: u64,
    /// Summed cost per model; models without records are absent
    pub by_model: BTreeMap<String, f64>,
}
