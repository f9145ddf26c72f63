//! JSON bodies shared by the HTTP endpoints and `--json` CLI output.
//!
//! Costs are rounded here, for display only; stored values keep full precision.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{UsageRecord, UsageSummary};
use crate::pricing::CostBreakdown;
use crate::utils::round_cost;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TrackResponse {
    pub model: String,
    pub input_cost: f64,
    pub output_cost: f64,
    pub total_cost: f64,
    pub total_tokens: u64,
}

impl From<&CostBreakdown> for TrackResponse {
    fn from(cost: &CostBreakdown) -> Self {
        Self {
            model: cost.model.clone(),
            input_cost: round_cost(cost.input_cost),
            output_cost: round_cost(cost.output_cost),
            total_cost: round_cost(cost.total_cost()),
            total_tokens: cost.total_tokens(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub total_cost: f64,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_requests: u64,
    pub by_model: BTreeMap<String, f64>,
}

impl From<&UsageSummary> for SummaryResponse {
    fn from(summary: &UsageSummary) -> Self {
        Self {
            total_cost: round_cost(summary.total_cost),
            total_input_tokens: summary.total_input_tokens,
            total_output_tokens: summary.total_output_tokens,
            total_requests: summary.total_requests,
            by_model: summary
                .by_model
                .iter()
                .map(|(model, cost)| (model.clone(), round_cost(*cost)))
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecentRecordResponse {
    pub id: i64,
    pub timestamp: String,
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_cost: f64,
    /// Serialized as `null` when absent
    pub endpoint: Option<String>,
}

impl From<&UsageRecord> for RecentRecordResponse {
    fn from(r: &UsageRecord) -> Self {
        Self {
            id: r.id,
            timestamp: r.timestamp.clone(),
            model: r.model.clone(),
            input_tokens: r.input_tokens,
            output_tokens: r.output_tokens,
            total_cost: round_cost(r.total_cost),
            endpoint: r.endpoint.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModelsResponse {
    pub models: Vec<String>,
}
