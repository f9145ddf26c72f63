//! # Pricing Module
//!
//! Provides model-specific pricing information and cost calculation.
//!
//! ## Pricing Structure
//!
//! Each model has a rate (USD per one million tokens) for:
//! - Input tokens (prompt)
//! - Output tokens (completion)
//!
//! The built-in table can be extended or overridden once at startup from a
//! JSON file (see [`PriceTable::load_overrides`]):
//!
//! ```json
//! { "gpt-4o": { "input": 2.0, "output": 8.0 } }
//! ```

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

const TOKENS_PER_MILLION: f64 = 1_000_000.0;

/// Largest token count accepted for either side of a single call.
///
/// Stored totals stay far inside `u64` at this bound.
pub const MAX_TOKENS_PER_CALL: u64 = u32::MAX as u64;

/// Rates for a single model, in USD per one million tokens
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceEntry {
    pub model: String,
    pub input_per_million: f64,
    pub output_per_million: f64,
}

impl PriceEntry {
    fn new(model: &str, input_per_million: f64, output_per_million: f64) -> Self {
        Self {
            model: model.to_string(),
            input_per_million,
            output_per_million,
        }
    }
}

/// Cost of a single call, not yet persisted
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostBreakdown {
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub input_cost: f64,
    pub output_cost: f64,
}

impl CostBreakdown {
    pub fn total_cost(&self) -> f64 {
        self.input_cost + self.output_cost
    }

    pub fn total_tokens(&self) -> u64 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

/// Model identifier -> rates, in definition order
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTable {
    entries: Vec<PriceEntry>,
}

static BUILTIN_PRICES: Lazy<PriceTable> = Lazy::new(|| PriceTable {
    entries: vec![
        PriceEntry::new("gpt-4o", 2.50, 10.00),
        PriceEntry::new("gpt-4o-mini", 0.15, 0.60),
        PriceEntry::new("gpt-4-turbo", 10.00, 30.00),
        PriceEntry::new("gpt-3.5-turbo", 0.50, 1.50),
        PriceEntry::new("claude-opus-4-20250514", 15.00, 75.00),
        PriceEntry::new("claude-sonnet-4-5-20250929", 3.00, 15.00),
        PriceEntry::new("claude-haiku-4-5-20251001", 0.80, 4.00),
    ],
});

/// Shape of one entry in a price override file
#[derive(Debug, Deserialize)]
struct RateOverride {
    input: f64,
    output: f64,
}

impl PriceTable {
    /// The reference price table
    pub fn builtin() -> &'static PriceTable {
        &BUILTIN_PRICES
    }

    pub fn get(&self, model: &str) -> Option<&PriceEntry> {
        self.entries.iter().find(|e| e.model == model)
    }

    pub fn entries(&self) -> &[PriceEntry] {
        &self.entries
    }

    /// Model identifiers in definition order
    pub fn models(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.model.clone()).collect()
    }

    /// Compute the cost of one call. No rounding is applied.
    ///
    /// Either count above [`MAX_TOKENS_PER_CALL`] is rejected with `InvalidInput`.
    pub fn calculate_cost(
        &self,
        model: &str,
        input_tokens: u64,
        output_tokens: u64,
    ) -> Result<CostBreakdown> {
        let Some(entry) = self.get(model) else {
            return Err(Error::UnknownModel {
                model: model.to_string(),
                known: self.models(),
            });
        };
        check_token_count("input_tokens", input_tokens)?;
        check_token_count("output_tokens", output_tokens)?;

        let input_cost = (input_tokens as f64 / TOKENS_PER_MILLION) * entry.input_per_million;
        let output_cost = (output_tokens as f64 / TOKENS_PER_MILLION) * entry.output_per_million;

        Ok(CostBreakdown {
            model: model.to_string(),
            input_tokens,
            output_tokens,
            input_cost,
            output_cost,
        })
    }

    /// Apply a set of rate overrides.
    ///
    /// Known models keep their position and take the new rates; unknown models
    /// are appended in iteration order.
    pub fn with_overrides<I>(mut self, overrides: I) -> Result<Self>
    where
        I: IntoIterator<Item = PriceEntry>,
    {
        for entry in overrides {
            validate_rate(&entry.model, "input", entry.input_per_million)?;
            validate_rate(&entry.model, "output", entry.output_per_million)?;
            match self.entries.iter_mut().find(|e| e.model == entry.model) {
                Some(existing) => *existing = entry,
                None => self.entries.push(entry),
            }
        }
        Ok(self)
    }

    /// Read overrides from a JSON file and apply them to the built-in table
    pub fn load_overrides(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::InvalidInput(format!("cannot read price file {}: {e}", path.display()))
        })?;
        let parsed: BTreeMap<String, RateOverride> = serde_json::from_str(&content)
            .map_err(|e| Error::InvalidInput(format!("malformed price file {}: {e}", path.display())))?;

        Self::builtin().clone().with_overrides(
            parsed
                .into_iter()
                .map(|(model, r)| PriceEntry::new(&model, r.input, r.output)),
        )
    }
}

fn check_token_count(field: &str, n: u64) -> Result<()> {
    if n <= MAX_TOKENS_PER_CALL {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "{field} must be <= {MAX_TOKENS_PER_CALL}, got {n}"
        )))
    }
}

fn validate_rate(model: &str, side: &str, rate: f64) -> Result<()> {
    if rate.is_finite() && rate >= 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "{side} rate for {model} must be a non-negative number, got {rate}"
        )))
    }
}

/// Cost of one call against the built-in table
pub fn calculate_cost(model: &str, input_tokens: u64, output_tokens: u64) -> Result<CostBreakdown> {
    PriceTable::builtin().calculate_cost(model, input_tokens, output_tokens)
}

/// Every model in the built-in table, in definition order
pub fn get_supported_models() -> Vec<String> {
    PriceTable::builtin().models()
}
