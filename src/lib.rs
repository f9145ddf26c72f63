//! # LLM Cost Calculator
//!
//! Records per-call token usage for LLM API invocations, prices each call from
//! a static per-model table, and answers aggregate and recent-history queries.
//!
//! ## Overview
//!
//! - [`pricing`]: the price table and pure cost calculation
//! - [`db`]: the SQLite-backed usage store (record, summary, recent)
//! - [`api`]: the HTTP facade (`/health`, `/track`, `/summary`, `/recent`, `/models`)
//!
//! ## Features
//!
//! - `colors` (default): Enables terminal color output via owo-colors

/// HTTP endpoints over a shared usage store
pub mod api;

/// Command-line argument parsing and configuration
pub mod cli;

/// SQLite usage store
pub mod db;

/// Display formatting for text and JSON output
pub mod display;

/// Crate error type
pub mod error;

/// Usage records, summaries and response bodies
pub mod models;

/// Model pricing and cost calculation
pub mod pricing;

/// Utility functions for paths and formatting
pub mod utils;

pub use db::{DEFAULT_RECENT_LIMIT, StorageLocation, UsageStore};
pub use error::{Error, Result};
pub use models::{UsageRecord, UsageSummary};
pub use pricing::{
    CostBreakdown, MAX_TOKENS_PER_CALL, PriceEntry, PriceTable, calculate_cost,
    get_supported_models,
};
