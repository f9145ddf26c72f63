//! Text and JSON rendering for the command-line front end.
//!
//! JSON output reuses the HTTP response bodies so both surfaces agree.

#[cfg(feature = "colors")]
use owo_colors::OwoColorize;

// Provide a no-op color shim when "colors" feature is disabled
#[cfg(not(feature = "colors"))]
pub mod color_shim {
    use std::fmt::{self, Display, Formatter};

    #[derive(Clone)]
    pub struct Plain(pub String);

    impl Display for Plain {
        fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
            f.write_str(&self.0)
        }
    }

    pub trait ColorizeShim {
        fn as_str(&self) -> &str;

        fn bright_black(&self) -> Plain {
            Plain(self.as_str().to_string())
        }
        fn green(&self) -> Plain {
            Plain(self.as_str().to_string())
        }
        fn yellow(&self) -> Plain {
            Plain(self.as_str().to_string())
        }
        fn cyan(&self) -> Plain {
            Plain(self.as_str().to_string())
        }
        fn bold(&self) -> Plain {
            Plain(self.as_str().to_string())
        }
        fn dimmed(&self) -> Plain {
            Plain(self.as_str().to_string())
        }
    }

    impl ColorizeShim for &str {
        fn as_str(&self) -> &str {
            self
        }
    }
    impl ColorizeShim for String {
        fn as_str(&self) -> &str {
            self.as_str()
        }
    }
    impl ColorizeShim for Plain {
        fn as_str(&self) -> &str {
            &self.0
        }
    }
}

#[cfg(not(feature = "colors"))]
use color_shim::ColorizeShim as OwoColorize;

use serde::Serialize;

use crate::db::StorageLocation;
use crate::models::{
    ModelsResponse, RecentRecordResponse, SummaryResponse, TrackResponse, UsageRecord,
    UsageSummary,
};
use crate::pricing::{CostBreakdown, PriceTable};
use crate::utils::{format_currency, format_path, format_tokens};

fn dollars(v: f64) -> String {
    format!("${}", format_currency(v))
}

pub fn build_track_text(cost: &CostBreakdown) -> String {
    format!(
        "{} {} {} {}",
        cost.model.as_str().cyan().bold(),
        dollars(cost.total_cost()).green().bold(),
        format!(
            "(in {} {} · out {} {})",
            format_tokens(cost.input_tokens),
            dollars(cost.input_cost),
            format_tokens(cost.output_tokens),
            dollars(cost.output_cost)
        )
        .bright_black(),
        format!("{} tokens", format_tokens(cost.total_tokens())).dimmed()
    )
}

pub fn build_summary_text(summary: &UsageSummary, location: &StorageLocation) -> String {
    let mut out = format!(
        "{} {} {} {}\n",
        "total".bright_black(),
        dollars(summary.total_cost).green().bold(),
        format!("across {} requests", summary.total_requests).bright_black(),
        format!(
            "(in {} · out {})",
            format_tokens(summary.total_input_tokens),
            format_tokens(summary.total_output_tokens)
        )
        .dimmed()
    );

    if summary.by_model.is_empty() {
        out.push_str(&format!("{}\n", "no usage recorded".dimmed()));
    }
    for (model, cost) in &summary.by_model {
        out.push_str(&format!(
            "  {} {}\n",
            model.as_str().cyan(),
            dollars(*cost).yellow()
        ));
    }

    out.push_str(&format!(
        "{}",
        format!("db: {}", format_path(&location.to_string())).bright_black()
    ));
    out
}

pub fn build_recent_text(records: &[UsageRecord]) -> String {
    if records.is_empty() {
        return "no usage recorded".dimmed().to_string();
    }
    records
        .iter()
        .map(|r| {
            let endpoint = r
                .endpoint
                .as_deref()
                .map(|e| format!(" {e}"))
                .unwrap_or_default();
            format!(
                "{} {} {} {} {}{}",
                format!("#{}", r.id).bright_black(),
                r.timestamp.as_str().dimmed(),
                r.model.as_str().cyan(),
                format!(
                    "{}/{}",
                    format_tokens(r.input_tokens),
                    format_tokens(r.output_tokens)
                )
                .bright_black(),
                dollars(r.total_cost).green(),
                endpoint.yellow()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn build_models_text(prices: &PriceTable) -> String {
    prices
        .entries()
        .iter()
        .map(|e| {
            format!(
                "{} {}",
                e.model.as_str().cyan(),
                format!(
                    "in ${:.2} · out ${:.2} per 1M tokens",
                    e.input_per_million, e.output_per_million
                )
                .bright_black()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn build_track_json(cost: &CostBreakdown) -> anyhow::Result<serde_json::Value> {
    to_json(&TrackResponse::from(cost))
}

pub fn build_summary_json(summary: &UsageSummary) -> anyhow::Result<serde_json::Value> {
    to_json(&SummaryResponse::from(summary))
}

pub fn build_recent_json(records: &[UsageRecord]) -> anyhow::Result<serde_json::Value> {
    let body: Vec<RecentRecordResponse> = records.iter().map(RecentRecordResponse::from).collect();
    to_json(&body)
}

pub fn build_models_json(prices: &PriceTable) -> anyhow::Result<serde_json::Value> {
    to_json(&ModelsResponse {
        models: prices.models(),
    })
}

fn to_json<T: Serialize>(body: &T) -> anyhow::Result<serde_json::Value> {
    Ok(serde_json::to_value(body)?)
}

/// Print either the JSON value or the text rendering
pub fn print_output(json: bool, value: anyhow::Result<serde_json::Value>, text: String) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string(&value?)?);
    } else {
        println!("{text}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record(id: i64, endpoint: Option<&str>) -> UsageRecord {
        UsageRecord {
            id,
            timestamp: "2026-10-16T12:00:00.000000+00:00".to_string(),
            model: "gpt-4o-mini".to_string(),
            input_tokens: 1000,
            output_tokens: 500,
            input_cost: 0.00015,
            output_cost: 0.0003,
            total_cost: 0.00045,
            endpoint: endpoint.map(str::to_string),
        }
    }

    #[test]
    fn test_track_text_mentions_model_and_cost() {
        let cost = crate::pricing::calculate_cost("gpt-4o-mini", 1000, 500).unwrap();
        let text = build_track_text(&cost);
        assert!(text.contains("gpt-4o-mini"));
        assert!(text.contains("$0.000450"));
        assert!(text.contains("1.5K tokens"));
    }

    #[test]
    fn test_summary_text_empty() {
        let text = build_summary_text(&UsageSummary::default(), &StorageLocation::InMemory);
        assert!(text.contains("no usage recorded"));
        assert!(text.contains(":memory:"));
    }

    #[test]
    fn test_recent_text_lists_endpoint() {
        let text = build_recent_text(&[sample_record(2, Some("/api/chat")), sample_record(1, None)]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("#2"));
        assert!(lines[0].contains("/api/chat"));
        assert!(lines[1].contains("#1"));
    }

    #[test]
    fn test_models_text_has_every_model() {
        let text = build_models_text(PriceTable::builtin());
        assert_eq!(text.lines().count(), PriceTable::builtin().entries().len());
        assert!(text.contains("claude-haiku-4-5-20251001"));
    }
}
