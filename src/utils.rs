use std::path::PathBuf;

/// Decimal places kept when costs are presented
pub const COST_DECIMAL_PLACES: i32 = 6;

const DATA_DIR_NAME: &str = ".llm-cost";
const DB_FILE_NAME: &str = "usage.db";

/// Default database file: `~/.llm-cost/usage.db`, or `./usage.db` without a home directory
pub fn default_db_path() -> PathBuf {
    match directories::BaseDirs::new() {
        Some(b) => b.home_dir().join(DATA_DIR_NAME).join(DB_FILE_NAME),
        None => PathBuf::from(DB_FILE_NAME),
    }
}

/// Round a cost for display
pub fn round_cost(v: f64) -> f64 {
    let scale = 10f64.powi(COST_DECIMAL_PLACES);
    (v * scale).round() / scale
}

pub fn format_path(p: &str) -> String {
    if let Some(b) = directories::BaseDirs::new() {
        let home_s = b.home_dir().to_string_lossy();
        if p.starts_with(&*home_s) {
            return format!("~{}", &p[home_s.len()..]);
        }
    }
    p.to_owned()
}

pub fn format_currency(v: f64) -> String {
    format!("{:.6}", round_cost(v))
}

pub fn format_tokens(n: u64) -> String {
    if n >= 1_000_000_000 {
        format!("{:.1}B", n as f64 / 1e9)
    } else if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1e6)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1e3)
    } else {
        n.to_string()
    }
}
