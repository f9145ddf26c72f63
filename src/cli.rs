use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::db::{DEFAULT_RECENT_LIMIT, StorageLocation};
use crate::pricing::MAX_TOKENS_PER_CALL;
use crate::utils::default_db_path;

#[derive(clap::Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP tracking service
    Serve {
        /// Address to bind
        #[arg(long, env = "LLM_COST_HOST", default_value = "127.0.0.1")]
        host: IpAddr,

        /// Port to listen on
        #[arg(long, env = "LLM_COST_PORT", default_value_t = 8000)]
        port: u16,
    },
    /// Record token usage for one LLM call and print its cost
    Track {
        /// Model identifier, e.g. gpt-4o-mini
        model: String,
        #[arg(value_parser = clap::value_parser!(u64).range(..=MAX_TOKENS_PER_CALL))]
        input_tokens: u64,
        #[arg(value_parser = clap::value_parser!(u64).range(..=MAX_TOKENS_PER_CALL))]
        output_tokens: u64,
        /// API endpoint that made the call
        #[arg(long)]
        endpoint: Option<String>,
    },
    /// Show aggregate cost and token totals
    Summary,
    /// Show the most recent usage records
    Recent {
        #[arg(long, default_value_t = DEFAULT_RECENT_LIMIT)]
        limit: usize,
    },
    /// List models with known pricing
    Models,
}

#[derive(clap::Parser, Debug)]
#[command(name = "llm-cost", version, about = "Track and report LLM API spending")]
pub struct Args {
    /// SQLite database path, or :memory: for an ephemeral store. Defaults to ~/.llm-cost/usage.db
    #[arg(long, env = "LLM_COST_DB", global = true)]
    pub db: Option<String>,

    /// JSON file with per-model rate overrides ({"model": {"input": x, "output": y}})
    #[arg(long, env = "LLM_COST_PRICES", global = true)]
    pub prices: Option<PathBuf>,

    /// Emit JSON instead of colored text
    #[arg(long, global = true)]
    pub json: bool,

    /// Debug mode: verbose logging on stderr
    #[arg(long, env = "LLM_COST_DEBUG", global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    pub fn parse() -> Self {
        <Args as clap::Parser>::parse()
    }

    /// Resolved storage location, falling back to the per-user default file
    pub fn storage_location(&self) -> StorageLocation {
        match self.db.as_deref() {
            Some(s) => {
                let Ok(location) = s.parse::<StorageLocation>();
                location
            }
            None => StorageLocation::File(default_db_path()),
        }
    }

    /// Bind address for `serve`, if that is the chosen command
    pub fn bind_addr(&self) -> Option<SocketAddr> {
        match self.command {
            Command::Serve { host, port } => Some(SocketAddr::new(host, port)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use serial_test::serial;
    use std::env;

    #[test]
    fn test_parse_track() {
        let args = Args::try_parse_from([
            "llm-cost",
            "track",
            "gpt-4o-mini",
            "1000",
            "500",
            "--endpoint",
            "/api/chat",
        ])
        .unwrap();
        assert_eq!(
            args.command,
            Command::Track {
                model: "gpt-4o-mini".to_string(),
                input_tokens: 1000,
                output_tokens: 500,
                endpoint: Some("/api/chat".to_string()),
            }
        );
    }

    #[test]
    fn test_negative_tokens_rejected() {
        assert!(Args::try_parse_from(["llm-cost", "track", "gpt-4o", "-5", "1"]).is_err());
        assert!(Args::try_parse_from(["llm-cost", "recent", "--limit", "-1"]).is_err());
    }

    #[test]
    fn test_token_count_cap() {
        let max = MAX_TOKENS_PER_CALL.to_string();
        let over = (MAX_TOKENS_PER_CALL + 1).to_string();
        assert!(Args::try_parse_from(["llm-cost", "track", "gpt-4o", max.as_str(), "0"]).is_ok());
        assert!(Args::try_parse_from(["llm-cost", "track", "gpt-4o", over.as_str(), "0"]).is_err());
        assert!(Args::try_parse_from(["llm-cost", "track", "gpt-4o", "0", over.as_str()]).is_err());
    }

    #[test]
    #[serial]
    fn test_recent_default_limit() {
        let args = Args::try_parse_from(["llm-cost", "recent"]).unwrap();
        assert_eq!(args.command, Command::Recent { limit: 10 });
    }

    #[test]
    #[serial]
    fn test_storage_location_from_flag_and_env() {
        let args = Args::try_parse_from(["llm-cost", "--db", ":memory:", "summary"]).unwrap();
        assert_eq!(args.storage_location(), StorageLocation::InMemory);

        // SAFETY: Test runs serially, no concurrent env access
        unsafe { env::set_var("LLM_COST_DB", "/tmp/llm-cost-test.db") };
        let args = Args::try_parse_from(["llm-cost", "models"]).unwrap();
        assert_eq!(
            args.storage_location(),
            StorageLocation::File(PathBuf::from("/tmp/llm-cost-test.db"))
        );
        unsafe { env::remove_var("LLM_COST_DB") };

        let args = Args::try_parse_from(["llm-cost", "models"]).unwrap();
        assert_eq!(
            args.storage_location(),
            StorageLocation::File(default_db_path())
        );
    }

    #[test]
    #[serial]
    fn test_serve_bind_addr() {
        let args =
            Args::try_parse_from(["llm-cost", "serve", "--host", "0.0.0.0", "--port", "9100"])
                .unwrap();
        assert_eq!(args.bind_addr(), Some("0.0.0.0:9100".parse().unwrap()));

        let args = Args::try_parse_from(["llm-cost", "serve"]).unwrap();
        assert_eq!(args.bind_addr(), Some("127.0.0.1:8000".parse().unwrap()));

        let args = Args::try_parse_from(["llm-cost", "models"]).unwrap();
        assert_eq!(args.bind_addr(), None);
    }
}
