use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use llm_cost_calculator::cli::{Args, Command};
use llm_cost_calculator::display::{
    build_models_json, build_models_text, build_recent_json, build_recent_text,
    build_summary_json, build_summary_text, build_track_json, build_track_text, print_output,
};
use llm_cost_calculator::pricing::PriceTable;
use llm_cost_calculator::{UsageStore, api};

fn init_logging(debug: bool) {
    let default_filter = if debug {
        "llm_cost_calculator=debug,tower_http=debug"
    } else {
        "llm_cost_calculator=info,tower_http=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn open_store(args: &Args, prices: PriceTable) -> Result<UsageStore> {
    let location = args.storage_location();
    UsageStore::open_with_prices(&location, prices)
        .with_context(|| format!("open usage database at {location}"))
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    let prices = match args.prices.as_deref() {
        Some(path) => PriceTable::load_overrides(path)
            .with_context(|| format!("load price overrides from {}", path.display()))?,
        None => PriceTable::builtin().clone(),
    };

    match &args.command {
        Command::Models => print_output(
            args.json,
            build_models_json(&prices),
            build_models_text(&prices),
        ),
        Command::Serve { .. } => {
            let store = open_store(&args, prices)?;
            let addr = args.bind_addr().context("serve without bind address")?;
            let store = Arc::new(store);
            info!("Starting LLM cost tracker v{}", env!("CARGO_PKG_VERSION"));
            tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("build tokio runtime")?
                .block_on(api::serve(Arc::clone(&store), addr))?;

            match Arc::try_unwrap(store) {
                Ok(store) => store.close().context("close usage database")?,
                Err(shared) => warn!(
                    handles = Arc::strong_count(&shared),
                    "usage store still shared at shutdown, closing on drop"
                ),
            }
            Ok(())
        }
        Command::Track {
            model,
            input_tokens,
            output_tokens,
            endpoint,
        } => {
            let store = open_store(&args, prices)?;
            let cost = store
                .record(model, *input_tokens, *output_tokens, endpoint.as_deref())
                .context("record usage")?;
            print_output(args.json, build_track_json(&cost), build_track_text(&cost))?;
            store.close().context("close usage database")
        }
        Command::Summary => {
            let store = open_store(&args, prices)?;
            let summary = store.get_summary().context("read usage summary")?;
            print_output(
                args.json,
                build_summary_json(&summary),
                build_summary_text(&summary, store.location()),
            )?;
            store.close().context("close usage database")
        }
        Command::Recent { limit } => {
            let store = open_store(&args, prices)?;
            let records = store.get_recent(*limit).context("read recent usage")?;
            print_output(
                args.json,
                build_recent_json(&records),
                build_recent_text(&records),
            )?;
            store.close().context("close usage database")
        }
    }
}
