//! Command-line interface for stock-pair
//!
//! ```bash
//! stock-pair analyze AAPL MSFT --user ana
//! stock-pair history --user ana --limit 5
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use pair_analysis::service::DEFAULT_HISTORY_LIMIT;
use pair_analysis::{
    AnalysisConfig, AnalysisService, HistoryStore, JsonlHistoryStore, PairAnalysisEngine,
    StockError,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

const DEFAULT_HISTORY_FILE: &str = "stock_pair_history.jsonl";

#[derive(Parser, Debug)]
#[command(name = "stock-pair")]
#[command(about = "Compare two stock tickers side by side", long_about = None)]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    /// Days of history to fetch (overrides STOCK_PAIR_LOOKBACK_DAYS)
    #[arg(long, global = true)]
    days: Option<u32>,

    /// Neighbours used by the predictor (overrides STOCK_PAIR_NEIGHBORS)
    #[arg(long, global = true)]
    neighbors: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze two tickers and print the result as JSON
    Analyze {
        ticker1: String,
        ticker2: String,
        /// Record the analysis under this user
        #[arg(long)]
        user: Option<String>,
        /// History file (JSON lines)
        #[arg(long)]
        history: Option<PathBuf>,
        /// Print JSON on a single line
        #[arg(long)]
        compact: bool,
    },
    /// List recent analyses, newest first
    History {
        #[arg(long)]
        user: Option<String>,
        #[arg(long)]
        history: Option<PathBuf>,
        #[arg(long)]
        limit: Option<usize>,
    },
}

impl Cli {
    fn config(&self) -> pair_analysis::Result<AnalysisConfig> {
        let mut builder = AnalysisConfig::builder().with_env();
        if let Some(days) = self.days {
            builder = builder.lookback_days(days);
        }
        if let Some(k) = self.neighbors {
            builder = builder.neighbors(k);
        }
        builder.build()
    }
}

fn history_path(flag: Option<PathBuf>, config: &AnalysisConfig) -> PathBuf {
    flag.or_else(|| config.history_path.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_HISTORY_FILE))
}

/// Public message, status and whether the caller is at fault
fn classify(err: &anyhow::Error) -> (String, u16, bool) {
    match err.downcast_ref::<StockError>() {
        Some(e) => (e.public_message(), e.status_code(), e.is_user_facing()),
        None => ("An error occurred: internal failure".to_string(), 500, false),
    }
}

fn report_error(err: &anyhow::Error) -> ExitCode {
    tracing::error!("Request failed: {:#}", err);
    let (message, status, user_facing) = classify(err);
    let body = serde_json::json!({
        "error": message,
        "status": status,
    });
    eprintln!("{body}");

    if user_facing {
        ExitCode::from(2)
    } else {
        ExitCode::FAILURE
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Arc::new(cli.config().context("Invalid configuration")?);

    match cli.command {
        Commands::Analyze {
            ticker1,
            ticker2,
            user,
            history,
            compact,
        } => {
            let store = JsonlHistoryStore::new(history_path(history, &config));
            let engine = PairAnalysisEngine::yahoo(Arc::clone(&config));
            let service = AnalysisService::new(engine, Arc::new(store));

            let result = service
                .analyze(user.as_deref(), &ticker1, &ticker2)
                .await
                .with_context(|| format!("Analysis of {ticker1} vs {ticker2} failed"))?;
            info!("{}", result.summary());

            let json = if compact {
                serde_json::to_string(&result)?
            } else {
                serde_json::to_string_pretty(&result)?
            };
            println!("{json}");
        }
        Commands::History {
            user,
            history,
            limit,
        } => {
            let store = JsonlHistoryStore::new(history_path(history, &config));
            let records = store
                .recent(user.as_deref(), limit.unwrap_or(DEFAULT_HISTORY_LIMIT))
                .await
                .with_context(|| format!("Cannot read history from {}", store.path().display()))?;

            for record in records {
                println!("{record}");
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.json_logs {
        pair_utils::init_tracing_json();
    } else {
        pair_utils::init_tracing();
    }

    info!("Starting stock-pair");

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report_error(&e),
    }
}
