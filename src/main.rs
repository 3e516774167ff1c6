mod analysis;
mod checks;
mod config;
mod pr;
mod report;
mod util;

use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, info, info_span};
use tracing_subscriber::EnvFilter;

use config::ReviewMode;

/// PR Readiness: evaluates fetched GitHub Pull Requests for merge readiness,
/// detects overlapping and superseded PRs, and plans a merge order.
#[derive(Parser, Debug)]
#[command(name = "pr-readiness", version, about)]
struct Cli {
    /// Directory holding index.json and prs/{number}.json
    #[arg(long, default_value = "artifacts/pr-review")]
    input_dir: PathBuf,

    /// JSON report path (default: <input-dir>/analysis.json)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Optional output file path for a markdown report
    #[arg(long)]
    markdown: Option<PathBuf>,

    /// Config file (default: .pr-readiness.toml if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// How PR comments are treated by the review check
    #[arg(long, value_enum)]
    review_mode: Option<ReviewMode>,

    /// Skip merge-order planning
    #[arg(long)]
    no_merge_order: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let _main_span = info_span!("pr_readiness", input_dir = %cli.input_dir.display()).entered();

    info!("loading configuration");
    let mut config = config::Config::load(cli.config.as_deref())?;
    if let Some(mode) = cli.review_mode {
        config.review.mode = mode;
    }
    if cli.no_merge_order {
        config.merge_order.enabled = false;
    }
    debug!(review_mode = ?config.review.mode, merge_order = config.merge_order.enabled, "configuration resolved");
    let checker = checks::Checker::from_config(&config)?;

    info!("loading pull requests");
    let prs = pr::load_pull_requests(&cli.input_dir).await?;
    info!(prs = prs.len(), "loaded pull requests");

    info!("evaluating merge readiness");
    let built_report = report::build(&prs, &checker, &config, Utc::now());

    let json_path = cli
        .output
        .unwrap_or_else(|| cli.input_dir.join("analysis.json"));
    report::output(&built_report, &json_path, cli.markdown.as_deref())?;
    info!(path = %json_path.display(), "done");

    Ok(())
}
