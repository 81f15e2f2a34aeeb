//! Sealed Markets devnet runner.
//!
//! Starts an in-process ledger, walks one market from creation to payout
//! through wallet sessions, and prints the result.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use market_client::config::ClientConfig;
use market_client::units::parse_ether;
use market_ledger::adapters::EventFilter;
use market_ledger::domain::entities::PayoutPolicy;
use market_ledger::domain::value_objects::ether;
use market_ledger::service::{create_devnet_service, ServiceConfig, DEVNET_GENESIS_TIME};
use market_runtime::{spawn_observer, Walkthrough, WalkthroughPlan};
use market_telemetry::{encode_metrics, init_telemetry, TelemetryConfig};
use tracing::info;

/// Sealed Markets devnet runner
#[derive(Parser, Debug)]
#[command(name = "market-runtime")]
#[command(about = "Run a confidential prediction market end to end on an in-process devnet")]
struct Args {
    /// Market question
    #[arg(short, long)]
    question: Option<String>,

    /// Market duration in seconds
    #[arg(short, long, default_value = "86400")]
    duration: u64,

    /// Resolve the market as NO instead of YES
    #[arg(long)]
    resolve_no: bool,

    /// Pay every claimant as a winner with this fixed stake (in ether)
    /// instead of unsealing their bets
    #[arg(long, value_name = "ETHER")]
    fixed_stake: Option<String>,

    /// Funding per dev account, in ether
    #[arg(long, default_value = "100")]
    funding: u64,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Print Prometheus metrics after the run
    #[arg(long)]
    metrics: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _telemetry = init_telemetry(TelemetryConfig::for_component("runtime"))
        .context("Failed to initialize telemetry")?;

    let mut service_config = ServiceConfig::default();
    if let Some(stake) = &args.fixed_stake {
        let stake = parse_ether(stake).context("Invalid --fixed-stake")?;
        service_config.ledger.payout_policy = PayoutPolicy::FixedStake(stake);
    }
    let client_config = ClientConfig::from_env().context("Invalid client configuration")?;

    let mut plan = WalkthroughPlan {
        duration: args.duration,
        outcome: !args.resolve_no,
        ..WalkthroughPlan::default()
    };
    if let Some(question) = args.question {
        plan.question = question;
    }

    let allocations = plan
        .accounts()
        .into_iter()
        .map(|account| (account, ether(args.funding)));
    let ledger = Arc::new(create_devnet_service(
        service_config,
        allocations,
        DEVNET_GENESIS_TIME,
    ));

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let observer = spawn_observer(ledger.events().subscribe(EventFilter::all()), shutdown_rx);

    info!(
        chain_id = client_config.network.chain_id,
        contract = %ledger.config().ledger.contract_address,
        "Devnet ledger ready"
    );

    let report = Walkthrough::new(Arc::clone(&ledger), client_config)
        .run(&plan)
        .await
        .context("Walkthrough failed")?;

    shutdown_tx
        .send(true)
        .context("Observer stopped before shutdown")?;
    let summary = observer.await.context("Observer task failed")?;

    if args.json {
        let output = serde_json::json!({ "report": report, "observed": summary });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("Market #{}: {}", report.market.id, report.market.question);
        println!(
            "  outcome: {}",
            if report.market.outcome == Some(true) { "YES" } else { "NO" }
        );
        for bettor in &report.bettors {
            let result = match (&bettor.payout, &bettor.claim_error) {
                (Some(payout), _) => format!("paid {payout}"),
                (None, Some(error)) => error.clone(),
                (None, None) => "no claim".to_string(),
            };
            println!(
                "  {:<8} {} {:>6}  {:<40} balance {}",
                bettor.label,
                if bettor.prediction { "YES" } else { "NO " },
                bettor.stake,
                result,
                bettor.balance
            );
        }
        println!("  escrow left: {}", report.escrow_balance);
        println!("  events observed: {}", summary.events);
    }

    if args.metrics {
        print!("{}", encode_metrics()?);
    }

    Ok(())
}
