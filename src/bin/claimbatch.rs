use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use claimbatch::{
    earnings, init_tracing, log_request_metrics, BatchConfig, BatchOrchestrator,
    CredentialProvider, Dispatcher, InMemorySessionStore, PortalClient, SessionTokenLocator,
    StaticToken, StdoutOpener,
};

#[derive(Parser, Debug)]
#[command(name = "claimbatch")]
#[command(about = "Batch actions over claimed jobs: open grouped editors, select finished jobs, estimate earnings")]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct ConnectionArgs {
    /// Portal origin, e.g. https://portal.example.com
    #[arg(long, env = "CLAIMBATCH_PORTAL_URL")]
    portal_url: String,

    /// JSON dump of the portal page's session storage
    #[arg(long, env = "CLAIMBATCH_SESSION_FILE")]
    session_file: Option<PathBuf>,

    /// Bearer secret to use instead of scanning a session dump
    #[arg(long, env = "CLAIMBATCH_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Only accept session tokens whose audience contains this text
    #[arg(long, env = "CLAIMBATCH_TARGET_HINT")]
    target_hint: Option<String>,

    /// Host of the editor that job URLs point at
    #[arg(long, env = "CLAIMBATCH_DISPATCH_HOST")]
    dispatch_host: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, env = "CLAIMBATCH_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Delay between dispatched URLs in milliseconds
    #[arg(long, env = "CLAIMBATCH_DISPATCH_DELAY_MS")]
    dispatch_delay_ms: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Renew and print one editor URL per comment group of unfinished jobs
    OpenAll,
    /// Print the asset ids of jobs at exactly 100% progress
    SelectCompleted,
    /// Estimate this month's earnings from claimed and metered words
    Earnings,
}

impl ConnectionArgs {
    fn to_config(&self) -> Result<BatchConfig> {
        let mut builder = BatchConfig::builder().portal_url(self.portal_url.clone());
        if let Some(host) = &self.dispatch_host {
            builder = builder.dispatch_host(host.clone());
        }
        if let Some(hint) = &self.target_hint {
            builder = builder.target_hint(hint.clone());
        }
        if let Some(secs) = self.timeout_secs {
            builder = builder.request_timeout(Duration::from_secs(secs));
        }
        if let Some(millis) = self.dispatch_delay_ms {
            builder = builder.dispatch_delay(Duration::from_millis(millis));
        }
        builder.build()
    }

    fn credentials(&self, config: &BatchConfig) -> Result<Arc<dyn CredentialProvider>> {
        if let Some(token) = &self.token {
            return Ok(Arc::new(StaticToken::new(token.clone())));
        }

        let Some(path) = &self.session_file else {
            bail!("either --token or --session-file must be provided");
        };
        let store = InMemorySessionStore::from_json_file(path)?;
        let mut locator = SessionTokenLocator::new(store);
        if let Some(hint) = config.target_hint() {
            locator = locator.with_target_hint(hint);
        }
        Ok(Arc::new(locator))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = cli.connection.to_config()?;
    let credentials = cli.connection.credentials(&config)?;
    let client = Arc::new(PortalClient::from_config(&config, credentials)?);

    let outcome = match cli.command {
        Command::OpenAll => open_all(&config, client.clone()).await,
        Command::SelectCompleted => select_completed(&config, client.clone()).await,
        Command::Earnings => estimate_earnings(&client).await,
    };

    log_request_metrics(&client.metrics());
    outcome
}

async fn open_all(config: &BatchConfig, client: Arc<PortalClient>) -> Result<()> {
    let orchestrator = BatchOrchestrator::from_config(client, config);
    let run = orchestrator.run().await;
    if let Some(err) = run.aborted {
        bail!("batch run aborted: {err}");
    }

    let dispatcher = Dispatcher::new(config.dispatch_delay());
    dispatcher.dispatch(&run.urls, &StdoutOpener).await;
    Ok(())
}

async fn select_completed(config: &BatchConfig, client: Arc<PortalClient>) -> Result<()> {
    let orchestrator = BatchOrchestrator::from_config(client, config);
    for asset_id in orchestrator.select_completed().await {
        println!("{asset_id}");
    }
    Ok(())
}

async fn estimate_earnings(client: &PortalClient) -> Result<()> {
    let jobs = client
        .claimed_jobs()
        .await
        .context("claimed jobs are required for the earnings estimate")?;
    let today = Local::now().date_naive();
    let estimate = earnings::estimate(client, &jobs, today).await?;

    for tier in &estimate.tiers {
        println!(
            "{:<10} {:>12.1} words x {:.3} = {:>10.2}",
            tier.label, tier.billable_words, tier.multiplier, tier.amount
        );
    }
    println!(
        "{} .. {}: {:.2}",
        estimate.from.format("%Y-%m-%d"),
        estimate.to.format("%Y-%m-%d"),
        estimate.total
    );
    Ok(())
}
