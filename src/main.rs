use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, Context};
use clap::{ArgGroup, Parser};
use client::{Execute, GraphqlClient, ReplayExecutor};
use dashboard::{DashboardConfig, DashboardError};
use geometry::UnauditedPolicy;
use panels::SvgSink;
use reqwest::Client;
use session::Credentials;
use spinners::{Spinner, Spinners};
use stats::GradePolicy;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, level_filters::LevelFilter, warn};
use tracing_subscriber::EnvFilter;

mod adapters;
mod aggregate;
mod client;
mod dashboard;
mod error;
mod format;
mod geometry;
mod normalize;
mod panels;
mod queries;
mod session;
mod stats;
mod transaction;
mod xp;


#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(group(
    ArgGroup::new("reader")
    .required(false)
    .args(&["read"])
    .conflicts_with("ndjson"),
))]
struct Cli {
    /// the GraphQL endpoint of the learning platform
    #[arg(env = "SKILLBOARD_ENDPOINT", default_value_t = default_endpoint())]
    endpoint: String,

    /// where to sign in with --identifier and --password
    #[arg(long, env = "SKILLBOARD_SIGNIN_URL", default_value_t = default_signin_url())]
    signin_url: String,

    /// A bearer token. Skips sign-in, and wins over --identifier/--password when both are set.
    #[arg(long, env = "SKILLBOARD_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// username or email to sign in with
    #[arg(long, env = "SKILLBOARD_IDENTIFIER", requires = "password")]
    identifier: Option<String>,

    #[arg(long, env = "SKILLBOARD_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// directory the SVG charts are written to
    #[arg(long, short, default_value = ".")]
    out: PathBuf,

    /// How result records that are neither clearly project nor non-project are counted
    #[arg(long, value_enum, default_value_t = GradePolicy::Exclude)]
    grade_policy: GradePolicy,

    /// What the audit gauge shows when there is no usable ratio
    #[arg(long, value_enum, default_value_t = UnauditedPolicy::Sliver)]
    unaudited: UnauditedPolicy,

    /// Debug logging
    #[arg(long, short)]
    verbose: bool,

    /// dump all API responses to an ndjson file
    #[arg(long)]
    ndjson: Option<String>,

    ///Read API responses from a file written with --ndjson, instead of from the endpoint.
    #[arg(long)]
    read: Option<String>

}

fn default_endpoint() -> String {
    "https://learn.reboot01.com/api/graphql-engine/v1/graphql".to_string()
}

fn default_signin_url() -> String {
    "https://learn.reboot01.com/api/auth/signin".to_string()
}

impl Cli {
    fn credentials(&self) -> anyhow::Result<Credentials> {
        match (&self.token, &self.identifier, &self.password) {
            (Some(token), _, _) => Ok(Credentials::Token(token.trim().to_string())),
            (None, Some(identifier), Some(password)) => Ok(Credentials::Basic { identifier: identifier.clone(), password: password.clone() }),
            _ => Err(anyhow!("no credentials: pass --token, or --identifier and --password")),
        }
    }
}

/// Build the query executor: either a replay of an ndjson log, or the live endpoint.
async fn executor(args: &Cli) -> anyhow::Result<Arc<dyn Execute>> {
    if let Some(path) = &args.read {
        let replay = ReplayExecutor::open(path)?;
        info!("replaying {} recorded operations from {}", replay.operations().len(), path);
        debug!("operations: {:?}", replay.operations());
        return Ok(Arc::new(replay));
    }

    info!("using endpoint {}", args.endpoint);
    let client = Client::builder()
        .user_agent(concat!("skillboard/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("error building HTTP client")?;

    let token = args.credentials()?.bearer(&client, &args.signin_url).await.context("error signing in")?;
    let mut live = GraphqlClient::new(client, args.endpoint.clone(), token);
    if let Some(fname) = &args.ndjson {
        live = live.with_ndjson(fname)?;
    }
    Ok(Arc::new(live))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let mut level = LevelFilter::INFO;
    if args.verbose {
        level = LevelFilter::DEBUG;
    }

    tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::builder().with_default_directive(level.into()).from_env_lossy())
    .init();

    let executor = executor(&args).await?;
    let sink = Arc::new(SvgSink::new(&args.out)?);
    let config = DashboardConfig { grade_policy: args.grade_policy, unaudited: args.unaudited };

    let token = CancellationToken::new();
    let cloned_token = token.clone();
    tokio::spawn(async move {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to listen for ctrl-c: {}", e);
            return;
        }
        token.cancel();
    });

    let mut sp = Spinner::new(Spinners::Dots9, "Fetching dashboard...".into());
    match dashboard::run(executor, sink, config, cloned_token).await {
        Ok(report) => {
            sp.stop_with_message(format!("wrote {} charts to {}", report.written.len(), args.out.display()));
            match report.stats {
                Some(stats) => print!("{}", stats),
                None => warn!("profile stats unavailable, no summary"),
            }
        }
        Err(DashboardError::Cancelled) => {
            sp.stop_with_message("shutting down!".to_string());
        }
        Err(e) => {
            sp.stop_with_message("stopped".to_string());
            return Err(e).context("sign in again");
        }
    }

    Ok(())
}
