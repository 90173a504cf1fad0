//! `war-room` CLI.
//!
//! ```bash
//! # Stream a run as server-sent events
//! war-room analyze acme-corp.io --profile-file client.txt
//!
//! # Build the client profile from the client's own site first
//! war-room analyze acme-corp.io --profile-url https://our-company.com
//!
//! # Locate a rendered document
//! war-room artifact ALLYVEX_Acme_Corp_CUSTOMER_Dossier_20260309_140507.md
//! ```
//!
//! Events go to stdout, logs to stderr (`RUST_LOG` overrides the `info`
//! default). User errors exit with code 2 before any event is printed.

use std::path::PathBuf;
use std::pin::pin;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use deliberation::artifacts::ArtifactStore;
use deliberation::{sse_frame, Phase, Target, SSE_DONE};
use futures::StreamExt;
use tokio::io::{stdout, AsyncWriteExt};
use tracing::{error, info, warn};

use war_room::evidence::SharedEvidence;
use war_room::{
    BackendSet, MarkdownRenderer, ProfileGenerator, ResearchProfileGenerator, StageSet,
    StaticProfile, TavilyProvider, WarRoom, WarRoomConfig,
};

const EXIT_USER_ERROR: u8 = 2;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the four-stage war room against a target domain
    Analyze {
        /// Target company domain, e.g. acme-corp.io
        domain: String,

        #[command(flatten)]
        profile: ProfileSource,

        /// TOML config file (overrides WAR_ROOM_CONFIG)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the path of a rendered document by its file name
    Artifact {
        name: String,

        /// TOML config file (overrides WAR_ROOM_CONFIG)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

/// Where the selling company's profile comes from.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct ProfileSource {
    /// Profile text
    #[arg(long)]
    profile: Option<String>,

    /// File containing the profile text
    #[arg(long)]
    profile_file: Option<PathBuf>,

    /// Generate the profile from this company site
    #[arg(long)]
    profile_url: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let outcome = match cli.command {
        Command::Analyze {
            domain,
            profile,
            config,
        } => analyze(&domain, profile, config).await,
        Command::Artifact { name, config } => artifact(&name, config),
    };
    match outcome {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn user_error(message: impl std::fmt::Display) -> ExitCode {
    eprintln!("error: {message}");
    ExitCode::from(EXIT_USER_ERROR)
}

fn load_config(path: Option<PathBuf>) -> Result<WarRoomConfig> {
    let config = WarRoomConfig::load(path.as_deref())?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;
    Ok(config)
}

async fn analyze(domain: &str, source: ProfileSource, config: Option<PathBuf>) -> Result<ExitCode> {
    if let Err(e) = Target::parse(domain) {
        return Ok(user_error(e));
    }
    let config = load_config(config)?;
    let backends = BackendSet::from_config(&config)?;
    let evidence: SharedEvidence = Arc::new(TavilyProvider::from_config(
        &config.search,
        config.keys.tavily(),
    )?);
    if config.keys.tavily().is_none() {
        warn!("TAVILY_API_KEY is not set; stages will reason without search results");
    }

    let profile = match source {
        ProfileSource {
            profile: Some(text), ..
        } => StaticProfile(text).generate(domain).await,
        ProfileSource {
            profile_file: Some(path),
            ..
        } => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading profile {}", path.display()));
            match text {
                Ok(text) => StaticProfile(text).generate(domain).await,
                Err(e) => return Ok(user_error(format!("{e:#}"))),
            }
        }
        ProfileSource {
            profile_url: Some(url),
            ..
        } => {
            info!(url = %url, "generating client profile");
            ResearchProfileGenerator::from_config(&config, &backends, Arc::clone(&evidence))?
                .generate(&url)
                .await
        }
        ProfileSource { .. } => return Ok(user_error("a profile source is required")),
    };
    let profile = match profile {
        Ok(p) => p,
        Err(e) if e.is_user_error() => return Ok(user_error(e)),
        Err(e) => return Err(anyhow::Error::new(e).context("generating client profile")),
    };

    let stages = StageSet::from_config(&config, &backends, evidence)?;
    let renderer = MarkdownRenderer::new(&config.output.dir, config.output.product.trim())
        .with_timestamp(chrono::Local::now().naive_local());
    let war_room = WarRoom::new(stages, Arc::new(renderer))
        .with_metrics_path(config.output.metrics_path.clone());

    let run = match war_room.start(domain, &profile) {
        Ok(run) => run,
        Err(e) => return Ok(user_error(e)),
    };

    let cancel = run.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling run");
            cancel.cancel();
        }
    });

    let mut out = stdout();
    let mut events = pin!(run.into_stream());
    let mut terminal = None;
    while let Some(event) = events.next().await {
        let frame = sse_frame(&event).context("serializing event")?;
        out.write_all(frame.as_bytes()).await?;
        out.flush().await?;
        if event.is_terminal() {
            terminal = Some(event.phase());
        }
    }
    out.write_all(SSE_DONE.as_bytes()).await?;
    out.flush().await?;

    Ok(match terminal {
        Some(Phase::Complete) => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    })
}

fn artifact(name: &str, config: Option<PathBuf>) -> Result<ExitCode> {
    let config = load_config(config)?;
    let store = ArtifactStore::new(&config.output.dir);
    Ok(match store.resolve(name) {
        Ok(path) => {
            println!("{}", path.display());
            ExitCode::SUCCESS
        }
        Err(e) => user_error(e),
    })
}
