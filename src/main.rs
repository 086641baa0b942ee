use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use gantry::config::Config;
use gantry::jobs::{JobManager, JobStatus};
use gantry::oracle::OpenAiOracle;
use gantry::pipeline::Pipeline;
use gantry::server;

#[derive(Parser)]
#[command(name = "gantry")]
#[command(
    version,
    about = "Deployment pipeline orchestrator: a repository URL and a sentence in, a running cloud deployment out"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Override the configured bind address
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Run one deployment locally and wait for it
    Deploy {
        /// Git repository URL (http or https)
        repo_url: String,
        /// What to deploy, in plain words
        description: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env().context("Failed to load configuration")?;

    match cli.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.bind_addr = bind;
            }
            server::start_server(config).await
        }
        Commands::Deploy { repo_url, description } => {
            deploy_once(config, repo_url, description).await
        }
    }
}

/// Submit a single job through the same machinery the server uses, poll it
/// to a terminal state, and report the outcome.
async fn deploy_once(config: Config, repo_url: String, description: String) -> Result<()> {
    if !repo_url.starts_with("http://") && !repo_url.starts_with("https://") {
        anyhow::bail!("repo_url must be an http(s) git URL");
    }
    std::fs::create_dir_all(&config.data_dir).with_context(|| {
        format!("Failed to create data directory {}", config.data_dir.display())
    })?;

    let config = Arc::new(config);
    let oracle = Arc::new(OpenAiOracle::new(&config)?);
    let manager = JobManager::new(1);
    let pipeline = Pipeline::new(Arc::clone(&config), oracle);

    let job = manager.create(&config.data_dir).await;
    println!("Job {} queued (workdir {})", job.id, job.workdir.display());

    let log = manager.logger(&job.id);
    let id = job.id.clone();
    let workdir = job.workdir.clone();
    manager.spawn(job.id.clone(), async move {
        pipeline.run(&id, &repo_url, &description, &workdir, &log).await
    });

    loop {
        let current = manager.get(&job.id).await.context("job disappeared from registry")?;
        if current.status.is_terminal() {
            return match current.status {
                JobStatus::Completed => {
                    if let Some(summary) = current.result {
                        println!(
                            "Deployment finished: mode={} port={}",
                            summary.mode, summary.port
                        );
                        for note in summary.artifacts {
                            println!("  {}: {}", note.kind, note.origin);
                        }
                    }
                    Ok(())
                }
                _ => {
                    let cause = current
                        .error
                        .map(|e| format!("{} (stage: {})", e.message, e.stage))
                        .unwrap_or_else(|| "unknown failure".to_string());
                    anyhow::bail!("Deployment failed: {cause}")
                }
            };
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
}
