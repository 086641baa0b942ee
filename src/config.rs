//! Environment-driven configuration.
//!
//! Everything gantry needs at runtime comes from environment variables (a
//! `.env` file is honored when present). Defaults match the containerized
//! deployment this service normally ships in.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

/// Model used for artifact generation when `OPENAI_MODEL` is unset.
pub const DEFAULT_ORACLE_MODEL: &str = "gpt-5-mini-2025-08-07";

/// Runtime configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Credential for the generation oracle. `None` disables generation
    /// entirely; every artifact then renders from its static template.
    pub oracle_api_key: Option<String>,
    pub oracle_model: String,
    pub oracle_base_url: String,
    /// When true, provisioning stops after `terraform plan`.
    pub dry_run: bool,
    /// Upper bound on pipelines executing concurrently.
    pub max_concurrent_jobs: usize,
    /// Instance sizing class stamped into prompts, policy checks and the
    /// fallback template.
    pub instance_type: String,
    /// Root under which each job gets `<data_dir>/<job_id>/`.
    pub data_dir: PathBuf,
    pub bind_addr: SocketAddr,
    /// Collaborator binaries, overridable for test environments.
    pub git_cmd: String,
    pub terraform_cmd: String,
}

impl Config {
    /// Resolve configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        let max_concurrent_jobs = match env::var("MAX_CONCURRENT_JOBS") {
            Ok(raw) => raw
                .parse::<usize>()
                .with_context(|| format!("MAX_CONCURRENT_JOBS is not a number: {raw}"))?,
            Err(_) => 2,
        };
        if max_concurrent_jobs == 0 {
            bail!("MAX_CONCURRENT_JOBS must be at least 1");
        }

        let bind_addr: SocketAddr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8000".to_string())
            .parse()
            .context("BIND_ADDR is not a valid socket address")?;

        Ok(Self {
            oracle_api_key: env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()),
            oracle_model: env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| DEFAULT_ORACLE_MODEL.to_string()),
            oracle_base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            dry_run: env::var("DRY_TERRAFORM_DEPLOYS")
                .map(|v| v == "true")
                .unwrap_or(true),
            max_concurrent_jobs,
            instance_type: env::var("AWS_INSTANCE_TYPE")
                .unwrap_or_else(|_| "t2.small".to_string()),
            data_dir: env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/data/autodeploy")),
            bind_addr,
            git_cmd: env::var("GIT_CMD").unwrap_or_else(|_| "git".to_string()),
            terraform_cmd: env::var("TERRAFORM_CMD").unwrap_or_else(|_| "terraform".to_string()),
        })
    }
}
