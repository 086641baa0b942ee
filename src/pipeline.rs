//! The deployment pipeline: the fixed stage sequence every job runs.
//!
//! Stages always execute in the same order. Clone, gate, analysis and
//! synthesis feed artifact persistence, then the archive, then the
//! provisioning plan, then terraform. The first stage error fails the job;
//! synthesis itself only fails when a kind ends up without a fallback.

use std::path::Path;
use std::sync::Arc;

use crate::archive::{self, ARCHIVE_NAME};
use crate::config::Config;
use crate::errors::PipelineError;
use crate::exec::run_logged;
use crate::jobs::{ArtifactNote, DeploySummary, JobLog};
use crate::oracle::GenerationOracle;
use crate::repo::{self, PortOrigin, RepoSnapshot};
use crate::synth::{
    ArtifactCandidate, ArtifactKind, SynthesisContext, Synthesizer, infra, makefile,
};

/// Prefix of the job id used to tag cloud resources.
fn short_id(job_id: &str) -> String {
    let head = match job_id.split('-').next() {
        Some(head) if !head.is_empty() => head,
        _ => job_id,
    };
    head.chars().take(8).collect()
}

#[derive(Clone)]
pub struct Pipeline {
    config: Arc<Config>,
    oracle: Arc<dyn GenerationOracle>,
}

impl Pipeline {
    pub fn new(config: Arc<Config>, oracle: Arc<dyn GenerationOracle>) -> Self {
        Self { config, oracle }
    }

    /// Run the whole pipeline for one job, clone included.
    pub async fn run(
        &self,
        job_id: &str,
        repo_url: &str,
        description: &str,
        workdir: &Path,
        log: &JobLog,
    ) -> Result<DeploySummary, PipelineError> {
        let repo_dir = workdir.join("repo");
        tokio::fs::create_dir_all(&repo_dir)
            .await
            .map_err(|source| PipelineError::io(&repo_dir, source))?;

        log.info(format!("Cloning repository: {repo_url}")).await;
        repo::clone_repo(&self.config.git_cmd, repo_url, &repo_dir, log)
            .await
            .map_err(|source| PipelineError::Clone { url: repo_url.to_string(), source })?;

        self.run_prepared(job_id, repo_url, description, workdir, log).await
    }

    /// Every stage after the clone. Split out so tests can run the pipeline
    /// against a repository already placed under `workdir/repo`.
    pub async fn run_prepared(
        &self,
        job_id: &str,
        repo_url: &str,
        description: &str,
        workdir: &Path,
        log: &JobLog,
    ) -> Result<DeploySummary, PipelineError> {
        let repo_dir = workdir.join("repo");
        let snapshot = RepoSnapshot::capture(&repo_dir)
            .map_err(|source| PipelineError::io(&repo_dir, source))?;
        log.info(format!("Repository tree (max depth 4):\n{}", snapshot.entries().join("\n")))
            .await;

        if !repo::is_http_service(&snapshot) {
            return Err(PipelineError::Denied);
        }

        let (port, origin) = repo::infer_port(&snapshot);
        match origin {
            PortOrigin::Literal { file } => {
                log.info(format!("Inferred app port {port} from {file}")).await;
            }
            PortOrigin::Framework { name } => {
                log.info(format!("Fallback inferred by framework {name}: port {port}")).await;
            }
            PortOrigin::Default => {
                log.info(format!("Could not infer port; defaulting to {port}")).await;
            }
        }

        let pre_containerized = repo::has_containerization(&snapshot);
        let loopback_only = repo::binds_loopback_only(&snapshot);
        if pre_containerized {
            log.info("Repository ships its own container setup; wrapping it instead of rewriting")
                .await;
        }
        if loopback_only {
            log.info("Source binds loopback only; artifacts must rebind to 0.0.0.0").await;
        }

        let ctx = SynthesisContext {
            description: description.to_string(),
            repo_url: repo_url.to_string(),
            tree: snapshot.entries().to_vec(),
            port,
            archive_name: ARCHIVE_NAME.to_string(),
            job_tag: short_id(job_id),
            instance_type: self.config.instance_type.clone(),
            nested_build: pre_containerized,
            loopback_only,
        };
        let synthesizer = Synthesizer::new(self.oracle.as_ref());

        let mut container_artifacts = vec![
            synthesizer.synthesize(ArtifactKind::BuildFile, &ctx, log).await?,
            synthesizer.synthesize(ArtifactKind::ComposeFile, &ctx, log).await?,
        ];
        if pre_containerized {
            container_artifacts
                .push(synthesizer.synthesize(ArtifactKind::SetupScript, &ctx, log).await?);
        }

        // Wrapper artifacts go next to the clone when the repo is already
        // containerized, and inside it otherwise.
        let asset_dir = if pre_containerized { workdir } else { repo_dir.as_path() };
        let mut notes: Vec<ArtifactNote> = Vec::new();
        let mut written = Vec::new();
        for artifact in &container_artifacts {
            let path = asset_dir.join(artifact.kind.file_name());
            write_file(&path, &artifact.text).await?;
            notes.push(note(artifact));
            written.push(artifact.kind.file_name());
        }
        write_file(&asset_dir.join("Makefile"), makefile()).await?;
        written.push("Makefile");
        log.info(format!("Deploy assets written: {}", written.join(", "))).await;

        let tar_path = workdir.join(ARCHIVE_NAME);
        let pack_src = if pre_containerized { workdir } else { repo_dir.as_path() };
        archive::pack(pack_src, &tar_path)?;
        log.info(format!("Prepared project archive: {}", tar_path.display())).await;

        let mut infra_artifact = synthesizer.synthesize(ArtifactKind::InfraFile, &ctx, log).await?;
        infra_artifact.text = infra::normalize_paths(&infra_artifact.text);
        notes.push(note(&infra_artifact));

        let terraform_dir = workdir.join("terraform");
        tokio::fs::create_dir_all(&terraform_dir)
            .await
            .map_err(|source| PipelineError::io(&terraform_dir, source))?;
        write_file(&terraform_dir.join(ArtifactKind::InfraFile.file_name()), &infra_artifact.text)
            .await?;
        // The provisioning plan uploads the archive by relative name, so it
        // has to sit next to main.tf.
        let tar_copy = terraform_dir.join(ARCHIVE_NAME);
        tokio::fs::copy(&tar_path, &tar_copy)
            .await
            .map_err(|source| PipelineError::io(&tar_copy, source))?;

        log.info(format!("Executing Terraform in {}", terraform_dir.display())).await;
        let terraform = self.config.terraform_cmd.as_str();
        run_logged(terraform, &["init"], Some(&terraform_dir), log).await?;
        let mode = if self.config.dry_run {
            run_logged(terraform, &["plan", "-out=tfplan"], Some(&terraform_dir), log).await?;
            log.info("Dry run enabled; plan written to tfplan without applying").await;
            "plan"
        } else {
            run_logged(terraform, &["apply", "-auto-approve"], Some(&terraform_dir), log).await?;
            log.info("Deployment requested. Monitor AWS resources and app at port 8080.").await;
            "apply"
        };

        Ok(DeploySummary { port, mode: mode.to_string(), artifacts: notes })
    }
}

fn note(artifact: &ArtifactCandidate) -> ArtifactNote {
    ArtifactNote { kind: artifact.kind, origin: artifact.origin }
}

async fn write_file(path: &Path, text: &str) -> Result<(), PipelineError> {
    tokio::fs::write(path, text).await.map_err(|source| PipelineError::io(path, source))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_id_takes_first_uuid_segment() {
        assert_eq!(short_id("1f0a2b3c-4d5e-6f70-8192-a3b4c5d6e7f8"), "1f0a2b3c");
        assert_eq!(short_id("short-id"), "short");
        assert_eq!(short_id("nodashes1234"), "nodashes");
        assert_eq!(short_id("-leading"), "-leading");
        assert_eq!(short_id("abc"), "abc");
    }
}
