//! Artifact kinds and the per-kind synthesis table.

use serde::{Deserialize, Serialize};

use super::{infra, policy, prompts, templates};

/// The artifact kinds the pipeline synthesizes. A closed set: each kind
/// carries its own oracle instruction, acceptance policy and fallback
/// template, looked up through the methods below rather than branched on
/// elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    BuildFile,
    ComposeFile,
    SetupScript,
    InfraFile,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::BuildFile => "build-file",
            ArtifactKind::ComposeFile => "compose-file",
            ArtifactKind::SetupScript => "setup-script",
            ArtifactKind::InfraFile => "infra-file",
        }
    }

    /// File name the artifact is persisted under.
    pub fn file_name(&self) -> &'static str {
        match self {
            ArtifactKind::BuildFile => "Dockerfile",
            ArtifactKind::ComposeFile => "docker-compose.yml",
            ArtifactKind::SetupScript => "setup.sh",
            ArtifactKind::InfraFile => "main.tf",
        }
    }

    /// System instruction sent to the oracle for this kind.
    pub(crate) fn instruction(&self, ctx: &SynthesisContext) -> String {
        match self {
            ArtifactKind::BuildFile => prompts::build_file_instruction(),
            ArtifactKind::ComposeFile => prompts::compose_file_instruction(ctx),
            ArtifactKind::SetupScript => prompts::setup_script_instruction(),
            ArtifactKind::InfraFile => prompts::infra_file_instruction(ctx),
        }
    }

    /// Kind-specific cleanup applied before the acceptance check.
    pub(crate) fn normalize(&self, text: String) -> String {
        match self {
            ArtifactKind::SetupScript => policy::normalize_setup_script(text),
            _ => text,
        }
    }

    /// Acceptance policy: `Ok` or the reason the candidate is unusable.
    pub(crate) fn accepts(&self, text: &str, ctx: &SynthesisContext) -> Result<(), String> {
        match self {
            ArtifactKind::BuildFile => policy::accept_build_file(text, ctx),
            ArtifactKind::ComposeFile => policy::accept_compose_file(text),
            ArtifactKind::SetupScript => policy::accept_setup_script(text),
            ArtifactKind::InfraFile => infra::accept(text, ctx),
        }
    }

    /// Deterministic fallback body, for kinds that have one.
    pub(crate) fn fallback(&self, ctx: &SynthesisContext) -> Option<String> {
        match self {
            ArtifactKind::BuildFile => Some(templates::dockerfile(ctx.port)),
            ArtifactKind::ComposeFile => Some(templates::compose(ctx.port, ctx.nested_build)),
            ArtifactKind::SetupScript => Some(templates::setup_script()),
            ArtifactKind::InfraFile => {
                Some(templates::terraform(&ctx.instance_type, &ctx.job_tag))
            }
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which branch produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Generated,
    Fallback,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::Generated => "generated",
            Origin::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A synthesized artifact that passed its kind's acceptance policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactCandidate {
    pub kind: ArtifactKind,
    pub text: String,
    pub origin: Origin,
}

/// Inputs shared by every synthesis request for one job.
#[derive(Debug, Clone)]
pub struct SynthesisContext {
    pub description: String,
    pub repo_url: String,
    /// Bounded-depth tree listing; only a prefix goes to the oracle.
    pub tree: Vec<String>,
    pub port: u16,
    pub archive_name: String,
    /// Short job id used to tag cloud resources.
    pub job_tag: String,
    pub instance_type: String,
    /// True when the repository ships its own containerization. Wrapper
    /// artifacts then live one level above the clone, and the compose file
    /// builds `./repo` instead of `.`.
    pub nested_build: bool,
    /// True when the repo source binds only the loopback interface.
    pub loopback_only: bool,
}
