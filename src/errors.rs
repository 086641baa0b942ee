//! Error taxonomy for the deployment pipeline.
//!
//! Fatal failures terminate a job and are recorded verbatim as its error
//! cause. A rejected generated artifact is deliberately *not* an error:
//! the synthesizer degrades to its static fallback, and synthesis only
//! fails when no usable candidate exists on either branch.

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

use crate::synth::ArtifactKind;

/// Fatal pipeline failures. Any of these transitions the owning job to
/// `failed`; none are retried automatically.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The gate refused the repository before any artifact work.
    #[error("Denied: repository does not appear to expose an HTTP-accessible server.")]
    Denied,

    #[error("failed to clone {url}")]
    Clone {
        url: String,
        #[source]
        source: ExecError,
    },

    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error("io error at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl PipelineError {
    /// Stable stage label used in the structured job error record.
    pub fn label(&self) -> &'static str {
        match self {
            PipelineError::Denied => "denied",
            PipelineError::Clone { .. } => "clone",
            PipelineError::Synthesis(_) => "synthesis",
            PipelineError::Archive(_) => "archive",
            PipelineError::Exec(_) => "execution",
            PipelineError::Io { .. } => "io",
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failure from a collaborator subprocess (git, terraform).
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to spawn {program}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Command failed: {command} ({status})")]
    NonZero { command: String, status: ExitStatus },

    #[error("failed to read output of {program}")]
    Output {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// Failure while packaging the working tree.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("io error while archiving")]
    Io(#[from] io::Error),

    #[error("failed to walk tree")]
    Walk(#[from] walkdir::Error),
}

/// Synthesis is fallback-backed and only fails when neither branch can
/// produce a usable candidate.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("no fallback template for {kind}, and generation was unavailable: {reason}")]
    FallbackUnavailable { kind: ArtifactKind, reason: String },

    #[error("fallback for {kind} violates its own acceptance policy: {reason}")]
    FallbackRejected { kind: ArtifactKind, reason: String },
}
