//! Artifact synthesis: one generate, validate, fallback pass per kind.
//!
//! Every artifact the pipeline needs moves through the same shape: ask the
//! oracle, extract the candidate from the response, run the kind's
//! acceptance policy, and degrade to the kind's deterministic fallback when
//! generation is rejected or unavailable. Synthesis only fails when a kind
//! has no fallback, so oracle outages degrade quality, not availability.

pub mod infra;
mod kind;
mod policy;
mod prompts;
mod templates;

pub use kind::{ArtifactCandidate, ArtifactKind, Origin, SynthesisContext};
pub use templates::makefile;

use std::sync::LazyLock;

use regex::Regex;

use crate::errors::SynthesisError;
use crate::jobs::JobLog;
use crate::oracle::{GenerationOracle, OracleOutcome};

/// First fenced code block in an oracle response, any language tag.
static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:[a-zA-Z0-9_-]+)?\n([\s\S]*?)\n```").unwrap());

/// Unwrap one fenced code block if the response arrived inside one;
/// otherwise return the text as is.
fn extract_code_block(text: &str) -> &str {
    match CODE_FENCE.captures(text) {
        Some(captures) => captures.get(1).map_or(text, |block| block.as_str()),
        None => text,
    }
}

/// What the selection pass decided about one oracle outcome.
#[derive(Debug, PartialEq, Eq)]
enum Selection {
    /// Candidate survived extraction, normalization and the policy check.
    Accepted(String),
    /// Candidate text violated the kind's acceptance policy.
    PolicyRejected(String),
    /// The oracle produced nothing usable for this request.
    NotGenerated(String),
}

/// Fold a raw oracle outcome into a selection decision. Pure: all the
/// branching the engine does on generated text happens here.
fn select(kind: ArtifactKind, ctx: &SynthesisContext, outcome: OracleOutcome) -> Selection {
    match outcome {
        OracleOutcome::Generated(raw) => {
            let mut text = extract_code_block(&raw).trim().to_string();
            text.push('\n');
            let text = kind.normalize(text);
            match kind.accepts(&text, ctx) {
                Ok(()) => Selection::Accepted(text),
                Err(reason) => Selection::PolicyRejected(reason),
            }
        }
        OracleOutcome::Rejected(reason) | OracleOutcome::Unavailable(reason) => {
            Selection::NotGenerated(reason)
        }
    }
}

/// Drives the synthesis pass for each artifact kind a job needs.
pub struct Synthesizer<'a> {
    oracle: &'a dyn GenerationOracle,
}

impl<'a> Synthesizer<'a> {
    pub fn new(oracle: &'a dyn GenerationOracle) -> Self {
        Self { oracle }
    }

    /// Produce the surviving candidate for `kind`. Fails only when the kind
    /// ends up without a usable fallback.
    pub async fn synthesize(
        &self,
        kind: ArtifactKind,
        ctx: &SynthesisContext,
        log: &JobLog,
    ) -> Result<ArtifactCandidate, SynthesisError> {
        let instruction = kind.instruction(ctx);
        let payload = prompts::request_payload(kind, ctx);

        log.info(format!("Generating {kind}")).await;
        let outcome = self.oracle.generate(&instruction, &payload).await;

        match select(kind, ctx, outcome) {
            Selection::Accepted(text) => {
                log.info(format!("Generated {kind} accepted")).await;
                Ok(ArtifactCandidate { kind, text, origin: Origin::Generated })
            }
            Selection::PolicyRejected(reason) => {
                log.warn(format!(
                    "Generated {kind} rejected by policy: {reason}; using fallback template"
                ))
                .await;
                fallback(kind, ctx, reason)
            }
            Selection::NotGenerated(reason) => {
                log.warn(format!("{kind} not generated: {reason}; using fallback template"))
                    .await;
                fallback(kind, ctx, reason)
            }
        }
    }
}

fn fallback(
    kind: ArtifactKind,
    ctx: &SynthesisContext,
    reason: String,
) -> Result<ArtifactCandidate, SynthesisError> {
    let Some(text) = kind.fallback(ctx) else {
        return Err(SynthesisError::FallbackUnavailable { kind, reason });
    };
    let text = kind.normalize(text);
    kind.accepts(&text, ctx)
        .map_err(|reason| SynthesisError::FallbackRejected { kind, reason })?;
    Ok(ArtifactCandidate { kind, text, origin: Origin::Fallback })
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::Value;

    use super::*;
    use crate::jobs::JobManager;

    struct ScriptedOracle {
        outcome: OracleOutcome,
    }

    #[async_trait]
    impl GenerationOracle for ScriptedOracle {
        async fn generate(&self, _instruction: &str, _context: &Value) -> OracleOutcome {
            self.outcome.clone()
        }
    }

    fn ctx() -> SynthesisContext {
        SynthesisContext {
            description: "a flask app".to_string(),
            repo_url: "https://example.com/demo.git".to_string(),
            tree: vec!["app.py".to_string(), "requirements.txt".to_string()],
            port: 5000,
            archive_name: "app.tar.gz".to_string(),
            job_tag: "1f0a2b3c".to_string(),
            instance_type: "t2.small".to_string(),
            nested_build: false,
            loopback_only: false,
        }
    }

    async fn log() -> JobLog {
        let manager = JobManager::new(1);
        let id = manager.create(std::path::Path::new("/tmp")).await.id;
        manager.logger(&id)
    }

    #[test]
    fn extracts_fenced_block_with_or_without_tag() {
        let tagged = "```hcl\nresource \"x\" \"y\" {}\n```";
        assert_eq!(extract_code_block(tagged), "resource \"x\" \"y\" {}");

        let bare = "```\nFROM x\n```";
        assert_eq!(extract_code_block(bare), "FROM x");

        let plain = "FROM x\n";
        assert_eq!(extract_code_block(plain), plain);
    }

    #[test]
    fn select_accepts_good_build_file() {
        let raw = "FROM python:3.12-slim\nEXPOSE 5000\nCMD [\"python\", \"app.py\"]".to_string();
        let selection = select(ArtifactKind::BuildFile, &ctx(), OracleOutcome::Generated(raw));
        match selection {
            Selection::Accepted(text) => assert!(text.ends_with('\n')),
            other => panic!("expected acceptance, got {other:?}"),
        }
    }

    #[test]
    fn select_rejects_policy_violations() {
        let raw = "EXPOSE 5000\nCMD [\"python\", \"app.py\"]".to_string();
        let selection = select(ArtifactKind::BuildFile, &ctx(), OracleOutcome::Generated(raw));
        assert!(matches!(selection, Selection::PolicyRejected(_)));
    }

    #[test]
    fn select_passes_through_oracle_failures() {
        let selection = select(
            ArtifactKind::ComposeFile,
            &ctx(),
            OracleOutcome::Unavailable("no key".to_string()),
        );
        assert_eq!(selection, Selection::NotGenerated("no key".to_string()));
    }

    #[tokio::test]
    async fn generated_candidate_keeps_generated_origin() {
        let oracle = ScriptedOracle {
            outcome: OracleOutcome::Generated(
                "FROM python:3.12-slim\nEXPOSE 5000\nCMD [\"python\", \"app.py\"]".to_string(),
            ),
        };
        let synth = Synthesizer::new(&oracle);
        let candidate = synth
            .synthesize(ArtifactKind::BuildFile, &ctx(), &log().await)
            .await
            .unwrap();
        assert_eq!(candidate.origin, Origin::Generated);
        assert!(candidate.text.starts_with("FROM python"));
    }

    #[tokio::test]
    async fn unavailable_oracle_degrades_to_fallback_for_every_kind() {
        let oracle = ScriptedOracle {
            outcome: OracleOutcome::Unavailable("transport error".to_string()),
        };
        let synth = Synthesizer::new(&oracle);
        let log = log().await;
        for kind in [
            ArtifactKind::BuildFile,
            ArtifactKind::ComposeFile,
            ArtifactKind::SetupScript,
            ArtifactKind::InfraFile,
        ] {
            let candidate = synth.synthesize(kind, &ctx(), &log).await.unwrap();
            assert_eq!(candidate.origin, Origin::Fallback, "{kind}");
            assert_eq!(kind.accepts(&candidate.text, &ctx()), Ok(()), "{kind}");
        }
    }

    #[tokio::test]
    async fn unsafe_infra_is_replaced_by_fallback() {
        let unsafe_plan = [
            "resource \"aws_key_pair\" \"kp\" {}",
            "resource \"tls_private_key\" \"ssh\" {}",
            "egress {}",
            "user_data = \"x\"",
            "instance_type = \"t2.small\"",
            "destination = \"/home/ubuntu/app.tar.gz\"",
            "\"cd /opt/app && make up\"",
        ]
        .join("\n");
        let oracle = ScriptedOracle { outcome: OracleOutcome::Generated(unsafe_plan) };
        let synth = Synthesizer::new(&oracle);
        let candidate = synth
            .synthesize(ArtifactKind::InfraFile, &ctx(), &log().await)
            .await
            .unwrap();
        assert_eq!(candidate.origin, Origin::Fallback);
        assert!(!candidate.text.contains("aws_key_pair"));
        assert!(candidate.text.contains("t2.small"));
        assert!(candidate.text.contains("autodeployer-1f0a2b3c"));
    }

    #[tokio::test]
    async fn fenced_terraform_is_unwrapped_before_the_policy_runs() {
        let fenced = format!(
            "```hcl\n{}\n```",
            [
                "resource \"tls_private_key\" \"ssh\" {}",
                "egress { protocol = \"-1\" }",
                "user_data = \"#cloud-config\"",
                "instance_type = \"t2.small\"",
                "destination = \"/home/ubuntu/app.tar.gz\"",
                "\"cd /opt/app && sudo -n -E make up\"",
            ]
            .join("\n")
        );
        let oracle = ScriptedOracle { outcome: OracleOutcome::Generated(fenced) };
        let synth = Synthesizer::new(&oracle);
        let candidate = synth
            .synthesize(ArtifactKind::InfraFile, &ctx(), &log().await)
            .await
            .unwrap();
        assert_eq!(candidate.origin, Origin::Generated);
        assert!(!candidate.text.contains("```"));
    }

    #[tokio::test]
    async fn empty_oracle_response_falls_back() {
        let oracle = ScriptedOracle {
            outcome: OracleOutcome::Rejected("empty response from oracle".to_string()),
        };
        let synth = Synthesizer::new(&oracle);
        let candidate = synth
            .synthesize(ArtifactKind::SetupScript, &ctx(), &log().await)
            .await
            .unwrap();
        assert_eq!(candidate.origin, Origin::Fallback);
        assert!(candidate.text.contains("No setup required"));
    }

    #[tokio::test]
    async fn generated_setup_script_is_normalized() {
        let oracle = ScriptedOracle {
            outcome: OracleOutcome::Generated("echo \"seeding .env\"".to_string()),
        };
        let synth = Synthesizer::new(&oracle);
        let candidate = synth
            .synthesize(ArtifactKind::SetupScript, &ctx(), &log().await)
            .await
            .unwrap();
        assert_eq!(candidate.origin, Origin::Generated);
        assert!(candidate.text.starts_with("#!/usr/bin/env bash\nset -euo pipefail\n"));
    }
}
