//! Oracle prompt text.
//!
//! One system instruction per artifact kind, plus the JSON context payload
//! shared by all requests. The payload is the only part carrying untrusted
//! repository content; it travels inside the delimiter fence the oracle
//! client builds around it.

use serde_json::{Value, json};

use super::kind::{ArtifactKind, SynthesisContext};
use super::templates;

/// Upper bound on tree entries forwarded to the oracle.
const MAX_TREE_ENTRIES: usize = 500;

const BUILD_FILE_INSTRUCTION: &str = "\
You are a senior DevOps engineer. Generate a production-ready Dockerfile for \
the repository described in the JSON context.

Requirements:
- Choose an official base image that matches the project's language and \
tooling.
- Install dependencies from the correct directory, including nested project \
layouts.
- Set a WORKDIR and copy only what the build needs.
- EXPOSE exactly the port given in the context, and make the server listen on \
0.0.0.0 at that port even if the source binds localhost (override the command \
or set environment as needed).
- Start the real application server. Do not start a placeholder.
- Do not emit docker-compose content.

Output ONLY the Dockerfile content. No code fences, no commentary.";

const SETUP_SCRIPT_INSTRUCTION: &str = "\
You are a senior DevOps engineer. Generate an idempotent bash setup script \
that prepares a host directory for the repository's own docker compose setup \
(creating expected directories, seed files or environment files the compose \
file references).

Requirements:
- Start with a shebang and `set -euo pipefail`.
- Safe to run repeatedly.
- If the repository needs no preparation, emit a script that only echoes \
\"No setup required\".

Output ONLY the script content. No code fences, no commentary.";

pub(crate) fn build_file_instruction() -> String {
    BUILD_FILE_INSTRUCTION.to_string()
}

pub(crate) fn compose_file_instruction(ctx: &SynthesisContext) -> String {
    let layout = if ctx.nested_build {
        "The repository files live under ./repo and the compose file sits one \
level above, so the service must build with context ./repo and dockerfile \
../Dockerfile."
    } else {
        "The compose file sits in the repository root next to the Dockerfile, \
so the service builds with context `.`."
    };
    format!(
        "You are a senior DevOps engineer. Generate a docker-compose.yml for \
the repository described in the JSON context.

Requirements:
- {layout}
- Exactly one service named app, container_name app, restart unless-stopped.
- Map host port 8080 to the application port from the context.
- Set PORT in the service environment.
- Prefer overriding the command so the server binds 0.0.0.0.
- Do not use host-side ${{VAR}} expansions; hardcode values or use $$PORT.

Output ONLY the YAML. No code fences, no commentary."
    )
}

pub(crate) fn setup_script_instruction() -> String {
    SETUP_SCRIPT_INSTRUCTION.to_string()
}

pub(crate) fn infra_file_instruction(ctx: &SynthesisContext) -> String {
    format!(
        "You are a senior infrastructure engineer. Generate a single-file \
Terraform configuration that provisions one AWS EC2 instance and runs the \
application archive named in the JSON context on it via docker compose.

Requirements:
{requirements}

Use this AMI lookup verbatim:
{ami_data}

Use this remote-exec bootstrap verbatim inside a null_resource provisioner \
(connection over ssh as ubuntu with the generated private key):
{remote_exec}

Output the Terraform inside one fenced code block:
```hcl
<terraform here>
```",
        requirements = templates::infra_requirements(&ctx.instance_type),
        ami_data = templates::AMI_DATA,
        remote_exec = templates::REMOTE_EXEC,
    )
}

fn objective(kind: ArtifactKind) -> &'static str {
    match kind {
        ArtifactKind::BuildFile => "Generate a Dockerfile that builds and runs the repository.",
        ArtifactKind::ComposeFile => {
            "Generate a docker-compose.yml that builds and runs the repository."
        }
        ArtifactKind::SetupScript => {
            "Generate an idempotent setup script run on the host before docker compose."
        }
        ArtifactKind::InfraFile => {
            "Generate Terraform to deploy the project archive on AWS EC2 and run it via docker compose."
        }
    }
}

fn output_contract(kind: ArtifactKind) -> &'static str {
    match kind {
        ArtifactKind::BuildFile => "Raw Dockerfile content, no fences.",
        ArtifactKind::ComposeFile => "Raw YAML, no fences.",
        ArtifactKind::SetupScript => "Raw bash, no fences.",
        ArtifactKind::InfraFile => "Terraform in a single fenced hcl block.",
    }
}

/// JSON context payload for one request. Serialized and fenced by the oracle
/// client; never concatenated into the instruction.
pub(crate) fn request_payload(kind: ArtifactKind, ctx: &SynthesisContext) -> Value {
    let tree: Vec<&String> = ctx.tree.iter().take(MAX_TREE_ENTRIES).collect();
    let mut payload = json!({
        "objective": objective(kind),
        "inputs": {
            "description": ctx.description,
            "repo_url": ctx.repo_url,
            "repo_tree": tree,
            "port": ctx.port,
            "tar_name": ctx.archive_name,
            "job_id_short": ctx.job_tag,
            "instance_type": ctx.instance_type,
        },
        "output": output_contract(kind),
    });
    if kind == ArtifactKind::InfraFile {
        payload["requirements"] = Value::String(templates::infra_requirements(&ctx.instance_type));
    }
    payload
}
