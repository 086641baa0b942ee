//! Acceptance checks for the container-side artifact kinds.
//!
//! Checks are plain substring and line scans over the candidate text. They
//! catch structurally unusable output, not subtle mistakes; anything they
//! reject is replaced by the kind's fallback template.

use super::kind::SynthesisContext;

/// True when any line starts with `directive` (ASCII case-insensitive).
fn has_directive(text: &str, directive: &str) -> bool {
    text.lines().any(|line| {
        let line = line.trim_start();
        line.get(..directive.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(directive))
    })
}

pub(crate) fn accept_build_file(text: &str, ctx: &SynthesisContext) -> Result<(), String> {
    if text.contains("```") {
        return Err("contains leftover code fences".to_string());
    }
    if !has_directive(text, "FROM ") {
        return Err("missing a base image declaration".to_string());
    }
    let port = ctx.port.to_string();
    let exposes = text.lines().any(|line| {
        let line = line.trim_start();
        line.get(..7).is_some_and(|head| head.eq_ignore_ascii_case("EXPOSE "))
            && (line.contains(&port) || line.contains("$PORT") || line.contains("${PORT}"))
    });
    if !exposes {
        return Err(format!("missing an EXPOSE matching port {port}"));
    }
    if !has_directive(text, "CMD") && !has_directive(text, "ENTRYPOINT") {
        return Err("missing a start command".to_string());
    }
    if ctx.loopback_only && !text.contains("0.0.0.0") {
        return Err("source binds loopback only and the image never binds 0.0.0.0".to_string());
    }
    Ok(())
}

pub(crate) fn accept_compose_file(text: &str) -> Result<(), String> {
    if text.contains("```") {
        return Err("contains leftover code fences".to_string());
    }
    if !text.lines().any(|line| line.trim_end() == "services:") {
        return Err("missing a services block".to_string());
    }
    Ok(())
}

pub(crate) fn accept_setup_script(text: &str) -> Result<(), String> {
    if text.trim().is_empty() {
        return Err("empty script".to_string());
    }
    Ok(())
}

/// Guarantee the shebang and strict-mode prologue without disturbing the
/// script body. Idempotent.
pub(crate) fn normalize_setup_script(text: String) -> String {
    let body = text.trim();
    if body.is_empty() {
        return String::new();
    }

    let mut lines: Vec<&str> = body.lines().collect();
    let mut out: Vec<String> = Vec::new();
    if lines.first().is_some_and(|line| line.starts_with("#!")) {
        out.push(lines.remove(0).to_string());
    } else {
        out.push("#!/usr/bin/env bash".to_string());
    }
    if !body.contains("set -euo pipefail") {
        out.push("set -euo pipefail".to_string());
    }
    out.extend(lines.iter().map(|line| line.to_string()));

    let mut script = out.join("\n");
    script.push('\n');
    script
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(port: u16, loopback_only: bool) -> SynthesisContext {
        SynthesisContext {
            description: "demo".to_string(),
            repo_url: "https://example.com/demo.git".to_string(),
            tree: Vec::new(),
            port,
            archive_name: "app.tar.gz".to_string(),
            job_tag: "1f0a2b3c".to_string(),
            instance_type: "t2.small".to_string(),
            nested_build: false,
            loopback_only,
        }
    }

    #[test]
    fn build_file_needs_expose_for_target_port() {
        let ctx = ctx(5000, false);
        let good = "FROM python:3.12-slim\nEXPOSE 5000\nCMD [\"python\", \"app.py\"]\n";
        assert_eq!(accept_build_file(good, &ctx), Ok(()));

        let wrong_port = "FROM python:3.12-slim\nEXPOSE 8080\nCMD [\"python\", \"app.py\"]\n";
        assert!(accept_build_file(wrong_port, &ctx).is_err());
    }

    #[test]
    fn build_file_accepts_env_driven_expose() {
        let ctx = ctx(5000, false);
        let text = "FROM node:20\nENV PORT=5000\nEXPOSE ${PORT}\nENTRYPOINT [\"npm\", \"start\"]\n";
        assert_eq!(accept_build_file(text, &ctx), Ok(()));
    }

    #[test]
    fn build_file_rejects_fences_and_missing_start() {
        let ctx = ctx(5000, false);
        assert!(accept_build_file("```\nFROM x\nEXPOSE 5000\nCMD a\n```", &ctx).is_err());
        assert!(accept_build_file("FROM x\nEXPOSE 5000\n", &ctx).is_err());
    }

    #[test]
    fn loopback_repos_require_rebind() {
        let ctx = ctx(5000, true);
        let no_rebind = "FROM python:3.12\nEXPOSE 5000\nCMD [\"python\", \"app.py\"]\n";
        assert!(accept_build_file(no_rebind, &ctx).is_err());

        let rebind =
            "FROM python:3.12\nEXPOSE 5000\nCMD gunicorn app:app --bind 0.0.0.0:5000\n";
        assert_eq!(accept_build_file(rebind, &ctx), Ok(()));
    }

    #[test]
    fn compose_needs_services_block() {
        assert_eq!(accept_compose_file("services:\n  app:\n    build: .\n"), Ok(()));
        assert!(accept_compose_file("version: '3.9'\n").is_err());
    }

    #[test]
    fn setup_script_gains_prologue() {
        let script = normalize_setup_script("echo hi".to_string());
        assert!(script.starts_with("#!/usr/bin/env bash\nset -euo pipefail\necho hi"));
    }

    #[test]
    fn setup_script_normalization_is_idempotent() {
        let once = normalize_setup_script("#!/bin/bash\nset -euo pipefail\necho hi".to_string());
        let twice = normalize_setup_script(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_setup_script_stays_empty_and_fails() {
        let script = normalize_setup_script("   \n".to_string());
        assert!(script.is_empty());
        assert!(accept_setup_script(&script).is_err());
    }
}
