//! Acceptance policy and path normalization for the provisioning artifact.
//!
//! This artifact provisions billable cloud resources, so it gets the
//! strictest gate. The checks are case-insensitive substring scans, not HCL
//! parsing; they reject output that requests more privilege than the
//! deployment needs or drops a property the bootstrap contract depends on.

use super::kind::SynthesisContext;

/// Upload destination the remote-exec bootstrap expects.
pub const ARCHIVE_DESTINATION: &str = "/home/ubuntu/app.tar.gz";

pub(crate) fn accept(text: &str, ctx: &SynthesisContext) -> Result<(), String> {
    let lower = text.to_lowercase();

    if lower.contains("aws_key_pair") {
        return Err(
            "registers a static key pair; only ephemeral tls_private_key is allowed".to_string()
        );
    }
    if !lower.contains("egress") {
        return Err("missing an explicit egress rule".to_string());
    }
    if !lower.contains("tls_private_key") {
        return Err("missing ephemeral key generation".to_string());
    }
    if !lower.contains("user_data") {
        return Err("missing cloud-init user provisioning".to_string());
    }
    if !lower.contains(&ctx.instance_type.to_lowercase()) {
        return Err(format!("missing the required instance type {}", ctx.instance_type));
    }
    if !lower.contains("app.tar.gz") {
        return Err("never uploads or extracts the project archive".to_string());
    }
    if !lower.contains("make up") {
        return Err("missing the 'make up' run step".to_string());
    }
    Ok(())
}

/// Rewrite known archive path mistakes after acceptance. The upload must land
/// in ubuntu's home (the ssh user cannot write /opt before the bootstrap runs)
/// and extraction must target /opt/, since the archive root is already `app`.
/// Applying this twice changes nothing.
pub fn normalize_paths(text: &str) -> String {
    text.replace("/opt/app.tar.gz", ARCHIVE_DESTINATION)
        .replace("-C /opt/app", "-C /opt")
}
