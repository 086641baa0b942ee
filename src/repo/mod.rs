//! Repository acquisition and inspection.

mod analyzer;
mod snapshot;

pub use analyzer::{
    DEFAULT_PORT, PortOrigin, binds_loopback_only, has_containerization, infer_port,
    is_http_service,
};
pub use snapshot::RepoSnapshot;

use std::path::Path;

use crate::errors::ExecError;
use crate::exec::run_logged;
use crate::jobs::JobLog;

/// Shallow-clone `repo_url` into `dest`, then delete `.git`: history and
/// credentials must never reach the deployment archive.
pub async fn clone_repo(
    git_cmd: &str,
    repo_url: &str,
    dest: &Path,
    log: &JobLog,
) -> Result<(), ExecError> {
    let dest_str = dest.display().to_string();
    run_logged(
        git_cmd,
        &["clone", "--depth", "1", repo_url, &dest_str],
        None,
        log,
    )
    .await?;

    let git_dir = dest.join(".git");
    if git_dir.exists() {
        match tokio::fs::remove_dir_all(&git_dir).await {
            Ok(()) => {
                log.info(format!("Removed .git directory at {}", git_dir.display()))
                    .await
            }
            Err(e) => log.warn(format!("Failed to remove .git directory: {e}")).await,
        }
    }
    Ok(())
}
