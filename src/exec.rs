//! Subprocess execution with line-streamed capture.
//!
//! Collaborator binaries (git, terraform) run through here so their output
//! lands in the owning job's log as it is produced, one line per entry.

use std::path::Path;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

use crate::errors::ExecError;
use crate::jobs::JobLog;

/// Run `program args..` in `cwd`, draining stdout and stderr into the job
/// log. Errors on spawn failure or a non-zero exit.
pub async fn run_logged(
    program: &str,
    args: &[&str],
    cwd: Option<&Path>,
    log: &JobLog,
) -> Result<(), ExecError> {
    let command_line = format!("{} {}", program, args.join(" "));

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let mut child = cmd.spawn().map_err(|source| ExecError::Spawn {
        program: program.to_string(),
        source,
    })?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let (out, err) = tokio::join!(drain(program, stdout, log), drain(program, stderr, log));
    out?;
    err?;

    let status = child.wait().await.map_err(|source| ExecError::Output {
        program: program.to_string(),
        source,
    })?;
    if !status.success() {
        return Err(ExecError::NonZero {
            command: command_line,
            status,
        });
    }
    Ok(())
}

async fn drain<R>(program: &str, pipe: Option<R>, log: &JobLog) -> Result<(), ExecError>
where
    R: AsyncRead + Unpin,
{
    let Some(pipe) = pipe else {
        return Ok(());
    };
    let mut lines = BufReader::new(pipe).lines();
    loop {
        let line = lines.next_line().await.map_err(|source| ExecError::Output {
            program: program.to_string(),
            source,
        })?;
        match line {
            Some(line) => log.info(line.trim_end()).await,
            None => return Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::JobManager;

    async fn job_log(manager: &JobManager) -> (String, JobLog) {
        let id = manager.create(Path::new("/tmp")).await.id;
        let log = manager.logger(&id);
        (id, log)
    }

    #[tokio::test]
    async fn test_stdout_streams_into_job_log() {
        let manager = JobManager::new(1);
        let (id, log) = job_log(&manager).await;

        run_logged("echo", &["hello", "pipeline"], None, &log)
            .await
            .expect("echo should succeed");

        let job = manager.get(&id).await.expect("job");
        assert!(
            job.logs.iter().any(|l| l.contains("hello pipeline")),
            "expected echoed line in job log, got {:?}",
            job.logs
        );
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_an_error() {
        let manager = JobManager::new(1);
        let (_, log) = job_log(&manager).await;

        let err = run_logged("false", &[], None, &log)
            .await
            .expect_err("false must fail");
        match err {
            ExecError::NonZero { command, .. } => assert!(command.starts_with("false")),
            other => panic!("expected NonZero, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_binary_is_a_spawn_error() {
        let manager = JobManager::new(1);
        let (_, log) = job_log(&manager).await;

        let err = run_logged("definitely-not-a-real-binary-23981", &[], None, &log)
            .await
            .expect_err("unknown binary must fail to spawn");
        assert!(matches!(err, ExecError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_runs_in_requested_directory() {
        let manager = JobManager::new(1);
        let (id, log) = job_log(&manager).await;
        let dir = tempfile::tempdir().expect("tempdir");

        run_logged("pwd", &[], Some(dir.path()), &log)
            .await
            .expect("pwd should succeed");

        let job = manager.get(&id).await.expect("job");
        let wanted = dir.path().to_string_lossy().to_string();
        assert!(
            job.logs.iter().any(|l| l.contains(&wanted)),
            "expected cwd {wanted} in log, got {:?}",
            job.logs
        );
    }
}
