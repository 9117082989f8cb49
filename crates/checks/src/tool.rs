//! External validator invocation
//!
//! Every subprocess runs under an explicit execution configuration: a
//! cleared environment with a pinned C locale and an explicit working
//! directory, so exit codes and any textual output are stable across
//! hosts. Waits are bounded when a timeout is configured.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use pkgqa_errors::{CheckError, Error};

/// Outcome of waiting for one validator run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ToolExit {
    /// The tool exited; signal termination maps to code -1
    Code(i32),
    /// The bounded wait elapsed; the tool was killed
    TimedOut,
}

fn base_command(tool: &str) -> Command {
    let mut cmd = Command::new(tool);
    cmd.env_clear()
        .env("LC_ALL", "C")
        .env("LANG", "C")
        .stdin(Stdio::null())
        .kill_on_drop(true);
    cmd
}

/// Run a validator against one file and wait for its exit status
pub(crate) async fn run_tool(
    tool: &str,
    args: &[&str],
    workdir: &Path,
    timeout: Option<Duration>,
) -> Result<ToolExit, Error> {
    let mut cmd = base_command(tool);
    cmd.args(args)
        .current_dir(workdir)
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(CheckError::ToolMissing {
                tool: tool.to_string(),
            }
            .into());
        }
        Err(e) => {
            return Err(CheckError::ToolFailed {
                tool: tool.to_string(),
                message: e.to_string(),
            }
            .into());
        }
    };

    let status = if let Some(limit) = timeout {
        match tokio::time::timeout(limit, child.wait()).await {
            Ok(status) => status,
            Err(_) => {
                let _ = child.kill().await;
                return Ok(ToolExit::TimedOut);
            }
        }
    } else {
        child.wait().await
    };

    let status = status.map_err(|e| CheckError::ToolFailed {
        tool: tool.to_string(),
        message: e.to_string(),
    })?;

    Ok(ToolExit::Code(status.code().unwrap_or(-1)))
}

/// Capture a tool's `--help` text for a one-time capability probe
///
/// Spawn failure is a tool-missing condition: a check that cannot probe
/// its tool cannot run it either.
pub(crate) async fn probe_help(tool: &str) -> Result<String, Error> {
    let output = base_command(tool)
        .arg("--help")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| -> Error {
            if e.kind() == std::io::ErrorKind::NotFound {
                CheckError::ToolMissing {
                    tool: tool.to_string(),
                }
                .into()
            } else {
                CheckError::ProbeFailed {
                    tool: tool.to_string(),
                    message: e.to_string(),
                }
                .into()
            }
        })?;

    let mut help = String::from_utf8_lossy(&output.stdout).into_owned();
    help.push_str(&String::from_utf8_lossy(&output.stderr));
    Ok(help)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_tool_is_tool_missing() {
        let err = run_tool(
            "/nonexistent/pkgqa-validator",
            &[],
            Path::new("/"),
            None,
        )
        .await
        .unwrap_err();
        assert!(err.is_tool_missing());

        let err = probe_help("/nonexistent/pkgqa-validator").await.unwrap_err();
        assert!(err.is_tool_missing());
    }

    #[tokio::test]
    async fn exit_code_is_reported() {
        // `false` is universally available and exits 1
        let exit = run_tool("/bin/false", &[], Path::new("/"), None)
            .await
            .unwrap();
        assert_eq!(exit, ToolExit::Code(1));
    }

    #[tokio::test]
    async fn bounded_wait_times_out() {
        let exit = run_tool(
            "/bin/sleep",
            &["5"],
            Path::new("/"),
            Some(Duration::from_millis(50)),
        )
        .await
        .unwrap();
        assert_eq!(exit, ToolExit::TimedOut);
    }
}
