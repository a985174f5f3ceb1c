//! Child-process runner shared by the CLI-backed media tools

use std::ffi::OsStr;
use std::path::Path;
use std::process::{Output, Stdio};

use tokio::process::Command;
use tracing::debug;

use super::MediaError;

/// Lines of stderr kept in error messages
const STDERR_TAIL_LINES: usize = 12;

/// Run `program` to completion and return its output.
///
/// The child is killed if the future is dropped. A non-zero exit becomes
/// [`MediaError::Tool`] carrying the tail of stderr.
pub async fn run_tool<I, S>(program: &Path, args: I) -> Result<Output, MediaError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let tool = tool_name(program);
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!(tool = %tool, command = ?cmd.as_std(), "Running external tool");

    let output = cmd.output().await.map_err(|e| MediaError::Tool {
        tool: tool.clone(),
        message: format!("failed to execute {}: {e}", program.display()),
    })?;

    if !output.status.success() {
        return Err(MediaError::Tool {
            tool,
            message: format!(
                "exited with {}: {}",
                output.status,
                stderr_tail(&output.stderr)
            ),
        });
    }

    Ok(output)
}

fn tool_name(program: &Path) -> String {
    program
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| program.display().to_string())
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}
