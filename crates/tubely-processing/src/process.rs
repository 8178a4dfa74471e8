//! External process execution for media tooling.

use std::ffi::OsStr;
use std::io;
use std::path::Path;
use std::process::{ExitStatus, Output, Stdio};
use tokio::process::Command;

/// Characters never allowed in paths handed to external tools.
const DANGEROUS_CHARS: [char; 11] = [';', '|', '&', '$', '`', '(', ')', '<', '>', '\n', '\r'];

/// Upper bound on captured tool output kept in errors.
const MAX_OUTPUT_CHARS: usize = 2048;

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Required command {0} not found, make sure it is installed and on $PATH")]
    NotFound(String),

    #[error("Cannot run command {0} due to invalid permissions on binary")]
    PermissionDenied(String),

    #[error("Refusing to pass path to {command}: {reason}")]
    UnsafePath { command: String, reason: String },

    #[error("{command} failed with {status}: {output}")]
    Status {
        command: String,
        status: ExitStatus,
        output: String,
    },

    #[error("Unknown process error")]
    Other(#[source] io::Error),
}

/// Validate that a path doesn't contain shell metacharacters or traversal sequences.
pub(crate) fn validate_path(command: &str, path: &Path) -> Result<(), ProcessError> {
    let path = path.to_string_lossy();
    let reason = if path.chars().any(|c| DANGEROUS_CHARS.contains(&c)) {
        Some("contains dangerous characters")
    } else if path.contains("..") {
        Some("contains directory traversal")
    } else if path.starts_with('-') {
        Some("could be parsed as an option")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ProcessError::UnsafePath {
            command: command.to_string(),
            reason: format!("{} ({})", reason, path),
        }),
        None => Ok(()),
    }
}

/// Validate a configured executable name or path.
pub(crate) fn validate_executable(executable: &str) -> Result<(), ProcessError> {
    let safe = !executable.is_empty()
        && executable
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '/' | '-' | '_' | '.' | '\\'));
    if safe {
        Ok(())
    } else {
        Err(ProcessError::UnsafePath {
            command: executable.to_string(),
            reason: "executable path contains unsafe characters".to_string(),
        })
    }
}

/// Run a command to completion and capture its output.
///
/// The child is killed if the returned future is dropped. A non-zero exit is an
/// error carrying the (truncated) stderr.
pub(crate) async fn run<I, S>(program: &str, args: I) -> Result<Output, ProcessError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ProcessError::NotFound(program.to_string()),
            io::ErrorKind::PermissionDenied => ProcessError::PermissionDenied(program.to_string()),
            _ => ProcessError::Other(e),
        })?;

    if !output.status.success() {
        return Err(ProcessError::Status {
            command: program.to_string(),
            status: output.status,
            output: truncate(&String::from_utf8_lossy(&output.stderr)),
        });
    }

    Ok(output)
}

fn truncate(output: &str) -> String {
    let output = output.trim();
    match output.char_indices().nth(MAX_OUTPUT_CHARS) {
        Some((idx, _)) => format!("{}...", &output[..idx]),
        None => output.to_string(),
    }
}
