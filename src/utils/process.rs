//! Command execution primitives with consistent error handling.

use std::process::{Command, Output};

use crate::error::{Error, ExternalCommandDetails, Result};

/// Run a shell command line and return its stdout.
///
/// `env` is layered over the inherited process environment. Non-zero exit
/// is an `ExternalCommand` error carrying stderr (or stdout fallback).
pub fn run_shell_captured(command_line: &str, env: &[(&str, &str)]) -> Result<String> {
    #[cfg(windows)]
    let mut cmd = {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command_line]);
        cmd
    };

    #[cfg(not(windows))]
    let mut cmd = {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command_line]);
        cmd
    };

    cmd.envs(env.iter().copied());

    let output = cmd.output().map_err(|e| {
        Error::external_command(ExternalCommandDetails {
            command: command_line.to_string(),
            exit_code: None,
            stderr: e.to_string(),
        })
    })?;

    if !output.status.success() {
        return Err(Error::external_command(ExternalCommandDetails {
            command: command_line.to_string(),
            exit_code: output.status.code(),
            stderr: error_text(&output),
        }));
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Extract error text from command output.
///
/// Prefers stderr, falls back to stdout if stderr is empty.
pub fn error_text(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        stderr.trim().to_string()
    } else {
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }
}
