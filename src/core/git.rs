use std::path::Path;
use std::process::Command;

use crate::error::{Error, Result};

pub fn checkout_command(branch_name: &str) -> String {
    format!("git checkout {}", branch_name)
}

/// Switches back to whatever was checked out before the last checkout.
pub fn checkout_previous_command() -> String {
    "git checkout -".to_string()
}

/// Check if tracked files have staged or unstaged changes.
///
/// Untracked files are ignored; a branch switch leaves them in place.
pub fn has_uncommitted_changes(path: &Path) -> Result<bool> {
    let output = Command::new("git")
        .args(["status", "--porcelain", "--untracked-files=no"])
        .current_dir(path)
        .output()
        .map_err(|e| Error::git_command_failed(format!("Failed to run git status: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::git_command_failed(format!(
            "git status failed: {}",
            stderr.trim()
        )));
    }

    Ok(!output.stdout.is_empty())
}

/// Fail with `DirtyWorkingCopy` when `path` has uncommitted changes.
pub fn ensure_clean_working_copy(path: &Path) -> Result<()> {
    if has_uncommitted_changes(path)? {
        return Err(Error::dirty_working_copy(path.to_string_lossy()));
    }
    Ok(())
}
